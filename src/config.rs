/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use std::time::Duration;

/// Delays between protocol steps and hardware poll bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Receiver settle time after An and Aksv are written.
    pub an_settle: Duration,
    /// Extra wait before Bksv is read.
    pub before_bksv: Duration,
    /// Wait after Bksv is read, before Km accumulation.
    pub after_bksv: Duration,
    /// Wait between triggering the Ri computation and reading R0'.
    pub ri_settle: Duration,
    /// Wait before redoing A2/A3 after an Ri mismatch.
    pub ri_retry: Duration,
    /// Restart delay to H0 after a rejected Bksv.
    pub restart_link: Duration,
    /// Restart delay to A0 after a hard failure.
    pub restart_auth: Duration,
    /// Bcaps poll period while waiting for the KSV FIFO.
    pub fifo_poll: Duration,
    /// Total budget for the KSV FIFO to become ready.
    pub fifo_budget: Duration,
    /// Period of the Ri link check once authenticated.
    pub link_check: Duration,
    /// Restart delay to H0 after the link check failed.
    pub link_restart: Duration,
    /// Upper bound of a single hardware status poll.
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
}

impl Timing {
    pub const DEFAULT: Self = Self {
        an_settle: Duration::from_millis(20),
        before_bksv: Duration::from_millis(100),
        after_bksv: Duration::from_millis(110),
        ri_settle: Duration::from_millis(130),
        ri_retry: Duration::from_millis(100),
        restart_link: Duration::from_millis(100),
        restart_auth: Duration::from_millis(200),
        fifo_poll: Duration::from_millis(500),
        fifo_budget: Duration::from_secs(5),
        link_check: Duration::from_millis(3000),
        link_restart: Duration::from_millis(50),
        poll_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(1),
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdcpConfig {
    /// Attempts per DDC transaction before it counts as failed.
    pub ddc_attempts: u32,
    /// How many times A2/A3 is redone on an Ri mismatch.
    pub ri_retries: u8,
    /// Hard failures tolerated before the session gives up.
    pub max_failures: u32,
    /// Retry period while secure storage is not ready.
    pub key_load_retry: Duration,
    pub timing: Timing,
}

impl HdcpConfig {
    pub const DEFAULT: Self = Self {
        ddc_attempts: 3,
        ri_retries: 3,
        max_failures: 50,
        key_load_retry: Duration::from_millis(2000),
        timing: Timing::DEFAULT,
    };
}

impl Default for HdcpConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
