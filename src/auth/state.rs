/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::config::Timing;
use std::time::Duration;

/// Authentication states, named after the HDCP 1.x transmitter state diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No receiver attached / not started.
    LinkH0,
    /// Receiver detected, about to authenticate.
    LinkH1,
    /// Generate An, send An and Aksv.
    AuthA0,
    /// Read and validate Bksv.
    AuthA1,
    /// Read Bcaps, accumulate Km, compute R0.
    AuthA2,
    /// Compare R0 with R0'.
    AuthA3,
    /// Turn encryption on.
    AuthA4,
    /// Authenticated; periodic Ri link check.
    AuthA5,
    /// Repeater branch point.
    AuthA6,
    /// Wait for the repeater's KSV FIFO.
    AuthA8,
    /// Read Bstatus and the KSV list.
    AuthA9,
    /// Repeater V-match.
    AuthA9Verify,
    /// Too many failures; stays here until disabled.
    Failed,
    /// Key table rejected; cannot authenticate.
    Unprovisioned,
}

/// Outcome of running one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    KeysPending,
    KeysRejected,
    AnSent,
    /// A DDC or cipher step failed hard.
    Aborted,
    BksvAccepted,
    BksvRejected,
    RiComputed,
    RiMatched,
    RiMismatched { retry: bool },
    Receiver { repeater: bool },
    FifoReady,
    FifoPending { expired: bool },
    KsvListRead,
    VMatched,
    VMismatched,
    Committed,
    LinkIntact,
    LinkBroken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Drop the cipher to unauthenticated and count a failure.
    ForceUnauthenticate,
    /// Authentication completed; clear the failure bookkeeping.
    Authenticated,
    /// Stop scheduling.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: AuthState,
    /// Time until `next` runs; zero means within the same tick.
    pub delay: Duration,
    pub action: Action,
}

impl Transition {
    fn now(next: AuthState) -> Self {
        Self::after(next, Duration::ZERO)
    }

    fn after(next: AuthState, delay: Duration) -> Self {
        Self {
            next,
            delay,
            action: Action::None,
        }
    }

    fn fail(next: AuthState, delay: Duration) -> Self {
        Self {
            next,
            delay,
            action: Action::ForceUnauthenticate,
        }
    }

    fn halt(next: AuthState) -> Self {
        Self {
            next,
            delay: Duration::ZERO,
            action: Action::Halt,
        }
    }
}

pub fn transition(state: AuthState, event: Event, timing: &Timing) -> Transition {
    use AuthState::*;
    use Event::*;

    match (state, event) {
        (Failed | Unprovisioned, _) => Transition::halt(state),

        (LinkH0, Start) => Transition::now(LinkH1),
        (LinkH0, KeysPending) => Transition::after(LinkH0, timing.restart_link),
        (LinkH0, KeysRejected) => Transition::halt(Unprovisioned),
        (LinkH1, Start) => Transition::now(AuthA0),

        (AuthA0, AnSent) => Transition::after(AuthA1, timing.an_settle + timing.before_bksv),

        (AuthA1, BksvAccepted) => Transition::after(AuthA2, timing.after_bksv),
        (AuthA1, BksvRejected) => Transition::fail(LinkH0, timing.restart_link),

        (AuthA2, RiComputed) => Transition::after(AuthA3, timing.ri_settle),

        (AuthA3, RiMatched) => Transition::now(AuthA6),
        (AuthA3, RiMismatched { retry: true }) => Transition::after(AuthA2, timing.ri_retry),
        (AuthA3, RiMismatched { retry: false }) => Transition::fail(AuthA0, timing.restart_auth),

        (AuthA6, Receiver { repeater: false }) => Transition::now(AuthA4),
        (AuthA6, Receiver { repeater: true }) => Transition::now(AuthA8),

        (AuthA8, FifoReady) => Transition::now(AuthA9),
        (AuthA8, FifoPending { expired: false }) => Transition::after(AuthA8, timing.fifo_poll),
        (AuthA8, FifoPending { expired: true }) => Transition::fail(AuthA0, timing.restart_auth),

        (AuthA9, KsvListRead) => Transition::now(AuthA9Verify),
        (AuthA9Verify, VMatched) => Transition::now(AuthA4),
        (AuthA9Verify, VMismatched) => Transition::fail(AuthA0, timing.restart_auth),

        (AuthA4, Committed) => Transition {
            next: AuthA5,
            delay: timing.link_check,
            action: Action::Authenticated,
        },

        (AuthA5, LinkIntact) => Transition::after(AuthA5, timing.link_check),
        (AuthA5, LinkBroken) => Transition::fail(LinkH0, timing.link_restart),

        (AuthA0 | AuthA2 | AuthA3 | AuthA4 | AuthA9 | AuthA9Verify, Aborted) => {
            Transition::fail(AuthA0, timing.restart_auth)
        }

        // Anything else means the session is out of step; start over.
        _ => Transition::fail(LinkH0, timing.restart_link),
    }
}
