/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::auth::AuthState;
use crate::ddc::Bstatus;
use crate::keys::KeyTable;
use crate::ksv::Ksv;
use std::sync::Arc;
use tokio::time::Instant;
use zeroize::Zeroize;

/// Per-output authentication state. Owned by the worker; the controller only
/// reads it between steps.
#[derive(Debug)]
pub struct HdcpSession {
    pub state: AuthState,
    pub an: [u8; 8],
    pub aksv: Ksv,
    pub bksv: Ksv,
    /// Ri computed by the local cipher.
    pub ri: u16,
    /// Ri' as read back from the receiver.
    pub ri_read: u16,
    pub m0: [u8; 8],
    pub repeater: bool,
    pub ksv_list: Vec<u8>,
    pub b_status: Bstatus,
    /// Remaining A2/A3 retries for the current Bksv.
    pub retry_count: u8,
    pub fail_count: u32,
    pub authenticated: bool,
    /// Monotonic deadline for the KSV FIFO while in A8.
    pub fifo_deadline: Option<Instant>,
    pub keys: Option<Arc<KeyTable>>,
}

impl HdcpSession {
    pub fn new() -> Self {
        Self {
            state: AuthState::LinkH0,
            an: [0; 8],
            aksv: Ksv::ZERO,
            bksv: Ksv::ZERO,
            ri: 0,
            ri_read: 0,
            m0: [0; 8],
            repeater: false,
            ksv_list: Vec::new(),
            b_status: Bstatus::default(),
            retry_count: 0,
            fail_count: 0,
            authenticated: false,
            fifo_deadline: None,
            keys: None,
        }
    }

    /// Forget everything learned from the current receiver. Counters survive.
    pub fn clear_link(&mut self) {
        self.an = [0; 8];
        self.bksv = Ksv::ZERO;
        self.ri = 0;
        self.ri_read = 0;
        self.m0.zeroize();
        self.repeater = false;
        self.ksv_list.clear();
        self.b_status = Bstatus::default();
        self.fifo_deadline = None;
        self.authenticated = false;
    }

    pub fn device_count(&self) -> usize {
        self.b_status.device_count()
    }
}

impl Default for HdcpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HdcpSession {
    fn drop(&mut self) {
        self.m0.zeroize();
    }
}
