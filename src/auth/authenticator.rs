/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::auth::state::{Action, Event, transition};
use crate::auth::{AuthState, HdcpSession};
use crate::cipher::CipherEngine;
use crate::cipher::sha;
use crate::config::HdcpConfig;
use crate::ddc::{Bcaps, Ddc, DdcTransport};
use crate::error::{HdcpError, Result};
use crate::keys::{KeyTable, Provisioning};
use crate::ksv::{KSV_LEN, Ksv};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run `step` again after this long.
    Wait(Duration),
    /// Nothing more to schedule.
    Halt,
}

/// Runs the HDCP state machine against one receiver.
///
/// Every call to [`Authenticator::step`] executes the current state, feeds
/// the outcome through [`transition`] and keeps going until the next state
/// needs a delay. No call sleeps; delays are handed back to the scheduler.
pub struct Authenticator<D: DdcTransport, C: CipherEngine> {
    ddc: Ddc<D>,
    cipher: C,
    config: HdcpConfig,
    provisioning: watch::Receiver<Provisioning>,
    session: HdcpSession,
}

impl<D: DdcTransport, C: CipherEngine> Authenticator<D, C> {
    pub fn new(
        transport: D,
        cipher: C,
        provisioning: watch::Receiver<Provisioning>,
        config: HdcpConfig,
    ) -> Self {
        Self {
            ddc: Ddc::new(transport, config.ddc_attempts),
            cipher,
            config,
            provisioning,
            session: HdcpSession::new(),
        }
    }

    pub fn session(&self) -> &HdcpSession {
        &self.session
    }

    pub fn state(&self) -> AuthState {
        self.session.state
    }

    pub fn ddc(&self) -> &Ddc<D> {
        &self.ddc
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    pub fn config(&self) -> &HdcpConfig {
        &self.config
    }

    /// Start over at H0 with fresh counters.
    pub fn reset(&mut self) {
        self.session = HdcpSession::new();
    }

    /// Leave the cipher unauthenticated, without touching the counters.
    pub async fn force_unauthenticate(&mut self) {
        if let Err(e) = self.cipher.force_unauthenticate().await {
            error!("Failed to force unauthenticated state: {}", e);
        }
        self.session.authenticated = false;
    }

    pub async fn step(&mut self) -> Step {
        loop {
            let state = self.session.state;
            let event = self.execute(state).await;
            let t = transition(state, event, &self.config.timing);

            if t.next != state {
                debug!("{:?} -> {:?} on {:?}", state, t.next, event);
            }

            match t.action {
                Action::None => {}
                Action::Halt => {
                    self.session.state = t.next;
                    return Step::Halt;
                }
                Action::ForceUnauthenticate => {
                    self.force_unauthenticate().await;
                    self.session.fail_count += 1;
                    if self.session.fail_count > self.config.max_failures {
                        error!(
                            "HDCP authentication failed {} times, giving up",
                            self.session.fail_count
                        );
                        self.session.state = AuthState::Failed;
                        return Step::Halt;
                    }
                }
                Action::Authenticated => {
                    self.session.authenticated = true;
                    self.session.fail_count = 0;
                    self.session.retry_count = 0;
                    info!(
                        "HDCP authenticated (Bksv {}, repeater: {})",
                        self.session.bksv, self.session.repeater
                    );
                }
            }

            self.session.state = t.next;
            if !t.delay.is_zero() {
                return Step::Wait(t.delay);
            }
        }
    }

    async fn execute(&mut self, state: AuthState) -> Event {
        match state {
            AuthState::LinkH0 => self.link_h0(),
            AuthState::LinkH1 => {
                self.session.authenticated = false;
                Event::Start
            }
            AuthState::AuthA0 => match self.send_an_aksv().await {
                Ok(()) => Event::AnSent,
                Err(e) => abort(state, e),
            },
            AuthState::AuthA1 => self.check_bksv().await,
            AuthState::AuthA2 => match self.compute_r0().await {
                Ok(ri) => {
                    self.session.ri = ri;
                    Event::RiComputed
                }
                Err(e) => abort(state, e),
            },
            AuthState::AuthA3 => self.check_r0().await,
            AuthState::AuthA6 => {
                if self.session.repeater {
                    let budget = self.config.timing.fifo_budget;
                    self.session.fifo_deadline = Some(Instant::now() + budget);
                }
                Event::Receiver {
                    repeater: self.session.repeater,
                }
            }
            AuthState::AuthA8 => self.poll_ksv_fifo().await,
            AuthState::AuthA9 => match self.read_ksv_list().await {
                Ok(()) => Event::KsvListRead,
                Err(e) => abort(state, e),
            },
            AuthState::AuthA9Verify => match self.verify_v().await {
                Ok(true) => Event::VMatched,
                Ok(false) => {
                    warn!("{}", HdcpError::VMismatch);
                    Event::VMismatched
                }
                Err(e) => abort(state, e),
            },
            AuthState::AuthA4 => match self.cipher.commit_authenticated().await {
                Ok(()) => Event::Committed,
                Err(e) => abort(state, e),
            },
            AuthState::AuthA5 => self.check_link().await,
            AuthState::Failed | AuthState::Unprovisioned => Event::Start,
        }
    }

    fn link_h0(&mut self) -> Event {
        self.session.clear_link();

        let provisioning = self.provisioning.borrow().clone();
        match provisioning {
            Provisioning::Ready(keys) => {
                self.session.aksv = keys.aksv();
                self.session.keys = Some(keys);
                Event::Start
            }
            Provisioning::Pending => {
                debug!("HDCP keys not loaded yet");
                Event::KeysPending
            }
            Provisioning::Rejected(e) => {
                error!("HDCP keys unusable ({}), not starting", e);
                Event::KeysRejected
            }
        }
    }

    fn keys(&self) -> Result<Arc<KeyTable>> {
        self.session.keys.clone().ok_or(HdcpError::NotProvisioned)
    }

    async fn send_an_aksv(&mut self) -> Result<()> {
        let keys = self.keys()?;
        let an = self.cipher.an_generate().await?;
        self.session.an = an;

        // Aksv goes last: writing it starts the receiver's computation.
        self.ddc.write_an(&an).await?;
        self.ddc.write_aksv(&keys.aksv()).await?;
        Ok(())
    }

    async fn check_bksv(&mut self) -> Event {
        let bksv = match self.ddc.read_bksv().await {
            Ok(bksv) => bksv,
            Err(e) => {
                warn!("Receiver does not answer Bksv reads, assuming no HDCP: {}", e);
                Ksv::ZERO
            }
        };
        self.session.bksv = bksv;

        if bksv.is_revoked() {
            warn!("Bksv {} is revoked", bksv);
            return Event::BksvRejected;
        }
        if !bksv.has_valid_weight() {
            warn!("Bksv {} has {} ones, expected 20", bksv, bksv.ones());
            return Event::BksvRejected;
        }

        self.session.retry_count = self.config.ri_retries;
        Event::BksvAccepted
    }

    async fn compute_r0(&mut self) -> Result<u16> {
        let keys = self.keys()?;

        let bcaps = match self.ddc.read_bcaps().await {
            Ok(bcaps) => bcaps,
            Err(e) => {
                warn!("Bcaps unreadable, treating receiver as non-repeater: {}", e);
                Bcaps(0)
            }
        };
        self.session.repeater = bcaps.is_repeater();
        self.cipher.set_repeater(self.session.repeater).await?;

        self.cipher.km_clear().await?;
        let bksv = self.session.bksv;
        for index in bksv.set_bits() {
            self.cipher.km_accumulate(index, &keys.derived_key(index)).await?;
        }

        let ri = self.cipher.authenticate().await?;
        debug!("R0 computed: 0x{:04X}", ri);
        Ok(ri)
    }

    async fn check_r0(&mut self) -> Event {
        let ri_read = match self.ddc.read_ri().await {
            Ok(ri) => Some(ri),
            Err(e) => {
                warn!("Failed to read R0': {}", e);
                None
            }
        };

        if ri_read == Some(self.session.ri) {
            self.session.ri_read = self.session.ri;
            return match self.cipher.m0_get().await {
                Ok(m0) => {
                    self.session.m0 = m0;
                    Event::RiMatched
                }
                Err(e) => abort(AuthState::AuthA3, e),
            };
        }

        self.session.ri_read = ri_read.unwrap_or_default();
        warn!(
            "{} (retries left: {})",
            HdcpError::RiMismatch {
                computed: self.session.ri,
                read: self.session.ri_read,
            },
            self.session.retry_count
        );

        if self.session.retry_count > 0 {
            self.session.retry_count -= 1;
            Event::RiMismatched { retry: true }
        } else {
            Event::RiMismatched { retry: false }
        }
    }

    async fn poll_ksv_fifo(&mut self) -> Event {
        match self.ddc.read_bcaps().await {
            Ok(bcaps) if bcaps.fifo_ready() => return Event::FifoReady,
            Ok(_) => {}
            Err(e) => debug!("Bcaps poll failed: {}", e),
        }

        let expired = self
            .session
            .fifo_deadline
            .is_none_or(|deadline| Instant::now() >= deadline);
        if expired {
            warn!("KSV FIFO not ready within {:?}", self.config.timing.fifo_budget);
        }
        Event::FifoPending { expired }
    }

    async fn read_ksv_list(&mut self) -> Result<()> {
        let bstatus = self.ddc.read_bstatus().await?;
        self.session.b_status = bstatus;

        if bstatus.max_devs_exceeded() || bstatus.max_cascade_exceeded() {
            return Err(HdcpError::TopologyExceeded {
                devices: bstatus.max_devs_exceeded(),
                cascade: bstatus.max_cascade_exceeded(),
            });
        }

        let count = bstatus.device_count();
        let list = self.ddc.read_ksv_fifo(count).await?;

        for chunk in list.chunks_exact(KSV_LEN) {
            if let Some(ksv) = Ksv::from_slice(chunk) {
                if ksv.is_revoked() {
                    return Err(HdcpError::InvalidBksv(ksv.to_string()));
                }
            }
        }

        debug!("Repeater reports {} downstream devices", count);
        self.session.ksv_list = list;
        Ok(())
    }

    async fn verify_v(&mut self) -> Result<bool> {
        let v_prime = self.ddc.read_v_prime().await?;
        let message = sha::vmatch_message(
            &self.session.ksv_list,
            &self.session.b_status.bytes(),
            &self.session.m0,
        );
        let digest = self.cipher.sha1(&message).await?;
        Ok(v_prime == digest)
    }

    async fn check_link(&mut self) -> Event {
        let ri = match self.cipher.ri_get().await {
            Ok(ri) => ri,
            Err(e) => {
                warn!("Failed to read local Ri: {}", e);
                return Event::LinkBroken;
            }
        };
        let ri_read = match self.ddc.read_ri().await {
            Ok(ri) => ri,
            Err(e) => {
                warn!("Failed to read Ri': {}", e);
                return Event::LinkBroken;
            }
        };

        self.session.ri = ri;
        self.session.ri_read = ri_read;
        if ri == ri_read {
            Event::LinkIntact
        } else {
            let e = HdcpError::RiMismatch { computed: ri, read: ri_read };
            warn!("Link integrity lost: {}", e);
            Event::LinkBroken
        }
    }
}

fn abort(state: AuthState, e: HdcpError) -> Event {
    warn!("{:?} aborted: {}", state, e);
    Event::Aborted
}
