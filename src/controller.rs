/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::auth::{AuthState, Authenticator, Step};
use crate::cipher::CipherEngine;
use crate::config::HdcpConfig;
use crate::ddc::DdcTransport;
use crate::keys::{Provisioning, SecureStorage, spawn_loader};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// What the owning video output gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disabled,
    Authenticating,
    Authenticated,
    /// Gave up after too many failures; needs a disable/enable cycle.
    Failed,
    /// Keys missing or corrupt.
    Unprovisioned,
}

impl LinkStatus {
    fn of<D: DdcTransport, C: CipherEngine>(auth: &Authenticator<D, C>) -> Self {
        match auth.state() {
            AuthState::Failed => LinkStatus::Failed,
            AuthState::Unprovisioned => LinkStatus::Unprovisioned,
            _ if auth.session().authenticated => LinkStatus::Authenticated,
            _ => LinkStatus::Authenticating,
        }
    }
}

/// HDCP for one video output: owns the key loader and the worker that steps
/// the state machine.
pub struct Hdcp<D, C>
where
    D: DdcTransport + 'static,
    C: CipherEngine + 'static,
{
    auth: Arc<Mutex<Authenticator<D, C>>>,
    status: Arc<watch::Sender<LinkStatus>>,
    provisioning: watch::Receiver<Provisioning>,
    worker: Option<JoinHandle<()>>,
    key_loader: JoinHandle<()>,
    enabled: bool,
}

impl<D, C> Hdcp<D, C>
where
    D: DdcTransport + 'static,
    C: CipherEngine + 'static,
{
    /// Set up the output and start loading keys. Must run inside a Tokio runtime.
    pub fn init<S>(ddc: D, cipher: C, storage: S, config: HdcpConfig) -> Self
    where
        S: SecureStorage + 'static,
    {
        let (provisioning, key_loader) = spawn_loader(storage, config.key_load_retry);
        let auth = Authenticator::new(ddc, cipher, provisioning.clone(), config);
        let (status, _) = watch::channel(LinkStatus::Disabled);

        Self {
            auth: Arc::new(Mutex::new(auth)),
            status: Arc::new(status),
            provisioning,
            worker: None,
            key_loader,
            enabled: false,
        }
    }

    pub async fn enable(&mut self, enable: bool) {
        if enable {
            self.start().await;
        } else {
            self.stop().await;
        }
    }

    async fn start(&mut self) {
        if self.enabled {
            debug!("HDCP already enabled");
            return;
        }
        self.enabled = true;

        self.auth.lock().await.reset();
        self.status.send_replace(LinkStatus::Authenticating);

        info!("HDCP enabled, starting authentication");
        self.worker = Some(tokio::spawn(run(
            Arc::clone(&self.auth),
            Arc::clone(&self.status),
        )));
    }

    async fn stop(&mut self) {
        self.enabled = false;

        // Cancel and wait, so nothing touches the hardware after we return.
        if let Some(worker) = self.worker.take() {
            worker.abort();
            let _ = worker.await;
            info!("HDCP disabled");
        }

        self.auth.lock().await.force_unauthenticate().await;
        self.status.send_replace(LinkStatus::Disabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == LinkStatus::Authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    pub fn provisioning(&self) -> Provisioning {
        self.provisioning.borrow().clone()
    }

    pub async fn state(&self) -> AuthState {
        self.auth.lock().await.state()
    }

    pub async fn fail_count(&self) -> u32 {
        self.auth.lock().await.session().fail_count
    }

    /// Direct access to the authenticator, e.g. to inspect the session.
    pub fn authenticator(&self) -> Arc<Mutex<Authenticator<D, C>>> {
        Arc::clone(&self.auth)
    }
}

impl<D, C> Drop for Hdcp<D, C>
where
    D: DdcTransport + 'static,
    C: CipherEngine + 'static,
{
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.key_loader.abort();
    }
}

async fn run<D, C>(auth: Arc<Mutex<Authenticator<D, C>>>, status: Arc<watch::Sender<LinkStatus>>)
where
    D: DdcTransport + 'static,
    C: CipherEngine + 'static,
{
    loop {
        let (step, link) = {
            let mut auth = auth.lock().await;
            let step = auth.step().await;
            (step, LinkStatus::of(&auth))
        };

        status.send_if_modified(|current| {
            if *current != link {
                *current = link;
                true
            } else {
                false
            }
        });

        match step {
            Step::Wait(delay) => tokio::time::sleep(delay).await,
            Step::Halt => break,
        }
    }
}
