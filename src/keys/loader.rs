/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::error::KeyBlobError;
use crate::keys::{BLOB_LEN, KeyTable};
use log::{error, info, warn};
use std::io::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const BLOB_NAME: &str = "HDCP";

/// Read access to named secret blobs.
///
/// Any error is treated as "storage not ready yet" and the read is retried.
#[async_trait::async_trait]
pub trait SecureStorage: Send {
    async fn read_blob(&mut self, name: &str, len: usize) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub enum Provisioning {
    Pending,
    Ready(Arc<KeyTable>),
    /// The blob was read but failed verification; nothing will change that
    /// short of fixing storage and loading again.
    Rejected(KeyBlobError),
}

impl Provisioning {
    pub fn keys(&self) -> Option<Arc<KeyTable>> {
        match self {
            Provisioning::Ready(keys) => Some(Arc::clone(keys)),
            _ => None,
        }
    }
}

/// Load the key blob in the background, retrying every `retry` until storage
/// answers.
pub fn spawn_loader<S>(
    mut storage: S,
    retry: Duration,
) -> (watch::Receiver<Provisioning>, JoinHandle<()>)
where
    S: SecureStorage + 'static,
{
    let (tx, rx) = watch::channel(Provisioning::Pending);

    let handle = tokio::spawn(async move {
        loop {
            match storage.read_blob(BLOB_NAME, BLOB_LEN).await {
                Ok(blob) => {
                    let state = match KeyTable::from_blob(&blob) {
                        Ok(table) => {
                            info!("HDCP keys loaded, Aksv {}", table.aksv());
                            Provisioning::Ready(Arc::new(table))
                        }
                        Err(e) => {
                            error!("HDCP key blob rejected: {}", e);
                            Provisioning::Rejected(e)
                        }
                    };
                    tx.send_replace(state);
                    return;
                }
                Err(e) => {
                    warn!(
                        "Secure storage not ready ({}), retrying in {} ms",
                        e,
                        retry.as_millis()
                    );
                    tokio::time::sleep(retry).await;
                }
            }
        }
    });

    (rx, handle)
}
