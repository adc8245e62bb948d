/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::ddc::transport::{DdcTransport, HDCP_I2C_ADDR};
use i2cdev::core::{I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError, LinuxI2CMessage};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{Error, Result};
use tokio::sync::Mutex;
use tokio::task;

/// DDC over a Linux `/dev/i2c-N` character device.
#[derive(Clone)]
pub struct I2cDevDdc {
    dev: Arc<Mutex<LinuxI2CDevice>>,
    path: PathBuf,
    address: u16,
}

fn bus_error(e: LinuxI2CError) -> Error {
    Error::other(e)
}

/// Offset byte first, then the payload, so a write is one transaction.
fn write_frame(offset: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 1);
    frame.push(offset);
    frame.extend_from_slice(data);
    frame
}

/// Combined write-offset, repeated start, read transfer.
fn read_at(dev: &mut LinuxI2CDevice, offset: u8, len: usize) -> Result<Vec<u8>> {
    let reg = [offset];
    let mut data = vec![0u8; len];
    {
        let mut msgs = [LinuxI2CMessage::write(&reg), LinuxI2CMessage::read(&mut data)];
        dev.transfer(&mut msgs).map_err(bus_error)?;
    }
    Ok(data)
}

impl I2cDevDdc {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_at(path, HDCP_I2C_ADDR).await
    }

    pub async fn open_at(path: impl AsRef<Path>, address: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // i2c-dev is sync, so the syscalls go through spawn_blocking
        let dev = task::spawn_blocking({
            let path = path.clone();
            move || LinuxI2CDevice::new(&path, address).map_err(bus_error)
        })
        .await??;

        info!("Opened DDC bus {} at address 0x{:02X}", path.display(), address);

        Ok(Self {
            dev: Arc::new(Mutex::new(dev)),
            path,
            address,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn address(&self) -> u16 {
        self.address
    }
}

#[async_trait::async_trait]
impl DdcTransport for I2cDevDdc {
    async fn read(&mut self, offset: u8, buf: &mut [u8]) -> Result<()> {
        let dev = self.dev.clone();
        let len = buf.len();

        let data = task::spawn_blocking(move || read_at(&mut dev.blocking_lock(), offset, len))
            .await??;

        debug!("[RX] 0x{:02X}: {:02X?}", offset, data);
        buf.copy_from_slice(&data);
        Ok(())
    }

    async fn write(&mut self, offset: u8, data: &[u8]) -> Result<()> {
        let dev = self.dev.clone();
        let frame = write_frame(offset, data);

        task::spawn_blocking(move || -> Result<()> {
            let mut dev = dev.blocking_lock();
            let mut msgs = [LinuxI2CMessage::write(&frame)];
            dev.transfer(&mut msgs).map_err(bus_error)?;
            Ok(())
        })
        .await?
    }
}
