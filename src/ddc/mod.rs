/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
mod backend;
pub mod registers;
pub mod transport;
#[cfg(feature = "i2cdev")]
pub use backend::I2cDevDdc;
pub use registers::{Bcaps, Bstatus, Offset, swap_v_prime_words};
pub use transport::{DdcTransport, HDCP_I2C_ADDR};

use crate::ksv::{KSV_LEN, Ksv};
use log::{debug, warn};
use std::io::Result;

/// Typed access to the receiver's HDCP port with per-transaction retries.
pub struct Ddc<T: DdcTransport> {
    transport: T,
    attempts: u32,
}

impl<T: DdcTransport> Ddc<T> {
    pub fn new(transport: T, attempts: u32) -> Self {
        Ddc {
            transport,
            attempts: attempts.max(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn read(&mut self, offset: Offset, buf: &mut [u8]) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.transport.read(offset as u8, buf).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.attempts => {
                    debug!(
                        "DDC read {:?} failed (attempt {}/{}): {}",
                        offset, attempt, self.attempts, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    warn!("DDC read {:?} gave up after {} attempts: {}", offset, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    pub async fn write(&mut self, offset: Offset, data: &[u8]) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.transport.write(offset as u8, data).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.attempts => {
                    debug!(
                        "DDC write {:?} failed (attempt {}/{}): {}",
                        offset, attempt, self.attempts, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    warn!("DDC write {:?} gave up after {} attempts: {}", offset, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    pub async fn write_an(&mut self, an: &[u8; 8]) -> Result<()> {
        debug!("[TX] An: {}", hex::encode(an));
        self.write(Offset::An, an).await
    }

    pub async fn write_aksv(&mut self, aksv: &Ksv) -> Result<()> {
        debug!("[TX] Aksv: {}", aksv);
        self.write(Offset::Aksv, aksv.bytes()).await
    }

    pub async fn read_bksv(&mut self) -> Result<Ksv> {
        let mut buf = [0u8; KSV_LEN];
        self.read(Offset::Bksv, &mut buf).await?;
        let bksv = Ksv(buf);
        debug!("[RX] Bksv: {}", bksv);
        Ok(bksv)
    }

    /// Ri' (R0' right after authentication), little-endian on the wire.
    pub async fn read_ri(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read(Offset::Ri, &mut buf).await?;
        Ok(u16::from_le_bytes(buf))
    }

    pub async fn read_bcaps(&mut self) -> Result<Bcaps> {
        let mut buf = [0u8; 1];
        self.read(Offset::Bcaps, &mut buf).await?;
        Ok(Bcaps(buf[0]))
    }

    pub async fn read_bstatus(&mut self) -> Result<Bstatus> {
        let mut buf = [0u8; 2];
        self.read(Offset::Bstatus, &mut buf).await?;
        Ok(Bstatus(buf))
    }

    pub async fn read_ksv_fifo(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut list = vec![0u8; count * KSV_LEN];
        if count > 0 {
            self.read(Offset::KsvFifo, &mut list).await?;
        }
        Ok(list)
    }

    /// V' in digest byte order, ready to compare with a SHA-1 output.
    pub async fn read_v_prime(&mut self) -> Result<[u8; 20]> {
        let mut buf = [0u8; 20];
        self.read(Offset::VPrime, &mut buf).await?;
        Ok(swap_v_prime_words(buf))
    }
}
