/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use std::io::Result;

/// 7-bit I2C address of the HDCP port on the receiver (0x74/0x75 in 8-bit form).
pub const HDCP_I2C_ADDR: u16 = 0x3A;

/// Byte-level access to the receiver's HDCP register space.
///
/// Both calls are a single bus transaction: the register offset goes out
/// first, followed by the data (write) or a repeated start and the read.
#[async_trait::async_trait]
pub trait DdcTransport: Send {
    async fn read(&mut self, offset: u8, buf: &mut [u8]) -> Result<()>;
    async fn write(&mut self, offset: u8, data: &[u8]) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: DdcTransport + ?Sized> DdcTransport for Box<T> {
    async fn read(&mut self, offset: u8, buf: &mut [u8]) -> Result<()> {
        (**self).read(offset, buf).await
    }

    async fn write(&mut self, offset: u8, data: &[u8]) -> Result<()> {
        (**self).write(offset, data).await
    }
}
