/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use std::io::Result;

#[async_trait::async_trait]
pub trait RegisterIo: Send {
    async fn read32(&mut self, addr: u32) -> Result<u32>;
    async fn write32(&mut self, addr: u32, val: u32) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: RegisterIo + ?Sized> RegisterIo for Box<T> {
    async fn read32(&mut self, addr: u32) -> Result<u32> {
        (**self).read32(addr).await
    }

    async fn write32(&mut self, addr: u32, val: u32) -> Result<()> {
        (**self).write32(addr, val).await
    }
}

// Register offsets, relative to the cipher block base.
pub const HDCP_CTRL: u32 = 0x00;
pub const HDCP_STATUS: u32 = 0x04;
pub const HDCP_INT_MASK: u32 = 0x08;
pub const HDCP_AN_LO: u32 = 0x10;
pub const HDCP_AN_HI: u32 = 0x14;
pub const HDCP_KM_INDEX: u32 = 0x20;
pub const HDCP_KM_KEY_LO: u32 = 0x24;
pub const HDCP_KM_KEY_HI: u32 = 0x28;
pub const HDCP_RI: u32 = 0x2C;
pub const HDCP_M0_LO: u32 = 0x30;
pub const HDCP_M0_HI: u32 = 0x34;
pub const HDCP_SHA_CTRL: u32 = 0x38;
/// 16 words, one 512-bit block, big-endian words.
pub const HDCP_SHA_DATA: u32 = 0x40;
/// 5 words, H0..H4.
pub const HDCP_SHA_DIGEST: u32 = 0x80;

// HDCP_CTRL
pub const CTRL_ENC_EN: u32 = 1 << 0;
pub const CTRL_AUTHENTICATED: u32 = 1 << 1;
pub const CTRL_REPEATER: u32 = 1 << 2;
/// While set, the An generator free-runs; clearing it latches a value.
pub const CTRL_AN_INFLUENCE: u32 = 1 << 3;
pub const CTRL_KM_START: u32 = 1 << 4;
pub const CTRL_AUTH_START: u32 = 1 << 5;
pub const CTRL_KM_CLEAR: u32 = 1 << 6;

// HDCP_STATUS, write 1 to clear
pub const STATUS_AN_READY: u32 = 1 << 0;
pub const STATUS_KM_DONE: u32 = 1 << 1;
pub const STATUS_RI_UPDATED: u32 = 1 << 2;
pub const STATUS_SHA_DONE: u32 = 1 << 3;

// HDCP_INT_MASK
pub const INT_RI_UPDATED: u32 = 1 << 2;

// HDCP_SHA_CTRL
pub const SHA_START: u32 = 1 << 0;
pub const SHA_FIRST_BLOCK: u32 = 1 << 1;
