/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use crate::cipher::CipherEngine;
use crate::cipher::regs::*;
use crate::cipher::sha::{self, DIGEST_LEN};
use crate::config::Timing;
use crate::error::{HdcpError, Result};
use crate::keys::DerivedKey;
use log::{debug, trace};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Where the repeater V-match digest is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaPath {
    /// Padded blocks are streamed through the SHA engine registers.
    Engine,
    /// The digest is computed on the CPU.
    Software,
}

pub struct RegisterCipher<R: RegisterIo> {
    io: R,
    base: u32,
    sha: ShaPath,
    poll_timeout: Duration,
    poll_interval: Duration,
}

impl<R: RegisterIo> RegisterCipher<R> {
    pub fn new(io: R, base: u32, sha: ShaPath) -> Self {
        Self {
            io,
            base,
            sha,
            poll_timeout: Timing::DEFAULT.poll_timeout,
            poll_interval: Timing::DEFAULT.poll_interval,
        }
    }

    pub fn with_sha_engine(io: R, base: u32) -> Self {
        Self::new(io, base, ShaPath::Engine)
    }

    pub fn with_software_sha(io: R, base: u32) -> Self {
        Self::new(io, base, ShaPath::Software)
    }

    pub fn with_timing(mut self, timing: &Timing) -> Self {
        self.poll_timeout = timing.poll_timeout;
        self.poll_interval = timing.poll_interval;
        self
    }

    pub fn io(&self) -> &R {
        &self.io
    }

    async fn read(&mut self, reg: u32) -> Result<u32> {
        Ok(self.io.read32(self.base + reg).await?)
    }

    async fn write(&mut self, reg: u32, val: u32) -> Result<()> {
        trace!("[REG] 0x{:08X} <- 0x{:08X}", self.base + reg, val);
        Ok(self.io.write32(self.base + reg, val).await?)
    }

    async fn update(&mut self, reg: u32, set: u32, clear: u32) -> Result<()> {
        let val = self.read(reg).await?;
        self.write(reg, (val & !clear) | set).await
    }

    async fn poll(&mut self, reg: u32, mask: u32, what: &'static str) -> Result<()> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            if self.read(reg).await? & mask != 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HdcpError::Timeout { what });
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn engine_digest(&mut self, message: &[u8]) -> Result<[u8; DIGEST_LEN]> {
        let blocks = sha::pad(message);
        debug!("SHA engine: {} bytes in {} blocks", message.len(), blocks.len());

        for (i, block) in blocks.iter().enumerate() {
            for (w, word) in block.chunks_exact(4).enumerate() {
                let val = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
                self.write(HDCP_SHA_DATA + (w as u32) * 4, val).await?;
            }
            self.write(HDCP_STATUS, STATUS_SHA_DONE).await?;
            let ctrl = if i == 0 { SHA_START | SHA_FIRST_BLOCK } else { SHA_START };
            self.write(HDCP_SHA_CTRL, ctrl).await?;
            self.poll(HDCP_STATUS, STATUS_SHA_DONE, "SHA block").await?;
        }

        let mut digest = [0u8; DIGEST_LEN];
        for (w, chunk) in digest.chunks_exact_mut(4).enumerate() {
            let val = self.read(HDCP_SHA_DIGEST + (w as u32) * 4).await?;
            chunk.copy_from_slice(&val.to_be_bytes());
        }
        Ok(digest)
    }
}

#[async_trait::async_trait]
impl<R: RegisterIo> CipherEngine for RegisterCipher<R> {
    async fn an_generate(&mut self) -> Result<[u8; 8]> {
        self.update(HDCP_CTRL, CTRL_AN_INFLUENCE, 0).await?;
        self.write(HDCP_STATUS, STATUS_AN_READY).await?;
        self.update(HDCP_CTRL, 0, CTRL_AN_INFLUENCE).await?;
        self.poll(HDCP_STATUS, STATUS_AN_READY, "An ready").await?;

        let lo = self.read(HDCP_AN_LO).await?;
        let hi = self.read(HDCP_AN_HI).await?;
        let mut an = [0u8; 8];
        an[..4].copy_from_slice(&lo.to_le_bytes());
        an[4..].copy_from_slice(&hi.to_le_bytes());
        Ok(an)
    }

    async fn set_repeater(&mut self, repeater: bool) -> Result<()> {
        if repeater {
            self.update(HDCP_CTRL, CTRL_REPEATER, 0).await
        } else {
            self.update(HDCP_CTRL, 0, CTRL_REPEATER).await
        }
    }

    async fn km_clear(&mut self) -> Result<()> {
        self.update(HDCP_CTRL, CTRL_KM_CLEAR, 0).await
    }

    async fn km_accumulate(&mut self, index: usize, key: &DerivedKey) -> Result<()> {
        let k = key.bytes();
        self.write(HDCP_KM_INDEX, index as u32).await?;
        self.write(HDCP_KM_KEY_LO, u32::from_le_bytes([k[0], k[1], k[2], k[3]])).await?;
        self.write(HDCP_KM_KEY_HI, u32::from_le_bytes([k[4], k[5], k[6], 0])).await?;
        self.write(HDCP_STATUS, STATUS_KM_DONE).await?;
        self.update(HDCP_CTRL, CTRL_KM_START, 0).await?;
        self.poll(HDCP_STATUS, STATUS_KM_DONE, "Km accumulation").await
    }

    async fn authenticate(&mut self) -> Result<u16> {
        self.update(HDCP_INT_MASK, 0, INT_RI_UPDATED).await?;
        self.write(HDCP_STATUS, STATUS_RI_UPDATED).await?;
        self.update(HDCP_CTRL, CTRL_AUTH_START, 0).await?;
        self.poll(HDCP_STATUS, STATUS_RI_UPDATED, "Ri update").await?;
        self.ri_get().await
    }

    async fn ri_get(&mut self) -> Result<u16> {
        Ok((self.read(HDCP_RI).await? & 0xFFFF) as u16)
    }

    async fn m0_get(&mut self) -> Result<[u8; 8]> {
        let lo = self.read(HDCP_M0_LO).await?;
        let hi = self.read(HDCP_M0_HI).await?;
        let mut m0 = [0u8; 8];
        m0[..4].copy_from_slice(&lo.to_le_bytes());
        m0[4..].copy_from_slice(&hi.to_le_bytes());
        Ok(m0)
    }

    async fn sha1(&mut self, message: &[u8]) -> Result<[u8; DIGEST_LEN]> {
        match self.sha {
            ShaPath::Engine => self.engine_digest(message).await,
            ShaPath::Software => Ok(sha::digest(message)),
        }
    }

    async fn commit_authenticated(&mut self) -> Result<()> {
        self.update(HDCP_CTRL, CTRL_AUTHENTICATED, 0).await?;
        self.update(HDCP_CTRL, CTRL_ENC_EN, 0).await
    }

    async fn force_unauthenticate(&mut self) -> Result<()> {
        self.update(HDCP_CTRL, 0, CTRL_ENC_EN | CTRL_AUTHENTICATED | CTRL_REPEATER).await
    }
}
