/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
#![allow(dead_code)]

use hdcp_auth::cipher::regs::*;
use hdcp_auth::cipher::sha;
use hdcp_auth::ddc::swap_v_prime_words;
use hdcp_auth::keys::{self, DerivedKey, KEY_COUNT, KEY_LEN};
use hdcp_auth::{CipherEngine, DdcTransport, Ksv, LinkStatus, RegisterIo, SecureStorage};
use std::collections::{HashMap, VecDeque};
use std::io::{Error, ErrorKind, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const AKSV: Ksv = Ksv([0x14, 0xF7, 0x61, 0x03, 0xB7]);
/// 20 ones, not revoked.
pub const BKSV: Ksv = Ksv([0xFF, 0x0F, 0xF0, 0x0F, 0x00]);
pub const REVOKED_BKSV: Ksv = Ksv([0x0B, 0x37, 0x21, 0xB4, 0x7D]);
pub const R0: u16 = 0x1234;
pub const M0: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn key_rows() -> [[u8; KEY_LEN]; KEY_COUNT] {
    let mut rows = [[0u8; KEY_LEN]; KEY_COUNT];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, b) in row.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(17) ^ (j as u8).wrapping_mul(29);
        }
    }
    rows
}

pub fn key_blob() -> Vec<u8> {
    keys::build_blob(&AKSV, &key_rows())
}

pub async fn wait_for_status(rx: &mut watch::Receiver<LinkStatus>, want: LinkStatus) {
    tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", want))
        .expect("status channel closed");
}

// ---------------------------------------------------------------------------
// Receiver on the other end of the DDC

pub struct ReceiverState {
    pub present: bool,
    pub bksv: Ksv,
    /// Served for both R0' and Ri'.
    pub ri: u16,
    /// Served before `ri`, one per read.
    pub ri_queue: VecDeque<u16>,
    pub bcaps: u8,
    /// The KSV FIFO reports ready from this Bcaps read on (1-based).
    pub fifo_ready_at: Option<u32>,
    pub bstatus: [u8; 2],
    pub ksv_list: Vec<u8>,
    pub v_prime: [u8; 20],
    /// Remaining forced failures per offset.
    pub flaky: HashMap<u8, u32>,
    pub bcaps_reads: u32,
    pub reads: Vec<u8>,
    pub writes: Vec<(u8, Vec<u8>)>,
}

#[derive(Clone)]
pub struct MockReceiver(pub Arc<Mutex<ReceiverState>>);

impl MockReceiver {
    pub fn sink() -> Self {
        MockReceiver(Arc::new(Mutex::new(ReceiverState {
            present: true,
            bksv: BKSV,
            ri: R0,
            ri_queue: VecDeque::new(),
            bcaps: 0x80,
            fifo_ready_at: None,
            bstatus: [0, 0],
            ksv_list: Vec::new(),
            v_prime: [0; 20],
            flaky: HashMap::new(),
            bcaps_reads: 0,
            reads: Vec::new(),
            writes: Vec::new(),
        })))
    }

    /// A repeater with the given downstream KSVs and a V' matching `m0`.
    pub fn repeater(downstream: &[Ksv], m0: &[u8; 8]) -> Self {
        let rx = Self::sink();
        {
            let mut s = rx.state();
            s.bcaps = 0x40 | 0x80;
            s.fifo_ready_at = Some(2);
            s.bstatus = [downstream.len() as u8, 0x01];
            s.ksv_list = downstream.iter().flat_map(|k| k.0).collect();
            let digest = sha::digest(&sha::vmatch_message(&s.ksv_list, &s.bstatus, m0));
            s.v_prime = swap_v_prime_words(digest);
        }
        rx
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, ReceiverState> {
        self.0.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl DdcTransport for MockReceiver {
    async fn read(&mut self, offset: u8, buf: &mut [u8]) -> Result<()> {
        let mut s = self.state();
        if !s.present {
            return Err(Error::new(ErrorKind::NotConnected, "no receiver"));
        }
        if let Some(left) = s.flaky.get_mut(&offset) {
            if *left > 0 {
                *left -= 1;
                return Err(Error::new(ErrorKind::TimedOut, "NAK"));
            }
        }
        s.reads.push(offset);

        match offset {
            0x00 => buf.copy_from_slice(&s.bksv.0),
            0x08 => {
                let ri = s.ri_queue.pop_front().unwrap_or(s.ri);
                buf.copy_from_slice(&ri.to_le_bytes());
            }
            0x20 => buf.copy_from_slice(&s.v_prime),
            0x40 => {
                s.bcaps_reads += 1;
                let mut bcaps = s.bcaps;
                if s.fifo_ready_at.is_some_and(|n| s.bcaps_reads >= n) {
                    bcaps |= 0x20;
                }
                buf[0] = bcaps;
            }
            0x41 => buf.copy_from_slice(&s.bstatus),
            0x43 => buf.copy_from_slice(&s.ksv_list[..buf.len()]),
            _ => return Err(Error::new(ErrorKind::InvalidInput, "bad offset")),
        }
        Ok(())
    }

    async fn write(&mut self, offset: u8, data: &[u8]) -> Result<()> {
        let mut s = self.state();
        if !s.present {
            return Err(Error::new(ErrorKind::NotConnected, "no receiver"));
        }
        s.writes.push((offset, data.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cipher engine with scripted results

pub struct CipherState {
    pub an: [u8; 8],
    pub r0: u16,
    pub ri: u16,
    pub m0: [u8; 8],
    pub repeater: bool,
    pub km: Vec<(usize, [u8; KEY_LEN])>,
    pub authenticated: bool,
    pub encrypting: bool,
    pub authenticate_calls: u32,
    pub force_unauth_calls: u32,
}

#[derive(Clone)]
pub struct MockCipher(pub Arc<Mutex<CipherState>>);

impl MockCipher {
    pub fn new() -> Self {
        MockCipher(Arc::new(Mutex::new(CipherState {
            an: [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7],
            r0: R0,
            ri: R0,
            m0: M0,
            repeater: false,
            km: Vec::new(),
            authenticated: false,
            encrypting: false,
            authenticate_calls: 0,
            force_unauth_calls: 0,
        })))
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, CipherState> {
        self.0.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl CipherEngine for MockCipher {
    async fn an_generate(&mut self) -> hdcp_auth::Result<[u8; 8]> {
        Ok(self.state().an)
    }

    async fn set_repeater(&mut self, repeater: bool) -> hdcp_auth::Result<()> {
        self.state().repeater = repeater;
        Ok(())
    }

    async fn km_clear(&mut self) -> hdcp_auth::Result<()> {
        self.state().km.clear();
        Ok(())
    }

    async fn km_accumulate(&mut self, index: usize, key: &DerivedKey) -> hdcp_auth::Result<()> {
        self.state().km.push((index, *key.bytes()));
        Ok(())
    }

    async fn authenticate(&mut self) -> hdcp_auth::Result<u16> {
        let mut s = self.state();
        s.authenticate_calls += 1;
        Ok(s.r0)
    }

    async fn ri_get(&mut self) -> hdcp_auth::Result<u16> {
        Ok(self.state().ri)
    }

    async fn m0_get(&mut self) -> hdcp_auth::Result<[u8; 8]> {
        Ok(self.state().m0)
    }

    async fn sha1(&mut self, message: &[u8]) -> hdcp_auth::Result<[u8; 20]> {
        Ok(sha::digest(message))
    }

    async fn commit_authenticated(&mut self) -> hdcp_auth::Result<()> {
        let mut s = self.state();
        s.authenticated = true;
        s.encrypting = true;
        Ok(())
    }

    async fn force_unauthenticate(&mut self) -> hdcp_auth::Result<()> {
        let mut s = self.state();
        s.authenticated = false;
        s.encrypting = false;
        s.repeater = false;
        s.force_unauth_calls += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Secure storage

pub struct StorageState {
    pub blob: Vec<u8>,
    pub not_ready: u32,
    pub reads: u32,
}

#[derive(Clone)]
pub struct MockStorage(pub Arc<Mutex<StorageState>>);

impl MockStorage {
    pub fn with_blob(blob: Vec<u8>) -> Self {
        MockStorage(Arc::new(Mutex::new(StorageState {
            blob,
            not_ready: 0,
            reads: 0,
        })))
    }

    pub fn ready() -> Self {
        Self::with_blob(key_blob())
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, StorageState> {
        self.0.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl SecureStorage for MockStorage {
    async fn read_blob(&mut self, name: &str, len: usize) -> Result<Vec<u8>> {
        assert_eq!(name, "HDCP");
        assert_eq!(len, 308);
        let mut s = self.state();
        s.reads += 1;
        if s.not_ready > 0 {
            s.not_ready -= 1;
            return Err(Error::new(ErrorKind::WouldBlock, "storage not ready"));
        }
        Ok(s.blob.clone())
    }
}

// ---------------------------------------------------------------------------
// Register file behaving like the cipher block

pub const CIPHER_BASE: u32 = 0x1C00_0000;

pub struct RegisterState {
    pub regs: HashMap<u32, u32>,
    /// Status bits never come up.
    pub stalled: bool,
    pub an: [u32; 2],
    pub ri: u32,
    pub m0: [u32; 2],
    pub km: Vec<(u32, u32, u32)>,
    pub sha_blocks: Vec<[u8; 64]>,
    pub ctrl_writes: Vec<u32>,
}

#[derive(Clone)]
pub struct FakeRegisters(pub Arc<Mutex<RegisterState>>);

impl FakeRegisters {
    pub fn new() -> Self {
        FakeRegisters(Arc::new(Mutex::new(RegisterState {
            regs: HashMap::new(),
            stalled: false,
            an: [0x4433_2211, 0x8877_6655],
            ri: R0 as u32,
            m0: [0x6745_2301, 0xEFCD_AB89],
            km: Vec::new(),
            sha_blocks: Vec::new(),
            ctrl_writes: Vec::new(),
        })))
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, RegisterState> {
        self.0.lock().unwrap()
    }

    pub fn reg(&self, reg: u32) -> u32 {
        self.state().regs.get(&reg).copied().unwrap_or(0)
    }
}

impl RegisterState {
    fn get(&self, reg: u32) -> u32 {
        self.regs.get(&reg).copied().unwrap_or(0)
    }

    fn set_status(&mut self, bits: u32) {
        if !self.stalled {
            let status = self.get(HDCP_STATUS);
            self.regs.insert(HDCP_STATUS, status | bits);
        }
    }

    /// Undo the padding to recover the message, then hash it.
    fn sha_digest(&self) -> [u8; 20] {
        let data: Vec<u8> = self.sha_blocks.iter().flatten().copied().collect();
        let bits = u64::from_be_bytes(data[data.len() - 8..].try_into().unwrap());
        sha::digest(&data[..(bits / 8) as usize])
    }
}

#[async_trait::async_trait]
impl RegisterIo for FakeRegisters {
    async fn read32(&mut self, addr: u32) -> Result<u32> {
        let s = self.state();
        let reg = addr - CIPHER_BASE;
        let val = match reg {
            HDCP_AN_LO => s.an[0],
            HDCP_AN_HI => s.an[1],
            HDCP_RI => s.ri,
            HDCP_M0_LO => s.m0[0],
            HDCP_M0_HI => s.m0[1],
            r if (HDCP_SHA_DIGEST..HDCP_SHA_DIGEST + 20).contains(&r) => {
                let digest = s.sha_digest();
                let i = ((r - HDCP_SHA_DIGEST) / 4) as usize;
                u32::from_be_bytes(digest[i * 4..i * 4 + 4].try_into().unwrap())
            }
            _ => s.get(reg),
        };
        Ok(val)
    }

    async fn write32(&mut self, addr: u32, val: u32) -> Result<()> {
        let mut s = self.state();
        let reg = addr - CIPHER_BASE;
        match reg {
            HDCP_STATUS => {
                let status = s.get(HDCP_STATUS) & !val;
                s.regs.insert(HDCP_STATUS, status);
            }
            HDCP_CTRL => {
                s.ctrl_writes.push(val);
                let old = s.get(HDCP_CTRL);
                let mut ctrl = val;
                if old & CTRL_AN_INFLUENCE != 0 && val & CTRL_AN_INFLUENCE == 0 {
                    s.set_status(STATUS_AN_READY);
                }
                if val & CTRL_KM_CLEAR != 0 {
                    s.km.clear();
                    ctrl &= !CTRL_KM_CLEAR;
                }
                if val & CTRL_KM_START != 0 {
                    let index = s.get(HDCP_KM_INDEX);
                    let entry = (index, s.get(HDCP_KM_KEY_LO), s.get(HDCP_KM_KEY_HI));
                    s.km.push(entry);
                    s.set_status(STATUS_KM_DONE);
                    ctrl &= !CTRL_KM_START;
                }
                if val & CTRL_AUTH_START != 0 {
                    s.set_status(STATUS_RI_UPDATED);
                    ctrl &= !CTRL_AUTH_START;
                }
                s.regs.insert(HDCP_CTRL, ctrl);
            }
            HDCP_SHA_CTRL => {
                if val & SHA_FIRST_BLOCK != 0 {
                    s.sha_blocks.clear();
                }
                if val & SHA_START != 0 {
                    let mut block = [0u8; 64];
                    for w in 0..16u32 {
                        let word = s.get(HDCP_SHA_DATA + w * 4);
                        block[(w * 4) as usize..(w * 4 + 4) as usize]
                            .copy_from_slice(&word.to_be_bytes());
                    }
                    s.sha_blocks.push(block);
                    s.set_status(STATUS_SHA_DONE);
                }
            }
            _ => {
                s.regs.insert(reg, val);
            }
        }
        Ok(())
    }
}
