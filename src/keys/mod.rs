/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
//! Provisioned device keys.
//!
//! The secure-storage blob holds Aksv, 40 private key rows and a SHA-1 tag
//! over everything before it:
//!
//! | Offset | Size | Field     |
//! |--------|------|-----------|
//! | 0      | 5    | Aksv      |
//! | 5      | 3    | reserved  |
//! | 8      | 280  | key rows  |
//! | 288    | 20   | SHA-1 tag |
pub mod loader;

pub use loader::{BLOB_NAME, Provisioning, SecureStorage, spawn_loader};

use crate::cipher::sha;
use crate::error::KeyBlobError;
use crate::ksv::{KSV_BITS, KSV_LEN, Ksv};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_COUNT: usize = KSV_BITS;
pub const KEY_LEN: usize = 7;

const RESERVED_LEN: usize = 3;
const KEYS_OFFSET: usize = KSV_LEN + RESERVED_LEN;
const TAG_OFFSET: usize = KEYS_OFFSET + KEY_COUNT * KEY_LEN;
pub const BLOB_LEN: usize = TAG_OFFSET + sha::DIGEST_LEN;

/// A key row as handed to the Km accumulator, never the raw row.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Obfuscate a key row before it crosses into the cipher registers.
///
/// Each byte is chained into the next one and every odd byte is complemented,
/// seeded with the row index.
pub fn deviate_key(row: &[u8; KEY_LEN], index: usize) -> DerivedKey {
    let mut d = [0u8; KEY_LEN];
    d[0] = row[0] ^ (index as u8);
    for i in 1..KEY_LEN {
        let k = if i % 2 == 1 { !row[i] } else { row[i] };
        d[i] = k ^ d[i - 1];
    }
    DerivedKey(d)
}

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyTable {
    #[zeroize(skip)]
    aksv: Ksv,
    rows: [[u8; KEY_LEN]; KEY_COUNT],
}

impl KeyTable {
    pub fn from_blob(blob: &[u8]) -> Result<Self, KeyBlobError> {
        if blob.len() != BLOB_LEN {
            return Err(KeyBlobError::Length(blob.len()));
        }

        let tag = &blob[TAG_OFFSET..];
        if sha::digest(&blob[..TAG_OFFSET]).as_slice() != tag {
            return Err(KeyBlobError::Checksum);
        }

        let mut aksv = [0u8; KSV_LEN];
        aksv.copy_from_slice(&blob[..KSV_LEN]);
        let aksv = Ksv(aksv);
        if aksv.is_zero() {
            return Err(KeyBlobError::ZeroAksv);
        }

        let mut rows = [[0u8; KEY_LEN]; KEY_COUNT];
        for (row, chunk) in rows
            .iter_mut()
            .zip(blob[KEYS_OFFSET..TAG_OFFSET].chunks_exact(KEY_LEN))
        {
            row.copy_from_slice(chunk);
        }

        Ok(Self { aksv, rows })
    }

    pub fn aksv(&self) -> Ksv {
        self.aksv
    }

    pub fn derived_key(&self, index: usize) -> DerivedKey {
        deviate_key(&self.rows[index], index)
    }
}

impl std::fmt::Debug for KeyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTable").field("aksv", &self.aksv).finish_non_exhaustive()
    }
}

/// Assemble a blob in the storage layout, tag included.
pub fn build_blob(aksv: &Ksv, rows: &[[u8; KEY_LEN]; KEY_COUNT]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(BLOB_LEN);
    blob.extend_from_slice(aksv.bytes());
    blob.extend_from_slice(&[0u8; RESERVED_LEN]);
    for row in rows {
        blob.extend_from_slice(row);
    }
    let tag = sha::digest(&blob);
    blob.extend_from_slice(&tag);
    blob
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> [[u8; KEY_LEN]; KEY_COUNT] {
        let mut rows = [[0u8; KEY_LEN]; KEY_COUNT];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, b) in row.iter_mut().enumerate() {
                *b = (i * 13 + j * 31) as u8;
            }
        }
        rows
    }

    const AKSV: Ksv = Ksv([0x14, 0xF7, 0x61, 0x03, 0xB7]);

    #[test]
    fn blob_is_308_bytes() {
        assert_eq!(BLOB_LEN, 308);
        assert_eq!(build_blob(&AKSV, &rows()).len(), 308);
    }

    #[test]
    fn parses_valid_blob() {
        let table = KeyTable::from_blob(&build_blob(&AKSV, &rows())).unwrap();
        assert_eq!(table.aksv(), AKSV);
        assert_eq!(table.derived_key(3), deviate_key(&rows()[3], 3));
    }

    #[test]
    fn rejects_corrupt_tag() {
        let mut blob = build_blob(&AKSV, &rows());
        blob[100] ^= 0x01;
        assert_eq!(KeyTable::from_blob(&blob).unwrap_err(), KeyBlobError::Checksum);

        let mut blob = build_blob(&AKSV, &rows());
        blob[BLOB_LEN - 1] ^= 0x80;
        assert_eq!(KeyTable::from_blob(&blob).unwrap_err(), KeyBlobError::Checksum);
    }

    #[test]
    fn rejects_wrong_length() {
        let blob = build_blob(&AKSV, &rows());
        assert_eq!(
            KeyTable::from_blob(&blob[..300]).unwrap_err(),
            KeyBlobError::Length(300)
        );
    }

    #[test]
    fn rejects_zero_aksv() {
        let blob = build_blob(&Ksv::ZERO, &rows());
        assert_eq!(KeyTable::from_blob(&blob).unwrap_err(), KeyBlobError::ZeroAksv);
    }

    #[test]
    fn deviation_schedule() {
        let row = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70];
        let d = deviate_key(&row, 5);
        let b = d.bytes();
        assert_eq!(b[0], 0x10 ^ 5);
        assert_eq!(b[1], !0x20 ^ b[0]);
        assert_eq!(b[2], 0x30 ^ b[1]);
        assert_eq!(b[3], !0x40 ^ b[2]);
        assert_eq!(b[6], 0x70 ^ b[5]);
    }

    #[test]
    fn deviation_is_deterministic() {
        let rows = rows();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(deviate_key(row, i), deviate_key(row, i));
        }
        // Same row under a different index deviates differently.
        assert_ne!(deviate_key(&rows[0], 0), deviate_key(&rows[0], 1));
    }
}
