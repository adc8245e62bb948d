/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
//! SHA-1 helpers for the repeater V-match.
//!
//! The hardware engine only runs the compression function, so the message is
//! padded here: a 0x80 terminator, zero fill up to 56 mod 64, then the message
//! length in bits as a 64-bit big-endian trailer. The bit length is a `u64`,
//! so any KSV list size pads correctly.
use sha1::{Digest, Sha1};

pub const BLOCK_LEN: usize = 64;
pub const DIGEST_LEN: usize = 20;

pub type Block = [u8; BLOCK_LEN];

pub fn pad(message: &[u8]) -> Vec<Block> {
    let bit_len = (message.len() as u64).wrapping_mul(8);

    let mut padded = Vec::with_capacity(message.len() + BLOCK_LEN + 8);
    padded.extend_from_slice(message);
    padded.push(0x80);
    while padded.len() % BLOCK_LEN != BLOCK_LEN - 8 {
        padded.push(0);
    }
    padded.extend_from_slice(&bit_len.to_be_bytes());

    padded
        .chunks_exact(BLOCK_LEN)
        .map(|chunk| {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(chunk);
            block
        })
        .collect()
}

pub fn digest(message: &[u8]) -> [u8; DIGEST_LEN] {
    Sha1::digest(message).into()
}

/// KSV list, then Bstatus, then M0: the V-match input.
pub fn vmatch_message(ksv_list: &[u8], bstatus: &[u8; 2], m0: &[u8; 8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(ksv_list.len() + bstatus.len() + m0.len());
    message.extend_from_slice(ksv_list);
    message.extend_from_slice(bstatus);
    message.extend_from_slice(m0);
    message
}

/// True when `v_prime`, in digest byte order, is the SHA-1 of the V-match
/// message.
pub fn vmatch(
    v_prime: &[u8; DIGEST_LEN],
    ksv_list: &[u8],
    bstatus: &[u8; 2],
    m0: &[u8; 8],
) -> bool {
    *v_prime == digest(&vmatch_message(ksv_list, bstatus, m0))
}
