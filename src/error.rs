/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HdcpError {
    /// DDC or register access failed at the bus level.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timed out waiting for {what}")]
    Timeout { what: &'static str },

    #[error("Bksv {0} is invalid or revoked")]
    InvalidBksv(String),

    #[error("Ri mismatch: computed 0x{computed:04X}, receiver 0x{read:04X}")]
    RiMismatch { computed: u16, read: u16 },

    #[error("Repeater V' does not match the KSV list")]
    VMismatch,

    #[error("Repeater topology exceeded (devices: {devices}, cascade: {cascade})")]
    TopologyExceeded { devices: bool, cascade: bool },

    #[error("Key blob rejected: {0}")]
    KeyBlob(#[from] KeyBlobError),

    #[error("HDCP keys are not provisioned")]
    NotProvisioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyBlobError {
    #[error("blob is {0} bytes, expected {expected}", expected = crate::keys::BLOB_LEN)]
    Length(usize),

    #[error("SHA-1 tag mismatch")]
    Checksum,

    #[error("Aksv is zero")]
    ZeroAksv,
}

pub type Result<T> = std::result::Result<T, HdcpError>;
