/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
//! HDCP 1.x transmitter authentication.
//!
//! The crate drives a receiver (or repeater) through the three authentication
//! phases over the DDC sideband, using a register-mapped cipher block for An,
//! Km/Ri computation and the repeater V-match, and keeps verifying the link
//! once it is up.
pub mod auth;
pub mod cipher;
pub mod config;
pub mod controller;
pub mod ddc;
pub mod error;
pub mod keys;
pub mod ksv;

pub use auth::{AuthState, Authenticator, HdcpSession};
pub use cipher::{CipherEngine, RegisterCipher, RegisterIo, ShaPath};
pub use config::HdcpConfig;
pub use controller::{Hdcp, LinkStatus};
pub use ddc::{Ddc, DdcTransport};
pub use error::{HdcpError, Result};
pub use keys::{KeyTable, Provisioning, SecureStorage};
pub use ksv::{Ksv, bksv_is_valid};
