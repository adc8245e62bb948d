/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
pub mod engine;
pub mod regs;
pub mod sha;

pub use engine::{RegisterCipher, ShaPath};
pub use regs::RegisterIo;

use crate::error::Result;
use crate::keys::DerivedKey;

/// The transmitter's cipher block.
///
/// Everything secret stays behind this trait: the engine sees deviated key
/// rows one at a time and hands back only An, Ri, M0 and digests.
#[async_trait::async_trait]
pub trait CipherEngine: Send {
    /// Latch a fresh 64-bit An from the hardware generator.
    async fn an_generate(&mut self) -> Result<[u8; 8]>;

    async fn set_repeater(&mut self, repeater: bool) -> Result<()>;

    /// Reset the Km accumulator before a new Bksv is summed in.
    async fn km_clear(&mut self) -> Result<()>;

    /// Add one deviated key row (selected by a set Bksv bit) into Km.
    async fn km_accumulate(&mut self, index: usize, key: &DerivedKey) -> Result<()>;

    /// Run the authentication computation and return the fresh R0.
    async fn authenticate(&mut self) -> Result<u16>;

    /// Current Ri from the link integrity register.
    async fn ri_get(&mut self) -> Result<u16>;

    /// M0, least significant byte first.
    async fn m0_get(&mut self) -> Result<[u8; 8]>;

    async fn sha1(&mut self, message: &[u8]) -> Result<[u8; sha::DIGEST_LEN]>;

    /// Mark the device authenticated, then turn encryption on.
    async fn commit_authenticated(&mut self) -> Result<()>;

    /// Drop encryption and the authenticated flag. Safe to call repeatedly.
    async fn force_unauthenticate(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: CipherEngine + ?Sized> CipherEngine for Box<T> {
    async fn an_generate(&mut self) -> Result<[u8; 8]> {
        (**self).an_generate().await
    }

    async fn set_repeater(&mut self, repeater: bool) -> Result<()> {
        (**self).set_repeater(repeater).await
    }

    async fn km_clear(&mut self) -> Result<()> {
        (**self).km_clear().await
    }

    async fn km_accumulate(&mut self, index: usize, key: &DerivedKey) -> Result<()> {
        (**self).km_accumulate(index, key).await
    }

    async fn authenticate(&mut self) -> Result<u16> {
        (**self).authenticate().await
    }

    async fn ri_get(&mut self) -> Result<u16> {
        (**self).ri_get().await
    }

    async fn m0_get(&mut self) -> Result<[u8; 8]> {
        (**self).m0_get().await
    }

    async fn sha1(&mut self, message: &[u8]) -> Result<[u8; sha::DIGEST_LEN]> {
        (**self).sha1(message).await
    }

    async fn commit_authenticated(&mut self) -> Result<()> {
        (**self).commit_authenticated().await
    }

    async fn force_unauthenticate(&mut self) -> Result<()> {
        (**self).force_unauthenticate().await
    }
}
