/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
use std::fmt;

pub const KSV_LEN: usize = 5;
pub const KSV_BITS: usize = KSV_LEN * 8;

/// Known-revoked receiver KSVs, wire byte order.
pub const REVOKED_KSVS: [[u8; KSV_LEN]; 4] = [
    [0x0B, 0x37, 0x21, 0xB4, 0x7D],
    [0xF4, 0xC8, 0xDE, 0x4B, 0x82],
    [0x23, 0xDE, 0x5C, 0x43, 0x93],
    [0x4E, 0x4D, 0xC7, 0x12, 0x7C],
];

/// 40-bit key selection vector, least significant byte first as on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Ksv(pub [u8; KSV_LEN]);

impl Ksv {
    pub const ZERO: Ksv = Ksv([0; KSV_LEN]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Ksv)
    }

    pub fn bytes(&self) -> &[u8; KSV_LEN] {
        &self.0
    }

    pub fn ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; KSV_LEN]
    }

    /// A well formed KSV has exactly 20 ones and 20 zeros.
    pub fn has_valid_weight(&self) -> bool {
        self.ones() as usize == KSV_BITS / 2
    }

    pub fn is_revoked(&self) -> bool {
        REVOKED_KSVS.contains(&self.0)
    }

    pub fn is_valid(&self) -> bool {
        self.has_valid_weight() && !self.is_revoked()
    }

    /// Whether bit `index` (0 = LSB of the first byte) is set.
    pub fn bit(&self, index: usize) -> bool {
        self.0[index / 8] & (1 << (index % 8)) != 0
    }

    /// Indices of the set bits, which select the key rows summed into Km.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..KSV_BITS).filter(move |&i| self.bit(i))
    }
}

impl fmt::Display for Ksv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Ksv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ksv({})", self)
    }
}

pub fn bksv_is_valid(bksv: &Ksv) -> bool {
    bksv.is_valid()
}
