/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
/// Receiver-side HDCP port offsets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Bksv = 0x00,
    Ri = 0x08,
    Aksv = 0x10,
    An = 0x18,
    VPrime = 0x20,
    Bcaps = 0x40,
    Bstatus = 0x41,
    KsvFifo = 0x43,
}

const BCAPS_REPEATER: u8 = 1 << 6;
const BCAPS_FIFO_READY: u8 = 1 << 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bcaps(pub u8);

impl Bcaps {
    pub fn is_repeater(self) -> bool {
        self.0 & BCAPS_REPEATER != 0
    }

    pub fn fifo_ready(self) -> bool {
        self.0 & BCAPS_FIFO_READY != 0
    }
}

const BSTATUS_DEVICE_COUNT: u8 = 0x7F;
const BSTATUS_MAX_DEVS_EXCEEDED: u8 = 1 << 7;
const BSTATUS_MAX_CASCADE_EXCEEDED: u8 = 1 << 3;

/// Repeater status as read from the receiver, byte order preserved for V-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bstatus(pub [u8; 2]);

impl Bstatus {
    /// Downstream device count; a 7-bit field, so never above 127.
    pub fn device_count(self) -> usize {
        (self.0[0] & BSTATUS_DEVICE_COUNT) as usize
    }

    pub fn max_devs_exceeded(self) -> bool {
        self.0[0] & BSTATUS_MAX_DEVS_EXCEEDED != 0
    }

    pub fn max_cascade_exceeded(self) -> bool {
        self.0[1] & BSTATUS_MAX_CASCADE_EXCEEDED != 0
    }

    pub fn bytes(self) -> [u8; 2] {
        self.0
    }
}

/// V' travels as H0..H4, each word least significant byte first, while a
/// SHA-1 digest stores its words big-endian. Swapping is its own inverse.
pub fn swap_v_prime_words(v: [u8; 20]) -> [u8; 20] {
    let mut out = v;
    for word in out.chunks_exact_mut(4) {
        word.reverse();
    }
    out
}
