//! Socket-to-GPIO routing for the ESP32-S3 mainboard.
//!
//! Single source of truth: the ESP adapter looks sockets up here rather
//! than hard-coding GPIO numbers. Entries are indexed by socket pin 3..=9;
//! `UNROUTED` marks a pin the board does not connect.

use crate::board::{SocketPin, SocketType};

/// Pin is not wired to any GPIO on this board.
pub const UNROUTED: i32 = -1;

#[derive(Debug, Clone, Copy)]
pub struct SocketMap {
    pub number: u8,
    pub types: &'static [SocketType],
    /// GPIO per socket pin, `[P3, P4, P5, P6, P7, P8, P9]`.
    pub gpio: [i32; 7],
}

impl SocketMap {
    /// GPIO number behind `pin`, or `None` if the board leaves it open.
    pub const fn gpio(&self, pin: SocketPin) -> Option<i32> {
        let n = self.gpio[pin.index()];
        if n == UNROUTED { None } else { Some(n) }
    }
}

// ---------------------------------------------------------------------------
// Sockets 1–3: full GPIO headers (bit-banged bus modules go here)
// ---------------------------------------------------------------------------

const SOCKET_1: SocketMap = SocketMap {
    number: 1,
    types: &[SocketType::Y, SocketType::S, SocketType::X],
    gpio: [1, 2, 3, 10, 11, 13, 12],
};

const SOCKET_2: SocketMap = SocketMap {
    number: 2,
    types: &[SocketType::Y, SocketType::X],
    gpio: [4, 5, 6, 7, 15, 16, 17],
};

const SOCKET_3: SocketMap = SocketMap {
    number: 3,
    types: &[SocketType::Y, SocketType::X, SocketType::P],
    gpio: [8, 9, 14, 18, 21, 38, 39],
};

// ---------------------------------------------------------------------------
// Socket 4: analog + I²C, three GPIO only
// ---------------------------------------------------------------------------

const SOCKET_4: SocketMap = SocketMap {
    number: 4,
    types: &[SocketType::A, SocketType::I, SocketType::X],
    gpio: [40, 41, 42, UNROUTED, UNROUTED, 47, 48],
};

// ---------------------------------------------------------------------------
// Socket 5: UART (console header shares GPIO 43/44)
// ---------------------------------------------------------------------------

const SOCKET_5: SocketMap = SocketMap {
    number: 5,
    types: &[SocketType::U, SocketType::X],
    gpio: [45, 43, 44, UNROUTED, UNROUTED, UNROUTED, UNROUTED],
};

pub const SOCKETS: [SocketMap; 5] = [SOCKET_1, SOCKET_2, SOCKET_3, SOCKET_4, SOCKET_5];

pub fn socket_map(number: u8) -> Option<&'static SocketMap> {
    SOCKETS.iter().find(|s| s.number == number)
}
