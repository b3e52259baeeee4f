//! Shared rigs for the integration tests.
//!
//! Builds simulation boards with slaves and traced lines already attached,
//! and decodes traces back into protocol-level events.

use modbang::adapters::sim::{SimBoard, SimDelay, SimLine, SimSlave, Trace};
use modbang::board::{SocketPin, SocketType};
use modbang::bus::{ChipSelect, ClockMode, Polarity, SoftSpi};

pub type SimSpi = SoftSpi<SimLine, SimLine, SimLine, SimDelay>;

// ── Loopback bus ──────────────────────────────────────────────

/// A bus whose MISO is jumpered to MOSI, with every line traced.
pub struct LoopbackRig {
    pub spi: SimSpi,
    pub cs: ChipSelect<SimLine>,
    pub trace: Trace,
}

impl LoopbackRig {
    pub fn new(mode: ClockMode) -> Self {
        let trace = Trace::new();
        let mosi = SimLine::new("mosi").traced(&trace);
        let miso = mosi.clone();
        let spi = SoftSpi::new(
            SimLine::new("sck").traced(&trace),
            mosi,
            miso,
            SimDelay::new(),
            mode,
            100,
        )
        .unwrap();
        let cs = ChipSelect::active_low(SimLine::new("cs").traced(&trace)).unwrap();
        trace.clear();
        Self { spi, cs, trace }
    }
}

// ── Boards ────────────────────────────────────────────────────

/// Board with one socket of `types`, a slave wired to its bus pins.
pub fn board_with_slave(socket: u8, types: &[SocketType], slave: &SimSlave) -> SimBoard {
    let mut board = SimBoard::new().with_socket(socket, types);
    board.attach_slave(socket, slave);
    board
}

/// Attach a traced wire named after the pin to every pin of `socket`.
pub fn trace_all_pins(board: &mut SimBoard, socket: u8, trace: &Trace) {
    for pin in SocketPin::ALL {
        board.attach(socket, pin, SimLine::new(pin.name()).traced(trace));
    }
}

// ── Trace decoding ────────────────────────────────────────────

/// `(rs, nibble)` present at each rising edge of `e`. `data` names the
/// D4..D7 lines in nibble bit order.
pub fn lcd_nibbles(trace: &Trace, e: &str, rs: &str, data: [&str; 4]) -> Vec<(bool, u8)> {
    let mut rs_level = false;
    let mut nibble = 0u8;
    let mut out = Vec::new();
    for (name, level) in trace.events() {
        if name == rs {
            rs_level = level;
        } else if name == e {
            if level {
                out.push((rs_level, nibble));
            }
        } else if let Some(bit) = data.iter().position(|&d| d == name) {
            if level {
                nibble |= 1 << bit;
            } else {
                nibble &= !(1 << bit);
            }
        }
    }
    out
}

/// Echo levels for one ping lasting `ticks` polling ticks.
pub fn echo_for(ticks: usize) -> Vec<bool> {
    let mut levels = vec![false];
    levels.extend(std::iter::repeat_n(true, ticks));
    levels.push(false);
    levels
}

pub const MODES: [ClockMode; 4] = [
    ClockMode::MODE_0,
    ClockMode::MODE_1,
    ClockMode::MODE_2,
    ClockMode::MODE_3,
];

pub fn slave(mode: ClockMode, width: u8) -> SimSlave {
    SimSlave::new(mode, Polarity::ActiveLow, width)
}
