//! Host simulation board.
//!
//! Stands in for real hardware on non-ESP targets:
//!
//! - [`SimLine`]: a cloneable handle to one simulated wire. Clones share
//!   the level, so `let miso = mosi.clone()` is a loopback jumper.
//! - [`Trace`]: ordered record of every level written to traced lines.
//! - [`SimDelay`]: `DelayNs` that only adds up the requested time.
//! - [`SimSlave`]: a shift-register device answering on SCK/MOSI/MISO/CS.
//! - [`SimBoard`]: a [`Mainboard`] with configurable sockets.
//!
//! Single-threaded by construction (`Rc`), like the drivers it exercises.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::board::{Mainboard, Socket, SocketPin, SocketType, spi_pins};
use crate::bus::clock::{ClockMode, Edge};
use crate::bus::select::Polarity;
use crate::error::SocketError;

// ── Trace ─────────────────────────────────────────────────────

/// Shared log of `(line name, level)` writes in program order.
#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<(&'static str, bool)>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(&'static str, bool)> {
        self.0.borrow().clone()
    }

    /// Every level written to `name`, in order.
    pub fn levels(&self, name: &str) -> Vec<bool> {
        self.0
            .borrow()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|&(_, level)| level)
            .collect()
    }

    /// Index of the first write of `level` to `name`.
    pub fn first(&self, name: &str, level: bool) -> Option<usize> {
        self.0
            .borrow()
            .iter()
            .position(|&(n, l)| n == name && l == level)
    }

    /// Index of the last write of any level to `name`.
    pub fn last(&self, name: &str) -> Option<usize> {
        self.0.borrow().iter().rposition(|&(n, _)| n == name)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn record(&self, name: &'static str, level: bool) {
        self.0.borrow_mut().push((name, level));
    }
}

// ── SimDelay ──────────────────────────────────────────────────

/// Accumulates requested delay instead of sleeping.
#[derive(Clone, Default)]
pub struct SimDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns.get()
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
    }
}

// ── SimLine ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Sck,
    Mosi,
    Miso,
    Cs,
}

enum Node {
    /// Plain wire: reads return the last level written.
    Wire(bool),
    /// Input fed from a queue; `rest` once the queue runs dry.
    Script { queue: VecDeque<bool>, rest: bool },
    /// One terminal of a [`SimSlave`].
    Slave {
        state: Rc<RefCell<SlaveState>>,
        role: Role,
    },
}

#[derive(Clone)]
pub struct SimLine {
    name: &'static str,
    node: Rc<RefCell<Node>>,
    trace: Option<Trace>,
}

impl SimLine {
    pub fn new(name: &'static str) -> Self {
        Self::with_node(name, Node::Wire(false))
    }

    /// An input that plays back `levels`, then holds `rest`.
    pub fn scripted(name: &'static str, levels: &[bool], rest: bool) -> Self {
        Self::with_node(
            name,
            Node::Script {
                queue: levels.iter().copied().collect(),
                rest,
            },
        )
    }

    /// Record this handle's writes into `trace`.
    pub fn traced(mut self, trace: &Trace) -> Self {
        self.trace = Some(trace.clone());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current level without consuming script entries.
    pub fn level(&self) -> bool {
        match &*self.node.borrow() {
            Node::Wire(level) => *level,
            Node::Script { queue, rest } => queue.front().copied().unwrap_or(*rest),
            Node::Slave { state, role } => state.borrow().level(*role),
        }
    }

    /// Append levels to a scripted input. Ignored on other lines.
    pub fn push_levels(&self, levels: &[bool]) {
        if let Node::Script { queue, .. } = &mut *self.node.borrow_mut() {
            queue.extend(levels.iter().copied());
        }
    }

    fn with_node(name: &'static str, node: Node) -> Self {
        Self {
            name,
            node: Rc::new(RefCell::new(node)),
            trace: None,
        }
    }

    fn write(&mut self, high: bool) {
        if let Some(trace) = &self.trace {
            trace.record(self.name, high);
        }
        match &mut *self.node.borrow_mut() {
            Node::Wire(level) => *level = high,
            Node::Script { .. } => {}
            Node::Slave { state, role } => state.borrow_mut().on_write(*role, high),
        }
    }

    fn read(&mut self) -> bool {
        match &mut *self.node.borrow_mut() {
            Node::Wire(level) => *level,
            Node::Script { queue, rest } => queue.pop_front().unwrap_or(*rest),
            Node::Slave { state, role } => state.borrow_mut().on_read(*role),
        }
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read())
    }
}

// ── SimSlave ──────────────────────────────────────────────────

struct SlaveState {
    mode: ClockMode,
    polarity: Polarity,
    width: u8,
    responses: VecDeque<u32>,
    out_bits: VecDeque<bool>,
    miso: bool,
    advance: bool,
    sck: bool,
    mosi: bool,
    selected: bool,
    rx: Vec<bool>,
    frames: Vec<Vec<bool>>,
}

impl SlaveState {
    fn next_bit(&mut self) -> bool {
        if self.out_bits.is_empty() {
            if let Some(word) = self.responses.pop_front() {
                self.out_bits
                    .extend((0..self.width).rev().map(|i| (word >> i) & 1 != 0));
            }
        }
        self.out_bits.pop_front().unwrap_or(false)
    }

    fn on_write(&mut self, role: Role, high: bool) {
        match role {
            Role::Cs => {
                let select = high == self.polarity.asserted().is_high();
                if select && !self.selected {
                    self.selected = true;
                    self.rx.clear();
                    self.miso = false;
                    // Leading-edge samplers expect the first bit before any edge.
                    self.advance = self.mode.samples_on_leading_edge();
                } else if !select && self.selected {
                    self.selected = false;
                    self.advance = false;
                    self.out_bits.clear();
                    self.frames.push(std::mem::take(&mut self.rx));
                }
            }
            Role::Sck => {
                if high == self.sck {
                    return;
                }
                self.sck = high;
                if !self.selected {
                    return;
                }
                let sample_edge = match self.mode.sample {
                    Edge::Rising => high,
                    Edge::Falling => !high,
                };
                if sample_edge {
                    self.rx.push(self.mosi);
                } else {
                    self.advance = true;
                }
            }
            Role::Mosi => self.mosi = high,
            Role::Miso => {}
        }
    }

    fn on_read(&mut self, role: Role) -> bool {
        if role == Role::Miso && self.selected && self.advance {
            self.advance = false;
            self.miso = self.next_bit();
        }
        self.level(role)
    }

    fn level(&self, role: Role) -> bool {
        match role {
            Role::Sck => self.sck,
            Role::Mosi => self.mosi,
            Role::Miso => self.miso,
            Role::Cs => self.selected == self.polarity.asserted().is_high(),
        }
    }
}

/// Shift-register device model: latches MOSI on its sample edge, shifts
/// queued response words out on MISO, MSB first, `width` bits per word.
#[derive(Clone)]
pub struct SimSlave {
    state: Rc<RefCell<SlaveState>>,
}

impl SimSlave {
    pub fn new(mode: ClockMode, polarity: Polarity, width: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(SlaveState {
                mode,
                polarity,
                width,
                responses: VecDeque::new(),
                out_bits: VecDeque::new(),
                miso: false,
                advance: false,
                sck: mode.idle.is_high(),
                mosi: false,
                selected: false,
                rx: Vec::new(),
                frames: Vec::new(),
            })),
        }
    }

    /// Queue a word to shift out on the next clocked bits.
    pub fn respond(&self, word: u32) {
        self.state.borrow_mut().responses.push_back(word);
    }

    pub fn respond_all(&self, words: &[u32]) {
        self.state.borrow_mut().responses.extend(words.iter().copied());
    }

    pub fn sck(&self) -> SimLine {
        self.terminal("sck", Role::Sck)
    }

    pub fn mosi(&self) -> SimLine {
        self.terminal("mosi", Role::Mosi)
    }

    pub fn miso(&self) -> SimLine {
        self.terminal("miso", Role::Miso)
    }

    pub fn cs(&self) -> SimLine {
        self.terminal("cs", Role::Cs)
    }

    pub fn is_selected(&self) -> bool {
        self.state.borrow().selected
    }

    /// Raw MOSI bits latched in each completed select frame.
    pub fn frames(&self) -> Vec<Vec<bool>> {
        self.state.borrow().frames.clone()
    }

    /// Completed frames split into `width`-bit words. A trailing partial
    /// word is packed as-is.
    pub fn received_words(&self) -> Vec<Vec<u32>> {
        let state = self.state.borrow();
        let width = usize::from(state.width.max(1));
        state
            .frames
            .iter()
            .map(|bits| {
                bits.chunks(width)
                    .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 1) | u32::from(b)))
                    .collect()
            })
            .collect()
    }

    fn terminal(&self, name: &'static str, role: Role) -> SimLine {
        SimLine::with_node(
            name,
            Node::Slave {
                state: Rc::clone(&self.state),
                role,
            },
        )
    }
}

// ── SimBoard ──────────────────────────────────────────────────

/// Simulated mainboard with user-defined sockets.
#[derive(Default)]
pub struct SimBoard {
    sockets: Vec<Socket>,
    lines: HashMap<(u8, SocketPin), SimLine>,
    reserved: HashSet<(u8, SocketPin)>,
    unrouted: HashSet<(u8, SocketPin)>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socket(mut self, number: u8, types: &[SocketType]) -> Self {
        self.sockets.retain(|s| s.number() != number);
        self.sockets.push(Socket::new(number, types));
        self
    }

    /// Connect a pin to an existing line (a slave terminal, a script, a trace).
    pub fn attach(&mut self, socket: u8, pin: SocketPin, line: SimLine) {
        self.lines.insert((socket, pin), line);
    }

    /// Connect a [`SimSlave`] to the standard bus pins of `socket`.
    pub fn attach_slave(&mut self, socket: u8, slave: &SimSlave) {
        self.attach(socket, spi_pins::CS, slave.cs());
        self.attach(socket, spi_pins::SCK, slave.sck());
        self.attach(socket, spi_pins::MOSI, slave.mosi());
        self.attach(socket, spi_pins::MISO, slave.miso());
    }

    /// Handle to the wire on a pin, creating a plain wire if needed.
    pub fn line(&mut self, socket: u8, pin: SocketPin) -> SimLine {
        self.lines
            .entry((socket, pin))
            .or_insert_with(|| SimLine::new(pin.name()))
            .clone()
    }

    /// Make reservations of this pin fail with `PinNotRouted`.
    pub fn unroute(&mut self, socket: u8, pin: SocketPin) {
        self.unrouted.insert((socket, pin));
    }

    pub fn is_reserved(&self, socket: u8, pin: SocketPin) -> bool {
        self.reserved.contains(&(socket, pin))
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    fn claim(&mut self, socket: &Socket, pin: SocketPin) -> Result<SimLine, SocketError> {
        let key = (socket.number(), pin);
        if self.unrouted.contains(&key) {
            return Err(SocketError::PinNotRouted {
                socket: socket.number(),
                pin: pin.number(),
            });
        }
        if !self.reserved.insert(key) {
            return Err(SocketError::PinInUse {
                socket: socket.number(),
                pin: pin.number(),
            });
        }
        Ok(self.line(socket.number(), pin))
    }
}

impl Mainboard for SimBoard {
    type Output = SimLine;
    type Input = SimLine;

    fn socket(&self, number: u8) -> Result<Socket, SocketError> {
        self.sockets
            .iter()
            .find(|s| s.number() == number)
            .cloned()
            .ok_or(SocketError::NoSuchSocket(number))
    }

    fn reserve_output(
        &mut self,
        socket: &Socket,
        pin: SocketPin,
        initial: bool,
    ) -> Result<SimLine, SocketError> {
        let mut line = self.claim(socket, pin)?;
        line.write(initial);
        Ok(line)
    }

    fn reserve_input(&mut self, socket: &Socket, pin: SocketPin) -> Result<SimLine, SocketError> {
        self.claim(socket, pin)
    }

    fn release(&mut self, socket: &Socket, pin: SocketPin) {
        self.reserved.remove(&(socket.number(), pin));
    }
}
