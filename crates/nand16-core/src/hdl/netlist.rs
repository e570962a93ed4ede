//! Arena-indexed netlist with generation-memoized evaluation.

use std::cell::Cell;

use super::clock::{Clocked, Element};
use crate::Fault;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A readable wire: the output of a gate, pin, flip-flop or lookup tap.
///
/// Signals are plain arena indices and may be fanned out freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal(usize);

impl Signal {
    /// Arena index of the node driving this signal.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A sink that has not been wired yet.
///
/// Tokens are move-only and [`Circuit::bind`] consumes them, so a sink can be
/// wired at most once:
///
/// ```compile_fail
/// use nand16_core::Circuit;
///
/// let mut circuit = Circuit::new();
/// let (sink, _) = circuit.pin();
/// let high = circuit.constant(true);
/// circuit.bind(sink, high);
/// circuit.bind(sink, high);
/// ```
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unbound pin faults when evaluated"]
pub struct InPin(usize);

/// Readable wires, most significant bit first.
pub type Bus = Vec<Signal>;

/// Unwired sinks, most significant bit first.
pub type InBus = Vec<InPin>;

/// Handle to a host-driven input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

impl SourceId {
    /// The wire carrying this source's value.
    #[must_use]
    pub const fn signal(self) -> Signal {
        Signal(self.0)
    }
}

/// Handle to a word table owned by the circuit (RAM contents, ROM images,
/// port buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

/// The primitive NAND gate with its two sinks.
#[derive(Debug)]
pub struct Nand {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `!(a && b)`.
    pub out: Signal,
}

/// A 1-bit edge-triggered cell: `d` is sampled on tick, `out` follows on tock.
#[derive(Debug)]
pub struct Dff {
    /// Next-state input.
    pub d: InPin,
    /// Committed state.
    pub out: Signal,
}

/// A group of host-driven lines presented as one bus.
#[derive(Debug, Clone)]
pub struct BusSource {
    sources: Vec<SourceId>,
    bus: Bus,
}

impl BusSource {
    /// Creates `width` source lines, all low.
    pub fn new(circuit: &mut Circuit, width: usize) -> Self {
        let sources: Vec<SourceId> = (0..width).map(|_| circuit.source(false)).collect();
        let bus = sources.iter().map(|source| source.signal()).collect();
        Self { sources, bus }
    }

    /// The wires driven by this source.
    #[must_use]
    pub fn bus(&self) -> &[Signal] {
        &self.bus
    }

    /// Drives the low `width` bits of `value` onto the bus.
    pub fn set(&self, circuit: &mut Circuit, value: u64) {
        let width = self.sources.len();
        for (i, source) in self.sources.iter().enumerate() {
            circuit.set_source(*source, (value >> (width - 1 - i)) & 1 == 1);
        }
    }
}

/// Node counts of a built netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CircuitStats {
    /// NAND gates.
    pub nands: usize,
    /// Forwarding pins, including gate inputs.
    pub pins: usize,
    /// Flip-flops.
    pub flip_flops: usize,
    /// Table lookup taps.
    pub lookups: usize,
    /// Host-driven sources.
    pub sources: usize,
    /// Word tables.
    pub tables: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Nand(usize, usize),
    Pin(Option<usize>),
    Const(bool),
    Source(bool),
    Flop(usize),
    Lookup {
        table: usize,
        addr: Box<[usize]>,
        bit: u32,
    },
}

enum Step {
    Value(bool),
    Need(usize),
}

/// Everything combinational evaluation reads.
#[derive(Debug)]
pub(super) struct Graph {
    nodes: Vec<Node>,
    stamps: Vec<Cell<u64>>,
    values: Vec<Cell<bool>>,
    visits: Vec<Cell<u64>>,
    epoch: Cell<u64>,
    generation: u64,
    pub(super) flops: Vec<bool>,
    pub(super) tables: Vec<Vec<u16>>,
}

impl Graph {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            stamps: Vec::new(),
            values: Vec::new(),
            visits: Vec::new(),
            epoch: Cell::new(0),
            generation: 1,
            flops: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.stamps.push(Cell::new(0));
        self.values.push(Cell::new(false));
        self.visits.push(Cell::new(0));
        self.nodes.len() - 1
    }

    fn cached(&self, id: usize) -> Option<bool> {
        (self.stamps[id].get() == self.generation).then(|| self.values[id].get())
    }

    fn step(&self, id: usize) -> Result<Step, Fault> {
        Ok(match &self.nodes[id] {
            Node::Nand(a, b) => match self.cached(*a) {
                None => Step::Need(*a),
                Some(false) => Step::Value(true),
                Some(true) => self.cached(*b).map_or(Step::Need(*b), |v| Step::Value(!v)),
            },
            Node::Pin(Some(source)) => self
                .cached(*source)
                .map_or(Step::Need(*source), Step::Value),
            Node::Pin(None) => return Err(Fault::UnboundPin { node: id }),
            Node::Const(value) | Node::Source(value) => Step::Value(*value),
            Node::Flop(slot) => Step::Value(self.flops[*slot]),
            Node::Lookup { table, addr, bit } => {
                let mut index = 0_usize;
                for &line in addr.iter() {
                    match self.cached(line) {
                        Some(v) => index = (index << 1) | usize::from(v),
                        None => return Ok(Step::Need(line)),
                    }
                }
                let word = self.tables[*table].get(index).copied().unwrap_or(0);
                Step::Value((word >> bit) & 1 == 1)
            }
        })
    }

    /// Evaluates one node with an explicit stack so deep ripple chains never
    /// grow the call stack.
    pub(super) fn eval(&self, root: usize) -> Result<bool, Fault> {
        if let Some(value) = self.cached(root) {
            return Ok(value);
        }
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);

        let mut stack = vec![root];
        while let Some(&id) = stack.last() {
            if self.cached(id).is_some() {
                stack.pop();
                continue;
            }
            self.visits[id].set(epoch);
            match self.step(id)? {
                Step::Value(value) => {
                    self.stamps[id].set(self.generation);
                    self.values[id].set(value);
                    stack.pop();
                }
                Step::Need(dep) => {
                    if self.visits[dep].get() == epoch {
                        return Err(Fault::CombinationalCycle { node: dep });
                    }
                    stack.push(dep);
                }
            }
        }
        Ok(self.values[root].get())
    }

    pub(super) fn eval_bus(&self, bus: &[usize]) -> Result<u64, Fault> {
        bus.iter().try_fold(0_u64, |acc, &line| {
            Ok((acc << 1) | u64::from(self.eval(line)?))
        })
    }

    fn dependency(&self, id: usize, k: usize) -> Result<Option<usize>, Fault> {
        Ok(match &self.nodes[id] {
            Node::Nand(a, b) => [*a, *b].get(k).copied(),
            Node::Pin(Some(source)) => (k == 0).then_some(*source),
            Node::Pin(None) => return Err(Fault::UnboundPin { node: id }),
            Node::Lookup { addr, .. } => addr.get(k).copied(),
            Node::Const(_) | Node::Source(_) | Node::Flop(_) => None,
        })
    }
}

/// A gate-level circuit: the node arena, its clocked cells and its clock.
///
/// Construction hands out [`InPin`] sinks and [`Signal`] sources; once wired,
/// [`Circuit::read`] evaluates any signal against the current clock
/// generation and [`Circuit::pulse`] advances one synchronous edge.
#[derive(Debug)]
pub struct Circuit {
    graph: Graph,
    elements: Vec<Element>,
    constants: [Option<usize>; 2],
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Creates an empty circuit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            elements: Vec::new(),
            constants: [None, None],
        }
    }

    /// Current evaluation generation. Every clock edge and every host-side
    /// input change moves to a fresh generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.graph.generation
    }

    fn invalidate(&mut self) {
        self.graph.generation += 1;
    }

    /// Creates a forwarding pin: a sink and the signal that follows it.
    pub fn pin(&mut self) -> (InPin, Signal) {
        let id = self.graph.push(Node::Pin(None));
        (InPin(id), Signal(id))
    }

    /// Creates `width` forwarding pins.
    pub fn header(&mut self, width: usize) -> (InBus, Bus) {
        (0..width).map(|_| self.pin()).unzip()
    }

    /// Creates a NAND gate.
    pub fn nand(&mut self) -> Nand {
        let (a, a_line) = self.pin();
        let (b, b_line) = self.pin();
        let out = self.graph.push(Node::Nand(a_line.0, b_line.0));
        Nand {
            a,
            b,
            out: Signal(out),
        }
    }

    /// A constant line. Repeated calls share one node per level.
    pub fn constant(&mut self, value: bool) -> Signal {
        let slot = usize::from(value);
        if let Some(id) = self.constants[slot] {
            return Signal(id);
        }
        let id = self.graph.push(Node::Const(value));
        self.constants[slot] = Some(id);
        Signal(id)
    }

    /// The low `width` bits of `value` as constant lines.
    pub fn constant_bus(&mut self, width: usize, value: u64) -> Bus {
        (0..width)
            .map(|i| {
                let shift = width - 1 - i;
                self.constant(shift < 64 && (value >> shift) & 1 == 1)
            })
            .collect()
    }

    /// Creates a host-driven line.
    pub fn source(&mut self, value: bool) -> SourceId {
        SourceId(self.graph.push(Node::Source(value)))
    }

    /// Drives a host line. Changing it starts a fresh generation.
    pub fn set_source(&mut self, source: SourceId, value: bool) {
        if let Some(Node::Source(current)) = self.graph.nodes.get_mut(source.0) {
            if *current != value {
                *current = value;
                self.invalidate();
            }
        }
    }

    /// Wires `sink` to follow `source`, consuming the sink.
    pub fn bind(&mut self, sink: InPin, source: Signal) {
        if let Some(Node::Pin(slot)) = self.graph.nodes.get_mut(sink.0) {
            debug_assert!(slot.is_none(), "sink tokens are minted once");
            *slot = Some(source.0);
        }
        self.invalidate();
    }

    /// Wires each sink to the source at the same position.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::WidthMismatch`] when the widths differ.
    pub fn bind_bus(&mut self, sinks: InBus, sources: &[Signal]) -> Result<(), Fault> {
        if sinks.len() != sources.len() {
            return Err(Fault::WidthMismatch {
                expected: sinks.len(),
                found: sources.len(),
            });
        }
        for (sink, source) in sinks.into_iter().zip(sources) {
            self.bind(sink, *source);
        }
        Ok(())
    }

    /// Merges several sinks into one: binding the result drives all of them.
    pub fn fan_out(&mut self, sinks: Vec<InPin>) -> InPin {
        let (sink, line) = self.pin();
        for target in sinks {
            self.bind(target, line);
        }
        sink
    }

    /// Bitwise [`Circuit::fan_out`] over equally wide buses.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::WidthMismatch`] when the buses differ in width.
    pub fn fan_out_bus(&mut self, buses: Vec<InBus>) -> Result<InBus, Fault> {
        let width = buses.first().map_or(0, Vec::len);
        if let Some(bad) = buses.iter().find(|bus| bus.len() != width) {
            return Err(Fault::WidthMismatch {
                expected: width,
                found: bad.len(),
            });
        }
        let (sinks, lines) = self.header(width);
        for bus in buses {
            self.bind_bus(bus, &lines)?;
        }
        Ok(sinks)
    }

    /// Creates a flip-flop and registers it with the clock.
    pub fn dff(&mut self) -> Dff {
        let (d, d_line) = self.pin();
        let slot = self.graph.flops.len();
        self.graph.flops.push(false);
        let out = self.graph.push(Node::Flop(slot));
        self.elements.push(Element::Flop {
            d: d_line.0,
            slot,
            next: false,
        });
        Dff {
            d,
            out: Signal(out),
        }
    }

    /// Adds a word table.
    pub fn table(&mut self, words: Vec<u16>) -> TableId {
        self.graph.tables.push(words);
        TableId(self.graph.tables.len() - 1)
    }

    /// Contents of a table.
    #[must_use]
    pub fn table_words(&self, table: TableId) -> &[u16] {
        &self.graph.tables[table.0]
    }

    /// Overwrites the leading words of a table from the host side.
    pub fn load_table(&mut self, table: TableId, words: &[u16]) {
        let target = &mut self.graph.tables[table.0];
        let len = target.len().min(words.len());
        target[..len].copy_from_slice(&words[..len]);
        self.invalidate();
    }

    /// Word-wide read tap: the table word selected by `addr`, as `width`
    /// lines. Addresses past the end read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] unless `1 <= width <= 16`.
    pub fn lookup(&mut self, table: TableId, addr: &[Signal], width: usize) -> Result<Bus, Fault> {
        if !(1..=16).contains(&width) {
            return Err(Fault::InvalidWidth { width });
        }
        let lines: Box<[usize]> = addr.iter().map(|line| line.0).collect();
        Ok((0..width)
            .map(|i| {
                let bit = u32::try_from(width - 1 - i).unwrap_or(0);
                Signal(self.graph.push(Node::Lookup {
                    table: table.0,
                    addr: lines.clone(),
                    bit,
                }))
            })
            .collect())
    }

    /// Clocked write port: when `write` is high at an edge, the word on `data`
    /// is stored at `addr` on tock.
    pub fn table_writer(&mut self, table: TableId, addr: &[Signal], data: &[Signal], write: Signal) {
        self.elements.push(Element::Store {
            table: table.0,
            addr: addr.iter().map(|line| line.0).collect(),
            data: data.iter().map(|line| line.0).collect(),
            write: write.0,
            pending: None,
        });
    }

    /// Evaluates a signal against the current generation.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnboundPin`] or [`Fault::CombinationalCycle`] for a
    /// malformed netlist.
    pub fn read(&self, signal: Signal) -> Result<bool, Fault> {
        self.graph.eval(signal.0)
    }

    /// Evaluates a bus as an unsigned number, most significant bit first.
    ///
    /// # Errors
    ///
    /// See [`Circuit::read`].
    pub fn read_bus(&self, bus: &[Signal]) -> Result<u64, Fault> {
        bus.iter()
            .try_fold(0_u64, |acc, line| Ok((acc << 1) | u64::from(self.read(*line)?)))
    }

    /// [`Circuit::read_bus`] truncated to a 16-bit word.
    ///
    /// # Errors
    ///
    /// See [`Circuit::read`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_word(&self, bus: &[Signal]) -> Result<u16, Fault> {
        self.read_bus(bus).map(|value| value as u16)
    }

    /// One synchronous clock edge over the circuit's own cells.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults raised while sampling inputs.
    pub fn pulse(&mut self) -> Result<(), Fault> {
        self.pulse_with(&mut [])
    }

    /// One synchronous clock edge that also drives external clocked chips:
    /// every cell and chip ticks against the pre-edge generation, then every
    /// cell and chip tocks, then a fresh generation begins.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults raised while sampling inputs.
    pub fn pulse_with(&mut self, chips: &mut [&mut dyn Clocked]) -> Result<(), Fault> {
        for element in &mut self.elements {
            element.tick(&self.graph)?;
        }
        for chip in chips.iter_mut() {
            chip.tick(self)?;
        }
        for element in &mut self.elements {
            element.tock(&mut self.graph);
        }
        for chip in chips.iter_mut() {
            chip.tock(self);
        }
        self.invalidate();
        Ok(())
    }

    /// Checks that every sink is bound and that no combinational loop exists
    /// outside the flip-flops.
    ///
    /// # Errors
    ///
    /// Returns the first [`Fault::UnboundPin`] or [`Fault::CombinationalCycle`].
    pub fn validate(&self) -> Result<(), Fault> {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;

        let mut color = vec![WHITE; self.graph.nodes.len()];
        for start in 0..self.graph.nodes.len() {
            if color[start] != WHITE {
                continue;
            }
            color[start] = GREY;
            let mut stack = vec![(start, 0_usize)];
            while let Some(top) = stack.last_mut() {
                let (node, k) = *top;
                if let Some(dep) = self.graph.dependency(node, k)? {
                    top.1 += 1;
                    match color[dep] {
                        WHITE => {
                            color[dep] = GREY;
                            stack.push((dep, 0));
                        }
                        GREY => return Err(Fault::CombinationalCycle { node: dep }),
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    /// Counts nodes by kind.
    #[must_use]
    pub fn stats(&self) -> CircuitStats {
        let mut stats = CircuitStats {
            tables: self.graph.tables.len(),
            ..CircuitStats::default()
        };
        for node in &self.graph.nodes {
            match node {
                Node::Nand(..) => stats.nands += 1,
                Node::Pin(_) => stats.pins += 1,
                Node::Flop(_) => stats.flip_flops += 1,
                Node::Lookup { .. } => stats.lookups += 1,
                Node::Source(_) => stats.sources += 1,
                Node::Const(_) => {}
            }
        }
        stats
    }
}
