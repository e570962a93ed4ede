//! Signal layer: wires, the NAND primitive, flip-flops and the clock.

mod clock;
mod netlist;

pub use clock::Clocked;
pub use netlist::{
    Bus, BusSource, Circuit, CircuitStats, Dff, InBus, InPin, Nand, Signal, SourceId, TableId,
};
