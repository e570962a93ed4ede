//! Two-phase clocking: every cell ticks against pre-edge state, then every
//! cell tocks.

use super::netlist::{Circuit, Graph};
use crate::Fault;

/// A chip with state outside the netlist that must follow the circuit clock.
///
/// Passed to [`Circuit::pulse_with`]. `tick` may only read the circuit and
/// stage the next state; `tock` commits it.
pub trait Clocked {
    /// Samples inputs and latches the next state.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn tick(&mut self, circuit: &Circuit) -> Result<(), Fault>;

    /// Commits the state latched by the last `tick`.
    fn tock(&mut self, circuit: &mut Circuit);
}

/// Clocked cells owned by the circuit itself.
#[derive(Debug, Clone)]
pub(super) enum Element {
    Flop {
        d: usize,
        slot: usize,
        next: bool,
    },
    Store {
        table: usize,
        addr: Box<[usize]>,
        data: Box<[usize]>,
        write: usize,
        pending: Option<(usize, u16)>,
    },
}

impl Element {
    pub(super) fn tick(&mut self, graph: &Graph) -> Result<(), Fault> {
        match self {
            Self::Flop { d, next, .. } => *next = graph.eval(*d)?,
            Self::Store {
                addr,
                data,
                write,
                pending,
                ..
            } => {
                *pending = if graph.eval(*write)? {
                    let index = usize::try_from(graph.eval_bus(addr)?).unwrap_or(usize::MAX);
                    #[allow(clippy::cast_possible_truncation)]
                    let word = graph.eval_bus(data)? as u16;
                    Some((index, word))
                } else {
                    None
                };
            }
        }
        Ok(())
    }

    pub(super) fn tock(&mut self, graph: &mut Graph) {
        match self {
            Self::Flop { slot, next, .. } => graph.flops[*slot] = *next,
            Self::Store { table, pending, .. } => {
                if let Some((index, word)) = pending.take() {
                    if let Some(cell) = graph.tables[*table].get_mut(index) {
                        *cell = word;
                    }
                }
            }
        }
    }
}
