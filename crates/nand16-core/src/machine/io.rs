//! The port bus as a clocked chip.

use crate::hdl::{Bus, Circuit, Clocked, Signal, TableId};
use crate::memory::ADDRESS_SPACE_WORDS;
use crate::peripherals::IoController;
use crate::Fault;

/// Attaches an [`IoController`] to the CPU's port lines.
///
/// Devices update once per edge. A CPU write sampled at edge `k` lands in the
/// output buffers on that edge's tock, so devices observe it at edge `k + 1`.
/// Device inputs are copied into a lookup table on every tock, so the CPU
/// reads them after the same edge. Inputs written by the host between edges
/// need [`HardwareIoController::sync_inputs`].
#[derive(Debug)]
pub struct HardwareIoController {
    controller: IoController,
    table: TableId,
    addr: Bus,
    data: Bus,
    write: Signal,
    read: Bus,
    pending: Option<(u16, u16)>,
}

impl HardwareIoController {
    /// Wires a controller to port address, write data and write strobe lines.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::WidthMismatch`] unless both buses are 16 bits wide.
    pub fn new(c: &mut Circuit, addr: Bus, data: Bus, write: Signal) -> Result<Self, Fault> {
        for bus in [&addr, &data] {
            if bus.len() != 16 {
                return Err(Fault::WidthMismatch {
                    expected: 16,
                    found: bus.len(),
                });
            }
        }
        let table = c.table(vec![0; ADDRESS_SPACE_WORDS]);
        let read = c.lookup(table, &addr, 16)?;
        Ok(Self {
            controller: IoController::new(),
            table,
            addr,
            data,
            write,
            read,
            pending: None,
        })
    }

    /// Word offered by devices on the addressed port.
    #[must_use]
    pub fn read_lines(&self) -> &[Signal] {
        &self.read
    }

    /// The device registry.
    #[must_use]
    pub const fn controller(&self) -> &IoController {
        &self.controller
    }

    /// The device registry, mutably.
    pub const fn controller_mut(&mut self) -> &mut IoController {
        &mut self.controller
    }

    /// Copies the offered input words into the circuit's lookup table.
    pub fn sync_inputs(&self, circuit: &mut Circuit) {
        circuit.load_table(self.table, self.controller.ports().inputs());
    }
}

impl Clocked for HardwareIoController {
    fn tick(&mut self, circuit: &Circuit) -> Result<(), Fault> {
        self.controller.update_devices();
        self.pending = if circuit.read(self.write)? {
            Some((circuit.read_word(&self.addr)?, circuit.read_word(&self.data)?))
        } else {
            None
        };
        Ok(())
    }

    fn tock(&mut self, circuit: &mut Circuit) {
        self.sync_inputs(circuit);
        if let Some((port, value)) = self.pending.take() {
            self.controller.latch_output(port, value);
        }
    }
}
