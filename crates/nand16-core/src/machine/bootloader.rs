//! Copies the ROM image into working memory, one word per edge.

use crate::cpu::ProgramCounter;
use crate::gates::{nor, xor, IsZero};
use crate::hdl::{Bus, Circuit, InPin, Signal};
use crate::memory::ADDRESS_SPACE_WORDS;
use crate::Fault;

/// Self-terminating ROM sequencer.
///
/// Presents `(i, rom[i])` with `w` high for edges `0..rom.len()`, then holds
/// `w` low until `rst` is pulsed, which restarts the sequence at zero.
#[derive(Debug)]
pub struct Bootloader {
    /// Restart the load.
    pub rst: InPin,
    /// Write strobe; high while loading.
    pub w: Signal,
    /// Address being written.
    pub addr: Bus,
    /// Word being written.
    pub data: Bus,
}

impl Bootloader {
    /// Builds a sequencer for `rom`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomTooLarge`] unless the ROM is shorter than the
    /// address space, since the counter must be able to reach its length.
    pub fn new(c: &mut Circuit, rom: &[u16]) -> Result<Self, Fault> {
        if rom.len() >= ADDRESS_SPACE_WORDS {
            return Err(Fault::RomTooLarge { len: rom.len() });
        }
        let (rst, reset) = c.pin();
        let counter = ProgramCounter::new(c, 16)?;
        let zero = c.constant_bus(16, 0);
        c.bind_bus(counter.input, &zero)?;
        c.bind(counter.w, reset);

        let words =
            u64::try_from(rom.len()).map_err(|_| Fault::RomTooLarge { len: rom.len() })?;
        let len = c.constant_bus(16, words);
        let diff: Bus = counter
            .out
            .iter()
            .zip(&len)
            .map(|(&bit, &want)| xor(c, bit, want))
            .collect();
        let done = IsZero::new(c, 16)?;
        c.bind_bus(done.input, &diff)?;
        let w = nor(c, reset, done.out);
        c.bind(counter.en, w);

        let table = c.table(rom.to_vec());
        let data = c.lookup(table, &counter.out, 16)?;
        Ok(Self {
            rst,
            w,
            addr: counter.out,
            data,
        })
    }
}
