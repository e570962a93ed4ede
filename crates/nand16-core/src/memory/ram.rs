use super::Register;
use crate::gates::{DMux, Mux1};
use crate::hdl::{Bus, Circuit, InBus, InPin, TableId};
use crate::Fault;

/// Word-addressed RAM built as a balanced tree of registers.
///
/// `addr[0]` selects the branch: a demux steers the write enable and a row
/// of muxes picks the read path. Reads are combinational; writes land on the
/// next edge.
#[derive(Debug)]
pub struct Ram {
    /// Word written at the next edge when `w` is high.
    pub input: InBus,
    /// Address, most significant bit first.
    pub addr: InBus,
    /// Write enable.
    pub w: InPin,
    /// Word at `addr`.
    pub out: Bus,
}

impl Ram {
    /// Builds `2^addr_bits` words of `width` bits.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for zero address bits or zero width.
    pub fn new(c: &mut Circuit, addr_bits: usize, width: usize) -> Result<Self, Fault> {
        if addr_bits == 0 {
            return Err(Fault::InvalidWidth { width: addr_bits });
        }
        let (low, high) = if addr_bits == 1 {
            (Self::leaf(c, width)?, Self::leaf(c, width)?)
        } else {
            (
                Self::new(c, addr_bits - 1, width)?,
                Self::new(c, addr_bits - 1, width)?,
            )
        };

        let steer = DMux::new(c, 1)?;
        let mut write_sel = steer.outs.iter();
        if let (Some(&to_low), Some(&to_high)) = (write_sel.next(), write_sel.next()) {
            c.bind(low.w, to_low);
            c.bind(high.w, to_high);
        }

        let mut selects = steer.addr;
        let mut out = Vec::with_capacity(width);
        for (&from_low, &from_high) in low.out.iter().zip(&high.out) {
            let mux = Mux1::new(c);
            c.bind(mux.a, from_low);
            c.bind(mux.b, from_high);
            selects.push(mux.select);
            out.push(mux.out);
        }

        let mut addr = vec![c.fan_out(selects)];
        if addr_bits > 1 {
            addr.extend(c.fan_out_bus(vec![low.addr, high.addr])?);
        }
        let input = c.fan_out_bus(vec![low.input, high.input])?;
        Ok(Self {
            input,
            addr,
            w: steer.input,
            out,
        })
    }

    fn leaf(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        let reg = Register::new(c, width)?;
        Ok(Self {
            input: reg.d,
            addr: Vec::new(),
            w: reg.w,
            out: reg.out,
        })
    }
}

/// Drop-in replacement for [`Ram`] backed by a flat word table.
///
/// Same pins, same edge semantics: the read path is a combinational lookup
/// keyed by the address bus, the write path a clocked store.
#[derive(Debug)]
pub struct VirtualRam {
    /// Word written at the next edge when `w` is high.
    pub input: InBus,
    /// Address, most significant bit first.
    pub addr: InBus,
    /// Write enable.
    pub w: InPin,
    /// Word at `addr`.
    pub out: Bus,
    /// Backing table.
    pub table: TableId,
}

impl VirtualRam {
    /// Builds `2^addr_bits` words of `width` bits.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] unless both sizes are in `1..=16`.
    pub fn new(c: &mut Circuit, addr_bits: usize, width: usize) -> Result<Self, Fault> {
        if !(1..=16).contains(&addr_bits) {
            return Err(Fault::InvalidWidth { width: addr_bits });
        }
        let (input, data) = c.header(width);
        let (addr, lines) = c.header(addr_bits);
        let (w, write) = c.pin();
        let table = c.table(vec![0; 1 << addr_bits]);
        let out = c.lookup(table, &lines, width)?;
        c.table_writer(table, &lines, &data, write);
        Ok(Self {
            input,
            addr,
            w,
            out,
            table,
        })
    }
}
