use crate::gates::Mux1;
use crate::hdl::{Bus, Circuit, InBus, InPin};
use crate::Fault;

/// `width` flip-flops, each fed through a [`Mux1`] that re-latches the
/// current value while `w` is low.
#[derive(Debug)]
pub struct Register {
    /// Value stored at the next edge when `w` is high.
    pub d: InBus,
    /// Write enable.
    pub w: InPin,
    /// Stored value.
    pub out: Bus,
}

impl Register {
    /// Builds a `width`-bit register.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for zero width.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        if width == 0 {
            return Err(Fault::InvalidWidth { width });
        }
        let mut d = Vec::with_capacity(width);
        let mut selects = Vec::with_capacity(width);
        let mut out = Vec::with_capacity(width);
        for _ in 0..width {
            let dff = c.dff();
            let mux = Mux1::new(c);
            c.bind(mux.a, dff.out);
            c.bind(dff.d, mux.out);
            d.push(mux.b);
            selects.push(mux.select);
            out.push(dff.out);
        }
        let w = c.fan_out(selects);
        Ok(Self { d, w, out })
    }
}
