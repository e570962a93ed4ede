use super::{IoDevice, PortBuffers};

/// Records each new value the CPU writes to one port.
///
/// Repeats of the previous value are dropped, and the port starts at zero,
/// so writing zero first is not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoListener {
    port: u16,
    last: u16,
    output: Vec<u16>,
}

impl IoListener {
    /// Listens on `port`.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            last: 0,
            output: Vec::new(),
        }
    }

    /// Values seen so far, oldest first.
    #[must_use]
    pub fn output(&self) -> &[u16] {
        &self.output
    }

    /// Forgets recorded values; the last seen value is kept.
    pub fn clear(&mut self) {
        self.output.clear();
    }
}

impl IoDevice for IoListener {
    fn input_ports(&self) -> Vec<u16> {
        vec![self.port]
    }

    fn output_ports(&self) -> Vec<u16> {
        Vec::new()
    }

    fn update(&mut self, ports: &mut PortBuffers) {
        let value = ports.read_output(self.port);
        if value != self.last {
            self.last = value;
            self.output.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IoListener;
    use crate::peripherals::{IoDevice, PortBuffers};

    #[test]
    fn records_changes_only() {
        let mut ports = PortBuffers::default();
        let mut listener = IoListener::new(4);
        for value in [0, 5, 5, 7, 0, 0, 7] {
            ports.latch_output(4, value);
            listener.update(&mut ports);
        }
        assert_eq!(listener.output(), &[5, 7, 0, 7]);
    }
}
