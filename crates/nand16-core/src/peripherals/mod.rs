//! Port-addressed peripheral bus shared by both backends.

/// Change-recording output device.
pub mod listener;

pub use listener::IoListener;

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::memory::ADDRESS_SPACE_WORDS;
use crate::Fault;

/// Per-port word buffers. `outputs` carries what the CPU wrote, `inputs`
/// what devices offer for the CPU to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBuffers {
    outputs: Box<[u16]>,
    inputs: Box<[u16]>,
}

impl Default for PortBuffers {
    fn default() -> Self {
        Self {
            outputs: vec![0; ADDRESS_SPACE_WORDS].into_boxed_slice(),
            inputs: vec![0; ADDRESS_SPACE_WORDS].into_boxed_slice(),
        }
    }
}

impl PortBuffers {
    /// Last word the CPU wrote to `port`.
    #[must_use]
    pub fn read_output(&self, port: u16) -> u16 {
        self.outputs[usize::from(port)]
    }

    /// Offers `value` to the CPU on `port`.
    pub fn write_input(&mut self, port: u16, value: u16) {
        self.inputs[usize::from(port)] = value;
    }

    /// Word offered to the CPU on `port`.
    #[must_use]
    pub fn read_input(&self, port: u16) -> u16 {
        self.inputs[usize::from(port)]
    }

    /// Every offered word, indexed by port.
    #[must_use]
    pub fn inputs(&self) -> &[u16] {
        &self.inputs
    }

    pub(crate) fn latch_output(&mut self, port: u16, value: u16) {
        self.outputs[usize::from(port)] = value;
    }
}

/// A peripheral on the port bus.
///
/// Input ports are the ones the device reads (CPU writes); output ports are
/// the ones it writes (CPU reads). No two devices may share a port in the
/// same direction.
pub trait IoDevice {
    /// Ports this device reads.
    fn input_ports(&self) -> Vec<u16>;

    /// Ports this device writes.
    fn output_ports(&self) -> Vec<u16>;

    /// Called once per clock edge (once per instruction on the interpreter).
    fn update(&mut self, ports: &mut PortBuffers);
}

trait InstalledDevice {
    fn update(&mut self, ports: &mut PortBuffers);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: IoDevice + 'static> InstalledDevice for T {
    fn update(&mut self, ports: &mut PortBuffers) {
        IoDevice::update(self, ports);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to an installed device.
pub struct DeviceId<T> {
    index: usize,
    kind: PhantomData<fn() -> T>,
}

impl<T> Clone for DeviceId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DeviceId<T> {}

impl<T> fmt::Debug for DeviceId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeviceId").field(&self.index).finish()
    }
}

/// Device registry plus the port buffers they share with the CPU.
#[derive(Default)]
pub struct IoController {
    ports: PortBuffers,
    devices: Vec<Box<dyn InstalledDevice>>,
    input_ports: BTreeSet<u16>,
    output_ports: BTreeSet<u16>,
}

impl fmt::Debug for IoController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoController")
            .field("devices", &self.devices.len())
            .field("input_ports", &self.input_ports)
            .field("output_ports", &self.output_ports)
            .finish_non_exhaustive()
    }
}

impl IoController {
    /// Creates a controller with no devices and zeroed buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a device after checking its ports against every installed one.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::PortConflict`] for the first port already claimed in
    /// the same direction; nothing is installed in that case.
    pub fn install<T: IoDevice + 'static>(&mut self, device: T) -> Result<DeviceId<T>, Fault> {
        let inputs = device.input_ports();
        let outputs = device.output_ports();
        if let Some(&port) = inputs.iter().find(|port| self.input_ports.contains(port)) {
            return Err(Fault::PortConflict { port });
        }
        if let Some(&port) = outputs.iter().find(|port| self.output_ports.contains(port)) {
            return Err(Fault::PortConflict { port });
        }
        debug!(?inputs, ?outputs, "installing io device");
        self.input_ports.extend(inputs);
        self.output_ports.extend(outputs);
        self.devices.push(Box::new(device));
        Ok(DeviceId {
            index: self.devices.len() - 1,
            kind: PhantomData,
        })
    }

    /// Borrows an installed device.
    #[must_use]
    pub fn device<T: IoDevice + 'static>(&self, id: DeviceId<T>) -> Option<&T> {
        self.devices.get(id.index)?.as_any().downcast_ref()
    }

    /// Mutably borrows an installed device.
    pub fn device_mut<T: IoDevice + 'static>(&mut self, id: DeviceId<T>) -> Option<&mut T> {
        self.devices.get_mut(id.index)?.as_any_mut().downcast_mut()
    }

    /// Last word the CPU wrote to `port`.
    #[must_use]
    pub fn read_output(&self, port: u16) -> u16 {
        self.ports.read_output(port)
    }

    /// Offers `value` to the CPU on `port`.
    pub fn write_input(&mut self, port: u16, value: u16) {
        self.ports.write_input(port, value);
    }

    /// Shared port buffers.
    #[must_use]
    pub const fn ports(&self) -> &PortBuffers {
        &self.ports
    }

    /// Runs every device's update once, in install order.
    pub fn update_devices(&mut self) {
        for device in &mut self.devices {
            device.update(&mut self.ports);
        }
    }

    pub(crate) fn latch_output(&mut self, port: u16, value: u16) {
        self.ports.latch_output(port, value);
    }
}
