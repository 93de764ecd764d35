//! Flink device context and subdevice discovery
//!
//! [`Flink`] owns a [`FlinkBus`] and is passed around explicitly; there is
//! no process-wide device instance. Opening the same device file twice is
//! prevented by the backend (see the registry in `flink-linux`).

use crate::bus::FlinkBus;
use crate::error::{Error, NotFound, Result};
use crate::port::RegisterPort;
use crate::regs;
use crate::subdevice::{FunctionId, Subdevice};

/// Maximum number of subdevices addressable by an 8-bit id
pub const MAX_SUBDEVICES: usize = 256;

/// An opened flink device
pub struct Flink<B> {
    bus: B,
}

impl<B: FlinkBus> Flink<B> {
    /// Wrap an opened transport
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Get a mutable reference to the underlying transport
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the device context, returning the transport
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Number of subdevices of this flink device
    pub fn subdevice_count(&mut self) -> Result<u8> {
        self.bus.subdevice_count()
    }

    /// Find the subdevice with index `id`
    pub fn subdevice(&mut self, id: u8) -> Result<Subdevice> {
        if id >= self.bus.subdevice_count()? {
            return Err(NotFound::Id(id).into());
        }
        self.bus.subdevice_info(id)
    }

    /// Find the subdevice with the given unique id
    pub fn subdevice_by_unique_id(&mut self, unique_id: u32) -> Result<Subdevice> {
        self.find(|sub| sub.unique_id == unique_id)?
            .ok_or(Error::NotFound(NotFound::UniqueId(unique_id)))
    }

    /// Find the first subdevice implementing `function` with the given subtype
    pub fn find_subdevice(&mut self, function: FunctionId, subtype: u8) -> Result<Subdevice> {
        let found = self.find(|sub| sub.matches(function, subtype))?;
        found.ok_or(Error::NotFound(NotFound::Function {
            function: function.raw(),
            subtype,
        }))
    }

    /// Describe every subdevice of this flink device
    pub fn subdevices(&mut self) -> Result<heapless::Vec<Subdevice, MAX_SUBDEVICES>> {
        let count = self.bus.subdevice_count()?;
        let mut list = heapless::Vec::new();
        for id in 0..count {
            let sub = self.bus.subdevice_info(id)?;
            // count is a u8, so the list can never overflow
            let _ = list.push(sub);
        }
        Ok(list)
    }

    /// Reset a subdevice by pulsing the reset bit of its configuration register
    pub fn reset_subdevice(&mut self, sub: &Subdevice) -> Result<()> {
        log::debug!("Resetting subdevice {} ({})", sub.id, sub.function);
        self.bus
            .write_bit(sub.id, regs::MOD_CONF_OFFSET, regs::MOD_CONF_RESET_BIT, true)
    }

    /// Select a subdevice for further operations
    ///
    /// With `exclusive` set, other processes are blocked from accessing
    /// the subdevice until this device is closed.
    pub fn select_subdevice(&mut self, sub: &Subdevice, exclusive: bool) -> Result<()> {
        log::debug!(
            "Selecting subdevice {}{}",
            sub.id,
            if exclusive { " (exclusive)" } else { "" }
        );
        self.bus.select(sub.id, exclusive)
    }

    /// Get a register port bound to `sub`
    pub fn port(&mut self, sub: Subdevice) -> RegisterPort<&mut B> {
        RegisterPort::new(&mut self.bus, sub)
    }

    fn find<F>(&mut self, mut pred: F) -> Result<Option<Subdevice>>
    where
        F: FnMut(&Subdevice) -> bool,
    {
        let count = self.bus.subdevice_count()?;
        for id in 0..count {
            let sub = self.bus.subdevice_info(id)?;
            if pred(&sub) {
                return Ok(Some(sub));
            }
        }
        Ok(None)
    }
}
