//! Transport trait for flink devices
//!
//! A [`FlinkBus`] is the narrow seam between the core logic and whatever
//! actually reaches the FPGA: the Linux kernel driver, an in-memory
//! simulator, or a test double. Offsets are always relative to the base
//! address of the addressed subdevice.
//!
//! Implementations report failures as [`Error::Transport`] carrying the raw
//! negative code of the underlying layer. Nothing is retried.
//!
//! [`Error::Transport`]: crate::error::Error::Transport

use crate::error::Result;
use crate::subdevice::Subdevice;

/// Low-level access to a flink device
///
/// The trait is object-safe so backends can be selected at runtime
/// (`Box<dyn FlinkBus + Send>`).
pub trait FlinkBus {
    /// Number of subdevices in the device
    fn subdevice_count(&mut self) -> Result<u8>;

    /// Describe the subdevice with index `id`
    fn subdevice_info(&mut self, id: u8) -> Result<Subdevice>;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `offset`
    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> Result<()>;

    /// Read a single bit of the word at `offset`
    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> Result<bool>;

    /// Write a single bit of the word at `offset`
    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> Result<()>;

    /// Select a subdevice, optionally blocking access from other processes
    ///
    /// Backends without a notion of selection accept every request.
    fn select(&mut self, _subdevice: u8, _exclusive: bool) -> Result<()> {
        Ok(())
    }
}

impl<B: FlinkBus + ?Sized> FlinkBus for &mut B {
    fn subdevice_count(&mut self) -> Result<u8> {
        (**self).subdevice_count()
    }

    fn subdevice_info(&mut self, id: u8) -> Result<Subdevice> {
        (**self).subdevice_info(id)
    }

    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(subdevice, offset, buf)
    }

    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> Result<()> {
        (**self).write(subdevice, offset, data)
    }

    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> Result<bool> {
        (**self).read_bit(subdevice, offset, bit)
    }

    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> Result<()> {
        (**self).write_bit(subdevice, offset, bit, value)
    }

    fn select(&mut self, subdevice: u8, exclusive: bool) -> Result<()> {
        (**self).select(subdevice, exclusive)
    }
}

// Blanket impl for boxed buses to allow runtime backend selection
#[cfg(feature = "alloc")]
impl FlinkBus for alloc::boxed::Box<dyn FlinkBus + Send> {
    fn subdevice_count(&mut self) -> Result<u8> {
        (**self).subdevice_count()
    }

    fn subdevice_info(&mut self, id: u8) -> Result<Subdevice> {
        (**self).subdevice_info(id)
    }

    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(subdevice, offset, buf)
    }

    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> Result<()> {
        (**self).write(subdevice, offset, data)
    }

    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> Result<bool> {
        (**self).read_bit(subdevice, offset, bit)
    }

    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> Result<()> {
        (**self).write_bit(subdevice, offset, bit, value)
    }

    fn select(&mut self, subdevice: u8, exclusive: bool) -> Result<()> {
        (**self).select(subdevice, exclusive)
    }
}
