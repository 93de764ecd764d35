//! Register access port bound to one subdevice
//!
//! [`RegisterPort`] is a typed wrapper around a [`FlinkBus`] that validates
//! offsets and access sizes against the subdevice it is bound to.
//!
//! Two ways of changing bits exist:
//!
//! - [`RegisterPort::set_bits_atomic`] / [`RegisterPort::reset_bits_atomic`]
//!   write a mask into a write-1-to-set / write-1-to-clear alias register.
//!   The hardware applies the mask in a single bus cycle, so bits driven by
//!   the hardware itself (e.g. a start bit cleared when stepping completes)
//!   are never overwritten.
//! - [`RegisterPort::modify_word_unsynchronized`] performs a read-modify-write.
//!   Anything that changes between the read and the write is lost.

use crate::bus::FlinkBus;
use crate::error::{InvalidArgument, Result};
use crate::regs::{REGISTER_WIDTH, REGISTER_WIDTH_BIT};
use crate::subdevice::Subdevice;

/// Register access bound to a single subdevice
pub struct RegisterPort<B> {
    bus: B,
    subdevice: Subdevice,
}

impl<B: FlinkBus> RegisterPort<B> {
    /// Bind `bus` to the given subdevice
    pub fn new(bus: B, subdevice: Subdevice) -> Self {
        Self { bus, subdevice }
    }

    /// The subdevice this port is bound to
    pub fn subdevice(&self) -> &Subdevice {
        &self.subdevice
    }

    /// Release the port, returning the transport
    pub fn into_inner(self) -> B {
        self.bus
    }

    fn check_access(&self, offset: u32, size: u8) -> Result<()> {
        if size == 0 || size as u32 > REGISTER_WIDTH {
            return Err(InvalidArgument::AccessSize(size).into());
        }
        let end = offset.checked_add(size as u32);
        if end.map_or(true, |end| end > self.subdevice.mem_size) {
            return Err(InvalidArgument::OffsetOutOfRange {
                offset,
                size,
                mem_size: self.subdevice.mem_size,
            }
            .into());
        }
        Ok(())
    }

    fn check_bit(&self, offset: u32, bit: u8) -> Result<()> {
        if bit as u32 >= REGISTER_WIDTH_BIT {
            return Err(InvalidArgument::BitIndex(bit).into());
        }
        self.check_access(offset, REGISTER_WIDTH as u8)
    }

    /// Read `size` bytes (1-4) at `offset` as a little-endian word
    pub fn read_word(&mut self, offset: u32, size: u8) -> Result<u32> {
        self.check_access(offset, size)?;
        let mut buf = [0u8; 4];
        self.bus
            .read(self.subdevice.id, offset, &mut buf[..size as usize])?;
        let value = u32::from_le_bytes(buf);
        log::trace!(
            "subdev {}: read  0x{:03X} -> 0x{:08X}",
            self.subdevice.id,
            offset,
            value
        );
        Ok(value)
    }

    /// Write the low `size` bytes (1-4) of `value` at `offset`
    pub fn write_word(&mut self, offset: u32, size: u8, value: u32) -> Result<()> {
        self.check_access(offset, size)?;
        log::trace!(
            "subdev {}: write 0x{:03X} <- 0x{:08X}",
            self.subdevice.id,
            offset,
            value
        );
        let bytes = value.to_le_bytes();
        self.bus
            .write(self.subdevice.id, offset, &bytes[..size as usize])
    }

    /// Read a full 32-bit register
    pub fn read_reg(&mut self, offset: u32) -> Result<u32> {
        self.read_word(offset, REGISTER_WIDTH as u8)
    }

    /// Write a full 32-bit register
    pub fn write_reg(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write_word(offset, REGISTER_WIDTH as u8, value)
    }

    /// Read a single bit of the register at `offset`
    pub fn read_bit(&mut self, offset: u32, bit: u8) -> Result<bool> {
        self.check_bit(offset, bit)?;
        self.bus.read_bit(self.subdevice.id, offset, bit)
    }

    /// Write a single bit of the register at `offset`
    pub fn write_bit(&mut self, offset: u32, bit: u8, value: bool) -> Result<()> {
        self.check_bit(offset, bit)?;
        log::trace!(
            "subdev {}: write 0x{:03X} bit {} <- {}",
            self.subdevice.id,
            offset,
            bit,
            value as u8
        );
        self.bus.write_bit(self.subdevice.id, offset, bit, value)
    }

    /// Set `mask` bits through the write-1-to-set alias register at `set_offset`
    pub fn set_bits_atomic(&mut self, set_offset: u32, mask: u32) -> Result<()> {
        self.write_reg(set_offset, mask)
    }

    /// Clear `mask` bits through the write-1-to-clear alias register at `reset_offset`
    pub fn reset_bits_atomic(&mut self, reset_offset: u32, mask: u32) -> Result<()> {
        self.write_reg(reset_offset, mask)
    }

    /// Read-modify-write of the register at `offset`
    ///
    /// Not atomic: bits changed by the hardware or another process between
    /// the read and the write are overwritten. Returns the value written.
    pub fn modify_word_unsynchronized(&mut self, offset: u32, set: u32, clear: u32) -> Result<u32> {
        let value = (self.read_reg(offset)? & !clear) | set;
        self.write_reg(offset, value)?;
        Ok(value)
    }
}
