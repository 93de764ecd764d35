//! Recording in-memory bus for unit tests
//!
//! Plain byte-addressed memory per subdevice: alias registers are stored
//! like any other register, so tests inspect exactly what was written.

use crate::bus::FlinkBus;
use crate::error::{Error, NotFound, Result};
use crate::subdevice::{FunctionId, Subdevice};
use alloc::vec;
use alloc::vec::Vec;

const MEM_SIZE: u32 = 0x100;

pub struct MockBus {
    subdevices: Vec<(Subdevice, Vec<u8>)>,
    writes: Vec<(u8, u32, u32)>,
    faults: Vec<(u8, u32, i32)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            subdevices: Vec::new(),
            writes: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn add(&mut self, function: FunctionId, subtype: u8, channels: u32, unique_id: u32) -> Subdevice {
        let id = self.subdevices.len() as u8;
        let sub = Subdevice {
            id,
            function,
            subtype,
            version: 1,
            base_addr: id as u32 * MEM_SIZE,
            mem_size: MEM_SIZE,
            channels,
            unique_id,
        };
        let mut mem = vec![0u8; MEM_SIZE as usize];
        mem[..16].copy_from_slice(&sub.header());
        self.subdevices.push((sub, mem));
        sub
    }

    pub fn info(&self, id: u8) -> Subdevice {
        self.subdevices[id as usize].0
    }

    /// Make every access to `offset` fail with `code`
    pub fn fail_at(&mut self, subdevice: u8, offset: u32, code: i32) {
        self.faults.push((subdevice, offset, code));
    }

    pub fn set_word(&mut self, subdevice: u8, offset: u32, value: u32) {
        let at = offset as usize;
        self.subdevices[subdevice as usize].1[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn word(&self, subdevice: u8, offset: u32) -> u32 {
        let at = offset as usize;
        let mem = &self.subdevices[subdevice as usize].1;
        u32::from_le_bytes([mem[at], mem[at + 1], mem[at + 2], mem[at + 3]])
    }

    /// Every write as (subdevice, offset, value), in issue order
    pub fn writes(&self) -> &[(u8, u32, u32)] {
        &self.writes
    }

    fn check(&self, subdevice: u8, offset: u32) -> Result<()> {
        if subdevice as usize >= self.subdevices.len() {
            return Err(Error::NotFound(NotFound::Id(subdevice)));
        }
        match self
            .faults
            .iter()
            .find(|(s, o, _)| *s == subdevice && *o == offset)
        {
            Some(&(_, _, code)) => Err(Error::Transport {
                subdevice,
                offset,
                code,
            }),
            None => Ok(()),
        }
    }
}

impl FlinkBus for MockBus {
    fn subdevice_count(&mut self) -> Result<u8> {
        Ok(self.subdevices.len() as u8)
    }

    fn subdevice_info(&mut self, id: u8) -> Result<Subdevice> {
        self.subdevices
            .get(id as usize)
            .map(|(sub, _)| *sub)
            .ok_or(Error::NotFound(NotFound::Id(id)))
    }

    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.check(subdevice, offset)?;
        let at = offset as usize;
        buf.copy_from_slice(&self.subdevices[subdevice as usize].1[at..at + buf.len()]);
        Ok(())
    }

    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> Result<()> {
        self.check(subdevice, offset)?;
        let at = offset as usize;
        self.subdevices[subdevice as usize].1[at..at + data.len()].copy_from_slice(data);
        let mut word = [0u8; 4];
        word[..data.len()].copy_from_slice(data);
        self.writes
            .push((subdevice, offset, u32::from_le_bytes(word)));
        Ok(())
    }

    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> Result<bool> {
        self.check(subdevice, offset)?;
        Ok(self.word(subdevice, offset) & (1 << bit) != 0)
    }

    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> Result<()> {
        self.check(subdevice, offset)?;
        let word = self.word(subdevice, offset);
        let word = if value {
            word | (1 << bit)
        } else {
            word & !(1 << bit)
        };
        self.set_word(subdevice, offset, word);
        self.writes.push((subdevice, offset, word));
        Ok(())
    }
}
