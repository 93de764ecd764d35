//! Subdevice handles and function identifiers
//!
//! A [`Subdevice`] is the immutable description of one function block in
//! the FPGA fabric, as reported by the discovery layer.

use crate::regs;
use core::fmt;

/// Function implemented by a subdevice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionId {
    /// Device information block
    Info,
    /// Analog input (ADC)
    AnalogInput,
    /// Analog output (DAC)
    AnalogOutput,
    /// General purpose I/O
    Gpio,
    /// Counter / quadrature decoder
    Counter,
    /// Pulse width modulation output
    Pwm,
    /// Pulse width / period acquisition
    Ppwa,
    /// UART
    Uart,
    /// Watchdog
    Watchdog,
    /// Sensor interface
    Sensor,
    /// Stepper motor controller
    StepperMotor,
    /// Interrupt multiplexer
    IrqMultiplexer,
    /// Function id not known to this library
    Unknown(u16),
}

impl FunctionId {
    /// Decode a raw function id
    pub const fn from_raw(id: u16) -> Self {
        match id {
            0x00 => Self::Info,
            0x01 => Self::AnalogInput,
            0x02 => Self::AnalogOutput,
            0x05 => Self::Gpio,
            0x06 => Self::Counter,
            0x0C => Self::Pwm,
            0x0D => Self::Ppwa,
            0x0F => Self::Uart,
            0x10 => Self::Watchdog,
            0x11 => Self::Sensor,
            0x15 => Self::StepperMotor,
            0x18 => Self::IrqMultiplexer,
            other => Self::Unknown(other),
        }
    }

    /// Raw function id as stored in the type register
    pub const fn raw(self) -> u16 {
        match self {
            Self::Info => 0x00,
            Self::AnalogInput => 0x01,
            Self::AnalogOutput => 0x02,
            Self::Gpio => 0x05,
            Self::Counter => 0x06,
            Self::Pwm => 0x0C,
            Self::Ppwa => 0x0D,
            Self::Uart => 0x0F,
            Self::Watchdog => 0x10,
            Self::Sensor => 0x11,
            Self::StepperMotor => 0x15,
            Self::IrqMultiplexer => 0x18,
            Self::Unknown(id) => id,
        }
    }

    /// Human readable name, as printed by `lsflink`
    pub const fn name(self) -> &'static str {
        match self {
            Self::Info => "INFO DEVICE",
            Self::AnalogInput => "ANALOG INPUT",
            Self::AnalogOutput => "ANALOG OUTPUT",
            Self::Gpio => "GPIO",
            Self::Counter => "FQD",
            Self::Pwm => "PWM",
            Self::Ppwa => "PPWA",
            Self::Uart => "UART",
            Self::Watchdog => "WATCHDOG",
            Self::Sensor => "SENSOR",
            Self::StepperMotor => "STEPPER MOTOR",
            Self::IrqMultiplexer => "IRQ MULTIPLEXER",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "0x{:04X}", id),
            other => f.write_str(other.name()),
        }
    }
}

/// Description of one subdevice within a flink device
///
/// Owned by the discovery layer and immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subdevice {
    /// Index of the subdevice within the flink device
    pub id: u8,
    /// Implemented function
    pub function: FunctionId,
    /// Function subtype
    pub subtype: u8,
    /// Interface version of the function
    pub version: u8,
    /// Base address within the flink memory region
    pub base_addr: u32,
    /// Size of the subdevice memory region in bytes
    pub mem_size: u32,
    /// Number of channels
    pub channels: u32,
    /// Unique id assigned at synthesis time
    pub unique_id: u32,
}

impl Subdevice {
    /// Parse the common 16-byte subdevice header
    ///
    /// `header` holds the words at `TYPE_OFFSET`..`MOD_STATUS_OFFSET`
    /// in little-endian order.
    pub fn from_header(id: u8, base_addr: u32, header: &[u8; regs::HEADER_SIZE as usize]) -> Self {
        let word = |offset: u32| {
            let at = offset as usize;
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        let type_word = word(regs::TYPE_OFFSET);

        Self {
            id,
            function: FunctionId::from_raw(((type_word >> 16) & regs::INTERFACE_TYPE_MASK) as u16),
            subtype: (type_word >> 8) as u8,
            version: type_word as u8,
            base_addr,
            mem_size: word(regs::SIZE_OFFSET),
            channels: word(regs::CHANNEL_OFFSET),
            unique_id: word(regs::UNIQUE_ID_OFFSET),
        }
    }

    /// Encode the common header, the inverse of [`Subdevice::from_header`]
    pub fn header(&self) -> [u8; regs::HEADER_SIZE as usize] {
        let type_word = ((self.function.raw() as u32) << 16)
            | ((self.subtype as u32) << 8)
            | self.version as u32;

        let mut header = [0u8; regs::HEADER_SIZE as usize];
        for (i, word) in [type_word, self.mem_size, self.channels, self.unique_id]
            .iter()
            .enumerate()
        {
            header[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        header
    }

    /// Whether this subdevice implements `function` with the given subtype
    pub fn matches(&self, function: FunctionId, subtype: u8) -> bool {
        self.function == function && self.subtype == subtype
    }

    /// Last address occupied by this subdevice
    pub fn end_addr(&self) -> u32 {
        self.base_addr
            .saturating_add(self.mem_size)
            .saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_id_roundtrip() {
        for raw in 0u16..0x20 {
            assert_eq!(FunctionId::from_raw(raw).raw(), raw);
        }
        assert_eq!(FunctionId::from_raw(0x15), FunctionId::StepperMotor);
        assert_eq!(FunctionId::from_raw(0x42), FunctionId::Unknown(0x42));
    }

    #[test]
    fn test_parse_header() {
        let mut header = [0u8; 16];
        header[0..4].copy_from_slice(&0x0015_0203u32.to_le_bytes());
        header[4..8].copy_from_slice(&0x100u32.to_le_bytes());
        header[8..12].copy_from_slice(&4u32.to_le_bytes());
        header[12..16].copy_from_slice(&0xCAFE_0001u32.to_le_bytes());

        let sub = Subdevice::from_header(3, 0x200, &header);
        assert_eq!(sub.id, 3);
        assert_eq!(sub.function, FunctionId::StepperMotor);
        assert_eq!(sub.subtype, 2);
        assert_eq!(sub.version, 3);
        assert_eq!(sub.mem_size, 0x100);
        assert_eq!(sub.channels, 4);
        assert_eq!(sub.unique_id, 0xCAFE_0001);
        assert_eq!(sub.end_addr(), 0x2FF);
        assert_eq!(sub.header(), header);
    }

    #[test]
    fn test_matches() {
        let sub = Subdevice {
            id: 1,
            function: FunctionId::Pwm,
            subtype: 0,
            version: 1,
            base_addr: 0,
            mem_size: 0x40,
            channels: 2,
            unique_id: 0,
        };
        assert!(sub.matches(FunctionId::Pwm, 0));
        assert!(!sub.matches(FunctionId::Pwm, 1));
        assert!(!sub.matches(FunctionId::Gpio, 0));
    }
}
