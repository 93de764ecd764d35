//! Error types for flink-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Every variant is `Copy` so errors can carry their
//! register/channel context without allocating.

use core::fmt;

/// Details about a caller-supplied value that violates a precondition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidArgument {
    /// Speed must be a finite value greater than zero
    NonPositiveSpeed(f64),
    /// Prescaler must be at least 1
    InvalidPrescaler(u32),
    /// Prescalers and step count used for a ramp must all be at least 1
    InvalidRampInput {
        /// Prescaler of the start speed
        start_prescaler: u32,
        /// Prescaler of the soll (target) speed
        soll_prescaler: u32,
        /// Step count or raw acceleration
        value: u32,
    },
    /// The start speed is faster than the soll speed, so the ramp would be negative
    SpeedOrder {
        /// Prescaler of the start speed
        start_prescaler: u32,
        /// Prescaler of the soll (target) speed
        soll_prescaler: u32,
    },
    /// Run mode code 3 is reserved and must never reach the hardware
    ReservedRunMode,
    /// Run mode code outside of the 2-bit field
    UnknownRunMode(u8),
    /// Text does not name a value of the given setting
    UnknownValue {
        /// Setting that was being parsed
        kind: &'static str,
    },
    /// Channel index is not below the subdevice channel count
    ChannelOutOfRange {
        /// Requested channel
        channel: u32,
        /// Number of channels of the subdevice
        channels: u32,
    },
    /// Register access size must be 1 to 4 bytes
    AccessSize(u8),
    /// Bit index outside of a 32-bit register
    BitIndex(u8),
    /// Access extends past the end of the subdevice memory region
    OffsetOutOfRange {
        /// Offset relative to the subdevice base address
        offset: u32,
        /// Access size in bytes
        size: u8,
        /// Memory size of the subdevice
        mem_size: u32,
    },
}

/// What a failed lookup was searching for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// No subdevice with this function id and subtype
    Function {
        /// Raw function id
        function: u16,
        /// Subtype
        subtype: u8,
    },
    /// No subdevice with this index
    Id(u8),
    /// No subdevice with this unique id
    UniqueId(u32),
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// The underlying register access failed with a negative return code
    Transport {
        /// Subdevice index the access was addressed to
        subdevice: u8,
        /// Register offset relative to the subdevice base address
        offset: u32,
        /// Raw (negative) code reported by the transport
        code: i32,
    },
    /// Operation invoked while the channel is in the wrong run state
    IllegalState {
        /// Motor channel
        channel: u32,
        /// Name of the rejected operation
        operation: &'static str,
        /// Whether the channel was running when the operation was rejected
        running: bool,
    },
    /// A caller-supplied value violates a documented precondition
    InvalidArgument(InvalidArgument),
    /// Requested subdevice does not exist
    NotFound(NotFound),
}

impl From<InvalidArgument> for Error {
    fn from(arg: InvalidArgument) -> Self {
        Error::InvalidArgument(arg)
    }
}

impl From<NotFound> for Error {
    fn from(what: NotFound) -> Self {
        Error::NotFound(what)
    }
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSpeed(speed) => {
                write!(f, "speed must be greater than zero (got {})", speed)
            }
            Self::InvalidPrescaler(prescaler) => {
                write!(f, "invalid prescaler value {}", prescaler)
            }
            Self::InvalidRampInput {
                start_prescaler,
                soll_prescaler,
                value,
            } => write!(
                f,
                "ramp inputs must be >= 1 (start prescaler {}, soll prescaler {}, value {})",
                start_prescaler, soll_prescaler, value
            ),
            Self::SpeedOrder {
                start_prescaler,
                soll_prescaler,
            } => write!(
                f,
                "start speed is faster than soll speed (start prescaler {} < soll prescaler {})",
                start_prescaler, soll_prescaler
            ),
            Self::ReservedRunMode => write!(f, "run mode 3 is reserved"),
            Self::UnknownRunMode(code) => write!(f, "unknown run mode {}", code),
            Self::UnknownValue { kind } => write!(f, "unknown {}", kind),
            Self::ChannelOutOfRange { channel, channels } => write!(
                f,
                "channel {} out of range (subdevice has {} channels)",
                channel, channels
            ),
            Self::AccessSize(size) => {
                write!(f, "invalid access size {} (must be 1-4 bytes)", size)
            }
            Self::BitIndex(bit) => write!(f, "bit index {} out of range", bit),
            Self::OffsetOutOfRange {
                offset,
                size,
                mem_size,
            } => write!(
                f,
                "access of {} bytes at 0x{:X} exceeds subdevice memory size 0x{:X}",
                size, offset, mem_size
            ),
        }
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function { function, subtype } => write!(
                f,
                "no subdevice with function 0x{:02X} and subtype {}",
                function, subtype
            ),
            Self::Id(id) => write!(f, "no subdevice with id {}", id),
            Self::UniqueId(uid) => write!(f, "no subdevice with unique id 0x{:08X}", uid),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport {
                subdevice,
                offset,
                code,
            } => write!(
                f,
                "register access failed on subdevice {} at offset 0x{:X} (code {})",
                subdevice, offset, code
            ),
            Self::IllegalState {
                channel,
                operation,
                running,
            } => write!(
                f,
                "{} not allowed while channel {} is {}",
                operation,
                channel,
                if *running { "running" } else { "stopped" }
            ),
            Self::InvalidArgument(arg) => write!(f, "invalid argument: {}", arg),
            Self::NotFound(what) => write!(f, "{}", what),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
