//! flink-core - Core library for flink FPGA subdevice access
//!
//! flink exposes an FPGA as a list of subdevices. Each subdevice occupies a
//! memory region that starts with a common header (function id, size,
//! channel count, unique id) followed by function specific registers.
//!
//! This crate provides the transport independent parts: subdevice
//! discovery, a validated register port and the stepper motor controller.
//! It is `no_std` compatible; a transport only has to implement
//! [`bus::FlinkBus`].
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and serde
//!   derives for the configuration types)
//! - `alloc` - Enable the boxed bus impl
//!
//! # Example
//!
//! ```ignore
//! use flink_core::{device::Flink, stepper::{MotorSetup, RunMode, StepperMotor}};
//!
//! fn spin<B: flink_core::bus::FlinkBus>(bus: B) -> flink_core::Result<()> {
//!     let mut flink = Flink::new(bus);
//!     let mut motor = StepperMotor::open(&mut flink, None)?;
//!     motor.init_motor(0, &MotorSetup::new(RunMode::FixedSpeed, 100.0, 1000.0, 50))?;
//!     motor.start(0)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bus;
pub mod device;
pub mod error;
pub mod port;
pub mod regs;
pub mod stepper;
pub mod subdevice;

#[cfg(test)]
mod testing;

pub use bus::FlinkBus;
pub use device::Flink;
pub use error::{Error, Result};
pub use port::RegisterPort;
pub use subdevice::{FunctionId, Subdevice};
