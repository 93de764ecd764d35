//! flink-linux - Linux flink device support
//!
//! This crate provides access to flink FPGA devices through the Linux
//! flink driver and its `/dev/flinkN` character devices.
//!
//! # Overview
//!
//! The driver exposes the subdevice list through ioctl requests. Register
//! data is read and written with positioned reads and writes relative to
//! the currently selected subdevice; single bits are accessed with the
//! driver's combined select-and-access requests so no read-modify-write
//! happens in user space.
//!
//! # Example
//!
//! ```no_run
//! use flink_core::{device::Flink, stepper::StepperMotor};
//! use flink_linux::{DeviceRegistry, LinuxFlink, LinuxFlinkConfig};
//!
//! let registry = DeviceRegistry::new();
//! let config = LinuxFlinkConfig::new("/dev/flink0").with_exclusive(true);
//! let mut flink = Flink::new(LinuxFlink::open(&config, &registry)?);
//!
//! let mut motor = StepperMotor::open(&mut flink, None)?;
//! println!("base clock: {} Hz", motor.base_clock());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with flink CLI
//!
//! ```bash
//! # List subdevices
//! flink lsflink -b linux:dev=/dev/flink0
//!
//! # Block other processes from the stepper subdevice
//! flink stepper -b linux:dev=/dev/flink0,exclusive=1 status
//! ```
//!
//! # System Requirements
//!
//! - flink kernel modules for the board (`flink`, plus the bus module)
//! - Read/write access to `/dev/flinkN`

pub mod device;
pub mod error;
pub mod registry;

// Re-exports
pub use device::{parse_options, LinuxFlink, LinuxFlinkConfig};
pub use error::{LinuxFlinkError, Result};
pub use registry::{DeviceClaim, DeviceRegistry};

/// Open a Linux flink device and return a boxed FlinkBus
///
/// This is a convenience function for use in the CLI backend dispatch.
///
/// # Arguments
///
/// * `options` - Slice of (key, value) pairs from backend string parsing
/// * `registry` - Registry the device path is claimed in
///
/// # Example Options
///
/// - `dev=/dev/flink0` - Required: device file
/// - `exclusive=1` - Optional: select subdevices exclusively
pub fn open_linux_flink(
    options: &[(&str, &str)],
    registry: &DeviceRegistry,
) -> std::result::Result<Box<dyn flink_core::FlinkBus + Send>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let flink = LinuxFlink::open(&config, registry)?;
    Ok(Box::new(flink))
}
