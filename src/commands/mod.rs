//! CLI command implementations
//!
//! Device commands take an opened [`flink_core::Flink`] or a bound
//! [`flink_core::stepper::StepperMotor`], so they work the same with every
//! backend.

mod list;
pub mod stepper;

pub use list::{list_backends, lsflink};
