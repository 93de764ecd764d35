//! flink - command line access to flink FPGA devices
//!
//! flink devices expose a list of subdevices, each implementing one
//! function (GPIO, PWM, stepper motor controller, ...) in a window of
//! 32-bit registers. This tool lists the subdevices of a device and drives
//! stepper motor subdevices.
//!
//! # Architecture
//!
//! Every backend (Linux driver, simulated device) implements
//! `flink_core::FlinkBus`. The commands only see the resulting
//! `flink_core::Flink` device context, so the same implementation works
//! regardless of where the registers live.

mod backends;
mod cli;
mod commands;
mod profile;

use backends::Session;
use clap::Parser;
use cli::{Cli, Commands};
use flink_core::stepper::StepperMotor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let session = Session::default();

    match cli.command {
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
        Commands::Lsflink { backend } => {
            let mut flink = session.open(&backend)?;
            commands::lsflink(&mut flink)
        }
        Commands::Stepper {
            backend,
            unique_id,
            command,
        } => {
            let mut flink = session.open(&backend)?;
            let mut motor = StepperMotor::open(&mut flink, unique_id).map_err(|e| {
                format!(
                    "Failed to open stepper motor subdevice: {}\n\
                     Use 'flink lsflink -b {}' to list the subdevices.",
                    e, backend
                )
            })?;
            commands::stepper::run(&mut motor, command)
        }
    }
}
