//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use flink_core::stepper::{Direction, PhaseMode, RunMode, StepMode};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, e.g. linux:dev=/dev/flink0 [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "flink")]
#[command(author, version, about = "flink FPGA device tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available backends
    ListBackends,

    /// List the subdevices of a flink device
    Lsflink {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,
    },

    /// Control a stepper motor subdevice
    Stepper {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Unique id of the stepper subdevice (default: first stepper motor)
        #[arg(short, long, value_parser = parse_hex_u32)]
        unique_id: Option<u32>,

        #[command(subcommand)]
        command: StepperCommands,
    },
}

#[derive(Subcommand)]
pub enum StepperCommands {
    /// Show channel count and base clock
    Info,

    /// Show the registers of one or all channels
    Status {
        /// Channel to show (default: all)
        #[arg(short, long)]
        channel: Option<u32>,
    },

    /// Configure a stopped channel
    Init {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// Profile file (TOML format)
        #[arg(long, conflicts_with_all = ["run_mode", "start_speed", "soll_speed", "ramp"])]
        profile: Option<PathBuf>,

        /// Run mode (disabled, stepping, fixed-speed)
        #[arg(long, required_unless_present = "profile")]
        run_mode: Option<RunMode>,

        /// Start speed in steps per second
        #[arg(long, required_unless_present = "profile")]
        start_speed: Option<f64>,

        /// Soll speed in steps per second
        #[arg(long, required_unless_present = "profile")]
        soll_speed: Option<f64>,

        /// Steps used to ramp from start to soll speed
        #[arg(long, required_unless_present = "profile", value_parser = clap::value_parser!(u32).range(1..))]
        ramp: Option<u32>,

        /// Steps to take in stepping mode
        #[arg(long, default_value_t = 0, conflicts_with = "profile")]
        steps: u32,

        /// Direction (cw, ccw)
        #[arg(long, default_value = "cw", conflicts_with = "profile")]
        direction: Direction,

        /// Step mode (full, half)
        #[arg(long, default_value = "full", conflicts_with = "profile")]
        step_mode: StepMode,

        /// Phase mode (one, two)
        #[arg(long, default_value = "two", conflicts_with = "profile")]
        phase_mode: PhaseMode,
    },

    /// Start a channel
    Start {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,
    },

    /// Stop a running channel
    Stop {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// Slow down over this many steps instead of stopping at once
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        ramp: Option<u32>,
    },

    /// Change the soll speed of a running channel
    Speed {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// New soll speed in steps per second
        #[arg(long)]
        soll: f64,

        /// Steps used to reach the new speed
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        ramp: u32,
    },

    /// Update start and soll speed of a stopped channel
    UpdateSpeeds {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// Start speed in steps per second
        #[arg(long)]
        start: f64,

        /// Soll speed in steps per second
        #[arg(long)]
        soll: f64,

        /// Steps used to ramp from start to soll speed
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        ramp: u32,
    },

    /// Show or set the direction (cw, ccw)
    Direction {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// New direction
        value: Option<Direction>,
    },

    /// Show or set the step mode (full, half)
    StepMode {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// New step mode
        value: Option<StepMode>,
    },

    /// Show or set the phase mode (one, two)
    PhaseMode {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// New phase mode
        value: Option<PhaseMode>,
    },

    /// Show or set the run mode (disabled, stepping, fixed-speed)
    RunMode {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// New run mode
        value: Option<RunMode>,
    },

    /// Reset the steps done counter
    #[command(group(clap::ArgGroup::new("target").required(true).args(["channel", "all"])))]
    ResetSteps {
        /// Motor channel
        #[arg(short, long)]
        channel: Option<u32>,

        /// Reset the counters of all channels at once
        #[arg(long)]
        all: bool,
    },

    /// Start an initialized channel and follow its progress
    Run {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        /// Stop the motor after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Access the raw local configuration register
    RawConfig {
        /// Motor channel
        #[arg(short, long, default_value_t = 0)]
        channel: u32,

        #[command(subcommand)]
        action: Option<RawConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum RawConfigCommands {
    /// Atomically set bits
    Set {
        /// Bit mask
        #[arg(value_parser = parse_hex_u32)]
        mask: u32,
    },

    /// Atomically clear bits
    Reset {
        /// Bit mask
        #[arg(value_parser = parse_hex_u32)]
        mask: u32,
    },

    /// Overwrite the whole register (not atomic)
    Write {
        /// Register value
        #[arg(value_parser = parse_hex_u32)]
        value: u32,
    },
}
