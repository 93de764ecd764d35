//! Stepper motor command implementations

use crate::cli::{RawConfigCommands, StepperCommands};
use crate::profile::StepperProfile;
use flink_core::stepper::{ChannelStatus, LocalConfig, MotorSetup, RunMode, StepperMotor, Units};
use flink_core::FlinkBus;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Interval between steps-done polls while following a motor
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a stepper subcommand
pub fn run<B: FlinkBus>(
    motor: &mut StepperMotor<B>,
    command: StepperCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        StepperCommands::Info => {
            let sub = *motor.subdevice();
            println!("Subdevice:  {} (unique id 0x{:08X})", sub.id, sub.unique_id);
            println!("Version:    {}", sub.version);
            println!("Channels:   {}", motor.channels());
            println!("Base clock: {} Hz", motor.base_clock());
        }
        StepperCommands::Status { channel } => {
            let channels = match channel {
                Some(ch) => ch..ch.saturating_add(1),
                None => 0..motor.channels(),
            };
            for ch in channels {
                let status = motor.status(ch)?;
                print_status(ch, &status, motor.units());
            }
        }
        StepperCommands::Init {
            channel,
            profile,
            run_mode,
            start_speed,
            soll_speed,
            ramp,
            steps,
            direction,
            step_mode,
            phase_mode,
        } => {
            let setup = match profile {
                Some(path) => StepperProfile::from_toml_file(&path)?.setup(),
                None => MotorSetup::new(
                    run_mode.ok_or("--run-mode is required")?,
                    start_speed.ok_or("--start-speed is required")?,
                    soll_speed.ok_or("--soll-speed is required")?,
                    ramp.ok_or("--ramp is required")?,
                )
                .steps_to_do(steps)
                .direction(direction)
                .step_mode(step_mode)
                .phase_mode(phase_mode),
            };
            motor.init_motor(channel, &setup)?;
            println!("Channel {} initialized", channel);
        }
        StepperCommands::Start { channel } => motor.start(channel)?,
        StepperCommands::Stop { channel, ramp } => motor.stop(channel, ramp)?,
        StepperCommands::Speed {
            channel,
            soll,
            ramp,
        } => motor.change_soll_speed_while_running(channel, soll, ramp)?,
        StepperCommands::UpdateSpeeds {
            channel,
            start,
            soll,
            ramp,
        } => motor.update_speeds(channel, start, soll, ramp)?,
        StepperCommands::Direction { channel, value } => match value {
            Some(direction) => motor.set_direction(channel, direction)?,
            None => println!("{}", motor.direction(channel)?),
        },
        StepperCommands::StepMode { channel, value } => match value {
            Some(step_mode) => motor.set_step_mode(channel, step_mode)?,
            None => println!("{}", motor.step_mode(channel)?),
        },
        StepperCommands::PhaseMode { channel, value } => match value {
            Some(phase_mode) => motor.set_phase_mode(channel, phase_mode)?,
            None => println!("{}", motor.phase_mode(channel)?),
        },
        StepperCommands::RunMode { channel, value } => match value {
            Some(run_mode) => motor.set_run_mode(channel, run_mode)?,
            None => println!("{}", motor.run_mode(channel)?),
        },
        StepperCommands::ResetSteps { channel, all } => {
            match (all, channel) {
                (true, _) => motor.reset_steps_global()?,
                (false, Some(ch)) => motor.reset_steps_local(ch)?,
                (false, None) => return Err("Either --channel or --all is required".into()),
            }
        }
        StepperCommands::Run { channel, timeout } => {
            run_with_progress(motor, channel, Duration::from_secs(timeout))?;
        }
        StepperCommands::RawConfig { channel, action } => match action {
            None => {
                let config = motor.local_configuration(channel)?;
                println!("0x{:08X} {:?}", config.bits(), config);
            }
            Some(RawConfigCommands::Set { mask }) => {
                motor.set_bits_in_local_configuration(channel, LocalConfig::from_bits_retain(mask))?
            }
            Some(RawConfigCommands::Reset { mask }) => motor
                .reset_bits_in_local_configuration(channel, LocalConfig::from_bits_retain(mask))?,
            Some(RawConfigCommands::Write { value }) => {
                log::warn!("Overwriting the local configuration of channel {}", channel);
                motor.write_local_configuration_unsynchronized(
                    channel,
                    LocalConfig::from_bits_retain(value),
                )?
            }
        },
    }
    Ok(())
}

fn print_status(channel: u32, status: &ChannelStatus, units: &Units) {
    let config = status.config;
    let run_mode = match config.run_mode() {
        Ok(mode) => mode.to_string(),
        Err(e) => e.to_string(),
    };
    let speed = |prescaler: u32| match units.speed(prescaler) {
        Ok(speed) => format!("{:.2} steps/s", speed),
        Err(_) => "-".to_string(),
    };
    let ramp = match units.steps_from_acceleration(
        status.start_prescaler,
        status.soll_prescaler,
        status.acceleration,
    ) {
        Ok(steps) => format!("{} steps", steps),
        Err(_) => "-".to_string(),
    };

    println!(
        "Channel {} ({})",
        channel,
        if config.is_running() { "running" } else { "stopped" }
    );
    println!("  Config:      0x{:08X}", config.bits());
    println!("  Run mode:    {}", run_mode);
    println!("  Direction:   {}", config.direction());
    println!("  Step mode:   {}", config.step_mode());
    println!("  Phase mode:  {}", config.phase_mode());
    println!(
        "  Start speed: {} (prescaler {})",
        speed(status.start_prescaler),
        status.start_prescaler
    );
    println!(
        "  Soll speed:  {} (prescaler {})",
        speed(status.soll_prescaler),
        status.soll_prescaler
    );
    println!("  Ramp:        {} (acceleration {})", ramp, status.acceleration);
    println!(
        "  Steps:       {}/{}",
        status.steps_done, status.steps_to_do
    );
}

/// Start an initialized channel and follow it until it stops
///
/// In stepping mode the bar tracks steps done against steps to do. A motor
/// still running when `timeout` expires is stopped immediately.
fn run_with_progress<B: FlinkBus>(
    motor: &mut StepperMotor<B>,
    channel: u32,
    timeout: Duration,
) -> Result<u32, Box<dyn std::error::Error>> {
    let run_mode = motor.run_mode(channel)?;
    if run_mode == RunMode::Disabled {
        return Err(format!("Channel {} is disabled, run 'init' first", channel).into());
    }

    let pb = if run_mode == RunMode::Stepping {
        let pb = ProgressBar::new(motor.steps_to_do(channel)? as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({per_sec})")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} steps ({per_sec})")?,
        );
        pb
    };

    motor.reset_steps_local(channel)?;
    motor.start(channel)?;

    let started = Instant::now();
    let mut timed_out = false;
    loop {
        pb.set_position(motor.steps_have_done(channel)? as u64);

        if !motor.is_motor_running(channel)? {
            break;
        }
        if started.elapsed() >= timeout {
            motor.stop(channel, None)?;
            timed_out = true;
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    // the counter may still have moved after the last poll
    let steps = motor.steps_have_done(channel)?;
    pb.set_position(steps as u64);
    if timed_out {
        pb.abandon_with_message("Timed out");
        log::warn!("ch{}: stopped after {:?} timeout", channel, timeout);
        return Ok(steps);
    }

    pb.finish_with_message("Done");
    println!("Channel {} took {} steps", channel, steps);
    Ok(steps)
}
