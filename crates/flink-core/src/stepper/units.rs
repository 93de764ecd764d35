//! Conversion between physical units and raw register encodings
//!
//! Speeds are expressed in steps per second. The hardware derives the step
//! period from the base clock divided by a prescaler, so a larger prescaler
//! means a slower motor. The acceleration register holds the amount the
//! prescaler changes per step while ramping from the start speed to the
//! soll speed.
//!
//! The ramp always goes from the start speed (slow, large prescaler) to the
//! soll speed (fast, small prescaler). A start speed faster than the soll
//! speed would make the ramp negative, which the unsigned acceleration
//! register cannot express, so it is rejected.

use crate::error::{InvalidArgument, Result};

/// Unit conversions for one stepper controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    base_clock: u32,
}

impl Units {
    /// Conversions for a controller clocked at `base_clock` Hz
    pub const fn new(base_clock: u32) -> Self {
        Self { base_clock }
    }

    /// Base clock in Hz
    pub const fn base_clock(&self) -> u32 {
        self.base_clock
    }

    /// Prescaler for `speed` steps per second
    ///
    /// The result is clamped to at least 1; a prescaler of 0 would mean an
    /// infinite step rate.
    pub fn prescaler(&self, speed: f64) -> Result<u32> {
        if !(speed > 0.0) || !speed.is_finite() {
            return Err(InvalidArgument::NonPositiveSpeed(speed).into());
        }
        // float -> int casts saturate, so tiny speeds yield u32::MAX
        let prescaler = (self.base_clock as f64 / speed) as u32;
        Ok(prescaler.max(1))
    }

    /// Speed in steps per second produced by `prescaler`
    pub fn speed(&self, prescaler: u32) -> Result<f64> {
        if prescaler == 0 {
            return Err(InvalidArgument::InvalidPrescaler(prescaler).into());
        }
        Ok(self.base_clock as f64 / prescaler as f64)
    }

    /// Raw acceleration that ramps from `start_prescaler` to `soll_prescaler` in `steps` steps
    ///
    /// Equal prescalers need no ramp; the result is still 1 so the register
    /// never holds 0.
    pub fn acceleration_from_steps(
        &self,
        start_prescaler: u32,
        soll_prescaler: u32,
        steps: u32,
    ) -> Result<u32> {
        let span = ramp_span(start_prescaler, soll_prescaler, steps)?;
        Ok(span.div_ceil(steps).max(1))
    }

    /// Number of steps needed to ramp from `start_prescaler` to `soll_prescaler`
    /// with the raw `acceleration`
    pub fn steps_from_acceleration(
        &self,
        start_prescaler: u32,
        soll_prescaler: u32,
        acceleration: u32,
    ) -> Result<f64> {
        let span = ramp_span(start_prescaler, soll_prescaler, acceleration)?;
        Ok(span.div_ceil(acceleration) as f64)
    }
}

/// Prescaler difference covered by a ramp, validating all inputs
fn ramp_span(start_prescaler: u32, soll_prescaler: u32, value: u32) -> Result<u32> {
    if start_prescaler < 1 || soll_prescaler < 1 || value < 1 {
        return Err(InvalidArgument::InvalidRampInput {
            start_prescaler,
            soll_prescaler,
            value,
        }
        .into());
    }
    if start_prescaler < soll_prescaler {
        return Err(InvalidArgument::SpeedOrder {
            start_prescaler,
            soll_prescaler,
        }
        .into());
    }
    Ok(start_prescaler - soll_prescaler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const UNITS: Units = Units::new(1_000_000);

    #[test]
    fn test_prescaler() {
        assert_eq!(UNITS.prescaler(100.0).unwrap(), 10_000);
        assert_eq!(UNITS.prescaler(1000.0).unwrap(), 1_000);
        // floor, not round
        assert_eq!(UNITS.prescaler(3.0).unwrap(), 333_333);
    }

    #[test]
    fn test_prescaler_clamped_to_one() {
        assert_eq!(UNITS.prescaler(1_000_000.0).unwrap(), 1);
        assert_eq!(UNITS.prescaler(5_000_000.0).unwrap(), 1);
        assert_eq!(UNITS.prescaler(f64::MAX).unwrap(), 1);
        assert_eq!(UNITS.prescaler(1e-9).unwrap(), u32::MAX);
    }

    #[test]
    fn test_prescaler_rejects_non_positive() {
        for speed in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                UNITS.prescaler(speed),
                Err(Error::InvalidArgument(InvalidArgument::NonPositiveSpeed(_)))
            ));
        }
    }

    #[test]
    fn test_speed() {
        assert_eq!(UNITS.speed(10_000).unwrap(), 100.0);
        assert_eq!(
            UNITS.speed(0).unwrap_err(),
            Error::InvalidArgument(InvalidArgument::InvalidPrescaler(0))
        );
    }

    #[test]
    fn test_speed_prescaler_roundtrip_is_close() {
        for speed in [1.0, 3.0, 7.5, 100.0, 333.0, 999.9, 12_345.6, 250_000.0] {
            let prescaler = UNITS.prescaler(speed).unwrap();
            let back = UNITS.speed(prescaler).unwrap();
            let expected = 1_000_000.0 / ((1_000_000.0 / speed) as u32 as f64);
            assert!((back - expected).abs() <= expected * f64::EPSILON);
            assert!(back >= speed);
        }
    }

    #[test]
    fn test_acceleration_from_steps() {
        assert_eq!(UNITS.acceleration_from_steps(10_000, 1_000, 50).unwrap(), 180);
        // rounds up
        assert_eq!(UNITS.acceleration_from_steps(10_000, 1_000, 7).unwrap(), 1286);
        // no ramp still writes a non-zero acceleration
        assert_eq!(UNITS.acceleration_from_steps(500, 500, 10).unwrap(), 1);
    }

    #[test]
    fn test_acceleration_rejects_bad_input() {
        assert!(matches!(
            UNITS.acceleration_from_steps(0, 1, 1),
            Err(Error::InvalidArgument(InvalidArgument::InvalidRampInput { .. }))
        ));
        assert!(matches!(
            UNITS.acceleration_from_steps(10, 1, 0),
            Err(Error::InvalidArgument(InvalidArgument::InvalidRampInput { .. }))
        ));
        assert_eq!(
            UNITS.acceleration_from_steps(1_000, 10_000, 50).unwrap_err(),
            Error::InvalidArgument(InvalidArgument::SpeedOrder {
                start_prescaler: 1_000,
                soll_prescaler: 10_000
            })
        );
    }

    #[test]
    fn test_steps_from_acceleration() {
        assert_eq!(UNITS.steps_from_acceleration(10_000, 1_000, 180).unwrap(), 50.0);
        assert_eq!(UNITS.steps_from_acceleration(500, 500, 1).unwrap(), 0.0);
        assert!(UNITS.steps_from_acceleration(10_000, 1_000, 0).is_err());
    }
}
