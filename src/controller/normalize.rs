//! Per-class normalization of raw magnitudes
//!
//! Sticks and triggers are scaled by the hardware maximum, rounded to the
//! configured precision and then deadzone-filtered. Hat axes and buttons are
//! already discrete and pass through, clamped into their value sets.

use crate::controller::control::{ControlClass, ControlId, Side};
use crate::error::ReaderError;
use serde::{Deserialize, Serialize};

/// Largest supported rounding precision in decimal digits
pub const MAX_PRECISION: u32 = 12;

/// Deadzone thresholds as a fraction of full scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tolerances {
    pub left_joystick: f64,
    pub right_joystick: f64,
    pub left_trigger: f64,
    pub right_trigger: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            left_joystick: 0.2,
            right_joystick: 0.2,
            left_trigger: 0.05,
            right_trigger: 0.05,
        }
    }
}

impl Tolerances {
    pub fn joystick(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_joystick,
            Side::Right => self.right_joystick,
        }
    }

    pub fn trigger(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_trigger,
            Side::Right => self.right_trigger,
        }
    }

    pub fn validate(&self) -> Result<(), ReaderError> {
        let fields = [
            ("left_joystick", self.left_joystick),
            ("right_joystick", self.right_joystick),
            ("left_trigger", self.left_trigger),
            ("right_trigger", self.right_trigger),
        ];
        for (name, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ReaderError::InvalidSettings(format!(
                    "{} tolerance must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Hardware full-scale magnitudes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scale {
    pub joystick_max: u32,
    pub trigger_max: u32,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            joystick_max: 32768,
            trigger_max: 256,
        }
    }
}

/// Rounds `value` to `precision` decimal digits, halves to the even digit
///
/// Both scale maxima are powers of two, so exact halves such as
/// `40 / 256 = 0.15625` show up in normal use.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round_ties_even() / factor
}

/// Pure transform from `(control, raw magnitude)` to a stored value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalizer {
    tolerances: Tolerances,
    precision: u32,
    scale: Scale,
}

impl Normalizer {
    pub fn new(tolerances: Tolerances, precision: u32, scale: Scale) -> Result<Self, ReaderError> {
        tolerances.validate()?;
        if precision > MAX_PRECISION {
            return Err(ReaderError::InvalidSettings(format!(
                "precision must be at most {} digits, got {}",
                MAX_PRECISION, precision
            )));
        }
        if scale.joystick_max == 0 || scale.trigger_max == 0 {
            return Err(ReaderError::InvalidSettings(
                "scale maxima must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            tolerances,
            precision,
            scale,
        })
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Normalizes `raw` for `control`; the result is always in the control's range
    pub fn apply(&self, control: ControlId, raw: i32) -> f64 {
        match control.class() {
            ControlClass::Joystick(side) => {
                let ratio = (raw as f64 / self.scale.joystick_max as f64).clamp(-1.0, 1.0);
                let value = round_to(ratio, self.precision);
                if value.abs() >= self.tolerances.joystick(side) {
                    value
                } else {
                    0.0
                }
            }
            ControlClass::Trigger(side) => {
                let ratio = (raw as f64 / self.scale.trigger_max as f64).clamp(0.0, 1.0);
                let value = round_to(ratio, self.precision);
                if value >= self.tolerances.trigger(side) {
                    value
                } else {
                    0.0
                }
            }
            ControlClass::DPad => raw.signum() as f64,
            ControlClass::Button => raw.clamp(0, 1) as f64,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            precision: 4,
            scale: Scale::default(),
        }
    }
}
