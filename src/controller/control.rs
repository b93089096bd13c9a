//! Logical controls tracked by the reader
//!
//! The 19 controls of a standard Xbox 360 style pad, grouped into the four
//! classes that decide how a raw magnitude is normalized.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

// Joystick/trigger side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Normalization class of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlClass {
    /// Continuous stick axis in [-1.0, 1.0]
    Joystick(Side),
    /// Discrete hat axis in {-1, 0, 1}
    DPad,
    /// Continuous trigger in [0.0, 1.0]
    Trigger(Side),
    /// Discrete button in {0, 1}
    Button,
}

/// One of the fixed logical controls
///
/// Variant order is the storage order inside a
/// [`Snapshot`](crate::controller::state::Snapshot), so `id as usize` is a
/// valid index into it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
pub enum ControlId {
    #[serde(rename = "JOY_LX")]
    #[strum(serialize = "JOY_LX")]
    JoyLeftX,
    #[serde(rename = "JOY_LY")]
    #[strum(serialize = "JOY_LY")]
    JoyLeftY,
    #[serde(rename = "JOY_RX")]
    #[strum(serialize = "JOY_RX")]
    JoyRightX,
    #[serde(rename = "JOY_RY")]
    #[strum(serialize = "JOY_RY")]
    JoyRightY,
    #[serde(rename = "DPAD_X")]
    #[strum(serialize = "DPAD_X")]
    DPadX,
    #[serde(rename = "DPAD_Y")]
    #[strum(serialize = "DPAD_Y")]
    DPadY,
    #[serde(rename = "L_TRIGGER")]
    #[strum(serialize = "L_TRIGGER")]
    LeftTrigger,
    #[serde(rename = "R_TRIGGER")]
    #[strum(serialize = "R_TRIGGER")]
    RightTrigger,
    #[serde(rename = "X")]
    #[strum(serialize = "X")]
    X,
    #[serde(rename = "Y")]
    #[strum(serialize = "Y")]
    Y,
    #[serde(rename = "A")]
    #[strum(serialize = "A")]
    A,
    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    B,
    #[serde(rename = "BACK")]
    #[strum(serialize = "BACK")]
    Back,
    #[serde(rename = "START")]
    #[strum(serialize = "START")]
    Start,
    // XBOX is the legacy name of the guide button
    #[serde(rename = "MODE", alias = "XBOX")]
    #[strum(to_string = "MODE", serialize = "XBOX")]
    Mode,
    #[serde(rename = "L_BUMPER")]
    #[strum(serialize = "L_BUMPER")]
    LeftBumper,
    #[serde(rename = "R_BUMPER")]
    #[strum(serialize = "R_BUMPER")]
    RightBumper,
    #[serde(rename = "L_THUMB")]
    #[strum(serialize = "L_THUMB")]
    LeftThumb,
    #[serde(rename = "R_THUMB")]
    #[strum(serialize = "R_THUMB")]
    RightThumb,
}

impl ControlId {
    pub fn class(self) -> ControlClass {
        match self {
            ControlId::JoyLeftX | ControlId::JoyLeftY => ControlClass::Joystick(Side::Left),
            ControlId::JoyRightX | ControlId::JoyRightY => ControlClass::Joystick(Side::Right),
            ControlId::DPadX | ControlId::DPadY => ControlClass::DPad,
            ControlId::LeftTrigger => ControlClass::Trigger(Side::Left),
            ControlId::RightTrigger => ControlClass::Trigger(Side::Right),
            ControlId::X
            | ControlId::Y
            | ControlId::A
            | ControlId::B
            | ControlId::Back
            | ControlId::Start
            | ControlId::Mode
            | ControlId::LeftBumper
            | ControlId::RightBumper
            | ControlId::LeftThumb
            | ControlId::RightThumb => ControlClass::Button,
        }
    }

    /// Position of this control inside a snapshot
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether `value` lies in the declared range of this control's class
    pub fn accepts(self, value: f64) -> bool {
        match self.class() {
            ControlClass::Joystick(_) => (-1.0..=1.0).contains(&value),
            ControlClass::Trigger(_) => (0.0..=1.0).contains(&value),
            ControlClass::DPad => value == -1.0 || value == 0.0 || value == 1.0,
            ControlClass::Button => value == 0.0 || value == 1.0,
        }
    }

    pub fn all() -> impl Iterator<Item = ControlId> {
        ControlId::iter()
    }
}
