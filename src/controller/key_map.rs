//! Hardware code to control mapping
//!
//! The map is data, not behaviour: a layout is a table of
//! `control -> raw code` that gets inverted into a lookup keyed by the raw
//! code string. Codes are compared by value, never by identity.

use crate::controller::control::ControlId;
use crate::error::ReaderError;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Partial `control -> code` table merged over the default layout
pub type LayoutOverride = BTreeMap<ControlId, String>;

// Default layout: Linux evdev names reported by an Xbox 360 pad
const DEFAULT_LAYOUT: [(ControlId, &str); 19] = [
    (ControlId::JoyLeftX, "ABS_X"),
    (ControlId::JoyLeftY, "ABS_Y"),
    (ControlId::JoyRightX, "ABS_RX"),
    (ControlId::JoyRightY, "ABS_RY"),
    (ControlId::DPadX, "ABS_HAT0X"),
    (ControlId::DPadY, "ABS_HAT0Y"),
    (ControlId::LeftTrigger, "ABS_Z"),
    (ControlId::RightTrigger, "ABS_RZ"),
    (ControlId::X, "BTN_NORTH"),
    (ControlId::Y, "BTN_WEST"),
    (ControlId::A, "BTN_SOUTH"),
    (ControlId::B, "BTN_EAST"),
    (ControlId::Back, "BTN_SELECT"),
    (ControlId::Start, "BTN_START"),
    (ControlId::Mode, "BTN_MODE"),
    (ControlId::LeftBumper, "BTN_TL"),
    (ControlId::RightBumper, "BTN_TR"),
    (ControlId::LeftThumb, "BTN_THUMBL"),
    (ControlId::RightThumb, "BTN_THUMBR"),
];

/// Immutable lookup from raw event code to control
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    codes: HashMap<String, ControlId>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            codes: DEFAULT_LAYOUT
                .iter()
                .map(|(control, code)| (code.to_string(), *control))
                .collect(),
        }
    }
}

impl KeyMap {
    /// Builds a map from the default layout with `overrides` applied on top
    ///
    /// Fails with [`ReaderError::InvalidLayout`] if a code is empty or if two
    /// controls end up bound to the same code.
    pub fn with_overrides(overrides: &LayoutOverride) -> Result<Self, ReaderError> {
        let mut layout: BTreeMap<ControlId, String> = DEFAULT_LAYOUT
            .iter()
            .map(|(control, code)| (*control, code.to_string()))
            .collect();

        for (control, code) in overrides {
            let code = code.trim();
            if code.is_empty() {
                return Err(ReaderError::InvalidLayout(format!(
                    "empty code for control {}",
                    control
                )));
            }
            debug!("Layout override: {} -> {}", control, code);
            layout.insert(*control, code.to_string());
        }

        let mut codes = HashMap::with_capacity(layout.len());
        for (control, code) in layout {
            if let Some(previous) = codes.insert(code.clone(), control) {
                return Err(ReaderError::InvalidLayout(format!(
                    "code {} is bound to both {} and {}",
                    code, previous, control
                )));
            }
        }

        Ok(Self { codes })
    }

    /// Control bound to `code`, `None` for unmapped hardware signals
    pub fn lookup(&self, code: &str) -> Option<ControlId> {
        self.codes.get(code).copied()
    }

    /// Raw code currently bound to `control`
    pub fn code_for(&self, control: ControlId) -> Option<&str> {
        self.codes
            .iter()
            .find(|(_, bound)| **bound == control)
            .map(|(code, _)| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_covers_every_control() {
        let map = KeyMap::default();
        assert_eq!(map.len(), 19);
        for control in ControlId::all() {
            assert!(map.code_for(control).is_some(), "{} unmapped", control);
        }
        assert_eq!(map.lookup("ABS_X"), Some(ControlId::JoyLeftX));
        assert_eq!(map.lookup("ABS_Z"), Some(ControlId::LeftTrigger));
        assert_eq!(map.lookup("BTN_NORTH"), Some(ControlId::X));
    }

    #[test]
    fn test_lookup_uses_value_equality() {
        let map = KeyMap::default();
        let owned = String::from("ABS_") + "RX";
        assert_eq!(map.lookup(&owned), Some(ControlId::JoyRightX));
        assert_eq!(map.lookup("ABS_UNKNOWN"), None);
        assert_eq!(map.lookup("abs_x"), None);
    }

    #[test]
    fn test_override_rebinds_control() {
        let mut overrides = LayoutOverride::new();
        overrides.insert(ControlId::A, "BTN_A".to_string());
        let map = KeyMap::with_overrides(&overrides).unwrap();

        assert_eq!(map.lookup("BTN_A"), Some(ControlId::A));
        assert_eq!(map.lookup("BTN_SOUTH"), None);
        assert_eq!(map.len(), 19);
    }

    #[test]
    fn test_override_swapping_codes_stays_injective() {
        let mut overrides = LayoutOverride::new();
        overrides.insert(ControlId::X, "BTN_WEST".to_string());
        overrides.insert(ControlId::Y, "BTN_NORTH".to_string());
        let map = KeyMap::with_overrides(&overrides).unwrap();

        assert_eq!(map.lookup("BTN_WEST"), Some(ControlId::X));
        assert_eq!(map.lookup("BTN_NORTH"), Some(ControlId::Y));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut overrides = LayoutOverride::new();
        overrides.insert(ControlId::B, "BTN_SOUTH".to_string());
        let err = KeyMap::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidLayout(_)));
    }

    #[test]
    fn test_empty_code_rejected() {
        let mut overrides = LayoutOverride::new();
        overrides.insert(ControlId::Start, "  ".to_string());
        assert!(matches!(
            KeyMap::with_overrides(&overrides),
            Err(ReaderError::InvalidLayout(_))
        ));
    }
}
