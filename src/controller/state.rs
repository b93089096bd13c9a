//! Controller state record and the snapshots handed to readers

use crate::controller::control::ControlId;
use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use strum::EnumCount;

/// Immutable copy of every control value at one point in time
///
/// Each field is overwritten in place by the sampler, last write wins. A
/// control that has not fired since its last change keeps its old value;
/// `sequence` and `updated_at` let consumers tell how fresh the record is.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    values: [f64; ControlId::COUNT],

    // Number of batches that changed the record
    pub sequence: u64,

    // Local time of the last change, None while still zero-initialized
    pub updated_at: Option<DateTime<Local>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            values: [0.0; ControlId::COUNT],
            sequence: 0,
            updated_at: None,
        }
    }
}

impl Snapshot {
    pub fn get(&self, control: ControlId) -> f64 {
        self.values[control.index()]
    }

    /// Stores `value` for `control`, returns whether the field changed
    pub(crate) fn set(&mut self, control: ControlId, value: f64) -> bool {
        let slot = &mut self.values[control.index()];
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub(crate) fn mark_updated(&mut self, at: DateTime<Local>) {
        self.sequence += 1;
        self.updated_at = Some(at);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControlId, f64)> + '_ {
        ControlId::all().map(move |control| (control, self.get(control)))
    }

    /// Values keyed by control, in control order
    pub fn to_map(&self) -> BTreeMap<ControlId, f64> {
        self.iter().collect()
    }

    pub fn is_zeroed(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ControlId::COUNT + 2))?;
        for (control, value) in self.iter() {
            map.serialize_entry(&control, &value)?;
        }
        map.serialize_entry("sequence", &self.sequence)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        map.end()
    }
}
