//! Controller subsystem: from raw hardware events to a normalized record
//!
//! 1. [`control`] - the 19 logical controls and their value ranges
//! 2. [`key_map`] - raw code to control lookup, overridable per layout
//! 3. [`normalize`] - scaling, rounding and deadzones per control class
//! 4. [`state`] - the state record and the snapshots readers receive
//! 5. [`sampler`] - background loop turning event batches into state
//! 6. [`controller_handle`] - [`ControllerReader`], lifecycle and public API
//!
//! # Architecture
//!
//! ```text
//! EventSource ──► Sampler ──► Snapshot ──► read()
//!  (raw codes)   (KeyMap + Normalizer)
//! ```

pub mod control;
pub mod controller_handle;
pub mod key_map;
pub mod normalize;
pub mod sampler;
pub mod state;

pub use controller_handle::{ControllerReader, ReaderSettings};
