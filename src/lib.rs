//! Continuous gamepad sampling with a normalized, concurrently readable state
//!
//! ```rust
//! use padreader::source::{ChannelSource, RawEvent};
//! use padreader::{ControlId, ControllerReader, ReaderSettings};
//!
//! let settings = ReaderSettings::default();
//! let (source, injector) = ChannelSource::new(settings.poll_interval());
//! let reader = ControllerReader::with_source(settings, source).unwrap();
//!
//! assert!(reader.read().is_zeroed());
//! reader.start().unwrap();
//! injector.inject(RawEvent::new("ABS_X", 16384));
//! # while reader.read().sequence == 0 { std::thread::yield_now(); }
//! reader.stop();
//! assert_eq!(reader.read().get(ControlId::JoyLeftX), 0.5);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod source;

pub use config::ReaderConfig;
pub use controller::control::{ControlClass, ControlId, Side};
pub use controller::key_map::{KeyMap, LayoutOverride};
pub use controller::normalize::{round_to, Normalizer, Scale, Tolerances};
pub use controller::state::Snapshot;
pub use controller::{ControllerReader, ReaderSettings};
pub use error::{ReaderError, SourceError};
