//! Raw event sources feeding the sampler
//!
//! A source yields batches of `(code, magnitude)` pairs. It is owned by the
//! sampler thread alone and is never touched by readers.
//!
//! 1. [`channel_source`] - crossbeam channel fed by an [`EventInjector`]
//! 2. [`gilrs_source`] - physical gamepad through gilrs (feature `gilrs`)

pub mod channel_source;
#[cfg(feature = "gilrs")]
pub mod gilrs_source;

pub use channel_source::{ChannelSource, EventInjector};
#[cfg(feature = "gilrs")]
pub use gilrs_source::GilrsSource;

use crate::error::SourceError;

/// A single hardware-reported change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub code: String,
    pub magnitude: i32,
}

impl RawEvent {
    pub fn new(code: impl Into<String>, magnitude: i32) -> Self {
        Self {
            code: code.into(),
            magnitude,
        }
    }
}

/// Blocking producer of raw event batches
///
/// `next_batch` may wait, but implementations should bound the wait so the
/// sampler can notice a stop request. An empty batch is a normal result.
pub trait EventSource: Send + 'static {
    fn next_batch(&mut self) -> Result<Vec<RawEvent>, SourceError>;
}

impl EventSource for Box<dyn EventSource> {
    fn next_batch(&mut self) -> Result<Vec<RawEvent>, SourceError> {
        (**self).next_batch()
    }
}
