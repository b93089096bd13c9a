//! Error types for the controller reader
//!
//! Construction is the only place a caller has to handle failures explicitly.
//! Anything that goes wrong while sampling is logged by the sampler and
//! degrades to stale values instead of surfacing here.

use thiserror::Error;

/// Errors returned by [`ControllerReader`](crate::ControllerReader) and its configuration
#[derive(Debug, Error)]
pub enum ReaderError {
    /// No controller could be opened at construction time
    ///
    /// Covers a missing gamepad at the requested index as well as a platform
    /// input API that failed to initialise. Never retried internally.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Tolerances, precision, scales or poll interval out of range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The code to control layout is not injective or contains empty codes
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// The configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start` was called after the reader had been stopped
    ///
    /// A stopped reader keeps its last record frozen and cannot sample again.
    #[error("Reader has already been stopped")]
    AlreadyStopped,

    /// The sampler thread could not be spawned
    #[error("Failed to spawn sampler: {0}")]
    Spawn(String),
}

/// Errors reported by an [`EventSource`](crate::source::EventSource)
#[derive(Debug, Error)]
pub enum SourceError {
    /// The producer side of the source is gone (device unplugged, injector dropped)
    #[error("Event source disconnected: {0}")]
    Disconnected(String),

    /// Any other read failure; the sampler skips it and keeps going
    #[error("Failed to read events: {0}")]
    ReadError(String),
}
