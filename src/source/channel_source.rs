//! Channel-backed event source
//!
//! Any producer holding an [`EventInjector`] can push raw events; the source
//! side waits up to one poll interval for the first event, then drains
//! everything already queued into a single batch.

use crate::error::SourceError;
use crate::source::{EventSource, RawEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::debug;

/// Cloneable producer handle for a [`ChannelSource`]
#[derive(Debug, Clone)]
pub struct EventInjector {
    sender: Sender<RawEvent>,
}

impl EventInjector {
    /// Queues one event, returns `false` once the source has been dropped
    pub fn inject(&self, event: RawEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Queues a batch in order, stopping at the first failed send
    pub fn inject_all(&self, events: impl IntoIterator<Item = RawEvent>) -> bool {
        events.into_iter().all(|event| self.inject(event))
    }
}

#[derive(Debug)]
pub struct ChannelSource {
    receiver: Receiver<RawEvent>,
    poll_interval: Duration,
}

impl ChannelSource {
    /// Creates a source and its injector
    pub fn new(poll_interval: Duration) -> (Self, EventInjector) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (
            Self::from_receiver(receiver, poll_interval),
            EventInjector { sender },
        )
    }

    pub(crate) fn from_receiver(receiver: Receiver<RawEvent>, poll_interval: Duration) -> Self {
        Self {
            receiver,
            poll_interval,
        }
    }
}

impl EventSource for ChannelSource {
    fn next_batch(&mut self) -> Result<Vec<RawEvent>, SourceError> {
        let first = match self.receiver.recv_timeout(self.poll_interval) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SourceError::Disconnected(
                    "all event producers dropped".to_string(),
                ))
            }
        };

        let mut batch = Vec::with_capacity(1 + self.receiver.len());
        batch.push(first);
        batch.extend(self.receiver.try_iter());
        debug!("Drained batch of {} raw events", batch.len());
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_on_timeout() {
        let (mut source, _injector) = ChannelSource::new(Duration::from_millis(5));
        assert!(source.next_batch().unwrap().is_empty());
    }

    #[test]
    fn test_batch_drains_queue_in_order() {
        let (mut source, injector) = ChannelSource::new(Duration::from_millis(5));
        assert!(injector.inject_all([
            RawEvent::new("ABS_X", 1),
            RawEvent::new("ABS_Y", 2),
            RawEvent::new("BTN_SOUTH", 1),
        ]));

        let batch = source.next_batch().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], RawEvent::new("ABS_X", 1));
        assert_eq!(batch[2].code, "BTN_SOUTH");
        assert!(source.next_batch().unwrap().is_empty());
    }

    #[test]
    fn test_disconnected_when_injectors_dropped() {
        let (mut source, injector) = ChannelSource::new(Duration::from_millis(5));
        drop(injector);
        assert!(matches!(
            source.next_batch(),
            Err(SourceError::Disconnected(_))
        ));
    }

    #[test]
    fn test_inject_fails_after_source_dropped() {
        let (source, injector) = ChannelSource::new(Duration::from_millis(5));
        drop(source);
        assert!(!injector.inject(RawEvent::new("ABS_X", 0)));
    }
}
