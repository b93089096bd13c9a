use chrono::{DateTime, Local};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::key_map::KeyMap;
use crate::controller::normalize::Normalizer;
use crate::controller::state::Snapshot;
use crate::error::SourceError;
use crate::source::{EventSource, RawEvent};

// Batch pulled from the source for the applying state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<RawEvent>,
}

// Sampler states: block on the source, then fold the batch into the record
#[state]
#[derive(Debug, Clone)]
pub enum SamplingState {
    Waiting,
    Applying(EventBatch),
}

#[derive(Debug)]
struct SamplerStats {
    batches: u64,
    events: u64,
    unmapped: u64,
    last_log_time: DateTime<Local>,
}

impl SamplerStats {
    fn new() -> Self {
        Self {
            batches: 0,
            events: 0,
            unmapped: 0,
            last_log_time: Local::now(),
        }
    }
}

#[machine]
pub struct Sampler<S: SamplingState> {
    // Exclusively owned by the sampling thread
    source: Box<dyn EventSource>,

    key_map: KeyMap,
    normalizer: Normalizer,

    // Publishes a fresh record after each batch that changed something
    publisher: watch::Sender<Snapshot>,

    cancel: CancellationToken,

    // Backoff after a source error
    poll_interval: Duration,

    // Set while the source reports disconnected, to log it once
    disconnected: bool,

    stats: SamplerStats,
}

impl<S: SamplingState> Sampler<S> {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Sampler<Waiting> {
    pub fn create(
        source: Box<dyn EventSource>,
        key_map: KeyMap,
        normalizer: Normalizer,
        publisher: watch::Sender<Snapshot>,
        cancel: CancellationToken,
        poll_interval: Duration,
    ) -> Self {
        debug!(
            "Creating sampler with {} mapped codes, precision {}",
            key_map.len(),
            normalizer.precision()
        );
        Self::new(
            source,
            key_map,
            normalizer,
            publisher,
            cancel,
            poll_interval,
            false,
            SamplerStats::new(),
        )
    }

    // Block on the source for the next batch; errors become an empty batch
    pub fn wait_for_batch(mut self) -> Sampler<Applying> {
        let events = match self.source.next_batch() {
            Ok(events) => {
                if self.disconnected {
                    info!("Event source reconnected");
                    self.disconnected = false;
                }
                events
            }
            Err(SourceError::Disconnected(reason)) => {
                if !self.disconnected {
                    warn!("Event source disconnected: {}", reason);
                    self.disconnected = true;
                }
                std::thread::sleep(self.poll_interval);
                Vec::new()
            }
            Err(e) => {
                warn!("Skipping failed read: {}", e);
                std::thread::sleep(self.poll_interval);
                Vec::new()
            }
        };

        self.transition_with(EventBatch { events })
    }
}

impl Sampler<Applying> {
    // Normalize every event of the batch and publish the result
    pub fn apply_batch(mut self) -> Sampler<Waiting> {
        // Anything read after stop was requested must not reach the record
        if self.cancel.is_cancelled() {
            if let Some(batch) = self.get_state_data() {
                if !batch.events.is_empty() {
                    debug!("Discarding {} events read after stop", batch.events.len());
                }
            }
            return self.transition();
        }

        let mut event_count = 0u64;
        let mut unmapped = 0u64;

        if let Some(batch) = self.get_state_data() {
            event_count = batch.events.len() as u64;

            // Work on a private copy so readers only wait for the swap
            let mut next = self.publisher.borrow().clone();
            let mut changed = false;
            for event in &batch.events {
                let Some(control) = self.key_map.lookup(&event.code) else {
                    unmapped += 1;
                    continue;
                };
                let value = self.normalizer.apply(control, event.magnitude);
                debug!("{} ({}={}) -> {}", control, event.code, event.magnitude, value);
                changed |= next.set(control, value);
            }

            if changed {
                next.mark_updated(Local::now());
                self.publisher.send_replace(next);
            }
        }

        self.stats.batches += 1;
        self.stats.events += event_count;
        self.stats.unmapped += unmapped;
        self.log_stats();

        self.transition()
    }

    fn log_stats(&mut self) {
        let now = Local::now();
        let elapsed = now - self.stats.last_log_time;
        if elapsed > chrono::Duration::seconds(10) {
            let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
            info!(
                "Sampler stats: {} events in {} batches over {:.1}s ({:.2}/sec), {} unmapped",
                self.stats.events,
                self.stats.batches,
                seconds,
                self.stats.events as f64 / seconds,
                self.stats.unmapped
            );
            self.stats = SamplerStats::new();
        }
    }
}

/// Runs the sampler until its cancellation token fires
pub fn run_sampling_loop(mut sampler: Sampler<Waiting>) {
    info!("Starting sampling loop");
    while !sampler.cancel.is_cancelled() {
        sampler = sampler.wait_for_batch().apply_batch();
    }
    info!("Sampling loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::control::ControlId;
    use crate::source::ChannelSource;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn sampler_with_source() -> (
        Sampler<Waiting>,
        crate::source::EventInjector,
        watch::Receiver<Snapshot>,
        CancellationToken,
    ) {
        let (source, injector) = ChannelSource::new(Duration::from_millis(5));
        let (publisher, receiver) = watch::channel(Snapshot::default());
        let cancel = CancellationToken::new();
        let sampler = Sampler::create(
            Box::new(source),
            KeyMap::default(),
            Normalizer::default(),
            publisher,
            cancel.clone(),
            Duration::from_millis(5),
        );
        (sampler, injector, receiver, cancel)
    }

    #[test]
    fn test_batch_is_applied_in_order() {
        let (sampler, injector, receiver, _cancel) = sampler_with_source();
        injector.inject_all([
            RawEvent::new("ABS_X", 16384),
            RawEvent::new("BTN_SOUTH", 1),
            RawEvent::new("ABS_X", -32768),
        ]);

        let _sampler = sampler.wait_for_batch().apply_batch();
        let snapshot = receiver.borrow().clone();
        assert_eq!(snapshot.get(ControlId::JoyLeftX), -1.0);
        assert_eq!(snapshot.get(ControlId::A), 1.0);
        assert_eq!(snapshot.sequence, 1);
    }

    #[test]
    fn test_unmapped_only_batch_publishes_nothing() {
        let (sampler, injector, receiver, _cancel) = sampler_with_source();
        injector.inject(RawEvent::new("ABS_UNKNOWN", 999));

        let _sampler = sampler.wait_for_batch().apply_batch();
        assert!(!receiver.has_changed().unwrap());
        assert!(receiver.borrow().is_zeroed());
        assert_eq!(receiver.borrow().sequence, 0);
    }

    #[test]
    fn test_reads_are_served_while_a_large_batch_is_applied() {
        let (sampler, injector, receiver, _cancel) = sampler_with_source();
        let events: Vec<_> = (0..200_000i32)
            .map(|i| RawEvent::new(if i % 2 == 0 { "ABS_X" } else { "ABS_RZ" }, i % 30000))
            .collect();
        injector.inject_all(events);
        let applying = sampler.wait_for_batch();

        let done = Arc::new(AtomicBool::new(false));
        let worker = {
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let started = Instant::now();
                let _sampler = applying.apply_batch();
                let applied = started.elapsed();
                done.store(true, Ordering::SeqCst);
                applied
            })
        };

        let mut slowest = Duration::ZERO;
        loop {
            let started = Instant::now();
            let snapshot = receiver.borrow().clone();
            slowest = slowest.max(started.elapsed());
            assert!(snapshot.iter().all(|(control, value)| control.accepts(value)));
            if done.load(Ordering::SeqCst) {
                break;
            }
        }
        let applied = worker.join().unwrap();

        // a read that waited for the whole batch would take about as long as the batch
        let bound = Duration::from_millis(5).max(applied / 2);
        assert!(slowest <= bound, "read took {:?}, batch {:?}", slowest, applied);
        assert_eq!(receiver.borrow().sequence, 1);
    }

    #[test]
    fn test_batch_after_cancel_is_discarded() {
        let (sampler, injector, receiver, cancel) = sampler_with_source();
        injector.inject(RawEvent::new("ABS_Z", 128));

        let applying = sampler.wait_for_batch();
        cancel.cancel();
        let _sampler = applying.apply_batch();
        assert!(receiver.borrow().is_zeroed());
    }

    #[test]
    fn test_disconnected_source_does_not_stop_sampling() {
        let (sampler, injector, receiver, _cancel) = sampler_with_source();
        drop(injector);

        let sampler = sampler.wait_for_batch().apply_batch();
        let _sampler = sampler.wait_for_batch().apply_batch();
        assert!(receiver.borrow().is_zeroed());
    }
}
