//! Controller Reader - public API of the input-normalization pipeline
//!
//! Owns one event source, the background sampling thread that drains it, and
//! the state record the thread publishes. Readers get cheap, independent
//! copies of the record at any time, including before `start` and after
//! `stop`.
//!

use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::key_map::{KeyMap, LayoutOverride};
use super::normalize::{Normalizer, Scale, Tolerances};
use super::sampler::{run_sampling_loop, Sampler, Waiting};
use super::state::Snapshot;
use crate::error::ReaderError;
use crate::source::EventSource;

/// Configuration for a [`ControllerReader`]
///
/// Fixed for the lifetime of a reader; tolerances and precision cannot change
/// while sampling.
///
/// # Examples
///
/// ```rust
/// use padreader::{ReaderSettings, Tolerances};
///
/// // Worn sticks need a wider deadzone
/// let settings = ReaderSettings {
///     tolerances: Tolerances {
///         left_joystick: 0.3,
///         right_joystick: 0.3,
///         ..Tolerances::default()
///     },
///     precision: 3,
///     ..ReaderSettings::default()
/// };
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ReaderSettings {
    /// Deadzone per stick and trigger, as a fraction of full scale
    pub tolerances: Tolerances,

    /// Decimal digits stick and trigger values are rounded to
    pub precision: u32,

    /// Hardware maxima used to scale stick and trigger magnitudes
    pub scale: Scale,

    /// Raw code overrides applied on top of the default layout
    pub layout: LayoutOverride,

    /// Which connected gamepad to open, in platform enumeration order
    pub device_index: usize,

    /// Upper bound on how long the sampler blocks on the source at once
    ///
    /// Also bounds how long `stop` waits for the sampler to notice.
    pub poll_interval_ms: u64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            precision: 4,
            scale: Scale::default(),
            layout: LayoutOverride::new(),
            device_index: 0,
            poll_interval_ms: 50,
        }
    }
}

impl ReaderSettings {
    pub fn validate(&self) -> Result<(), ReaderError> {
        self.build().map(|_| ())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn build(&self) -> Result<(KeyMap, Normalizer), ReaderError> {
        if self.poll_interval_ms == 0 {
            return Err(ReaderError::InvalidSettings(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }
        let normalizer = Normalizer::new(self.tolerances, self.precision, self.scale)?;
        let key_map = KeyMap::with_overrides(&self.layout)?;
        Ok((key_map, normalizer))
    }
}

type Task = Box<dyn FnOnce() + Send>;

fn spawn_named(task: Task) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("pad-sampler".to_string())
        .spawn(task)
}

// Hands the sampler to a new thread through a one-slot channel, so it can be
// taken back when the thread never starts
fn launch(
    sampler: Sampler<Waiting>,
    spawn: fn(Task) -> io::Result<JoinHandle<()>>,
) -> Result<JoinHandle<()>, (io::Error, Option<Sampler<Waiting>>)> {
    let (handoff, pickup) = crossbeam_channel::bounded(1);
    if let Err(returned) = handoff.send(sampler) {
        return Err((
            io::Error::other("sampler handoff failed"),
            Some(returned.into_inner()),
        ));
    }

    let thread_pickup = pickup.clone();
    spawn(Box::new(move || {
        if let Ok(sampler) = thread_pickup.recv() {
            run_sampling_loop(sampler);
        }
    }))
    .map_err(|e| (e, pickup.try_recv().ok()))
}

// Reader lifecycle, guarded by one mutex
enum Lifecycle {
    Idle(Sampler<Waiting>),
    Running {
        cancel: CancellationToken,
        worker: JoinHandle<()>,
    },
    Stopped,
}

/// Continuously sampled, normalized view of one gamepad
///
/// # Threading Model
///
/// `start` spawns one sampler thread that exclusively owns the event source.
/// The state record lives in a `watch` channel: the sampler replaces it once
/// per batch, readers clone the current value. A reader never sees a
/// half-written value and never waits on the event source.
///
/// ```text
/// EventSource ──► Sampler thread ──[watch]──► read() / subscribe()
///                 (normalize)
/// ```
///
/// # Lifecycle
///
/// `Idle ──start──► Running ──stop──► Stopped`
///
/// * `start` while running is a no-op that logs a warning
/// * `start` after `stop` fails with [`ReaderError::AlreadyStopped`]
/// * `stop` is idempotent and also runs on drop
pub struct ControllerReader {
    lifecycle: Mutex<Lifecycle>,
    snapshots: watch::Receiver<Snapshot>,
}

impl ControllerReader {
    /// Opens the physical gamepad at `settings.device_index`
    ///
    /// # Errors
    ///
    /// * [`ReaderError::DeviceUnavailable`] - no gamepad could be opened
    /// * [`ReaderError::InvalidSettings`] / [`ReaderError::InvalidLayout`] - rejected settings
    #[cfg(feature = "gilrs")]
    pub fn new(settings: ReaderSettings) -> Result<Self, ReaderError> {
        settings.validate()?;
        let source =
            crate::source::GilrsSource::acquire(settings.device_index, settings.poll_interval())?;
        Self::with_source(settings, source)
    }

    /// Binds the reader to an arbitrary event source
    pub fn with_source(
        settings: ReaderSettings,
        source: impl EventSource,
    ) -> Result<Self, ReaderError> {
        info!("Initializing controller reader with settings: {:?}", settings);

        let (key_map, normalizer) = settings.build()?;
        let (publisher, snapshots) = watch::channel(Snapshot::default());

        let sampler = Sampler::create(
            Box::new(source),
            key_map,
            normalizer,
            publisher,
            CancellationToken::new(),
            settings.poll_interval(),
        );

        Ok(Self {
            lifecycle: Mutex::new(Lifecycle::Idle(sampler)),
            snapshots,
        })
    }

    /// Starts the sampling thread and returns immediately
    ///
    /// # Errors
    ///
    /// * [`ReaderError::AlreadyStopped`] - the reader was stopped before
    /// * [`ReaderError::Spawn`] - the thread could not be created; the reader
    ///   stays idle with its source and `start` may be retried
    pub fn start(&self) -> Result<(), ReaderError> {
        let mut lifecycle = self.lock();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(sampler) => {
                let cancel = sampler.cancel_token();
                match launch(sampler, spawn_named) {
                    Ok(worker) => {
                        info!("Controller reader started");
                        *lifecycle = Lifecycle::Running { cancel, worker };
                        Ok(())
                    }
                    Err((e, sampler)) => {
                        error!("Failed to spawn sampler thread: {}", e);
                        if let Some(sampler) = sampler {
                            *lifecycle = Lifecycle::Idle(sampler);
                        }
                        Err(ReaderError::Spawn(e.to_string()))
                    }
                }
            }
            running @ Lifecycle::Running { .. } => {
                warn!("start() called while already running, ignoring");
                *lifecycle = running;
                Ok(())
            }
            Lifecycle::Stopped => Err(ReaderError::AlreadyStopped),
        }
    }

    /// Stops sampling and waits for the sampler thread to exit
    ///
    /// Once this returns the record is frozen. Calling it again, or on a
    /// reader that was never started, returns immediately.
    pub fn stop(&self) {
        let mut lifecycle = self.lock();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { cancel, worker } => {
                info!("Stopping controller reader");
                cancel.cancel();
                if worker.join().is_err() {
                    error!("Sampler thread panicked");
                }
                info!("Controller reader stopped");
            }
            Lifecycle::Idle(_) => debug!("Reader stopped before it was started"),
            Lifecycle::Stopped => {}
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), Lifecycle::Running { .. })
    }

    /// Independent copy of all control values
    pub fn read(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified whenever a batch changes the record
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        debug!("New subscriber to controller state");
        self.snapshots.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ControllerReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelSource;

    fn idle_sampler() -> (Sampler<Waiting>, CancellationToken) {
        let (source, _injector) = ChannelSource::new(Duration::from_millis(5));
        let (publisher, _snapshots) = watch::channel(Snapshot::default());
        let cancel = CancellationToken::new();
        let sampler = Sampler::create(
            Box::new(source),
            KeyMap::default(),
            Normalizer::default(),
            publisher,
            cancel.clone(),
            Duration::from_millis(5),
        );
        (sampler, cancel)
    }

    #[test]
    fn test_failed_spawn_hands_the_sampler_back() {
        let (sampler, _cancel) = idle_sampler();
        let result = launch(sampler, |_| Err(io::Error::other("thread limit reached")));

        let Err((e, returned)) = result else {
            panic!("spawn should have failed");
        };
        assert_eq!(e.to_string(), "thread limit reached");
        assert!(returned.is_some());
    }

    #[test]
    fn test_launched_sampler_runs_until_cancelled() {
        let (sampler, cancel) = idle_sampler();
        let worker = launch(sampler, spawn_named).map_err(|(e, _)| e).unwrap();
        assert_eq!(worker.thread().name(), Some("pad-sampler"));

        cancel.cancel();
        worker.join().unwrap();
    }
}
