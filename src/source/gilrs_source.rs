//! Physical gamepad source backed by gilrs
//!
//! gilrs reports pre-normalized values with its own axis and button names.
//! This source translates them back into evdev-style raw events so the rest
//! of the pipeline sees one uniform `(code, magnitude)` stream:
//!
//! ```text
//! gilrs ──► reader thread ──[RawEvent]──► ChannelSource ──► Sampler
//!           (translate)     (crossbeam)
//! ```
//!
//! The gilrs context lives on its own thread because it is polled, not
//! blocking; the sampler only ever waits on the channel.

use crate::error::{ReaderError, SourceError};
use crate::source::{ChannelSource, EventSource, RawEvent};
use crossbeam_channel::{RecvTimeoutError, Sender};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const STICK_MAX: f32 = 32767.0;
const TRIGGER_MAX: f32 = 255.0;

// Roughly one USB polling period
const GILRS_POLL: Duration = Duration::from_millis(4);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GilrsSource {
    events: ChannelSource,
    shutdown: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl GilrsSource {
    /// Opens the `index`-th connected gamepad
    ///
    /// # Errors
    ///
    /// [`ReaderError::DeviceUnavailable`] if gilrs fails to initialise, no
    /// gamepad is connected at `index`, or the reader thread does not report
    /// back in time.
    pub fn acquire(index: usize, poll_interval: Duration) -> Result<Self, ReaderError> {
        info!("Acquiring gamepad #{} through gilrs", index);

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<String, String>>(1);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let shutdown = CancellationToken::new();
        let reader_shutdown = shutdown.clone();

        let reader = std::thread::Builder::new()
            .name("gilrs-reader".to_string())
            .spawn(move || run_reader(index, ready_tx, event_tx, reader_shutdown))
            .map_err(|e| ReaderError::Spawn(e.to_string()))?;

        match ready_rx.recv_timeout(ACQUIRE_TIMEOUT) {
            Ok(Ok(name)) => {
                info!("Selected gamepad #{}: {}", index, name);
                Ok(Self {
                    events: ChannelSource::from_receiver(event_rx, poll_interval),
                    shutdown,
                    reader: Some(reader),
                })
            }
            Ok(Err(reason)) => {
                error!("Gamepad #{} unavailable: {}", index, reason);
                let _ = reader.join();
                Err(ReaderError::DeviceUnavailable(reason))
            }
            Err(RecvTimeoutError::Timeout) => {
                shutdown.cancel();
                Err(ReaderError::DeviceUnavailable(
                    "gilrs did not initialise in time".to_string(),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ReaderError::DeviceUnavailable(
                "gilrs reader thread exited during setup".to_string(),
            )),
        }
    }
}

impl EventSource for GilrsSource {
    fn next_batch(&mut self) -> Result<Vec<RawEvent>, SourceError> {
        self.events.next_batch()
    }
}

impl Drop for GilrsSource {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("gilrs reader thread panicked");
            }
        }
    }
}

fn run_reader(
    index: usize,
    ready: Sender<Result<String, String>>,
    events: Sender<RawEvent>,
    shutdown: CancellationToken,
) {
    let mut gilrs = match Gilrs::new() {
        Ok(g) => g,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to initialise gilrs: {}", e)));
            return;
        }
    };

    let selected = gilrs
        .gamepads()
        .nth(index)
        .map(|(id, gamepad)| (id, gamepad.name().to_string()));
    let (active, name) = match selected {
        Some(found) => found,
        None => {
            let count = gilrs.gamepads().count();
            let _ = ready.send(Err(format!(
                "no gamepad at index {} ({} connected)",
                index, count
            )));
            return;
        }
    };
    if ready.send(Ok(name)).is_err() {
        return;
    }

    let mut translator = Translator::new(active);
    while !shutdown.is_cancelled() {
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            for raw in translator.translate(id, event) {
                if events.send(raw).is_err() {
                    debug!("Event channel closed, stopping gilrs reader");
                    return;
                }
            }
        }
        std::thread::sleep(GILRS_POLL);
    }
    debug!("gilrs reader shut down");
}

#[derive(Debug, Default, Clone, Copy)]
struct HatButtons {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl HatButtons {
    fn x(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    // evdev orientation: up is negative
    fn y(&self) -> i32 {
        self.down as i32 - self.up as i32
    }
}

// Converts gilrs events of one gamepad into evdev-named raw events
struct Translator {
    active: GamepadId,
    hat: HatButtons,
}

impl Translator {
    fn new(active: GamepadId) -> Self {
        Self {
            active,
            hat: HatButtons::default(),
        }
    }

    fn translate(&mut self, id: GamepadId, event: EventType) -> Vec<RawEvent> {
        if id != self.active {
            debug!("Skipping event from non-active gamepad: {:?}", id);
            return Vec::new();
        }

        match event {
            EventType::AxisChanged(axis, value, _) => axis_event(axis, value).into_iter().collect(),
            EventType::ButtonChanged(button @ (Button::LeftTrigger2 | Button::RightTrigger2), value, _) => {
                let code = if button == Button::LeftTrigger2 { "ABS_Z" } else { "ABS_RZ" };
                vec![RawEvent::new(code, (value.clamp(0.0, 1.0) * TRIGGER_MAX).round() as i32)]
            }
            EventType::ButtonPressed(button, _) => self.button_event(button, true),
            EventType::ButtonReleased(button, _) => self.button_event(button, false),
            EventType::Connected => {
                info!("Controller connected event detected");
                Vec::new()
            }
            EventType::Disconnected => {
                warn!("Controller disconnected, state will go stale until it returns");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn button_event(&mut self, button: Button, pressed: bool) -> Vec<RawEvent> {
        let before = self.hat;
        match button {
            Button::DPadUp => self.hat.up = pressed,
            Button::DPadDown => self.hat.down = pressed,
            Button::DPadLeft => self.hat.left = pressed,
            Button::DPadRight => self.hat.right = pressed,
            _ => {
                return button_code(button)
                    .map(|code| RawEvent::new(code, pressed as i32))
                    .into_iter()
                    .collect();
            }
        }

        let mut out = Vec::with_capacity(1);
        if self.hat.x() != before.x() {
            out.push(RawEvent::new("ABS_HAT0X", self.hat.x()));
        }
        if self.hat.y() != before.y() {
            out.push(RawEvent::new("ABS_HAT0Y", self.hat.y()));
        }
        out
    }
}

fn axis_event(axis: Axis, value: f32) -> Option<RawEvent> {
    let stick = |v: f32| (v.clamp(-1.0, 1.0) * STICK_MAX).round() as i32;
    match axis {
        Axis::LeftStickX => Some(RawEvent::new("ABS_X", stick(value))),
        Axis::LeftStickY => Some(RawEvent::new("ABS_Y", stick(-value))),
        Axis::RightStickX => Some(RawEvent::new("ABS_RX", stick(value))),
        Axis::RightStickY => Some(RawEvent::new("ABS_RY", stick(-value))),
        Axis::DPadX => Some(RawEvent::new("ABS_HAT0X", value.round() as i32)),
        Axis::DPadY => Some(RawEvent::new("ABS_HAT0Y", -(value.round() as i32))),
        _ => {
            debug!("Ignoring unsupported axis: {:?}", axis);
            None
        }
    }
}

fn button_code(button: Button) -> Option<&'static str> {
    match button {
        Button::South => Some("BTN_SOUTH"),
        Button::East => Some("BTN_EAST"),
        Button::North => Some("BTN_NORTH"),
        Button::West => Some("BTN_WEST"),
        Button::Select => Some("BTN_SELECT"),
        Button::Start => Some("BTN_START"),
        Button::Mode => Some("BTN_MODE"),
        Button::LeftTrigger => Some("BTN_TL"),
        Button::RightTrigger => Some("BTN_TR"),
        Button::LeftThumb => Some("BTN_THUMBL"),
        Button::RightThumb => Some("BTN_THUMBR"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stick_axes_use_evdev_orientation() {
        assert_eq!(axis_event(Axis::LeftStickX, 1.0), Some(RawEvent::new("ABS_X", 32767)));
        assert_eq!(axis_event(Axis::LeftStickY, 1.0), Some(RawEvent::new("ABS_Y", -32767)));
        assert_eq!(axis_event(Axis::RightStickY, -0.5), Some(RawEvent::new("ABS_RY", 16384)));
        assert_eq!(axis_event(Axis::LeftZ, 0.3), None);
    }

    #[test]
    fn test_hat_folding() {
        let mut hat = HatButtons::default();
        hat.up = true;
        assert_eq!((hat.x(), hat.y()), (0, -1));
        hat.right = true;
        assert_eq!((hat.x(), hat.y()), (1, -1));
        hat.left = true;
        assert_eq!(hat.x(), 0);
    }

    #[test]
    fn test_button_codes_match_default_layout() {
        let map = crate::controller::key_map::KeyMap::default();
        for button in [
            Button::South,
            Button::East,
            Button::North,
            Button::West,
            Button::Select,
            Button::Start,
            Button::Mode,
            Button::LeftTrigger,
            Button::RightTrigger,
            Button::LeftThumb,
            Button::RightThumb,
        ] {
            let code = button_code(button).unwrap();
            assert!(map.lookup(code).is_some(), "{} unmapped", code);
        }
        assert_eq!(button_code(Button::C), None);
    }
}
