//! Observability events emitted by the device
//!
//! The device does not log by itself; it hands [`DeviceEvent`]s to an
//! [`EventSink`] supplied by whoever hosts it. [`LogSink`] forwards them to the
//! `log` facade and is what a device gets by default.

use core::fmt;

/// Lifecycle event emitted after a successful open or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A handle was opened
    Opened { open_count: usize },

    /// A handle was released
    Closed { open_count: usize },
}

impl DeviceEvent {
    /// Stable event name
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Opened { .. } => "device_opened",
            DeviceEvent::Closed { .. } => "device_closed",
        }
    }

    /// Open handle count at the time of the event
    pub fn open_count(&self) -> usize {
        match *self {
            DeviceEvent::Opened { open_count } | DeviceEvent::Closed { open_count } => open_count,
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (open_count={})", self.name(), self.open_count())
    }
}

/// Receiver for device events
///
/// Called with the device lock held, so events arrive in the order the
/// handle table changed. Implementations must return promptly and must not
/// call back into the device.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn on_event(&self, device: &str, event: DeviceEvent);
}

impl<F> EventSink for F
where
    F: Fn(&str, DeviceEvent) + Send + Sync,
{
    fn on_event(&self, device: &str, event: DeviceEvent) {
        self(device, event)
    }
}

/// Sink that forwards events to `log::info!`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&self, device: &str, event: DeviceEvent) {
        log::info!(target: "kaal_chardev::events", "{}: {}", device, event);
    }
}
