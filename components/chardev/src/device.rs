//! Device Buffer Core
//!
//! A [`Device`] owns one fixed-capacity buffer shared by every open handle.
//! All state (buffer contents, stored length, handle cursors) sits behind a
//! single spin lock that is held for the full duration of each copy, so a
//! reader never sees a half-applied write. Open/close events are delivered
//! inside the same critical section, so the sink sees them in the order the
//! handle table changed.
//!
//! # Example
//! ```
//! use kaal_chardev::{Device, DeviceConfig};
//!
//! let device = Device::new(DeviceConfig::default()).unwrap();
//! let h = device.open();
//! device.write(h, b"HELLO").unwrap();
//!
//! let out = device.read(h, 3).unwrap();
//! assert_eq!(out.bytes, b"HEL");
//! device.release(h).unwrap();
//! ```

use spin::Mutex;

use crate::buffer::DeviceBuffer;
use crate::config::{DeviceConfig, WritePolicy};
use crate::events::{DeviceEvent, EventSink, LogSink};
use crate::file::DeviceFile;
use crate::handle::{HandleId, HandleTable};
use crate::{DeviceError, Result, BUF_SIZE};

/// Outcome of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    /// Bytes actually stored
    pub bytes_stored: usize,

    /// Set when the payload did not fit and was cut short
    pub truncated: bool,
}

/// Write status flag carried by [`WriteResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Whole payload stored
    Ok,

    /// Only a prefix of the payload was stored
    Truncated,
}

impl WriteResult {
    /// Status flag for this write
    pub fn status(&self) -> WriteStatus {
        if self.truncated {
            WriteStatus::Truncated
        } else {
            WriteStatus::Ok
        }
    }
}

/// Outcome of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    /// Bytes copied out, starting at the handle's previous cursor
    pub bytes: Vec<u8>,

    /// Set when the handle's cursor was already at the end of the data
    pub eof: bool,
}

impl ReadResult {
    /// Number of bytes copied
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if nothing was copied
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// State guarded by the device lock
struct DeviceState<const N: usize> {
    buffer: DeviceBuffer<N>,
    handles: HandleTable,
}

/// Single-instance character device buffer
///
/// `N` is the buffer capacity; the default device holds [`BUF_SIZE`] bytes.
pub struct Device<const N: usize = BUF_SIZE> {
    config: DeviceConfig,
    state: Mutex<DeviceState<N>>,
    sink: Box<dyn EventSink>,
}

impl Device {
    /// Create a device with the default capacity that logs its events
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate
    pub fn new(config: DeviceConfig) -> Result<Self> {
        Self::custom(config, Box::new(LogSink))
    }

    /// Create a device with the default capacity and a custom event sink
    ///
    /// ```
    /// use kaal_chardev::{Device, DeviceConfig, LogSink, BUF_SIZE};
    ///
    /// let device = Device::with_sink(DeviceConfig::default(), Box::new(LogSink)).unwrap();
    /// assert_eq!(device.capacity(), BUF_SIZE);
    /// ```
    pub fn with_sink(config: DeviceConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        Self::custom(config, sink)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::from_parts(DeviceConfig::default(), Box::new(LogSink))
    }
}

impl<const N: usize> Device<N> {
    /// Create a device of any capacity
    ///
    /// The capacity default is not used for inference, so the size must be
    /// spelled out (`Device::<16>::custom`). For the default 128-byte device
    /// use [`Device::new`] or [`Device::with_sink`].
    ///
    /// ```
    /// use kaal_chardev::{Device, DeviceConfig, LogSink};
    ///
    /// let small = Device::<16>::custom(DeviceConfig::default(), Box::new(LogSink)).unwrap();
    /// assert_eq!(small.capacity(), 16);
    /// ```
    pub fn custom(config: DeviceConfig, sink: Box<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, sink))
    }

    fn from_parts(config: DeviceConfig, sink: Box<dyn EventSink>) -> Self {
        Self {
            config,
            state: Mutex::new(DeviceState {
                buffer: DeviceBuffer::new(),
                handles: HandleTable::new(),
            }),
            sink,
        }
    }

    /// Open a new handle with its cursor at offset 0
    pub fn open(&self) -> HandleId {
        let handle = {
            let mut state = self.state.lock();
            let handle = state.handles.issue();
            let open_count = state.handles.open_count();
            self.sink
                .on_event(&self.config.name, DeviceEvent::Opened { open_count });
            handle
        };

        log::debug!("{}: opened handle {}", self.config.name, handle);
        handle
    }

    /// Open a handle wrapped in a session that releases it on drop
    pub fn open_file(&self) -> DeviceFile<'_, N> {
        DeviceFile::new(self, self.open())
    }

    /// Release a handle
    ///
    /// # Errors
    /// Returns `InvalidHandle` if the handle is unknown or already released
    pub fn release(&self, handle: HandleId) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.handles.retire(handle).inspect_err(|_| {
                log::warn!("{}: release of invalid handle {}", self.config.name, handle);
            })?;
            let open_count = state.handles.open_count();
            self.sink
                .on_event(&self.config.name, DeviceEvent::Closed { open_count });
        }

        log::debug!("{}: released handle {}", self.config.name, handle);
        Ok(())
    }

    /// Store `data` according to the configured [`WritePolicy`]
    ///
    /// With `Replace`, the buffer takes the first `min(len, N)` bytes and every
    /// open handle rewinds to offset 0. With `Append`, bytes go after the
    /// existing contents until the buffer is full and cursors are left alone.
    /// Oversized payloads are truncated, never rejected.
    ///
    /// # Errors
    /// Returns `InvalidHandle` if the handle is not open; the buffer is
    /// untouched in that case
    pub fn write(&self, handle: HandleId, data: &[u8]) -> Result<WriteResult> {
        let mut state = self.state.lock();
        if !state.handles.is_open(handle) {
            log::warn!("{}: write through invalid handle {}", self.config.name, handle);
            return Err(DeviceError::InvalidHandle { handle });
        }

        let (room, stored) = match self.config.write_policy {
            WritePolicy::Replace => {
                let stored = state.buffer.replace(data);
                state.handles.rewind_all();
                (N, stored)
            }
            WritePolicy::Append => {
                let room = state.buffer.remaining();
                (room, state.buffer.append(data))
            }
        };
        drop(state);

        let result = WriteResult {
            bytes_stored: stored,
            truncated: data.len() > room,
        };

        if result.truncated {
            log::debug!(
                "{}: write via {} truncated: {} of {} bytes stored",
                self.config.name,
                handle,
                stored,
                data.len()
            );
        } else {
            log::debug!("{}: wrote {} bytes via {}", self.config.name, stored, handle);
        }

        Ok(result)
    }

    /// Read up to `max_len` bytes from the handle's cursor
    ///
    /// Returns `eof = true` with no bytes once the cursor has reached the end
    /// of the stored data. A zero `max_len` with data left is not EOF.
    ///
    /// # Errors
    /// Returns `InvalidHandle` if the handle is not open
    pub fn read(&self, handle: HandleId, max_len: usize) -> Result<ReadResult> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let cursor = state.handles.cursor_mut(handle)?;
        let eof = *cursor >= state.buffer.len();
        let bytes = state.buffer.slice_from(*cursor, max_len).to_vec();
        *cursor += bytes.len();

        log::debug!("{}: read {} bytes via {}", self.config.name, bytes.len(), handle);
        Ok(ReadResult { bytes, eof })
    }

    /// Read into a caller buffer, returning the number of bytes copied
    ///
    /// `Ok(0)` with a non-empty `dst` means end of data.
    pub fn read_into(&self, handle: HandleId, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let cursor = state.handles.cursor_mut(handle)?;
        let src = state.buffer.slice_from(*cursor, dst.len());
        dst[..src.len()].copy_from_slice(src);
        *cursor += src.len();

        Ok(src.len())
    }

    /// Number of open handles
    pub fn open_count(&self) -> usize {
        self.state.lock().handles.open_count()
    }

    /// Check if a handle is currently open
    pub fn is_open(&self, handle: HandleId) -> bool {
        self.state.lock().handles.is_open(handle)
    }

    /// Bytes currently stored
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Check if the buffer holds no data
    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    /// Buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Snapshot of the stored bytes
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().buffer.as_slice().to_vec()
    }

    /// Device configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.config.name
    }
}
