//! Character Device Buffer - Single-instance pseudo device with file semantics
//!
//! # Purpose
//! Models a pseudo character device: one small fixed-capacity buffer that
//! stores whatever is written to it and hands it back to readers, exposed
//! through open/read/write/release.
//!
//! # Integration Points
//! - Depends on: nothing beyond the host allocator
//! - Provides to: driver shims that forward file operations to the core
//! - Boundary traits: [`EventSink`] (open/close events), [`Registrar`]
//!   (device number allocation)
//!
//! # Architecture
//! A [`Device`] owns a fixed byte store and a handle table behind one spin
//! lock. Each handle carries a private read cursor; the buffer itself is
//! shared. [`ChardevModule`] wraps a device with load/unload lifecycle and
//! registration.
//!
//! # Testing Strategy
//! - Unit tests: buffer bounds, handle table, config parsing, device ops
//! - Integration tests: end-to-end read/write scenarios, concurrent access
//! - Benchmarks: open/write/read/release round trips (criterion)

mod buffer;
mod config;
mod device;
mod events;
mod file;
mod handle;
mod module;

pub use config::{DeviceConfig, WritePolicy, DEFAULT_DEVICE_NAME};
pub use device::{Device, ReadResult, WriteResult, WriteStatus};
pub use events::{DeviceEvent, EventSink, LogSink};
pub use file::DeviceFile;
pub use handle::HandleId;
pub use module::{
    ChardevModule, LocalRegistrar, ModuleInfo, Registrar, CHARDEV_MODULE, LOCAL_MAJOR_FIRST,
    LOCAL_MAJOR_LAST,
};

use static_assertions::const_assert;
use thiserror::Error;

/// Capacity of the device buffer in bytes
pub const BUF_SIZE: usize = 128;

const_assert!(BUF_SIZE > 0);

/// Error types for device operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Invalid handle {handle}")]
    InvalidHandle { handle: HandleId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Device registration failed: {0}")]
    Registration(String),
}

pub type Result<T> = core::result::Result<T, DeviceError>;
