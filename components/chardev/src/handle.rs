//! Open handle tracking
//!
//! Every successful `open` gets a fresh [`HandleId`] with its own read cursor.
//! Ids are never reused, so a released id stays invalid for the lifetime of the
//! device.

use std::collections::BTreeMap;
use std::fmt;

use crate::{DeviceError, Result};

/// Opaque token for one open session against the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    /// Raw numeric id
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Build an id from a raw value (used by shims that round-trip ids)
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Table of open handles and their cursors
pub(crate) struct HandleTable {
    /// Cursor per open handle
    cursors: BTreeMap<HandleId, usize>,

    /// Next id to hand out (0 is never issued)
    next_id: u64,
}

impl HandleTable {
    /// Create an empty table
    pub(crate) fn new() -> Self {
        Self {
            cursors: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Issue a new handle with its cursor at 0
    pub(crate) fn issue(&mut self) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;
        self.cursors.insert(id, 0);
        id
    }

    /// Retire a handle
    ///
    /// # Errors
    /// Returns `InvalidHandle` if the id is unknown or already retired
    pub(crate) fn retire(&mut self, handle: HandleId) -> Result<()> {
        self.cursors
            .remove(&handle)
            .map(|_| ())
            .ok_or(DeviceError::InvalidHandle { handle })
    }

    /// Mutable cursor of an open handle
    pub(crate) fn cursor_mut(&mut self, handle: HandleId) -> Result<&mut usize> {
        self.cursors
            .get_mut(&handle)
            .ok_or(DeviceError::InvalidHandle { handle })
    }

    /// Check if a handle is open
    pub(crate) fn is_open(&self, handle: HandleId) -> bool {
        self.cursors.contains_key(&handle)
    }

    /// Rewind every open handle to offset 0
    pub(crate) fn rewind_all(&mut self) {
        self.cursors.values_mut().for_each(|c| *c = 0);
    }

    /// Number of open handles
    pub(crate) fn open_count(&self) -> usize {
        self.cursors.len()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
