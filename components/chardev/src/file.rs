//! RAII file session over a device handle

use std::io;

use crate::device::{Device, WriteResult};
use crate::handle::HandleId;
use crate::Result;

/// Open session that releases its handle when dropped
///
/// Implements [`io::Read`] on top of the handle's cursor. Writes go through
/// [`DeviceFile::write`] rather than `io::Write`: a truncated write must be
/// reported to the caller, not silently retried with the remainder.
pub struct DeviceFile<'a, const N: usize> {
    device: &'a Device<N>,
    handle: HandleId,
}

impl<'a, const N: usize> DeviceFile<'a, N> {
    pub(crate) fn new(device: &'a Device<N>, handle: HandleId) -> Self {
        Self { device, handle }
    }

    /// Underlying handle
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Store data through this session
    pub fn write(&self, data: &[u8]) -> Result<WriteResult> {
        self.device.write(self.handle, data)
    }

    /// Release the handle now, reporting any error
    pub fn close(self) -> Result<()> {
        let this = core::mem::ManuallyDrop::new(self);
        this.device.release(this.handle)
    }
}

impl<const N: usize> io::Read for DeviceFile<'_, N> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.device
            .read_into(self.handle, buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}

impl<const N: usize> Drop for DeviceFile<'_, N> {
    fn drop(&mut self) {
        if let Err(e) = self.device.release(self.handle) {
            log::warn!("{}: failed to release {}: {}", self.device.name(), self.handle, e);
        }
    }
}
