//! Fixed-capacity byte store backing the device

/// Byte store holding at most `N` valid bytes
pub(crate) struct DeviceBuffer<const N: usize> {
    data: [u8; N],
    len: usize, // Valid bytes, never above N
}

impl<const N: usize> DeviceBuffer<N> {
    /// Create a new empty buffer
    pub(crate) const fn new() -> Self {
        Self {
            data: [0; N],
            len: 0,
        }
    }

    /// Number of valid bytes
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer holds no data
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free space left for appends
    pub(crate) fn remaining(&self) -> usize {
        N - self.len
    }

    /// Replace the whole contents with `src`
    ///
    /// Copies at most `N` bytes. Returns the number stored.
    pub(crate) fn replace(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(N);
        self.data[..n].copy_from_slice(&src[..n]);
        self.len = n;
        n
    }

    /// Append `src` after the current contents
    ///
    /// Copies at most `remaining()` bytes. Returns the number stored.
    pub(crate) fn append(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.data[self.len..self.len + n].copy_from_slice(&src[..n]);
        self.len += n;
        n
    }

    /// Valid bytes starting at `offset`, clamped to the stored length
    pub(crate) fn slice_from(&self, offset: usize, max_len: usize) -> &[u8] {
        let start = offset.min(self.len);
        let end = start + max_len.min(self.len - start);
        &self.data[start..end]
    }

    /// All valid bytes
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl<const N: usize> Default for DeviceBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
