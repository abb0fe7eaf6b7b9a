//! # History window
//!
//! Fixed-capacity ring of the most recently decoded bytes. Back-references
//! address it by distance behind the write cursor.

use crate::Error;

/// Largest distance an instruction can encode, and therefore the amount of
/// history the decoder must retain.
pub const WINDOW_SIZE: usize = (1 << 14) + ((0xFF & 8) << 11) + (0xFF << 6) + (0xFF >> 2);

/// Index into the ring. Only [`HistoryWindow::wrap`] constructs one, so it is
/// always below the capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Slot(usize);

/// Ring buffer holding the last `min(capacity, total_written)` bytes.
pub struct HistoryWindow {
    buf: Box<[u8]>,
    cursor: Slot,
    filled: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HistoryWindow {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("HistoryWindow")
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor.0)
            .field("filled", &self.filled)
            .finish()
    }
}

impl HistoryWindow {
    /// Creates a window of [`WINDOW_SIZE`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_SIZE)
    }

    /// Creates a window of `capacity` bytes.
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history window capacity must be non-zero");
        Self { buf: vec![0u8; capacity].into_boxed_slice(), cursor: Slot::default(), filled: 0 }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes currently addressable by a back-reference.
    #[inline]
    pub fn available(&self) -> usize {
        self.filled
    }

    #[inline(always)]
    fn wrap(&self, index: usize) -> Slot {
        Slot(index % self.buf.len())
    }

    #[inline(always)]
    fn behind(&self, distance: usize) -> Slot {
        debug_assert!(distance <= self.buf.len());
        self.wrap(self.cursor.0 + self.buf.len() - distance)
    }

    #[inline(always)]
    fn advance(&mut self, count: usize) {
        self.cursor = self.wrap(self.cursor.0 + count);
        self.filled = self.filled.saturating_add(count).min(self.buf.len());
    }

    /// Append `bytes` at the cursor, overwriting the oldest history once full.
    pub fn append(&mut self, bytes: &[u8]) {
        // Only the newest `capacity` bytes can survive the write.
        let skip = bytes.len().saturating_sub(self.capacity());
        if skip > 0 {
            self.advance(skip);
        }
        let mut rest = &bytes[skip..];
        while !rest.is_empty() {
            let start = self.cursor.0;
            let n = rest.len().min(self.capacity() - start);
            self.buf[start..start + n].copy_from_slice(&rest[..n]);
            self.advance(n);
            rest = &rest[n..];
        }
    }

    /// Copy `count` bytes starting `distance` bytes behind the cursor.
    ///
    /// Each produced run is appended to the window and handed to `emit`.
    /// When `distance < count` the source overlaps the bytes being written,
    /// so the `distance`-long pattern repeats until `count` bytes are out.
    pub fn copy_back<F>(&mut self, distance: usize, count: usize, mut emit: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        if distance == 0 || distance > self.filled {
            return Err(Error::LookbehindOverrun { distance, available: self.filled });
        }
        let mut remaining = count;
        while remaining > 0 {
            let src = self.behind(distance).0;
            let dst = self.cursor.0;
            // Bounded by `distance` so the source run is fully written before
            // it is read, and by both ring ends so neither range wraps.
            let n = remaining.min(distance).min(self.capacity() - src).min(self.capacity() - dst);
            self.buf.copy_within(src..src + n, dst);
            emit(&self.buf[dst..dst + n]);
            self.advance(n);
            remaining -= n;
        }
        Ok(())
    }
}
