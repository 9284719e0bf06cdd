//! Binary buffer writer with auto-growing capacity.

/// Default allocation size for a fresh writer.
const DEFAULT_ALLOC_SIZE: usize = 4 * 1024;

/// A byte accumulator that grows automatically as needed.
///
/// Growth is amortized: while the content fits in the configured allocation
/// size the buffer stays at that size, and beyond it each growth step
/// reserves twice the required total, so N sequential single-byte appends
/// cost O(N) overall.
///
/// # Example
///
/// ```
/// use byterope_buffers::ByteWriter;
///
/// let mut writer = ByteWriter::new();
/// writer.push(0x01);
/// writer.extend(&[0x02, 0x03]);
/// assert_eq!(writer.take(), vec![0x01, 0x02, 0x03]);
/// ```
pub struct ByteWriter {
    buf: Vec<u8>,
    alloc_size: usize,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    /// Creates a new writer with the default allocation size.
    pub fn new() -> Self {
        Self::with_alloc_size(DEFAULT_ALLOC_SIZE)
    }

    /// Creates a new writer with a custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let alloc_size = alloc_size.max(1);
        Self {
            buf: Vec::with_capacity(alloc_size),
            alloc_size,
        }
    }

    /// Ensures at least `additional` bytes can be appended without another
    /// reallocation.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let remaining = self.buf.capacity() - self.buf.len();
        if remaining < additional {
            let required = self.buf.len() + additional;
            let new_size = if required <= self.alloc_size {
                self.alloc_size
            } else {
                required * 2
            };
            let mut next = Vec::with_capacity(new_size);
            next.extend_from_slice(&self.buf);
            self.buf = next;
        }
    }

    /// Appends a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.ensure_capacity(1);
        self.buf.push(byte);
    }

    /// Appends a byte slice.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// A view of the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drops all written bytes, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Takes ownership of the written bytes, leaving the writer with a fresh
    /// buffer. Later writes are not observable through the returned vector.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.buf, Vec::with_capacity(self.alloc_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_extend_preserve_order() {
        let mut writer = ByteWriter::new();
        writer.push(1);
        writer.extend(&[2, 3, 4]);
        writer.push(5);
        assert_eq!(writer.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn grows_past_alloc_size() {
        let mut writer = ByteWriter::with_alloc_size(4);
        for i in 0..100u8 {
            writer.push(i);
        }
        assert_eq!(writer.len(), 100);
        assert!(writer.capacity() >= 100);
        let taken = writer.take();
        assert_eq!(taken, (0..100u8).collect::<Vec<_>>());
    }

    #[test]
    fn growth_doubles_required_total() {
        let mut writer = ByteWriter::with_alloc_size(8);
        writer.extend(&[0; 8]);
        writer.push(0);
        assert!(writer.capacity() >= 18);
    }

    #[test]
    fn take_detaches_from_later_writes() {
        let mut writer = ByteWriter::with_alloc_size(16);
        writer.extend(b"abc");
        let first = writer.take();
        writer.extend(b"xyz");
        assert_eq!(first, b"abc");
        assert_eq!(writer.as_slice(), b"xyz");
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut writer = ByteWriter::with_alloc_size(4);
        writer.extend(&[0; 64]);
        let cap = writer.capacity();
        writer.clear();
        assert!(writer.is_empty());
        assert_eq!(writer.capacity(), cap);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn chunked_writes_equal_their_concatenation(
                chunks in proptest::collection::vec(
                    proptest::collection::vec(any::<u8>(), 0..32),
                    0..16,
                ),
                alloc_size in 1usize..64,
            ) {
                let mut writer = ByteWriter::with_alloc_size(alloc_size);
                let mut expected = Vec::new();
                for chunk in &chunks {
                    writer.extend(chunk);
                    expected.extend_from_slice(chunk);
                }
                prop_assert_eq!(writer.as_slice(), &expected[..]);
                prop_assert_eq!(writer.take(), expected);
            }
        }
    }
}
