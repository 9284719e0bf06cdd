//! Incremental assembly of Leaf ropes.

use byterope_buffers::ByteWriter;

use crate::code_range::CodeRange;
use crate::encoding::Encoding;
use crate::error::RopeError;
use crate::rope::Rope;

/// A mutable byte accumulator that finalizes into immutable Leaf ropes.
///
/// Not a rope itself, and meant for exclusive ownership by one producer.
/// [`RopeBuilder::to_rope`] transfers the accumulated buffer into the Leaf
/// and leaves the builder empty with a fresh buffer, so later appends are
/// never observable through a previously returned rope.
pub struct RopeBuilder {
    writer: ByteWriter,
    encoding: Encoding,
    code_range: CodeRange,
}

impl RopeBuilder {
    pub fn new(encoding: Encoding) -> RopeBuilder {
        RopeBuilder {
            writer: ByteWriter::new(),
            encoding,
            code_range: CodeRange::Unknown,
        }
    }

    /// A builder whose buffer starts at `capacity` bytes.
    pub fn with_capacity(encoding: Encoding, capacity: usize) -> RopeBuilder {
        RopeBuilder {
            writer: ByteWriter::with_alloc_size(capacity),
            encoding,
            code_range: CodeRange::Unknown,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Retags the content being assembled and drops any pending code range
    /// claim.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
        self.code_range = CodeRange::Unknown;
    }

    /// The caller's claim about the code range of the final content. It is
    /// handed to the produced Leaf unchecked.
    pub fn set_code_range(&mut self, code_range: CodeRange) {
        self.code_range = code_range;
    }

    pub fn code_range(&self) -> CodeRange {
        self.code_range
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.writer.push(byte);
    }

    pub fn append_slice(&mut self, bytes: &[u8]) {
        self.writer.extend(bytes);
    }

    /// Appends `len` bytes of `bytes` starting at `start`.
    pub fn append_bytes(
        &mut self,
        bytes: &[u8],
        start: usize,
        len: usize,
    ) -> Result<(), RopeError> {
        let end = start.checked_add(len).ok_or(RopeError::SizeOverflow)?;
        if end > bytes.len() {
            return Err(RopeError::out_of_bounds(start, len, bytes.len()));
        }
        self.writer.extend(&bytes[start..end]);
        Ok(())
    }

    /// Appends a rope's materialized bytes, flattening it if it is not
    /// already contiguous.
    pub fn append_rope(&mut self, rope: &Rope) {
        match rope.bytes() {
            Some(bytes) => self.writer.extend(bytes),
            None => self.writer.extend(&rope.to_bytes()),
        }
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Drops the accumulated bytes and the pending code range claim,
    /// keeping the buffer for reuse.
    pub fn clear(&mut self) {
        self.writer.clear();
        self.code_range = CodeRange::Unknown;
    }

    /// Finalizes the accumulated bytes into a Leaf rope and resets the
    /// builder for further appends.
    pub fn to_rope(&mut self) -> Rope {
        let bytes = self.writer.take();
        let rope = Rope::from_bytes_with_code_range(bytes, self.encoding, self.code_range);
        self.code_range = CodeRange::Unknown;
        rope
    }
}
