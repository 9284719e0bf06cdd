//! Ropes over externally managed memory.
//!
//! A native rope's bytes live in a region the runtime does not own, such
//! as a foreign-interop buffer or an mmap. Such memory can be
//! mutated by code outside this crate, so nothing read from it is ever
//! trusted as a cache: every access goes back to the region.

use std::sync::Arc;

use crate::code_range::CodeRange;
use crate::encoding::Encoding;
use crate::rope::{Kind, Rope};

/// A byte region living outside the runtime's managed heap.
///
/// The wrapping rope re-reads through this trait on every access. The
/// region's length is fixed for the lifetime of the rope; its contents are
/// not. Ordering between a foreign write and a subsequent read is the
/// caller's responsibility.
pub trait NativeSource: Send + Sync {
    /// Length of the region in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `out.len()` bytes starting at `offset`. Implementations
    /// assert bounds rather than clamp them.
    fn read(&self, offset: usize, out: &mut [u8]);

    /// Reads the byte at `offset`.
    fn byte_at(&self, offset: usize) -> u8 {
        let mut buf = [0u8; 1];
        self.read(offset, &mut buf);
        buf[0]
    }
}

/// A raw pointer + length region handed over by foreign code.
pub struct RawParts {
    ptr: *const u8,
    len: usize,
}

impl RawParts {
    /// Wraps a foreign region.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for reads of `len` bytes for as long as any
    /// rope wraps this region, and foreign writes to the region must be
    /// synchronized with reads by the caller.
    pub unsafe fn new(ptr: *const u8, len: usize) -> RawParts {
        RawParts { ptr, len }
    }
}

// Reads only ever go through the raw pointer; synchronization with foreign
// writers is part of the `RawParts::new` contract.
unsafe impl Send for RawParts {}
unsafe impl Sync for RawParts {}

impl NativeSource for RawParts {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&self, offset: usize, out: &mut [u8]) {
        assert!(
            offset + out.len() <= self.len,
            "native read {}..{} out of bounds for {} bytes",
            offset,
            offset + out.len(),
            self.len
        );
        // SAFETY: in bounds per the assert; validity per `RawParts::new`.
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.add(offset), out.as_mut_ptr(), out.len());
        }
    }

    fn byte_at(&self, offset: usize) -> u8 {
        assert!(
            offset < self.len,
            "native read at {} out of bounds for {} bytes",
            offset,
            self.len
        );
        // SAFETY: in bounds per the assert; validity per `RawParts::new`.
        unsafe { self.ptr.add(offset).read() }
    }
}

impl Rope {
    /// Wraps an externally managed memory region as a terminal rope.
    ///
    /// Byte accessors read the region afresh on every call. The code range
    /// and character length caches are advisory only: after the region is
    /// mutated out-of-band, the owner calls [`Rope::invalidate_metadata`]
    /// on this rope (and on any rope derived from it that it still holds).
    /// Callers needing a stable view copy one out with [`Rope::flatten`].
    pub fn from_native(source: Arc<dyn NativeSource>, encoding: Encoding) -> Rope {
        let byte_len = source.len();
        Rope::from_parts(
            encoding,
            byte_len,
            0,
            true,
            CodeRange::Unknown,
            None,
            Kind::Native { source },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RopeError;

    #[test]
    fn raw_parts_reads_the_region() {
        let region = *b"native bytes";
        // SAFETY: `region` outlives the rope and nothing writes to it.
        let source = unsafe { RawParts::new(region.as_ptr(), region.len()) };
        let rope = Rope::from_native(Arc::new(source), Encoding::BINARY);

        assert_eq!(rope.byte_len(), 12);
        assert!(rope.is_volatile());
        assert_eq!(rope.to_bytes(), b"native bytes");
        assert_eq!(rope.byte_at(0), Ok(b'n'));
        assert_eq!(
            rope.byte_at(12),
            Err(RopeError::OutOfBounds {
                start: 12,
                end: 13,
                len: 12
            })
        );
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn raw_parts_asserts_bounds() {
        let region = *b"abc";
        // SAFETY: `region` outlives the source.
        let source = unsafe { RawParts::new(region.as_ptr(), region.len()) };
        let mut out = [0u8; 2];
        source.read(2, &mut out);
    }

    #[test]
    fn derived_ropes_stay_volatile() {
        let region = *b"0123456789";
        // SAFETY: `region` outlives the ropes below.
        let source = unsafe { RawParts::new(region.as_ptr(), region.len()) };
        let rope = Rope::from_native(Arc::new(source), Encoding::BINARY);

        let slice = rope.substring(2, 5).unwrap();
        assert!(slice.is_volatile());
        assert_eq!(slice.to_bytes(), b"23456");

        let repeated = slice.repeat(2).unwrap();
        assert!(repeated.is_volatile());
        assert_eq!(repeated.to_bytes(), b"2345623456");

        assert_eq!(
            rope.content_eq(&rope),
            Err(RopeError::VolatileContent),
            "volatile content must not be compared in place"
        );

        let stable = slice.flatten();
        assert!(!stable.is_volatile());
        assert!(stable.content_eq(&stable).is_ok());
    }
}
