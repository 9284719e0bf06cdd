//! The rope value: an immutable tree of byte-string variants.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::code_range::CodeRange;
use crate::encoding::{Encoding, EncodingOracle};
use crate::error::RopeError;
use crate::native::NativeSource;
use crate::ops;

/// Cache sentinel for "character length not yet computed".
const CHAR_LEN_UNKNOWN: usize = usize::MAX;

/// An immutable byte string represented as a tree with structural sharing.
///
/// A `Rope` is a cheap handle: cloning shares the underlying node. Byte
/// content never changes once a rope exists; the only mutable state is a
/// pair of lazily resolved metadata caches (code range and character
/// length), whose writes are idempotent single-scalar stores and therefore
/// safe to race.
///
/// Ropes backed by externally managed memory (see [`crate::native`]) are
/// the exception: their bytes can change underneath the tree, so their
/// caches are advisory and content-level operations such as
/// [`Rope::content_eq`] refuse to run on them.
#[derive(Clone)]
pub struct Rope {
    node: Arc<Node>,
}

pub(crate) struct Node {
    pub(crate) encoding: Encoding,
    pub(crate) byte_len: usize,
    pub(crate) depth: usize,
    pub(crate) volatile_content: bool,
    code_range: AtomicU8,
    char_len: AtomicUsize,
    pub(crate) kind: Kind,
}

pub(crate) enum Kind {
    /// Terminal node owning a contiguous buffer.
    Leaf { bytes: Arc<[u8]> },
    /// Window into a parent rope. The parent is never itself a Substring:
    /// substring construction collapses chains onto the first non-Substring
    /// ancestor.
    Substring { parent: Rope, offset: usize },
    /// Logical concatenation of two children, neither of which is empty.
    Concat {
        left: Rope,
        right: Rope,
        /// Both children are non-Concat, or both are balanced Concats.
        /// Balanced subtrees are kept whole during rebalancing.
        balanced: bool,
    },
    /// `count` logical copies of `child` (`count >= 2`).
    Repeat { child: Rope, count: usize },
    /// Terminal node over externally managed memory, re-read on every
    /// access.
    Native { source: Arc<dyn NativeSource> },
}

impl Rope {
    /// Wraps `bytes` as a Leaf rope with an unknown code range.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, encoding: Encoding) -> Rope {
        Rope::from_bytes_with_code_range(bytes, encoding, CodeRange::Unknown)
    }

    /// Wraps `bytes` as a Leaf rope whose code range the caller already
    /// knows for `encoding`. A `SevenBit` range fixes the character length
    /// to the byte length; other ranges leave it to be computed on demand.
    pub fn from_bytes_with_code_range(
        bytes: impl Into<Arc<[u8]>>,
        encoding: Encoding,
        code_range: CodeRange,
    ) -> Rope {
        let bytes = bytes.into();
        let byte_len = bytes.len();
        let char_len = (code_range == CodeRange::SevenBit).then_some(byte_len);
        Rope::from_parts(
            encoding,
            byte_len,
            0,
            false,
            code_range,
            char_len,
            Kind::Leaf { bytes },
        )
    }

    /// A one-byte Leaf rope.
    pub fn from_byte(byte: u8, encoding: Encoding) -> Rope {
        Rope::from_bytes(vec![byte], encoding)
    }

    /// The empty rope for `encoding`.
    pub fn empty(encoding: Encoding) -> Rope {
        Rope::from_bytes_with_code_range(Vec::new(), encoding, CodeRange::SevenBit)
    }

    pub(crate) fn from_parts(
        encoding: Encoding,
        byte_len: usize,
        depth: usize,
        volatile_content: bool,
        code_range: CodeRange,
        char_len: Option<usize>,
        kind: Kind,
    ) -> Rope {
        Rope {
            node: Arc::new(Node {
                encoding,
                byte_len,
                depth,
                volatile_content,
                code_range: AtomicU8::new(code_range as u8),
                char_len: AtomicUsize::new(char_len.unwrap_or(CHAR_LEN_UNKNOWN)),
                kind,
            }),
        }
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.node.kind
    }

    /// Length in bytes. Immutable for the lifetime of the value.
    pub fn byte_len(&self) -> usize {
        self.node.byte_len
    }

    pub fn is_empty(&self) -> bool {
        self.node.byte_len == 0
    }

    pub fn encoding(&self) -> Encoding {
        self.node.encoding
    }

    /// Tree height: 0 for terminal nodes, `1 + max(children)` for Concat.
    /// Substring and Repeat nodes take their child's depth.
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// `true` when any node of this tree reads externally managed memory.
    pub fn is_volatile(&self) -> bool {
        self.node.volatile_content
    }

    /// Whether the two handles share one node.
    pub fn ptr_eq(&self, other: &Rope) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// The cached code range, without resolving it.
    pub fn cached_code_range(&self) -> CodeRange {
        CodeRange::from_bits(self.node.code_range.load(Ordering::Relaxed))
    }

    /// The cached character length, without resolving it.
    pub fn cached_character_length(&self) -> Option<usize> {
        match self.node.char_len.load(Ordering::Relaxed) {
            CHAR_LEN_UNKNOWN => None,
            len => Some(len),
        }
    }

    /// Code range of this rope's bytes, resolving and caching it on first
    /// use.
    pub fn code_range(&self, oracle: &dyn EncodingOracle) -> CodeRange {
        self.resolve_metadata(oracle).0
    }

    /// Character count of this rope's bytes, resolving and caching it on
    /// first use.
    pub fn character_length(&self, oracle: &dyn EncodingOracle) -> usize {
        self.resolve_metadata(oracle).1
    }

    pub fn is_ascii_only(&self, oracle: &dyn EncodingOracle) -> bool {
        self.code_range(oracle) == CodeRange::SevenBit
    }

    /// `true` when every character occupies exactly one byte.
    pub fn is_single_byte_optimizable(&self, oracle: &dyn EncodingOracle) -> bool {
        self.character_length(oracle) == self.byte_len()
    }

    /// Resets the metadata caches to the unresolved state.
    ///
    /// Intended for natively backed ropes after their memory was mutated
    /// out-of-band. Calling it on an ordinary immutable rope merely forces
    /// a recomputation that yields the same values. Owners of ropes derived
    /// from a native rope invalidate those derivations themselves.
    pub fn invalidate_metadata(&self) {
        self.node
            .code_range
            .store(CodeRange::Unknown as u8, Ordering::Relaxed);
        self.node
            .char_len
            .store(CHAR_LEN_UNKNOWN, Ordering::Relaxed);
    }

    fn store_metadata(&self, code_range: CodeRange, char_len: usize) {
        self.node
            .code_range
            .store(code_range as u8, Ordering::Relaxed);
        self.node.char_len.store(char_len, Ordering::Relaxed);
    }

    fn resolve_metadata(&self, oracle: &dyn EncodingOracle) -> (CodeRange, usize) {
        let cached = self.cached_code_range();
        if cached == CodeRange::SevenBit {
            // Closure property of single-byte content: length is the byte
            // count, no scan needed.
            self.node.char_len.store(self.byte_len(), Ordering::Relaxed);
            return (CodeRange::SevenBit, self.byte_len());
        }
        if let (true, Some(char_len)) = (cached.is_known(), self.cached_character_length()) {
            return (cached, char_len);
        }

        let (code_range, char_len) = match &self.node.kind {
            Kind::Leaf { bytes } => {
                let report = oracle.scan(bytes, self.encoding());
                (report.code_range, report.character_length)
            }
            Kind::Substring { parent, .. } => {
                if parent.cached_code_range() == CodeRange::SevenBit {
                    (CodeRange::SevenBit, self.byte_len())
                } else {
                    let bytes = self.to_bytes();
                    let report = oracle.scan(&bytes, self.encoding());
                    (report.code_range, report.character_length)
                }
            }
            Kind::Concat { left, right, .. } => {
                let (left_cr, left_len) = left.resolve_metadata(oracle);
                let (right_cr, right_len) = right.resolve_metadata(oracle);
                let combined = CodeRange::combine(left_cr, right_cr);
                if combined == CodeRange::Broken {
                    // Broken halves can realign across the seam; character
                    // counts only add up for well-formed children.
                    let bytes = self.to_bytes();
                    let report = oracle.scan(&bytes, self.encoding());
                    (report.code_range, report.character_length)
                } else {
                    (combined, left_len + right_len)
                }
            }
            Kind::Repeat { child, count } => {
                // Repetition preserves well-formedness, so a well-formed
                // child's classification carries over and its character
                // count multiplies. Broken content can realign across copy
                // seams and must be scanned as a whole.
                let (child_cr, child_len) = child.resolve_metadata(oracle);
                if child_cr == CodeRange::Broken {
                    let bytes = self.to_bytes();
                    let report = oracle.scan(&bytes, self.encoding());
                    (report.code_range, report.character_length)
                } else {
                    (child_cr, child_len * count)
                }
            }
            Kind::Native { .. } => {
                let bytes = self.to_bytes();
                let report = oracle.scan(&bytes, self.encoding());
                (report.code_range, report.character_length)
            }
        };

        // A range resolved earlier stays resolved: the cache is
        // write-once for stable ropes, and for volatile ones the caller
        // resets it explicitly.
        let code_range = if cached.is_known() { cached } else { code_range };
        self.store_metadata(code_range, char_len);
        (code_range, char_len)
    }

    /// The byte at `index`, routed through the tree without stack growth.
    pub fn byte_at(&self, index: usize) -> Result<u8, RopeError> {
        if index >= self.byte_len() {
            return Err(RopeError::out_of_bounds(index, 1, self.byte_len()));
        }

        let mut current = self;
        let mut index = index;
        loop {
            match &current.node.kind {
                Kind::Leaf { bytes } => return Ok(bytes[index]),
                Kind::Substring { parent, offset } => {
                    index += offset;
                    current = parent;
                }
                Kind::Concat { left, right, .. } => {
                    if index < left.byte_len() {
                        current = left;
                    } else {
                        index -= left.byte_len();
                        current = right;
                    }
                }
                Kind::Repeat { child, .. } => {
                    index %= child.byte_len();
                    current = child;
                }
                Kind::Native { source } => return Ok(source.byte_at(index)),
            }
        }
    }

    /// Copies `len` bytes starting at `src_start` into
    /// `dst[dst_start..dst_start + len]`. Out-of-range indices on either
    /// side fail; nothing is clamped.
    pub fn copy_bytes(
        &self,
        dst: &mut [u8],
        dst_start: usize,
        src_start: usize,
        len: usize,
    ) -> Result<(), RopeError> {
        let src_end = src_start.checked_add(len).ok_or(RopeError::SizeOverflow)?;
        if src_end > self.byte_len() {
            return Err(RopeError::out_of_bounds(src_start, len, self.byte_len()));
        }
        let dst_end = dst_start.checked_add(len).ok_or(RopeError::SizeOverflow)?;
        if dst_end > dst.len() {
            return Err(RopeError::out_of_bounds(dst_start, len, dst.len()));
        }
        if len == 0 {
            return Ok(());
        }

        let view = self.substring(src_start, len)?;
        ops::write_bytes_into(&view, &mut dst[dst_start..dst_end]);
        Ok(())
    }

    /// The raw byte buffer, when this rope is a contiguous Leaf.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.node.kind {
            Kind::Leaf { bytes } => Some(bytes),
            _ => None,
        }
    }

    /// Materializes the logical bytes into a fresh vector. For natively
    /// backed ropes this is a fresh read of the backing memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.node.kind {
            Kind::Leaf { bytes } => bytes.to_vec(),
            Kind::Native { source } => {
                let mut buf = vec![0u8; self.byte_len()];
                source.read(0, &mut buf);
                buf
            }
            Kind::Concat { left, right, .. } => {
                if let (Some(left_bytes), Some(right_bytes)) = (left.bytes(), right.bytes()) {
                    return byterope_buffers::concat(left_bytes, right_bytes);
                }
                let mut buf = vec![0u8; self.byte_len()];
                ops::write_bytes_into(self, &mut buf);
                buf
            }
            _ => {
                let mut buf = vec![0u8; self.byte_len()];
                ops::write_bytes_into(self, &mut buf);
                buf
            }
        }
    }

    /// Incremental `31 * h + byte` hash over a byte range, routed through
    /// the tree without materializing it.
    pub fn hash_range(&self, seed: u64, offset: usize, len: usize) -> Result<u64, RopeError> {
        let end = offset.checked_add(len).ok_or(RopeError::SizeOverflow)?;
        if end > self.byte_len() {
            return Err(RopeError::out_of_bounds(offset, len, self.byte_len()));
        }

        struct Frame {
            rope: Rope,
            seed: u64,
            offset: usize,
            len: usize,
            /// Seed from the previously computed result instead of `seed`.
            chained: bool,
        }

        let mut work = vec![Frame {
            rope: self.clone(),
            seed,
            offset,
            len,
            chained: false,
        }];
        let mut result = 0u64;

        while let Some(frame) = work.pop() {
            let seed = if frame.chained { result } else { frame.seed };
            let offset = frame.offset;
            let len = frame.len;

            match frame.rope.kind() {
                Kind::Leaf { bytes } => {
                    result = hash_bytes(&bytes[offset..offset + len], seed);
                }
                Kind::Native { source } => {
                    let mut buf = vec![0u8; len];
                    source.read(offset, &mut buf);
                    result = hash_bytes(&buf, seed);
                }
                Kind::Substring {
                    parent,
                    offset: parent_offset,
                } => {
                    work.push(Frame {
                        rope: parent.clone(),
                        seed,
                        offset: offset + parent_offset,
                        len,
                        chained: false,
                    });
                }
                Kind::Concat { left, right, .. } => {
                    let left_len = left.byte_len();
                    if offset >= left_len {
                        // Range fully inside the right child.
                        work.push(Frame {
                            rope: right.clone(),
                            seed,
                            offset: offset - left_len,
                            len,
                            chained: false,
                        });
                    } else if offset + len <= left_len {
                        // Range fully inside the left child.
                        work.push(Frame {
                            rope: left.clone(),
                            seed,
                            offset,
                            len,
                            chained: false,
                        });
                    } else {
                        let covered_by_left = left_len - offset;
                        // Right child first on the stack so the left result
                        // seeds it.
                        work.push(Frame {
                            rope: right.clone(),
                            seed: 0,
                            offset: 0,
                            len: len - covered_by_left,
                            chained: true,
                        });
                        work.push(Frame {
                            rope: left.clone(),
                            seed,
                            offset,
                            len: covered_by_left,
                            chained: false,
                        });
                    }
                }
                Kind::Repeat { child, .. } => {
                    let pattern_len = child.byte_len();
                    let offset = offset % pattern_len;
                    let mut len = len;
                    if len > pattern_len - offset {
                        // Hash one period now; the rest of the range chains
                        // off this frame's result.
                        work.push(Frame {
                            rope: frame.rope.clone(),
                            seed: 0,
                            offset: 0,
                            len: len - (pattern_len - offset),
                            chained: true,
                        });
                        len = pattern_len - offset;
                    }
                    work.push(Frame {
                        rope: child.clone(),
                        seed,
                        offset,
                        len,
                        chained: false,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Byte-level equality, with a shared-node fast path. Differently
    /// encoded ropes are unequal. Fails on volatile ropes, whose content
    /// can change between the two reads a comparison needs.
    pub fn content_eq(&self, other: &Rope) -> Result<bool, RopeError> {
        if self.is_volatile() || other.is_volatile() {
            return Err(RopeError::VolatileContent);
        }
        if self.ptr_eq(other) {
            return Ok(true);
        }
        if self.encoding() != other.encoding() || self.byte_len() != other.byte_len() {
            return Ok(false);
        }
        Ok(self.to_bytes() == other.to_bytes())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        for _ in 0..level {
            f.write_str("  ")?;
        }
        let name = match &self.node.kind {
            Kind::Leaf { .. } => "Leaf",
            Kind::Substring { .. } => "Substring",
            Kind::Concat { .. } => "Concat",
            Kind::Repeat { .. } => "Repeat",
            Kind::Native { .. } => "Native",
        };
        write!(
            f,
            "{name} (BL: {}; CL: {}; CR: {:?}; D: {}; E: {})",
            self.byte_len(),
            match self.cached_character_length() {
                Some(len) => len.to_string(),
                None => "?".to_string(),
            },
            self.cached_code_range(),
            self.depth(),
            self.encoding(),
        )?;
        match &self.node.kind {
            Kind::Substring { parent, offset } => {
                writeln!(f, " offset {offset}")?;
                parent.fmt_node(f, level + 1)
            }
            Kind::Concat { left, right, .. } => {
                writeln!(f)?;
                left.fmt_node(f, level + 1)?;
                writeln!(f)?;
                right.fmt_node(f, level + 1)
            }
            Kind::Repeat { child, count } => {
                writeln!(f, " times {count}")?;
                child.fmt_node(f, level + 1)
            }
            Kind::Leaf { .. } | Kind::Native { .. } => Ok(()),
        }
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0)
    }
}

fn hash_bytes(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = seed;
    for byte in bytes {
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(*byte));
    }
    hash
}
