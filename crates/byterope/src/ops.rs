//! Operations over the rope variants: slicing, reinterpretation,
//! concatenation, repetition and flattening.

use std::borrow::Cow;
use std::collections::VecDeque;

use crate::code_range::CodeRange;
use crate::encoding::Encoding;
use crate::error::RopeError;
use crate::rope::{Kind, Rope};

/// Depth at which a concat operand is rebalanced or flattened before being
/// combined again. Bounds `byte_at` cost on long chains of incremental
/// concatenation. Overridable per call via
/// [`Rope::concat_with_depth_threshold`].
pub const DEPTH_THRESHOLD: usize = 64;

impl Rope {
    /// A window of `len` bytes starting at `start`, sharing this rope's
    /// storage.
    ///
    /// The whole range returns the rope itself. Slicing a Substring
    /// collapses onto its parent, so substring chains never deepen;
    /// slicing inside one period of a Repeat collapses onto the repeated
    /// child.
    pub fn substring(&self, start: usize, len: usize) -> Result<Rope, RopeError> {
        let end = start.checked_add(len).ok_or(RopeError::SizeOverflow)?;
        if end > self.byte_len() {
            return Err(RopeError::out_of_bounds(start, len, self.byte_len()));
        }
        if len == self.byte_len() {
            return Ok(self.clone());
        }
        if len == 0 {
            return Ok(Rope::empty(self.encoding()));
        }

        Ok(match self.kind() {
            Kind::Substring { parent, offset } => {
                make_substring(self.encoding(), parent, offset + start, len)
            }
            Kind::Repeat { child, .. } => {
                let pattern_len = child.byte_len();
                let offset_in_pattern = start % pattern_len;
                if offset_in_pattern + len <= pattern_len {
                    make_substring(self.encoding(), child, offset_in_pattern, len)
                } else {
                    make_substring(self.encoding(), self, start, len)
                }
            }
            _ => make_substring(self.encoding(), self, start, len),
        })
    }

    /// The same bytes under another encoding tag, with the code range reset
    /// to be reclassified on next query.
    pub fn with_encoding(&self, encoding: Encoding) -> Rope {
        if encoding == self.encoding() {
            return self.clone();
        }
        self.reencoded(encoding, CodeRange::Unknown)
    }

    /// The same bytes under another encoding whose code range the caller
    /// has already established, skipping the reclassification.
    pub fn with_encoding_verified(&self, encoding: Encoding, code_range: CodeRange) -> Rope {
        if encoding == self.encoding() {
            return self.clone();
        }
        self.reencoded(encoding, code_range)
    }

    fn reencoded(&self, encoding: Encoding, code_range: CodeRange) -> Rope {
        let kind = match self.kind() {
            Kind::Leaf { bytes } => Kind::Leaf {
                bytes: bytes.clone(),
            },
            Kind::Substring { parent, offset } => Kind::Substring {
                parent: parent.clone(),
                offset: *offset,
            },
            Kind::Concat {
                left,
                right,
                balanced,
            } => Kind::Concat {
                left: left.clone(),
                right: right.clone(),
                balanced: *balanced,
            },
            Kind::Repeat { child, count } => Kind::Repeat {
                child: child.clone(),
                count: *count,
            },
            Kind::Native { source } => Kind::Native {
                source: source.clone(),
            },
        };
        let char_len = (code_range == CodeRange::SevenBit).then_some(self.byte_len());
        Rope::from_parts(
            encoding,
            self.byte_len(),
            self.depth(),
            self.is_volatile(),
            code_range,
            char_len,
            kind,
        )
    }

    /// Logical concatenation without copying either operand, with the
    /// default depth threshold.
    pub fn concat(&self, right: &Rope) -> Result<Rope, RopeError> {
        self.concat_with_depth_threshold(right, DEPTH_THRESHOLD)
    }

    /// Concatenation with an explicit depth threshold: an operand at or
    /// over it is rebalanced (unbalanced Concat) or flattened (anything
    /// else) before the new node is formed.
    pub fn concat_with_depth_threshold(
        &self,
        right: &Rope,
        depth_threshold: usize,
    ) -> Result<Rope, RopeError> {
        let depth_threshold = depth_threshold.max(2);
        if self.is_empty() {
            return Ok(right.clone());
        }
        if right.is_empty() {
            return Ok(self.clone());
        }
        if self.encoding() != right.encoding() {
            return Err(RopeError::EncodingMismatch {
                left: self.encoding(),
                right: right.encoding(),
            });
        }
        let byte_len = self
            .byte_len()
            .checked_add(right.byte_len())
            .ok_or(RopeError::SizeOverflow)?;

        // Natively backed operands are snapshotted so a Concat never caches
        // over volatile content.
        let mut left = if self.is_volatile() {
            self.flatten()
        } else {
            self.clone()
        };
        let mut right = if right.is_volatile() {
            right.flatten()
        } else {
            right.clone()
        };

        // Two broken halves may compose into a valid whole, so this pair is
        // materialized eagerly with an unresolved range instead of combining
        // the caches.
        if left.cached_code_range() == CodeRange::Broken
            || right.cached_code_range() == CodeRange::Broken
        {
            let mut buf = vec![0u8; byte_len];
            write_bytes_into(&left, &mut buf[..left.byte_len()]);
            write_bytes_into(&right, &mut buf[left.byte_len()..]);
            return Ok(Rope::from_bytes(buf, left.encoding()));
        }

        if left.depth() >= depth_threshold {
            left = reduce_depth(&left, depth_threshold);
        }
        if right.depth() >= depth_threshold {
            right = reduce_depth(&right, depth_threshold);
        }

        Ok(concat_node(&left, &right))
    }

    /// `count` logical copies of this rope.
    ///
    /// Zero copies yield the empty rope of the same encoding and one copy
    /// yields the rope itself. A one-byte pattern is materialized as a
    /// filled Leaf; anything else becomes a Repeat node whose bytes are
    /// produced on demand.
    pub fn repeat(&self, count: usize) -> Result<Rope, RopeError> {
        match count {
            0 => Ok(Rope::empty(self.encoding())),
            1 => Ok(self.clone()),
            _ => {
                if self.is_empty() {
                    return Ok(self.clone());
                }
                let byte_len = self
                    .byte_len()
                    .checked_mul(count)
                    .ok_or(RopeError::SizeOverflow)?;

                if self.byte_len() == 1 {
                    let byte = self.byte_at(0)?;
                    return Ok(Rope::from_bytes_with_code_range(
                        vec![byte; count],
                        self.encoding(),
                        self.cached_code_range(),
                    ));
                }

                // Well-formed content stays well-formed under repetition
                // and character counts multiply; broken content can shift
                // character boundaries across copies, so its count is left
                // to a scan.
                let code_range = self.cached_code_range();
                let char_len = match code_range {
                    CodeRange::SevenBit | CodeRange::Valid => {
                        self.cached_character_length().map(|len| len * count)
                    }
                    _ => None,
                };
                Ok(Rope::from_parts(
                    self.encoding(),
                    byte_len,
                    self.depth() + 1,
                    self.is_volatile(),
                    code_range,
                    char_len,
                    Kind::Repeat {
                        child: self.clone(),
                        count,
                    },
                ))
            }
        }
    }

    /// Materializes this rope into a contiguous Leaf with the same
    /// metadata. Flattening a Leaf returns it unchanged; flattening a
    /// volatile rope takes a stable snapshot whose metadata starts
    /// unresolved, since the advisory caches may be stale.
    pub fn flatten(&self) -> Rope {
        if let Kind::Leaf { .. } = self.kind() {
            return self.clone();
        }

        let mut buf = vec![0u8; self.byte_len()];
        write_bytes_into(self, &mut buf);

        if self.is_volatile() {
            return Rope::from_bytes(buf, self.encoding());
        }
        Rope::from_parts(
            self.encoding(),
            buf.len(),
            0,
            false,
            self.cached_code_range(),
            self.cached_character_length(),
            Kind::Leaf { bytes: buf.into() },
        )
    }
}

fn make_substring(encoding: Encoding, base: &Rope, offset: usize, len: usize) -> Rope {
    let mut base = base;
    let mut offset = offset;
    while let Kind::Substring {
        parent,
        offset: parent_offset,
    } = base.kind()
    {
        offset += parent_offset;
        base = parent;
    }

    if len == base.byte_len() {
        return if encoding == base.encoding() {
            base.clone()
        } else {
            base.with_encoding(encoding)
        };
    }

    // Any sub-range of seven-bit content is seven-bit.
    let code_range = if base.cached_code_range() == CodeRange::SevenBit {
        CodeRange::SevenBit
    } else {
        CodeRange::Unknown
    };
    let char_len = (code_range == CodeRange::SevenBit).then_some(len);
    Rope::from_parts(
        encoding,
        len,
        base.depth(),
        base.is_volatile(),
        code_range,
        char_len,
        Kind::Substring {
            parent: base.clone(),
            offset,
        },
    )
}

fn reduce_depth(rope: &Rope, depth_threshold: usize) -> Rope {
    match rope.kind() {
        Kind::Concat { .. } => rebalance(rope, depth_threshold),
        _ => rope.flatten(),
    }
}

/// Rebuilds an over-deep Concat bottom-up: linearize the unbalanced spine
/// into a queue, flatten any piece that is itself deep, then pair queue
/// neighbours level by level until one root remains. Shape changes, content
/// never does.
fn rebalance(rope: &Rope, depth_threshold: usize) -> Rope {
    let (left, right) = match rope.kind() {
        Kind::Concat { left, right, .. } => (left, right),
        _ => return rope.flatten(),
    };

    let mut current: VecDeque<Rope> = VecDeque::new();
    linearize(left, &mut current);
    linearize(right, &mut current);

    let flatten_threshold = (depth_threshold / 2).max(1);
    let mut next: VecDeque<Rope> = VecDeque::new();
    let mut root = None;

    while let Some(mut first) = current.pop_front() {
        if first.depth() >= flatten_threshold {
            first = first.flatten();
        }

        match current.pop_front() {
            None => {
                if next.is_empty() {
                    root = Some(first);
                } else {
                    // An odd rope at this level pairs up at the next one;
                    // it goes last to keep its position.
                    next.push_back(first);
                }
            }
            Some(mut second) => {
                if second.depth() >= flatten_threshold {
                    second = second.flatten();
                }
                next.push_back(concat_node(&first, &second));
            }
        }

        if current.is_empty() && !next.is_empty() {
            std::mem::swap(&mut current, &mut next);
        }
    }

    match root {
        Some(root) => root,
        None => rope.flatten(),
    }
}

/// Queues the leaves of an unbalanced Concat spine in order. Balanced
/// subtrees and non-Concat nodes are kept whole.
fn linearize(rope: &Rope, out: &mut VecDeque<Rope>) {
    if let Kind::Concat {
        left,
        right,
        balanced,
    } = rope.kind()
    {
        if !*balanced {
            linearize(left, out);
            linearize(right, out);
            return;
        }
    }
    out.push_back(rope.clone());
}

fn concat_node(left: &Rope, right: &Rope) -> Rope {
    let byte_len = left.byte_len() + right.byte_len();
    let depth = left.depth().max(right.depth()) + 1;
    let code_range = CodeRange::combine(left.cached_code_range(), right.cached_code_range());
    // Character counts only add up across a seam of well-formed halves.
    let char_len = match code_range {
        CodeRange::SevenBit | CodeRange::Valid => match (
            left.cached_character_length(),
            right.cached_character_length(),
        ) {
            (Some(left_len), Some(right_len)) => Some(left_len + right_len),
            _ => None,
        },
        _ => None,
    };
    Rope::from_parts(
        left.encoding(),
        byte_len,
        depth,
        left.is_volatile() || right.is_volatile(),
        code_range,
        char_len,
        Kind::Concat {
            left: left.clone(),
            right: right.clone(),
            balanced: concat_balanced(left, right),
        },
    )
}

/// A pair of non-Concats is balanced; a pair of balanced Concats is
/// balanced by induction; everything else is not.
fn concat_balanced(left: &Rope, right: &Rope) -> bool {
    match (left.kind(), right.kind()) {
        (
            Kind::Concat {
                balanced: left_balanced,
                ..
            },
            Kind::Concat {
                balanced: right_balanced,
                ..
            },
        ) => *left_balanced && *right_balanced,
        (Kind::Concat { .. }, _) | (_, Kind::Concat { .. }) => false,
        _ => true,
    }
}

/// Copies the logical bytes of `rope` into `out`, which must be exactly
/// `rope.byte_len()` long.
///
/// Iterative work-stack traversal. Substring nodes bound how many bytes
/// their descendants may contribute; those bounds are tracked per enclosing
/// level in `substring_lengths`, while a single running `byte_offset`
/// positions the next copy and is consumed by the first terminal node that
/// uses it.
pub(crate) fn write_bytes_into(rope: &Rope, out: &mut [u8]) {
    debug_assert_eq!(out.len(), rope.byte_len());

    let mut position = 0usize;
    let mut byte_offset = 0usize;
    let mut substring_lengths: Vec<usize> = Vec::new();
    let mut work: Vec<Rope> = vec![rope.clone()];

    while let Some(current) = work.pop() {
        if current.is_empty() {
            continue;
        }

        let raw: Option<Cow<'_, [u8]>> = match current.kind() {
            Kind::Leaf { bytes } => Some(Cow::Borrowed(&bytes[..])),
            Kind::Native { source } => {
                let mut buf = vec![0u8; current.byte_len()];
                source.read(0, &mut buf);
                Some(Cow::Owned(buf))
            }
            _ => None,
        };

        if let Some(raw) = raw {
            if let Some(mut bytes_to_copy) = substring_lengths.pop() {
                let available = current.byte_len() - byte_offset;
                let step = bytes_to_copy.min(available);
                out[position..position + step]
                    .copy_from_slice(&raw[byte_offset..byte_offset + step]);
                position += step;
                bytes_to_copy -= step;
                // Whatever this terminal could not satisfy stays pending
                // for the next item on the work stack.
                if bytes_to_copy > 0 {
                    substring_lengths.push(bytes_to_copy);
                }
            } else {
                let step = current.byte_len();
                out[position..position + step].copy_from_slice(&raw[..step]);
                position += step;
            }
            // The offset only positions the first terminal reached after a
            // Substring; later siblings copy from their start.
            byte_offset = 0;
            continue;
        }

        match current.kind() {
            Kind::Concat { left, right, .. } => {
                if let Some(&bytes_to_copy) = substring_lengths.last() {
                    let left_len = left.byte_len();
                    if byte_offset < left_len {
                        if byte_offset + bytes_to_copy > left_len {
                            work.push(right.clone());
                            work.push(left.clone());
                        } else {
                            work.push(left.clone());
                        }
                    } else {
                        // The whole range lives in the right child; rebase
                        // the offset to its coordinates.
                        byte_offset -= left_len;
                        work.push(right.clone());
                    }
                } else {
                    work.push(right.clone());
                    work.push(left.clone());
                }
            }
            Kind::Substring { parent, offset } => {
                work.push(parent.clone());
                match substring_lengths.last().copied() {
                    None => substring_lengths.push(current.byte_len()),
                    Some(enclosing) => {
                        // A nested Substring narrows the enclosing bound:
                        // split the top of the stack into "after this
                        // window" and "this window" so each level keeps a
                        // distinct count.
                        let adjusted = current.byte_len() - byte_offset;
                        if enclosing > adjusted {
                            substring_lengths.pop();
                            substring_lengths.push(enclosing - adjusted);
                            substring_lengths.push(adjusted);
                        }
                    }
                }
                byte_offset += offset;
            }
            Kind::Repeat { child, count } => {
                if let Some(&bytes_to_copy) = substring_lengths.last() {
                    let pattern_len = child.byte_len();
                    byte_offset %= pattern_len;
                    let loops = repeat_loop_count(byte_offset, *count, bytes_to_copy, pattern_len);
                    let flat_child = child.flatten();
                    for _ in 0..loops {
                        work.push(flat_child.clone());
                    }
                } else {
                    for _ in 0..*count {
                        work.push(child.clone());
                    }
                }
            }
            Kind::Leaf { .. } | Kind::Native { .. } => {}
        }
    }

    debug_assert_eq!(position, out.len());
}

/// Number of pattern repetitions an extraction starting `offset` bytes into
/// the first one needs to produce `len` bytes, capped at `count`.
fn repeat_loop_count(offset: usize, count: usize, len: usize, pattern_len: usize) -> usize {
    count.min((offset + len + pattern_len - 1) / pattern_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::StandardOracle;

    fn leaf(bytes: &[u8]) -> Rope {
        Rope::from_bytes(bytes, Encoding::UTF_8)
    }

    #[test]
    fn substring_identity_returns_same_value() {
        let rope = leaf(b"hello");
        let whole = rope.substring(0, 5).unwrap();
        assert!(whole.ptr_eq(&rope));
    }

    #[test]
    fn substring_of_substring_collapses() {
        let rope = leaf(b"hello world");
        let outer = rope.substring(2, 7).unwrap();
        let inner = outer.substring(1, 4).unwrap();
        assert_eq!(inner.to_bytes(), b"lo w");
        assert_eq!(inner.to_bytes(), rope.substring(3, 4).unwrap().to_bytes());
        // Exactly one level of Substring indirection remains.
        assert_eq!(format!("{inner:?}").matches("Substring").count(), 1);
    }

    #[test]
    fn substring_clips_through_concat_without_copying() {
        let rope = leaf(b"hello").concat(&leaf(b"world")).unwrap();
        let slice = rope.substring(3, 4).unwrap();
        assert_eq!(slice.to_bytes(), b"lowo");
        assert!(format!("{slice:?}").contains("Concat"));
    }

    #[test]
    fn substring_inherits_seven_bit_range() {
        let rope = Rope::from_bytes_with_code_range(
            b"ascii only".as_slice(),
            Encoding::UTF_8,
            CodeRange::SevenBit,
        );
        let slice = rope.substring(2, 5).unwrap();
        assert_eq!(slice.cached_code_range(), CodeRange::SevenBit);
        assert_eq!(slice.cached_character_length(), Some(5));
    }

    #[test]
    fn substring_bounds_are_strict() {
        let rope = leaf(b"abc");
        assert!(rope.substring(1, 3).is_err());
        assert!(rope.substring(4, 0).is_err());
        assert!(rope.substring(0, 0).unwrap().is_empty());
    }

    #[test]
    fn substring_within_one_repeat_period_collapses_to_child() {
        let rope = leaf(b"abc").repeat(3).unwrap();
        let slice = rope.substring(3, 2).unwrap();
        assert_eq!(slice.to_bytes(), b"ab");
        assert!(!format!("{slice:?}").contains("Repeat"));

        let spanning = rope.substring(4, 4).unwrap();
        assert_eq!(spanning.to_bytes(), b"bcab");
        assert!(format!("{spanning:?}").contains("Repeat"));
    }

    #[test]
    fn concat_empty_operands_short_circuit() {
        let rope = leaf(b"data");
        let empty = Rope::empty(Encoding::UTF_8);
        assert!(empty.concat(&rope).unwrap().ptr_eq(&rope));
        assert!(rope.concat(&empty).unwrap().ptr_eq(&rope));
    }

    #[test]
    fn concat_requires_matching_encodings() {
        let utf8 = leaf(b"a");
        let binary = Rope::from_bytes(b"b".as_slice(), Encoding::BINARY);
        assert_eq!(
            utf8.concat(&binary).unwrap_err(),
            RopeError::EncodingMismatch {
                left: Encoding::UTF_8,
                right: Encoding::BINARY,
            }
        );
    }

    #[test]
    fn concat_combines_cached_ranges() {
        let left = Rope::from_bytes_with_code_range(
            b"abc".as_slice(),
            Encoding::UTF_8,
            CodeRange::SevenBit,
        );
        let right = Rope::from_bytes_with_code_range(
            b"def".as_slice(),
            Encoding::UTF_8,
            CodeRange::SevenBit,
        );
        let rope = left.concat(&right).unwrap();
        assert_eq!(rope.cached_code_range(), CodeRange::SevenBit);
        assert_eq!(rope.cached_character_length(), Some(6));

        let unknown = leaf(b"ghi");
        let mixed = rope.concat(&unknown).unwrap();
        assert_eq!(mixed.cached_code_range(), CodeRange::Unknown);
        assert_eq!(mixed.cached_character_length(), None);
    }

    #[test]
    fn concat_of_broken_halves_can_heal() {
        let left = leaf(&[0xc3]);
        let right = leaf(&[0xa9]);
        assert_eq!(left.code_range(&StandardOracle), CodeRange::Broken);
        assert_eq!(right.code_range(&StandardOracle), CodeRange::Broken);

        let rope = left.concat(&right).unwrap();
        assert_eq!(rope.cached_code_range(), CodeRange::Unknown);
        assert_eq!(rope.code_range(&StandardOracle), CodeRange::Valid);
        assert_eq!(rope.character_length(&StandardOracle), 1);
    }

    #[test]
    fn incremental_concat_keeps_depth_bounded() {
        let mut rope = Rope::empty(Encoding::UTF_8);
        let mut expected = Vec::new();
        for i in 0..1000u32 {
            let byte = b'a' + (i % 26) as u8;
            rope = rope.concat(&Rope::from_byte(byte, Encoding::UTF_8)).unwrap();
            expected.push(byte);
        }
        assert!(rope.depth() <= DEPTH_THRESHOLD);
        assert_eq!(rope.to_bytes(), expected);
    }

    #[test]
    fn rebalance_preserves_content_for_left_leaning_trees() {
        let mut rope = leaf(b"x");
        let mut expected = vec![b'x'];
        for i in 0..200u32 {
            let chunk = format!("-{i}");
            rope = rope
                .concat_with_depth_threshold(&leaf(chunk.as_bytes()), 8)
                .unwrap();
            expected.extend_from_slice(chunk.as_bytes());
        }
        assert!(rope.depth() <= 8);
        assert_eq!(rope.to_bytes(), expected);
    }

    #[test]
    fn repeat_zero_one_and_many() {
        let rope = leaf(b"ab");
        assert!(rope.repeat(0).unwrap().is_empty());
        assert!(rope.repeat(1).unwrap().ptr_eq(&rope));

        let repeated = rope.repeat(3).unwrap();
        assert_eq!(repeated.byte_len(), 6);
        assert_eq!(repeated.to_bytes(), b"ababab");
        for index in 0..repeated.byte_len() {
            assert_eq!(
                repeated.byte_at(index).unwrap(),
                rope.byte_at(index % rope.byte_len()).unwrap()
            );
        }
    }

    #[test]
    fn repeat_single_byte_materializes() {
        let rope = Rope::from_byte(b'-', Encoding::UTF_8).repeat(5).unwrap();
        assert_eq!(rope.bytes(), Some(b"-----".as_slice()));
    }

    #[test]
    fn repeat_multiplies_known_character_length() {
        let child = Rope::from_bytes("\u{e9}x".as_bytes(), Encoding::UTF_8);
        assert_eq!(child.character_length(&StandardOracle), 2);
        let rope = child.repeat(4).unwrap();
        assert_eq!(rope.cached_character_length(), Some(8));
        assert_eq!(rope.character_length(&StandardOracle), 8);
    }

    #[test]
    fn repeat_of_broken_child_rescans() {
        // One orphan continuation byte then a lead byte: copies interleave
        // into a valid character at each seam.
        let child = leaf(&[0xa9, 0xc3]);
        assert_eq!(child.code_range(&StandardOracle), CodeRange::Broken);
        assert_eq!(child.character_length(&StandardOracle), 2);

        let rope = child.repeat(2).unwrap();
        assert_eq!(rope.code_range(&StandardOracle), CodeRange::Broken);
        // a9, then c3+a9, then c3: not 2 * 2.
        assert_eq!(rope.character_length(&StandardOracle), 3);
    }

    #[test]
    fn flatten_is_idempotent_and_preserves_metadata() {
        let rope = leaf(b"hello").concat(&leaf(b" world")).unwrap();
        let _ = rope.code_range(&StandardOracle);
        let flat = rope.flatten();
        assert_eq!(flat.bytes(), Some(b"hello world".as_slice()));
        assert_eq!(flat.cached_code_range(), CodeRange::SevenBit);
        assert_eq!(flat.cached_character_length(), Some(11));
        assert!(flat.flatten().ptr_eq(&flat));
    }

    #[test]
    fn with_encoding_resets_classification() {
        let rope = leaf(b"bytes");
        assert_eq!(rope.code_range(&StandardOracle), CodeRange::SevenBit);

        assert!(rope.with_encoding(Encoding::UTF_8).ptr_eq(&rope));

        let binary = rope.with_encoding(Encoding::BINARY);
        assert_eq!(binary.encoding(), Encoding::BINARY);
        assert_eq!(binary.cached_code_range(), CodeRange::Unknown);
        assert_eq!(binary.to_bytes(), rope.to_bytes());

        let verified = rope.with_encoding_verified(Encoding::US_ASCII, CodeRange::SevenBit);
        assert_eq!(verified.cached_code_range(), CodeRange::SevenBit);
        assert_eq!(verified.cached_character_length(), Some(5));
    }

    #[test]
    fn copy_bytes_through_nested_structure() {
        let base = leaf(b"hello").concat(&leaf(b"world")).unwrap();
        let rope = base.substring(2, 7).unwrap().repeat(2).unwrap();
        let flat = rope.to_bytes();
        assert_eq!(flat, b"lloworllloworl");

        let mut dst = vec![0u8; 5];
        rope.copy_bytes(&mut dst, 0, 4, 5).unwrap();
        assert_eq!(dst, flat[4..9]);
    }
}
