//! Immutable rope engine backing byte-string values.
//!
//! A [`Rope`] is a persistent tree over byte buffers: concatenation,
//! slicing and repetition share structure instead of copying, while
//! per-encoding classification (code range, character length) is computed
//! lazily and cached per node. Encoding knowledge itself stays behind the
//! [`EncodingOracle`] trait; [`StandardOracle`] covers the well-known
//! encodings. Externally managed memory participates through
//! [`NativeSource`] ropes, whose bytes are re-read on every access.

pub mod builder;
pub mod code_range;
pub mod encoding;
pub mod error;
pub mod native;
pub mod ops;
pub mod rope;

pub use builder::RopeBuilder;
pub use code_range::CodeRange;
pub use encoding::{Encoding, EncodingOracle, ScanReport, StandardOracle};
pub use error::RopeError;
pub use native::{NativeSource, RawParts};
pub use ops::DEPTH_THRESHOLD;
pub use rope::Rope;

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
