//! Byte buffer primitives shared by the byterope crates.

pub mod concat;
pub mod writer;

pub use concat::{concat, concat_list};
pub use writer::ByteWriter;
