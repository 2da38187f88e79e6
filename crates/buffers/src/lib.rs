//! Byte buffer utilities shared by the MessagePack encoder.

mod writer;

pub use writer::Writer;
