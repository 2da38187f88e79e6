//! [`MsgPackValue`] — the universal value type round-tripped by the codec.

use crate::extension::ExtensionValue;
use crate::timestamp::Timestamp;

/// The closed value universe of the MessagePack data model.
///
/// Covers every native MessagePack family plus two escape hatches:
/// [`MsgPackValue::Timestamp`] for the built-in timestamp extension and
/// [`MsgPackValue::Ext`] for opaque tagged payloads.
///
/// Maps are ordered pair lists: iteration order is preserved on both encode
/// and decode, keys may be any value, and the codec does not require keys to
/// be unique.
#[derive(Debug, Clone, PartialEq)]
pub enum MsgPackValue {
    /// MessagePack nil.
    Nil,
    /// Boolean value.
    Bool(bool),
    /// Signed integer. Every integer that fits in `i64` decodes here.
    Int(i64),
    /// Unsigned integer above `i64::MAX`, from a uint64 payload.
    UInt(u64),
    /// Floating-point number. The encoder narrows to float32 when exact.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw binary data.
    Bin(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<MsgPackValue>),
    /// Ordered key/value pairs.
    Map(Vec<(MsgPackValue, MsgPackValue)>),
    /// An instant, carried by the reserved timestamp extension (tag -1).
    Timestamp(Timestamp),
    /// An extension payload with no registered decoder.
    Ext(ExtensionValue),
}

impl From<bool> for MsgPackValue {
    fn from(b: bool) -> Self {
        MsgPackValue::Bool(b)
    }
}

impl From<i64> for MsgPackValue {
    fn from(i: i64) -> Self {
        MsgPackValue::Int(i)
    }
}

impl From<i32> for MsgPackValue {
    fn from(i: i32) -> Self {
        MsgPackValue::Int(i as i64)
    }
}

impl From<f64> for MsgPackValue {
    fn from(f: f64) -> Self {
        MsgPackValue::Float(f)
    }
}

impl From<&str> for MsgPackValue {
    fn from(s: &str) -> Self {
        MsgPackValue::Str(s.to_owned())
    }
}

impl From<String> for MsgPackValue {
    fn from(s: String) -> Self {
        MsgPackValue::Str(s)
    }
}

impl From<Vec<u8>> for MsgPackValue {
    fn from(b: Vec<u8>) -> Self {
        MsgPackValue::Bin(b)
    }
}

impl From<Timestamp> for MsgPackValue {
    fn from(ts: Timestamp) -> Self {
        MsgPackValue::Timestamp(ts)
    }
}

impl From<Vec<MsgPackValue>> for MsgPackValue {
    fn from(arr: Vec<MsgPackValue>) -> Self {
        MsgPackValue::Array(arr)
    }
}
