//! [`ExtensionCodec`] — the registry mapping extension tags to encode and
//! decode functions.

use crate::error::DecodeError;
use crate::timestamp::{decode_timestamp, encode_timestamp, EXT_TIMESTAMP};
use crate::value::MsgPackValue;

/// A raw extension payload: a signed tag plus opaque bytes.
///
/// Produced by the decoder only for unrecognized tags under
/// [`UnknownExtPolicy::Raw`]; the encoder writes it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionValue {
    pub tag: i8,
    pub data: Vec<u8>,
}

/// What the decoder does with an extension tag nobody registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownExtPolicy {
    /// Fail the decode with [`DecodeError::UnrecognizedExtension`].
    #[default]
    Error,
    /// Surface the raw tag and payload as [`MsgPackValue::Ext`].
    Raw,
}

type ExtEncodeFn = Box<dyn Fn(&MsgPackValue) -> Option<Vec<u8>> + Send + Sync>;
type ExtDecodeFn = Box<dyn Fn(&[u8], i8) -> Result<MsgPackValue, DecodeError> + Send + Sync>;

struct ExtensionEntry {
    tag: i8,
    encode: ExtEncodeFn,
    decode: ExtDecodeFn,
}

/// Ordered registry of extension codecs.
///
/// Every codec starts with the timestamp extension registered at the
/// reserved tag -1. Encoders walk the entries in registration order and use
/// the first one whose predicate accepts the value; decoders dispatch by
/// tag. Registering a tag twice replaces the earlier entry in place, so the
/// last registration wins without changing predicate order.
///
/// A codec shared between threads must not be mutated while encode or
/// decode calls are in flight; registration is single-writer, many-reader
/// and is not synchronized.
pub struct ExtensionCodec {
    entries: Vec<ExtensionEntry>,
}

impl Default for ExtensionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionCodec {
    /// Creates a codec with the built-in timestamp extension registered.
    pub fn new() -> Self {
        let mut codec = Self {
            entries: Vec::new(),
        };
        codec.register(
            EXT_TIMESTAMP,
            |value| match value {
                MsgPackValue::Timestamp(ts) => Some(encode_timestamp(*ts)),
                _ => None,
            },
            |data, _tag| decode_timestamp(data).map(MsgPackValue::Timestamp),
        );
        codec
    }

    /// Registers an encode/decode pair for `tag`, replacing any prior
    /// registration for the same tag.
    pub fn register<E, D>(&mut self, tag: i8, encode: E, decode: D)
    where
        E: Fn(&MsgPackValue) -> Option<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8], i8) -> Result<MsgPackValue, DecodeError> + Send + Sync + 'static,
    {
        let entry = ExtensionEntry {
            tag,
            encode: Box::new(encode),
            decode: Box::new(decode),
        };
        match self.entries.iter_mut().find(|e| e.tag == tag) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Whether a decoder is registered for `tag`.
    pub fn contains(&self, tag: i8) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    /// Offers `value` to each registered encoder in registration order and
    /// returns the first `(tag, payload)` produced.
    pub fn try_to_encode(&self, value: &MsgPackValue) -> Option<(i8, Vec<u8>)> {
        self.entries
            .iter()
            .find_map(|e| (e.encode)(value).map(|payload| (e.tag, payload)))
    }

    /// Decodes an extension payload via the decoder registered for `tag`.
    pub fn decode(&self, data: &[u8], tag: i8) -> Result<MsgPackValue, DecodeError> {
        match self.entries.iter().find(|e| e.tag == tag) {
            Some(entry) => (entry.decode)(data, tag),
            None => Err(DecodeError::UnrecognizedExtension(tag)),
        }
    }
}

/// Shared extension dispatch for both decoders.
pub(crate) fn dispatch_ext(
    codec: &ExtensionCodec,
    policy: UnknownExtPolicy,
    tag: i8,
    data: Vec<u8>,
) -> Result<MsgPackValue, DecodeError> {
    if codec.contains(tag) {
        codec.decode(&data, tag)
    } else {
        match policy {
            UnknownExtPolicy::Error => Err(DecodeError::UnrecognizedExtension(tag)),
            UnknownExtPolicy::Raw => Ok(MsgPackValue::Ext(ExtensionValue { tag, data })),
        }
    }
}
