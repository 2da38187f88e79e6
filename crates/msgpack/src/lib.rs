//! MessagePack binary serialization codec.
//!
//! Encodes [`MsgPackValue`] trees into compact MessagePack bytes and
//! decodes them back, either from a complete buffer or incrementally from
//! chunks of arbitrary size. Application-defined types travel through the
//! [`ExtensionCodec`] registry; timestamps ship built in at the reserved
//! tag -1.
//!
//! ```
//! use msgpack_codec::{decode, encode, MsgPackValue};
//!
//! let value = MsgPackValue::Array(vec![
//!     MsgPackValue::Int(1),
//!     MsgPackValue::Str("two".into()),
//! ]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod extension;
pub mod streaming;
pub mod timestamp;
pub mod value;

pub use decoder::{MsgPackDecoder, ValueIter};
pub use encoder::MsgPackEncoder;
pub use error::{DecodeError, EncodeError};
pub use extension::{ExtensionCodec, ExtensionValue, UnknownExtPolicy};
pub use streaming::StreamingDecoder;
pub use timestamp::{decode_timestamp, encode_timestamp, Timestamp, EXT_TIMESTAMP};
pub use value::MsgPackValue;

/// Default nesting limit for both encoding and decoding.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for [`encode_with`].
#[derive(Default)]
pub struct EncodeOptions<'a> {
    /// Extension codec to consult; a fresh default codec when `None`.
    pub extension_codec: Option<&'a ExtensionCodec>,
    /// Always encode floats as float64, even when float32 is exact.
    pub force_float64: bool,
    /// Nesting limit override.
    pub max_depth: Option<usize>,
}

/// Options for [`decode_with`], [`decode_multi_with`], and
/// [`decode_stream_with`].
#[derive(Default)]
pub struct DecodeOptions<'a> {
    /// Extension codec to consult; a fresh default codec when `None`.
    pub extension_codec: Option<&'a ExtensionCodec>,
    /// Policy for extension tags with no registered decoder.
    pub unknown_ext: UnknownExtPolicy,
    /// Nesting limit override.
    pub max_depth: Option<usize>,
    /// Cap on any single declared string/binary/extension byte length or
    /// array/map element count, for untrusted input.
    pub max_len: Option<usize>,
}

/// Encodes a value with default options.
pub fn encode(value: &MsgPackValue) -> Result<Vec<u8>, EncodeError> {
    encode_with(value, &EncodeOptions::default())
}

/// Encodes a value.
pub fn encode_with(value: &MsgPackValue, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let default_codec;
    let codec = match options.extension_codec {
        Some(codec) => codec,
        None => {
            default_codec = ExtensionCodec::new();
            &default_codec
        }
    };
    let mut encoder = MsgPackEncoder::new(codec);
    encoder.force_float64 = options.force_float64;
    if let Some(depth) = options.max_depth {
        encoder.max_depth = depth;
    }
    encoder.encode(value)
}

/// Decodes exactly one value with default options; trailing bytes fail.
pub fn decode(bytes: &[u8]) -> Result<MsgPackValue, DecodeError> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decodes exactly one value; trailing bytes fail.
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<MsgPackValue, DecodeError> {
    let default_codec;
    let codec = match options.extension_codec {
        Some(codec) => codec,
        None => {
            default_codec = ExtensionCodec::new();
            &default_codec
        }
    };
    configure_decoder(codec, options).decode(bytes)
}

/// Decodes a sequence of concatenated values with default options.
///
/// For lazy consumption use [`MsgPackDecoder::decode_multi`] directly.
pub fn decode_multi(bytes: &[u8]) -> Result<Vec<MsgPackValue>, DecodeError> {
    decode_multi_with(bytes, &DecodeOptions::default())
}

/// Decodes a sequence of concatenated values.
pub fn decode_multi_with(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<Vec<MsgPackValue>, DecodeError> {
    let default_codec;
    let codec = match options.extension_codec {
        Some(codec) => codec,
        None => {
            default_codec = ExtensionCodec::new();
            &default_codec
        }
    };
    let mut decoder = configure_decoder(codec, options);
    decoder.decode_multi(bytes).collect()
}

/// Decodes every value from a sequence of byte chunks with default options.
pub fn decode_stream<I>(chunks: I) -> Result<Vec<MsgPackValue>, DecodeError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    decode_stream_with(chunks, &DecodeOptions::default())
}

/// Decodes every value from a sequence of byte chunks.
///
/// Chunks may split values at any byte boundary. A source that ends
/// mid-value fails with [`DecodeError::TruncatedInput`].
pub fn decode_stream_with<I>(
    chunks: I,
    options: &DecodeOptions,
) -> Result<Vec<MsgPackValue>, DecodeError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let default_codec;
    let codec = match options.extension_codec {
        Some(codec) => codec,
        None => {
            default_codec = ExtensionCodec::new();
            &default_codec
        }
    };
    let mut decoder = configure_streaming(codec, options);
    let mut values = Vec::new();
    for chunk in chunks {
        decoder.push(chunk.as_ref());
        while let Some(value) = decoder.next_value()? {
            values.push(value);
        }
    }
    if decoder.in_progress() {
        return Err(DecodeError::TruncatedInput);
    }
    Ok(values)
}

/// Decodes exactly one value from a sequence of byte chunks.
///
/// A second value or leftover bytes fail with
/// [`DecodeError::TrailingBytes`]; a source that ends mid-value fails with
/// [`DecodeError::TruncatedInput`].
pub fn decode_stream_one<I>(chunks: I, options: &DecodeOptions) -> Result<MsgPackValue, DecodeError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let default_codec;
    let codec = match options.extension_codec {
        Some(codec) => codec,
        None => {
            default_codec = ExtensionCodec::new();
            &default_codec
        }
    };
    let mut decoder = configure_streaming(codec, options);
    let mut chunks = chunks.into_iter();
    let mut first = None;
    while first.is_none() {
        match chunks.next() {
            Some(chunk) => {
                decoder.push(chunk.as_ref());
                first = decoder.next_value()?;
            }
            None => break,
        }
    }
    match first {
        // Exhausted mid-value (or the source was empty).
        None => Err(DecodeError::TruncatedInput),
        Some(value) => {
            let mut trailing = decoder.buffered_len();
            for chunk in chunks {
                trailing += chunk.as_ref().len();
            }
            if trailing > 0 {
                return Err(DecodeError::TrailingBytes(trailing));
            }
            Ok(value)
        }
    }
}

fn configure_decoder<'a>(codec: &'a ExtensionCodec, options: &DecodeOptions) -> MsgPackDecoder<'a> {
    let mut decoder = MsgPackDecoder::new(codec);
    decoder.unknown_ext = options.unknown_ext;
    if let Some(depth) = options.max_depth {
        decoder.max_depth = depth;
    }
    decoder.max_len = options.max_len;
    decoder
}

fn configure_streaming<'a>(
    codec: &'a ExtensionCodec,
    options: &DecodeOptions,
) -> StreamingDecoder<'a> {
    let mut decoder = StreamingDecoder::new(codec);
    decoder.unknown_ext = options.unknown_ext;
    if let Some(depth) = options.max_depth {
        decoder.max_depth = depth;
    }
    decoder.max_len = options.max_len;
    decoder
}
