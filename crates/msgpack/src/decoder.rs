//! [`MsgPackDecoder`] — buffered decoder over a complete byte slice.

use crate::error::DecodeError;
use crate::extension::{dispatch_ext, ExtensionCodec, UnknownExtPolicy};
use crate::value::MsgPackValue;
use crate::DEFAULT_MAX_DEPTH;

// Pre-allocation clamp for composite headers, so a short hostile input
// declaring a huge element count cannot reserve memory it never fills.
const CAPACITY_CLAMP: usize = 4096;

pub struct MsgPackDecoder<'a> {
    codec: &'a ExtensionCodec,
    /// Policy for extension tags with no registered decoder.
    pub unknown_ext: UnknownExtPolicy,
    /// Nesting limit; exceeding it fails the decode.
    pub max_depth: usize,
    /// Optional cap on any single declared string/binary/extension byte
    /// length or array/map element count.
    pub max_len: Option<usize>,
    data: &'a [u8],
    x: usize,
}

impl<'a> MsgPackDecoder<'a> {
    pub fn new(codec: &'a ExtensionCodec) -> Self {
        Self {
            codec,
            unknown_ext: UnknownExtPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_len: None,
            data: &[],
            x: 0,
        }
    }

    /// Decodes exactly one value, consuming the whole input.
    pub fn decode(&mut self, input: &'a [u8]) -> Result<MsgPackValue, DecodeError> {
        self.data = input;
        self.x = 0;
        let value = self.read_any(0)?;
        let rest = self.data.len() - self.x;
        if rest > 0 {
            return Err(DecodeError::TrailingBytes(rest));
        }
        Ok(value)
    }

    /// Lazily decodes a sequence of concatenated values.
    ///
    /// The iterator ends at the end of input, or after yielding the first
    /// error. Values decoded before the error remain valid.
    pub fn decode_multi<'d>(&'d mut self, input: &'a [u8]) -> ValueIter<'d, 'a> {
        self.data = input;
        self.x = 0;
        ValueIter {
            decoder: self,
            failed: false,
        }
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), DecodeError> {
        if self.x + n > self.data.len() {
            Err(DecodeError::TruncatedInput)
        } else {
            Ok(())
        }
    }

    fn check_len(&self, n: usize) -> Result<(), DecodeError> {
        if let Some(limit) = self.max_len {
            if n > limit {
                return Err(DecodeError::SizeLimitExceeded(n, limit));
            }
        }
        Ok(())
    }

    #[inline]
    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.check(1)?;
        let v = self.data[self.x];
        self.x += 1;
        Ok(v)
    }

    #[inline]
    fn u16(&mut self) -> Result<u16, DecodeError> {
        self.check(2)?;
        let v = u16::from_be_bytes([self.data[self.x], self.data[self.x + 1]]);
        self.x += 2;
        Ok(v)
    }

    #[inline]
    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.check(4)?;
        let v = u32::from_be_bytes([
            self.data[self.x],
            self.data[self.x + 1],
            self.data[self.x + 2],
            self.data[self.x + 3],
        ]);
        self.x += 4;
        Ok(v)
    }

    #[inline]
    fn u64(&mut self) -> Result<u64, DecodeError> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }

    #[inline]
    fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.u8()? as i8)
    }

    #[inline]
    fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.u16()? as i16)
    }

    #[inline]
    fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.u32()? as i32)
    }

    #[inline]
    fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.u64()? as i64)
    }

    #[inline]
    fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.u32()?))
    }

    #[inline]
    fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.u64()?))
    }

    fn utf8(&mut self, size: usize) -> Result<String, DecodeError> {
        self.check_len(size)?;
        self.check(size)?;
        let slice = &self.data[self.x..self.x + size];
        let s = std::str::from_utf8(slice)
            .map_err(|_| DecodeError::InvalidUtf8)?
            .to_owned();
        self.x += size;
        Ok(s)
    }

    fn buf(&mut self, size: usize) -> Result<Vec<u8>, DecodeError> {
        self.check_len(size)?;
        self.check(size)?;
        let v = self.data[self.x..self.x + size].to_vec();
        self.x += size;
        Ok(v)
    }

    fn read_any(&mut self, depth: usize) -> Result<MsgPackValue, DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::DepthLimitExceeded(self.max_depth));
        }
        let byte = self.u8()?;

        // negative fixint: 0xe0-0xff
        if byte >= 0xe0 {
            return Ok(MsgPackValue::Int(byte as i8 as i64));
        }
        // positive fixint: 0x00-0x7f
        if byte <= 0x7f {
            return Ok(MsgPackValue::Int(byte as i64));
        }
        // fixmap: 0x80-0x8f
        if (0x80..=0x8f).contains(&byte) {
            return self.read_map(byte as usize & 0xf, depth);
        }
        // fixarray: 0x90-0x9f
        if (0x90..=0x9f).contains(&byte) {
            return self.read_arr(byte as usize & 0xf, depth);
        }
        // fixstr: 0xa0-0xbf
        if (0xa0..=0xbf).contains(&byte) {
            return self.utf8(byte as usize & 0x1f).map(MsgPackValue::Str);
        }

        match byte {
            0xc0 => Ok(MsgPackValue::Nil),
            // 0xc1 is never produced by the format.
            0xc1 => Err(DecodeError::InvalidFormat(byte, self.x - 1)),
            0xc2 => Ok(MsgPackValue::Bool(false)),
            0xc3 => Ok(MsgPackValue::Bool(true)),
            // bin8, bin16, bin32
            0xc4 => {
                let n = self.u8()? as usize;
                self.buf(n).map(MsgPackValue::Bin)
            }
            0xc5 => {
                let n = self.u16()? as usize;
                self.buf(n).map(MsgPackValue::Bin)
            }
            0xc6 => {
                let n = self.u32()? as usize;
                self.buf(n).map(MsgPackValue::Bin)
            }
            // ext8, ext16, ext32
            0xc7 => {
                let n = self.u8()? as usize;
                self.read_ext(n)
            }
            0xc8 => {
                let n = self.u16()? as usize;
                self.read_ext(n)
            }
            0xc9 => {
                let n = self.u32()? as usize;
                self.read_ext(n)
            }
            // float32, float64
            0xca => Ok(MsgPackValue::Float(self.f32()? as f64)),
            0xcb => Ok(MsgPackValue::Float(self.f64()?)),
            // uint8, uint16, uint32, uint64
            0xcc => Ok(MsgPackValue::Int(self.u8()? as i64)),
            0xcd => Ok(MsgPackValue::Int(self.u16()? as i64)),
            0xce => Ok(MsgPackValue::Int(self.u32()? as i64)),
            0xcf => {
                let v = self.u64()?;
                if v <= i64::MAX as u64 {
                    Ok(MsgPackValue::Int(v as i64))
                } else {
                    Ok(MsgPackValue::UInt(v))
                }
            }
            // int8, int16, int32, int64
            0xd0 => Ok(MsgPackValue::Int(self.i8()? as i64)),
            0xd1 => Ok(MsgPackValue::Int(self.i16()? as i64)),
            0xd2 => Ok(MsgPackValue::Int(self.i32()? as i64)),
            0xd3 => Ok(MsgPackValue::Int(self.i64()?)),
            // fixext1, fixext2, fixext4, fixext8, fixext16
            0xd4 => self.read_ext(1),
            0xd5 => self.read_ext(2),
            0xd6 => self.read_ext(4),
            0xd7 => self.read_ext(8),
            0xd8 => self.read_ext(16),
            // str8, str16, str32
            0xd9 => {
                let n = self.u8()? as usize;
                self.utf8(n).map(MsgPackValue::Str)
            }
            0xda => {
                let n = self.u16()? as usize;
                self.utf8(n).map(MsgPackValue::Str)
            }
            0xdb => {
                let n = self.u32()? as usize;
                self.utf8(n).map(MsgPackValue::Str)
            }
            // array16, array32
            0xdc => {
                let n = self.u16()? as usize;
                self.read_arr(n, depth)
            }
            0xdd => {
                let n = self.u32()? as usize;
                self.read_arr(n, depth)
            }
            // map16, map32
            0xde => {
                let n = self.u16()? as usize;
                self.read_map(n, depth)
            }
            0xdf => {
                let n = self.u32()? as usize;
                self.read_map(n, depth)
            }
            // All 256 byte values are covered above.
            _ => Err(DecodeError::InvalidFormat(byte, self.x - 1)),
        }
    }

    fn read_arr(&mut self, size: usize, depth: usize) -> Result<MsgPackValue, DecodeError> {
        self.check_len(size)?;
        let mut arr = Vec::with_capacity(size.min(CAPACITY_CLAMP));
        for _ in 0..size {
            arr.push(self.read_any(depth + 1)?);
        }
        Ok(MsgPackValue::Array(arr))
    }

    fn read_map(&mut self, size: usize, depth: usize) -> Result<MsgPackValue, DecodeError> {
        self.check_len(size)?;
        let mut pairs = Vec::with_capacity(size.min(CAPACITY_CLAMP));
        for _ in 0..size {
            let key = self.read_any(depth + 1)?;
            let val = self.read_any(depth + 1)?;
            pairs.push((key, val));
        }
        Ok(MsgPackValue::Map(pairs))
    }

    fn read_ext(&mut self, size: usize) -> Result<MsgPackValue, DecodeError> {
        let tag = self.i8()?;
        let data = self.buf(size)?;
        dispatch_ext(self.codec, self.unknown_ext, tag, data)
    }
}

/// Iterator over concatenated MessagePack values; see
/// [`MsgPackDecoder::decode_multi`].
pub struct ValueIter<'d, 'a> {
    decoder: &'d mut MsgPackDecoder<'a>,
    failed: bool,
}

impl Iterator for ValueIter<'_, '_> {
    type Item = Result<MsgPackValue, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.decoder.x >= self.decoder.data.len() {
            return None;
        }
        let result = self.decoder.read_any(0);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
