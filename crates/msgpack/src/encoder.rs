//! [`MsgPackEncoder`] — serializes a value tree into MessagePack bytes.
//!
//! Every value gets the narrowest encoding its magnitude or length allows;
//! wider families are never chosen when a narrower one fits.

use msgpack_buffers::Writer;

use crate::error::EncodeError;
use crate::extension::ExtensionCodec;
use crate::value::MsgPackValue;
use crate::DEFAULT_MAX_DEPTH;

const MAX_HEADER_LEN: usize = u32::MAX as usize;

pub struct MsgPackEncoder<'a> {
    writer: Writer,
    codec: &'a ExtensionCodec,
    /// Always encode floats as float64 when set.
    pub force_float64: bool,
    /// Nesting limit; exceeding it fails the encode.
    pub max_depth: usize,
}

impl<'a> MsgPackEncoder<'a> {
    pub fn new(codec: &'a ExtensionCodec) -> Self {
        Self {
            writer: Writer::new(),
            codec,
            force_float64: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Encodes one value. On error no partial output is returned and the
    /// encoder is reusable for the next call.
    pub fn encode(&mut self, value: &MsgPackValue) -> Result<Vec<u8>, EncodeError> {
        self.writer.reset();
        self.write_any(value, 0)?;
        Ok(self.writer.flush())
    }

    fn write_any(&mut self, value: &MsgPackValue, depth: usize) -> Result<(), EncodeError> {
        if depth > self.max_depth {
            return Err(EncodeError::DepthLimitExceeded(self.max_depth));
        }
        // Registered extensions get first pick, in registration order. The
        // default codec only claims Timestamp values.
        if let Some((tag, payload)) = self.codec.try_to_encode(value) {
            return self.write_ext(tag, &payload);
        }
        match value {
            MsgPackValue::Nil => self.writer.u8(0xc0),
            MsgPackValue::Bool(b) => self.writer.u8(if *b { 0xc3 } else { 0xc2 }),
            MsgPackValue::Int(i) => self.write_int(*i),
            MsgPackValue::UInt(u) => self.write_uint(*u),
            MsgPackValue::Float(f) => self.write_float(*f),
            MsgPackValue::Str(s) => self.write_str(s)?,
            MsgPackValue::Bin(b) => self.write_bin(b)?,
            MsgPackValue::Array(arr) => {
                self.write_array_header(arr.len())?;
                for item in arr {
                    self.write_any(item, depth + 1)?;
                }
            }
            MsgPackValue::Map(pairs) => {
                self.write_map_header(pairs.len())?;
                for (key, val) in pairs {
                    self.write_any(key, depth + 1)?;
                    self.write_any(val, depth + 1)?;
                }
            }
            MsgPackValue::Ext(ext) => self.write_ext(ext.tag, &ext.data)?,
            // Non-native values reach the wire only through the codec.
            MsgPackValue::Timestamp(_) => return Err(EncodeError::UnsupportedValue),
        }
        Ok(())
    }

    fn write_int(&mut self, int: i64) {
        if int >= 0 {
            self.write_uint(int as u64);
        } else if int >= -0x20 {
            // negative fixint: 0xe0..0xff
            self.writer.u8(int as u8);
        } else if int >= -0x80 {
            self.writer.u16(0xd000 | (int as i8 as u8 as u16));
        } else if int >= -0x8000 {
            self.writer.u8u16(0xd1, int as u16);
        } else if int >= -0x8000_0000 {
            self.writer.u8u32(0xd2, int as u32);
        } else {
            self.writer.u8u64(0xd3, int as u64);
        }
    }

    fn write_uint(&mut self, uint: u64) {
        if uint <= 0x7f {
            // positive fixint
            self.writer.u8(uint as u8);
        } else if uint <= 0xff {
            self.writer.u16(0xcc00 | uint as u16);
        } else if uint <= 0xffff {
            self.writer.u8u16(0xcd, uint as u16);
        } else if uint <= 0xffff_ffff {
            self.writer.u8u32(0xce, uint as u32);
        } else {
            self.writer.u8u64(0xcf, uint);
        }
    }

    fn write_float(&mut self, float: f64) {
        if !self.force_float64 {
            let narrow = float as f32;
            // NaN fails the equality check and stays float64.
            if (narrow as f64) == float {
                self.writer.u8f32(0xca, narrow);
                return;
            }
        }
        self.writer.u8f64(0xcb, float);
    }

    pub fn write_str_header(&mut self, length: usize) -> Result<(), EncodeError> {
        if length <= 0x1f {
            self.writer.u8(0xa0 | length as u8);
        } else if length <= 0xff {
            self.writer.u16(0xd900 | length as u16);
        } else if length <= 0xffff {
            self.writer.u8u16(0xda, length as u16);
        } else if length <= MAX_HEADER_LEN {
            self.writer.u8u32(0xdb, length as u32);
        } else {
            return Err(EncodeError::LengthOverflow(length));
        }
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        self.write_str_header(s.len())?;
        self.writer.utf8(s);
        Ok(())
    }

    pub fn write_bin_header(&mut self, length: usize) -> Result<(), EncodeError> {
        if length <= 0xff {
            self.writer.u16(0xc400 | length as u16);
        } else if length <= 0xffff {
            self.writer.u8u16(0xc5, length as u16);
        } else if length <= MAX_HEADER_LEN {
            self.writer.u8u32(0xc6, length as u32);
        } else {
            return Err(EncodeError::LengthOverflow(length));
        }
        Ok(())
    }

    fn write_bin(&mut self, buf: &[u8]) -> Result<(), EncodeError> {
        self.write_bin_header(buf.len())?;
        self.writer.buf(buf);
        Ok(())
    }

    pub fn write_array_header(&mut self, length: usize) -> Result<(), EncodeError> {
        if length <= 0xf {
            self.writer.u8(0x90 | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(0xdc, length as u16);
        } else if length <= MAX_HEADER_LEN {
            self.writer.u8u32(0xdd, length as u32);
        } else {
            return Err(EncodeError::LengthOverflow(length));
        }
        Ok(())
    }

    pub fn write_map_header(&mut self, length: usize) -> Result<(), EncodeError> {
        if length <= 0xf {
            self.writer.u8(0x80 | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(0xde, length as u16);
        } else if length <= MAX_HEADER_LEN {
            self.writer.u8u32(0xdf, length as u32);
        } else {
            return Err(EncodeError::LengthOverflow(length));
        }
        Ok(())
    }

    pub fn write_ext_header(&mut self, tag: i8, length: usize) -> Result<(), EncodeError> {
        match length {
            1 => self.writer.u16(0xd400 | (tag as u8 as u16)),
            2 => self.writer.u16(0xd500 | (tag as u8 as u16)),
            4 => self.writer.u16(0xd600 | (tag as u8 as u16)),
            8 => self.writer.u16(0xd700 | (tag as u8 as u16)),
            16 => self.writer.u16(0xd800 | (tag as u8 as u16)),
            _ => {
                if length <= 0xff {
                    self.writer.u16(0xc700 | length as u16);
                } else if length <= 0xffff {
                    self.writer.u8u16(0xc8, length as u16);
                } else if length <= MAX_HEADER_LEN {
                    self.writer.u8u32(0xc9, length as u32);
                } else {
                    return Err(EncodeError::LengthOverflow(length));
                }
                self.writer.u8(tag as u8);
            }
        }
        Ok(())
    }

    fn write_ext(&mut self, tag: i8, data: &[u8]) -> Result<(), EncodeError> {
        self.write_ext_header(tag, data.len())?;
        self.writer.buf(data);
        Ok(())
    }
}
