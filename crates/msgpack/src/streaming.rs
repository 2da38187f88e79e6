//! [`StreamingDecoder`] — resumable decoder for byte chunks of arbitrary
//! size.
//!
//! A MessagePack value may be split at any byte boundary, including inside
//! a multi-byte length field. The decoder holds the unconsumed bytes, a
//! cursor, and a stack of partially-filled composite frames; the cursor
//! only moves once every byte a primitive needs is buffered, so a parse
//! step interrupted by [`StreamingDecoder::next_value`] returning
//! `Ok(None)` retries from the identical position after the next
//! [`StreamingDecoder::push`].

use crate::error::DecodeError;
use crate::extension::{dispatch_ext, ExtensionCodec, UnknownExtPolicy};
use crate::value::MsgPackValue;
use crate::DEFAULT_MAX_DEPTH;

// Pre-allocation clamp for composite headers whose element bytes have not
// arrived yet.
const CAPACITY_CLAMP: usize = 4096;

/// A partially-parsed composite awaiting `remaining` more elements.
enum Frame {
    Array {
        items: Vec<MsgPackValue>,
        remaining: usize,
    },
    Map {
        pairs: Vec<(MsgPackValue, MsgPackValue)>,
        pending_key: Option<MsgPackValue>,
        remaining: usize,
    },
}

/// One parse step outcome.
enum Step {
    /// Not enough buffered bytes; the cursor did not move.
    NeedMore,
    /// A complete primitive or empty composite.
    Value(MsgPackValue),
    /// A composite header was consumed and a frame pushed.
    Opened,
}

pub struct StreamingDecoder<'a> {
    codec: &'a ExtensionCodec,
    /// Policy for extension tags with no registered decoder.
    pub unknown_ext: UnknownExtPolicy,
    /// Frame stack depth limit.
    pub max_depth: usize,
    /// Optional cap on any single declared length, as in the buffered
    /// decoder.
    pub max_len: Option<usize>,
    buf: Vec<u8>,
    x: usize,
    stack: Vec<Frame>,
}

impl<'a> StreamingDecoder<'a> {
    pub fn new(codec: &'a ExtensionCodec) -> Self {
        Self {
            codec,
            unknown_ext: UnknownExtPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_len: None,
            buf: Vec::new(),
            x: 0,
            stack: Vec::new(),
        }
    }

    /// Appends a chunk of input bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// True while a value is mid-parse or unconsumed bytes remain buffered.
    ///
    /// At a clean end of stream this is false; if the source is exhausted
    /// while this is true, the stream ended mid-value.
    pub fn in_progress(&self) -> bool {
        !self.stack.is_empty() || self.x < self.buf.len()
    }

    /// Number of buffered bytes not yet consumed by a completed value.
    pub fn buffered_len(&self) -> usize {
        self.buf.len() - self.x
    }

    /// Drives parsing over the buffered bytes.
    ///
    /// Returns `Ok(Some(value))` for each completed top-level value,
    /// `Ok(None)` once more input is required, and `Err` terminally on
    /// malformed input. After an error the decoder must be discarded;
    /// values already returned stay valid.
    pub fn next_value(&mut self) -> Result<Option<MsgPackValue>, DecodeError> {
        loop {
            match self.step()? {
                Step::NeedMore => {
                    self.compact();
                    return Ok(None);
                }
                Step::Opened => {}
                Step::Value(value) => {
                    if let Some(done) = self.absorb(value) {
                        self.compact();
                        return Ok(Some(done));
                    }
                }
            }
        }
    }

    /// Drops the consumed prefix of the buffer.
    fn compact(&mut self) {
        if self.x > 0 {
            self.buf.drain(..self.x);
            self.x = 0;
        }
    }

    /// Feeds a completed value to the innermost open composite. Returns the
    /// value if the stack is empty, i.e. a top-level value is complete.
    fn absorb(&mut self, value: MsgPackValue) -> Option<MsgPackValue> {
        let mut value = value;
        loop {
            let closed = match self.stack.last_mut() {
                None => return Some(value),
                Some(Frame::Array { items, remaining }) => {
                    items.push(value);
                    *remaining -= 1;
                    *remaining == 0
                }
                Some(Frame::Map {
                    pairs,
                    pending_key,
                    remaining,
                }) => match pending_key.take() {
                    None => {
                        *pending_key = Some(value);
                        false
                    }
                    Some(key) => {
                        pairs.push((key, value));
                        *remaining -= 1;
                        *remaining == 0
                    }
                },
            };
            if !closed {
                return None;
            }
            value = match self.stack.pop() {
                Some(Frame::Array { items, .. }) => MsgPackValue::Array(items),
                Some(Frame::Map { pairs, .. }) => MsgPackValue::Map(pairs),
                // `closed` implies a frame was on the stack.
                None => unreachable!(),
            };
        }
    }

    #[inline]
    fn have(&self, n: usize) -> bool {
        self.buf.len() - self.x >= n
    }

    #[inline]
    fn peek(&self, i: usize) -> u8 {
        self.buf[self.x + i]
    }

    fn peek_u16(&self, i: usize) -> u16 {
        u16::from_be_bytes([self.peek(i), self.peek(i + 1)])
    }

    fn peek_u32(&self, i: usize) -> u32 {
        u32::from_be_bytes([
            self.peek(i),
            self.peek(i + 1),
            self.peek(i + 2),
            self.peek(i + 3),
        ])
    }

    fn peek_u64(&self, i: usize) -> u64 {
        ((self.peek_u32(i) as u64) << 32) | self.peek_u32(i + 4) as u64
    }

    fn check_len(&self, n: usize) -> Result<(), DecodeError> {
        if let Some(limit) = self.max_len {
            if n > limit {
                return Err(DecodeError::SizeLimitExceeded(n, limit));
            }
        }
        Ok(())
    }

    /// Parses one atom at the cursor, matching the buffered decoder's tag
    /// dispatch byte for byte.
    fn step(&mut self) -> Result<Step, DecodeError> {
        if !self.have(1) {
            return Ok(Step::NeedMore);
        }
        let byte = self.peek(0);

        // negative fixint: 0xe0-0xff
        if byte >= 0xe0 {
            self.x += 1;
            return Ok(Step::Value(MsgPackValue::Int(byte as i8 as i64)));
        }
        // positive fixint: 0x00-0x7f
        if byte <= 0x7f {
            self.x += 1;
            return Ok(Step::Value(MsgPackValue::Int(byte as i64)));
        }
        // fixmap: 0x80-0x8f
        if (0x80..=0x8f).contains(&byte) {
            return self.open_map(byte as usize & 0xf, 1);
        }
        // fixarray: 0x90-0x9f
        if (0x90..=0x9f).contains(&byte) {
            return self.open_arr(byte as usize & 0xf, 1);
        }
        // fixstr: 0xa0-0xbf
        if (0xa0..=0xbf).contains(&byte) {
            return self.take_str(byte as usize & 0x1f, 1);
        }

        match byte {
            0xc0 => self.scalar(1, MsgPackValue::Nil),
            // 0xc1 is never produced by the format.
            0xc1 => Err(DecodeError::InvalidFormat(byte, self.x)),
            0xc2 => self.scalar(1, MsgPackValue::Bool(false)),
            0xc3 => self.scalar(1, MsgPackValue::Bool(true)),
            // bin8, bin16, bin32
            0xc4 => {
                if !self.have(2) {
                    return Ok(Step::NeedMore);
                }
                self.take_bin(self.peek(1) as usize, 2)
            }
            0xc5 => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                self.take_bin(self.peek_u16(1) as usize, 3)
            }
            0xc6 => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                self.take_bin(self.peek_u32(1) as usize, 5)
            }
            // ext8, ext16, ext32
            0xc7 => {
                if !self.have(2) {
                    return Ok(Step::NeedMore);
                }
                self.take_ext(self.peek(1) as usize, 2)
            }
            0xc8 => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                self.take_ext(self.peek_u16(1) as usize, 3)
            }
            0xc9 => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                self.take_ext(self.peek_u32(1) as usize, 5)
            }
            // float32, float64
            0xca => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                let v = f32::from_bits(self.peek_u32(1));
                self.scalar(5, MsgPackValue::Float(v as f64))
            }
            0xcb => {
                if !self.have(9) {
                    return Ok(Step::NeedMore);
                }
                let v = f64::from_bits(self.peek_u64(1));
                self.scalar(9, MsgPackValue::Float(v))
            }
            // uint8, uint16, uint32, uint64
            0xcc => {
                if !self.have(2) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek(1) as i64;
                self.scalar(2, MsgPackValue::Int(v))
            }
            0xcd => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u16(1) as i64;
                self.scalar(3, MsgPackValue::Int(v))
            }
            0xce => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u32(1) as i64;
                self.scalar(5, MsgPackValue::Int(v))
            }
            0xcf => {
                if !self.have(9) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u64(1);
                let value = if v <= i64::MAX as u64 {
                    MsgPackValue::Int(v as i64)
                } else {
                    MsgPackValue::UInt(v)
                };
                self.scalar(9, value)
            }
            // int8, int16, int32, int64
            0xd0 => {
                if !self.have(2) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek(1) as i8 as i64;
                self.scalar(2, MsgPackValue::Int(v))
            }
            0xd1 => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u16(1) as i16 as i64;
                self.scalar(3, MsgPackValue::Int(v))
            }
            0xd2 => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u32(1) as i32 as i64;
                self.scalar(5, MsgPackValue::Int(v))
            }
            0xd3 => {
                if !self.have(9) {
                    return Ok(Step::NeedMore);
                }
                let v = self.peek_u64(1) as i64;
                self.scalar(9, MsgPackValue::Int(v))
            }
            // fixext1, fixext2, fixext4, fixext8, fixext16
            0xd4 => self.take_ext(1, 1),
            0xd5 => self.take_ext(2, 1),
            0xd6 => self.take_ext(4, 1),
            0xd7 => self.take_ext(8, 1),
            0xd8 => self.take_ext(16, 1),
            // str8, str16, str32
            0xd9 => {
                if !self.have(2) {
                    return Ok(Step::NeedMore);
                }
                self.take_str(self.peek(1) as usize, 2)
            }
            0xda => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                self.take_str(self.peek_u16(1) as usize, 3)
            }
            0xdb => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                self.take_str(self.peek_u32(1) as usize, 5)
            }
            // array16, array32
            0xdc => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                self.open_arr(self.peek_u16(1) as usize, 3)
            }
            0xdd => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                self.open_arr(self.peek_u32(1) as usize, 5)
            }
            // map16, map32
            0xde => {
                if !self.have(3) {
                    return Ok(Step::NeedMore);
                }
                self.open_map(self.peek_u16(1) as usize, 3)
            }
            0xdf => {
                if !self.have(5) {
                    return Ok(Step::NeedMore);
                }
                self.open_map(self.peek_u32(1) as usize, 5)
            }
            _ => Err(DecodeError::InvalidFormat(byte, self.x)),
        }
    }

    /// Consumes `consumed` header bytes and yields a fixed-size value.
    fn scalar(&mut self, consumed: usize, value: MsgPackValue) -> Result<Step, DecodeError> {
        self.x += consumed;
        Ok(Step::Value(value))
    }

    fn take_str(&mut self, size: usize, header: usize) -> Result<Step, DecodeError> {
        self.check_len(size)?;
        if !self.have(header + size) {
            return Ok(Step::NeedMore);
        }
        let start = self.x + header;
        let s = std::str::from_utf8(&self.buf[start..start + size])
            .map_err(|_| DecodeError::InvalidUtf8)?
            .to_owned();
        self.x += header + size;
        Ok(Step::Value(MsgPackValue::Str(s)))
    }

    fn take_bin(&mut self, size: usize, header: usize) -> Result<Step, DecodeError> {
        self.check_len(size)?;
        if !self.have(header + size) {
            return Ok(Step::NeedMore);
        }
        let start = self.x + header;
        let data = self.buf[start..start + size].to_vec();
        self.x += header + size;
        Ok(Step::Value(MsgPackValue::Bin(data)))
    }

    /// `header` counts the bytes before the extension type byte.
    fn take_ext(&mut self, size: usize, header: usize) -> Result<Step, DecodeError> {
        self.check_len(size)?;
        if !self.have(header + 1 + size) {
            return Ok(Step::NeedMore);
        }
        let tag = self.peek(header) as i8;
        let start = self.x + header + 1;
        let data = self.buf[start..start + size].to_vec();
        self.x += header + 1 + size;
        let value = dispatch_ext(self.codec, self.unknown_ext, tag, data)?;
        Ok(Step::Value(value))
    }

    fn open_arr(&mut self, count: usize, header: usize) -> Result<Step, DecodeError> {
        self.check_len(count)?;
        self.x += header;
        if count == 0 {
            return Ok(Step::Value(MsgPackValue::Array(Vec::new())));
        }
        self.check_depth()?;
        self.stack.push(Frame::Array {
            items: Vec::with_capacity(count.min(CAPACITY_CLAMP)),
            remaining: count,
        });
        Ok(Step::Opened)
    }

    fn open_map(&mut self, count: usize, header: usize) -> Result<Step, DecodeError> {
        self.check_len(count)?;
        self.x += header;
        if count == 0 {
            return Ok(Step::Value(MsgPackValue::Map(Vec::new())));
        }
        self.check_depth()?;
        self.stack.push(Frame::Map {
            pairs: Vec::with_capacity(count.min(CAPACITY_CLAMP)),
            pending_key: None,
            remaining: count,
        });
        Ok(Step::Opened)
    }

    fn check_depth(&self) -> Result<(), DecodeError> {
        if self.stack.len() >= self.max_depth {
            return Err(DecodeError::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }
}
