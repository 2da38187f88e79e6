//! Binary buffer writer with auto-growing capacity.

/// Default initial buffer size.
const DEFAULT_CAPACITY: usize = 4096;

/// An owned output byte arena with a write cursor.
///
/// The buffer grows by amortized doubling, so a long run of small writes
/// stays O(1) per byte. Multi-byte values are written big-endian.
///
/// # Example
///
/// ```
/// use msgpack_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert_eq!(writer.flush(), [0x01, 0x02, 0x03]);
/// ```
pub struct Writer {
    bytes: Vec<u8>,
    pos: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.max(1)],
            pos: 0,
        }
    }

    /// Number of bytes written since the last flush or reset.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Ensures room for `extra` more bytes, doubling the buffer if needed.
    pub fn ensure_capacity(&mut self, extra: usize) {
        let needed = self.pos + extra;
        if needed > self.bytes.len() {
            let new_len = needed.max(self.bytes.len() * 2);
            self.bytes.resize(new_len, 0);
        }
    }

    /// Discards anything written so far.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Returns the written bytes and resets the cursor.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.bytes[..self.pos].to_vec();
        self.pos = 0;
        out
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.bytes[self.pos] = val;
        self.pos += 1;
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.u8(val as u8);
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.ensure_capacity(2);
        self.bytes[self.pos..self.pos + 2].copy_from_slice(&val.to_be_bytes());
        self.pos += 2;
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.ensure_capacity(4);
        self.bytes[self.pos..self.pos + 4].copy_from_slice(&val.to_be_bytes());
        self.pos += 4;
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.ensure_capacity(8);
        self.bytes[self.pos..self.pos + 8].copy_from_slice(&val.to_be_bytes());
        self.pos += 8;
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.u64(val as u64);
    }

    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.u32(val.to_bits());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.u64(val.to_bits());
    }

    /// Writes a u8 followed by a u16 (big-endian).
    pub fn u8u16(&mut self, byte: u8, val: u16) {
        self.ensure_capacity(3);
        self.bytes[self.pos] = byte;
        self.bytes[self.pos + 1..self.pos + 3].copy_from_slice(&val.to_be_bytes());
        self.pos += 3;
    }

    /// Writes a u8 followed by a u32 (big-endian).
    pub fn u8u32(&mut self, byte: u8, val: u32) {
        self.ensure_capacity(5);
        self.bytes[self.pos] = byte;
        self.bytes[self.pos + 1..self.pos + 5].copy_from_slice(&val.to_be_bytes());
        self.pos += 5;
    }

    /// Writes a u8 followed by a u64 (big-endian).
    pub fn u8u64(&mut self, byte: u8, val: u64) {
        self.ensure_capacity(9);
        self.bytes[self.pos] = byte;
        self.bytes[self.pos + 1..self.pos + 9].copy_from_slice(&val.to_be_bytes());
        self.pos += 9;
    }

    /// Writes a u8 followed by a f32 (big-endian).
    pub fn u8f32(&mut self, byte: u8, val: f32) {
        self.u8u32(byte, val.to_bits());
    }

    /// Writes a u8 followed by a f64 (big-endian).
    pub fn u8f64(&mut self, byte: u8, val: f64) {
        self.u8u64(byte, val.to_bits());
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.ensure_capacity(buf.len());
        self.bytes[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len();
    }

    /// Writes the UTF-8 bytes of a string. Returns the byte count written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf(s.as_bytes());
        s.len()
    }
}
