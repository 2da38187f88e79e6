//! The built-in timestamp extension (reserved tag -1).
//!
//! Three payload layouts, narrowest first:
//! - 32-bit: 4-byte big-endian seconds, for `0 <= sec < 2^32` with zero
//!   nanoseconds.
//! - 64-bit: one big-endian u64 with nanoseconds in the high 30 bits and
//!   seconds in the low 34 bits, for `0 <= sec < 2^34`.
//! - 96-bit: 4-byte big-endian nanoseconds followed by 8-byte big-endian
//!   signed seconds, for everything else (including pre-epoch instants).

use crate::error::DecodeError;

/// Reserved extension tag for timestamps.
pub const EXT_TIMESTAMP: i8 = -1;

const NANOS_PER_SEC: u32 = 1_000_000_000;
const TIMESTAMP32_MAX_SEC: u64 = 0xffff_ffff;
const TIMESTAMP64_MAX_SEC: i64 = 0x3_ffff_ffff;

/// An instant as seconds since the Unix epoch plus a nanosecond part.
///
/// `sec` may be negative; `nsec` is always in `0..=999_999_999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    sec: i64,
    nsec: u32,
}

impl Timestamp {
    /// Creates a timestamp, rejecting out-of-range nanoseconds.
    pub fn new(sec: i64, nsec: u32) -> Result<Self, DecodeError> {
        if nsec >= NANOS_PER_SEC {
            return Err(DecodeError::InvalidTimestampNanos(nsec));
        }
        Ok(Self { sec, nsec })
    }

    /// Creates a timestamp from signed milliseconds since the epoch.
    pub fn from_millis(ms: i64) -> Self {
        Self {
            sec: ms.div_euclid(1000),
            nsec: (ms.rem_euclid(1000) * 1_000_000) as u32,
        }
    }

    pub fn sec(&self) -> i64 {
        self.sec
    }

    pub fn nsec(&self) -> u32 {
        self.nsec
    }

    /// Milliseconds since the epoch, truncating sub-millisecond precision.
    pub fn as_millis(&self) -> i64 {
        self.sec * 1000 + (self.nsec / 1_000_000) as i64
    }
}

/// Encodes a timestamp into the narrowest of the three payload layouts.
pub fn encode_timestamp(ts: Timestamp) -> Vec<u8> {
    let sec = ts.sec();
    let nsec = ts.nsec();
    if (0..=TIMESTAMP64_MAX_SEC).contains(&sec) {
        let sec = sec as u64;
        if nsec == 0 && sec <= TIMESTAMP32_MAX_SEC {
            (sec as u32).to_be_bytes().to_vec()
        } else {
            let packed = ((nsec as u64) << 34) | sec;
            packed.to_be_bytes().to_vec()
        }
    } else {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&nsec.to_be_bytes());
        out.extend_from_slice(&sec.to_be_bytes());
        out
    }
}

/// Decodes a timestamp payload; the layout is selected by exact length.
pub fn decode_timestamp(data: &[u8]) -> Result<Timestamp, DecodeError> {
    match data.len() {
        4 => {
            let sec = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
            Timestamp::new(sec as i64, 0)
        }
        8 => {
            let packed = u64::from_be_bytes([
                data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
            ]);
            let nsec = (packed >> 34) as u32;
            let sec = (packed & 0x3_ffff_ffff) as i64;
            Timestamp::new(sec, nsec)
        }
        12 => {
            let nsec = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
            let sec = i64::from_be_bytes([
                data[4], data[5], data[6], data[7], data[8], data[9], data[10], data[11],
            ]);
            Timestamp::new(sec, nsec)
        }
        n => Err(DecodeError::InvalidTimestampLength(n)),
    }
}
