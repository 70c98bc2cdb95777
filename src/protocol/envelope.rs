//! Message envelope
//!
//! Fixed-size header prefixed to every message in both directions.
//!
//! ```text
//! ┌────────────────┬──────────────┬──────────┐
//! │ Timestamp (8)  │ Corr. Id (2) │ Kind (1) │
//! └────────────────┴──────────────┴──────────┘
//! ```
//!
//! All integers are in native byte order. Client and server must agree on
//! it; nothing in the protocol negotiates it.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

use crate::error::{RelayError, Result};

/// Envelope size: 8 byte timestamp + 2 byte correlation id + 1 byte kind
pub const ENVELOPE_SIZE: usize = 11;

// Bit layout of the packed timestamp: (shift, width)
const YEAR: (u32, u32) = (0, 11);
const DAY: (u32, u32) = (11, 5);
const MONTH: (u32, u32) = (16, 4);
const HOUR: (u32, u32) = (20, 5);
const MINUTE: (u32, u32) = (25, 6);
const SECOND: (u32, u32) = (31, 6);
const MILLISECOND: (u32, u32) = (37, 10);

/// Compact wall-clock time packed into 64 bits
///
/// Only used for diagnostics; ordering between messages is not derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wrap a raw value read off the wire
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Current UTC time
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = since_epoch.as_secs();
        let (year, month, day) = civil_from_days((secs / 86_400) as i64);
        let secs_of_day = secs % 86_400;

        Self::from_parts(
            year as u64,
            month,
            day,
            secs_of_day / 3600,
            (secs_of_day % 3600) / 60,
            secs_of_day % 60,
            u64::from(since_epoch.subsec_millis()),
        )
    }

    /// Pack calendar fields. Values wider than their slot are masked.
    pub fn from_parts(
        year: u64,
        month: u64,
        day: u64,
        hour: u64,
        minute: u64,
        second: u64,
        millisecond: u64,
    ) -> Self {
        let mut value = 0;
        for (field, (shift, width)) in [
            (year, YEAR),
            (day, DAY),
            (month, MONTH),
            (hour, HOUR),
            (minute, MINUTE),
            (second, SECOND),
            (millisecond, MILLISECOND),
        ] {
            value |= (field & mask(width)) << shift;
        }
        Self(value)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn year(&self) -> u64 {
        self.field(YEAR)
    }

    pub fn month(&self) -> u64 {
        self.field(MONTH)
    }

    pub fn day(&self) -> u64 {
        self.field(DAY)
    }

    pub fn hour(&self) -> u64 {
        self.field(HOUR)
    }

    pub fn minute(&self) -> u64 {
        self.field(MINUTE)
    }

    pub fn second(&self) -> u64 {
        self.field(SECOND)
    }

    pub fn millisecond(&self) -> u64 {
        self.field(MILLISECOND)
    }

    fn field(&self, (shift, width): (u32, u32)) -> u64 {
        (self.0 >> shift) & mask(width)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
            self.millisecond()
        )
    }
}

fn mask(width: u32) -> u64 {
    (1u64 << width) - 1
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u64;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u64;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Header carried by every request and reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Send time, stamped by the encoder
    pub timestamp: Timestamp,

    /// Chosen by the requester, echoed by the server
    pub correlation_id: u16,

    /// Command or Response kind tag
    pub kind: u8,
}

impl Envelope {
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_ne(self.timestamp.raw());
        buf.put_u16_ne(self.correlation_id);
        buf.put_u8(self.kind);
    }

    /// Read an envelope, advancing `buf` past it
    pub fn read_from(buf: &mut &[u8]) -> Result<Self> {
        if buf.len() < ENVELOPE_SIZE {
            return Err(RelayError::Truncated {
                field: "envelope",
                needed: ENVELOPE_SIZE,
                available: buf.len(),
            });
        }

        Ok(Self {
            timestamp: Timestamp::from_raw(buf.get_u64_ne()),
            correlation_id: buf.get_u16_ne(),
            kind: buf.get_u8(),
        })
    }
}
