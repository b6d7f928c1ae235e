//! Timestamps and the clock every temporal rule is evaluated against
use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// # Panics
    ///
    /// Panics when the fields do not name a valid calendar instant.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .expect("calendar fields out of range")
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn shifted(&self, by: TimeDelta) -> Self {
        Self(self.0 + by)
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

/// Accepts RFC 3339 with an offset, or a bare `YYYY-MM-DDTHH:MM:SS` read as UTC
impl<'de> Deserialize<'de> for TimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<DateTime<Utc>>()
            .or_else(|_| raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()))
            .map(TimeStamp)
            .map_err(serde::de::Error::custom)
    }
}

// Encoded as `[seconds, subsec nanos]`, covering chrono's whole range
impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?
            .i64(self.0.timestamp())?
            .u32(self.0.timestamp_subsec_nanos())?
            .ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message(
                "timestamp must be a [seconds, nanos] pair",
            ));
        }
        let secs = d.i64()?;
        let nanos = d.u32()?;

        DateTime::from_timestamp(secs, nanos)
            .map(TimeStamp)
            .ok_or_else(|| minicbor::decode::Error::message("timestamp out of range"))
    }
}

/// Source of "now". Services capture it once per call.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp {
        TimeStamp::new()
    }
}

/// Deterministic clock for tests. Can be moved forward between calls.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<TimeStamp>,
}

impl FixedClock {
    pub fn new(at: TimeStamp) -> Self {
        Self { at: Mutex::new(at) }
    }
    pub fn set(&self, at: TimeStamp) {
        *self.at.lock() = at;
    }
    pub fn advance(&self, by: TimeDelta) {
        let mut at = self.at.lock();
        *at = at.shifted(by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp {
        *self.at.lock()
    }
}
