//! ==============================================================================
//! reading.rs - sensor reading model
//! ==============================================================================
//!
//! purpose:
//!     defines the one record the dashboard deals with: a timestamped sample
//!     of temperature, humidity, eco2 and pm2.5 as returned by the backend.
//!
//! relationships:
//!     - produced by: source.rs (json body of GET /api/readings)
//!     - consumed by: render.rs (summary + chart series)
//!
//! timestamps:
//!     the backend stores rows with sqlite's CURRENT_TIMESTAMP, which is a
//!     naive "YYYY-MM-DD HH:MM:SS" in utc. we also accept rfc 3339 strings
//!     and epoch milliseconds so other producers can feed the dashboard.
//!
//! ==============================================================================

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// one sensor sample, immutable once received
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// row id assigned by the backend, if it exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: Timestamp,
    /// temperature in celsius
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
    /// equivalent co2 in ppm
    pub eco2: u32,
    /// particulate matter <= 2.5um
    pub pm2_5: f64,
    /// formaldehyde, only some sensor boards report it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ech2o: Option<u32>,
    /// total volatile organic compounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvoc: Option<u32>,
    /// particulate matter <= 10um
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm10: Option<u32>,
}

/// instant a reading was taken, always held in utc
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn from_millis(ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(ms).single().map(Timestamp)
    }

    /// parse any of the textual forms the backend may emit
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp(dt.with_timezone(&Utc)));
        }
        const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
        NAIVE_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(|naive| Timestamp(naive.and_utc()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Millis(i64),
            Fractional(f64),
        }

        use serde::de::Error;
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Timestamp::parse(&s)
                .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp {s:?}"))),
            Raw::Millis(ms) => Timestamp::from_millis(ms)
                .ok_or_else(|| D::Error::custom(format!("epoch millis out of range: {ms}"))),
            Raw::Fractional(ms) if ms.is_finite() => Timestamp::from_millis(ms.trunc() as i64)
                .ok_or_else(|| D::Error::custom(format!("epoch millis out of range: {ms}"))),
            Raw::Fractional(ms) => Err(D::Error::custom(format!("invalid epoch millis: {ms}"))),
        }
    }
}
