//! ==============================================================================
//! render.rs - readings to display frame
//! ==============================================================================
//!
//! purpose:
//!     the only real logic in the dashboard, kept as a pure function so it can
//!     be tested without a timer, a network or a chart.
//!
//! ```text
//!     newest-first readings in, one Frame out:
//!     - summary of the latest reading (first element)
//!     - labels and series in oldest-first order (exact reverse of input)
//! ```
//!
//! relationships:
//!     - used by: dashboard.rs (applies a Frame to the widgets)
//!     - uses: reading.rs
//!
//! ==============================================================================

use crate::reading::{Reading, Timestamp};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::Serialize;
use std::fmt::{Display, Write as _};

/// label pattern used when none is configured
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// true if chrono understands every specifier in `format`
pub fn is_valid_time_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// everything one poll cycle puts on screen
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub summary: Summary,
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub eco2: Vec<f64>,
}

/// latest reading, already formatted for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub temperature: String,
    pub humidity: String,
    pub eco2: String,
    pub pm2_5: String,
}

impl Summary {
    pub fn of(reading: &Reading) -> Self {
        Self {
            temperature: format!("{:.1}", reading.temperature),
            humidity: format!("{:.1}", reading.humidity),
            eco2: reading.eco2.to_string(),
            pm2_5: format_plain(reading.pm2_5),
        }
    }

    pub fn text(&self) -> String {
        format!(
            "Temp: {}°C | Hum: {}% | eCO2: {} ppm | PM2.5: {}",
            self.temperature, self.humidity, self.eco2, self.pm2_5
        )
    }
}

/// integral values print without a fraction, anything else as-is
fn format_plain(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LabelZone {
    /// whatever zone the host is configured for
    Local,
    Utc,
    Fixed(FixedOffset),
}

/// turns a reading timestamp into a time-of-day chart label
#[derive(Clone, Debug)]
pub struct Labeler {
    format: String,
    zone: LabelZone,
}

impl Default for Labeler {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT, LabelZone::Local)
    }
}

impl Labeler {
    pub fn new(format: impl Into<String>, zone: LabelZone) -> Self {
        Self { format: format.into(), zone }
    }

    pub fn utc(format: impl Into<String>) -> Self {
        Self::new(format, LabelZone::Utc)
    }

    pub fn label(&self, ts: &Timestamp) -> String {
        let dt = ts.as_datetime();
        match self.zone {
            LabelZone::Local => self.format_in(dt.with_timezone(&Local)),
            LabelZone::Utc => self.format_in(dt),
            LabelZone::Fixed(offset) => self.format_in(dt.with_timezone(&offset)),
        }
    }

    /// an unusable pattern falls back to the default instead of panicking
    fn format_in<Tz: TimeZone>(&self, dt: DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        let mut out = String::new();
        if write!(out, "{}", dt.format(&self.format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", dt.format(DEFAULT_TIME_FORMAT));
        }
        out
    }
}

/// build a frame from a newest-first batch; nothing to show for an empty one
pub fn render(readings: &[Reading], labeler: &Labeler) -> Option<Frame> {
    let latest = readings.first()?;
    let summary = Summary::of(latest);

    let n = readings.len();
    let mut frame = Frame {
        summary,
        labels: Vec::with_capacity(n),
        temperature: Vec::with_capacity(n),
        humidity: Vec::with_capacity(n),
        eco2: Vec::with_capacity(n),
    };

    for r in readings.iter().rev() {
        frame.labels.push(labeler.label(&r.timestamp));
        frame.temperature.push(r.temperature);
        frame.humidity.push(r.humidity);
        frame.eco2.push(f64::from(r.eco2));
    }

    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: &str, temperature: f64, humidity: f64, eco2: u32, pm2_5: f64) -> Reading {
        Reading {
            id: None,
            timestamp: Timestamp::parse(ts).unwrap(),
            temperature,
            humidity,
            eco2,
            pm2_5,
            ech2o: None,
            tvoc: None,
            pm10: None,
        }
    }

    #[test]
    fn summary_formatting() {
        let r = reading("2025-03-14 09:00:00", 23.456, 60.04, 512, 8.0);
        let s = Summary::of(&r);
        assert_eq!(s.temperature, "23.5");
        assert_eq!(s.humidity, "60.0");
        assert_eq!(s.eco2, "512");
        assert_eq!(s.pm2_5, "8");
        assert_eq!(s.text(), "Temp: 23.5°C | Hum: 60.0% | eCO2: 512 ppm | PM2.5: 8");
    }

    #[test]
    fn fractional_pm_is_not_rounded() {
        let r = reading("2025-03-14 09:00:00", 20.0, 50.0, 400, 8.25);
        assert_eq!(Summary::of(&r).pm2_5, "8.25");
    }

    #[test]
    fn empty_batch_renders_nothing() {
        assert!(render(&[], &Labeler::utc("%H:%M:%S")).is_none());
    }

    #[test]
    fn series_are_oldest_first() {
        let batch = vec![
            reading("2025-03-14 09:00:04", 23.0, 61.0, 530, 9.0),
            reading("2025-03-14 09:00:02", 22.0, 60.5, 520, 8.0),
            reading("2025-03-14 09:00:00", 21.0, 60.0, 510, 7.0),
        ];
        let frame = render(&batch, &Labeler::utc("%H:%M:%S")).unwrap();

        assert_eq!(frame.labels, vec!["09:00:00", "09:00:02", "09:00:04"]);
        assert_eq!(frame.temperature, vec![21.0, 22.0, 23.0]);
        assert_eq!(frame.humidity, vec![60.0, 60.5, 61.0]);
        assert_eq!(frame.eco2, vec![510.0, 520.0, 530.0]);
        // summary always describes the newest sample
        assert_eq!(frame.summary.eco2, "530");
    }

    #[test]
    fn labels_follow_the_configured_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let labeler = Labeler::new("%H:%M", LabelZone::Fixed(tokyo));
        let ts = Timestamp::parse("2025-03-14 23:30:00").unwrap();
        assert_eq!(labeler.label(&ts), "08:30");
    }

    #[test]
    fn unknown_specifier_falls_back_to_default_format() {
        assert!(!is_valid_time_format("%H:%Q"));
        assert!(is_valid_time_format(DEFAULT_TIME_FORMAT));

        let labeler = Labeler::utc("%H:%Q");
        let ts = Timestamp::parse("2025-03-14 09:26:53").unwrap();
        assert_eq!(labeler.label(&ts), "09:26:53");

        let batch = vec![reading("2025-03-14 09:00:00", 20.0, 50.0, 400, 1.0)];
        let frame = render(&batch, &labeler).unwrap();
        assert_eq!(frame.labels, vec!["09:00:00"]);
    }

    #[test]
    fn single_reading_is_its_own_history() {
        let batch = vec![reading("2025-03-14 09:00:00", 19.96, 44.44, 415, 3.0)];
        let frame = render(&batch, &Labeler::utc("%H:%M:%S")).unwrap();
        assert_eq!(frame.labels.len(), 1);
        assert_eq!(frame.summary.temperature, "20.0");
        assert_eq!(frame.summary.humidity, "44.4");
    }
}
