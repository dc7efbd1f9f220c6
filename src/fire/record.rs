// src/fire/record.rs

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// One wildfire event as listed in the fire table.
///
/// Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    pub fire_id: String,

    #[serde(with = "timestamp")]
    pub start_date: NaiveDateTime,

    #[serde(with = "timestamp")]
    pub end_date: NaiveDateTime,

    pub lat: f64,
    pub lon: f64,

    #[serde(default)]
    pub state_name: String,
}

impl FireRecord {
    /// One label per simulated day, start to end inclusive, in date order.
    ///
    /// Each day keeps the start hour: a fire starting `2020-08-16 06:00`
    /// yields `20200816_06`, `20200817_06`, ...
    pub fn day_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        let mut current = self.start_date;
        while current <= self.end_date {
            labels.push(day_label(&current));
            current += TimeDelta::days(1);
        }
        labels
    }
}

/// Format a timestamp as the `YYYYMMDD_HH` label used in paths and script
/// arguments.
pub fn day_label(ts: &NaiveDateTime) -> String {
    ts.format("%Y%m%d_%H").to_string()
}

/// Serde helpers for the date columns. Accepts a handful of common layouts
/// on input and always writes `YYYY-MM-DD HH:MM:SS`.
pub mod timestamp {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(OUTPUT_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognised date '{raw}'")))
    }
}
