// Sample domain model - one decoded archive datum
use crate::domain::descriptor::SignalDescriptor;
use crate::domain::value::Value;
use crate::error::ArchiveError;
use chrono::DateTime;
use serde::Deserialize;
use std::fmt;

/// Archive-recorded validity flag, independent of transport or parse success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Valid,
    Invalid,
    Alarm,
    Changing,
    Warning,
    Unknown,
}

impl Quality {
    pub fn from_code(code: i64) -> Quality {
        match code {
            0 => Quality::Valid,
            1 => Quality::Invalid,
            2 => Quality::Alarm,
            3 => Quality::Changing,
            4 => Quality::Warning,
            _ => Quality::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Valid => "VALID",
            Quality::Invalid => "INVALID",
            Quality::Alarm => "ALARM",
            Quality::Changing => "CHANGING",
            Quality::Warning => "WARNING",
            Quality::Unknown => "UNKNOWN",
        }
    }
}

/// One raw row as returned by the query-execution collaborator. Timestamps
/// are microseconds since epoch; value payloads stay as JSON until the
/// descriptor's type tags decide how to parse them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub data_time: i64,
    #[serde(default)]
    pub recv_time: i64,
    #[serde(default)]
    pub insert_time: i64,
    #[serde(default)]
    pub quality: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub write_value: serde_json::Value,
}

/// One decoded datum. A sample with a non-empty error text is a failed
/// sample: its value fields stay unparsed and must not be interpreted.
/// `Clone` is a deep copy; array payloads never alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Source timestamp, microseconds since epoch.
    pub data_time: i64,
    /// Event receive timestamp.
    pub recv_time: i64,
    /// Archive recording timestamp.
    pub insert_time: i64,
    pub quality: Quality,
    pub error: Option<String>,
    pub read_value: Option<Value>,
    pub write_value: Option<Value>,
}

impl Sample {
    /// Decode one raw row according to the descriptor's type, shape and
    /// access tags.
    pub fn decode(descriptor: &SignalDescriptor, row: &RawRow) -> Result<Sample, ArchiveError> {
        let error = row.error.as_deref().filter(|e| !e.is_empty()).map(str::to_string);

        let (read_value, write_value) = if error.is_some() {
            (None, None)
        } else {
            let read = if descriptor.has_read_value() {
                Some(Value::parse(descriptor.kind, descriptor.shape, &row.value)?)
            } else {
                None
            };
            let write = if descriptor.has_write_value() {
                Some(Value::parse(descriptor.kind, descriptor.shape, &row.write_value)?)
            } else {
                None
            };
            (read, write)
        };

        Ok(Sample {
            data_time: row.data_time,
            recv_time: row.recv_time,
            insert_time: row.insert_time,
            quality: Quality::from_code(row.quality),
            error,
            read_value,
            write_value,
        })
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_invalid(&self) -> bool {
        self.quality == Quality::Invalid
    }

    /// Number of items in the read value (0 for a failed sample).
    pub fn len(&self) -> usize {
        self.read_value.as_ref().map(Value::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a numeric conversion factor to both values in place.
    pub fn apply_factor(&mut self, f: f64) {
        if let Some(v) = self.read_value.as_mut() {
            v.apply_factor(f);
        }
        if let Some(v) = self.write_value.as_mut() {
            v.apply_factor(f);
        }
    }

    /// Render a timestamp as `dd/mm/yyyy HH:MM:SS.micros`.
    pub fn time_to_str(time_us: i64) -> String {
        let secs = time_us.div_euclid(1_000_000);
        let micros = time_us.rem_euclid(1_000_000);
        match DateTime::from_timestamp(secs, 0) {
            Some(dt) => format!("{}.{:06}", dt.format("%d/%m/%Y %H:%M:%S"), micros),
            None => format!("{time_us}us"),
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = Sample::time_to_str(self.data_time);
        if let Some(err) = &self.error {
            return write!(f, "{ts}: {err}");
        }
        match (&self.read_value, &self.write_value) {
            (Some(r), Some(w)) => write!(f, "{ts}: {r};{w} {}", self.quality.label()),
            (Some(r), None) => write!(f, "{ts}: {r} {}", self.quality.label()),
            (None, Some(w)) => write!(f, "{ts}: ;{w} {}", self.quality.label()),
            (None, None) => write!(f, "{ts}: <no value> {}", self.quality.label()),
        }
    }
}
