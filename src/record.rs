//! Reading domain type and its JSON line wire form.
//!
//! A reading serializes to a single self-contained line of JSON with no
//! embedded newline bytes; the line is the atomic unit the offline queue
//! stores. Serialization is hand-formatted to pin the wire precision
//! (`value` to 4 decimal places, `temperature_c` to 2); deserialization
//! accepts any valid JSON number.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, Result};

pub const MAX_DEVICE_ID_LEN: usize = 255;

/// Characters that would break out of the JSON string literal.
const FORBIDDEN_ID_CHARS: &[char] = &['"', '\\', '\n', '\r', '\t'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Unit {
    #[serde(rename = "RI")]
    Ri,
    #[serde(rename = "Brix")]
    Brix,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Ri => "RI",
            Unit::Brix => "Brix",
        }
    }

    /// Accepted value range for readings in this unit.
    fn value_range(self) -> (f64, f64) {
        match self {
            Unit::Ri => (1.0, 2.0),
            Unit::Brix => (0.0, 100.0),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RI" => Ok(Unit::Ri),
            "Brix" => Ok(Unit::Brix),
            other => Err(Error::Invalid(format!(
                "unit must be 'RI' or 'Brix', got '{other}'"
            ))),
        }
    }
}

/// One refractometry measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,
    /// UTC instant, truncated to whole seconds on the wire.
    pub ts: OffsetDateTime,
    pub value: f64,
    pub unit: Unit,
    pub temperature_c: f64,
}

/// Wire shape for parsing queued or received lines.
#[derive(Deserialize)]
struct WireReading {
    device_id: String,
    ts: String,
    value: f64,
    unit: Unit,
    temperature_c: f64,
}

impl Reading {
    /// Build a reading stamped with the current UTC time.
    pub fn now(device_id: impl Into<String>, value: f64, unit: Unit, temperature_c: f64) -> Self {
        Self {
            device_id: device_id.into(),
            ts: truncate_to_second(OffsetDateTime::now_utc()),
            value,
            unit,
            temperature_c,
        }
    }

    /// Check field constraints. Rejected readings must never reach the
    /// queue or the network.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            return Err(Error::Invalid("device id is empty".to_string()));
        }
        if self.device_id.len() > MAX_DEVICE_ID_LEN {
            return Err(Error::Invalid(format!(
                "device id exceeds {MAX_DEVICE_ID_LEN} bytes"
            )));
        }
        if self.device_id.contains(FORBIDDEN_ID_CHARS) {
            return Err(Error::Invalid(
                "device id contains quoting or control characters".to_string(),
            ));
        }
        let (min, max) = self.unit.value_range();
        if !self.value.is_finite() || self.value < min || self.value > max {
            return Err(Error::Invalid(format!(
                "{} value {} out of range [{min}, {max}]",
                self.unit, self.value
            )));
        }
        if !self.temperature_c.is_finite()
            || self.temperature_c < -50.0
            || self.temperature_c > 150.0
        {
            return Err(Error::Invalid(format!(
                "temperature {} out of range [-50, 150]",
                self.temperature_c
            )));
        }
        Ok(())
    }

    /// Serialize to the single-line JSON wire form.
    ///
    /// Validates first: the device id interpolates into a JSON string
    /// literal, so the forbidden-character check is what keeps the output
    /// well formed.
    pub fn to_json_line(&self) -> Result<String> {
        self.validate()?;
        let ts = truncate_to_second(self.ts)
            .format(&Rfc3339)
            .map_err(|err| Error::Invalid(format!("unrepresentable timestamp: {err}")))?;
        Ok(format!(
            "{{\"device_id\":\"{}\",\"ts\":\"{}\",\"value\":{:.4},\"unit\":\"{}\",\"temperature_c\":{:.2}}}",
            self.device_id, ts, self.value, self.unit, self.temperature_c
        ))
    }

    /// Parse a wire line back into a validated reading.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let wire: WireReading = serde_json::from_str(line)
            .map_err(|err| Error::Invalid(format!("malformed reading json: {err}")))?;
        let ts = OffsetDateTime::parse(&wire.ts, &Rfc3339)
            .map_err(|err| Error::Invalid(format!("invalid timestamp '{}': {err}", wire.ts)))?;
        let reading = Self {
            device_id: wire.device_id,
            ts: truncate_to_second(ts.to_offset(UtcOffset::UTC)),
            value: wire.value,
            unit: wire.unit,
            temperature_c: wire.temperature_c,
        };
        reading.validate()?;
        Ok(reading)
    }
}

fn truncate_to_second(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_nanosecond(0).expect("0 is a valid nanosecond")
}
