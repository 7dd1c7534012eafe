// Telemetry sample domain model
use super::errors::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded snapshot of vehicle sensor values.
///
/// Samples are immutable and superseded wholesale by the next one; nothing
/// carries over from a previous frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Frame ordinal on the stream that produced this sample (0 = no data yet).
    pub id: u64,
    pub rpm: u32,
    pub speed: f64,
    pub temperature: f64,
    pub dtc: Option<String>,
    /// Source-side timestamp, passed through untouched.
    pub timestamp: Option<String>,
    /// Service notice attached by the source (e.g. an auto-booking confirmation).
    pub notice: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            id: 0,
            rpm: 0,
            speed: 0.0,
            temperature: 0.0,
            dtc: None,
            timestamp: None,
            notice: None,
            received_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelemetryFrame {
    rpm: u32,
    speed: f64,
    #[serde(alias = "temp")]
    temperature: f64,
    #[serde(default)]
    dtc: Option<String>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    #[serde(default, rename = "alert")]
    notice: Option<String>,
}

impl TelemetrySample {
    /// Decode one inbound JSON frame into a sample stamped with `id`.
    pub fn decode(id: u64, payload: &[u8]) -> Result<Self, DecodeError> {
        let frame: TelemetryFrame = serde_json::from_slice(payload)?;

        if !frame.speed.is_finite() || frame.speed < 0.0 {
            return Err(DecodeError::OutOfRange {
                field: "speed",
                value: frame.speed,
            });
        }
        if !frame.temperature.is_finite() {
            return Err(DecodeError::OutOfRange {
                field: "temperature",
                value: frame.temperature,
            });
        }

        Ok(Self {
            id,
            rpm: frame.rpm,
            speed: frame.speed,
            temperature: frame.temperature,
            dtc: frame.dtc.and_then(normalize_code),
            timestamp: frame.timestamp.map(|t| match t {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            notice: frame.notice.filter(|n| !n.trim().is_empty()),
            received_at: Utc::now(),
        })
    }
}

/// Sources emit `""` or `"None"` for "no active code"; fold those into `None`.
fn normalize_code(raw: String) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() || code.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(code.to_string())
    }
}
