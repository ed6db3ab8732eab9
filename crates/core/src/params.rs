//! Generation parameter snapshot.
//!
//! Captures what the user configured before requesting a mosaic: the date
//! range, a day-of-week filter, an optional time-of-day window, the
//! aggregation pitch, and the speed color legend. The job engine forwards
//! the snapshot to the backend as JSON and never inspects it further.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Aggregation pitch
// ---------------------------------------------------------------------------

/// Width of one aggregation bucket on the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum TimePitch {
    Min15,
    Min30,
    #[default]
    Min60,
}

/// All valid pitches in minutes.
pub const VALID_TIME_PITCHES: &[u32] = &[15, 30, 60];

impl TimePitch {
    pub fn minutes(self) -> u32 {
        match self {
            TimePitch::Min15 => 15,
            TimePitch::Min30 => 30,
            TimePitch::Min60 => 60,
        }
    }
}

impl From<TimePitch> for u32 {
    fn from(pitch: TimePitch) -> Self {
        pitch.minutes()
    }
}

impl TryFrom<u32> for TimePitch {
    type Error = CoreError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            15 => Ok(TimePitch::Min15),
            30 => Ok(TimePitch::Min30),
            60 => Ok(TimePitch::Min60),
            other => Err(CoreError::Validation(format!(
                "Invalid time pitch {other}. Must be one of: 15, 30, 60"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Time window and legend
// ---------------------------------------------------------------------------

/// Time-of-day window applied to every selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One color band: speeds at or above `min_speed_kmh` (up to the next
/// band) are drawn in `color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendBand {
    pub min_speed_kmh: f64,
    /// `#RRGGBB`
    pub color: String,
}

impl LegendBand {
    pub fn new(min_speed_kmh: f64, color: impl Into<String>) -> Self {
        Self {
            min_speed_kmh,
            color: color.into(),
        }
    }
}

/// Red through green, 20 km/h apart.
pub fn default_legend() -> Vec<LegendBand> {
    vec![
        LegendBand::new(0.0, "#D7191C"),
        LegendBand::new(20.0, "#FDAE61"),
        LegendBand::new(40.0, "#FFFFBF"),
        LegendBand::new(60.0, "#1A9641"),
    ]
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Parameters captured at the moment a generation request is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub start_date: NaiveDate,
    /// Inclusive; `None` selects only `start_date`.
    pub end_date: Option<NaiveDate>,
    /// Empty means every day of the week.
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    pub time_window: Option<TimeWindow>,
    pub time_pitch: TimePitch,
    pub legend: Vec<LegendBand>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            start_date: Utc::now().date_naive(),
            end_date: None,
            days_of_week: Vec::new(),
            time_window: None,
            time_pitch: TimePitch::default(),
            legend: default_legend(),
        }
    }
}

/// Wire form: the snapshot plus the `date_str` label the backend renders.
#[derive(Serialize)]
struct ParamsPayload<'a> {
    #[serde(flatten)]
    params: &'a GenerationParams,
    date_str: String,
}

impl GenerationParams {
    /// Human-readable date label, `YYYY-MM-DD` or `YYYY-MM-DD/YYYY-MM-DD`.
    pub fn date_label(&self) -> String {
        match self.end_date {
            Some(end) if end != self.start_date => format!("{}/{}", self.start_date, end),
            _ => self.start_date.to_string(),
        }
    }

    /// Check the snapshot is internally consistent.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(CoreError::Validation(format!(
                    "end_date {end} is before start_date {}",
                    self.start_date
                )));
            }
        }
        if let Some(window) = self.time_window {
            if window.start >= window.end {
                return Err(CoreError::Validation(format!(
                    "time window start {} must be before end {}",
                    window.start, window.end
                )));
            }
        }
        validate_legend(&self.legend)
    }

    /// JSON body for the `params` field of a generation request.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(ParamsPayload {
            params: self,
            date_str: self.date_label(),
        })
    }
}

/// Validate a legend: non-empty, non-negative strictly increasing
/// thresholds, `#RRGGBB` colors.
pub fn validate_legend(legend: &[LegendBand]) -> Result<(), CoreError> {
    if legend.is_empty() {
        return Err(CoreError::Validation("Legend must have at least one band".to_string()));
    }
    let mut previous: Option<f64> = None;
    for band in legend {
        if !band.min_speed_kmh.is_finite() || band.min_speed_kmh < 0.0 {
            return Err(CoreError::Validation(format!(
                "Invalid legend threshold {}",
                band.min_speed_kmh
            )));
        }
        if previous.is_some_and(|prev| band.min_speed_kmh <= prev) {
            return Err(CoreError::Validation(
                "Legend thresholds must be strictly increasing".to_string(),
            ));
        }
        if !HEX_COLOR_RE.is_match(&band.color) {
            return Err(CoreError::Validation(format!(
                "Invalid legend color '{}'. Expected #RRGGBB",
                band.color
            )));
        }
        previous = Some(band.min_speed_kmh);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params() -> GenerationParams {
        GenerationParams {
            start_date: date(2024, 4, 1),
            ..Default::default()
        }
    }

    #[test]
    fn default_params_are_valid() {
        assert!(GenerationParams::default().validate().is_ok());
    }

    #[test]
    fn end_before_start_rejected() {
        let p = GenerationParams {
            end_date: Some(date(2024, 3, 1)),
            ..params()
        };
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn inverted_time_window_rejected() {
        let p = GenerationParams {
            time_window: Some(TimeWindow {
                start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            }),
            ..params()
        };
        assert_matches!(p.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn legend_rules() {
        assert!(validate_legend(&default_legend()).is_ok());
        assert!(validate_legend(&[]).is_err());
        assert!(validate_legend(&[LegendBand::new(0.0, "red")]).is_err());
        assert!(validate_legend(&[
            LegendBand::new(10.0, "#000000"),
            LegendBand::new(10.0, "#FFFFFF"),
        ])
        .is_err());
        assert!(validate_legend(&[LegendBand::new(-1.0, "#000000")]).is_err());
    }

    #[test]
    fn pitch_round_trips_through_minutes() {
        assert_eq!(TimePitch::try_from(30).unwrap(), TimePitch::Min30);
        assert_matches!(TimePitch::try_from(45), Err(CoreError::Validation(_)));
        assert_eq!(serde_json::to_value(TimePitch::Min15).unwrap(), 15);
    }

    #[test]
    fn payload_carries_date_str_and_pitch() {
        let p = GenerationParams {
            end_date: Some(date(2024, 4, 30)),
            days_of_week: vec![Weekday::Mon, Weekday::Tue],
            time_pitch: TimePitch::Min30,
            ..params()
        };
        let payload = p.to_payload().unwrap();
        assert_eq!(payload["date_str"], "2024-04-01/2024-04-30");
        assert_eq!(payload["time_pitch"], 30);
        assert_eq!(payload["start_date"], "2024-04-01");
        assert_eq!(payload["days_of_week"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn single_day_label() {
        let p = GenerationParams {
            end_date: Some(date(2024, 4, 1)),
            ..params()
        };
        assert_eq!(p.date_label(), "2024-04-01");
    }
}
