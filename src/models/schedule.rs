// Schedules and their office-hours timers

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// What a schedule's `target` names; serializes to lowercase JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Container,
    Group,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Container => f.write_str("container"),
            TargetType::Group => f.write_str("group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub target: String,
    pub target_type: TargetType,
    #[serde(default)]
    pub timers: Vec<Timer>,
}

impl Schedule {
    pub fn targets(&self, target_type: TargetType, name: &str) -> bool {
        self.target_type == target_type && self.target == name
    }
}

/// Daily window `[startTime, stopTime)` on the listed weekdays (0 = Sunday).
/// A stop time at or before the start time means the window runs past midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub start_time: String,
    pub stop_time: String,
    #[serde(default)]
    pub days: Vec<i64>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Timer {
    pub fn is_active(&self) -> bool {
        self.active == Some(true)
    }

    pub fn runs_on(&self, weekday_from_sunday: u32) -> bool {
        self.days.iter().any(|d| *d == i64::from(weekday_from_sunday))
    }

    /// Both clock times, or `None` if either is not `HH:MM`.
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_clock(&self.start_time)?, parse_clock(&self.stop_time)?))
    }
}

/// Parses a strict `HH:MM` 24-hour clock string.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}
