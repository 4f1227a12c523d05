use chrono::{NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockTimeError {
    #[error("{0:?} must be HH:MM")]
    Format(String),
    #[error("{minutes} minutes is outside a single day")]
    OutOfDay { minutes: i64 },
}

/// Wall-clock time of day with minute precision, stored as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    pub fn from_hm(hour: u8, minute: u8) -> Result<Self, ClockTimeError> {
        if hour > 23 || minute > 59 {
            return Err(ClockTimeError::Format(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self(u16::from(hour) * 60 + u16::from(minute)))
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, ClockTimeError> {
        if !(0..i64::from(Self::MINUTES_PER_DAY)).contains(&minutes) {
            return Err(ClockTimeError::OutOfDay { minutes });
        }
        Ok(Self(minutes as u16))
    }

    pub fn from_naive(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn minutes_since_midnight(self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl FromStr for ClockTime {
    type Err = ClockTimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut split = trimmed.split(':');
        let (Some(hour_str), Some(minute_str), None) = (split.next(), split.next(), split.next())
        else {
            return Err(ClockTimeError::Format(value.to_string()));
        };
        if minute_str.len() != 2 || hour_str.is_empty() || hour_str.len() > 2 {
            return Err(ClockTimeError::Format(value.to_string()));
        }
        let hour = hour_str
            .parse::<u8>()
            .map_err(|_| ClockTimeError::Format(value.to_string()))?;
        let minute = minute_str
            .parse::<u8>()
            .map_err(|_| ClockTimeError::Format(value.to_string()))?;
        Self::from_hm(hour, minute).map_err(|_| ClockTimeError::Format(value.to_string()))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Unknown or missing kinds fall back to an image.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("video") => Self::Video,
            _ => Self::Image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MediaItem {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "media.id")?;
        validate_non_empty(&self.url, "media.url")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SequenceBlock {
    pub id: String,
    pub title: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default)]
    pub assigned_people: BTreeSet<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub color: String,
}

impl SequenceBlock {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        if self.end_time <= self.start_time {
            return Err("block.end_time must be after block.start_time".to_string());
        }
        for item in &self.media {
            item.validate()?;
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end_time.minutes_since_midnight() - self.start_time.minutes_since_midnight()
    }

    /// Half-open `[start, end)` intersection; back-to-back blocks do not overlap.
    pub fn overlaps(&self, other: &SequenceBlock) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn has_person(&self, person_id: &str) -> bool {
        self.assigned_people.contains(person_id)
    }
}

/// Partial update for a block; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub title: Option<String>,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub assigned_people: Option<BTreeSet<String>>,
    pub notes: Option<String>,
    pub media: Option<Vec<MediaItem>>,
    pub color: Option<String>,
}

impl BlockPatch {
    pub fn times(start_time: ClockTime, end_time: ClockTime) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(self, block: &mut SequenceBlock) {
        if let Some(title) = self.title {
            block.title = title;
        }
        if let Some(start_time) = self.start_time {
            block.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            block.end_time = end_time;
        }
        if let Some(assigned_people) = self.assigned_people {
            block.assigned_people = assigned_people;
        }
        if let Some(notes) = self.notes {
            block.notes = notes;
        }
        if let Some(media) = self.media {
            block.media = media;
        }
        if let Some(color) = self.color {
            block.color = color;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub person_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreateExtent {
    /// The draft's end follows the pointer, never shorter than the minimum duration.
    #[default]
    TrackPointer,
    /// The draft starts at the minimum duration and grows by the pointer delta.
    MinimumPlusDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    pub window_start: ClockTime,
    pub window_end: ClockTime,
    pub pixels_per_minute: f64,
    pub quantization_step_minutes: u32,
    pub min_block_duration_minutes: u32,
    pub creation_threshold_pixels: f64,
    #[serde(default)]
    pub create_extent: CreateExtent,
    pub new_block_title: String,
    pub new_block_color: String,
    pub default_paste_time: ClockTime,
    pub import_palette: Vec<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            window_start: ClockTime(8 * 60),
            window_end: ClockTime(20 * 60),
            pixels_per_minute: 2.0,
            quantization_step_minutes: 5,
            min_block_duration_minutes: 15,
            creation_threshold_pixels: 10.0,
            create_extent: CreateExtent::TrackPointer,
            new_block_title: "New group".to_string(),
            new_block_color: "gray".to_string(),
            default_paste_time: ClockTime(10 * 60),
            import_palette: vec![
                "amber".to_string(),
                "violet".to_string(),
                "pink".to_string(),
                "blue".to_string(),
            ],
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_end <= self.window_start {
            return Err("timeline.window_end must be after timeline.window_start".to_string());
        }
        if !(self.pixels_per_minute.is_finite() && self.pixels_per_minute > 0.0) {
            return Err("timeline.pixels_per_minute must be > 0".to_string());
        }
        if self.quantization_step_minutes == 0 {
            return Err("timeline.quantization_step_minutes must be > 0".to_string());
        }
        let window_minutes =
            self.window_end.minutes_since_midnight() - self.window_start.minutes_since_midnight();
        if window_minutes % i64::from(self.quantization_step_minutes) != 0 {
            return Err(
                "timeline window length must be a multiple of quantization_step_minutes"
                    .to_string(),
            );
        }
        if self.min_block_duration_minutes == 0
            || self.min_block_duration_minutes % self.quantization_step_minutes != 0
        {
            return Err(
                "timeline.min_block_duration_minutes must be a positive multiple of the step"
                    .to_string(),
            );
        }
        if i64::from(self.min_block_duration_minutes) > window_minutes {
            return Err(
                "timeline.min_block_duration_minutes must fit inside the window".to_string(),
            );
        }
        if !(self.creation_threshold_pixels.is_finite() && self.creation_threshold_pixels >= 0.0) {
            return Err("timeline.creation_threshold_pixels must be >= 0".to_string());
        }
        validate_non_empty(&self.new_block_title, "timeline.new_block_title")?;
        if self.import_palette.is_empty() {
            return Err("timeline.import_palette must not be empty".to_string());
        }
        for color in &self.import_palette {
            validate_non_empty(color, "timeline.import_palette[]")?;
        }
        Ok(())
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn time(value: &str) -> ClockTime {
        value.parse().expect("valid clock time")
    }

    fn sample_block() -> SequenceBlock {
        SequenceBlock {
            id: "seq-1".to_string(),
            title: "Serve drill".to_string(),
            start_time: time("10:00"),
            end_time: time("11:00"),
            assigned_people: BTreeSet::from(["p1".to_string()]),
            notes: "float serves only".to_string(),
            media: vec![MediaItem {
                id: "m-1".to_string(),
                url: "https://cdn.example/serve.mp4".to_string(),
                kind: MediaKind::Video,
                note: Some("watch the toss".to_string()),
            }],
            color: "amber".to_string(),
        }
    }

    #[test]
    fn clock_time_parses_and_formats_hhmm() {
        assert_eq!(time("08:05").to_string(), "08:05");
        assert_eq!(time("8:05").to_string(), "08:05");
        assert_eq!(time("23:59").minutes_since_midnight(), 23 * 60 + 59);
    }

    #[test]
    fn clock_time_rejects_malformed_values() {
        for raw in ["", "24:00", "12:60", "12", "12:5", "12:00:00", "ab:cd"] {
            assert!(raw.parse::<ClockTime>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn block_validate_rejects_inverted_range() {
        let mut block = sample_block();
        assert!(block.validate().is_ok());
        block.end_time = block.start_time;
        assert!(block.validate().is_err());
    }

    #[test]
    fn overlap_is_half_open() {
        let first = sample_block();
        let mut second = sample_block();
        second.start_time = time("11:00");
        second.end_time = time("11:30");
        assert!(!first.overlaps(&second));
        second.start_time = time("10:55");
        assert!(first.overlaps(&second));
        assert!(second.overlaps(&first));
    }

    #[test]
    fn empty_patch_leaves_block_untouched() {
        let mut block = sample_block();
        let before = block.clone();
        let patch = BlockPatch::default();
        assert!(patch.is_empty());
        patch.apply_to(&mut block);
        assert_eq!(block, before);
    }

    #[test]
    fn block_serializes_times_as_hhmm_strings() {
        let block = sample_block();
        let value = serde_json::to_value(&block).expect("serialize block");
        assert_eq!(value["startTime"], "10:00");
        assert_eq!(value["endTime"], "11:00");
        assert_eq!(value["assignedPeople"], serde_json::json!(["p1"]));
        assert_eq!(value["media"][0]["kind"], "video");

        let roundtrip: SequenceBlock = serde_json::from_value(value).expect("deserialize block");
        assert_eq!(roundtrip, block);
    }

    #[test]
    fn default_timeline_config_is_valid() {
        assert!(TimelineConfig::default().validate().is_ok());
    }

    #[test]
    fn timeline_config_rejects_misaligned_minimum() {
        let config = TimelineConfig {
            min_block_duration_minutes: 12,
            ..TimelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    proptest! {
        #[test]
        fn clock_time_display_parse_roundtrip(hour in 0u8..24, minute in 0u8..60) {
            let value = ClockTime::from_hm(hour, minute).expect("valid time");
            let parsed: ClockTime = value.to_string().parse().expect("reparse");
            prop_assert_eq!(parsed, value);
        }
    }
}
