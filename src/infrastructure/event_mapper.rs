use crate::domain::models::{ClockTime, SequenceBlock};
use crate::domain::time_grid::TimeGrid;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;

/// A calendar event handed over by the import collaborator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedEvent {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn parse_imported_events(raw: &str) -> Result<Vec<ImportedEvent>, InfraError> {
    let events: Vec<ImportedEvent> = serde_json::from_str(raw)?;
    for event in &events {
        if event.id.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "imported event id must not be empty".to_string(),
            ));
        }
    }
    Ok(events)
}

pub fn imported_block_id(event_id: &str, index: usize) -> String {
    format!("seq-imported-{}-{index}", event_id.trim())
}

/// Wall-clock span of `event` on `date` in `timezone`, cut at midnight on
/// either side. `None` when the event does not touch that day.
fn local_span(event: &ImportedEvent, date: NaiveDate, timezone: Tz) -> Option<(ClockTime, ClockTime)> {
    let start = event.start.with_timezone(&timezone).naive_local();
    let end = event.end.with_timezone(&timezone).naive_local();
    if end <= start || start.date() > date || end.date() < date {
        return None;
    }
    let start_time = if start.date() < date {
        ClockTime::from_minutes(0).ok()?
    } else {
        ClockTime::from_naive(start.time())
    };
    let end_time = if end.date() > date {
        ClockTime::from_minutes(i64::from(ClockTime::MINUTES_PER_DAY) - 1).ok()?
    } else {
        ClockTime::from_naive(end.time())
    };
    Some((start_time, end_time))
}

/// One default block per imported event that intersects the visible window:
/// no people, empty notes, no media and a color rotating through `palette`.
pub fn map_imported_events(
    grid: &TimeGrid,
    palette: &[String],
    timezone: Tz,
    date: NaiveDate,
    events: &[ImportedEvent],
) -> Vec<SequenceBlock> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            let Some((start_time, end_time)) = local_span(event, date, timezone)
                .and_then(|(start, end)| grid.normalize_span(start, end))
            else {
                log::debug!("skipping imported event {} outside the window", event.id);
                return None;
            };
            let color = if palette.is_empty() {
                String::new()
            } else {
                palette[index % palette.len()].clone()
            };
            Some(SequenceBlock {
                id: imported_block_id(&event.id, index),
                title: event.title.trim().to_string(),
                start_time,
                end_time,
                assigned_people: BTreeSet::new(),
                notes: String::new(),
                media: Vec::new(),
                color,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn event(id: &str, start: &str, end: &str) -> ImportedEvent {
        ImportedEvent {
            id: id.to_string(),
            title: format!("Event {id}"),
            start: utc(start),
            end: utc(end),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
    }

    fn palette() -> Vec<String> {
        ["amber", "violet"].iter().map(|color| color.to_string()).collect()
    }

    fn time(value: &str) -> ClockTime {
        value.parse().expect("valid clock time")
    }

    #[test]
    fn events_become_default_blocks_with_rotating_colors() {
        let events = vec![
            event("e1", "2025-03-14T09:00:00Z", "2025-03-14T10:00:00Z"),
            event("e2", "2025-03-14T10:00:00Z", "2025-03-14T10:30:00Z"),
            event("e3", "2025-03-14T11:00:00Z", "2025-03-14T12:00:00Z"),
        ];
        let blocks = map_imported_events(&TimeGrid::default(), &palette(), Tz::UTC, date(), &events);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].id, "seq-imported-e1-0");
        assert_eq!(blocks[0].title, "Event e1");
        assert_eq!(blocks[0].start_time, time("09:00"));
        assert_eq!(blocks[0].end_time, time("10:00"));
        assert!(blocks[0].assigned_people.is_empty());
        let colors = blocks.iter().map(|block| block.color.as_str()).collect::<Vec<_>>();
        assert_eq!(colors, vec!["amber", "violet", "amber"]);
    }

    #[test]
    fn times_are_converted_to_the_team_timezone() {
        let events = vec![event("e1", "2025-03-14T08:00:00Z", "2025-03-14T09:00:00Z")];
        let blocks = map_imported_events(
            &TimeGrid::default(),
            &palette(),
            Tz::Europe__Paris,
            date(),
            &events,
        );
        assert_eq!(blocks[0].start_time, time("09:00"));
        assert_eq!(blocks[0].end_time, time("10:00"));
    }

    #[test]
    fn events_are_normalized_or_skipped() {
        let events = vec![
            event("early", "2025-03-14T06:00:00Z", "2025-03-14T07:30:00Z"),
            event("edge", "2025-03-14T07:30:00Z", "2025-03-14T08:20:00Z"),
            event("short", "2025-03-14T12:02:00Z", "2025-03-14T12:07:00Z"),
            event("other-day", "2025-03-15T09:00:00Z", "2025-03-15T10:00:00Z"),
            event("overnight", "2025-03-14T19:30:00Z", "2025-03-15T02:00:00Z"),
        ];
        let blocks = map_imported_events(&TimeGrid::default(), &palette(), Tz::UTC, date(), &events);
        let spans = blocks
            .iter()
            .map(|block| (block.id.as_str(), block.start_time.to_string(), block.end_time.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            spans,
            vec![
                ("seq-imported-edge-1", "08:00".to_string(), "08:20".to_string()),
                ("seq-imported-short-2", "12:00".to_string(), "12:15".to_string()),
                ("seq-imported-overnight-4", "19:30".to_string(), "20:00".to_string()),
            ]
        );
    }

    #[test]
    fn parse_rejects_blank_ids_and_bad_timestamps() {
        let valid = r#"[{"id":"e1","title":"Match","start":"2025-03-14T09:00:00Z","end":"2025-03-14T11:00:00Z"}]"#;
        assert_eq!(parse_imported_events(valid).expect("parse").len(), 1);

        let blank = r#"[{"id":" ","start":"2025-03-14T09:00:00Z","end":"2025-03-14T11:00:00Z"}]"#;
        assert!(parse_imported_events(blank).is_err());

        let invalid = r#"[{"id":"e1","start":"invalid-timestamp","end":"2025-03-14T11:00:00Z"}]"#;
        assert!(matches!(parse_imported_events(invalid), Err(InfraError::Json(_))));
    }
}
