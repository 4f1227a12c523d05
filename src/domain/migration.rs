//! One-shot upgrade of stored block documents to the current shape.
//!
//! Three stored shapes exist:
//!
//! - single media: a `mediaUrl` / `mediaType` pair and no `media` list,
//! - flattened media: parallel `mediaUrls` / `mediaIds` / `mediaTypes` arrays,
//! - current: a `media` list of `{id, url, kind, note}` objects.
//!
//! Older documents also name the people field `playerIds`. Fields that cannot
//! be migrated are dropped; a block is dropped only when its times are
//! unusable. Nothing here returns an error.

use crate::domain::models::{ClockTime, MediaItem, MediaKind, SequenceBlock, next_id};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredShape {
    SingleMedia,
    FlattenedMedia,
    Current,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub blocks: Vec<SequenceBlock>,
    /// Blocks that were read from a legacy shape.
    pub upgraded: usize,
    pub dropped: usize,
}

pub fn detect_shape(raw: &Value) -> StoredShape {
    let has_items = |key: &str| {
        raw.get(key)
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty())
    };
    if has_items("media") {
        return StoredShape::Current;
    }
    if has_items("mediaUrls") {
        return StoredShape::FlattenedMedia;
    }
    if non_empty_str(raw.get("mediaUrl")).is_some() {
        return StoredShape::SingleMedia;
    }
    StoredShape::Current
}

pub fn migrate_block(raw: &Value) -> Option<SequenceBlock> {
    let Some(object) = raw.as_object() else {
        log::warn!("dropping stored block that is not an object");
        return None;
    };

    let start_time = parse_time(object, "startTime");
    let end_time = parse_time(object, "endTime");
    let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
        log::warn!("dropping stored block without usable times: {raw}");
        return None;
    };
    if end_time <= start_time {
        log::warn!("dropping stored block ending before it starts: {raw}");
        return None;
    }

    let media = match detect_shape(raw) {
        StoredShape::Current => current_media(object),
        StoredShape::FlattenedMedia => flattened_media(object),
        StoredShape::SingleMedia => single_media(object),
    };

    Some(SequenceBlock {
        id: non_empty_str(object.get("id"))
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| next_id("seq-migrated")),
        title: string_field(object, "title"),
        start_time,
        end_time,
        assigned_people: people(object),
        notes: string_field(object, "notes"),
        media,
        color: string_field(object, "color"),
    })
}

pub fn migrate_blocks(raws: &[Value]) -> MigrationReport {
    let mut report = MigrationReport::default();
    for raw in raws {
        let legacy = detect_shape(raw) != StoredShape::Current || raw.get("playerIds").is_some();
        match migrate_block(raw) {
            Some(block) => {
                if legacy {
                    report.upgraded += 1;
                }
                report.blocks.push(block);
            }
            None => report.dropped += 1,
        }
    }
    if report.upgraded > 0 || report.dropped > 0 {
        log::debug!(
            "migrated stored blocks: kept={} upgraded={} dropped={}",
            report.blocks.len(),
            report.upgraded,
            report.dropped
        );
    }
    report
}

fn parse_time(object: &Map<String, Value>, key: &str) -> Option<ClockTime> {
    object
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<ClockTime>().ok())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn people(object: &Map<String, Value>) -> BTreeSet<String> {
    let list = object
        .get("assignedPeople")
        .or_else(|| object.get("playerIds"))
        .and_then(Value::as_array);
    list.into_iter()
        .flatten()
        .filter_map(|entry| non_empty_str(Some(entry)))
        .map(ToOwned::to_owned)
        .collect()
}

fn current_media(object: &Map<String, Value>) -> Vec<MediaItem> {
    let Some(items) = object.get("media").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let Some(url) = non_empty_str(item.get("url")) else {
                log::warn!("dropping media entry without url at index {index}");
                return None;
            };
            let kind = item
                .get("kind")
                .or_else(|| item.get("type"))
                .and_then(Value::as_str);
            let note = item
                .get("note")
                .or_else(|| item.get("notes"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);
            Some(MediaItem {
                id: non_empty_str(item.get("id"))
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| next_id("migrated")),
                url: url.to_string(),
                kind: MediaKind::parse_lenient(kind),
                note,
            })
        })
        .collect()
}

fn flattened_media(object: &Map<String, Value>) -> Vec<MediaItem> {
    let column = |key: &str| object.get(key).and_then(Value::as_array);
    let Some(urls) = column("mediaUrls") else {
        return Vec::new();
    };
    let ids = column("mediaIds");
    let kinds = column("mediaTypes");

    urls.iter()
        .enumerate()
        .filter_map(|(index, url)| {
            let url = non_empty_str(Some(url))?;
            let id = ids
                .and_then(|ids| non_empty_str(ids.get(index)))
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| next_id("migrated"));
            let kind = kinds
                .and_then(|kinds| kinds.get(index))
                .and_then(Value::as_str);
            Some(MediaItem {
                id,
                url: url.to_string(),
                kind: MediaKind::parse_lenient(kind),
                note: None,
            })
        })
        .collect()
}

fn single_media(object: &Map<String, Value>) -> Vec<MediaItem> {
    let Some(url) = non_empty_str(object.get("mediaUrl")) else {
        return Vec::new();
    };
    vec![MediaItem {
        id: next_id("migrated"),
        url: url.to_string(),
        kind: MediaKind::parse_lenient(object.get("mediaType").and_then(Value::as_str)),
        note: None,
    }]
}
