use crate::domain::models::{ClockTime, MediaItem, SequenceBlock, next_id};
use crate::domain::time_grid::TimeGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shape of a block without its identity or its people.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardPayload {
    pub title: String,
    pub notes: String,
    pub color: String,
    pub media: Vec<MediaItem>,
    pub duration_minutes: i64,
}

pub fn copy(block: &SequenceBlock) -> ClipboardPayload {
    ClipboardPayload {
        title: block.title.clone(),
        notes: block.notes.clone(),
        color: block.color.clone(),
        media: block.media.clone(),
        duration_minutes: block.duration_minutes(),
    }
}

/// Builds a fresh block from `payload` starting at `target_start`.
///
/// The start is snapped onto the grid and pulled back far enough for a
/// minimum-length block to fit; the end is clamped to the window.
pub fn paste(grid: &TimeGrid, payload: &ClipboardPayload, target_start: ClockTime) -> SequenceBlock {
    let start = grid
        .snap(grid.time_to_offset(target_start))
        .min(grid.latest_start())
        .max(0);
    let duration = grid
        .snap(payload.duration_minutes)
        .max(grid.min_duration_minutes());
    let end = (start + duration).min(grid.window_length());

    SequenceBlock {
        id: next_id("seq-pasted"),
        title: payload.title.clone(),
        start_time: grid.offset_to_time(start),
        end_time: grid.offset_to_time(end),
        assigned_people: BTreeSet::new(),
        notes: payload.notes.clone(),
        media: payload.media.clone(),
        color: payload.color.clone(),
    }
}
