use crate::domain::migration::migrate_blocks;
use crate::domain::models::SequenceBlock;
use crate::domain::time_grid::TimeGrid;
use crate::infrastructure::day_plan_repository::StoredDay;
use crate::infrastructure::event_mapper::{ImportedEvent, map_imported_events};
use chrono::NaiveDate;
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Persisted,
    Imported,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededDay {
    pub blocks: Vec<SequenceBlock>,
    pub source: SeedSource,
    /// Stored or imported entries that could not be placed on the timeline.
    pub dropped: usize,
}

pub struct SeedInput<'a> {
    pub grid: &'a TimeGrid,
    pub palette: &'a [String],
    pub timezone: Tz,
    pub date: NaiveDate,
    pub persisted: Option<StoredDay>,
    pub imported: &'a [ImportedEvent],
}

/// Puts arbitrary blocks onto the grid. Blocks that cannot intersect the
/// window are dropped; the rest are snapped, clamped and widened in place.
pub fn normalize_blocks(grid: &TimeGrid, blocks: Vec<SequenceBlock>) -> (Vec<SequenceBlock>, usize) {
    let total = blocks.len();
    let normalized = blocks
        .into_iter()
        .filter_map(|mut block| {
            let Some((start_time, end_time)) = grid.normalize_span(block.start_time, block.end_time)
            else {
                log::warn!(
                    "dropping block {} ({}-{}) outside the visible window",
                    block.id,
                    block.start_time,
                    block.end_time
                );
                return None;
            };
            if (start_time, end_time) != (block.start_time, block.end_time) {
                log::debug!(
                    "normalized block {} from {}-{} to {}-{}",
                    block.id,
                    block.start_time,
                    block.end_time,
                    start_time,
                    end_time
                );
                block.start_time = start_time;
                block.end_time = end_time;
            }
            Some(block)
        })
        .collect::<Vec<_>>();
    let dropped = total - normalized.len();
    (normalized, dropped)
}

/// Prior blocks for the day win; imported events are only used for a day
/// that has no stored block. An unreadable stored day counts as dropped and
/// falls through to the imports.
pub fn seed_day(input: SeedInput<'_>) -> SeededDay {
    let StoredDay { blocks: documents, unreadable } = input.persisted.unwrap_or_default();
    if !documents.is_empty() {
        let report = migrate_blocks(&documents);
        let (blocks, clipped) = normalize_blocks(input.grid, report.blocks);
        return SeededDay {
            blocks,
            source: SeedSource::Persisted,
            dropped: unreadable + report.dropped + clipped,
        };
    }

    if input.imported.is_empty() {
        return SeededDay {
            blocks: Vec::new(),
            source: SeedSource::Empty,
            dropped: unreadable,
        };
    }

    let blocks = map_imported_events(
        input.grid,
        input.palette,
        input.timezone,
        input.date,
        input.imported,
    );
    SeededDay {
        dropped: unreadable + input.imported.len() - blocks.len(),
        source: SeedSource::Imported,
        blocks,
    }
}
