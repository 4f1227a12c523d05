//! Side-by-side column assignment for blocks that share time.
//!
//! Each block is sized against its own direct neighbours only (the blocks
//! whose interval intersects its own), not against the transitive chain of
//! overlaps. Two blocks that both touch a middle block without touching each
//! other can therefore end up with column counts the middle block does not
//! share.

use crate::domain::interaction::DraftBlock;
use crate::domain::models::SequenceBlock;
use crate::domain::time_grid::TimeGrid;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSlot {
    pub column_index: usize,
    pub column_count: usize,
}

impl ColumnSlot {
    pub const FULL_WIDTH: ColumnSlot = ColumnSlot {
        column_index: 0,
        column_count: 1,
    };

    pub fn width_percent(&self) -> f64 {
        100.0 / self.column_count.max(1) as f64
    }

    pub fn left_percent(&self) -> f64 {
        self.column_index as f64 * self.width_percent()
    }
}

/// Start ascending, then the longer block first, then id for identical spans.
fn cluster_order(left: &SequenceBlock, right: &SequenceBlock) -> Ordering {
    left.start_time
        .cmp(&right.start_time)
        .then_with(|| right.end_time.cmp(&left.end_time))
        .then_with(|| left.id.cmp(&right.id))
}

/// The blocks concurrent with `block`, itself included, in column order.
pub fn concurrency_cluster<'a>(
    blocks: &'a [SequenceBlock],
    block: &SequenceBlock,
) -> Vec<&'a SequenceBlock> {
    let mut cluster = blocks
        .iter()
        .filter(|candidate| candidate.id == block.id || candidate.overlaps(block))
        .collect::<Vec<_>>();
    cluster.sort_by(|left, right| cluster_order(left, right));
    cluster
}

pub fn layout(blocks: &[SequenceBlock]) -> HashMap<String, ColumnSlot> {
    blocks
        .iter()
        .map(|block| {
            let cluster = concurrency_cluster(blocks, block);
            let column_index = cluster
                .iter()
                .position(|candidate| candidate.id == block.id)
                .unwrap_or(0);
            (
                block.id.clone(),
                ColumnSlot {
                    column_index,
                    column_count: cluster.len().max(1),
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementTarget {
    Block(String),
    Draft,
}

/// Render geometry for one entry on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPlacement {
    pub target: PlacementTarget,
    pub top_px: f64,
    pub height_px: f64,
    pub left_percent: f64,
    pub width_percent: f64,
    pub on_top: bool,
}

pub fn place_blocks(
    grid: &TimeGrid,
    blocks: &[SequenceBlock],
    draft: Option<&DraftBlock>,
) -> Vec<BlockPlacement> {
    let slots = layout(blocks);
    let mut placements = blocks
        .iter()
        .map(|block| {
            let slot = slots.get(&block.id).copied().unwrap_or(ColumnSlot::FULL_WIDTH);
            let start = grid.time_to_offset(block.start_time);
            BlockPlacement {
                target: PlacementTarget::Block(block.id.clone()),
                top_px: grid.minutes_to_pixels(start),
                height_px: grid.minutes_to_pixels(block.duration_minutes()),
                left_percent: slot.left_percent(),
                width_percent: slot.width_percent(),
                on_top: false,
            }
        })
        .collect::<Vec<_>>();

    if let Some(draft) = draft {
        placements.push(BlockPlacement {
            target: PlacementTarget::Draft,
            top_px: grid.minutes_to_pixels(draft.start_offset),
            height_px: grid.minutes_to_pixels(draft.end_offset - draft.start_offset),
            left_percent: 0.0,
            width_percent: 100.0,
            on_top: true,
        });
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ClockTime;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn block(id: &str, start: &str, end: &str) -> SequenceBlock {
        SequenceBlock {
            id: id.to_string(),
            title: id.to_uppercase(),
            start_time: start.parse::<ClockTime>().expect("start"),
            end_time: end.parse::<ClockTime>().expect("end"),
            assigned_people: BTreeSet::new(),
            notes: String::new(),
            media: Vec::new(),
            color: String::new(),
        }
    }

    #[test]
    fn isolated_block_is_full_width() {
        let slots = layout(&[block("a", "09:00", "10:00")]);
        assert_eq!(slots["a"], ColumnSlot::FULL_WIDTH);
        assert_eq!(slots["a"].width_percent(), 100.0);
    }

    #[test]
    fn back_to_back_blocks_are_not_concurrent() {
        let slots = layout(&[block("a", "09:00", "10:00"), block("b", "10:00", "11:00")]);
        assert_eq!(slots["a"].column_count, 1);
        assert_eq!(slots["b"].column_count, 1);
    }

    #[test]
    fn identical_spans_split_into_equal_columns() {
        let blocks = vec![
            block("c", "14:00", "15:00"),
            block("a", "14:00", "15:00"),
            block("b", "14:00", "15:00"),
        ];
        let slots = layout(&blocks);
        for (id, expected_index) in [("a", 0), ("b", 1), ("c", 2)] {
            assert_eq!(slots[id].column_count, 3);
            assert_eq!(slots[id].column_index, expected_index);
            assert!((slots[id].width_percent() - 100.0 / 3.0).abs() < 1e-9);
        }
        let total: f64 = slots.values().map(ColumnSlot::width_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn earlier_start_and_longer_block_take_left_columns() {
        let blocks = vec![
            block("short", "10:00", "10:30"),
            block("long", "10:00", "11:30"),
            block("late", "10:15", "10:45"),
        ];
        let slots = layout(&blocks);
        assert_eq!(slots["long"].column_index, 0);
        assert_eq!(slots["short"].column_index, 1);
        assert_eq!(slots["late"].column_index, 2);
    }

    #[test]
    fn neighbourhoods_are_not_transitive() {
        let blocks = vec![
            block("a", "10:00", "11:00"),
            block("b", "10:30", "11:30"),
            block("c", "11:15", "12:00"),
        ];
        let slots = layout(&blocks);
        assert_eq!(slots["a"], ColumnSlot { column_index: 0, column_count: 2 });
        assert_eq!(slots["b"], ColumnSlot { column_index: 1, column_count: 3 });
        assert_eq!(slots["c"], ColumnSlot { column_index: 1, column_count: 2 });
    }

    #[test]
    fn draft_is_placed_full_width_on_top() {
        let grid = TimeGrid::default();
        let blocks = vec![block("a", "09:00", "10:00"), block("b", "09:00", "10:00")];
        let draft = DraftBlock {
            start_offset: 60,
            end_offset: 75,
        };
        let placements = place_blocks(&grid, &blocks, Some(&draft));
        assert_eq!(placements.len(), 3);
        assert_eq!(placements[0].top_px, 120.0);
        assert_eq!(placements[0].height_px, 120.0);
        assert_eq!(placements[1].left_percent, 50.0);

        let draft_placement = placements.last().expect("draft placement");
        assert_eq!(draft_placement.target, PlacementTarget::Draft);
        assert_eq!(draft_placement.width_percent, 100.0);
        assert_eq!(draft_placement.height_px, 30.0);
        assert!(draft_placement.on_top);
    }

    proptest! {
        #[test]
        fn layout_ignores_input_order(
            spans in prop::collection::vec((0i64..140, 3i64..30), 1..10),
            rotation in 0usize..10,
        ) {
            let blocks = spans
                .iter()
                .enumerate()
                .map(|(index, (start_step, length_steps))| {
                    let start = 8 * 60 + start_step * 5;
                    let end = (start + length_steps * 5).min(20 * 60);
                    SequenceBlock {
                        start_time: ClockTime::from_minutes(start).expect("start"),
                        end_time: ClockTime::from_minutes(end).expect("end"),
                        ..block(&format!("b{index}"), "08:00", "08:15")
                    }
                })
                .filter(|candidate| candidate.start_time < candidate.end_time)
                .collect::<Vec<_>>();
            let mut rotated = blocks.clone();
            if !rotated.is_empty() {
                let by = rotation % rotated.len();
                rotated.rotate_left(by);
            }
            prop_assert_eq!(layout(&blocks), layout(&rotated));

            let slots = layout(&blocks);
            for candidate in &blocks {
                let cluster = concurrency_cluster(&blocks, candidate);
                for (position, member) in cluster.iter().enumerate() {
                    if member.id != candidate.id {
                        prop_assert!(member.overlaps(candidate));
                    } else {
                        prop_assert_eq!(slots[&member.id].column_index, position);
                    }
                }
                let slot = slots[&candidate.id];
                prop_assert!(slot.column_index < slot.column_count);
                let widths = slot.width_percent() * slot.column_count as f64;
                prop_assert!((widths - 100.0).abs() < 1e-9);
            }
        }
    }
}
