//! Pointer-driven editing of the day timeline.
//!
//! A gesture is one of three tagged states (move, resize, create) and always
//! ends on pointer-up or when the pointer leaves the grid. Every write to the
//! store goes through the grid's quantization and clamping, so the machine
//! never produces a block outside the window or below the minimum duration.

use crate::domain::models::{BlockPatch, CreateExtent, SequenceBlock, TimelineConfig, next_id};
use crate::domain::store::SequenceBlockStore;
use crate::domain::time_grid::TimeGrid;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    BlockBody(String),
    ResizeHandle(String),
    EmptyGrid,
}

/// Pointer positions are vertical pixel coordinates in grid content space.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down { y: f64, target: PointerTarget },
    Move { y: f64 },
    Up,
    Leave,
}

/// Not-yet-committed block shown while a create-drag is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftBlock {
    pub start_offset: i64,
    pub end_offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Moving {
        block_id: String,
        drag_start_y: f64,
        original_start: i64,
    },
    Resizing {
        block_id: String,
        drag_start_y: f64,
        original_duration: i64,
    },
    Creating {
        start_y: f64,
        start_offset: i64,
        draft: Option<DraftBlock>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    Ignored,
    /// `block_id` is `None` when the press landed on empty grid space.
    GestureStarted { block_id: Option<String> },
    BlockChanged(String),
    DraftChanged(DraftBlock),
    BlockCreated(String),
    GestureEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSettings {
    pub creation_threshold_px: f64,
    pub create_extent: CreateExtent,
    pub new_block_title: String,
    pub new_block_color: String,
}

impl InteractionSettings {
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            creation_threshold_px: config.creation_threshold_pixels,
            create_extent: config.create_extent,
            new_block_title: config.new_block_title.clone(),
            new_block_color: config.new_block_color.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionMachine {
    grid: TimeGrid,
    settings: InteractionSettings,
    state: InteractionState,
}

impl InteractionMachine {
    pub fn new(grid: TimeGrid, settings: InteractionSettings) -> Self {
        Self {
            grid,
            settings,
            state: InteractionState::Idle,
        }
    }

    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(
            TimeGrid::from_config(config),
            InteractionSettings::from_config(config),
        )
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn draft(&self) -> Option<&DraftBlock> {
        match &self.state {
            InteractionState::Creating {
                draft: Some(draft), ..
            } => Some(draft),
            _ => None,
        }
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        store: &mut SequenceBlockStore,
    ) -> InteractionOutcome {
        match event {
            PointerEvent::Down { y, target } => {
                // A press that arrives mid-gesture means the release was
                // missed; close the previous gesture before starting anew.
                if !self.is_idle() {
                    self.release(store);
                }
                self.press(y, target, store)
            }
            PointerEvent::Move { y } => self.drag(y, store),
            PointerEvent::Up | PointerEvent::Leave => self.release(store),
        }
    }

    fn press(
        &mut self,
        y: f64,
        target: PointerTarget,
        store: &SequenceBlockStore,
    ) -> InteractionOutcome {
        match target {
            PointerTarget::BlockBody(block_id) => {
                let Some(block) = store.get(&block_id) else {
                    return InteractionOutcome::Ignored;
                };
                self.state = InteractionState::Moving {
                    original_start: self.grid.time_to_offset(block.start_time),
                    block_id: block_id.clone(),
                    drag_start_y: y,
                };
                InteractionOutcome::GestureStarted {
                    block_id: Some(block_id),
                }
            }
            PointerTarget::ResizeHandle(block_id) => {
                let Some(block) = store.get(&block_id) else {
                    return InteractionOutcome::Ignored;
                };
                self.state = InteractionState::Resizing {
                    original_duration: block.duration_minutes(),
                    block_id: block_id.clone(),
                    drag_start_y: y,
                };
                InteractionOutcome::GestureStarted {
                    block_id: Some(block_id),
                }
            }
            PointerTarget::EmptyGrid => {
                self.state = InteractionState::Creating {
                    start_y: y,
                    start_offset: self.grid.offset_at_pixel(y),
                    draft: None,
                };
                InteractionOutcome::GestureStarted { block_id: None }
            }
        }
    }

    fn drag(&mut self, y: f64, store: &mut SequenceBlockStore) -> InteractionOutcome {
        let grid = &self.grid;
        let window = grid.window_length();
        let min_duration = grid.min_duration_minutes();

        match &mut self.state {
            InteractionState::Idle => InteractionOutcome::Ignored,
            InteractionState::Moving {
                block_id,
                drag_start_y,
                original_start,
            } => {
                let Some(block) = store.get(block_id) else {
                    return InteractionOutcome::Ignored;
                };
                let duration = block.duration_minutes();
                let delta = grid.quantized_delta(y - *drag_start_y);
                let new_start = (*original_start + delta).min(window - duration).max(0);
                let new_end = new_start + duration;
                store.update(
                    block_id,
                    BlockPatch::times(grid.offset_to_time(new_start), grid.offset_to_time(new_end)),
                );
                InteractionOutcome::BlockChanged(block_id.clone())
            }
            InteractionState::Resizing {
                block_id,
                drag_start_y,
                original_duration,
            } => {
                let Some(block) = store.get(block_id) else {
                    return InteractionOutcome::Ignored;
                };
                let start = grid.time_to_offset(block.start_time);
                let delta = grid.quantized_delta(y - *drag_start_y);
                let new_duration = (*original_duration + delta).max(min_duration);
                let new_end = (start + new_duration).min(window);
                store.update(
                    block_id,
                    BlockPatch {
                        end_time: Some(grid.offset_to_time(new_end)),
                        ..BlockPatch::default()
                    },
                );
                InteractionOutcome::BlockChanged(block_id.clone())
            }
            InteractionState::Creating {
                start_y,
                start_offset,
                draft,
            } => {
                let pointer_delta = y - *start_y;
                if draft.is_none() && pointer_delta.abs() < self.settings.creation_threshold_px {
                    return InteractionOutcome::Ignored;
                }
                let delta = grid.quantized_delta(pointer_delta);
                let requested = match self.settings.create_extent {
                    CreateExtent::TrackPointer => delta.max(min_duration),
                    CreateExtent::MinimumPlusDelta => (delta + min_duration).max(min_duration),
                };
                let end_offset = (*start_offset + requested)
                    .max(*start_offset + min_duration)
                    .min(window);
                let updated = DraftBlock {
                    start_offset: *start_offset,
                    end_offset,
                };
                *draft = Some(updated);
                InteractionOutcome::DraftChanged(updated)
            }
        }
    }

    fn release(&mut self, store: &mut SequenceBlockStore) -> InteractionOutcome {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Idle => InteractionOutcome::Ignored,
            InteractionState::Creating {
                draft: Some(draft), ..
            } => {
                let block = self.promote(draft);
                let block_id = block.id.clone();
                log::debug!(
                    "created block {block_id} {}-{}",
                    block.start_time,
                    block.end_time
                );
                store.create(block);
                InteractionOutcome::BlockCreated(block_id)
            }
            InteractionState::Creating { draft: None, .. }
            | InteractionState::Moving { .. }
            | InteractionState::Resizing { .. } => InteractionOutcome::GestureEnded,
        }
    }

    fn promote(&self, draft: DraftBlock) -> SequenceBlock {
        SequenceBlock {
            id: next_id("seq"),
            title: self.settings.new_block_title.clone(),
            start_time: self.grid.offset_to_time(draft.start_offset),
            end_time: self.grid.offset_to_time(draft.end_offset),
            assigned_people: BTreeSet::new(),
            notes: String::new(),
            media: Vec::new(),
            color: self.settings.new_block_color.clone(),
        }
    }
}
