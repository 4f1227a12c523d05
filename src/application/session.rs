//! One editing session over a single day's timeline.
//!
//! The session exclusively owns the day's block store. Pointer gestures,
//! assignment changes, media edits and clipboard operations all run
//! synchronously against it; the only await point is the hand-off to the
//! repository on save.

use crate::application::activity_log::ActivityLog;
use crate::application::seeding::{SeedSource, SeededDay};
use crate::domain::clipboard::{self, ClipboardPayload};
use crate::domain::conflict::{Conflict, DoubleBooking, conflict_with, double_bookings, find_conflict};
use crate::domain::interaction::{
    DraftBlock, InteractionMachine, InteractionOutcome, PointerEvent,
};
use crate::domain::layout::{self, BlockPlacement, ColumnSlot};
use crate::domain::models::{
    BlockPatch, ClockTime, MediaItem, MediaKind, RosterEntry, SequenceBlock, TimelineConfig,
    next_id,
};
use crate::domain::store::SequenceBlockStore;
use crate::domain::time_grid::TimeGrid;
use crate::infrastructure::day_plan_repository::DayPlanRepository;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned,
    Removed,
    /// The person already was (or already was not) in the block.
    Unchanged,
    UnknownBlock,
    Conflict(Conflict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    UnknownBlock,
    /// The new times would put an assigned person in two places at once.
    Conflict(Conflict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { block_count: usize },
    Failed { notice: String },
}

/// A roster entry as seen from the active block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterAvailability {
    pub person_id: String,
    pub name: String,
    pub assigned: bool,
    pub occupied_by: Option<Conflict>,
}

pub struct TimelineSession {
    date: NaiveDate,
    config: TimelineConfig,
    machine: InteractionMachine,
    store: SequenceBlockStore,
    roster: Vec<RosterEntry>,
    source: SeedSource,
    active_block_id: Option<String>,
    clipboard: Option<ClipboardPayload>,
    initial_time: Option<ClockTime>,
    baseline: Vec<SequenceBlock>,
    activity: Arc<ActivityLog>,
}

impl TimelineSession {
    pub fn new(
        date: NaiveDate,
        config: TimelineConfig,
        seeded: SeededDay,
        roster: Vec<RosterEntry>,
        initial_time: Option<ClockTime>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        let store = SequenceBlockStore::from_blocks(seeded.blocks);
        Self {
            date,
            machine: InteractionMachine::from_config(&config),
            config,
            baseline: store.snapshot(),
            store,
            roster,
            source: seeded.source,
            active_block_id: None,
            clipboard: None,
            initial_time,
            activity,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn grid(&self) -> &TimeGrid {
        self.machine.grid()
    }

    pub fn seed_source(&self) -> SeedSource {
        self.source
    }

    pub fn blocks(&self) -> &[SequenceBlock] {
        self.store.list()
    }

    pub fn block(&self, block_id: &str) -> Option<&SequenceBlock> {
        self.store.get(block_id)
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn is_interacting(&self) -> bool {
        !self.machine.is_idle()
    }

    pub fn draft(&self) -> Option<&DraftBlock> {
        self.machine.draft()
    }

    pub fn pointer(&mut self, event: PointerEvent) -> InteractionOutcome {
        let outcome = self.machine.handle(event, &mut self.store);
        match &outcome {
            InteractionOutcome::GestureStarted {
                block_id: Some(block_id),
            } => {
                self.active_block_id = Some(block_id.clone());
            }
            InteractionOutcome::BlockCreated(block_id) => {
                self.active_block_id = Some(block_id.clone());
                self.activity
                    .info("create_block", &format!("{} on {}", block_id, self.date));
            }
            InteractionOutcome::GestureEnded => {
                if let Some(block_id) = self.active_block_id.as_deref() {
                    for booking in self.conflicts_with(block_id) {
                        self.activity.warn(
                            "move_block",
                            &format!(
                                "{} is in both {} and {}",
                                booking.person_id, booking.first_block_id, booking.second_block_id
                            ),
                        );
                    }
                }
            }
            _ => {}
        }
        outcome
    }

    pub fn active_block(&self) -> Option<&SequenceBlock> {
        self.active_block_id
            .as_deref()
            .and_then(|block_id| self.store.get(block_id))
    }

    pub fn select(&mut self, block_id: &str) -> bool {
        if !self.store.contains(block_id) {
            return false;
        }
        self.active_block_id = Some(block_id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.active_block_id = None;
    }

    pub fn layout(&self) -> HashMap<String, ColumnSlot> {
        layout::layout(self.store.list())
    }

    pub fn placements(&self) -> Vec<BlockPlacement> {
        layout::place_blocks(self.grid(), self.store.list(), self.machine.draft())
    }

    /// People held by two overlapping blocks right now. Moves and resizes
    /// are never refused, so this is how their double-bookings surface.
    pub fn conflicts(&self) -> Vec<DoubleBooking> {
        double_bookings(self.store.list())
    }

    pub fn conflicts_with(&self, block_id: &str) -> Vec<DoubleBooking> {
        self.conflicts()
            .into_iter()
            .filter(|booking| booking.involves(block_id))
            .collect()
    }

    /// Checked against every block of the day before anything is written.
    /// A blank person id is left out.
    pub fn assign_person(&mut self, block_id: &str, person_id: &str) -> AssignmentOutcome {
        let person_id = person_id.trim();
        let Some(block) = self.store.get(block_id) else {
            return AssignmentOutcome::UnknownBlock;
        };
        if person_id.is_empty() || block.has_person(person_id) {
            return AssignmentOutcome::Unchanged;
        }
        if let Some(conflict) = find_conflict(self.store.list(), block_id, person_id) {
            self.activity.warn("assign_person", &conflict.to_string());
            return AssignmentOutcome::Conflict(conflict);
        }

        let mut people = block.assigned_people.clone();
        people.insert(person_id.to_string());
        self.store.update(
            block_id,
            BlockPatch {
                assigned_people: Some(people),
                ..BlockPatch::default()
            },
        );
        self.activity
            .info("assign_person", &format!("{person_id} -> {block_id}"));
        AssignmentOutcome::Assigned
    }

    /// Removing a person can never create an overlap, so it is never refused.
    pub fn unassign_person(&mut self, block_id: &str, person_id: &str) -> AssignmentOutcome {
        let person_id = person_id.trim();
        let Some(block) = self.store.get(block_id) else {
            return AssignmentOutcome::UnknownBlock;
        };
        if !block.has_person(person_id) {
            return AssignmentOutcome::Unchanged;
        }

        let mut people = block.assigned_people.clone();
        people.remove(person_id);
        self.store.update(
            block_id,
            BlockPatch {
                assigned_people: Some(people),
                ..BlockPatch::default()
            },
        );
        self.activity
            .info("unassign_person", &format!("{person_id} <- {block_id}"));
        AssignmentOutcome::Removed
    }

    /// Flips the person's membership in the active block.
    pub fn toggle_person(&mut self, person_id: &str) -> AssignmentOutcome {
        let Some(block) = self.active_block() else {
            return AssignmentOutcome::UnknownBlock;
        };
        let block_id = block.id.clone();
        if block.has_person(person_id.trim()) {
            self.unassign_person(&block_id, person_id)
        } else {
            self.assign_person(&block_id, person_id)
        }
    }

    pub fn roster_view(&self) -> Vec<RosterAvailability> {
        let active = self.active_block();
        self.roster
            .iter()
            .map(|entry| {
                let assigned = active.is_some_and(|block| block.has_person(&entry.person_id));
                let occupied_by = active.and_then(|block| {
                    find_conflict(self.store.list(), &block.id, &entry.person_id)
                });
                RosterAvailability {
                    person_id: entry.person_id.clone(),
                    name: entry.name.clone(),
                    assigned,
                    occupied_by,
                }
            })
            .collect()
    }

    /// Applies a field edit. New times are fitted onto the grid and refused
    /// when an assigned person is already busy then; people are left alone
    /// here and only change through the assignment calls.
    pub fn edit_block(&mut self, block_id: &str, mut patch: BlockPatch) -> EditOutcome {
        let Some(block) = self.store.get(block_id) else {
            return EditOutcome::UnknownBlock;
        };
        patch.assigned_people = None;
        if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.unwrap_or(block.start_time);
            let end = patch.end_time.unwrap_or(block.end_time);
            let (start, end) = fit_span(self.grid(), start, end);

            let mut prospective = block.clone();
            prospective.start_time = start;
            prospective.end_time = end;
            let conflict = block.assigned_people.iter().find_map(|person_id| {
                conflict_with(self.store.list(), &prospective, person_id)
            });
            if let Some(conflict) = conflict {
                self.activity.warn("edit_block", &conflict.to_string());
                return EditOutcome::Conflict(conflict);
            }
            patch.start_time = Some(start);
            patch.end_time = Some(end);
        }
        if !patch.is_empty() {
            self.store.update(block_id, patch);
        }
        EditOutcome::Applied
    }

    pub fn delete_block(&mut self, block_id: &str) -> Option<SequenceBlock> {
        let removed = self.store.delete(block_id)?;
        if self.active_block_id.as_deref() == Some(block_id) {
            self.active_block_id = None;
        }
        self.activity.info("delete_block", block_id);
        Some(removed)
    }

    /// Returns the new media id, or `None` for an unknown block or blank url.
    pub fn add_media(
        &mut self,
        block_id: &str,
        url: &str,
        kind: MediaKind,
        note: Option<String>,
    ) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let block = self.store.get(block_id)?;
        let item = MediaItem {
            id: next_id("media"),
            url: url.to_string(),
            kind,
            note,
        };
        let media_id = item.id.clone();
        let mut media = block.media.clone();
        media.push(item);
        self.replace_media(block_id, media);
        Some(media_id)
    }

    pub fn remove_media(&mut self, block_id: &str, media_id: &str) -> bool {
        self.edit_media(block_id, media_id, |media, index| {
            media.remove(index);
        })
    }

    /// `Some("")` keeps an empty note; `None` removes it.
    pub fn set_media_note(&mut self, block_id: &str, media_id: &str, note: Option<String>) -> bool {
        self.edit_media(block_id, media_id, move |media, index| {
            media[index].note = note;
        })
    }

    /// Moves an item to `position`, clamped to the end of the list.
    pub fn move_media(&mut self, block_id: &str, media_id: &str, position: usize) -> bool {
        self.edit_media(block_id, media_id, |media, index| {
            let item = media.remove(index);
            let position = position.min(media.len());
            media.insert(position, item);
        })
    }

    fn edit_media(
        &mut self,
        block_id: &str,
        media_id: &str,
        edit: impl FnOnce(&mut Vec<MediaItem>, usize),
    ) -> bool {
        let Some(block) = self.store.get(block_id) else {
            return false;
        };
        let Some(index) = block.media.iter().position(|item| item.id == media_id) else {
            return false;
        };
        let mut media = block.media.clone();
        edit(&mut media, index);
        self.replace_media(block_id, media);
        true
    }

    fn replace_media(&mut self, block_id: &str, media: Vec<MediaItem>) {
        self.store.update(
            block_id,
            BlockPatch {
                media: Some(media),
                ..BlockPatch::default()
            },
        );
    }

    pub fn copy_block(&mut self, block_id: &str) -> bool {
        let Some(block) = self.store.get(block_id) else {
            return false;
        };
        self.clipboard = Some(clipboard::copy(block));
        true
    }

    pub fn clipboard(&self) -> Option<&ClipboardPayload> {
        self.clipboard.as_ref()
    }

    /// Pastes the clipboard at `target`, the session's initial time, or the
    /// configured default, in that order. The new block becomes active.
    pub fn paste(&mut self, target: Option<ClockTime>) -> Option<String> {
        let payload = self.clipboard.as_ref()?;
        let target = target
            .or(self.initial_time)
            .unwrap_or(self.config.default_paste_time);
        let block = clipboard::paste(self.machine.grid(), payload, target);
        let block_id = block.id.clone();
        self.activity.info(
            "paste_block",
            &format!("{block_id} at {}-{}", block.start_time, block.end_time),
        );
        self.store.create(block);
        self.active_block_id = Some(block_id.clone());
        Some(block_id)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.store.list() != self.baseline.as_slice()
    }

    /// Supersedes the whole day. Any gesture in progress is dropped.
    pub fn reseed(&mut self, seeded: SeededDay) {
        self.machine = InteractionMachine::from_config(&self.config);
        self.store.replace_all(seeded.blocks);
        self.baseline = self.store.snapshot();
        self.source = seeded.source;
        self.active_block_id = None;
    }

    /// Hands the current list to `repository`. A failure leaves every edit in
    /// place so the save can simply be retried.
    pub async fn save<R>(&mut self, repository: &R) -> SaveOutcome
    where
        R: DayPlanRepository + ?Sized,
    {
        let snapshot = self.store.snapshot();
        match repository.save_day(self.date, &snapshot).await {
            Ok(()) => {
                let block_count = snapshot.len();
                self.baseline = snapshot;
                self.activity
                    .info("save_day", &format!("{} blocks on {}", block_count, self.date));
                SaveOutcome::Saved { block_count }
            }
            Err(error) => {
                let notice = format!("Could not save {}: {error}", self.date);
                self.activity.error("save_day", &notice);
                SaveOutcome::Failed { notice }
            }
        }
    }
}

/// Same geometry rules as a gesture: snapped start pulled back so a
/// minimum-length block fits, duration widened to the minimum, end clamped.
fn fit_span(grid: &TimeGrid, start: ClockTime, end: ClockTime) -> (ClockTime, ClockTime) {
    let start_offset = grid
        .snap(grid.time_to_offset(start))
        .min(grid.latest_start())
        .max(0);
    let requested = grid.snap(grid.time_to_offset(end)) - start_offset;
    let end_offset = (start_offset + requested.max(grid.min_duration_minutes()))
        .min(grid.window_length());
    (
        grid.offset_to_time(start_offset),
        grid.offset_to_time(end_offset),
    )
}
