use crate::domain::models::{ClockTime, SequenceBlock};
use serde::Serialize;
use std::fmt;

/// Another block already holding the person during an overlapping span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub person_id: String,
    pub block_id: String,
    pub block_title: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is already in \"{}\" from {} to {}",
            self.person_id, self.block_title, self.start_time, self.end_time
        )
    }
}

/// First block other than `candidate_block_id` that contains `person_id`
/// and overlaps the candidate. An unknown candidate never conflicts.
pub fn find_conflict(
    blocks: &[SequenceBlock],
    candidate_block_id: &str,
    person_id: &str,
) -> Option<Conflict> {
    let candidate = blocks.iter().find(|block| block.id == candidate_block_id)?;
    conflict_with(blocks, candidate, person_id)
}

/// Like [`find_conflict`], but for a candidate that is not (or not yet) in
/// `blocks` in this shape, such as a block with edited times. Any entry with
/// the candidate's id is skipped.
pub fn conflict_with(
    blocks: &[SequenceBlock],
    candidate: &SequenceBlock,
    person_id: &str,
) -> Option<Conflict> {
    blocks
        .iter()
        .find(|other| {
            other.id != candidate.id && other.has_person(person_id) && other.overlaps(candidate)
        })
        .map(|other| Conflict {
            person_id: person_id.to_string(),
            block_id: other.id.clone(),
            block_title: other.title.clone(),
            start_time: other.start_time,
            end_time: other.end_time,
        })
}

/// Two overlapping blocks that hold the same person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleBooking {
    pub person_id: String,
    pub first_block_id: String,
    pub second_block_id: String,
}

impl DoubleBooking {
    pub fn involves(&self, block_id: &str) -> bool {
        self.first_block_id == block_id || self.second_block_id == block_id
    }
}

/// Every pair of overlapping blocks sharing a person, once per person, with
/// the pair in list order.
pub fn double_bookings(blocks: &[SequenceBlock]) -> Vec<DoubleBooking> {
    let mut found = Vec::new();
    for (index, first) in blocks.iter().enumerate() {
        for second in &blocks[index + 1..] {
            if !first.overlaps(second) {
                continue;
            }
            for person_id in first.assigned_people.intersection(&second.assigned_people) {
                found.push(DoubleBooking {
                    person_id: person_id.clone(),
                    first_block_id: first.id.clone(),
                    second_block_id: second.id.clone(),
                });
            }
        }
    }
    found
}

pub fn has_conflict(blocks: &[SequenceBlock], candidate_block_id: &str, person_id: &str) -> bool {
    find_conflict(blocks, candidate_block_id, person_id).is_some()
}
