use crate::domain::models::{BlockPatch, SequenceBlock};

/// In-memory list of one day's blocks, kept in insertion order.
///
/// The store never rejects a write: geometry is normalized before it gets
/// here and assignment conflicts are checked by the caller beforehand.
/// Updates and deletes addressed to an unknown id are silent no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceBlockStore {
    blocks: Vec<SequenceBlock>,
}

impl SequenceBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<SequenceBlock>) -> Self {
        let mut store = Self::new();
        for block in blocks {
            store.create(block);
        }
        store
    }

    pub fn list(&self) -> &[SequenceBlock] {
        &self.blocks
    }

    pub fn get(&self, id: &str) -> Option<&SequenceBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Appends a block. A block reusing an existing id replaces it in place.
    pub fn create(&mut self, block: SequenceBlock) {
        match self.blocks.iter_mut().find(|existing| existing.id == block.id) {
            Some(existing) => *existing = block,
            None => self.blocks.push(block),
        }
    }

    /// Returns whether a block with `id` was found.
    pub fn update(&mut self, id: &str, patch: BlockPatch) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|block| block.id == id) else {
            return false;
        };
        patch.apply_to(block);
        true
    }

    pub fn delete(&mut self, id: &str) -> Option<SequenceBlock> {
        let index = self.blocks.iter().position(|block| block.id == id)?;
        Some(self.blocks.remove(index))
    }

    /// Supersedes the whole day, e.g. when the timeline is re-seeded.
    pub fn replace_all(&mut self, blocks: Vec<SequenceBlock>) {
        *self = Self::from_blocks(blocks);
    }

    pub fn snapshot(&self) -> Vec<SequenceBlock> {
        self.blocks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ClockTime;
    use std::collections::BTreeSet;

    fn block(id: &str, start: &str, end: &str) -> SequenceBlock {
        SequenceBlock {
            id: id.to_string(),
            title: format!("Group {id}"),
            start_time: start.parse::<ClockTime>().expect("start"),
            end_time: end.parse::<ClockTime>().expect("end"),
            assigned_people: BTreeSet::new(),
            notes: String::new(),
            media: Vec::new(),
            color: "gray".to_string(),
        }
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = SequenceBlockStore::from_blocks(vec![
            block("b", "14:00", "15:00"),
            block("a", "09:00", "10:00"),
        ]);
        let ids = store.list().iter().map(|b| b.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn create_with_existing_id_replaces_in_place() {
        let mut store = SequenceBlockStore::from_blocks(vec![
            block("a", "09:00", "10:00"),
            block("b", "10:00", "11:00"),
        ]);
        store.create(block("a", "12:00", "13:00"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].start_time.to_string(), "12:00");
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut store = SequenceBlockStore::from_blocks(vec![block("a", "09:00", "10:00")]);
        let applied = store.update(
            "a",
            BlockPatch {
                title: Some("Block serve".to_string()),
                ..BlockPatch::default()
            },
        );
        assert!(applied);
        let updated = store.get("a").expect("block a");
        assert_eq!(updated.title, "Block serve");
        assert_eq!(updated.start_time.to_string(), "09:00");
    }

    #[test]
    fn empty_update_and_unknown_ids_are_noops() {
        let mut store = SequenceBlockStore::from_blocks(vec![block("a", "09:00", "10:00")]);
        let before = store.clone();

        assert!(store.update("a", BlockPatch::default()));
        assert_eq!(store, before);

        assert!(!store.update("missing", BlockPatch::default()));
        assert!(store.delete("missing").is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn delete_removes_block_once() {
        let mut store = SequenceBlockStore::from_blocks(vec![
            block("a", "09:00", "10:00"),
            block("b", "10:00", "11:00"),
        ]);
        assert!(store.delete("a").is_some());
        assert!(store.delete("a").is_none());
        assert_eq!(store.len(), 1);
        assert!(!store.contains("a"));
    }

    #[test]
    fn replace_all_supersedes_previous_blocks() {
        let mut store = SequenceBlockStore::from_blocks(vec![block("a", "09:00", "10:00")]);
        store.replace_all(vec![block("c", "11:00", "12:00")]);
        assert_eq!(store.snapshot(), vec![block("c", "11:00", "12:00")]);
    }
}
