//! Single-slot snapshot ledger for undoing one batch apply.
//!
//! A snapshot captures the minimal mutable surface of each item (name,
//! derived length, status) immediately before a preview is committed.
//! Exactly one snapshot is retained; recording a new one discards the
//! previous, giving single-level undo rather than a history stack.

use crate::preview::compute::PreviewResult;
use crate::preview::rules::{ItemStatus, NamedItem};
use std::collections::HashMap;

/// Captured pre-apply state for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub current_name: String,
    pub char_count: usize,
    pub status: ItemStatus,
}

/// Mapping from item id to its captured state.
#[derive(Debug, Clone, Default)]
pub struct ApplySnapshot {
    entries: HashMap<u64, SnapshotEntry>,
}

impl ApplySnapshot {
    /// Capture every item's restorable fields.
    pub fn capture(items: &[NamedItem]) -> Self {
        let entries = items
            .iter()
            .map(|item| {
                (
                    item.id,
                    SnapshotEntry {
                        current_name: item.current_name.clone(),
                        char_count: item.char_count,
                        status: item.status,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Build a new batch with every captured item restored.
    ///
    /// Items absent from the snapshot (including ones added after capture)
    /// pass through unchanged.
    pub fn restore(&self, items: &[NamedItem]) -> Vec<NamedItem> {
        items
            .iter()
            .map(|item| match self.entries.get(&item.id) {
                Some(entry) => {
                    let mut restored = item.clone();
                    restored.current_name = entry.current_name.clone();
                    restored.char_count = entry.char_count;
                    restored.status = entry.status;
                    restored
                }
                None => item.clone(),
            })
            .collect()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns the one retained snapshot.
#[derive(Debug, Default)]
pub struct SnapshotLedger {
    slot: Option<ApplySnapshot>,
}

impl SnapshotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain a snapshot, discarding any previous one.
    pub fn record(&mut self, snapshot: ApplySnapshot) {
        self.slot = Some(snapshot);
    }

    /// Take the retained snapshot, leaving the ledger empty.
    pub fn undo(&mut self) -> Option<ApplySnapshot> {
        self.slot.take()
    }

    pub fn has_snapshot(&self) -> bool {
        self.slot.is_some()
    }
}

/// Commit a preview onto the live batch.
///
/// Records a snapshot first, then renames every item whose preview entry is
/// valid and actually changes the name, marking it `Modified`. Duplicate and
/// error entries are left untouched so the user can review them.
pub fn commit_preview(
    items: &mut [NamedItem],
    preview: &PreviewResult,
    ledger: &mut SnapshotLedger,
) {
    ledger.record(ApplySnapshot::capture(items));

    let by_id: HashMap<u64, &crate::preview::compute::PreviewEntry> = preview
        .entries
        .iter()
        .map(|entry| (entry.item_id, entry))
        .collect();

    for item in items.iter_mut() {
        let Some(entry) = by_id.get(&item.id) else {
            continue;
        };
        if entry.status == ItemStatus::Valid && entry.proposed_name != item.current_name {
            item.set_name(entry.proposed_name.clone());
            item.status = ItemStatus::Modified;
        }
    }
}
