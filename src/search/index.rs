//! Flattened, case-folded search index over a parsed record sequence.

use crate::parse::records::ParsedRecord;
use std::sync::Arc;

/// One case-folded entry per record, cached for the lifetime of the backing
/// record sequence. Owned exclusively by the search worker; nothing outside
/// the worker ever mutates it.
#[derive(Debug)]
pub struct SearchIndex {
    records: Arc<[ParsedRecord]>,
    entries: Vec<String>,
}

impl SearchIndex {
    /// Build entries for the given record sequence.
    pub fn build(records: Arc<[ParsedRecord]>) -> Self {
        let entries = records.iter().map(ParsedRecord::flattened).collect();
        Self { records, entries }
    }

    /// True when this index was built from exactly this record sequence, so
    /// re-initialization can be a cheap no-op.
    pub fn is_for(&self, records: &Arc<[ParsedRecord]>) -> bool {
        Arc::ptr_eq(&self.records, records)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &str {
        &self.entries[index]
    }
}
