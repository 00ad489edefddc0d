//! Record data model and the parser-collaborator boundary.
//!
//! The pipeline treats the record grammar itself as an opaque collaborator: a
//! [`RecordParser`] turns one text slice into typed records plus per-slice
//! statistics. Everything downstream (chunk merging, search indexing) works
//! purely on the types defined here.

use crate::error::Result;
use std::collections::BTreeMap;

/// Joins field values in a record's flattened search representation.
///
/// U+001F (unit separator) is non-printable and never occurs in natural text,
/// so a query can never straddle two fields by accident.
pub const FIELD_DELIMITER: char = '\u{1F}';

/// One typed record: an ordered field mapping tagged with a kind discriminator.
///
/// Immutable once produced by the parser collaborator; consumers derive
/// read-only projections and never mutate the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub kind: String,
    pub fields: Vec<(String, String)>,
}

impl ParsedRecord {
    pub fn new(kind: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    /// Case-folded concatenation of all field values, used for substring search.
    pub fn flattened(&self) -> String {
        let mut out = String::new();
        for (i, (_, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(FIELD_DELIMITER);
            }
            out.push_str(&value.to_lowercase());
        }
        out
    }
}

/// Aggregate counters accumulated across slices of one parse run.
///
/// Mutated only by [`ParseStatistics::merge`] while the run is in flight;
/// treated as immutable once the run's terminal event is emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStatistics {
    pub total_records: usize,
    pub type_counts: BTreeMap<String, usize>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParseStatistics {
    /// Fold another slice's statistics into this accumulator.
    ///
    /// Totals add, per-type counts add (creating absent keys), and error and
    /// warning descriptors append in order, so merging slice-by-slice yields
    /// the same statistics as parsing the whole input in one slice.
    pub fn merge(&mut self, other: &ParseStatistics) {
        self.total_records += other.total_records;
        for (kind, count) in &other.type_counts {
            *self.type_counts.entry(kind.clone()).or_insert(0) += count;
        }
        self.errors.extend(other.errors.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Output of the parser collaborator for a single text slice.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    /// Header-equivalent fields; only the first slice's metadata is kept.
    pub metadata: BTreeMap<String, String>,
    pub records: Vec<ParsedRecord>,
    pub stats: ParseStatistics,
}

/// The full outcome of one parse run.
///
/// Created once per run and replaced, never mutated in place, when a new
/// input is parsed.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub source: String,
    pub records: Vec<ParsedRecord>,
    pub stats: ParseStatistics,
    pub metadata: BTreeMap<String, String>,
}

/// The record-grammar collaborator.
///
/// Must be deterministic and side-effect-free over a slice, so that the
/// coordinator's chunked merge is equivalent to single-slice parsing.
pub trait RecordParser: Send + Sync {
    fn parse_chunk(&self, text: &str, source: &str) -> Result<ChunkOutput>;
}
