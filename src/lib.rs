//! # rebatch - Background Processing Pipeline for Batch Rename Tools
//!
//! A resource-bounded pipeline that ingests large line-oriented structured
//! files, runs cancellable free-text search over the parsed records, and
//! previews batch rename rules with per-character highlight diffs — all
//! without ever blocking the interactive surface driving it.
//!
//! ## Architecture
//!
//! Three cooperating background tasks, each owning its state and coordinated
//! purely by message passing:
//!
//! - [`parse`] - Streaming parse coordinator: chunked parsing with merged
//!   statistics, fractional progress, and a hard record-count safety ceiling
//! - [`search`] - Flattened case-folded index plus a windowed substring
//!   matcher with cooperative, identifier-based cancellation
//! - [`preview`] - Pure rule-preview computation (literal, regex, and
//!   templated transforms) with highlight diffs
//! - [`controller`] - Foreground fencing controller that issues request ids
//!   and drops stale responses
//! - [`snapshot`] - Single-slot snapshot ledger for undoing one batch apply
//! - [`error`] - Centralized error types and handling

// Core modules
pub mod controller;
pub mod error;
pub mod protocol;

// Pipeline units
pub mod parse;
pub mod preview;
pub mod search;
pub mod snapshot;

// Re-export commonly used types for convenience
pub use error::{RebatchError, Result};

// Public API surface for external usage
pub use controller::{Pipeline, RequestFence};
pub use parse::{ParseResult, RecordParser, TaggedLineParser};
pub use preview::{compute_preview, NamedItem, TemplateRegistry, TransformRule};
pub use snapshot::{ApplySnapshot, SnapshotLedger};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
