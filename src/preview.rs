//! Batch rename preview subsystem: transform rules, highlight diffs, the pure
//! preview computation, and its worker loop.

pub mod compute;
pub mod diff;
pub mod rules;
pub mod worker;

pub use compute::{compute_preview, PreviewEntry, PreviewResult};
pub use diff::{diff_segments, HighlightSegment};
pub use rules::{
    ItemStatus, NamedItem, RuleKind, TemplateRegistry, TemplateTransform, TransformRule,
};
pub use worker::preview_worker_loop;
