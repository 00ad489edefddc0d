//! Protocol definitions shared between the foreground controller and the
//! background pipeline workers.
//!
//! Every request that expects a correlated response carries a [`RequestId`];
//! the controller compares it against the most recently issued id and drops
//! anything stale.

use crate::error::RebatchError;
use crate::parse::records::{ParseResult, ParsedRecord};
use crate::preview::compute::PreviewResult;
use crate::preview::rules::{NamedItem, TransformRule};
use std::sync::Arc;

/// Identifier attached to cross-task requests so responses can be correlated.
pub type RequestId = u64;

/// Commands sent from the controller to the streaming parse coordinator.
#[derive(Debug, Clone)]
pub enum ParseCommand {
    Parse {
        raw: Arc<str>,
        source: String,
        chunk_lines: usize,
    },
    Shutdown,
}

/// Events emitted by the streaming parse coordinator.
///
/// Within one run, `Progress` fractions are strictly increasing and exactly
/// one terminal event (`Done`, `EarlyStop`, or `Error`) closes the run.
#[derive(Debug)]
pub enum ParseEvent {
    Progress { fraction: f64 },
    Done { result: ParseResult },
    /// The record-count safety ceiling was breached; distinct from `Error`
    /// so callers can suggest a specific remediation.
    EarlyStop { reason: String },
    Error { error: RebatchError },
}

/// Commands sent from the controller to the search worker.
#[derive(Debug, Clone)]
pub enum SearchCommand {
    Init {
        records: Arc<[ParsedRecord]>,
    },
    Search {
        request_id: RequestId,
        query: String,
    },
    Cancel {
        request_id: RequestId,
    },
    Shutdown,
}

/// Whether the search worker is mid-scan or waiting for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchActivity {
    Working,
    Idle,
}

/// Events emitted by the search worker.
///
/// At most one `Result` is ever emitted per request id, always preceded by
/// zero or more `Status` events for that same id. A superseded request emits
/// nothing after supersession is detected.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Status {
        request_id: RequestId,
        activity: SearchActivity,
        progress: f64,
    },
    Result {
        request_id: RequestId,
        matches: Vec<usize>,
    },
}

/// Commands sent from the controller to the rule-preview worker.
#[derive(Debug, Clone)]
pub enum PreviewCommand {
    Compute {
        request_id: RequestId,
        items: Vec<NamedItem>,
        rules: Vec<TransformRule>,
    },
    Shutdown,
}

/// Events emitted by the rule-preview worker.
///
/// Per-item rule failures are carried inside the `Result` as item statuses;
/// `Error` is reserved for request-level faults such as a rule naming a
/// template the registry does not know.
#[derive(Debug)]
pub enum PreviewEvent {
    Result {
        request_id: RequestId,
        preview: PreviewResult,
    },
    Error {
        request_id: RequestId,
        message: String,
    },
}
