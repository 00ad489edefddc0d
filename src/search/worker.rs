//! Cancellable substring search worker.
//!
//! Scans the cached index in fixed-size windows, yielding between windows.
//! Cancellation is purely cooperative: a new search (or an explicit cancel)
//! overwrites the worker's current request id, and the in-flight scan notices
//! at its next window boundary and stops without emitting anything further.

use crate::protocol::{RequestId, SearchActivity, SearchCommand, SearchEvent};
use crate::search::index::SearchIndex;
use memchr::memmem;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{Receiver, Sender};

/// Entries scanned per window before the worker checks for supersession.
pub const SEARCH_WINDOW: usize = 2000;

/// Run the search worker, processing commands from the controller.
pub async fn search_worker_loop(mut rx: Receiver<SearchCommand>, tx: Sender<SearchEvent>) {
    let mut state = WorkerState::new();

    'outer: while let Some(cmd) = rx.recv().await {
        if state.apply(cmd) {
            break;
        }
        // A scan that gets superseded mid-flight leaves the replacement job
        // in `pending`, so keep scanning until the queue settles.
        while let Some(job) = state.pending.take() {
            match run_scan(&mut state, &mut rx, &tx, job).await {
                ScanExit::Finished => {}
                ScanExit::Stop => break 'outer,
            }
        }
    }
}

struct PendingSearch {
    request_id: RequestId,
    query: String,
}

struct WorkerState {
    index: Option<SearchIndex>,
    current: Option<RequestId>,
    pending: Option<PendingSearch>,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            index: None,
            current: None,
            pending: None,
        }
    }

    /// Absorb one command; returns true on shutdown.
    fn apply(&mut self, cmd: SearchCommand) -> bool {
        match cmd {
            SearchCommand::Init { records } => {
                let rebuild = self
                    .index
                    .as_ref()
                    .map_or(true, |index| !index.is_for(&records));
                if rebuild {
                    log::debug!("rebuilding search index for {} records", records.len());
                    self.index = Some(SearchIndex::build(records));
                }
                false
            }
            SearchCommand::Search { request_id, query } => {
                // Recording the id is what supersedes any in-flight scan.
                self.current = Some(request_id);
                self.pending = Some(PendingSearch { request_id, query });
                false
            }
            SearchCommand::Cancel { request_id } => {
                if self.current == Some(request_id) {
                    self.current = None;
                }
                false
            }
            SearchCommand::Shutdown => true,
        }
    }

    fn is_current(&self, request_id: RequestId) -> bool {
        self.current == Some(request_id)
    }
}

enum ScanExit {
    /// The scan completed, was superseded, or was cancelled.
    Finished,
    /// Shutdown was requested or a channel closed; the worker should exit.
    Stop,
}

async fn run_scan(
    state: &mut WorkerState,
    rx: &mut Receiver<SearchCommand>,
    tx: &Sender<SearchEvent>,
    job: PendingSearch,
) -> ScanExit {
    let request_id = job.request_id;

    // Empty query is a defined edge case: resolve immediately with no matches.
    if job.query.is_empty() {
        if !emit_result(tx, request_id, Vec::new()).await {
            return ScanExit::Stop;
        }
        return ScanExit::Finished;
    }

    let total = state.index.as_ref().map_or(0, SearchIndex::len);
    let needle = job.query.to_lowercase();
    let finder = memmem::Finder::new(needle.as_bytes());

    let mut matches = Vec::new();
    let mut processed = 0usize;

    while processed < total {
        let end = (processed + SEARCH_WINDOW).min(total);
        if let Some(index) = state.index.as_ref() {
            for i in processed..end.min(index.len()) {
                if finder.find(index.entry(i).as_bytes()).is_some() {
                    matches.push(i);
                }
            }
        }
        processed = end;

        // Absorb commands that arrived during this window, then check whether
        // this scan is still the one the caller wants.
        loop {
            match rx.try_recv() {
                Ok(cmd) => {
                    if state.apply(cmd) {
                        return ScanExit::Stop;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        if !state.is_current(request_id) {
            log::debug!("search {request_id} superseded after {processed}/{total} entries");
            return ScanExit::Finished;
        }

        let progress = processed.min(total) as f64 / total as f64;
        let status = SearchEvent::Status {
            request_id,
            activity: SearchActivity::Working,
            progress,
        };
        if tx.send(status).await.is_err() {
            return ScanExit::Stop;
        }
        tokio::task::yield_now().await;
    }

    if !state.is_current(request_id) {
        return ScanExit::Finished;
    }
    // Ascending original-record order by construction of the scan.
    if !emit_result(tx, request_id, matches).await {
        return ScanExit::Stop;
    }
    ScanExit::Finished
}

/// Emit the single result event for a request, followed by an idle status.
async fn emit_result(tx: &Sender<SearchEvent>, request_id: RequestId, matches: Vec<usize>) -> bool {
    if tx
        .send(SearchEvent::Result {
            request_id,
            matches,
        })
        .await
        .is_err()
    {
        return false;
    }
    tx.send(SearchEvent::Status {
        request_id,
        activity: SearchActivity::Idle,
        progress: 1.0,
    })
    .await
    .is_ok()
}
