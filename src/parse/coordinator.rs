//! Streaming parse coordinator.
//!
//! Splits raw input into line-bounded slices, feeds each slice to the record
//! parser collaborator, and merges the partial statistics. Yields back to the
//! scheduler after every slice so one parse run never monopolizes the
//! executor for longer than one slice's processing time.

use crate::parse::records::{ParseResult, RecordParser};
use crate::protocol::{ParseCommand, ParseEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// Lines per slice; tuned so one slice stays well under a frame's budget.
pub const DEFAULT_CHUNK_LINES: usize = 2000;

/// Hard upper bound on records per run. Breaching it aborts the run with an
/// early-stop event instead of growing memory without bound.
pub const DEFAULT_RECORD_CEILING: usize = 500_000;

/// Run the parse coordinator, processing commands from the controller.
pub async fn parse_worker_loop(
    mut rx: Receiver<ParseCommand>,
    tx: Sender<ParseEvent>,
    parser: Arc<dyn RecordParser>,
    record_ceiling: usize,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            ParseCommand::Parse {
                raw,
                source,
                chunk_lines,
            } => {
                let alive =
                    run_parse(&tx, parser.as_ref(), &raw, &source, chunk_lines, record_ceiling)
                        .await;
                if !alive {
                    break;
                }
            }
            ParseCommand::Shutdown => break,
        }
    }
}

/// Process one parse run; returns false once the event channel is closed.
async fn run_parse(
    tx: &Sender<ParseEvent>,
    parser: &dyn RecordParser,
    raw: &str,
    source: &str,
    chunk_lines: usize,
    record_ceiling: usize,
) -> bool {
    let chunk_lines = chunk_lines.max(1);
    // Slices are rejoined with the input's own separator so the collaborator
    // sees the text exactly as it appeared in the file.
    let separator = if raw.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = raw.lines().collect();
    let total_lines = lines.len();

    let mut result = ParseResult {
        source: source.to_string(),
        records: Vec::new(),
        stats: Default::default(),
        metadata: BTreeMap::new(),
    };

    if total_lines == 0 {
        return emit(tx, ParseEvent::Done { result }).await;
    }

    log::debug!("parse run '{source}': {total_lines} lines, {chunk_lines} per slice");

    let mut lines_processed = 0usize;
    for (slice_index, slice) in lines.chunks(chunk_lines).enumerate() {
        let text = slice.join(separator);
        let chunk = match parser.parse_chunk(&text, source) {
            Ok(chunk) => chunk,
            Err(error) => {
                // Fatal for the whole run: no partial-result salvage.
                log::warn!("parse run '{source}' failed on slice {slice_index}: {error}");
                return emit(tx, ParseEvent::Error { error }).await;
            }
        };

        if slice_index == 0 {
            result.metadata = chunk.metadata;
        }
        result.records.extend(chunk.records);
        result.stats.merge(&chunk.stats);
        lines_processed += slice.len();

        // Checked once per slice, not once per record, to bound overhead.
        if result.records.len() > record_ceiling {
            let reason = format!(
                "stopped after {} records: safety ceiling of {record_ceiling} exceeded, \
                 input is too large to process safely",
                result.records.len()
            );
            log::warn!("parse run '{source}': {reason}");
            return emit(tx, ParseEvent::EarlyStop { reason }).await;
        }

        let fraction = (lines_processed as f64 / total_lines as f64).min(1.0);
        if !emit(tx, ParseEvent::Progress { fraction }).await {
            return false;
        }
        tokio::task::yield_now().await;
    }

    log::debug!(
        "parse run '{source}' done: {} records, {} errors, {} warnings",
        result.records.len(),
        result.stats.errors.len(),
        result.stats.warnings.len()
    );
    emit(tx, ParseEvent::Done { result }).await
}

async fn emit(tx: &Sender<ParseEvent>, event: ParseEvent) -> bool {
    tx.send(event).await.is_ok()
}
