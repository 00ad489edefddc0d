use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use rebatch::error::RebatchError;
use rebatch::parse::coordinator::parse_worker_loop;
use rebatch::parse::records::{ChunkOutput, RecordParser};
use rebatch::parse::TaggedLineParser;
use rebatch::protocol::{ParseCommand, ParseEvent};

const TIMEOUT_MS: u64 = 1000;

async fn next_event(rx: &mut mpsc::Receiver<ParseEvent>) -> ParseEvent {
    timeout(Duration::from_millis(TIMEOUT_MS), rx.recv())
        .await
        .expect("coordinator event timed out")
        .expect("coordinator channel closed unexpectedly")
}

fn spawn_coordinator(
    parser: Arc<dyn RecordParser>,
    record_ceiling: usize,
) -> (
    mpsc::Sender<ParseCommand>,
    mpsc::Receiver<ParseEvent>,
    tokio::task::JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (event_tx, event_rx) = mpsc::channel(64);
    let worker = tokio::spawn(parse_worker_loop(cmd_rx, event_tx, parser, record_ceiling));
    (cmd_tx, event_rx, worker)
}

async fn parse_to_done(
    cmd_tx: &mpsc::Sender<ParseCommand>,
    event_rx: &mut mpsc::Receiver<ParseEvent>,
    raw: &str,
    chunk_lines: usize,
) -> rebatch::ParseResult {
    cmd_tx
        .send(ParseCommand::Parse {
            raw: Arc::from(raw),
            source: "test-input".to_string(),
            chunk_lines,
        })
        .await
        .unwrap();

    loop {
        match next_event(event_rx).await {
            ParseEvent::Progress { .. } => continue,
            ParseEvent::Done { result } => return result,
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

fn synthetic_input(records: usize) -> String {
    let mut text = String::from("# title: Synthetic\n");
    for i in 0..records {
        let kind = if i % 3 == 0 { "Event" } else { "Marker" };
        text.push_str(&format!("{kind}: index={i}, text=entry number {i}\n"));
        if i % 10 == 7 {
            text.push_str("broken line without delimiter\n");
        }
    }
    text
}

#[tokio::test]
async fn chunked_statistics_match_single_slice() {
    let input = synthetic_input(53);

    let parser: Arc<dyn RecordParser> = Arc::new(TaggedLineParser::new());
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(Arc::clone(&parser), 100_000);

    let chunked = parse_to_done(&cmd_tx, &mut event_rx, &input, 7).await;
    let whole = parse_to_done(&cmd_tx, &mut event_rx, &input, 1_000_000).await;

    assert_eq!(chunked.stats, whole.stats);
    assert_eq!(chunked.records, whole.records);
    assert_eq!(chunked.metadata, whole.metadata);
    assert_eq!(chunked.metadata["title"], "Synthetic");

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn progress_fractions_are_monotonic_and_terminal_done_is_last() {
    let mut input = String::new();
    for i in 0..10_050 {
        input.push_str(&format!("Event: index={i}\n"));
    }

    let parser: Arc<dyn RecordParser> = Arc::new(TaggedLineParser::new());
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100_000);

    cmd_tx
        .send(ParseCommand::Parse {
            raw: Arc::from(input.as_str()),
            source: "big.txt".to_string(),
            chunk_lines: 2000,
        })
        .await
        .unwrap();

    let mut fractions = Vec::new();
    let result = loop {
        match next_event(&mut event_rx).await {
            ParseEvent::Progress { fraction } => fractions.push(fraction),
            ParseEvent::Done { result } => break result,
            other => panic!("unexpected event: {other:?}"),
        }
    };

    // 10,050 lines in slices of 2,000: six slices, six progress events.
    assert_eq!(fractions.len(), 6);
    for pair in fractions.windows(2) {
        assert!(pair[0] < pair[1], "progress not monotonic: {fractions:?}");
    }
    let expected = [
        2000.0 / 10_050.0,
        4000.0 / 10_050.0,
        6000.0 / 10_050.0,
        8000.0 / 10_050.0,
        10_000.0 / 10_050.0,
        1.0,
    ];
    for (got, want) in fractions.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "expected {want}, got {got}");
    }
    assert_eq!(result.stats.total_records, 10_050);

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn ceiling_breach_emits_one_early_stop_and_no_done() {
    let mut input = String::new();
    for i in 0..250 {
        input.push_str(&format!("Event: index={i}\n"));
    }

    let parser: Arc<dyn RecordParser> = Arc::new(TaggedLineParser::new());
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100);

    cmd_tx
        .send(ParseCommand::Parse {
            raw: Arc::from(input.as_str()),
            source: "huge.txt".to_string(),
            chunk_lines: 50,
        })
        .await
        .unwrap();

    let mut early_stops = 0;
    loop {
        match next_event(&mut event_rx).await {
            ParseEvent::Progress { .. } => continue,
            ParseEvent::EarlyStop { reason } => {
                early_stops += 1;
                assert!(reason.contains("too large"), "reason: {reason}");
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(early_stops, 1);

    // The run terminated: shutting down must not surface a trailing Done.
    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
    assert!(event_rx.recv().await.is_none());
}

#[tokio::test]
async fn records_under_the_ceiling_never_early_stop() {
    let mut input = String::new();
    for i in 0..100 {
        input.push_str(&format!("Event: index={i}\n"));
    }

    let parser: Arc<dyn RecordParser> = Arc::new(TaggedLineParser::new());
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100);

    let result = parse_to_done(&cmd_tx, &mut event_rx, &input, 25).await;
    assert_eq!(result.stats.total_records, 100);

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

/// Fails on any slice containing the trigger token.
struct FailingParser {
    inner: TaggedLineParser,
}

impl RecordParser for FailingParser {
    fn parse_chunk(&self, text: &str, source: &str) -> rebatch::Result<ChunkOutput> {
        if text.contains("BOOM") {
            return Err(RebatchError::parse("unrecoverable grammar fault"));
        }
        self.inner.parse_chunk(text, source)
    }
}

#[tokio::test]
async fn collaborator_failure_is_fatal_with_no_partial_salvage() {
    let mut input = String::new();
    for i in 0..30 {
        input.push_str(&format!("Event: index={i}\n"));
    }
    input.push_str("Event: text=BOOM\n");

    let parser: Arc<dyn RecordParser> = Arc::new(FailingParser {
        inner: TaggedLineParser::new(),
    });
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100_000);

    cmd_tx
        .send(ParseCommand::Parse {
            raw: Arc::from(input.as_str()),
            source: "faulty.txt".to_string(),
            chunk_lines: 10,
        })
        .await
        .unwrap();

    loop {
        match next_event(&mut event_rx).await {
            ParseEvent::Progress { .. } => continue,
            ParseEvent::Error { error } => {
                assert!(matches!(error, RebatchError::ParseError { .. }));
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
    assert!(event_rx.recv().await.is_none());
}

#[tokio::test]
async fn empty_input_completes_with_empty_result() {
    let parser: Arc<dyn RecordParser> = Arc::new(TaggedLineParser::new());
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100);

    cmd_tx
        .send(ParseCommand::Parse {
            raw: Arc::from(""),
            source: "empty.txt".to_string(),
            chunk_lines: 10,
        })
        .await
        .unwrap();

    match next_event(&mut event_rx).await {
        ParseEvent::Done { result } => {
            assert!(result.records.is_empty());
            assert_eq!(result.stats.total_records, 0);
            assert!(!result.stats.has_errors());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

/// Records every slice it is handed, so tests can inspect the rejoin.
struct ProbingParser {
    inner: TaggedLineParser,
    slices: Arc<Mutex<Vec<String>>>,
}

impl RecordParser for ProbingParser {
    fn parse_chunk(&self, text: &str, source: &str) -> rebatch::Result<ChunkOutput> {
        self.slices.lock().unwrap().push(text.to_string());
        self.inner.parse_chunk(text, source)
    }
}

#[tokio::test]
async fn slices_are_rejoined_with_the_original_separator() {
    let input = "Event: a=1\r\nEvent: b=2\r\nEvent: c=3\r\n";
    let slices = Arc::new(Mutex::new(Vec::new()));
    let parser: Arc<dyn RecordParser> = Arc::new(ProbingParser {
        inner: TaggedLineParser::new(),
        slices: Arc::clone(&slices),
    });
    let (cmd_tx, mut event_rx, worker) = spawn_coordinator(parser, 100);

    let result = parse_to_done(&cmd_tx, &mut event_rx, input, 2).await;
    assert_eq!(result.stats.total_records, 3);

    let seen = slices.lock().unwrap().clone();
    assert_eq!(seen, vec!["Event: a=1\r\nEvent: b=2", "Event: c=3"]);

    cmd_tx.send(ParseCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}
