use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use rebatch::preview::rules::{ItemStatus, NamedItem, TemplateRegistry, TransformRule};
use rebatch::preview::worker::preview_worker_loop;
use rebatch::protocol::{PreviewCommand, PreviewEvent};

const TIMEOUT_MS: u64 = 1000;

async fn next_event(rx: &mut mpsc::Receiver<PreviewEvent>) -> PreviewEvent {
    timeout(Duration::from_millis(TIMEOUT_MS), rx.recv())
        .await
        .expect("preview event timed out")
        .expect("preview channel closed unexpectedly")
}

fn spawn_worker() -> (
    mpsc::Sender<PreviewCommand>,
    mpsc::Receiver<PreviewEvent>,
    tokio::task::JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (event_tx, event_rx) = mpsc::channel(4);
    let templates = Arc::new(TemplateRegistry::with_builtins());
    let worker = tokio::spawn(preview_worker_loop(cmd_rx, event_tx, templates));
    (cmd_tx, event_rx, worker)
}

#[tokio::test]
async fn compute_request_round_trips_through_the_worker() {
    let (cmd_tx, mut event_rx, worker) = spawn_worker();

    cmd_tx
        .send(PreviewCommand::Compute {
            request_id: 1,
            items: vec![NamedItem::new(1, "Show - 101 - Intro")],
            rules: vec![TransformRule::pattern(
                "reorder",
                r"^(.+)\s-\s(\d+)\s-\s(.+)$",
                "$1   $3  Ep No. $2",
                0,
            )],
        })
        .await
        .unwrap();

    match next_event(&mut event_rx).await {
        PreviewEvent::Result {
            request_id,
            preview,
        } => {
            assert_eq!(request_id, 1);
            assert_eq!(preview.entries.len(), 1);
            assert_eq!(preview.entries[0].proposed_name, "Show   Intro  Ep No. 101");
            assert_eq!(preview.entries[0].status, ItemStatus::Valid);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    cmd_tx.send(PreviewCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn duplicate_proposals_are_classified_in_the_response() {
    let (cmd_tx, mut event_rx, worker) = spawn_worker();

    cmd_tx
        .send(PreviewCommand::Compute {
            request_id: 3,
            items: vec![
                NamedItem::new(1, "take-1"),
                NamedItem::new(2, "take-2"),
                NamedItem::new(3, "other"),
            ],
            rules: vec![TransformRule::pattern("collapse", r"take-\d", "take", 0)],
        })
        .await
        .unwrap();

    match next_event(&mut event_rx).await {
        PreviewEvent::Result { preview, .. } => {
            assert_eq!(preview.entries[0].status, ItemStatus::Duplicate);
            assert_eq!(preview.entries[1].status, ItemStatus::Duplicate);
            assert_eq!(preview.entries[2].status, ItemStatus::Valid);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    cmd_tx.send(PreviewCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn unknown_template_surfaces_as_a_request_error() {
    let (cmd_tx, mut event_rx, worker) = spawn_worker();

    cmd_tx
        .send(PreviewCommand::Compute {
            request_id: 7,
            items: vec![NamedItem::new(1, "anything")],
            rules: vec![TransformRule::pattern("tag", ".*", "{missing-template}", 0)],
        })
        .await
        .unwrap();

    match next_event(&mut event_rx).await {
        PreviewEvent::Error {
            request_id,
            message,
        } => {
            assert_eq!(request_id, 7);
            assert!(message.contains("missing-template"));
        }
        other => panic!("expected error event, got {other:?}"),
    }

    cmd_tx.send(PreviewCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn per_item_rule_failures_do_not_abort_the_batch() {
    let (cmd_tx, mut event_rx, worker) = spawn_worker();

    cmd_tx
        .send(PreviewCommand::Compute {
            request_id: 4,
            items: vec![
                NamedItem::new(1, "Show - 101 - Intro"),
                NamedItem::new(2, "untagged"),
            ],
            rules: vec![TransformRule::pattern("tag", ".*", "{episode-tag}", 0)],
        })
        .await
        .unwrap();

    match next_event(&mut event_rx).await {
        PreviewEvent::Result { preview, .. } => {
            assert_eq!(preview.entries[0].status, ItemStatus::Valid);
            assert_eq!(preview.entries[0].proposed_name, "Show   Intro  Ep No. 101");
            assert_eq!(preview.entries[1].status, ItemStatus::Error);
            assert!(preview.entries[1].error.is_some());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    cmd_tx.send(PreviewCommand::Shutdown).await.unwrap();
    worker.await.unwrap();
}
