//! Rule-preview worker.
//!
//! Non-suspending by contract: one compute is bounded by batch size, so the
//! loop simply answers each request in turn.

use crate::preview::compute::compute_preview;
use crate::preview::rules::TemplateRegistry;
use crate::protocol::{PreviewCommand, PreviewEvent};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// Run the preview worker, processing commands from the controller.
pub async fn preview_worker_loop(
    mut rx: Receiver<PreviewCommand>,
    tx: Sender<PreviewEvent>,
    templates: Arc<TemplateRegistry>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PreviewCommand::Compute {
                request_id,
                items,
                rules,
            } => {
                let event = match compute_preview(&items, &rules, &templates) {
                    Ok(preview) => PreviewEvent::Result {
                        request_id,
                        preview,
                    },
                    Err(error) => {
                        log::warn!("preview request {request_id} failed: {error}");
                        PreviewEvent::Error {
                            request_id,
                            message: error.to_string(),
                        }
                    }
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            PreviewCommand::Shutdown => break,
        }
    }
}
