//! Foreground pipeline controller and request fencing.
//!
//! The controller spawns the three background workers, owns their channels,
//! and issues monotonically increasing request identifiers. Responses whose
//! identifier is not the most recently issued one are dropped here, never by
//! the workers themselves: supersession is advisory, and a superseded task is
//! allowed to finish its current window before noticing.

use crate::error::{RebatchError, Result};
use crate::parse::coordinator::{parse_worker_loop, DEFAULT_RECORD_CEILING};
use crate::parse::records::{ParsedRecord, RecordParser};
use crate::preview::rules::{NamedItem, TemplateRegistry, TransformRule};
use crate::preview::worker::preview_worker_loop;
use crate::protocol::{
    ParseCommand, ParseEvent, PreviewCommand, PreviewEvent, RequestId, SearchCommand, SearchEvent,
};
use crate::search::worker::search_worker_loop;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 64;

/// Issues monotonically unique request ids and admits only the latest.
#[derive(Debug, Default)]
pub struct RequestFence {
    next_id: RequestId,
    latest: Option<RequestId>,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id and record it as the one to honor.
    pub fn issue(&mut self) -> RequestId {
        self.next_id += 1;
        self.latest = Some(self.next_id);
        self.next_id
    }

    /// True only for the most recently issued id.
    pub fn admit(&self, request_id: RequestId) -> bool {
        self.latest == Some(request_id)
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Stop honoring the given id (used when the caller cancels it).
    pub fn retire(&mut self, request_id: RequestId) {
        if self.latest == Some(request_id) {
            self.latest = None;
        }
    }
}

/// Handle to the three background workers plus the per-lane fences.
pub struct Pipeline {
    parse_tx: mpsc::Sender<ParseCommand>,
    parse_rx: mpsc::Receiver<ParseEvent>,
    search_tx: mpsc::Sender<SearchCommand>,
    search_rx: mpsc::Receiver<SearchEvent>,
    preview_tx: mpsc::Sender<PreviewCommand>,
    preview_rx: mpsc::Receiver<PreviewEvent>,
    search_fence: RequestFence,
    preview_fence: RequestFence,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn the pipeline with the default record ceiling.
    pub fn spawn(parser: Arc<dyn RecordParser>, templates: Arc<TemplateRegistry>) -> Self {
        Self::with_record_ceiling(parser, templates, DEFAULT_RECORD_CEILING)
    }

    pub fn with_record_ceiling(
        parser: Arc<dyn RecordParser>,
        templates: Arc<TemplateRegistry>,
        record_ceiling: usize,
    ) -> Self {
        let (parse_tx, parse_cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (parse_event_tx, parse_rx) = mpsc::channel(EVENT_BUFFER);
        let (search_tx, search_cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (search_event_tx, search_rx) = mpsc::channel(EVENT_BUFFER);
        let (preview_tx, preview_cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (preview_event_tx, preview_rx) = mpsc::channel(EVENT_BUFFER);

        let workers = vec![
            tokio::spawn(parse_worker_loop(
                parse_cmd_rx,
                parse_event_tx,
                parser,
                record_ceiling,
            )),
            tokio::spawn(search_worker_loop(search_cmd_rx, search_event_tx)),
            tokio::spawn(preview_worker_loop(
                preview_cmd_rx,
                preview_event_tx,
                templates,
            )),
        ];

        Self {
            parse_tx,
            parse_rx,
            search_tx,
            search_rx,
            preview_tx,
            preview_rx,
            search_fence: RequestFence::new(),
            preview_fence: RequestFence::new(),
            workers,
        }
    }

    /// Start a parse run over the given raw text.
    pub async fn parse(
        &self,
        raw: Arc<str>,
        source: impl Into<String>,
        chunk_lines: usize,
    ) -> Result<()> {
        self.parse_tx
            .send(ParseCommand::Parse {
                raw,
                source: source.into(),
                chunk_lines,
            })
            .await
            .map_err(|_| RebatchError::worker("parse worker unavailable"))
    }

    /// Next event from the current parse run.
    pub async fn next_parse_event(&mut self) -> Option<ParseEvent> {
        self.parse_rx.recv().await
    }

    /// Hand the search worker the record sequence to index.
    pub async fn init_search(&self, records: Arc<[ParsedRecord]>) -> Result<()> {
        self.search_tx
            .send(SearchCommand::Init { records })
            .await
            .map_err(|_| RebatchError::worker("search worker unavailable"))
    }

    /// Issue a search, superseding any in-flight one.
    pub async fn search(&mut self, query: impl Into<String>) -> Result<RequestId> {
        let request_id = self.search_fence.issue();
        self.search_tx
            .send(SearchCommand::Search {
                request_id,
                query: query.into(),
            })
            .await
            .map_err(|_| RebatchError::worker("search worker unavailable"))?;
        Ok(request_id)
    }

    /// Cancel the latest search, if one is still being honored.
    pub async fn cancel_search(&mut self) -> Result<()> {
        let Some(request_id) = self.search_fence.latest() else {
            return Ok(());
        };
        self.search_fence.retire(request_id);
        self.search_tx
            .send(SearchCommand::Cancel { request_id })
            .await
            .map_err(|_| RebatchError::worker("search worker unavailable"))
    }

    /// Next admitted search event; stale events are dropped silently.
    pub async fn next_search_event(&mut self) -> Option<SearchEvent> {
        while let Some(event) = self.search_rx.recv().await {
            let request_id = match &event {
                SearchEvent::Status { request_id, .. } => *request_id,
                SearchEvent::Result { request_id, .. } => *request_id,
            };
            if self.search_fence.admit(request_id) {
                return Some(event);
            }
            log::debug!("dropping stale search event for request {request_id}");
        }
        None
    }

    /// Request a preview, superseding any in-flight one.
    pub async fn preview(
        &mut self,
        items: Vec<NamedItem>,
        rules: Vec<TransformRule>,
    ) -> Result<RequestId> {
        let request_id = self.preview_fence.issue();
        self.preview_tx
            .send(PreviewCommand::Compute {
                request_id,
                items,
                rules,
            })
            .await
            .map_err(|_| RebatchError::worker("preview worker unavailable"))?;
        Ok(request_id)
    }

    /// Next admitted preview event; stale events are dropped silently.
    pub async fn next_preview_event(&mut self) -> Option<PreviewEvent> {
        while let Some(event) = self.preview_rx.recv().await {
            let request_id = match &event {
                PreviewEvent::Result { request_id, .. } => *request_id,
                PreviewEvent::Error { request_id, .. } => *request_id,
            };
            if self.preview_fence.admit(request_id) {
                return Some(event);
            }
            log::debug!("dropping stale preview event for request {request_id}");
        }
        None
    }

    /// Ask every worker to exit and wait for them.
    pub async fn shutdown(self) {
        let _ = self.parse_tx.send(ParseCommand::Shutdown).await;
        let _ = self.search_tx.send(SearchCommand::Shutdown).await;
        let _ = self.preview_tx.send(PreviewCommand::Shutdown).await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
