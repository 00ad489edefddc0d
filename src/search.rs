//! Search subsystem: flattened index cache and the windowed, cancellable
//! substring matcher.

pub mod index;
pub mod worker;

pub use index::SearchIndex;
pub use worker::{search_worker_loop, SEARCH_WINDOW};
