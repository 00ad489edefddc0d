//! Streaming parse subsystem: record model, collaborator boundary, and the
//! chunked coordinator worker.

pub mod coordinator;
pub mod records;
pub mod tagged;

pub use coordinator::{parse_worker_loop, DEFAULT_CHUNK_LINES, DEFAULT_RECORD_CEILING};
pub use records::{ChunkOutput, ParseResult, ParseStatistics, ParsedRecord, RecordParser};
pub use tagged::TaggedLineParser;
