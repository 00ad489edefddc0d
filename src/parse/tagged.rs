//! Built-in record grammar: tagged key=value lines.
//!
//! One record per line, `Kind: key=value, key=value`. Lines starting with `#`
//! are header metadata (`# key: value`). This is the grammar the bundled
//! binary and the integration tests run against; any other grammar can be
//! plugged in through [`RecordParser`].

use crate::error::Result;
use crate::parse::records::{ChunkOutput, ParsedRecord, RecordParser};

/// Parses `Kind: key=value, ...` lines into records.
///
/// Deterministic and side-effect-free: malformed lines become error
/// descriptors in the slice statistics, never a hard failure.
#[derive(Debug, Default)]
pub struct TaggedLineParser;

impl TaggedLineParser {
    pub fn new() -> Self {
        Self
    }
}

impl RecordParser for TaggedLineParser {
    fn parse_chunk(&self, text: &str, source: &str) -> Result<ChunkOutput> {
        let mut out = ChunkOutput::default();

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('#') {
                if let Some((key, value)) = header.split_once(':') {
                    out.metadata
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                continue;
            }

            let Some((kind, rest)) = line.split_once(':') else {
                out.stats
                    .errors
                    .push(format!("{source}: missing record delimiter in '{line}'"));
                continue;
            };

            let kind = kind.trim().to_string();
            let mut fields = Vec::new();
            for (i, token) in rest.split(',').enumerate() {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                match token.split_once('=') {
                    Some((key, value)) => {
                        fields.push((key.trim().to_string(), value.trim().to_string()));
                    }
                    // Bare token: keep the value under a positional key.
                    None => fields.push((format!("field{i}"), token.to_string())),
                }
            }

            if fields.is_empty() {
                out.stats
                    .warnings
                    .push(format!("{source}: record '{kind}' has no fields"));
            }

            out.stats.total_records += 1;
            *out.stats.type_counts.entry(kind.clone()).or_insert(0) += 1;
            out.records.push(ParsedRecord::new(kind, fields));
        }

        Ok(out)
    }
}
