//! rebatch - streaming parse, search, and batch rename preview pipeline.
//!
//! Command-line driver: parses a structured file through the background
//! pipeline, prints the merged statistics, and optionally runs a substring
//! query over the parsed records.

use anyhow::Result;
use clap::{Arg, Command};
use rebatch::protocol::{ParseEvent, SearchEvent};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for development
    env_logger::init();

    let matches = Command::new("rebatch")
        .version(rebatch::VERSION)
        .about("Background pipeline for parsing, search, and batch rename previews")
        .arg(
            Arg::new("file")
                .help("Path to the structured file to parse")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .help("Substring query to run over the parsed records"),
        )
        .arg(
            Arg::new("chunk-lines")
                .long("chunk-lines")
                .value_parser(clap::value_parser!(usize))
                .default_value("2000")
                .help("Lines fed to the parser per slice"),
        )
        .get_matches();

    let file_path = PathBuf::from(
        matches
            .get_one::<String>("file")
            .expect("file argument is required"),
    );

    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", file_path.display());
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a regular file: {}", file_path.display());
    }

    let chunk_lines = *matches
        .get_one::<usize>("chunk-lines")
        .expect("chunk-lines has a default");
    let raw: Arc<str> = std::fs::read_to_string(&file_path)?.into();

    let parser = Arc::new(rebatch::TaggedLineParser::new());
    let templates = Arc::new(rebatch::TemplateRegistry::with_builtins());
    let mut pipeline = rebatch::Pipeline::spawn(parser, templates);

    pipeline
        .parse(raw, file_path.display().to_string(), chunk_lines)
        .await?;

    let result = loop {
        match pipeline.next_parse_event().await {
            Some(ParseEvent::Progress { fraction }) => {
                log::info!("parsed {:.0}%", fraction * 100.0);
            }
            Some(ParseEvent::Done { result }) => break result,
            Some(ParseEvent::EarlyStop { reason }) => {
                anyhow::bail!("{reason} (try a smaller file)");
            }
            Some(ParseEvent::Error { error }) => {
                anyhow::bail!("malformed input: {error}");
            }
            None => anyhow::bail!("parse worker exited unexpectedly"),
        }
    };

    println!(
        "{}: {} records",
        result.source, result.stats.total_records
    );
    for (kind, count) in &result.stats.type_counts {
        println!("  {kind}: {count}");
    }
    if result.stats.has_errors() {
        println!(
            "{} parse errors, first: {}",
            result.stats.errors.len(),
            result.stats.errors[0]
        );
    }
    if result.stats.has_warnings() {
        println!("{} parse warnings", result.stats.warnings.len());
    }

    if let Some(query) = matches.get_one::<String>("query") {
        let records: Arc<[_]> = result.records.clone().into();
        pipeline.init_search(Arc::clone(&records)).await?;
        pipeline.search(query.clone()).await?;

        loop {
            match pipeline.next_search_event().await {
                Some(SearchEvent::Status { .. }) => {}
                Some(SearchEvent::Result { matches, .. }) => {
                    println!("{} records match '{query}'", matches.len());
                    for index in matches.iter().take(10) {
                        println!("  #{index} [{}]", records[*index].kind);
                    }
                    break;
                }
                None => anyhow::bail!("search worker exited unexpectedly"),
            }
        }
    }

    pipeline.shutdown().await;
    Ok(())
}
