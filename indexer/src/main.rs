use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pubsearch_core::document::prepare_documents;
use pubsearch_core::ingest::read_records;
use pubsearch_core::persist::{load_snapshot, save_meta, save_snapshot, IndexPaths, MetaFile, FORMAT_VERSION};
use pubsearch_core::{build_with_cancel, BuildOptions, CancelFlag, InvalidRecordPolicy, LoadError};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the publication title index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from a CSV/JSON/JSONL file or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Log and drop records missing a required field instead of failing
        #[arg(long, default_value_t = false)]
        skip_invalid: bool,
        /// Keep records that repeat an earlier (title, link) pair
        #[arg(long, default_value_t = false)]
        keep_duplicates: bool,
        /// Abort the build if indexing runs longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run a query against a built snapshot and print JSON lines
    Search {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        query: String,
        /// Maximum number of results to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Load a snapshot, run all integrity checks and print its stats
    Verify {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

#[derive(Serialize)]
struct ResultLine<'a> {
    rank: usize,
    doc_id: u32,
    score: u32,
    #[serde(flatten)]
    doc: &'a pubsearch_core::Document,
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Build { input, output, skip_invalid, keep_duplicates, timeout_secs } => {
            let options = BuildOptions {
                on_invalid: if skip_invalid { InvalidRecordPolicy::Skip } else { InvalidRecordPolicy::Abort },
                dedup: !keep_duplicates,
            };
            build_index(&input, &output, &options, timeout_secs.map(Duration::from_secs))
        }
        Commands::Search { index, query, limit } => search_index(&index, &query, limit),
        Commands::Verify { index } => verify_index(&index),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Distinct exit codes let scripts tell "needs rebuild" from "needs redeploy".
fn exit_code_for(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<LoadError>() {
        Some(LoadError::NotFound(_)) => 3,
        Some(LoadError::VersionMismatch { .. }) => 4,
        Some(LoadError::Corrupt(_)) => 5,
        _ => 1,
    }
}

fn build_index(input: &str, output: &str, options: &BuildOptions, timeout: Option<Duration>) -> Result<()> {
    let records = read_records(Path::new(input))?;
    let docs = prepare_documents(records, options)?;
    tracing::info!(num_docs = docs.len(), "ingested documents");

    let cancel = CancelFlag::new();
    if let Some(timeout) = timeout {
        let watchdog = cancel.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            tracing::warn!(timeout_secs = timeout.as_secs(), "build deadline reached, cancelling");
            watchdog.cancel();
        });
    }
    let snapshot = build_with_cancel(docs, &cancel)?;
    let out_paths = IndexPaths::new(output);
    let checksum = save_snapshot(&out_paths, &snapshot).context("writing snapshot")?;

    let stats = snapshot.stats();
    let meta = MetaFile {
        format_version: FORMAT_VERSION,
        num_docs: stats.num_docs,
        num_terms: stats.num_terms,
        checksum,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
    };
    save_meta(&out_paths, &meta).context("writing meta.json")?;

    tracing::info!(output, num_docs = stats.num_docs, num_terms = stats.num_terms, "index build complete");
    Ok(())
}

fn search_index(index: &str, query: &str, limit: Option<usize>) -> Result<()> {
    let snapshot = load_snapshot(&IndexPaths::new(index))?;
    let hits = snapshot.search_hits(query)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (rank, hit) in hits.iter().take(limit.unwrap_or(usize::MAX)).enumerate() {
        // search_hits has already checked every id against the store
        let Some(doc) = snapshot.doc(hit.doc_id) else { continue };
        let line = ResultLine { rank: rank + 1, doc_id: hit.doc_id, score: hit.score, doc };
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
    }
    tracing::info!(query, total_hits = hits.len(), "search complete");
    Ok(())
}

fn verify_index(index: &str) -> Result<()> {
    let snapshot = load_snapshot(&IndexPaths::new(index))?;
    println!("{}", serde_json::to_string_pretty(&snapshot.stats())?);
    Ok(())
}
