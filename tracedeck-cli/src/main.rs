// Copyright 2025 Tracedeck Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tracedeck CLI
//!
//! Command-line interface for browsing and scoring LLM call-trace logs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracedeck_client::{
    BackendConfig, DirLogSource, HttpLogSource, LogSource, DEFAULT_BASE_URL,
};
use tracedeck_core::CallRecord;
use tracedeck_query::{LogStore, RecordFilter, UNKNOWN_MODEL};
use tracing::{debug, info, Level};

mod render;

use render::{format_timestamp, render_forest};

#[derive(Parser)]
#[command(name = "tracedeck")]
#[command(about = "Tracedeck - LLM call trace explorer", long_about = None)]
struct Cli {
    /// Log backend base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Read logs from a local directory of JSON files instead of the backend
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available log names
    Logs,

    /// Summarize the sessions in a log
    Sessions {
        /// Log name
        #[arg(long)]
        log: String,
    },

    /// Render the call hierarchy of one session as a tree
    Tree {
        /// Log name
        #[arg(long)]
        log: String,

        /// Session id; `adhoc-<timestamp>` selects an ungrouped record
        #[arg(long)]
        session: String,
    },

    /// List records matching filters
    Calls {
        /// Log name
        #[arg(long)]
        log: String,

        /// Restrict to one session
        #[arg(long)]
        session: Option<String>,

        /// Case-insensitive substring over messages, response, model, and frames
        #[arg(long)]
        contains: Option<String>,

        /// Regex over captured call sites (function or filename:lineno)
        #[arg(long)]
        regex: Option<String>,

        /// Exact model name
        #[arg(long)]
        model: Option<String>,

        /// Keep only records carrying tool calls
        #[arg(long)]
        has_tools: bool,

        /// Minimum token total
        #[arg(long)]
        min_tokens: Option<u32>,

        /// Keep records at or after this epoch timestamp
        #[arg(long)]
        since: Option<f64>,

        /// Keep records at or before this epoch timestamp
        #[arg(long)]
        until: Option<f64>,
    },

    /// Aggregate usage statistics for a log
    Stats {
        /// Log name
        #[arg(long)]
        log: String,
    },

    /// Score records through the backend evaluator
    ///
    /// Records come from the active source (`--dir` or the backend); scoring
    /// always posts to the backend at `--url`.
    Evaluate {
        /// Log name
        #[arg(long)]
        log: String,

        /// Restrict to one session
        #[arg(long)]
        session: Option<String>,
    },

    /// Fetch backend health metrics
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let source = log_source(&cli);

    match cli.command {
        Commands::Logs => {
            let names = source
                .available_logs()
                .await
                .context("Failed to list available logs")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else if names.is_empty() {
                println!("No logs available.");
            } else {
                println!("Available logs ({}):", names.len());
                for name in &names {
                    println!("  {}", name);
                }
            }
        }

        Commands::Sessions { log } => {
            let store = load_store(source.as_ref(), &log).await?;
            let sessions = store.sessions();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions in '{}'.", log);
            } else {
                println!("Sessions in '{}' ({}):", log, sessions.len());
                println!("{:-<60}", "");
                for summary in &sessions {
                    let marker = if summary.is_adhoc { "○" } else { "✓" };
                    println!("{} {}", marker, summary.id);
                    println!(
                        "    Records: {} ({} with full trace)",
                        summary.record_count, summary.traced_record_count
                    );
                    println!("    First:   {}", format_timestamp(summary.first_timestamp));
                    println!("    Last:    {}", format_timestamp(summary.last_timestamp));
                    println!(
                        "    Tokens:  {} ({} prompt, {} completion)",
                        summary.tokens.total_tokens,
                        summary.tokens.prompt_tokens,
                        summary.tokens.completion_tokens
                    );
                    if !summary.models.is_empty() {
                        println!("    Models:  {}", summary.models.join(", "));
                    }
                    println!();
                }
            }
        }

        Commands::Tree { log, session } => {
            let store = load_store(source.as_ref(), &log).await?;
            let forest = store.hierarchy(&session);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&forest)?);
            } else if forest.is_empty() {
                println!(
                    "✗ No call hierarchy for session '{}' (no records with a full stack trace)",
                    session
                );
            } else {
                let sites: usize = forest.iter().map(|n| n.subtree_node_count()).sum();
                let runs: usize = forest.iter().map(|n| n.subtree_run_count()).sum();
                println!(
                    "Call tree for session '{}' ({} call sites, {} runs):",
                    session, sites, runs
                );
                println!();
                print!("{}", render_forest(&forest));
            }
        }

        Commands::Calls {
            log,
            session,
            contains,
            regex,
            model,
            has_tools,
            min_tokens,
            since,
            until,
        } => {
            let store = load_store(source.as_ref(), &log).await?;

            let mut filter = RecordFilter::new();
            if let Some(session) = &session {
                filter = filter.with_session(session);
            }
            if let Some(needle) = contains {
                filter = filter.with_text(needle);
            }
            if let Some(pattern) = &regex {
                filter = filter
                    .matching_regex(pattern)
                    .with_context(|| format!("Invalid call-site pattern '{}'", pattern))?;
            }
            if let Some(model) = model {
                filter = filter.with_model(model);
            }
            if has_tools {
                filter = filter.with_tool_calls();
            }
            if let Some(min) = min_tokens {
                filter = filter.with_min_tokens(min);
            }
            if let Some(since) = since {
                filter = filter.with_since(since);
            }
            if let Some(until) = until {
                filter = filter.with_until(until);
            }

            let hits = store.filter(&filter);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                println!("Found {} records:", hits.len());
                for (i, record) in hits.iter().enumerate().take(20) {
                    println!("  {}. {}", i + 1, call_line(record));
                }
                if hits.len() > 20 {
                    println!("  ... and {} more", hits.len() - 20);
                }
            }
        }

        Commands::Stats { log } => {
            let store = load_store(source.as_ref(), &log).await?;
            let stats = store.stats();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Statistics for '{}'", log);
                println!("{:-<60}", "");
                println!("Records:      {}", stats.record_count);
                println!("Sessions:     {}", stats.session_count);
                println!("Full traces:  {}", stats.with_full_trace);
                println!("Tool calls:   {}", stats.tool_call_count);
                println!();
                println!("Tokens:");
                println!("  Prompt:     {}", stats.tokens.prompt_tokens);
                println!("  Completion: {}", stats.tokens.completion_tokens);
                println!("  Total:      {}", stats.tokens.total_tokens);
                if !stats.by_model.is_empty() {
                    println!();
                    println!("By model:");
                    for entry in &stats.by_model {
                        println!(
                            "  {} - {} calls, {} tokens",
                            entry.model, entry.call_count, entry.tokens.total_tokens
                        );
                    }
                }
            }
        }

        Commands::Evaluate { log, session } => {
            let store = load_store(source.as_ref(), &log).await?;
            let records: Vec<CallRecord> = match &session {
                Some(target) => {
                    let filter = RecordFilter::new().with_session(target);
                    store.filter(&filter).into_iter().cloned().collect()
                }
                None => store.records().to_vec(),
            };

            if records.is_empty() {
                println!("✗ No records to evaluate.");
                return Ok(());
            }

            let backend = HttpLogSource::new(BackendConfig::new(cli.url.clone()));
            info!(records = records.len(), "submitting records for evaluation");
            let scored = backend
                .evaluate_many(&records)
                .await
                .context("Evaluation request failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&scored)?);
            } else {
                println!("Evaluated {} records:", scored.len());
                for (i, entry) in scored.iter().enumerate() {
                    let mut line = format!(
                        "  {}. score {:.2}  {}",
                        i + 1,
                        entry.outcome.score,
                        format_timestamp(entry.record.timestamp)
                    );
                    if let Some(label) = &entry.outcome.label {
                        line.push_str(&format!("  ({})", label));
                    }
                    println!("{}", line);
                    if let Some(reasoning) = &entry.outcome.reasoning {
                        println!("     {}", reasoning);
                    }
                }

                let mean: f64 = scored.iter().map(|s| s.outcome.score).sum::<f64>()
                    / scored.len() as f64;
                println!();
                println!("✓ Mean score: {:.3}", mean);
            }
        }

        Commands::Metrics => {
            let backend = HttpLogSource::new(BackendConfig::new(cli.url.clone()));
            let metrics = backend
                .metrics()
                .await
                .context("Failed to fetch backend metrics")?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}

/// Pick the record source: a local directory when `--dir` is given, the HTTP
/// backend otherwise.
fn log_source(cli: &Cli) -> Box<dyn LogSource> {
    match &cli.dir {
        Some(dir) => Box::new(DirLogSource::new(dir)),
        None => Box::new(HttpLogSource::new(BackendConfig::new(cli.url.clone()))),
    }
}

async fn load_store(source: &dyn LogSource, name: &str) -> Result<LogStore> {
    let records = source
        .fetch_log(name)
        .await
        .with_context(|| format!("Failed to fetch log '{}'", name))?;
    debug!(log = name, records = records.len(), "fetched log");
    Ok(LogStore::from_records(records))
}

/// One-line human rendering of a record for the `calls` listing.
fn call_line(record: &CallRecord) -> String {
    let mut line = format!(
        "{}  {}",
        format_timestamp(record.timestamp),
        record.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    );
    let tokens = record.total_tokens();
    if tokens > 0 {
        line.push_str(&format!("  {} tokens", tokens));
    }
    if let Some(frame) = record.frames().last() {
        line.push_str(&format!(
            "  at {} ({}:{})",
            frame.function, frame.filename, frame.lineno
        ));
    }
    if let Some(session) = &record.session_id {
        line.push_str(&format!("  [{}]", session));
    }
    line
}
