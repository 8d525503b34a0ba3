use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use searchcore::{parse_document, parse_partial, DocumentId, Engine, EngineConfig, Namespace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Add, inspect and query a persistent TF-IDF search index", long_about = None)]
struct Cli {
    /// Index directory path
    #[arg(long, global = true, default_value = "./index")]
    index: PathBuf,
    /// Re-index documents after every update
    #[arg(long, global = true, default_value_t = false)]
    reindex_on_update: bool,
    /// Remove postings of deleted documents
    #[arg(long, global = true, default_value_t = false)]
    purge_on_delete: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add documents from a JSON/JSONL file or a directory of them
    Add {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print a stored document
    Get { id: String },
    /// Merge a JSON object of fields into a stored document
    Update { id: String, fields: String },
    /// Delete a stored document
    Delete { id: String },
    /// Re-index a stored document from its current content
    Reindex { id: String },
    /// Rank documents against a free-text query
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Set field boosts, e.g. `boost title=2 body=0.5`
    Boost {
        #[arg(required = true)]
        weights: Vec<String>,
    },
    /// Print every entry of one storage namespace
    Dump { namespace: Namespace },
    /// Print document count, field registry and token count
    Stats,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = EngineConfig::persistent(&cli.index)
        .reindex_on_update(cli.reindex_on_update)
        .purge_on_delete(cli.purge_on_delete);
    let engine = Engine::open(config)?;

    match cli.command {
        Commands::Add { input } => add_input(&engine, &input)?,
        Commands::Get { id } => match engine.get(&DocumentId::parse(&id)?)? {
            Some(doc) => print_json(&doc)?,
            None => return Err(anyhow!("document {id} not found")),
        },
        Commands::Update { id, fields } => {
            let value = serde_json::from_str(&fields).context("fields must be JSON")?;
            engine.update(&DocumentId::parse(&id)?, parse_partial(value)?)?;
        }
        Commands::Delete { id } => {
            if !engine.delete(&DocumentId::parse(&id)?)? {
                tracing::warn!(%id, "document was not stored");
            }
        }
        Commands::Reindex { id } => {
            let report = engine.reindex(&DocumentId::parse(&id)?)?;
            tracing::info!(%id, postings = report.postings, "reindexed");
        }
        Commands::Search { query, k } => {
            let hits = engine.search_with_limit(&query, Some(k.max(1)))?;
            print_json(&hits)?;
        }
        Commands::Boost { weights } => {
            engine.set_field_boosts(&parse_weights(&weights)?)?;
            print_json(&engine.field_boosts()?)?;
        }
        Commands::Dump { namespace } => {
            for (key, value) in engine.store().dump(namespace)? {
                println!("{key}\t{value}");
            }
        }
        Commands::Stats => {
            print_json(&serde_json::json!({
                "documents": engine.count()?,
                "tokens": engine.index().token_count()?,
                "fields": engine.field_boosts()?,
            }))?;
        }
    }
    engine.flush()?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_weights(raw: &[String]) -> Result<BTreeMap<String, f32>> {
    raw.iter()
        .map(|pair| {
            let (name, weight) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected field=weight, got {pair:?}"))?;
            let weight: f32 = weight
                .trim()
                .parse()
                .with_context(|| format!("bad weight for field {name:?}"))?;
            Ok((name.trim().to_string(), weight))
        })
        .collect()
}

fn collect_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files.sort();
    files
}

#[derive(Default)]
struct Tally {
    added: usize,
    failed: usize,
}

fn add_input(engine: &Engine, input: &Path) -> Result<()> {
    let files = collect_files(input);
    if files.is_empty() {
        return Err(anyhow!("no .json or .jsonl files under {}", input.display()));
    }
    let mut tally = Tally::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            add_jsonl(engine, &file, &mut tally)?;
        } else {
            add_json(engine, &file, &mut tally)?;
        }
    }
    tracing::info!(added = tally.added, failed = tally.failed, documents = engine.count()?, "ingested documents");
    Ok(())
}

fn add_jsonl(engine: &Engine, file: &Path, tally: &mut Tally) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        add_one(engine, value, tally)?;
    }
    Ok(())
}

fn add_json(engine: &Engine, file: &Path, tally: &mut Tally) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("{}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                add_one(engine, v, tally)?;
            }
        }
        other => add_one(engine, other, tally)?,
    }
    Ok(())
}

/// Bad documents and indexing failures are logged and counted; storage
/// failures stop the run.
fn add_one(engine: &Engine, value: serde_json::Value, tally: &mut Tally) -> Result<()> {
    let result = parse_document(value).and_then(|doc| engine.add(doc));
    match result {
        Ok(id) => {
            tracing::debug!(%id, "added");
            tally.added += 1;
        }
        Err(e) if e.is_storage() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "skipped document");
            tally.failed += 1;
        }
    }
    Ok(())
}
