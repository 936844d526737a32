use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::extractor::{DocumentKind, extract};
use crate::generation::{GenerationOptions, Task};
use crate::pipeline::{AnalysisOutcome, Pipeline};
use crate::session::{ResponseCache, Session};

/// Inputs shared by the generation-backed commands
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    /// Extra guidance prepended to the retrieved context
    pub context: Option<String>,
    /// Analyze this document directly instead of the stored corpus
    pub file: Option<PathBuf>,
    pub options: GenerationOptions,
}

fn load_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).context("Failed to load configuration")
}

async fn open_pipeline(config: &Config) -> Result<Pipeline> {
    Pipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")
}

fn open_session(config: &Config) -> Result<Session> {
    Session::load_or_new(
        &config.session_path(),
        ResponseCache::new(config.generation.cache_capacity),
    )
    .context("Failed to load session")
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .context("Invalid progress template")?,
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Copy local files into the document store
#[inline]
pub async fn upload_files(base_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let pipeline = open_pipeline(&load_config(base_dir)?).await?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        files.push((path.to_string_lossy().into_owned(), bytes));
    }

    let outcomes = pipeline.upload_many(&files);
    let uploaded = outcomes.iter().filter(|o| o.result.is_ok()).count();

    for outcome in &outcomes {
        match outcome.result {
            Ok(ref key) => println!("✅ {} → {}", outcome.name, key),
            Err(ref e) => println!("❌ {}: {}", outcome.name, e),
        }
    }
    println!();
    println!("Uploaded {} of {} files", uploaded, outcomes.len());

    Ok(())
}

/// List the supported documents available for ingestion
#[inline]
pub async fn list_documents(base_dir: &Path) -> Result<()> {
    let pipeline = open_pipeline(&load_config(base_dir)?).await?;
    let keys = pipeline
        .list_documents()
        .context("Failed to list documents")?;

    if keys.is_empty() {
        println!("No documents have been uploaded yet.");
        println!("Use 'documind upload <file>...' to add some.");
        return Ok(());
    }

    println!("Documents ({} total):", keys.len());
    for key in &keys {
        println!("  📄 {}", key);
    }

    Ok(())
}

/// Extract, chunk and embed every stored document, replacing the index
#[inline]
pub async fn ingest_documents(base_dir: &Path, context: Option<&str>) -> Result<()> {
    let config = load_config(base_dir)?;
    let pipeline = open_pipeline(&config).await?;
    let mut session = open_session(&config)?;
    let keys = pipeline
        .list_documents()
        .context("Failed to list documents")?;

    info!("Ingesting {} documents", keys.len());
    let bar = spinner(&format!(
        "Processing {} documents with {}",
        keys.len(),
        pipeline.backend()
    ))?;
    let result = pipeline.ingest(&keys, context).await;
    bar.finish_and_clear();
    let report = result.context("Ingestion failed")?;

    println!("{}", style("📚 Ingestion complete").bold().green());
    println!("  Backend: {}", report.backend);
    println!("  Documents processed: {}", report.processed.len());
    println!("  Chunks stored: {}", report.chunks_stored);

    session.mark_processed(report.processed.clone());
    session.save(&config.session_path())?;

    if !report.failed.is_empty() {
        println!("  {}", style("Skipped documents:").yellow());
        for failed in &report.failed {
            println!("    ⚠️  {}: {}", failed.key, failed.reason);
        }
    }

    Ok(())
}

/// Print the chunks most similar to `query`
#[inline]
pub async fn search(base_dir: &Path, query: &str, top_k: usize) -> Result<()> {
    let pipeline = open_pipeline(&load_config(base_dir)?).await?;
    let results = pipeline.search(query, top_k).await?;

    if results.is_empty() {
        println!("No matching chunks found.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{} {}",
            style(format!("#{} ({:.3})", rank + 1, result.similarity)).bold(),
            result.chunk
        );
        println!();
    }

    Ok(())
}

/// Run a summarization, classification or prediction task
#[inline]
pub async fn run_analysis(base_dir: &Path, task: &Task, input: AnalysisInput) -> Result<()> {
    let config = load_config(base_dir)?;
    let pipeline = open_pipeline(&config).await?;
    let mut session = open_session(&config)?;

    let outcome = if let Some(path) = input.file {
        let kind = DocumentKind::from_key(&path.to_string_lossy())?;
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut text = extract(&bytes, kind)?;
        if let Some(context) = input
            .context
            .as_deref()
            .map(str::trim)
            .filter(|context| !context.is_empty())
        {
            text = format!("{context} {text}");
        }
        pipeline.analyze_text(&mut session, &text, task, input.options)?
    } else {
        warn_if_unprocessed(&session);
        pipeline
            .analyze(&mut session, task, input.context.as_deref(), input.options)
            .await?
    };

    print_outcome(&task.label(), &outcome);
    session.save(&config.session_path())
}

/// Answer a question grounded in the most relevant chunks
#[inline]
pub async fn ask(
    base_dir: &Path,
    question: &str,
    top_k: usize,
    options: GenerationOptions,
) -> Result<()> {
    let config = load_config(base_dir)?;
    let pipeline = open_pipeline(&config).await?;
    let mut session = open_session(&config)?;
    warn_if_unprocessed(&session);

    let outcome = pipeline.ask(&mut session, question, top_k, options).await?;
    print_outcome("Answer", &outcome);
    session.save(&config.session_path())
}

fn warn_if_unprocessed(session: &Session) {
    if !session.documents_processed() {
        println!(
            "{}",
            style("⚠️  No documents processed in this session yet, run 'documind ingest' first")
                .yellow()
        );
    }
}

/// Show the processed files and the most recent analyses of the saved session
#[inline]
pub fn show_history(base_dir: &Path, clear: bool) -> Result<()> {
    let config = load_config(base_dir)?;
    let session_path = config.session_path();

    if clear {
        if session_path.exists() {
            fs::remove_file(&session_path).with_context(|| {
                format!("Failed to remove session file: {}", session_path.display())
            })?;
        }
        println!("Session history cleared.");
        return Ok(());
    }

    let session = open_session(&config)?;
    println!("{}", style(format!("🗂️  Session {}", session.id())).bold());

    if session.documents_processed() {
        println!("  Processed files ({}):", session.processed_files().len());
        for file in session.processed_files() {
            println!("    📄 {}", file);
        }
    } else {
        println!("  No documents processed yet.");
    }

    println!(
        "  Cached responses: {} of {}",
        session.cache().len(),
        session.cache().capacity()
    );
    println!();

    if session.history().is_empty() {
        println!("No analyses yet.");
        return Ok(());
    }

    println!("Recent analyses ({} total):", session.history().len());
    for entry in session.recent_history() {
        println!(
            "{} {}",
            style(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            style(&entry.task).bold()
        );
        println!("  {}", entry.result);
    }

    Ok(())
}

fn print_outcome(label: &str, outcome: &AnalysisOutcome) {
    if outcome.is_success() {
        let suffix = if outcome.cached { " (cached)" } else { "" };
        println!("{}", style(format!("🧠 {label}{suffix}")).bold().cyan());
        println!();
        println!("{}", outcome.text);
    } else {
        println!("{}", style(format!("❌ {label} failed")).bold().red());
        println!("{}", outcome.text);
    }
}

/// Report the health of each pipeline stage
#[inline]
pub async fn show_diagnostics(base_dir: &Path) -> Result<()> {
    let pipeline = open_pipeline(&load_config(base_dir)?).await?;
    let report = pipeline.diagnose().await;

    println!("📊 DocuMind Diagnostics");
    println!("{}", "=".repeat(50));
    println!();
    println!("🤖 Embedding backend: {}", report.backend);

    match report.blob_count {
        Ok(count) => println!("   ✅ Documents available: {}", count),
        Err(ref e) => println!("   ❌ Document store: {}", e),
    }

    match report.vectorizer_features {
        Ok(Some(features)) => println!("   ✅ Vectorizer fitted ({} features)", features),
        Ok(None) => println!("   💤 Vectorizer: not fitted"),
        Err(ref e) => println!("   ❌ Vectorizer: {}", e),
    }

    match report.embedding_count {
        Ok(0) => println!("   💤 Embeddings: none stored, run 'documind ingest'"),
        Ok(count) => println!("   ✅ Embeddings stored: {}", count),
        Err(ref e) => println!("   ❌ Embeddings: {}", e),
    }

    match report.sample_chunk {
        Ok(Some(ref sample)) => println!("   📝 Sample chunk: {}", sample),
        Ok(None) => {}
        Err(ref e) => println!("   ❌ Sample chunk: {}", e),
    }

    Ok(())
}
