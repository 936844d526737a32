use clap::{Args, Parser, Subcommand};
use documind::Result;
use documind::commands::{
    AnalysisInput, ask, ingest_documents, list_documents, run_analysis, search, show_diagnostics,
    show_history, upload_files,
};
use documind::config::{Config, run_interactive_config, show_config};
use documind::generation::{GenerationOptions, SummaryStyle, Task};
use documind::pipeline::DEFAULT_TOP_K;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "documind")]
#[command(about = "Document analysis with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the database and uploaded documents
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct GenerationArgs {
    /// Sampling temperature override
    #[arg(long)]
    temperature: Option<f32>,
    /// Response length override
    #[arg(long)]
    max_tokens: Option<u32>,
}

impl From<GenerationArgs> for GenerationOptions {
    fn from(args: GenerationArgs) -> Self {
        Self {
            temperature: args.temperature,
            max_tokens: args.max_tokens,
        }
    }
}

#[derive(Args, Debug, Default)]
struct AnalysisArgs {
    /// Additional context placed before the document text
    #[arg(long)]
    context: Option<String>,
    /// Analyze this file directly instead of the ingested documents
    #[arg(long)]
    file: Option<PathBuf>,
    #[command(flatten)]
    generation: GenerationArgs,
}

impl From<AnalysisArgs> for AnalysisInput {
    fn from(args: AnalysisArgs) -> Self {
        Self {
            context: args.context,
            file: args.file,
            options: args.generation.into(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding, chunking and generation settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Upload documents (pdf, docx, doc, txt) to the document store
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List uploaded documents
    List,
    /// Extract, chunk and embed all uploaded documents
    Ingest {
        /// Additional context stored as the first chunk
        #[arg(long)]
        context: Option<String>,
    },
    /// Show the chunks most similar to a query; an empty query shows the newest chunks
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Summarize the documents
    Summarize {
        #[arg(long, value_enum, default_value_t)]
        style: SummaryStyle,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Classify the documents by type, topic, tone and audience
    Classify {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Predict outcomes or trends from the documents
    Predict {
        /// What to predict, e.g. "market trends"
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Ask a question answered from the most relevant chunks
    Ask {
        question: String,
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Show processed files and the most recent analyses of this session
    History {
        /// Forget the saved history, processed files and cached responses
        #[arg(long)]
        clear: bool,
    },
    /// Show the health of each pipeline stage
    Diagnose,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => Config::default_base_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Upload { files } => {
            upload_files(&base_dir, &files).await?;
        }
        Commands::List => {
            list_documents(&base_dir).await?;
        }
        Commands::Ingest { context } => {
            ingest_documents(&base_dir, context.as_deref()).await?;
        }
        Commands::Search { query, top_k } => {
            search(&base_dir, &query, top_k).await?;
        }
        Commands::Summarize { style, analysis } => {
            run_analysis(&base_dir, &Task::Summarize(style), analysis.into()).await?;
        }
        Commands::Classify { analysis } => {
            run_analysis(&base_dir, &Task::Classify, analysis.into()).await?;
        }
        Commands::Predict { target, analysis } => {
            run_analysis(&base_dir, &Task::Predict { target }, analysis.into()).await?;
        }
        Commands::Ask {
            question,
            top_k,
            generation,
        } => {
            ask(&base_dir, &question, top_k, generation.into()).await?;
        }
        Commands::History { clear } => {
            show_history(&base_dir, clear)?;
        }
        Commands::Diagnose => {
            show_diagnostics(&base_dir).await?;
        }
    }

    Ok(())
}
