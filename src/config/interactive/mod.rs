
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, EmbeddingConfig, GenerationConfig};
use crate::embeddings::EmbeddingBackendKind;
use crate::embeddings::chunking::{ChunkingConfig, ChunkingStrategy};

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 DocuMind Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Choose how document chunks are turned into vectors.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Generation Configuration").bold().yellow());
    configure_generation(&mut config.generation)?;

    if config.embedding.backend == EmbeddingBackendKind::Remote {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_endpoint_reachable(&config.embedding.endpoint) {
            eprintln!("{}", style("✓ Embedding endpoint reachable!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not reach the embedding endpoint").yellow()
            );
            eprintln!("You can continue, but documents cannot be processed until it is reachable.");
        }

        if config.embedding.api_key().is_none() {
            eprintln!(
                "{} {}",
                style("⚠ Environment variable not set:").yellow(),
                style(&config.embedding.api_key_env).cyan()
            );
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Backend: {}", style(config.embedding.backend).cyan());
    eprintln!("  Endpoint: {}", style(&config.embedding.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  Retries: {} (base delay {} ms)",
        style(config.embedding.retry_attempts).cyan(),
        config.embedding.retry_base_delay_ms
    );
    eprintln!(
        "  TF-IDF Vocabulary Cap: {}",
        style(config.embedding.max_features).cyan()
    );
    eprintln!(
        "  API Key ({}): {}",
        config.embedding.api_key_env,
        api_key_status(config.embedding.api_key().is_some())
    );

    eprintln!();
    eprintln!("{}", style("Chunking Settings:").bold().yellow());
    eprintln!("  Strategy: {}", style(config.chunking.strategy).cyan());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!("  Overlap: {} words", style(config.chunking.overlap).cyan());
    eprintln!(
        "  Max Chunk Size: {} chars",
        style(config.chunking.max_chunk_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Generation Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.generation.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.generation.model).cyan());
    eprintln!(
        "  Temperature: {}",
        style(config.generation.temperature).cyan()
    );
    eprintln!("  Max Tokens: {}", style(config.generation.max_tokens).cyan());

    eprintln!();
    eprintln!("{}", style("Storage Settings:").bold().yellow());
    eprintln!(
        "  Database: {}",
        style(config.database_path().display()).cyan()
    );
    eprintln!("  Blob Root: {}", style(config.blob_root().display()).cyan());
    eprintln!(
        "  Document Prefix: {}",
        style(&config.storage.document_prefix).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn api_key_status(present: bool) -> console::StyledObject<&'static str> {
    if present {
        style("set").green()
    } else {
        style("not set").red()
    }
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config::new(base_dir))
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let backends = [EmbeddingBackendKind::Remote, EmbeddingBackendKind::Tfidf];
    let labels = &["Remote embedding API", "Local TF-IDF"];
    let default_index = backends
        .iter()
        .position(|&b| b == embedding.backend)
        .unwrap_or(0);

    let backend_index = Select::new()
        .with_prompt("Embedding method")
        .default(default_index)
        .items(labels)
        .interact()?;
    embedding.set_backend(backends[backend_index]);

    if embedding.backend == EmbeddingBackendKind::Tfidf {
        return Ok(());
    }

    let endpoint: String = Input::new()
        .with_prompt("Embedding endpoint")
        .default(embedding.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            EmbeddingConfig {
                endpoint: input.clone(),
                ..EmbeddingConfig::default()
            }
            .endpoint_url()
            .map(|_| ())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 64 {
                Err("Batch size must be 64 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.set_endpoint(endpoint)?;
    embedding.set_model(model)?;
    embedding.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let strategies = [ChunkingStrategy::Sentence, ChunkingStrategy::FixedSize];
    let labels = &["Sentence-based", "Fixed-size with overlap"];
    let default_index = strategies
        .iter()
        .position(|&s| s == chunking.strategy)
        .unwrap_or(0);

    let strategy_index = Select::new()
        .with_prompt("Chunking strategy")
        .default(default_index)
        .items(labels)
        .interact()?;
    chunking.strategy = strategies[strategy_index];

    Ok(())
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    let model: String = Input::new()
        .with_prompt("Generation model")
        .default(generation.model.clone())
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Creativity (temperature, 0.0 - 1.0)")
        .default(generation.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0.0 and 1.0")
            }
        })
        .interact_text()?;

    let max_tokens: u32 = Input::new()
        .with_prompt("Max response length (tokens)")
        .default(generation.max_tokens)
        .interact_text()?;

    generation.set_model(model)?;
    generation.set_temperature(temperature)?;
    generation.set_max_tokens(max_tokens)?;

    Ok(())
}

/// Any HTTP response, including 4xx, counts as reachable
fn test_endpoint_reachable(endpoint: &str) -> bool {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .http_status_as_error(false)
        .build()
        .into();

    agent.get(endpoint).call().is_ok()
}
