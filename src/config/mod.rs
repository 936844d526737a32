// Configuration management module
// TOML settings for the embedding backend, chunking, generation and storage

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    BASE_DIR_ENV, Config, ConfigError, EmbeddingConfig, GenerationConfig, StorageConfig,
};

/// Get the base directory path used when none is given on the command line
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_base_dir()
}
