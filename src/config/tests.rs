use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::embeddings::EmbeddingBackendKind;
    use crate::embeddings::chunking::ChunkingStrategy;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");

        let mut original_config = Config::new(temp_dir.path());
        original_config.embedding.backend = EmbeddingBackendKind::Tfidf;
        original_config.embedding.max_features = 250;
        original_config.chunking.strategy = ChunkingStrategy::FixedSize;
        original_config.generation.model = "open-mistral-7b".to_string();
        original_config.storage.document_prefix = "App2_PromptEng/".to_string();

        original_config.save().expect("should save config successfully");
        assert!(temp_dir.path().join("config.toml").exists());

        let loaded_config = Config::load(temp_dir.path()).expect("should load config successfully");
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn config_directory_creation() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let base_dir = temp_dir.path().join("nested").join(".documind");

        assert!(!base_dir.exists());

        Config::new(&base_dir)
            .save()
            .expect("should save config into a fresh directory");

        assert!(base_dir.is_dir());
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [embedding
            model = "mistral-embed"
            batch_size = "five"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_config_uses_defaults() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        fs::write(
            temp_dir.path().join("config.toml"),
            "[embedding]\nbackend = \"tfidf\"\n\n[chunking]\nstrategy = \"fixed_size\"\n",
        )
        .expect("should write config file");

        let config = Config::load(temp_dir.path()).expect("should load partial config");
        assert_eq!(config.embedding.backend, EmbeddingBackendKind::Tfidf);
        assert_eq!(config.embedding.batch_size, 5);
        assert_eq!(config.chunking.strategy, ChunkingStrategy::FixedSize);
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.generation.max_tokens, 500);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        fs::write(
            temp_dir.path().join("config.toml"),
            "[chunking]\nchunk_size = 100\noverlap = 50\n",
        )
        .expect("should write config file");

        assert!(Config::load(temp_dir.path()).is_err());
    }

    #[test]
    fn get_config_dir_returns_path() {
        let dir = get_config_dir().expect("should resolve a base directory");
        assert!(!dir.as_os_str().is_empty());
    }
}
