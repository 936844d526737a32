// Pipeline module
// Orchestrates ingestion, retrieval-backed analysis, uploads and diagnostics


use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::blob::{BlobStore, FsBlobStore, list_documents};
use crate::config::Config;
use crate::database::{Database, SimilarityResult, VectorStore};
use crate::embeddings::chunking::{ChunkingConfig, chunk_text};
use crate::embeddings::{
    Embedder, EmbeddingBackend, EmbeddingBackendKind, RemoteEmbeddingClient, TfidfVectorizer,
};
use crate::extractor::{DocumentKind, extract};
use crate::generation::{
    GenerationClient, GenerationError, GenerationOptions, Task, assemble_context, build_prompt,
};
use crate::retriever::Retriever;
use crate::session::Session;
use crate::{RagError, Result};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Chunks used as context for whole-corpus analyses
pub const ANALYSIS_CHUNKS: usize = 10;
pub const DEFAULT_TOP_K: usize = 3;
const SAMPLE_PREVIEW_CHARS: usize = 200;

pub type SharedBlobStore = Arc<dyn BlobStore + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub key: String,
    pub reason: String,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub backend: EmbeddingBackendKind,
    pub processed: Vec<String>,
    pub failed: Vec<FailedDocument>,
    pub chunks_stored: usize,
}

/// Result of a generation-backed action; failures carry a displayable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub text: String,
    pub cached: bool,
    pub error: Option<GenerationError>,
}

impl AnalysisOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-stage health information; each failure is kept as its message
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsReport {
    pub backend: EmbeddingBackendKind,
    pub blob_count: std::result::Result<usize, String>,
    /// Vocabulary size of the persisted vectorizer, if one is fitted
    pub vectorizer_features: std::result::Result<Option<usize>, String>,
    pub embedding_count: std::result::Result<i64, String>,
    pub sample_chunk: std::result::Result<Option<String>, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub name: String,
    pub result: std::result::Result<String, String>,
}

/// Settings the pipeline needs beyond its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub backend: EmbeddingBackendKind,
    pub max_features: usize,
    pub chunking: ChunkingConfig,
    pub document_prefix: String,
}

impl PipelineOptions {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            backend: config.embedding.backend,
            max_features: config.embedding.max_features,
            chunking: config.chunking.clone(),
            document_prefix: config.storage.document_prefix.clone(),
        }
    }
}

pub struct Pipeline {
    store: Arc<VectorStore>,
    blobs: SharedBlobStore,
    retriever: Retriever,
    remote: Option<RemoteEmbeddingClient>,
    generator: GenerationClient,
    options: PipelineOptions,
}

impl Pipeline {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        blobs: SharedBlobStore,
        remote: Option<RemoteEmbeddingClient>,
        generator: GenerationClient,
        options: PipelineOptions,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(&store), options.backend, remote.clone());
        Self {
            store,
            blobs,
            retriever,
            remote,
            generator,
            options,
        }
    }

    /// Open the store and build every collaborator from configuration
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let database = Database::initialize_from_config_dir(
            config.get_base_dir(),
            &config.storage.database_file,
        )
        .await?;
        let store = Arc::new(VectorStore::new(database));
        let blobs: SharedBlobStore = Arc::new(FsBlobStore::new(config.blob_root()));

        let remote = match config.embedding.backend {
            EmbeddingBackendKind::Remote => Some(RemoteEmbeddingClient::new(&config.embedding)?),
            EmbeddingBackendKind::Tfidf => None,
        };
        let generator = GenerationClient::new(&config.generation)?;

        Ok(Self::new(
            store,
            blobs,
            remote,
            generator,
            PipelineOptions::from_config(config),
        ))
    }

    #[inline]
    pub fn backend(&self) -> EmbeddingBackendKind {
        self.options.backend
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Supported documents under the configured prefix
    #[inline]
    pub fn list_documents(&self) -> Result<Vec<String>> {
        list_documents(self.blobs.as_ref(), &self.options.document_prefix)
    }

    /// Validate and store one uploaded file, returning its key
    #[inline]
    pub fn upload(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RagError::Blob(format!("Invalid file name: {name:?}")))?;

        if bytes.is_empty() {
            return Err(RagError::Blob(format!("{file_name} is empty")));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(RagError::Blob(format!(
                "{file_name} is {} bytes, larger than the {} MB limit",
                bytes.len(),
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let kind = DocumentKind::from_key(file_name)?;
        let key = format!("{}{file_name}", self.options.document_prefix);
        self.blobs.put(&key, bytes, kind.mime_type())?;

        info!("Uploaded {} ({} bytes)", key, bytes.len());
        Ok(key)
    }

    /// Upload several files, reporting each outcome
    #[inline]
    pub fn upload_many(&self, files: &[(String, Vec<u8>)]) -> Vec<UploadOutcome> {
        files
            .iter()
            .map(|(name, bytes)| UploadOutcome {
                name: name.clone(),
                result: self.upload(name, bytes).map_err(|e| e.to_string()),
            })
            .collect()
    }

    /// Extract, chunk, embed and store `keys`, replacing the previous corpus.
    ///
    /// Documents that cannot be read are skipped and reported. Embedding
    /// failures abort the run before anything is written.
    #[inline]
    pub async fn ingest(
        &self,
        keys: &[String],
        additional_context: Option<&str>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport {
            backend: self.options.backend,
            processed: Vec::new(),
            failed: Vec::new(),
            chunks_stored: 0,
        };

        let mut chunks = Vec::new();
        if let Some(extra) = additional_context
            .map(str::trim)
            .filter(|extra| !extra.is_empty())
        {
            chunks.push(extra.to_string());
        }

        for key in keys {
            match self.document_chunks(key) {
                Ok(document_chunks) if document_chunks.is_empty() => {
                    warn!("No text extracted from {}", key);
                    report.failed.push(FailedDocument {
                        key: key.clone(),
                        reason: "no extractable text".to_string(),
                    });
                }
                Ok(document_chunks) => {
                    debug!("{} produced {} chunks", key, document_chunks.len());
                    report.processed.push(key.clone());
                    chunks.extend(document_chunks);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", key, e);
                    report.failed.push(FailedDocument {
                        key: key.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        chunks.retain(|chunk| !chunk.trim().is_empty());
        if chunks.is_empty() {
            return Err(RagError::NoContent);
        }

        let embedder = self.ingestion_embedder(&chunks)?;
        info!(
            "Embedding {} chunks with the {} backend",
            chunks.len(),
            embedder.kind()
        );
        let vectors = embedder.embed(&chunks)?;

        report.chunks_stored = self
            .store
            .replace_all(&chunks, &vectors, embedder.vectorizer())
            .await?;

        info!(
            "Ingested {} documents ({} failed) into {} chunks",
            report.processed.len(),
            report.failed.len(),
            report.chunks_stored
        );
        Ok(report)
    }

    fn document_chunks(&self, key: &str) -> Result<Vec<String>> {
        let kind = DocumentKind::from_key(key)?;
        let bytes = self.blobs.get(key)?;
        let text = extract(&bytes, kind)?;
        Ok(chunk_text(&text, &self.options.chunking)?)
    }

    fn ingestion_embedder(&self, chunks: &[String]) -> Result<Embedder> {
        match self.options.backend {
            EmbeddingBackendKind::Tfidf => {
                let corpus = chunks.join(" ");
                let vectorizer =
                    TfidfVectorizer::fitted(self.options.max_features, &[corpus.as_str()])?;
                Ok(Embedder::Sparse(vectorizer))
            }
            EmbeddingBackendKind::Remote => self.remote.clone().map(Embedder::Dense).ok_or_else(
                || RagError::Embedding("Remote embedding backend is not configured".to_string()),
            ),
        }
    }

    #[inline]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SimilarityResult>> {
        self.retriever.retrieve(query, top_k).await
    }

    /// Run `task` over the most recently stored chunks
    #[inline]
    pub async fn analyze(
        &self,
        session: &mut Session,
        task: &Task,
        additional_context: Option<&str>,
        options: GenerationOptions,
    ) -> Result<AnalysisOutcome> {
        let results = self.retriever.retrieve("", ANALYSIS_CHUNKS).await?;
        let chunks: Vec<&str> = results.iter().map(|r| r.chunk.as_str()).collect();
        let context = assemble_context(&chunks, additional_context);

        Ok(self.generate(session, task, &context, options))
    }

    /// Run `task` over caller-supplied text
    #[inline]
    pub fn analyze_text(
        &self,
        session: &mut Session,
        text: &str,
        task: &Task,
        options: GenerationOptions,
    ) -> Result<AnalysisOutcome> {
        if text.trim().is_empty() {
            return Err(RagError::NoContent);
        }

        let context = assemble_context(&[text.trim()], None);
        Ok(self.generate(session, task, &context, options))
    }

    /// Answer `question` from the chunks most similar to it
    #[inline]
    pub async fn ask(
        &self,
        session: &mut Session,
        question: &str,
        top_k: usize,
        options: GenerationOptions,
    ) -> Result<AnalysisOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Generation(GenerationError::Validation(
                "Question cannot be empty".to_string(),
            )));
        }

        let results = self.retriever.retrieve(question, top_k).await?;
        let chunks: Vec<&str> = results.iter().map(|r| r.chunk.as_str()).collect();
        let context = assemble_context(&chunks, None);
        let task = Task::Answer {
            question: question.to_string(),
        };

        Ok(self.generate(session, &task, &context, options))
    }

    fn generate(
        &self,
        session: &mut Session,
        task: &Task,
        context: &str,
        options: GenerationOptions,
    ) -> AnalysisOutcome {
        let prompt = build_prompt(context, task);
        let cache_text = prompt.cache_text();
        let model = self.generator.model();

        if let Some(text) = session.cache_mut().get(model, &cache_text) {
            session.record(task.label(), text.clone());
            return AnalysisOutcome {
                text,
                cached: true,
                error: None,
            };
        }

        let request = self.generator.request(prompt, options);
        match self.generator.generate(&request) {
            Ok(text) => {
                session
                    .cache_mut()
                    .insert(model, &cache_text, text.clone());
                session.record(task.label(), text.clone());
                AnalysisOutcome {
                    text,
                    cached: false,
                    error: None,
                }
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                AnalysisOutcome {
                    text: e.user_message(),
                    cached: false,
                    error: Some(e),
                }
            }
        }
    }

    /// Check every stage, capturing failures instead of returning early
    #[inline]
    pub async fn diagnose(&self) -> DiagnosticsReport {
        let blob_count = self
            .list_documents()
            .map(|keys| keys.len())
            .map_err(|e| e.to_string());

        let vectorizer_features = self
            .store
            .load_vectorizer()
            .await
            .map(|vectorizer| vectorizer.map(|v| v.vocabulary_size()))
            .map_err(|e| e.to_string());

        let embedding_count = self.store.count().await.map_err(|e| e.to_string());

        let sample_chunk = self
            .store
            .sample_chunk()
            .await
            .map(|chunk| chunk.map(|c| c.chars().take(SAMPLE_PREVIEW_CHARS).collect()))
            .map_err(|e| e.to_string());

        DiagnosticsReport {
            backend: self.options.backend,
            blob_count,
            vectorizer_features,
            embedding_count,
            sample_chunk,
        }
    }
}
