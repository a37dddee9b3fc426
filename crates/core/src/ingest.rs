use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::documents::{attach_vectors, build_documents};
use crate::embeddings::Embedder;
use crate::error::{IngestError, ServiceError};
use crate::extractor::PdfExtractor;
use crate::models::{DocumentRecord, IngestProgress, IngestionOptions, IngestionReport};
use crate::tokenizer::Tokenizer;
use crate::traits::IndexStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DEFAULT_PDF_DIR: &str = "data/pdfs";

/// `*.pdf` files directly inside `folder`, sorted by path.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

fn source_file_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Loads, chunks and builds records (without vectors) for every PDF in `folder`.
pub fn load_documents(
    folder: &Path,
    extractor: &dyn PdfExtractor,
    tokenizer: &dyn Tokenizer,
    config: ChunkingConfig,
) -> Result<(usize, Vec<DocumentRecord>), IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::MissingDirectory(folder.display().to_string()));
    }
    config.validate()?;

    let files = discover_pdf_files(folder);
    let mut documents = Vec::new();

    for path in &files {
        let source_file = source_file_name(path)?;
        let pages = extractor.extract_pages(path)?;
        let chunks = chunk_pages(tokenizer, &pages, config)?;
        info!(
            source_file = %source_file,
            pages = pages.len(),
            chunks = chunks.len(),
            "chunked pdf"
        );
        documents.extend(build_documents(&source_file, chunks));
    }

    if documents.is_empty() {
        return Err(IngestError::NoDocuments(folder.display().to_string()));
    }

    Ok((files.len(), documents))
}

pub fn partition_batches(
    documents: Vec<DocumentRecord>,
    batch_size: usize,
) -> Vec<Vec<DocumentRecord>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut documents = documents.into_iter().peekable();
    while documents.peek().is_some() {
        batches.push(documents.by_ref().take(batch_size).collect());
    }
    batches
}

/// Embeds record batches on a bounded pool of workers and uploads each batch
/// as soon as its embedding finishes.
///
/// Batches are uploaded in completion order, which need not be submission
/// order. Every worker builds its own embedder through the factory. Uploads
/// happen one at a time on the calling task, and the first failed batch ends
/// the run; batches uploaded before it stay in the store and embeddings still
/// in flight are aborted.
pub struct Ingestor<S, F> {
    store: S,
    embedder_factory: Arc<F>,
    options: IngestionOptions,
}

impl<S, F, E> Ingestor<S, F>
where
    S: IndexStore,
    F: Fn() -> Result<E, ServiceError> + Send + Sync + 'static,
    E: Embedder + 'static,
{
    pub fn new(store: S, embedder_factory: F, options: IngestionOptions) -> Self {
        Self {
            store,
            embedder_factory: Arc::new(embedder_factory),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest_folder<P>(
        &self,
        folder: &Path,
        extractor: &dyn PdfExtractor,
        tokenizer: &dyn Tokenizer,
        on_progress: P,
    ) -> Result<IngestionReport, IngestError>
    where
        P: FnMut(IngestProgress),
    {
        let config = ChunkingConfig::from(self.options.clone());
        let (files, documents) = load_documents(folder, extractor, tokenizer, config)?;
        let mut report = self.upload(documents, on_progress).await?;
        report.files = files;
        Ok(report)
    }

    pub async fn upload<P>(
        &self,
        documents: Vec<DocumentRecord>,
        mut on_progress: P,
    ) -> Result<IngestionReport, IngestError>
    where
        P: FnMut(IngestProgress),
    {
        if self.options.batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.options.workers == 0 {
            return Err(IngestError::InvalidArgument(
                "worker count must be at least 1".to_string(),
            ));
        }

        let total = documents.len();
        let batches = partition_batches(documents, self.options.batch_size);
        let batch_count = batches.len();
        info!(
            documents = total,
            batches = batch_count,
            workers = self.options.workers,
            "embedding and uploading"
        );

        let mut pending = batches.into_iter().enumerate();
        let mut in_flight = JoinSet::new();
        for (index, batch) in pending.by_ref().take(self.options.workers) {
            self.spawn_embedding(&mut in_flight, index, batch);
        }

        let mut uploaded = 0usize;
        while let Some(joined) = in_flight.join_next().await {
            let (index, batch) = joined.map_err(|error| IngestError::Worker(error.to_string()))??;
            if let Some((next, queued)) = pending.next() {
                self.spawn_embedding(&mut in_flight, next, queued);
            }
            self.store.upsert(&batch).await?;

            uploaded += batch.len();
            debug!(batch = index, size = batch.len(), "uploaded batch");
            on_progress(IngestProgress { uploaded, total });
        }

        Ok(IngestionReport {
            files: 0,
            documents: total,
            batches: batch_count,
            uploaded,
        })
    }

    fn spawn_embedding(
        &self,
        in_flight: &mut JoinSet<Result<(usize, Vec<DocumentRecord>), ServiceError>>,
        index: usize,
        mut batch: Vec<DocumentRecord>,
    ) {
        let factory = Arc::clone(&self.embedder_factory);
        let dimensions = self.options.vector_dimensions;

        in_flight.spawn(async move {
            let embedder = factory()?;
            let texts = batch
                .iter()
                .map(|document| document.content.clone())
                .collect::<Vec<_>>();
            let vectors = embedder.embed(&texts).await?;
            attach_vectors(&mut batch, vectors, dimensions)?;
            Ok((index, batch))
        });
    }
}
