pub mod chunking;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod openai;
pub mod query;
pub mod retrieval;
pub mod store;
pub mod stores;
pub mod tokenizer;
pub mod traits;

pub use chunking::{chunk_pages, chunk_text, token_windows, ChunkingConfig};
pub use config::AppConfig;
pub use documents::{attach_vectors, build_document_id, build_documents};
pub use embeddings::{AzureOpenAiEmbedder, Embedder};
pub use error::{Backend, ConfigError, IngestError, QueryError, ServiceError};
pub use extractor::{load_pdf_pages, LopdfExtractor, PdfExtractor};
pub use generation::{Answerer, AzureOpenAiChat, ChatMessage, ChatModel, ChatOptions, Role};
pub use ingest::{discover_pdf_files, load_documents, partition_batches, Ingestor, DEFAULT_PDF_DIR};
pub use models::{
    DocumentRecord, IngestProgress, IngestionOptions, IngestionReport, QueryAnswer,
    RetrievedChunk, TextChunk, DEFAULT_VECTOR_DIMENSIONS,
};
pub use openai::AzureOpenAiClient;
pub use query::{AzureQueryPipeline, QueryPipeline};
pub use retrieval::{assemble_context, Retriever};
pub use store::{IndexSchema, SearchRow};
pub use stores::{AzureSearchStore, MemoryIndex};
pub use tokenizer::{TiktokenTokenizer, TokenId, Tokenizer};
pub use traits::IndexStore;
