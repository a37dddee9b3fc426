use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zoning_rag_core::{
    AppConfig, AzureOpenAiEmbedder, AzureQueryPipeline, AzureSearchStore, IndexSchema,
    IndexStore, IngestionOptions, Ingestor, LopdfExtractor, QueryAnswer, TiktokenTokenizer,
    DEFAULT_PDF_DIR,
};

#[derive(Parser)]
#[command(name = "zoning-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the configured search index, replacing it if it already exists.
    CreateIndex,
    /// Chunk, embed and upload every PDF in the data directory.
    Ingest {
        /// Documents per embedding request and upload.
        #[arg(long, default_value_t = 64)]
        batch_size: usize,
        /// Embedding requests in flight at once.
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Folder holding the PDFs.
        #[arg(long, default_value = DEFAULT_PDF_DIR)]
        pdf_dir: PathBuf,
    },
    /// Answer questions from the indexed PDFs. Reads questions from stdin when
    /// no question is given.
    Ask {
        #[arg(long)]
        question: Option<String>,
        /// Number of chunks to retrieve as context.
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=50))]
        top_k: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        index = %config.search_index_name,
        "zoning-rag boot"
    );

    match cli.command {
        Command::CreateIndex => create_index(&config).await,
        Command::Ingest {
            batch_size,
            workers,
            pdf_dir,
        } => ingest(&config, batch_size, workers, pdf_dir).await,
        Command::Ask { question, top_k } => ask(&config, question, top_k as usize).await,
    }
}

async fn create_index(config: &AppConfig) -> anyhow::Result<()> {
    let store = AzureSearchStore::admin(config).context("failed to build search client")?;
    let schema = IndexSchema::for_chunks(
        store.index_name(),
        IngestionOptions::default().vector_dimensions,
    );

    store
        .create_or_replace_index(&schema)
        .await
        .with_context(|| format!("failed to create index {}", store.index_name()))?;

    println!("Index '{}' created.", store.index_name());
    Ok(())
}

async fn ingest(
    config: &AppConfig,
    batch_size: usize,
    workers: usize,
    pdf_dir: PathBuf,
) -> anyhow::Result<()> {
    let tokenizer = TiktokenTokenizer::for_encoding(&config.tokenizer_encoding)
        .context("failed to load tokenizer")?;
    info!(
        encoding = tokenizer.encoding(),
        pdf_dir = %pdf_dir.display(),
        "chunking with tokenizer"
    );
    let options = IngestionOptions {
        batch_size,
        workers,
        ..IngestionOptions::default()
    };

    let worker_config = config.clone();
    let store = AzureSearchStore::admin(config).context("failed to build search client")?;
    let ingestor = Ingestor::new(
        store,
        move || AzureOpenAiEmbedder::from_config(&worker_config),
        options,
    );

    let report = ingestor
        .ingest_folder(&pdf_dir, &LopdfExtractor, &tokenizer, |progress| {
            println!("Uploaded {} / {}", progress.uploaded, progress.total)
        })
        .await
        .with_context(|| format!("ingestion from {} failed", pdf_dir.display()))?;

    info!(
        files = report.files,
        documents = report.documents,
        batches = report.batches,
        finished_at = %Utc::now().to_rfc3339(),
        "ingestion finished"
    );
    println!("Ingestion complete.");
    Ok(())
}

async fn ask(config: &AppConfig, question: Option<String>, top_k: usize) -> anyhow::Result<()> {
    let pipeline =
        AzureQueryPipeline::from_config(config).context("failed to build query clients")?;

    if let Some(question) = question {
        let answer = pipeline.ask(&question, top_k).await?;
        print_answer(&answer);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match pipeline.ask(question, top_k).await {
            Ok(answer) => print_answer(&answer),
            Err(error) => {
                warn!(%error, "question failed");
                eprintln!("error: {error}");
            }
        }
    }

    Ok(())
}

fn print_answer(answer: &QueryAnswer) {
    println!("{}", answer.answer);
    println!();
    println!("Retrieved sources:");
    for chunk in &answer.chunks {
        println!("[{} (page {})]", chunk.source_file, chunk.page_number);
        println!("{}", chunk.content);
        println!();
    }
}
