use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use cocktail_advisor::indexer::load_cocktails;
use cocktail_advisor::rag::embeddings::EmbeddingGenerator;
use cocktail_advisor::rag::{Document, DocumentStore, QdrantDocumentStore};

#[derive(Parser, Debug)]
#[command(name = "cocktail-indexer")]
#[command(about = "Import the cocktails dataset into the vector store")]
struct Args {
    /// Cocktails CSV with name, ingredients and instructions columns
    #[arg(short, long, default_value = "data/cocktails.csv")]
    csv: PathBuf,

    /// Qdrant server URL
    #[arg(long, env = "COCKTAIL_QDRANT_URL", default_value = "http://localhost:6334")]
    qdrant_url: String,

    /// Qdrant collection name
    #[arg(long, env = "COCKTAIL_COLLECTION", default_value = "cocktails")]
    collection: String,

    /// Directory holding the ONNX embedding model and tokenizer files
    #[arg(long, env = "COCKTAIL_EMBEDDING_MODEL_DIR", default_value = "/app/models/bge-small-en-v1.5")]
    model_dir: String,

    /// Embedding dimension of the model
    #[arg(long, default_value_t = 384)]
    vector_size: u64,

    /// Documents embedded and written per request
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if !args.csv.exists() {
        anyhow::bail!("Dataset does not exist: {}", args.csv.display());
    }
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }

    println!("Reading cocktails from {}...", args.csv.display());
    let documents: Vec<Document> = load_cocktails(&args.csv)?
        .into_iter()
        .map(|record| record.into_document())
        .collect();
    println!("Processed {} cocktail documents", documents.len());

    if documents.is_empty() {
        println!("No cocktails found. Exiting.");
        return Ok(());
    }

    println!("Initializing embedding model...");
    let embeddings = EmbeddingGenerator::new(&args.model_dir).await?;

    println!("Connecting to Qdrant at {}...", args.qdrant_url);
    let store = QdrantDocumentStore::new(&args.qdrant_url, &args.collection, args.vector_size, embeddings).await?;

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut written = 0usize;
    let mut failed_batches: Vec<(usize, String)> = Vec::new();

    for (index, batch) in documents.chunks(args.batch_size).enumerate() {
        pb.set_message(format!("batch {}", index + 1));

        match store.add(batch.to_vec()).await {
            Ok(()) => written += batch.len(),
            Err(e) => {
                tracing::warn!("Failed to write batch {}: {}", index + 1, e);
                failed_batches.push((index + 1, e.to_string()));
            }
        }

        pb.inc(batch.len() as u64);
    }

    pb.finish_with_message("done");

    println!("\nDatabase initialization complete!");
    println!("  Cocktails written: {}/{}", written, documents.len());
    println!("  Batches failed:    {}", failed_batches.len());
    println!("  Collection:        {}", args.collection);
    println!("  Qdrant URL:        {}", args.qdrant_url);

    if !failed_batches.is_empty() {
        println!("\nFailed batches:");
        for (index, err) in &failed_batches {
            println!("  #{}: {}", index, err);
        }
        anyhow::bail!("{} batches failed", failed_batches.len());
    }

    Ok(())
}
