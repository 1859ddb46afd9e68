use clap::{Parser, Subcommand};
use pdf_archive_core::{
    discover_pdf_files, ElasticIndex, FsBlobStorage, IngestOutcome, LopdfExtractor, PdfArchive,
    RedisCacheStore, ResponseCache, DEFAULT_TTL_SECS,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-archive", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = "http://localhost:9200")]
    elasticsearch_url: String,

    /// Index namespace holding the document corpus
    #[arg(long, env = "PDF_INDEX", default_value = "pdfs")]
    index: String,

    /// Redis URL for the response cache
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Directory the raw uploads are stored under
    #[arg(long, env = "STORAGE_DIR", default_value = "./storage")]
    storage_dir: String,

    /// Cached response time-to-live, in seconds
    #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
    cache_ttl_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one PDF, or every PDF under a folder.
    Ingest {
        /// PDF file or folder of PDFs.
        #[arg(long)]
        path: String,
        /// Identity to record as the uploader.
        #[arg(long, default_value = "cli")]
        uploader: String,
    },
    /// Run a cached, paginated search over the corpus.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Result page, 1-based.
        #[arg(long, default_value = "1")]
        page: u64,
    },
    /// List indexed documents, newest first.
    List {
        #[arg(long, default_value = "1")]
        page: u64,
    },
    /// Write the stored bytes of one indexed document to a file.
    Open {
        /// Document id as reported by ingest or search.
        #[arg(long)]
        id: String,
        /// Output path.
        #[arg(long)]
        out: String,
    },
    /// Drop every cached response.
    ClearCache,
    /// Full reset: blobs, index, and cache.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %chrono::Utc::now().to_rfc3339(),
        "pdf-archive boot"
    );

    let cache_store = RedisCacheStore::connect(&cli.redis_url)
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let archive = PdfArchive::new(
        ElasticIndex::new(&cli.elasticsearch_url, &cli.index),
        FsBlobStorage::new(&cli.storage_dir),
        LopdfExtractor,
        ResponseCache::new(cache_store, cli.cache_ttl_secs),
    );

    archive
        .ensure_ready()
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    match cli.command {
        Command::Ingest { path, uploader } => {
            let target = Path::new(&path);
            let files = if target.is_dir() {
                discover_pdf_files(target)
            } else {
                vec![target.to_path_buf()]
            };

            if files.is_empty() {
                anyhow::bail!("no pdf files found under {path}");
            }

            let mut indexed = 0usize;
            for file in files {
                let original_name = file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("document.pdf")
                    .to_string();
                let bytes = tokio::fs::read(&file).await?;

                match archive.ingest(&bytes, &original_name, &uploader).await {
                    Ok(IngestOutcome::Indexed { id, document }) => {
                        indexed += 1;
                        info!(id = %id, name = %original_name, tags = ?document.tags, "indexed");
                    }
                    Ok(IngestOutcome::Duplicate {
                        existing_id,
                        stored_path,
                    }) => {
                        println!("{original_name}: already indexed as {existing_id}");
                        if let Err(error) = archive.discard_blob(&stored_path) {
                            warn!(%error, path = %stored_path, "failed to discard duplicate blob");
                        }
                    }
                    Err(error) => {
                        warn!(%error, name = %original_name, "skipped pdf");
                    }
                }
            }

            println!("{indexed} document(s) indexed");
        }
        Command::Search { query, page } => {
            let result = archive
                .search(&query, page)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::List { page } => {
            let result = archive
                .list(page)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Open { id, out } => {
            let bytes = archive
                .open_document(&id)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            tokio::fs::write(&out, bytes).await?;
            println!("wrote {out}");
        }
        Command::ClearCache => {
            archive
                .clear_cache()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("cache cleared");
        }
        Command::Reset => {
            archive
                .reset_corpus()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("corpus reset");
        }
    }

    Ok(())
}
