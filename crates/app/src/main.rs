use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use media_search_core::tools::tool_available;
use media_search_core::{
    CharacterNgramEmbedder, ChromaStore, Collaborators, Embedder, ExtractionDispatcher,
    FileOutcome, HttpEmbedder, HttpEmbedderConfig, IngestError, IngestionPipeline,
    IngestionReport, MemoryStore, PipelineOptions, QueryResult, QueryService, TimedSegment,
    TranscribeOptions, Transcriber, VectorStore, WhisperCli, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_ROOTS, DEFAULT_TOP_K,
};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PREVIEW_CHARS: usize = 100;
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser)]
#[command(name = "media-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend.
    #[arg(long, value_enum, default_value_t = StoreKind::Chroma)]
    store: StoreKind,

    /// Chroma base URL
    #[arg(long, env = "CHROMA_URL", default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Chroma collection
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Embedding backend.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// OpenAI-compatible embeddings endpoint, used with `--embedder http`.
    #[arg(long, env = "EMBEDDING_URL", default_value = "http://localhost:8080/v1/embeddings")]
    embedding_url: String,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// whisper.cpp command line binary
    #[arg(long, env = "WHISPER_BIN", default_value = "whisper-cli")]
    whisper_bin: PathBuf,

    /// whisper.cpp model file; audio and video fail without it.
    #[arg(long, env = "WHISPER_MODEL")]
    whisper_model: Option<PathBuf>,

    /// Where page images of OCR'd PDFs are written.
    #[arg(long, default_value = "extracted_images")]
    image_dir: PathBuf,

    /// Transcript JSON file, keyed by file name.
    #[arg(long, default_value = "voice_text.json")]
    transcripts: PathBuf,

    /// Paragraphs merged into one PDF chunk.
    #[arg(long, default_value_t = 3)]
    chunk_size: usize,

    /// Chunks shorter than this many characters are not indexed.
    #[arg(long, default_value_t = 30)]
    min_chunk_chars: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Chroma,
    Memory,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Ngram,
    Http,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and index every supported file under the given folders.
    Ingest {
        /// Folders walked recursively; defaults to ./pdf ./voice ./video.
        dirs: Vec<PathBuf>,
    },
    /// Run a single similarity query.
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Interactive query loop; type `exit` to quit.
    Repl {
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Ingest, then enter the query loop.
    Run {
        dirs: Vec<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

/// Stands in when no speech model is configured.
struct NoSpeechModel;

impl Transcriber for NoSpeechModel {
    fn transcribe(
        &self,
        _wav: &Path,
        _options: &TranscribeOptions,
    ) -> Result<Vec<TimedSegment>, IngestError> {
        Err(IngestError::external(
            "whisper",
            "no speech model configured (set --whisper-model or WHISPER_MODEL)",
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "media-search boot"
    );

    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder {
            dimensions: cli.embedding_dimensions,
        }),
        EmbedderKind::Http => Arc::new(HttpEmbedder::new(HttpEmbedderConfig {
            endpoint: cli.embedding_url.clone(),
            model: cli.embedding_model.clone(),
            api_key: cli.embedding_api_key.clone(),
            dimensions: cli.embedding_dimensions,
            ..Default::default()
        })?),
    };

    match cli.store {
        StoreKind::Chroma => {
            let store = ChromaStore::connect(&cli.chroma_url, &cli.collection).await?;
            run(&cli, Arc::new(store), embedder).await
        }
        StoreKind::Memory => run(&cli, Arc::new(MemoryStore::new()), embedder).await,
    }
}

async fn run<S: VectorStore + 'static>(
    cli: &Cli,
    store: Arc<S>,
    embedder: Arc<dyn Embedder>,
) -> anyhow::Result<()> {
    match &cli.command {
        Command::Ingest { dirs } => {
            ingest(cli, store, embedder, dirs).await?;
        }
        Command::Search { query, top_k } => {
            let service = QueryService::new(store, embedder);
            let results = service.search(query, *top_k).await?;
            print_results(query, &results);
        }
        Command::Repl { top_k } => {
            repl(&QueryService::new(store, embedder), *top_k).await?;
        }
        Command::Run { dirs, top_k } => {
            ingest(cli, store.clone(), embedder.clone(), dirs).await?;
            println!("\nAll documents processed. Entering search mode (type 'exit' to quit).\n");
            repl(&QueryService::new(store, embedder), *top_k).await?;
        }
    }

    Ok(())
}

fn pipeline_options(cli: &Cli) -> PipelineOptions {
    PipelineOptions {
        chunk_size: cli.chunk_size,
        min_chunk_chars: cli.min_chunk_chars,
        image_output_dir: cli.image_dir.clone(),
        transcript_path: cli.transcripts.clone(),
        ..Default::default()
    }
}

async fn ingest<S: VectorStore>(
    cli: &Cli,
    store: Arc<S>,
    embedder: Arc<dyn Embedder>,
    dirs: &[PathBuf],
) -> anyhow::Result<IngestionReport> {
    let options = pipeline_options(cli);

    for (tool, flag) in [("pdftoppm", "-v"), ("tesseract", "--version"), ("ffmpeg", "-version")] {
        if !tool_available(tool, flag) {
            warn!(tool, "external tool not found on PATH");
        }
    }

    let transcriber: Box<dyn Transcriber> = match &cli.whisper_model {
        Some(model) => Box::new(WhisperCli::load(&cli.whisper_bin, model)?),
        None => {
            warn!("no speech model configured; audio and video files will fail");
            Box::new(NoSpeechModel)
        }
    };

    let dispatcher = ExtractionDispatcher::new(Collaborators::system(&options, transcriber), &options)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("interrupt received; stopping after the current file (press Ctrl-C again to quit)");
            cancel.store(true, Ordering::SeqCst);

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("second interrupt received; exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
    };

    let pipeline = IngestionPipeline::new(dispatcher, &options, store, embedder)?.with_cancellation(cancel);

    let roots: Vec<PathBuf> = if dirs.is_empty() {
        DEFAULT_ROOTS.iter().map(PathBuf::from).collect()
    } else {
        dirs.to_vec()
    };

    let report = pipeline.ingest_directories(&roots).await;
    watcher.abort();

    for failed in report.failed() {
        warn!(file = %failed.display_name, outcome = ?failed.outcome, "file not fully indexed");
    }

    println!(
        "{} files: {} indexed, {} unsupported, {} failed, {} cancelled; {} records written at {}",
        report.files.len(),
        report.count(|outcome| matches!(outcome, FileOutcome::Indexed { .. })),
        report.count(|outcome| *outcome == FileOutcome::Unsupported),
        report.failed().count(),
        report.count(|outcome| *outcome == FileOutcome::Cancelled),
        report.indexed_records(),
        Utc::now().to_rfc3339()
    );

    Ok(report)
}

async fn repl<S: VectorStore>(service: &QueryService<S>, top_k: usize) -> anyhow::Result<()> {
    let interrupt = async {
        // An unavailable signal handler leaves only `exit` and end of input.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    query_loop(service, top_k, BufReader::new(tokio::io::stdin()), interrupt).await
}

/// Reads queries until `exit`, end of input or `interrupt` resolves.
async fn query_loop<S, R, I>(
    service: &QueryService<S>,
    top_k: usize,
    input: R,
    interrupt: I,
) -> anyhow::Result<()>
where
    S: VectorStore,
    R: AsyncBufRead + Unpin,
    I: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        print!("query> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            _ = &mut interrupt => {
                println!("\nbye");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") {
            println!("bye");
            break;
        }

        match service.search(query, top_k).await {
            Ok(results) => print_results(query, &results),
            Err(error) => println!("search failed: {error}\n"),
        }
    }

    Ok(())
}

fn print_results(query: &str, results: &[QueryResult]) {
    println!("\nquery: '{query}' (top {})\n", results.len());

    if results.is_empty() {
        println!("no similar documents found\n");
        return;
    }

    for (rank, result) in results.iter().enumerate() {
        println!("[{}] ID: {}", rank + 1, result.id);
        println!(
            "    kind: {}, file: {}",
            result.metadata.kind, result.metadata.display_name
        );
        println!("    similarity: {:.4} (higher is closer)", result.similarity);
        println!("    content: {}...\n", preview(&result.document, PREVIEW_CHARS));
    }
}

/// Single-line preview cut at a character boundary.
fn preview(text: &str, max_chars: usize) -> String {
    text.trim()
        .replace(['\r', '\n'], " ")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{preview, query_loop};
    use media_search_core::{CharacterNgramEmbedder, Embedder, MemoryStore, QueryService};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::BufReader;

    fn service() -> QueryService<MemoryStore> {
        let embedder: Arc<dyn Embedder> = Arc::new(CharacterNgramEmbedder::default());
        QueryService::new(Arc::new(MemoryStore::new()), embedder)
    }

    #[tokio::test]
    async fn interrupt_ends_the_query_loop_while_waiting_for_input() -> anyhow::Result<()> {
        // The writer half stays open, so reading never completes on its own.
        let (_writer, reader) = tokio::io::duplex(64);

        tokio::time::timeout(
            Duration::from_secs(5),
            query_loop(&service(), 5, BufReader::new(reader), async {}),
        )
        .await??;
        Ok(())
    }

    #[tokio::test]
    async fn exit_ends_the_query_loop_without_an_interrupt() -> anyhow::Result<()> {
        let input = BufReader::new(&b"first query\nEXIT\nnever read\n"[..]);

        tokio::time::timeout(
            Duration::from_secs(5),
            query_loop(&service(), 5, input, std::future::pending::<()>()),
        )
        .await??;
        Ok(())
    }

    #[test]
    fn preview_flattens_lines_and_truncates_on_chars() {
        let text = format!("  첫 줄\n둘째 줄 {}", "가".repeat(200));
        let shown = preview(&text, 10);
        assert_eq!(shown, "첫 줄 둘째 줄 가");
        assert_eq!(shown.chars().count(), 10);
    }

    #[test]
    fn short_text_is_kept_whole() {
        assert_eq!(preview("short", 100), "short");
    }
}
