use anyhow::{Context, Result};
use clap::{Args, FromArgMatches, Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use claude_rag::anthropic::{AnthropicClient, AnthropicConfig};
use claude_rag::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use claude_rag::database::{QdrantClient, QdrantConfig, DEFAULT_COLLECTION};
use claude_rag::embeddings::{OpenAiClient, OpenAiConfig};
use claude_rag::notebook::{self, DEFAULT_EXEC_COUNTS};
use claude_rag::prompt::PromptStyle;
use claude_rag::rag::{Answerer, RagEngine, RagSettings};
use claude_rag::web::{self, AppState, DEFAULT_TITLE};

/// A RAG (Retrieval-Augmented Generation) assistant using OpenAI embeddings, Qdrant and Claude
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    debug: bool,

    /// Defaults to `serve`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the documents, then serve the web form (default)
    Serve(ServeArgs),
    /// Index the documents and exit
    Index(RagArgs),
    /// Answer one question from the existing index
    Ask {
        question: String,
        #[command(flatten)]
        rag: RagArgs,
    },
    /// Ask questions interactively from the terminal
    Chat(RagArgs),
    /// Show notebook cells with the given execution counts
    Cells {
        /// Path to the notebook
        #[arg(default_value = "main.ipynb")]
        notebook: PathBuf,
        /// Execution counts to report (repeatable)
        #[arg(long = "exec-count", value_name = "N")]
        exec_counts: Vec<i64>,
    },
}

#[derive(Args, Debug, Clone)]
struct RagArgs {
    /// Directory scanned recursively for .txt files
    #[arg(long, env = "RAG_DOCS_DIR", default_value = "syvilledesigns")]
    docs_dir: PathBuf,

    /// Directory for local index state (defaults to <docs-dir>/rag_state)
    #[arg(long, env = "RAG_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Vector store collection name
    #[arg(long, env = "RAG_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Chunk size in characters
    #[arg(long, env = "RAG_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between chunks in characters
    #[arg(long, env = "RAG_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "RAG_TOP_K", default_value_t = 5)]
    top_k: u64,

    /// Embedding dimension used when it cannot be inferred
    #[arg(long, env = "RAG_VECTOR_SIZE", default_value_t = 1536)]
    vector_size: u64,

    /// Prompt template sent to Claude
    #[arg(long, value_enum, default_value_t = PromptStyle::Grounded)]
    prompt_style: PromptStyle,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[command(flatten)]
    rag: RagArgs,

    /// Address the web form binds to
    #[arg(long, env = "RAG_BIND", default_value = "127.0.0.1:7860")]
    bind: SocketAddr,

    /// Page title of the web form
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,
}

impl ServeArgs {
    /// Serve arguments as if `serve` had been given with no flags
    fn defaults() -> Result<Self> {
        let command = <ServeArgs as Args>::augment_args(clap::Command::new("serve"));
        let matches = command.try_get_matches_from(["serve"])?;
        Ok(ServeArgs::from_arg_matches(&matches)?)
    }
}

impl RagArgs {
    fn settings(&self) -> RagSettings {
        RagSettings {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
            vector_size: self.vector_size,
            prompt_style: self.prompt_style,
            state_dir: self
                .state_dir
                .clone()
                .unwrap_or_else(|| self.docs_dir.join("rag_state")),
        }
    }

    /// Load configuration from environment and connect the remote clients
    fn engine(&self) -> Result<RagEngine> {
        let anthropic_config = AnthropicConfig::from_env()?;
        let openai_config = OpenAiConfig::from_env().context("Missing OPENAI_API_KEY")?;
        let qdrant_config = QdrantConfig::from_env().context("Missing QDRANT_URL")?;

        let qdrant = QdrantClient::new(qdrant_config, &self.collection)
            .context("Failed to initialize Qdrant client")?;

        RagEngine::new(
            qdrant,
            OpenAiClient::new(openai_config),
            AnthropicClient::new(anthropic_config),
            self.settings(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let command = match cli.command {
        Some(command) => command,
        None => Command::Serve(ServeArgs::defaults()?),
    };

    match command {
        Command::Serve(args) => {
            let engine = args.rag.engine()?;
            engine
                .index_directory(&args.rag.docs_dir)
                .await
                .context("Failed to index documents")?;

            let state = AppState::new(Arc::new(engine), &args.title);
            web::serve(args.bind, state).await?;
        }
        Command::Index(args) => {
            let engine = args.engine()?;
            let stored = engine
                .index_directory(&args.docs_dir)
                .await
                .context("Failed to index documents")?;
            info!("Indexed {} chunks", stored);
        }
        Command::Ask { question, rag } => {
            let engine = rag.engine()?;
            let answer = engine.answer(&question).await?;
            println!("{}", answer);
        }
        Command::Chat(args) => {
            let engine = args.engine()?;
            engine
                .run_query_loop()
                .await
                .context("Error in query loop")?;
        }
        Command::Cells {
            notebook: path,
            exec_counts,
        } => {
            let exec_counts = if exec_counts.is_empty() {
                DEFAULT_EXEC_COUNTS.to_vec()
            } else {
                exec_counts
            };
            let report = notebook::inspect(&path, &exec_counts)?;
            print!("{}", report);
        }
    }

    Ok(())
}
