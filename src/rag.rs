use crate::anthropic::AnthropicClient;
use crate::chunking::{Splitter, TextChunk};
use crate::database::{ScoredChunk, VectorStore};
use crate::document::load_txt_files;
use crate::embeddings::OpenAiClient;
use crate::freshness::IndexStamp;
use crate::prompt::{join_context, PromptStyle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Anything that can turn a question into an answer
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// Tunables for indexing and retrieval
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: u64,
    /// Vector size used when no embedding is available to infer it from
    pub vector_size: u64,
    pub prompt_style: PromptStyle,
    /// Directory holding the index stamp
    pub state_dir: PathBuf,
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    store: Box<dyn VectorStore>,
    openai: OpenAiClient,
    claude: AnthropicClient,
    splitter: Splitter,
    stamp: IndexStamp,
    settings: RagSettings,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(
        store: impl VectorStore + 'static,
        openai: OpenAiClient,
        claude: AnthropicClient,
        settings: RagSettings,
    ) -> Result<Self> {
        let splitter = Splitter::new(settings.chunk_size, settings.chunk_overlap)?;
        let stamp = IndexStamp::new(&settings.state_dir);

        Ok(RagEngine {
            store: Box::new(store),
            openai,
            claude,
            splitter,
            stamp,
            settings,
        })
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Load, split, embed and store every `.txt` file below `directory`.
    ///
    /// Returns the number of chunks written to the collection.
    pub async fn index_directory(&self, directory: &Path) -> Result<usize> {
        info!("Loading documents from {}", directory.display());
        let last_update = self.stamp.last_update();
        let documents = load_txt_files(directory, last_update)?;

        let chunks: Vec<TextChunk> = documents
            .iter()
            .flat_map(|document| self.splitter.split(document))
            .collect();
        info!("{} document chunks processed.", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .openai
            .embed_documents(&texts)
            .await
            .context("Failed to embed document chunks")?;

        let vector_size = embeddings
            .first()
            .map(|e| e.dimensions() as u64)
            .unwrap_or(self.settings.vector_size);

        self.store.recreate_collection(vector_size).await?;

        let stored = chunks.len();
        if stored > 0 {
            self.store.store_chunks(chunks, embeddings).await?;
        }
        self.stamp.touch()?;

        info!(
            "{} records loaded into collection '{}'.",
            stored,
            self.store.collection()
        );

        Ok(stored)
    }

    /// Retrieve the top-k chunks most similar to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        ensure_question(query)?;

        let query_embedding = self.openai.embed_query(query).await?;
        let results = self
            .store
            .search(query_embedding, self.settings.top_k)
            .await?;

        info!(
            "Found {} relevant segment(s) for query: '{}'",
            results.len(),
            query
        );
        for result in &results {
            debug!(
                "Segment: document_id={}, chunk_index={:?}, score={:.4}, length={}",
                result.chunk.document_id,
                result.chunk_index,
                result.score,
                result.chunk.text.chars().count()
            );
        }

        Ok(results)
    }

    /// Build the prompt from retrieved segments and ask Claude
    pub async fn construct_and_query(
        &self,
        query: &str,
        results: &[ScoredChunk],
    ) -> Result<String> {
        let context = join_context(results.iter().map(|r| &r.chunk));
        let style = self.settings.prompt_style;
        let prompt = style.render(&context, query);

        info!("Sending prompt to Claude with {} segment(s).", results.len());
        let answer = self.claude.ask(&prompt).await?;

        Ok(style.finish(answer))
    }

    /// Run the interactive question loop on stdin
    pub async fn run_query_loop(&self) -> Result<()> {
        info!(
            "Ready to answer questions from collection '{}'. Type 'exit' to quit.",
            self.store.collection()
        );

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\nYour question: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim();

            if question.eq_ignore_ascii_case("exit") {
                info!("Goodbye!");
                break;
            }
            if question.is_empty() {
                continue;
            }

            let answer = self.answer(question).await?;
            println!("\n{}", answer);
        }

        Ok(())
    }
}

#[async_trait]
impl Answerer for RagEngine {
    async fn answer(&self, question: &str) -> Result<String> {
        let results = self.retrieve(question).await?;
        self.construct_and_query(question, &results).await
    }
}

fn ensure_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(anyhow::anyhow!("Question must not be empty"));
    }
    Ok(())
}
