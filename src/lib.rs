pub mod anthropic;
pub mod chunking;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod freshness;
pub mod notebook;
pub mod prompt;
pub mod rag;
pub mod web;
