//! Persistent, embeddable full-text search engine.
//!
//! Documents are maps of field names to text. The engine tokenizes,
//! normalizes and indexes them into an inverted index persisted through a
//! keyed object-store adapter, keeping hot posting lists and document stats
//! in memory. Queries return ranked document ids or detailed hits with
//! stored payloads.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use veridex::core::config::EngineConfig;
//! use veridex::engine::SearchEngine;
//! use veridex::index::indexer::DocumentInput;
//! use veridex::search::query::SearchOptions;
//! use veridex::storage::memory::MemoryAdapter;
//!
//! # async fn run() -> veridex::core::error::Result<()> {
//! let config = EngineConfig::new("articles", vec!["title".into(), "body".into()]);
//! let mut engine = SearchEngine::new(config, Arc::new(MemoryAdapter::new()))?;
//!
//! let mut fields = HashMap::new();
//! fields.insert("title".to_string(), "Quick brown fox".to_string());
//! engine.add(DocumentInput::new("doc-1", fields)).await?;
//! engine.flush().await?;
//!
//! let hits = engine.search("fox", &SearchOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod compression;
pub mod core;
pub mod engine;
pub mod index;
pub mod scoring;
pub mod search;
pub mod storage;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::DocId;
pub use crate::engine::{SearchEngine, SearchHit};
pub use crate::index::indexer::DocumentInput;
pub use crate::search::query::{Fuzziness, SearchMode, SearchOptions};
pub use crate::storage::adapter::KeyValueAdapter;
pub use crate::storage::file::FileAdapter;
pub use crate::storage::memory::MemoryAdapter;
