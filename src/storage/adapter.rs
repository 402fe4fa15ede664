use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::types::{
    CacheStateRecord, DocumentRecord, MetadataRecord, TermChunkRecord, VectorRecord,
};

/// The five named object stores every adapter must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    Metadata,
    Terms,
    Vectors,
    Documents,
    CacheState,
}

impl StoreName {
    pub const ALL: [StoreName; 5] = [
        StoreName::Metadata,
        StoreName::Terms,
        StoreName::Vectors,
        StoreName::Documents,
        StoreName::CacheState,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Metadata => "metadata",
            StoreName::Terms => "terms",
            StoreName::Vectors => "vectors",
            StoreName::Documents => "documents",
            StoreName::CacheState => "cacheState",
        }
    }
}

/// Keyed object-store persistence adapter.
///
/// The engine is the sole writer for its configured database. Every
/// operation is atomic; the batch operations execute all their puts inside
/// one transaction with abort-on-error semantics, so callers never observe a
/// partially applied batch. `open` must idempotently create missing stores.
#[async_trait]
pub trait KeyValueAdapter: Send + Sync {
    async fn open(&self, version: u32) -> Result<()>;
    async fn close(&self) -> Result<()>;
    async fn delete_database(&self) -> Result<()>;

    async fn put_metadata(&self, record: MetadataRecord) -> Result<()>;
    async fn get_metadata(&self, key: &str) -> Result<Option<MetadataRecord>>;
    async fn delete_metadata(&self, key: &str) -> Result<()>;

    async fn put_term_chunk(&self, record: TermChunkRecord) -> Result<()>;
    /// Executes every put in a single transaction on the `terms` store.
    async fn put_term_chunks_batch(&self, records: Vec<TermChunkRecord>) -> Result<()>;
    async fn get_term_chunk(
        &self,
        field: &str,
        term: &str,
        chunk: u32,
    ) -> Result<Option<TermChunkRecord>>;
    async fn delete_term_chunk(&self, field: &str, term: &str, chunk: u32) -> Result<()>;

    async fn put_vector(&self, record: VectorRecord) -> Result<()>;
    async fn get_vector(&self, field: &str, doc_key: &str) -> Result<Option<VectorRecord>>;
    async fn delete_vector(&self, field: &str, doc_key: &str) -> Result<()>;

    async fn put_document(&self, record: DocumentRecord) -> Result<()>;
    /// Executes every put in a single transaction on the `documents` store.
    async fn put_documents_batch(&self, records: Vec<DocumentRecord>) -> Result<()>;
    async fn get_document(&self, doc_key: &str) -> Result<Option<DocumentRecord>>;
    async fn delete_document(&self, doc_key: &str) -> Result<()>;

    async fn put_cache_state(&self, record: CacheStateRecord) -> Result<()>;
    async fn get_cache_state(&self, key: &str) -> Result<Option<CacheStateRecord>>;

    async fn clear_store(&self, store: StoreName) -> Result<()>;
    async fn clear_all(&self) -> Result<()>;
}
