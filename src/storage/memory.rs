use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::error::{Error, Result};
use crate::core::types::{
    CacheStateRecord, DocumentRecord, MetadataRecord, TermChunkRecord, VectorRecord,
};
use crate::storage::adapter::{KeyValueAdapter, StoreName};

#[derive(Debug, Default)]
pub(crate) struct Stores {
    pub opened: bool,
    pub metadata: HashMap<String, MetadataRecord>,
    pub terms: HashMap<(String, String, u32), TermChunkRecord>,
    pub vectors: HashMap<(String, String), VectorRecord>,
    pub documents: HashMap<String, DocumentRecord>,
    pub cache_state: HashMap<String, CacheStateRecord>,
}

impl Stores {
    pub fn clear_store(&mut self, store: StoreName) {
        match store {
            StoreName::Metadata => self.metadata.clear(),
            StoreName::Terms => self.terms.clear(),
            StoreName::Vectors => self.vectors.clear(),
            StoreName::Documents => self.documents.clear(),
            StoreName::CacheState => self.cache_state.clear(),
        }
    }

    pub fn clear_all(&mut self) {
        for store in StoreName::ALL {
            self.clear_store(store);
        }
    }
}

/// In-memory reference adapter. Clones share the same underlying database,
/// so dropping an engine and opening another against a clone models a
/// restart against the same persisted state.
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    inner: Arc<RwLock<Stores>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        MemoryAdapter::default()
    }

    fn guard_open(&self) -> Result<()> {
        if self.inner.read().opened {
            Ok(())
        } else {
            Err(Error::adapter("memory adapter is not open"))
        }
    }
}

#[async_trait]
impl KeyValueAdapter for MemoryAdapter {
    async fn open(&self, _version: u32) -> Result<()> {
        self.inner.write().opened = true;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.write().opened = false;
        Ok(())
    }

    async fn delete_database(&self) -> Result<()> {
        let mut stores = self.inner.write();
        stores.clear_all();
        stores.opened = false;
        Ok(())
    }

    async fn put_metadata(&self, record: MetadataRecord) -> Result<()> {
        self.guard_open()?;
        self.inner.write().metadata.insert(record.key.clone(), record);
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<MetadataRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().metadata.get(key).cloned())
    }

    async fn delete_metadata(&self, key: &str) -> Result<()> {
        self.guard_open()?;
        self.inner.write().metadata.remove(key);
        Ok(())
    }

    async fn put_term_chunk(&self, record: TermChunkRecord) -> Result<()> {
        self.guard_open()?;
        let key = (record.field.clone(), record.term.clone(), record.chunk);
        self.inner.write().terms.insert(key, record);
        Ok(())
    }

    async fn put_term_chunks_batch(&self, records: Vec<TermChunkRecord>) -> Result<()> {
        self.guard_open()?;
        // Single lock acquisition, so the batch is applied atomically.
        let mut stores = self.inner.write();
        for record in records {
            let key = (record.field.clone(), record.term.clone(), record.chunk);
            stores.terms.insert(key, record);
        }
        Ok(())
    }

    async fn get_term_chunk(
        &self,
        field: &str,
        term: &str,
        chunk: u32,
    ) -> Result<Option<TermChunkRecord>> {
        self.guard_open()?;
        let key = (field.to_string(), term.to_string(), chunk);
        Ok(self.inner.read().terms.get(&key).cloned())
    }

    async fn delete_term_chunk(&self, field: &str, term: &str, chunk: u32) -> Result<()> {
        self.guard_open()?;
        let key = (field.to_string(), term.to_string(), chunk);
        self.inner.write().terms.remove(&key);
        Ok(())
    }

    async fn put_vector(&self, record: VectorRecord) -> Result<()> {
        self.guard_open()?;
        let key = (record.field.clone(), record.doc_id.clone());
        self.inner.write().vectors.insert(key, record);
        Ok(())
    }

    async fn get_vector(&self, field: &str, doc_key: &str) -> Result<Option<VectorRecord>> {
        self.guard_open()?;
        let key = (field.to_string(), doc_key.to_string());
        Ok(self.inner.read().vectors.get(&key).cloned())
    }

    async fn delete_vector(&self, field: &str, doc_key: &str) -> Result<()> {
        self.guard_open()?;
        let key = (field.to_string(), doc_key.to_string());
        self.inner.write().vectors.remove(&key);
        Ok(())
    }

    async fn put_document(&self, record: DocumentRecord) -> Result<()> {
        self.guard_open()?;
        self.inner
            .write()
            .documents
            .insert(record.doc_id.clone(), record);
        Ok(())
    }

    async fn put_documents_batch(&self, records: Vec<DocumentRecord>) -> Result<()> {
        self.guard_open()?;
        let mut stores = self.inner.write();
        for record in records {
            stores.documents.insert(record.doc_id.clone(), record);
        }
        Ok(())
    }

    async fn get_document(&self, doc_key: &str) -> Result<Option<DocumentRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().documents.get(doc_key).cloned())
    }

    async fn delete_document(&self, doc_key: &str) -> Result<()> {
        self.guard_open()?;
        self.inner.write().documents.remove(doc_key);
        Ok(())
    }

    async fn put_cache_state(&self, record: CacheStateRecord) -> Result<()> {
        self.guard_open()?;
        self.inner
            .write()
            .cache_state
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn get_cache_state(&self, key: &str) -> Result<Option<CacheStateRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().cache_state.get(key).cloned())
    }

    async fn clear_store(&self, store: StoreName) -> Result<()> {
        self.guard_open()?;
        self.inner.write().clear_store(store);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.guard_open()?;
        self.inner.write().clear_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunk(field: &str, term: &str) -> TermChunkRecord {
        TermChunkRecord {
            field: field.to_string(),
            term: term.to_string(),
            chunk: 0,
            payload: vec![1, 2, 3],
            encoding: crate::core::types::Encoding::Json,
            doc_frequency: 1,
            inverse_document_frequency: None,
            access_count: None,
            last_accessed_at: None,
        }
    }

    #[tokio::test]
    async fn use_before_open_is_rejected() {
        let adapter = MemoryAdapter::new();
        let err = adapter.get_document("doc-1").await.unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::AdapterUnavailable);
    }

    #[tokio::test]
    async fn clones_share_the_database() {
        let adapter = MemoryAdapter::new();
        adapter.open(1).await.unwrap();
        adapter.put_term_chunk(chunk("title", "fox")).await.unwrap();

        let other = adapter.clone();
        let loaded = other.get_term_chunk("title", "fox", 0).await.unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn vectors_round_trip() {
        let adapter = MemoryAdapter::new();
        adapter.open(1).await.unwrap();
        adapter
            .put_vector(VectorRecord {
                field: "title".to_string(),
                doc_id: "doc-1".to_string(),
                vector: vec![0, 1, 2],
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let loaded = adapter.get_vector("title", "doc-1").await.unwrap().unwrap();
        assert_eq!(loaded.vector, vec![0, 1, 2]);
        adapter.delete_vector("title", "doc-1").await.unwrap();
        assert!(adapter.get_vector("title", "doc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_store_is_scoped() {
        let adapter = MemoryAdapter::new();
        adapter.open(1).await.unwrap();
        adapter.put_term_chunk(chunk("title", "fox")).await.unwrap();
        adapter
            .put_document(DocumentRecord {
                doc_id: "doc-1".to_string(),
                payload: serde_json::json!({"a": 1}),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        adapter.clear_store(StoreName::Terms).await.unwrap();
        assert!(adapter.get_term_chunk("title", "fox", 0).await.unwrap().is_none());
        assert!(adapter.get_document("doc-1").await.unwrap().is_some());
    }
}
