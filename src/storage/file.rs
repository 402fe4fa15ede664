use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::{
    CacheStateRecord, DocumentRecord, MetadataRecord, TermChunkRecord, VectorRecord,
};
use crate::storage::adapter::{KeyValueAdapter, StoreName};
use crate::storage::memory::Stores;

/// File-backed reference adapter: one file per object store under a base
/// directory, each framed with a crc32 checksum of the JSON body. Stores are
/// loaded on `open` and rewritten after every mutation.
pub struct FileAdapter {
    base_dir: PathBuf,
    inner: Arc<RwLock<Stores>>,
}

impl FileAdapter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileAdapter {
            base_dir: base_dir.into(),
            inner: Arc::new(RwLock::new(Stores::default())),
        }
    }

    fn path(&self, store: StoreName) -> PathBuf {
        self.base_dir.join(format!("{}.store", store.as_str()))
    }

    fn guard_open(&self) -> Result<()> {
        if self.inner.read().opened {
            Ok(())
        } else {
            Err(Error::adapter("file adapter is not open"))
        }
    }

    fn frame(body: Vec<u8>) -> Vec<u8> {
        let checksum = crc32fast::hash(&body);
        let mut framed = Vec::with_capacity(4 + body.len());
        framed.extend_from_slice(&checksum.to_le_bytes());
        framed.extend_from_slice(&body);
        framed
    }

    fn unframe(path: &Path, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < 4 {
            return Err(Error::transaction(format!(
                "store file {} is truncated",
                path.display()
            )));
        }
        let stored = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let body = &data[4..];
        if crc32fast::hash(body) != stored {
            return Err(Error::transaction(format!(
                "store file {} failed its checksum",
                path.display()
            )));
        }
        Ok(body.to_vec())
    }

    fn encode<T: Serialize>(records: Vec<&T>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&records)?)
    }

    fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
        Ok(serde_json::from_slice(body)?)
    }

    fn encode_store(&self, store: StoreName) -> Result<Vec<u8>> {
        let stores = self.inner.read();
        match store {
            StoreName::Metadata => Self::encode(stores.metadata.values().collect()),
            StoreName::Terms => Self::encode(stores.terms.values().collect()),
            StoreName::Vectors => Self::encode(stores.vectors.values().collect()),
            StoreName::Documents => Self::encode(stores.documents.values().collect()),
            StoreName::CacheState => Self::encode(stores.cache_state.values().collect()),
        }
    }

    /// Rewrites one store file from the in-memory map. The body is encoded
    /// under the lock, the file write happens outside it.
    async fn persist(&self, store: StoreName) -> Result<()> {
        let body = self.encode_store(store)?;
        tokio::fs::write(self.path(store), Self::frame(body)).await?;
        Ok(())
    }

    async fn load_store(&self, store: StoreName) -> Result<()> {
        let path = self.path(store);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let body = Self::unframe(&path, &data)?;

        let mut stores = self.inner.write();
        match store {
            StoreName::Metadata => {
                for record in Self::decode::<MetadataRecord>(&body)? {
                    stores.metadata.insert(record.key.clone(), record);
                }
            }
            StoreName::Terms => {
                for record in Self::decode::<TermChunkRecord>(&body)? {
                    let key = (record.field.clone(), record.term.clone(), record.chunk);
                    stores.terms.insert(key, record);
                }
            }
            StoreName::Vectors => {
                for record in Self::decode::<VectorRecord>(&body)? {
                    let key = (record.field.clone(), record.doc_id.clone());
                    stores.vectors.insert(key, record);
                }
            }
            StoreName::Documents => {
                for record in Self::decode::<DocumentRecord>(&body)? {
                    stores.documents.insert(record.doc_id.clone(), record);
                }
            }
            StoreName::CacheState => {
                for record in Self::decode::<CacheStateRecord>(&body)? {
                    stores.cache_state.insert(record.key.clone(), record);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueAdapter for FileAdapter {
    async fn open(&self, version: u32) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        {
            let mut stores = self.inner.write();
            stores.clear_all();
        }
        for store in StoreName::ALL {
            self.load_store(store).await?;
        }
        self.inner.write().opened = true;
        debug!(dir = %self.base_dir.display(), version, "file adapter opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.write().opened = false;
        Ok(())
    }

    async fn delete_database(&self) -> Result<()> {
        {
            let mut stores = self.inner.write();
            stores.clear_all();
            stores.opened = false;
        }
        for store in StoreName::ALL {
            match tokio::fs::remove_file(self.path(store)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn put_metadata(&self, record: MetadataRecord) -> Result<()> {
        self.guard_open()?;
        self.inner.write().metadata.insert(record.key.clone(), record);
        self.persist(StoreName::Metadata).await
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<MetadataRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().metadata.get(key).cloned())
    }

    async fn delete_metadata(&self, key: &str) -> Result<()> {
        self.guard_open()?;
        self.inner.write().metadata.remove(key);
        self.persist(StoreName::Metadata).await
    }

    async fn put_term_chunk(&self, record: TermChunkRecord) -> Result<()> {
        self.guard_open()?;
        {
            let mut stores = self.inner.write();
            let key = (record.field.clone(), record.term.clone(), record.chunk);
            stores.terms.insert(key, record);
        }
        self.persist(StoreName::Terms).await
    }

    async fn put_term_chunks_batch(&self, records: Vec<TermChunkRecord>) -> Result<()> {
        self.guard_open()?;
        {
            let mut stores = self.inner.write();
            for record in records {
                let key = (record.field.clone(), record.term.clone(), record.chunk);
                stores.terms.insert(key, record);
            }
        }
        self.persist(StoreName::Terms).await
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
        self.persist(StoreName::Terms).await
    }

    async fn put_vector(&self, record: VectorRecord) -> Result<()> {
        self.guard_open()?;
        {
            let mut stores = self.inner.write();
            let key = (record.field.clone(), record.doc_id.clone());
            stores.vectors.insert(key, record);
        }
        self.persist(StoreName::Vectors).await
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
        self.persist(StoreName::Vectors).await
    }

    async fn put_document(&self, record: DocumentRecord) -> Result<()> {
        self.guard_open()?;
        self.inner
            .write()
            .documents
            .insert(record.doc_id.clone(), record);
        self.persist(StoreName::Documents).await
    }

    async fn put_documents_batch(&self, records: Vec<DocumentRecord>) -> Result<()> {
        self.guard_open()?;
        {
            let mut stores = self.inner.write();
            for record in records {
                stores.documents.insert(record.doc_id.clone(), record);
            }
        }
        self.persist(StoreName::Documents).await
    }

    async fn get_document(&self, doc_key: &str) -> Result<Option<DocumentRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().documents.get(doc_key).cloned())
    }

    async fn delete_document(&self, doc_key: &str) -> Result<()> {
        self.guard_open()?;
        self.inner.write().documents.remove(doc_key);
        self.persist(StoreName::Documents).await
    }

    async fn put_cache_state(&self, record: CacheStateRecord) -> Result<()> {
        self.guard_open()?;
        self.inner
            .write()
            .cache_state
            .insert(record.key.clone(), record);
        self.persist(StoreName::CacheState).await
    }

    async fn get_cache_state(&self, key: &str) -> Result<Option<CacheStateRecord>> {
        self.guard_open()?;
        Ok(self.inner.read().cache_state.get(key).cloned())
    }

    async fn clear_store(&self, store: StoreName) -> Result<()> {
        self.guard_open()?;
        self.inner.write().clear_store(store);
        self.persist(store).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.guard_open()?;
        self.inner.write().clear_all();
        for store in StoreName::ALL {
            self.persist(store).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Encoding;
    use chrono::Utc;

    fn chunk(term: &str) -> TermChunkRecord {
        TermChunkRecord {
            field: "title".to_string(),
            term: term.to_string(),
            chunk: 0,
            payload: b"[\"doc-1\"]".to_vec(),
            encoding: Encoding::Json,
            doc_frequency: 1,
            inverse_document_frequency: None,
            access_count: None,
            last_accessed_at: None,
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        adapter.open(1).await.unwrap();
        adapter.put_term_chunk(chunk("fox")).await.unwrap();
        adapter
            .put_document(DocumentRecord {
                doc_id: "doc-1".to_string(),
                payload: serde_json::json!({"title": "fox"}),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        adapter.close().await.unwrap();

        let reopened = FileAdapter::new(dir.path());
        reopened.open(1).await.unwrap();
        let loaded = reopened.get_term_chunk("title", "fox", 0).await.unwrap();
        assert_eq!(loaded.unwrap().payload, b"[\"doc-1\"]".to_vec());
        let doc = reopened.get_document("doc-1").await.unwrap().unwrap();
        assert_eq!(doc.payload["title"], "fox");
    }

    #[tokio::test]
    async fn corrupt_store_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        adapter.open(1).await.unwrap();
        adapter.put_term_chunk(chunk("fox")).await.unwrap();
        adapter.close().await.unwrap();

        let path = dir.path().join("terms.store");
        let mut data = std::fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        std::fs::write(&path, data).unwrap();

        let reopened = FileAdapter::new(dir.path());
        let err = reopened.open(1).await.unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::TransactionFailed);
    }

    #[tokio::test]
    async fn delete_database_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());
        adapter.open(1).await.unwrap();
        adapter.put_term_chunk(chunk("fox")).await.unwrap();
        adapter.delete_database().await.unwrap();

        assert!(!dir.path().join("terms.store").exists());
        let reopened = FileAdapter::new(dir.path());
        reopened.open(1).await.unwrap();
        assert!(reopened.get_term_chunk("title", "fox", 0).await.unwrap().is_none());
    }
}
