pub mod bulk;
pub mod snapshot;


use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, trace};

use crate::analysis::pipeline::Pipeline;
use crate::cache::lru::{CacheStats, TrackedLruCache};
use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::core::stats::{DocLengthEntry, DocumentStats};
use crate::core::types::{
    CacheStateRecord, DocId, DocumentRecord, MetadataRecord, TermChunkRecord, TermPosting,
    TokenMetadata,
};
use crate::compression::codec::PostingCodec;
use crate::index::indexer::{DocumentInput, IngestedDocument, Indexer};
use crate::index::postings::PostingsStore;
use crate::index::vocabulary::Vocabulary;
use crate::scoring::bm25::Bm25Scorer;
use crate::search::fuzzy::FuzzyExpander;
use crate::search::query::{
    build_query_tokens, determine_search_mode, posting_from_value, resolve_fuzzy_distance,
    SearchOptions, DEFAULT_LIMIT,
};
use crate::storage::adapter::KeyValueAdapter;

use bulk::{BulkCheckpoint, BulkOptions, BulkProgress, FailedDocument, RecoveryOptions};
use snapshot::{
    EngineSnapshot, SnapshotDocument, SnapshotPosting, WorkerPosting, WorkerSnapshot,
};

const SCHEMA_VERSION_KEY: &str = "schema-version";
const STATS_STATE_KEY: &str = "document-stats";
const VOCABULARY_STATE_KEY: &str = "vocabulary";
const PROGRESS_THROTTLE: Duration = Duration::from_millis(100);

/// Decoded posting list held in the term cache, keyed `field:term`.
#[derive(Debug, Clone)]
pub struct CachedPostings {
    pub postings: Vec<TermPosting>,
    pub doc_frequency: usize,
    pub idf: Option<f64>,
}

/// One result of `search_detailed`.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub stored: Option<Value>,
}

/// The search engine facade.
///
/// Owns the in-memory postings, dirty set, vocabulary, stats and caches for
/// its lifetime; the persistence adapter owns bytes at rest. Methods take
/// `&mut self`: the engine is single-owner cooperative, and cross-thread use
/// goes through snapshot handoff.
pub struct SearchEngine {
    config: EngineConfig,
    adapter: Arc<dyn KeyValueAdapter>,
    pipeline: Arc<Pipeline>,
    indexer: Indexer,
    opened: bool,

    postings: PostingsStore,
    stats: DocumentStats,
    stats_dirty: bool,
    vocabulary: Vocabulary,
    term_cache: TrackedLruCache<String, CachedPostings>,
    fuzzy: FuzzyExpander,
    /// Stored payloads queued by `add(persist = false)` and bulk ingestion,
    /// drained by the next flush.
    pending_documents: HashMap<String, Value>,
    scorer: Bm25Scorer,
}

impl SearchEngine {
    pub fn new(config: EngineConfig, adapter: Arc<dyn KeyValueAdapter>) -> Result<Self> {
        let pipeline = Arc::new(Pipeline::from_config(&config.pipeline)?);
        let term_cache = TrackedLruCache::new(config.cache.terms)?;
        Ok(SearchEngine {
            indexer: Indexer::new(pipeline.clone()),
            pipeline,
            adapter,
            opened: false,
            postings: PostingsStore::new(),
            stats: DocumentStats::new(),
            stats_dirty: false,
            vocabulary: Vocabulary::new(),
            term_cache,
            fuzzy: FuzzyExpander::new(),
            pending_documents: HashMap::new(),
            scorer: Bm25Scorer::default(),
            config,
        })
    }

    pub fn database_name(&self) -> &str {
        self.config
            .storage
            .db_name
            .as_deref()
            .unwrap_or(&self.config.name)
    }

    /// Term cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.term_cache.stats()
    }

    /// Opens the adapter once, stamps the schema version tag and hydrates
    /// stats and vocabulary from the cache-state blobs for warm restart.
    /// Later calls are no-ops; `&mut self` serialises callers.
    async fn ensure_open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        let version = self.config.storage.version;
        self.adapter.open(version).await?;

        let tag = self.adapter.get_metadata(SCHEMA_VERSION_KEY).await?;
        if tag.map(|record| record.value != Value::from(version)).unwrap_or(true) {
            self.adapter
                .put_metadata(MetadataRecord {
                    key: SCHEMA_VERSION_KEY.to_string(),
                    value: Value::from(version),
                    updated_at: Utc::now(),
                })
                .await?;
        }

        if let Some(record) = self.adapter.get_cache_state(STATS_STATE_KEY).await? {
            let entries: Vec<DocLengthEntry> = serde_json::from_slice(&record.payload)?;
            self.stats.load(entries);
        }
        if let Some(record) = self.adapter.get_cache_state(VOCABULARY_STATE_KEY).await? {
            let terms: Vec<String> = serde_json::from_slice(&record.payload)?;
            self.vocabulary.load(terms);
            self.fuzzy.invalidate();
        }

        self.opened = true;
        debug!(
            database = self.database_name(),
            version,
            documents = self.stats.document_count(),
            vocabulary = self.vocabulary.len(),
            "engine opened"
        );
        Ok(())
    }

    /// Indexes one document. With `persist` (the default path) the dirty
    /// postings and any stored payload are written immediately; otherwise
    /// they stay queued for the next flush.
    pub async fn add(&mut self, input: DocumentInput) -> Result<()> {
        self.add_with_options(input, true).await
    }

    pub async fn add_with_options(&mut self, input: DocumentInput, persist: bool) -> Result<()> {
        self.ensure_open().await?;
        let ingested = self.indexer.ingest(&input)?;
        if ingested.total_length == 0 {
            return Ok(());
        }

        let doc_key = input.id.key().into_owned();
        let mut touched = HashSet::new();
        self.apply_ingested(ingested, &mut touched);
        self.refresh_term_cache(&touched);

        if persist {
            self.persist_postings().await?;
            if let Some(payload) = input.store {
                self.adapter
                    .put_document(DocumentRecord {
                        doc_id: doc_key,
                        payload,
                        updated_at: Utc::now(),
                    })
                    .await?;
            }
        } else if let Some(payload) = input.store {
            self.pending_documents.insert(doc_key, payload);
        }
        Ok(())
    }

    /// Posting upserts, stats and vocabulary for one ingested document.
    /// Shared by `add` and the bulk paths (which skip per-document cache
    /// refresh and storage writes).
    fn apply_ingested(
        &mut self,
        ingested: IngestedDocument,
        touched: &mut HashSet<(String, String)>,
    ) {
        let doc_key = ingested.doc_id.key().into_owned();
        self.stats.add_document(&doc_key, ingested.total_length);
        self.stats_dirty = true;

        for (field, frequencies) in &ingested.field_frequencies {
            let metadata_map = ingested.field_metadata.get(field);
            for (term, frequency) in frequencies {
                let metadata = metadata_map.and_then(|m| m.get(term)).cloned();
                let is_prefix = metadata
                    .as_ref()
                    .map(TokenMetadata::is_prefix_match)
                    .unwrap_or(false);
                self.postings.upsert(
                    field,
                    term,
                    &ingested.doc_id,
                    *frequency as f64,
                    metadata,
                );
                touched.insert((field.clone(), term.clone()));
                if !is_prefix && self.vocabulary.insert(term) {
                    self.fuzzy.invalidate();
                }
            }
        }
    }

    /// Rebuilds term cache entries from memory for freshly dirty terms so
    /// they are queryable before the next flush.
    fn refresh_term_cache(&mut self, touched: &HashSet<(String, String)>) {
        for (field, term) in touched {
            let key = cache_key(field, term);
            match self.postings.get(field, term) {
                Some(docs) if !docs.is_empty() => {
                    let postings: Vec<TermPosting> =
                        docs.values().map(|entry| entry.to_term_posting()).collect();
                    let doc_frequency = postings.len();
                    self.term_cache.set(
                        key,
                        CachedPostings {
                            postings,
                            doc_frequency,
                            idf: None,
                        },
                    );
                }
                _ => {
                    self.term_cache.delete(&key);
                }
            }
        }
    }

    fn chunk_record(
        field: String,
        term: String,
        postings: &[TermPosting],
    ) -> Result<TermChunkRecord> {
        // Postings are JSON-encoded individually so metadata round-trips;
        // the codec takes the json path for string arrays.
        let mut values = Vec::with_capacity(postings.len());
        for posting in postings {
            values.push(Value::String(serde_json::to_string(posting)?));
        }
        let (payload, encoding) = PostingCodec::encode(&values)?;
        Ok(TermChunkRecord {
            field,
            term,
            chunk: 0,
            payload,
            encoding,
            doc_frequency: postings.len() as u32,
            inverse_document_frequency: None,
            access_count: None,
            last_accessed_at: None,
        })
    }

    /// Deletions run concurrently (one per emptied term); all chunk writes
    /// go through a single batch put on the terms store.
    async fn write_postings(
        adapter: &Arc<dyn KeyValueAdapter>,
        chunks: Vec<TermChunkRecord>,
        deletions: Vec<(String, String)>,
    ) -> Result<()> {
        let mut tasks = tokio::task::JoinSet::new();
        for (field, term) in deletions {
            let adapter = adapter.clone();
            tasks.spawn(async move { adapter.delete_term_chunk(&field, &term, 0).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|e| Error::transaction(format!("delete task failed: {}", e)))??;
        }

        if !chunks.is_empty() {
            adapter.put_term_chunks_batch(chunks).await?;
        }
        Ok(())
    }

    /// Walks the dirty set once and persists it: chunk writes for live
    /// terms, deletions for emptied ones. Clears the dirty set only after
    /// every write landed.
    async fn persist_postings(&mut self) -> Result<()> {
        let work = self.postings.collect_flush_work();
        if work.writes.is_empty() && work.deletions.is_empty() {
            self.postings.clear_dirty();
            return Ok(());
        }

        let mut chunks = Vec::with_capacity(work.writes.len());
        for (field, term, postings) in work.writes {
            chunks.push(Self::chunk_record(field, term, &postings)?);
        }
        trace!(
            writes = chunks.len(),
            deletions = work.deletions.len(),
            "persisting postings"
        );
        Self::write_postings(&self.adapter, chunks, work.deletions).await?;
        self.postings.clear_dirty();
        Ok(())
    }

    /// Drains all dirty state. The four sub-operations target disjoint
    /// object stores and run concurrently; each clears its own dirty flag
    /// only on success, and the first error surfaces after all of them
    /// settle, so a partial failure leaves exactly the failed parts dirty
    /// for the next flush.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_open().await?;

        let work = self.postings.collect_flush_work();
        let mut chunks = Vec::with_capacity(work.writes.len());
        for (field, term, postings) in work.writes {
            chunks.push(Self::chunk_record(field, term, &postings)?);
        }
        let deletions = work.deletions;
        let has_posting_work = !chunks.is_empty() || !deletions.is_empty();

        let pending: Vec<DocumentRecord> = self
            .pending_documents
            .iter()
            .map(|(doc_id, payload)| DocumentRecord {
                doc_id: doc_id.clone(),
                payload: payload.clone(),
                updated_at: Utc::now(),
            })
            .collect();

        let stats_blob = if self.stats_dirty {
            Some(serde_json::to_vec(&self.stats.snapshot())?)
        } else {
            None
        };
        let vocabulary_blob = if self.vocabulary.is_dirty() {
            Some(serde_json::to_vec(&self.vocabulary.snapshot())?)
        } else {
            None
        };

        debug!(
            terms = chunks.len(),
            deletions = deletions.len(),
            documents = pending.len(),
            stats = stats_blob.is_some(),
            vocabulary = vocabulary_blob.is_some(),
            "flush"
        );

        let adapter = self.adapter.clone();
        let (terms_result, documents_result, stats_result, vocabulary_result) = tokio::join!(
            async {
                if has_posting_work {
                    Self::write_postings(&adapter, chunks, deletions).await
                } else {
                    Ok(())
                }
            },
            async {
                if pending.is_empty() {
                    Ok(())
                } else {
                    adapter.put_documents_batch(pending).await
                }
            },
            async {
                match &stats_blob {
                    Some(payload) => {
                        adapter
                            .put_cache_state(CacheStateRecord {
                                key: STATS_STATE_KEY.to_string(),
                                payload: payload.clone(),
                                updated_at: Utc::now(),
                            })
                            .await
                    }
                    None => Ok(()),
                }
            },
            async {
                match &vocabulary_blob {
                    Some(payload) => {
                        adapter
                            .put_cache_state(CacheStateRecord {
                                key: VOCABULARY_STATE_KEY.to_string(),
                                payload: payload.clone(),
                                updated_at: Utc::now(),
                            })
                            .await
                    }
                    None => Ok(()),
                }
            },
        );

        if terms_result.is_ok() {
            self.postings.clear_dirty();
        }
        if documents_result.is_ok() {
            self.pending_documents.clear();
        }
        if stats_result.is_ok() && stats_blob.is_some() {
            self.stats_dirty = false;
        }
        if vocabulary_result.is_ok() && vocabulary_blob.is_some() {
            self.vocabulary.mark_clean();
        }

        terms_result?;
        documents_result?;
        stats_result?;
        vocabulary_result?;
        Ok(())
    }

    /// Removes a document from every posting list loaded this session,
    /// persists the edits, and deletes the stats entry and stored payload.
    ///
    /// Terms never touched in this session keep their persisted chunks;
    /// callers needing strict deletion should warm the document's terms
    /// first (re-tokenise its fields and query them) before removing.
    pub async fn remove(&mut self, doc_id: &DocId) -> Result<()> {
        self.ensure_open().await?;
        let doc_key = doc_id.key().into_owned();
        let affected = self.postings.remove_document(&doc_key);
        debug!(doc = %doc_key, terms = affected.len(), "remove");

        self.persist_postings().await?;
        // Wholesale wipe instead of surgical invalidation: stale prefix
        // entries are cheaper to refetch than to track.
        self.term_cache.clear();

        self.stats.remove_document(&doc_key);
        self.stats_dirty = true;
        self.pending_documents.remove(&doc_key);
        self.adapter.delete_document(&doc_key).await?;
        Ok(())
    }

    /// Ranked document ids for a query.
    pub async fn search(&mut self, query: &str, options: &SearchOptions) -> Result<Vec<DocId>> {
        let ranked = self.execute(query, options).await?;
        Ok(ranked.into_iter().map(|(doc_id, _)| doc_id).collect())
    }

    /// Ranked hits with scores and, optionally, stored payloads.
    pub async fn search_detailed(
        &mut self,
        query: &str,
        options: &SearchOptions,
        include_stored: bool,
    ) -> Result<Vec<SearchHit>> {
        let ranked = self.execute(query, options).await?;
        let mut hits = Vec::with_capacity(ranked.len());
        for (doc_id, score) in ranked {
            let stored = if include_stored {
                self.get_document(&doc_id).await?
            } else {
                None
            };
            hits.push(SearchHit {
                doc_id,
                score,
                stored,
            });
        }
        Ok(hits)
    }

    async fn execute(
        &mut self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<(DocId, f64)>> {
        self.ensure_open().await?;
        let fields = options
            .fields
            .clone()
            .unwrap_or_else(|| self.config.fields.clone());
        let mode = determine_search_mode(query, options.mode);
        let fuzzy_distance = resolve_fuzzy_distance(mode, options.fuzzy);
        let tokens = build_query_tokens(
            &self.pipeline,
            &fields,
            query,
            options.apply_query_ngrams,
            fuzzy_distance,
            &mut self.fuzzy,
            &self.vocabulary,
        )?;
        trace!(query, ?mode, tokens = tokens.len(), "executing search");

        let average_length = self.stats.average_length();
        let mut scores: HashMap<String, (DocId, f64)> = HashMap::new();
        for token in &tokens {
            let Some(cached) = self.resolve_postings(&token.field, &token.term).await? else {
                continue;
            };
            let idf = self.scorer.idf(cached.idf, cached.doc_frequency);
            for posting in &cached.postings {
                let doc_key = posting.doc_id.key().into_owned();
                let doc_length = self
                    .stats
                    .length(&doc_key)
                    .map(|l| l as f64)
                    .unwrap_or(average_length);
                let is_prefix = posting
                    .metadata
                    .as_ref()
                    .map(TokenMetadata::is_prefix_match)
                    .unwrap_or(false);
                // Fuzzy expansion's reduced boost is folded into tf here.
                let tf = posting.term_frequency * token.boost;
                let contribution =
                    self.scorer
                        .contribution(idf, tf, doc_length, average_length, is_prefix);
                let entry = scores
                    .entry(doc_key)
                    .or_insert_with(|| (posting.doc_id.clone(), 0.0));
                entry.1 += contribution;
            }
        }

        let mut ranked: Vec<(String, (DocId, f64))> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1 .1
                .partial_cmp(&a.1 .1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let min_score = options.min_score.unwrap_or(0.0);
        let limit = options.limit.unwrap_or(DEFAULT_LIMIT).max(1);
        Ok(ranked
            .into_iter()
            .map(|(_, scored)| scored)
            .filter(|(_, score)| min_score <= 0.0 || *score >= min_score)
            .take(limit)
            .collect())
    }

    /// Term cache lookup with adapter read-through and decode on miss.
    async fn resolve_postings(
        &mut self,
        field: &str,
        term: &str,
    ) -> Result<Option<CachedPostings>> {
        let key = cache_key(field, term);
        if let Some(hit) = self.term_cache.get(&key) {
            return Ok(Some(hit.clone()));
        }

        let Some(record) = self.adapter.get_term_chunk(field, term, 0).await? else {
            return Ok(None);
        };
        trace!(field, term, "term cache miss, decoded from store");
        let values = PostingCodec::decode(&record.payload, record.encoding)?;
        let postings: Vec<TermPosting> =
            values.into_iter().filter_map(posting_from_value).collect();
        let cached = CachedPostings {
            postings,
            doc_frequency: record.doc_frequency as usize,
            idf: record.inverse_document_frequency,
        };
        self.term_cache.set(key, cached.clone());
        Ok(Some(cached))
    }

    /// The stored payload for a document, if any.
    pub async fn get_document(&mut self, doc_id: &DocId) -> Result<Option<Value>> {
        self.ensure_open().await?;
        let doc_key = doc_id.key();
        if let Some(payload) = self.pending_documents.get(doc_key.as_ref()) {
            return Ok(Some(payload.clone()));
        }
        Ok(self
            .adapter
            .get_document(doc_key.as_ref())
            .await?
            .map(|record| record.payload))
    }

    /// Drops all in-memory state and clears every object store.
    pub async fn clear(&mut self) -> Result<()> {
        self.ensure_open().await?;
        self.reset_memory();
        self.adapter.clear_all().await
    }

    /// Clears state and deletes the underlying database.
    pub async fn destroy(&mut self) -> Result<()> {
        self.reset_memory();
        self.opened = false;
        self.adapter.delete_database().await
    }

    fn reset_memory(&mut self) {
        self.postings.clear();
        self.stats = DocumentStats::new();
        self.stats_dirty = false;
        self.vocabulary.clear();
        self.fuzzy.invalidate();
        self.term_cache.clear();
        self.pending_documents.clear();
    }

    /// Full-fidelity snapshot of the indexed state, stable-ordered.
    pub async fn export_snapshot(&mut self) -> Result<EngineSnapshot> {
        self.ensure_open().await?;
        let mut postings: Vec<SnapshotPosting> = self
            .postings
            .iter()
            .map(|(field, term, docs)| {
                let mut documents: Vec<SnapshotDocument> = docs
                    .values()
                    .map(|entry| SnapshotDocument {
                        doc_id: entry.doc_id.clone(),
                        term_frequency: entry.term_frequency,
                        metadata: entry.metadata.clone(),
                    })
                    .collect();
                documents.sort_by(|a, b| a.doc_id.key().cmp(&b.doc_id.key()));
                SnapshotPosting {
                    field: field.clone(),
                    term: term.clone(),
                    documents,
                }
            })
            .collect();
        postings.sort_by(|a, b| (&a.field, &a.term).cmp(&(&b.field, &b.term)));

        Ok(EngineSnapshot {
            postings,
            stats: self.stats.snapshot(),
            vocabulary: Some(self.vocabulary.snapshot()),
        })
    }

    /// Replaces the engine's entire indexed state with the snapshot and
    /// persists it.
    pub async fn import_snapshot(&mut self, snapshot: EngineSnapshot) -> Result<()> {
        self.ensure_open().await?;
        self.postings.clear();
        self.term_cache.clear();

        for posting in &snapshot.postings {
            for document in &posting.documents {
                self.postings.upsert(
                    &posting.field,
                    &posting.term,
                    &document.doc_id,
                    document.term_frequency,
                    document.metadata.clone(),
                );
            }
        }
        self.stats.load(snapshot.stats);
        self.stats_dirty = true;
        if let Some(vocabulary) = snapshot.vocabulary {
            self.vocabulary.load(vocabulary);
            self.vocabulary.mark_dirty();
        }
        self.fuzzy.invalidate();

        self.persist_postings().await?;
        debug!(vocabulary = self.vocabulary.len(), "snapshot imported");
        Ok(())
    }

    /// Transport-safe snapshot for worker handoff. Lossy by design: posting
    /// metadata is not carried, so prefix penalties disappear after a round
    /// trip.
    pub async fn export_worker_snapshot(&mut self) -> Result<WorkerSnapshot> {
        self.ensure_open().await?;
        let mut postings: Vec<WorkerPosting> = self
            .postings
            .iter()
            .map(|(field, term, docs)| {
                let mut entries: Vec<(&String, &crate::index::postings::PostingEntry)> =
                    docs.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                WorkerPosting {
                    field: field.clone(),
                    term: term.clone(),
                    doc_ids: entries.iter().map(|(_, e)| e.doc_id.clone()).collect(),
                    term_frequencies: entries.iter().map(|(_, e)| e.term_frequency).collect(),
                }
            })
            .collect();
        postings.sort_by(|a, b| (&a.field, &a.term).cmp(&(&b.field, &b.term)));

        Ok(WorkerSnapshot {
            postings,
            stats: self.stats.snapshot(),
        })
    }

    pub async fn import_worker_snapshot(&mut self, snapshot: WorkerSnapshot) -> Result<()> {
        self.ensure_open().await?;
        self.postings.clear();
        self.term_cache.clear();

        for posting in &snapshot.postings {
            for (doc_id, frequency) in posting
                .doc_ids
                .iter()
                .zip(posting.term_frequencies.iter())
            {
                self.postings
                    .upsert(&posting.field, &posting.term, doc_id, *frequency, None);
            }
        }
        self.stats.load(snapshot.stats);
        self.stats_dirty = true;
        self.fuzzy.invalidate();

        self.persist_postings().await
    }

    /// Batched ingestion: per batch, one `ingest_batch` pass, posting
    /// upserts for every document, then a single cache refresh. A single
    /// flush at the end makes everything durable; postings are queryable
    /// from memory as soon as their batch lands.
    pub async fn add_bulk(
        &mut self,
        documents: Vec<DocumentInput>,
        mut options: BulkOptions,
    ) -> Result<()> {
        self.ensure_open().await?;
        let total = documents.len();
        let mut processed = 0usize;
        let mut last_report: Option<Instant> = None;
        let mut start = 0usize;

        while start < documents.len() {
            let size = if options.adaptive {
                Self::adaptive_batch_size(&documents[start..], &options)?
            } else {
                options.batch_size.max(1)
            };
            let end = (start + size).min(documents.len());
            let batch = &documents[start..end];

            let ingested = self.indexer.ingest_batch(batch)?;
            let mut touched = HashSet::new();
            for (input, document) in batch.iter().zip(ingested) {
                if document.total_length == 0 {
                    processed += 1;
                    continue;
                }
                let doc_key = document.doc_id.key().into_owned();
                self.apply_ingested(document, &mut touched);
                if let Some(payload) = &input.store {
                    self.pending_documents.insert(doc_key, payload.clone());
                }
                processed += 1;

                if options.streaming_progress {
                    if let Some(callback) = options.on_progress.as_mut() {
                        let interval = options.progress_interval.max(1);
                        if processed % interval == 0 || processed == total {
                            callback(BulkProgress { processed, total });
                        }
                    }
                }
            }
            self.refresh_term_cache(&touched);

            if !options.streaming_progress {
                if let Some(callback) = options.on_progress.as_mut() {
                    let due = last_report
                        .map(|at| at.elapsed() >= PROGRESS_THROTTLE)
                        .unwrap_or(true);
                    if due || end == documents.len() {
                        callback(BulkProgress { processed, total });
                        last_report = Some(Instant::now());
                    }
                }
            }
            start = end;
        }

        self.flush().await
    }

    /// `add_bulk` with per-document error guards. Failures land in the
    /// returned checkpoint instead of aborting the run (unless
    /// `continue_on_error` is off), and periodic checkpoints flush and fire
    /// the callback.
    pub async fn add_bulk_with_recovery(
        &mut self,
        documents: Vec<DocumentInput>,
        mut options: RecoveryOptions,
    ) -> Result<BulkCheckpoint> {
        self.ensure_open().await?;
        let mut checkpoint = BulkCheckpoint {
            processed_count: 0,
            last_successful_batch: 0,
            failed_documents: Vec::new(),
            timestamp: Utc::now(),
        };
        let mut since_checkpoint = 0usize;
        let mut start = 0usize;
        let mut batch_index = 0usize;

        while start < documents.len() {
            let size = if options.bulk.adaptive {
                Self::adaptive_batch_size(&documents[start..], &options.bulk)?
            } else {
                options.bulk.batch_size.max(1)
            };
            let end = (start + size).min(documents.len());
            let batch = &documents[start..end];

            let mut touched = HashSet::new();
            let mut batch_failed = false;
            for (offset, input) in batch.iter().enumerate() {
                match self.indexer.ingest(input) {
                    Ok(document) => {
                        if document.total_length > 0 {
                            let doc_key = document.doc_id.key().into_owned();
                            self.apply_ingested(document, &mut touched);
                            if let Some(payload) = &input.store {
                                self.pending_documents.insert(doc_key, payload.clone());
                            }
                        }
                        checkpoint.processed_count += 1;
                        since_checkpoint += 1;
                    }
                    Err(error) => {
                        batch_failed = true;
                        checkpoint.failed_documents.push(FailedDocument {
                            index: start + offset,
                            doc_id: input.id.key().into_owned(),
                            error: error.to_string(),
                        });
                        if !options.continue_on_error {
                            self.refresh_term_cache(&touched);
                            checkpoint.timestamp = Utc::now();
                            return Ok(checkpoint);
                        }
                    }
                }

                if options.enable_checkpointing
                    && since_checkpoint >= options.checkpoint_interval.max(1)
                {
                    self.refresh_term_cache(&touched);
                    touched.clear();
                    self.flush().await?;
                    checkpoint.timestamp = Utc::now();
                    if let Some(callback) = options.on_checkpoint.as_mut() {
                        callback(&checkpoint);
                    }
                    since_checkpoint = 0;
                }
            }
            self.refresh_term_cache(&touched);

            if !batch_failed {
                checkpoint.last_successful_batch = batch_index;
            }
            batch_index += 1;
            start = end;
        }

        self.flush().await?;
        checkpoint.timestamp = Utc::now();
        Ok(checkpoint)
    }

    /// Adaptive sizing: fills the batch until the rough byte estimate
    /// (serialized length doubled) hits the memory budget, within the
    /// configured bounds.
    fn adaptive_batch_size(remaining: &[DocumentInput], options: &BulkOptions) -> Result<usize> {
        let budget = options.max_memory_mb.saturating_mul(1024 * 1024);
        let max = options.max_batch_size.max(1);
        let min = options.min_batch_size.clamp(1, max);

        let mut size = 0usize;
        let mut bytes = 0usize;
        for document in remaining.iter().take(max) {
            let estimate = serde_json::to_string(document)?.len() * 2;
            if size > 0 && bytes + estimate > budget {
                break;
            }
            bytes += estimate;
            size += 1;
        }
        Ok(size.clamp(min, max).min(remaining.len()).max(1))
    }
}

fn cache_key(field: &str, term: &str) -> String {
    format!("{}:{}", field, term)
}
