use crate::analysis::pipeline::PipelineConfig;

/// Engine construction options.
#[derive(Clone)]
pub struct EngineConfig {
    /// Index name; also the default database name.
    pub name: String,
    /// Fields indexed by default and searched when a query names none.
    pub fields: Vec<String>,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        EngineConfig {
            name: name.into(),
            fields,
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database name; falls back to the engine name.
    pub db_name: Option<String>,
    pub version: u32,
    /// Reserved for multi-chunk posting lists; chunk 0 is the only chunk
    /// written in this version.
    pub chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            db_name: None,
            version: 1,
            chunk_size: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Capacity of the term posting cache.
    pub terms: usize,
    /// Capacity reserved for the vector cache.
    pub vectors: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            terms: 2048,
            vectors: 512,
        }
    }
}
