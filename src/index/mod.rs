pub mod accumulator;
pub mod indexer;
pub mod postings;
pub mod vocabulary;
