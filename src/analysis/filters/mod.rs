pub mod edge_ngram;
pub mod lowercase;
pub mod stemmer;
pub mod stopword;
