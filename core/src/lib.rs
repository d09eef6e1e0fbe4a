//! Small text-retrieval engine: BM25-weighted posting lists, merge-based
//! ranked queries, a column-normalized vector-space model and IR metrics.
//!
//! The build is a strict two-pass pipeline:
//!
//! ```text
//! corpus file ─► Corpus (raw tf, doc lengths) ─► bm25::score ─► InvertedIndex
//!                                                                 │
//!                                  ┌──────────────────────────────┤
//!                                  ▼                              ▼
//!                       process_query (merge fold)      VsmModel (matrix + vocab)
//!                                  └──────────────┬───────────────┘
//!                                                 ▼
//!                                            evaluate
//! ```

pub mod bm25;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod merge;
pub mod render;
pub mod tokenizer;
pub mod vsm;

pub use bm25::Bm25Params;
pub use config::IndexConfig;
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use evaluate::{Benchmark, Measures, Ranker};
pub use index::{Document, InvertedIndex, Posting};
pub use merge::merge;
pub use vsm::{Normalization, TermDocMatrix, Vocabulary, VsmModel};

/// 1-based document id, the line number in the corpus file.
pub type DocId = u32;
pub type TermId = u32;
