//! Second pass: raw term frequencies to BM25 weights.
//!
//! ```text
//! alpha = 1 - b + b * DL / AVDL
//! tf'   = tf * (1 + 1/k) / (alpha + tf/k)      (tf' = 1 when k <= 0)
//! w     = tf' * log2(N / df)
//! ```
//!
//! Written with `1/k` rather than `(k + 1) / (k * alpha + tf)` so that
//! `k = inf` evaluates to `tf / alpha` instead of NaN.

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::index::{InvertedIndex, Posting};

pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_K: f64 = 1.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Length normalization strength.
    pub b: f64,
    /// Term frequency saturation.
    pub k: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { b: DEFAULT_B, k: DEFAULT_K }
    }
}

impl Bm25Params {
    pub fn new(b: f64, k: f64) -> Self {
        Self { b, k }
    }

    pub fn alpha(&self, doc_len: u32, avdl: f64) -> f64 {
        // avdl is only 0 when every document is empty, and those have no postings.
        let ratio = if avdl > 0.0 { f64::from(doc_len) / avdl } else { 1.0 };
        1.0 - self.b + self.b * ratio
    }

    /// Saturated term frequency `tf'`.
    pub fn saturate(&self, tf: f64, alpha: f64) -> f64 {
        if self.k > 0.0 {
            tf * (1.0 + 1.0 / self.k) / (alpha + tf / self.k)
        } else {
            1.0
        }
    }

    pub fn weight(&self, tf: u32, doc_len: u32, avdl: f64, df: usize, num_docs: u32) -> f64 {
        let idf = (f64::from(num_docs) / df as f64).log2();
        self.saturate(f64::from(tf), self.alpha(doc_len, avdl)) * idf
    }
}

/// Score every posting of a fully loaded corpus.
///
/// The corpus is left untouched; the returned index owns new posting lists
/// whose weights are the BM25 scores.
pub fn score(corpus: &Corpus, params: Bm25Params) -> InvertedIndex {
    let num_docs = corpus.num_docs();
    let avdl = corpus.avdl();

    let postings: Vec<Vec<Posting>> = corpus
        .raw_postings
        .iter()
        .map(|plist| {
            let df = plist.len();
            plist
                .iter()
                .map(|&(doc_id, tf)| {
                    let doc_len = corpus.docs[doc_id as usize - 1].length;
                    Posting { doc_id, weight: params.weight(tf, doc_len, avdl, df, num_docs) }
                })
                .collect()
        })
        .collect();

    tracing::info!(num_docs, num_terms = postings.len(), avdl, b = params.b, k = params.k, "computed BM25 weights");

    InvertedIndex {
        dictionary: corpus.dictionary.clone(),
        terms: corpus.terms.clone(),
        postings,
        docs: corpus.docs.clone(),
        num_docs,
        avdl,
        params,
    }
}
