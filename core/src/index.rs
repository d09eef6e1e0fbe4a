use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use crate::bm25::{self, Bm25Params};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::tokenizer::tokenize;
use crate::{DocId, TermId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
    /// Number of words in title and description.
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64, // BM25 score once scored
}

impl Posting {
    pub fn new(doc_id: DocId, weight: f64) -> Self {
        Self { doc_id, weight }
    }
}

/// Descending weight, ties broken by ascending document id.
pub(crate) fn by_score_desc(a: &Posting, b: &Posting) -> Ordering {
    b.weight.total_cmp(&a.weight).then(a.doc_id.cmp(&b.doc_id))
}

/// BM25-scored inverted index. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    pub(crate) dictionary: HashMap<String, TermId>,
    /// Terms in first-seen order; position is the `TermId`.
    pub(crate) terms: Vec<String>,
    /// Indexed by `TermId`, each sorted by strictly ascending doc id.
    pub(crate) postings: Vec<Vec<Posting>>,
    pub(crate) docs: Vec<Document>,
    pub(crate) num_docs: u32,
    pub(crate) avdl: f64,
    pub(crate) params: Bm25Params,
}

impl InvertedIndex {
    /// Load the corpus file and score it in one go.
    pub fn read_from_file<P: AsRef<Path>>(path: P, params: Bm25Params) -> Result<Self> {
        let corpus = Corpus::read_from_file(path)?;
        Ok(bm25::score(&corpus, params))
    }

    /// Build from posting lists whose weights are already final.
    ///
    /// Lists keep the given order as their `TermId`s. No documents are attached.
    pub fn from_scored_lists<I, S>(lists: I, num_docs: u32) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Posting>)>,
        S: Into<String>,
    {
        let mut index = Self { num_docs, ..Self::default() };
        for (term, plist) in lists {
            let term = term.into();
            if index.dictionary.contains_key(&term) {
                return Err(Error::DuplicateTerm(term));
            }
            if let Some(w) = plist.windows(2).find(|w| w[0].doc_id >= w[1].doc_id) {
                return Err(Error::UnsortedPostings { term, doc_id: w[1].doc_id });
            }
            if let Some(p) = plist.iter().find(|p| p.doc_id == 0 || p.doc_id > num_docs) {
                return Err(Error::DocOutOfRange { term, doc_id: p.doc_id, num_docs });
            }
            let tid = index.terms.len() as TermId;
            index.dictionary.insert(term.clone(), tid);
            index.terms.push(term);
            index.postings.push(plist);
        }
        Ok(index)
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        let tid = *self.dictionary.get(term)?;
        Some(&self.postings[tid as usize])
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    /// `(term, postings)` in first-seen term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> + '_ {
        self.terms.iter().map(String::as_str).zip(self.postings.iter().map(Vec::as_slice))
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn avdl(&self) -> f64 {
        self.avdl
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.docs.get(idx)
    }

    /// Rank documents by the summed weights of the keywords' posting lists.
    ///
    /// Unknown keywords contribute nothing. Postings summing to exactly 0 are
    /// dropped. `use_refinements` is accepted for callers that ask for
    /// re-ranking; no refinement is configured, so it does not change the result.
    pub fn process_query<S: AsRef<str>>(&self, keywords: &[S], use_refinements: bool) -> Vec<Posting> {
        let mut lists = keywords.iter().filter_map(|kw| self.postings(kw.as_ref()));
        let Some(first) = lists.next() else {
            return Vec::new();
        };
        let merged = lists.fold(first.to_vec(), |acc, plist| merge(&acc, plist));

        let mut hits: Vec<Posting> = merged.into_iter().filter(|p| p.weight != 0.0).collect();
        hits.sort_by(by_score_desc);

        if use_refinements {
            tracing::debug!("ranking refinements requested; none configured");
        }
        tracing::debug!(keywords = keywords.len(), hits = hits.len(), "processed ranked query");
        hits
    }

    /// Tokenize `query` with the corpus rule, then [`Self::process_query`].
    pub fn search(&self, query: &str) -> Vec<Posting> {
        self.process_query(&tokenize(query), false)
    }
}
