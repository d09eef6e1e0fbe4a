//! First pass over the corpus: documents, raw term frequencies and
//! document lengths. No weight is final until [`crate::bm25::score`] runs
//! over the complete `Corpus`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::index::Document;
use crate::tokenizer::tokenize;
use crate::{DocId, TermId};

/// Documents plus per-term `(doc_id, tf)` lists in first-seen term order.
#[derive(Debug, Default)]
pub struct Corpus {
    pub(crate) docs: Vec<Document>,
    pub(crate) dictionary: HashMap<String, TermId>,
    pub(crate) terms: Vec<String>,
    pub(crate) raw_postings: Vec<Vec<(DocId, u32)>>,
    total_length: u64,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a UTF-8 corpus file, one `<title>\t<description>` record per line.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            num_docs = corpus.num_docs(),
            num_terms = corpus.terms.len(),
            "ingested corpus"
        );
        Ok(corpus)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut corpus = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            corpus.add_record(i + 1, line.trim_end_matches('\r'))?;
        }
        Ok(corpus)
    }

    fn add_record(&mut self, line_no: usize, line: &str) -> Result<()> {
        let (title, description) = line
            .split_once('\t')
            .ok_or(Error::MissingTab { line: line_no })?;

        let doc_id = self.docs.len() as DocId + 1;
        let tokens = tokenize(line);
        for term in &tokens {
            let tid = match self.dictionary.get(term.as_str()) {
                Some(&tid) => tid,
                None => {
                    let tid = self.terms.len() as TermId;
                    self.dictionary.insert(term.clone(), tid);
                    self.terms.push(term.clone());
                    self.raw_postings.push(Vec::new());
                    tid
                }
            };
            // Documents arrive in id order, so only the tail can match.
            let plist = &mut self.raw_postings[tid as usize];
            match plist.last_mut() {
                Some((last, tf)) if *last == doc_id => *tf += 1,
                _ => plist.push((doc_id, 1)),
            }
        }

        let length = tokens.len() as u32;
        self.total_length += u64::from(length);
        self.docs.push(Document {
            id: doc_id,
            title: title.to_string(),
            description: description.to_string(),
            length,
        });
        Ok(())
    }

    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Mean document length over the whole corpus; 0 for an empty corpus.
    pub fn avdl(&self) -> f64 {
        if self.docs.is_empty() {
            return 0.0;
        }
        self.total_length as f64 / self.docs.len() as f64
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.docs.get(idx).map(|d| d.length)
    }

    /// Raw `(doc_id, tf)` list for `term`.
    pub fn raw_postings(&self, term: &str) -> Option<&[(DocId, u32)]> {
        let tid = *self.dictionary.get(term)?;
        Some(&self.raw_postings[tid as usize])
    }
}
