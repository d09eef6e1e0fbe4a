//! Vector-space model over the scored index.
//!
//! The term-document matrix has one row per term (vocabulary order) and one
//! column per document (`doc_id - 1`). It is stored column-major since both
//! normalization and query scoring walk whole document columns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::index::{by_score_desc, InvertedIndex, Posting};
use crate::DocId;

/// Term to row mapping, fixed for the lifetime of one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    rows: HashMap<String, usize>,
}

impl Vocabulary {
    /// Rows follow the index's first-seen term order.
    pub fn from_index(index: &InvertedIndex) -> Self {
        let terms: Vec<String> = index.terms.clone();
        let rows = terms.iter().enumerate().map(|(row, t)| (t.clone(), row)).collect();
        Self { terms, rows }
    }

    pub fn row(&self, term: &str) -> Option<usize> {
        self.rows.get(term).copied()
    }

    pub fn term(&self, row: usize) -> Option<&str> {
        self.terms.get(row).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    None,
    /// Sum of the column entries.
    L1,
    /// Euclidean norm of the column.
    L2,
    /// Cube root of the sum of cubes.
    L3,
}

impl Normalization {
    /// Resolve independent on/off flags; L1 wins over L2, L2 over L3.
    pub fn from_flags(l1: bool, l2: bool, l3: bool) -> Self {
        if l1 {
            Self::L1
        } else if l2 {
            Self::L2
        } else if l3 {
            Self::L3
        } else {
            Self::None
        }
    }

    /// Divisor for a column with the given entries. `None` means leave it alone.
    fn column_norm(self, values: &[f64]) -> Option<f64> {
        let norm = match self {
            Self::None => return None,
            Self::L1 => values.iter().sum::<f64>(),
            Self::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Self::L3 => values.iter().map(|v| v * v * v).sum::<f64>().cbrt(),
        };
        (norm != 0.0 && norm.is_finite()).then_some(norm)
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
        };
        f.write_str(name)
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            "l3" => Ok(Self::L3),
            other => Err(Error::Config(format!("unknown normalization '{other}' (expected none, l1, l2 or l3)"))),
        }
    }
}

/// Sparse `num_terms x num_docs` matrix in compressed sparse column form.
#[derive(Debug, Clone, PartialEq)]
pub struct TermDocMatrix {
    num_rows: usize,
    num_cols: usize,
    /// Column `c` owns `row_idx[col_ptr[c]..col_ptr[c + 1]]`.
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
    values: Vec<f64>,
}

impl TermDocMatrix {
    /// Entry (row of term, `doc_id - 1`) = the posting's BM25 weight.
    ///
    /// Terms missing from `vocabulary` are left out of the matrix.
    pub fn build(index: &InvertedIndex, vocabulary: &Vocabulary) -> Self {
        let num_rows = vocabulary.len();
        let num_cols = index.num_docs() as usize;
        let rows: Vec<(usize, &[Posting])> = index
            .iter()
            .filter_map(|(term, plist)| Some((vocabulary.row(term)?, plist)))
            .collect();

        let mut col_ptr = vec![0usize; num_cols + 1];
        for (_, plist) in &rows {
            for p in plist.iter() {
                col_ptr[p.doc_id as usize] += 1;
            }
        }
        for c in 0..num_cols {
            col_ptr[c + 1] += col_ptr[c];
        }

        let nnz = col_ptr[num_cols];
        let mut row_idx = vec![0usize; nnz];
        let mut values = vec![0.0f64; nnz];
        let mut next = col_ptr.clone();
        for &(row, plist) in &rows {
            for p in plist {
                let slot = &mut next[p.doc_id as usize - 1];
                row_idx[*slot] = row;
                values[*slot] = p.weight;
                *slot += 1;
            }
        }

        let mut matrix = Self { num_rows, num_cols, col_ptr, row_idx, values };
        matrix.sort_columns();
        matrix
    }

    // `get` binary-searches rows, so each column must be ascending.
    fn sort_columns(&mut self) {
        for c in 0..self.num_cols {
            let range = self.col_ptr[c]..self.col_ptr[c + 1];
            if self.row_idx[range.clone()].windows(2).all(|w| w[0] < w[1]) {
                continue;
            }
            let mut entries: Vec<(usize, f64)> = self.column(c).collect();
            entries.sort_by_key(|&(row, _)| row);
            for (i, (row, value)) in entries.into_iter().enumerate() {
                self.row_idx[range.start + i] = row;
                self.values[range.start + i] = value;
            }
        }
    }

    /// Divide every column by its norm. Columns with a zero norm stay zero.
    pub fn normalize(&mut self, mode: Normalization) {
        for c in 0..self.num_cols {
            let range = self.col_ptr[c]..self.col_ptr[c + 1];
            if let Some(norm) = mode.column_norm(&self.values[range.clone()]) {
                for v in &mut self.values[range] {
                    *v /= norm;
                }
            }
        }
    }

    /// `(num_terms, num_docs)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_cols)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored `(row, value)` entries of one column, rows ascending.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.col_ptr[col]..self.col_ptr[col + 1];
        self.row_idx[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.col_ptr[col]..self.col_ptr[col + 1];
        match self.row_idx[range.clone()].binary_search(&row) {
            Ok(i) => self.values[range.start + i],
            Err(_) => 0.0,
        }
    }

    /// Dense row-major copy, mostly for inspection.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.num_cols]; self.num_rows];
        for c in 0..self.num_cols {
            for (r, v) in self.column(c) {
                dense[r][c] = v;
            }
        }
        dense
    }

    /// `q^T * A`: one score per document column.
    pub fn dot(&self, query: &[f64]) -> Vec<f64> {
        (0..self.num_cols)
            .map(|c| self.column(c).map(|(r, v)| query[r] * v).sum::<f64>())
            .collect()
    }
}

/// Vocabulary and matrix built together, so queries always use the
/// vocabulary the matrix rows were laid out with.
#[derive(Debug, Clone)]
pub struct VsmModel {
    vocabulary: Vocabulary,
    matrix: TermDocMatrix,
    normalization: Normalization,
}

impl VsmModel {
    pub fn build(index: &InvertedIndex, normalization: Normalization) -> Self {
        let vocabulary = Vocabulary::from_index(index);
        let mut matrix = TermDocMatrix::build(index, &vocabulary);
        matrix.normalize(normalization);
        let (rows, cols) = matrix.shape();
        tracing::info!(rows, cols, nnz = matrix.nnz(), %normalization, "built term-document matrix");
        Self { vocabulary, matrix, normalization }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn matrix(&self) -> &TermDocMatrix {
        &self.matrix
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Bag-of-words query vector; a repeated keyword counts again.
    pub fn query_vector<S: AsRef<str>>(&self, keywords: &[S]) -> Result<Vec<f64>> {
        let mut q = vec![0.0; self.vocabulary.len()];
        for kw in keywords {
            let kw: &str = kw.as_ref();
            let row = self.vocabulary.row(kw).ok_or_else(|| Error::UnknownTerm(kw.to_string()))?;
            q[row] += 1.0;
        }
        Ok(q)
    }

    /// Score documents by dot product with the query vector.
    ///
    /// Unlike [`InvertedIndex::process_query`] a keyword outside the
    /// vocabulary fails the whole query with [`Error::UnknownTerm`].
    pub fn process_query<S: AsRef<str>>(&self, keywords: &[S]) -> Result<Vec<Posting>> {
        let q = self.query_vector(keywords)?;
        let mut hits: Vec<Posting> = self
            .matrix
            .dot(&q)
            .into_iter()
            .enumerate()
            .filter(|&(_, score)| score != 0.0)
            .map(|(col, score)| Posting::new(col as DocId + 1, score))
            .collect();
        hits.sort_by(by_score_desc);
        tracing::debug!(keywords = keywords.len(), hits = hits.len(), "processed VSM query");
        Ok(hits)
    }
}
