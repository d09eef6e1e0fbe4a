//! Retrieval quality against a benchmark of relevance judgements.
//!
//! Per query: P@3, P@R (R = number of relevant documents) and AP.
//! Aggregated: MP@3, MP@R and MAP, the arithmetic means over all queries.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::tokenizer::tokenize;
use crate::vsm::VsmModel;
use crate::DocId;

/// Query text to the set of relevant 1-based document ids.
pub type Benchmark = BTreeMap<String, BTreeSet<DocId>>;

/// Anything that turns keywords into a ranked list of document ids.
pub trait Ranker {
    fn rank(&self, keywords: &[String], use_refinements: bool) -> Result<Vec<DocId>>;
}

impl Ranker for InvertedIndex {
    fn rank(&self, keywords: &[String], use_refinements: bool) -> Result<Vec<DocId>> {
        Ok(self.process_query(keywords, use_refinements).into_iter().map(|p| p.doc_id).collect())
    }
}

impl Ranker for VsmModel {
    fn rank(&self, keywords: &[String], _use_refinements: bool) -> Result<Vec<DocId>> {
        Ok(self.process_query(keywords)?.into_iter().map(|p| p.doc_id).collect())
    }
}

/// Read `<query>\t<id1> <id2> ...` lines.
pub fn read_benchmark<P: AsRef<Path>>(path: P) -> Result<Benchmark> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let benchmark = parse_benchmark(BufReader::new(file))?;
    tracing::info!(path = %path.display(), queries = benchmark.len(), "read benchmark");
    Ok(benchmark)
}

pub fn parse_benchmark<R: BufRead>(reader: R) -> Result<Benchmark> {
    let mut benchmark = Benchmark::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let (query, ids) = line.split_once('\t').ok_or_else(|| Error::Benchmark {
            line: i + 1,
            reason: "missing TAB between query and ids".into(),
        })?;
        let relevant = ids
            .split_whitespace()
            .map(|id| match id.parse::<DocId>() {
                Ok(id) if id > 0 => Ok(id),
                _ => Err(Error::Benchmark { line: i + 1, reason: format!("invalid document id '{id}'") }),
            })
            .collect::<Result<BTreeSet<DocId>>>()?;
        benchmark.insert(query.to_string(), relevant);
    }
    Ok(benchmark)
}

/// Relevant results among the first `k`, divided by `k`.
///
/// The divisor stays `k` even if fewer than `k` results were returned.
pub fn precision_at_k(results: &[DocId], relevant: &BTreeSet<DocId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = results.iter().take(k).filter(|&&id| relevant.contains(&id)).count();
    hits as f64 / k as f64
}

/// Mean of P@i over the positions i of relevant results, divided by the
/// number of relevant documents (retrieved or not).
pub fn average_precision(results: &[DocId], relevant: &BTreeSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let sum: f64 = results
        .iter()
        .enumerate()
        .filter(|&(_, &id)| relevant.contains(&id))
        .map(|(i, _)| precision_at_k(results, relevant, i + 1))
        .sum();
    sum / relevant.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measures {
    pub mp_at_3: f64,
    pub mp_at_r: f64,
    pub map: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMeasures {
    pub query: String,
    pub p_at_3: f64,
    pub p_at_r: f64,
    pub ap: f64,
    /// Set when the ranker rejected the query; it then scores as an empty result.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub per_query: Vec<QueryMeasures>,
    pub means: Measures,
}

/// Evaluate the ranked (merge-based) query processor.
pub fn evaluate(index: &InvertedIndex, benchmark: &Benchmark, use_refinements: bool) -> Measures {
    evaluate_with(index, benchmark, use_refinements).means
}

/// Evaluate any [`Ranker`]. A ranker error fails only its own query.
pub fn evaluate_with<R: Ranker + ?Sized>(ranker: &R, benchmark: &Benchmark, use_refinements: bool) -> Evaluation {
    let mut per_query = Vec::with_capacity(benchmark.len());
    for (query, relevant) in benchmark {
        let keywords = tokenize(query);
        let (results, error) = match ranker.rank(&keywords, use_refinements) {
            Ok(ids) => (ids, None),
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "query failed, scoring it as empty");
                (Vec::new(), Some(e.to_string()))
            }
        };
        let m = QueryMeasures {
            query: query.clone(),
            p_at_3: precision_at_k(&results, relevant, 3),
            p_at_r: precision_at_k(&results, relevant, relevant.len()),
            ap: average_precision(&results, relevant),
            error,
        };
        tracing::debug!(query = %m.query, p_at_3 = m.p_at_3, p_at_r = m.p_at_r, ap = m.ap, "evaluated query");
        per_query.push(m);
    }

    let means = if per_query.is_empty() {
        Measures::default()
    } else {
        let n = per_query.len() as f64;
        Measures {
            mp_at_3: per_query.iter().map(|m| m.p_at_3).sum::<f64>() / n,
            mp_at_r: per_query.iter().map(|m| m.p_at_r).sum::<f64>() / n,
            map: per_query.iter().map(|m| m.ap).sum::<f64>() / n,
        }
    };
    Evaluation { per_query, means }
}
