use retrieval::evaluate::{evaluate, evaluate_with, read_benchmark};
use retrieval::render::render_hits;
use retrieval::{Bm25Params, DocId, Error, InvertedIndex, Measures, Normalization, Posting, VsmModel};
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn example(params: Bm25Params) -> InvertedIndex {
    InvertedIndex::read_from_file(data("example.tsv"), params).unwrap()
}

fn rounded(list: &[Posting]) -> Vec<(DocId, String)> {
    list.iter().map(|p| (p.doc_id, format!("{:.3}", p.weight))).collect()
}

fn expect(pairs: &[(DocId, &str)]) -> Vec<(DocId, String)> {
    pairs.iter().map(|&(d, w)| (d, w.to_string())).collect()
}

#[test]
fn read_from_file_without_length_normalization() {
    let index = example(Bm25Params::new(0.0, f64::INFINITY));
    assert_eq!(index.num_docs(), 4);
    assert_eq!(index.num_terms(), 6);
    assert_eq!(rounded(index.postings("animated").unwrap()), expect(&[(1, "0.415"), (2, "0.415"), (4, "0.415")]));
    assert_eq!(rounded(index.postings("animation").unwrap()), expect(&[(3, "2.000")]));
    assert_eq!(rounded(index.postings("film").unwrap()), expect(&[(2, "1.000"), (4, "1.000")]));
    assert_eq!(
        rounded(index.postings("movie").unwrap()),
        expect(&[(1, "0.000"), (2, "0.000"), (3, "0.000"), (4, "0.000")])
    );
    assert_eq!(rounded(index.postings("non").unwrap()), expect(&[(2, "2.000")]));
    assert_eq!(rounded(index.postings("short").unwrap()), expect(&[(3, "1.000"), (4, "2.000")]));
}

#[test]
fn read_from_file_with_default_parameters() {
    let index = example(Bm25Params::new(0.75, 1.75));
    assert_eq!(rounded(index.postings("animated").unwrap()), expect(&[(1, "0.459"), (2, "0.402"), (4, "0.358")]));
    assert_eq!(rounded(index.postings("animation").unwrap()), expect(&[(3, "2.211")]));
    assert_eq!(rounded(index.postings("film").unwrap()), expect(&[(2, "0.969"), (4, "0.863")]));
    assert_eq!(rounded(index.postings("non").unwrap()), expect(&[(2, "1.938")]));
    assert_eq!(rounded(index.postings("short").unwrap()), expect(&[(3, "1.106"), (4, "1.313")]));
    assert_eq!(index.params(), Bm25Params::default());
    assert!((index.avdl() - 3.75).abs() < 1e-12);
}

#[test]
fn posting_lists_are_strictly_ascending() {
    let index = example(Bm25Params::default());
    for (term, plist) in index.iter() {
        assert!(plist.windows(2).all(|w| w[0].doc_id < w[1].doc_id), "{term} not ascending");
    }
}

#[test]
fn term_in_every_document_weighs_zero() {
    for params in [Bm25Params::default(), Bm25Params::new(0.0, f64::INFINITY), Bm25Params::new(0.3, 0.0)] {
        let index = example(params);
        assert!(index.postings("movie").unwrap().iter().all(|p| p.weight == 0.0));
    }
}

#[test]
fn search_ranks_by_summed_weight() {
    let index = example(Bm25Params::default());
    let ids: Vec<DocId> = index.search("Animated FILM").iter().map(|p| p.doc_id).collect();
    assert_eq!(ids, vec![2, 4, 1]);
    assert!(index.search("movie").is_empty());
    assert!(index.search("documentary").is_empty());
}

fn sorted_dense(model: &VsmModel) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = model
        .matrix()
        .to_dense()
        .iter()
        .map(|row| row.iter().map(|v| format!("{v:.3}")).collect())
        .collect();
    rows.sort();
    rows
}

fn rows(expected: &[[&str; 4]]) -> Vec<Vec<String>> {
    expected.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
}

#[test]
fn vsm_matrix_without_normalization() {
    let model = VsmModel::build(&example(Bm25Params::new(0.0, f64::INFINITY)), Normalization::None);
    assert_eq!(
        sorted_dense(&model),
        rows(&[
            ["0.000", "0.000", "0.000", "0.000"],
            ["0.000", "0.000", "1.000", "2.000"],
            ["0.000", "0.000", "2.000", "0.000"],
            ["0.000", "1.000", "0.000", "1.000"],
            ["0.000", "2.000", "0.000", "0.000"],
            ["0.415", "0.415", "0.000", "0.415"],
        ])
    );
}

#[test]
fn vsm_matrix_normalizations() {
    let index = example(Bm25Params::default());
    assert_eq!(
        sorted_dense(&VsmModel::build(&index, Normalization::L1)),
        rows(&[
            ["0.000", "0.000", "0.000", "0.000"],
            ["0.000", "0.000", "0.333", "0.518"],
            ["0.000", "0.000", "0.667", "0.000"],
            ["0.000", "0.293", "0.000", "0.340"],
            ["0.000", "0.586", "0.000", "0.000"],
            ["1.000", "0.122", "0.000", "0.141"],
        ])
    );
    assert_eq!(
        sorted_dense(&VsmModel::build(&index, Normalization::L2)),
        rows(&[
            ["0.000", "0.000", "0.000", "0.000"],
            ["0.000", "0.000", "0.447", "0.815"],
            ["0.000", "0.000", "0.894", "0.000"],
            ["0.000", "0.440", "0.000", "0.535"],
            ["0.000", "0.879", "0.000", "0.000"],
            ["1.000", "0.182", "0.000", "0.222"],
        ])
    );
    assert_eq!(
        sorted_dense(&VsmModel::build(&index, Normalization::L3)),
        rows(&[
            ["0.000", "0.000", "0.000", "0.000"],
            ["0.000", "0.000", "0.481", "0.915"],
            ["0.000", "0.000", "0.961", "0.000"],
            ["0.000", "0.479", "0.000", "0.601"],
            ["0.000", "0.959", "0.000", "0.000"],
            ["1.000", "0.199", "0.000", "0.250"],
        ])
    );
}

#[test]
fn l2_columns_have_unit_norm() {
    let model = VsmModel::build(&example(Bm25Params::default()), Normalization::L2);
    let (_, cols) = model.matrix().shape();
    for c in 0..cols {
        let norm: f64 = model.matrix().column(c).map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9, "column {c} has norm {norm}");
    }
}

#[test]
fn vocabulary_keeps_first_seen_order() {
    let model = VsmModel::build(&example(Bm25Params::default()), Normalization::None);
    let vocab = model.vocabulary();
    let terms: Vec<&str> = (0..vocab.len()).map(|r| vocab.term(r).unwrap()).collect();
    assert_eq!(terms, vec!["movie", "animated", "non", "film", "short", "animation"]);
}

#[test]
fn vsm_query_rejects_unknown_terms() {
    let model = VsmModel::build(&example(Bm25Params::default()), Normalization::L2);
    assert!(matches!(model.process_query(&["animated", "cartoon"]), Err(Error::UnknownTerm(_))));
    let ids: Vec<DocId> = model.process_query(&["short"]).unwrap().iter().map(|p| p.doc_id).collect();
    assert_eq!(ids, vec![4, 3]);
}

#[test]
fn evaluate_reference_benchmark() {
    let index = example(Bm25Params::default());
    let benchmark = read_benchmark(data("example-benchmark.tsv")).unwrap();
    assert_eq!(benchmark.len(), 2);
    let m = evaluate(&index, &benchmark, false);
    assert_eq!(format!("{:.3}", m.mp_at_3), "0.667");
    assert_eq!(format!("{:.3}", m.mp_at_r), "0.833");
    assert_eq!(format!("{:.3}", m.map), "0.694");
}

#[test]
fn evaluate_unnormalized_vsm_matches_ranked() {
    let index = example(Bm25Params::default());
    let benchmark = read_benchmark(data("example-benchmark.tsv")).unwrap();
    let model = VsmModel::build(&index, Normalization::None);
    let vsm = evaluate_with(&model, &benchmark, false);
    let ranked = evaluate(&index, &benchmark, false);
    assert!((vsm.means.mp_at_3 - ranked.mp_at_3).abs() < 1e-12);
    assert!((vsm.means.mp_at_r - ranked.mp_at_r).abs() < 1e-12);
    assert!((vsm.means.map - ranked.map).abs() < 1e-12);
    assert!(vsm.per_query.iter().all(|q| q.error.is_none()));
}

#[test]
fn render_lists_top_hits() {
    let index = example(Bm25Params::default());
    let hits = index.search("short film");
    let out = render_hits(&index, &hits, &["short", "film"], 2);
    // docs 4 and 3 are shown, doc 2 is cut off
    assert!(out.contains("animated "));
    assert!(out.contains(" animation"));
    assert!(!out.contains("Non-"));
    assert!(out.ends_with("# total hits: 3.\n"));
}

#[test]
fn missing_corpus_file_is_an_error() {
    let err = InvertedIndex::read_from_file(data("missing.tsv"), Bm25Params::default()).unwrap_err();
    assert!(matches!(err, Error::Open { .. }));
}

#[test]
fn empty_corpus_flows_through_every_stage() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let index = InvertedIndex::read_from_file(file.path(), Bm25Params::default()).unwrap();
    assert_eq!(index.num_docs(), 0);
    assert_eq!(index.num_terms(), 0);
    assert_eq!(index.avdl(), 0.0);
    assert!(index.search("animated film").is_empty());

    for mode in [Normalization::None, Normalization::L1, Normalization::L2, Normalization::L3] {
        let model = VsmModel::build(&index, mode);
        assert_eq!(model.matrix().shape(), (0, 0));
        assert_eq!(model.matrix().nnz(), 0);
        assert!(model.process_query::<&str>(&[]).unwrap().is_empty());
        assert!(matches!(model.process_query(&["film"]), Err(Error::UnknownTerm(_))));
    }

    let benchmark = read_benchmark(data("example-benchmark.tsv")).unwrap();
    assert_eq!(evaluate(&index, &benchmark, false), Measures::default());
}
