use crate::index::Posting;

/// Union of two posting lists sorted by ascending doc id, in linear time.
///
/// A doc id present in both lists yields one posting carrying the sum of
/// both weights; every other posting passes through unchanged.
pub fn merge(a: &[Posting], b: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut i = 0usize;
    let mut j = 0usize;
    while i < a.len() && j < b.len() {
        let x = a[i];
        let y = b[j];
        if x.doc_id == y.doc_id {
            out.push(Posting::new(x.doc_id, x.weight + y.weight));
            i += 1;
            j += 1;
        } else if x.doc_id < y.doc_id {
            out.push(x);
            i += 1;
        } else {
            out.push(y);
            j += 1;
        }
    }
    // At most one of the two tails is non-empty.
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocId;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn p(doc_id: DocId, weight: f64) -> Posting {
        Posting::new(doc_id, weight)
    }

    fn rounded(list: &[Posting]) -> Vec<(DocId, String)> {
        list.iter().map(|p| (p.doc_id, format!("{:.1}", p.weight))).collect()
    }

    #[test]
    fn test_merge() {
        let m = merge(&[p(1, 2.1), p(5, 3.2)], &[p(1, 1.7), p(2, 1.3), p(5, 3.3)]);
        assert_eq!(
            rounded(&m),
            vec![(1, "3.8".to_string()), (2, "1.3".to_string()), (5, "6.5".to_string())]
        );
    }

    #[test]
    fn test_merge_with_empty() {
        let b = vec![p(1, 1.7), p(2, 1.3), p(5, 3.3)];
        assert_eq!(merge(&[], &b), b);
        assert_eq!(merge(&b, &[]), b);
        assert!(merge(&[], &[]).is_empty());
    }

    #[test]
    fn test_merge_appends_longer_tail() {
        let m = merge(&[p(1, 1.0)], &[p(2, 1.0), p(3, 1.0), p(9, 1.0)]);
        let ids: Vec<DocId> = m.iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 9]);
    }

    // Weights are multiples of 1/4 so every sum is exact and any fold order
    // must give bit-identical results.
    fn posting_list() -> impl Strategy<Value = Vec<Posting>> {
        prop::collection::btree_map(1u32..200, 0u32..400, 0..40).prop_map(|m: BTreeMap<u32, u32>| {
            m.into_iter().map(|(id, w)| p(id, f64::from(w) / 4.0)).collect()
        })
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in posting_list(), b in posting_list()) {
            prop_assert_eq!(merge(&a, &b), merge(&b, &a));
        }

        #[test]
        fn merge_is_associative(a in posting_list(), b in posting_list(), c in posting_list()) {
            let left = merge(&merge(&a, &b), &c);
            let right = merge(&a, &merge(&b, &c));
            prop_assert_eq!(&left, &right);
            prop_assert_eq!(left, merge(&merge(&c, &a), &b));
        }

        #[test]
        fn merge_keeps_ids_strictly_ascending(a in posting_list(), b in posting_list()) {
            let m = merge(&a, &b);
            prop_assert!(m.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
            let mut expected: Vec<DocId> = a.iter().chain(b.iter()).map(|p| p.doc_id).collect();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(m.iter().map(|p| p.doc_id).collect::<Vec<_>>(), expected);
        }
    }
}
