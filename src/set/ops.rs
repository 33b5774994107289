//! The set algebra over the native collection kinds.
//!
//! Absent operands short-circuit: union and intersection treat an absent
//! operand as the identity and return the other one, difference returns the
//! first operand. The weighted variants report the weight that was actually
//! applied next to the merged collection.

use itertools::{EitherOrBoth, Itertools};

use super::{Collection, OrderedKeys};
use crate::{DocumentId, Weight};

/// Ascending merge of both key streams, duplicates collapsed.
///
/// Returns a `Set` when both inputs are key-only, otherwise a `Bucket`
/// following the weighted rule with weights 1, 1.
pub fn union(c1: Option<&Collection>, c2: Option<&Collection>) -> Option<Collection> {
    match (c1, c2) {
        (None, other) => other.cloned(),
        (other, None) => other.cloned(),
        (Some(c1), Some(c2)) => Some(union_both(c1, c2)),
    }
}

/// The keys present in both operands; output kind follows the union rule.
pub fn intersection(c1: Option<&Collection>, c2: Option<&Collection>) -> Option<Collection> {
    match (c1, c2) {
        (None, other) => other.cloned(),
        (other, None) => other.cloned(),
        (Some(c1), Some(c2)) => Some(intersection_both(c1, c2)),
    }
}

/// The keys of `c1` that are not in `c2`, carrying `c1`'s values when `c1`
/// is mapping-shaped.
pub fn difference(c1: Option<&Collection>, c2: Option<&Collection>) -> Option<Collection> {
    match (c1, c2) {
        (None, _) => None,
        (Some(c1), None) => Some(c1.clone()),
        (Some(c1), Some(c2)) => Some(difference_both(c1, c2)),
    }
}

/// n-ary union, collapsing all inputs into a single `Set` of docids.
pub fn multiunion<'a, I, S>(sets: I) -> Collection
where
    I: IntoIterator<Item = &'a S>,
    S: OrderedKeys + ?Sized + 'a,
{
    let mut docids: Vec<DocumentId> = Vec::new();
    for set in sets {
        docids.extend(set.ordered_keys());
    }
    docids.sort_unstable();
    docids.dedup();
    Collection::Set(docids)
}

/// Weighted union. Absent operands short-circuit before any weight applies;
/// two key-only sets merge unweighted with a reported weight of 1; any
/// mapping operand turns the result into a `Bucket` of `v1·w1 + v2·w2`.
pub fn weighted_union(
    c1: Option<&Collection>,
    c2: Option<&Collection>,
    w1: Weight,
    w2: Weight,
) -> (Weight, Option<Collection>) {
    match (c1, c2) {
        (None, None) => (0, None),
        (None, Some(c2)) => (w2, Some(c2.clone())),
        (Some(c1), None) => (w1, Some(c1.clone())),
        (Some(c1), Some(c2)) => {
            let (weight, merged) = weighted_union_both(c1, c2, w1, w2);
            (weight, Some(merged))
        }
    }
}

/// Weighted intersection. Same short-circuits as the union; the weight sum
/// `w1 + w2` is reported only for the intersection of two key-only sets.
pub fn weighted_intersection(
    c1: Option<&Collection>,
    c2: Option<&Collection>,
    w1: Weight,
    w2: Weight,
) -> (Weight, Option<Collection>) {
    match (c1, c2) {
        (None, None) => (0, None),
        (None, Some(c2)) => (w2, Some(c2.clone())),
        (Some(c1), None) => (w1, Some(c1.clone())),
        (Some(c1), Some(c2)) => {
            let (weight, merged) = weighted_intersection_both(c1, c2, w1, w2);
            (weight, Some(merged))
        }
    }
}

pub(crate) fn union_both(c1: &Collection, c2: &Collection) -> Collection {
    merge_union(c1, c2, 1, 1)
}

pub(crate) fn intersection_both(c1: &Collection, c2: &Collection) -> Collection {
    merge_intersection(c1, c2, 1, 1)
}

pub(crate) fn difference_both(c1: &Collection, c2: &Collection) -> Collection {
    if c1.is_mapping() {
        Collection::Bucket(c1.entries().filter(|(key, _)| !c2.contains(*key)).collect())
    } else {
        Collection::Set(c1.keys().filter(|key| !c2.contains(*key)).collect())
    }
}

pub(crate) fn weighted_union_both(
    c1: &Collection,
    c2: &Collection,
    w1: Weight,
    w2: Weight,
) -> (Weight, Collection) {
    if !c1.is_mapping() && !c2.is_mapping() {
        (1, union_both(c1, c2))
    } else {
        (1, merge_union(c1, c2, w1, w2))
    }
}

pub(crate) fn weighted_intersection_both(
    c1: &Collection,
    c2: &Collection,
    w1: Weight,
    w2: Weight,
) -> (Weight, Collection) {
    if !c1.is_mapping() && !c2.is_mapping() {
        (w1 + w2, intersection_both(c1, c2))
    } else {
        (1, merge_intersection(c1, c2, w1, w2))
    }
}

fn merge_union(c1: &Collection, c2: &Collection, w1: Weight, w2: Weight) -> Collection {
    if !c1.is_mapping() && !c2.is_mapping() {
        let docids = c1
            .keys()
            .merge_join_by(c2.keys(), |left, right| left.cmp(right))
            .map(|merged| match merged {
                EitherOrBoth::Both(key, _) => key,
                EitherOrBoth::Left(key) => key,
                EitherOrBoth::Right(key) => key,
            })
            .collect();
        Collection::Set(docids)
    } else {
        let pairs = c1
            .entries()
            .merge_join_by(c2.entries(), |(left, _), (right, _)| left.cmp(right))
            .map(|merged| match merged {
                EitherOrBoth::Both((key, v1), (_, v2)) => (key, v1 * w1 + v2 * w2),
                EitherOrBoth::Left((key, v1)) => (key, v1 * w1),
                EitherOrBoth::Right((key, v2)) => (key, v2 * w2),
            })
            .collect();
        Collection::Bucket(pairs)
    }
}

fn merge_intersection(c1: &Collection, c2: &Collection, w1: Weight, w2: Weight) -> Collection {
    if !c1.is_mapping() && !c2.is_mapping() {
        let docids = c1
            .keys()
            .merge_join_by(c2.keys(), |left, right| left.cmp(right))
            .filter_map(|merged| match merged {
                EitherOrBoth::Both(key, _) => Some(key),
                _otherwise => None,
            })
            .collect();
        Collection::Set(docids)
    } else {
        let pairs = c1
            .entries()
            .merge_join_by(c2.entries(), |(left, _), (right, _)| left.cmp(right))
            .filter_map(|merged| match merged {
                EitherOrBoth::Both((key, v1), (_, v2)) => Some((key, v1 * w1 + v2 * w2)),
                _otherwise => None,
            })
            .collect();
        Collection::Bucket(pairs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use maplit::{btreemap, btreeset};

    use super::*;

    fn set(docids: &[DocumentId]) -> Collection {
        Collection::Set(docids.to_vec())
    }

    fn bucket(pairs: &[(DocumentId, Weight)]) -> Collection {
        Collection::Bucket(pairs.to_vec())
    }

    #[test]
    fn union_of_key_only_collections() {
        assert_eq!(union(Some(&set(&[1, 3])), Some(&set(&[2, 3]))), Some(set(&[1, 2, 3])));
        assert_eq!(union(None, Some(&set(&[2]))), Some(set(&[2])));
        assert_eq!(union(Some(&set(&[2])), None), Some(set(&[2])));
        assert_eq!(union(None, None), None);
    }

    #[test]
    fn union_with_a_mapping_produces_a_bucket() {
        let merged = union(Some(&set(&[1, 2])), Some(&bucket(&[(2, 10), (3, 30)]))).unwrap();
        assert_eq!(merged, bucket(&[(1, 1), (2, 11), (3, 30)]));

        let tree = Collection::from(btreemap! { 1u32 => 5, 4 => 7 });
        let merged = union(Some(&tree), Some(&bucket(&[(1, 1)]))).unwrap();
        assert_eq!(merged, bucket(&[(1, 6), (4, 7)]));
    }

    #[test]
    fn intersection_treats_absent_as_identity() {
        assert_eq!(intersection(None, Some(&set(&[2]))), Some(set(&[2])));
        assert_eq!(intersection(Some(&set(&[2])), None), Some(set(&[2])));
        assert_eq!(
            intersection(Some(&set(&[1, 2, 3])), Some(&set(&[2, 3, 4]))),
            Some(set(&[2, 3])),
        );
    }

    #[test]
    fn intersection_of_mappings_sums_values() {
        let merged =
            intersection(Some(&bucket(&[(1, 10), (2, 20)])), Some(&bucket(&[(2, 5)]))).unwrap();
        assert_eq!(merged, bucket(&[(2, 25)]));
    }

    #[test]
    fn difference_follows_the_first_operand() {
        assert_eq!(difference(None, Some(&set(&[1]))), None);
        assert_eq!(difference(Some(&set(&[1])), None), Some(set(&[1])));
        assert_eq!(
            difference(Some(&set(&[1, 2, 3])), Some(&set(&[2]))),
            Some(set(&[1, 3])),
        );
        // A mapping-shaped first operand keeps its values.
        assert_eq!(
            difference(Some(&bucket(&[(1, 10), (2, 20)])), Some(&set(&[2]))),
            Some(bucket(&[(1, 10)])),
        );
    }

    #[test]
    fn multiunion_collapses_everything_into_a_set() {
        let sets = vec![set(&[4, 5]), set(&[1]), bucket(&[(5, 9), (7, 9)])];
        assert_eq!(multiunion(&sets), set(&[1, 4, 5, 7]));

        let postings: Vec<BTreeSet<DocumentId>> =
            vec![btreeset! { 2u32, 9 }, btreeset! { 2u32, 3 }];
        assert_eq!(multiunion(&postings), set(&[2, 3, 9]));

        assert_eq!(multiunion(Vec::<&Collection>::new()), set(&[]));
    }

    #[test]
    fn weighted_union_short_circuits_before_weights() {
        assert_eq!(weighted_union(None, None, 3, 4), (0, None));
        assert_eq!(weighted_union(None, Some(&set(&[1])), 3, 4), (4, Some(set(&[1]))));
        assert_eq!(weighted_union(Some(&set(&[1])), None, 3, 4), (3, Some(set(&[1]))));
    }

    #[test]
    fn weighted_union_of_sets_is_unweighted() {
        let (weight, merged) = weighted_union(Some(&set(&[1])), Some(&set(&[2])), 3, 4);
        assert_eq!(weight, 1);
        assert_eq!(merged, Some(set(&[1, 2])));
    }

    #[test]
    fn weighted_union_with_a_mapping_applies_weights() {
        let (weight, merged) =
            weighted_union(Some(&bucket(&[(1, 2), (2, 1)])), Some(&set(&[2, 3])), 3, 4);
        assert_eq!(weight, 1);
        // 1 is only in c1 (2·3), 2 is in both (1·3 + 1·4), 3 only in c2 (1·4).
        assert_eq!(merged, Some(bucket(&[(1, 6), (2, 7), (3, 4)])));
    }

    #[test]
    fn weighted_intersection_of_sets_sums_the_weights() {
        let (weight, merged) =
            weighted_intersection(Some(&set(&[1, 2])), Some(&set(&[2, 3])), 3, 4);
        assert_eq!(weight, 7);
        assert_eq!(merged, Some(set(&[2])));
    }

    #[test]
    fn weighted_intersection_with_a_mapping_applies_weights() {
        let tree = Collection::from(btreeset! { 2u32, 3 });
        let (weight, merged) =
            weighted_intersection(Some(&bucket(&[(1, 2), (2, 5)])), Some(&tree), 3, 4);
        assert_eq!(weight, 1);
        // Only 2 survives: 5·3 + 1·4.
        assert_eq!(merged, Some(bucket(&[(2, 19)])));
    }
}
