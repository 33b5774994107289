//! End-to-end scenarios over the whole catalog core: granular range
//! queries, sort strategies, path searches and adaptable set merges.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use docket::set::adapt;
use docket::{
    BitmapSet, Collection, Discriminator, DocSet, Error, FieldIndex, IntFieldIndex, IntQuery,
    KeywordIndex, MergeAdapter, Operator, PathIndex, PathQuery, Range, SetModule, Weight,
};
use serde_json::json;

fn docids(collection: &Collection) -> Vec<u32> {
    collection.keys().collect()
}

fn price_index() -> IntFieldIndex {
    let mut index = IntFieldIndex::new(Discriminator::field("price").unwrap());
    index.index_doc(5, &json!({ "price": 9000 })).unwrap();
    index.index_doc(6, &json!({ "price": 9000 })).unwrap();
    index.index_doc(7, &json!({ "price": 9001 })).unwrap();
    index.index_doc(8, &json!({ "price": 11005 })).unwrap();
    index
}

#[test]
fn granular_range_queries() {
    let mut index = price_index();
    assert_eq!(docids(&index.apply(Range::new(9000, 11005))), vec![5, 6, 7, 8]);

    index.index_doc(9, &json!({ "price": 11006 })).unwrap();
    assert_eq!(docids(&index.apply(Range::new(9000, 11005))), vec![5, 6, 7, 8]);
}

#[test]
fn range_queries_combine_with_operators() {
    let index = price_index();

    let query =
        IntQuery::ranges(vec![Range::new(8000, 10000), Range::new(9001, 11005)], Operator::And);
    assert_eq!(docids(&index.apply(query)), vec![7]);

    let query =
        IntQuery::ranges(vec![Range::new(8000, 10000), Range::new(9001, 11005)], Operator::Or);
    assert_eq!(docids(&index.apply(query)), vec![5, 6, 7, 8]);
}

#[test]
fn unbounded_ranges_are_served_by_the_coarse_buckets() {
    let index = price_index();
    assert_eq!(docids(&index.apply(Range::unbounded())), vec![5, 6, 7, 8]);
}

#[test]
fn sorting_a_result_set_by_field_value() {
    let mut index: FieldIndex<String> =
        FieldIndex::new(Discriminator::field("name").unwrap());
    index.index_doc(1, &json!({ "name": "b" })).unwrap();
    index.index_doc(2, &json!({ "name": "a" })).unwrap();
    index.index_doc(3, &json!({ "name": "c" })).unwrap();
    index.index_doc(4, &json!({ "name": "a" })).unwrap();

    let results = Collection::Set(vec![1, 2, 3, 4]);
    let sorted: Vec<u32> = index.sort(&results, false, None).unwrap().collect();
    assert_eq!(sorted, vec![2, 4, 1, 3]);

    index.force_nbest(Some(true));
    let sorted: Vec<u32> = index.sort(&results, false, Some(2)).unwrap().collect();
    assert_eq!(sorted, vec![2, 4]);
}

#[test]
fn sorting_the_result_of_a_range_query() {
    let index = price_index();
    let results = index.apply(Range::new(9000, 11005));
    let sorted: Vec<u32> = index.sort(&results, true, Some(2)).unwrap().collect();
    assert_eq!(sorted, vec![8, 7]);
}

#[test]
fn path_searches_by_level() {
    let mut index = PathIndex::new(Discriminator::field("path").unwrap());
    index.index_doc(1, &json!({ "path": "/a/b/c" })).unwrap();
    index.index_doc(2, &json!({ "path": "/a/b" })).unwrap();

    assert_eq!(docids(&index.search("/a/b", 0)), vec![2]);
    assert_eq!(docids(&index.search("b", -1)), vec![1, 2]);

    let query = PathQuery::from(("b", -1));
    assert_eq!(docids(&index.apply(&query)), vec![1, 2]);
}

#[test]
fn keyword_results_compose_with_the_set_algebra() {
    let mut keywords = KeywordIndex::new(Discriminator::field("tags").unwrap());
    keywords.index_doc(5, &json!({ "tags": ["cheap"] })).unwrap();
    keywords.index_doc(7, &json!({ "tags": ["cheap", "new"] })).unwrap();
    keywords.index_doc(8, &json!({ "tags": ["new"] })).unwrap();

    let prices = price_index();
    let in_range = prices.apply(Range::new(9000, 11005));
    let cheap = keywords.apply_eq("cheap");

    let both = adapt::intersection(Some(&in_range), Some(&cheap)).unwrap().unwrap();
    assert_eq!(docids(&both), vec![5, 7]);

    // Difference against the current universe is how Not-variants compose.
    let universe = prices.indexed_docids();
    let not_cheap = adapt::difference(Some(&universe), Some(&cheap)).unwrap().unwrap();
    assert_eq!(docids(&not_cheap), vec![6, 8]);
}

/// A foreign collection handing out a marker module for key-only merges.
#[derive(Debug)]
struct External {
    docids: Vec<u32>,
    delegations: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct ExternalModule {
    delegations: Arc<AtomicUsize>,
}

impl DocSet for External {
    fn is_mapping(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.docids.len()
    }

    fn contains(&self, docid: u32) -> bool {
        self.docids.binary_search(&docid).is_ok()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (u32, Weight)> + '_> {
        Box::new(self.docids.iter().map(|docid| (*docid, 1)))
    }

    fn merge_adapter(&self) -> Option<&dyn MergeAdapter> {
        Some(self)
    }
}

impl MergeAdapter for External {
    fn get_module(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Option<Arc<dyn SetModule>> {
        if c1.is_mapping() || c2.is_mapping() {
            return None;
        }
        Some(Arc::new(ExternalModule { delegations: self.delegations.clone() }))
    }
}

fn merge_keys(c1: &dyn DocSet, c2: &dyn DocSet, keep: impl Fn(bool, bool) -> bool) -> Collection {
    let left: Vec<u32> = c1.entries().map(|(docid, _)| docid).collect();
    let right: Vec<u32> = c2.entries().map(|(docid, _)| docid).collect();
    let mut merged: Vec<u32> = left.iter().chain(right.iter()).copied().collect();
    merged.sort_unstable();
    merged.dedup();
    merged.retain(|docid| {
        keep(left.binary_search(docid).is_ok(), right.binary_search(docid).is_ok())
    });
    Collection::Set(merged)
}

impl SetModule for ExternalModule {
    fn union(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        self.delegations.fetch_add(1, AtomicOrdering::SeqCst);
        merge_keys(c1, c2, |left, right| left || right)
    }

    fn intersection(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        self.delegations.fetch_add(1, AtomicOrdering::SeqCst);
        merge_keys(c1, c2, |left, right| left && right)
    }

    fn difference(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        self.delegations.fetch_add(1, AtomicOrdering::SeqCst);
        merge_keys(c1, c2, |left, right| left && !right)
    }

    fn weighted_union(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        _w1: Weight,
        _w2: Weight,
    ) -> (Weight, Collection) {
        (1, self.union(c1, c2))
    }

    fn weighted_intersection(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        w1: Weight,
        w2: Weight,
    ) -> (Weight, Collection) {
        (w1 + w2, self.intersection(c1, c2))
    }
}

/// A foreign collection that never finds a compatible module.
#[derive(Debug)]
struct Unmergeable(Vec<u32>);

impl DocSet for Unmergeable {
    fn is_mapping(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn contains(&self, docid: u32) -> bool {
        self.0.binary_search(&docid).is_ok()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (u32, Weight)> + '_> {
        Box::new(self.0.iter().map(|docid| (*docid, 1)))
    }

    fn merge_adapter(&self) -> Option<&dyn MergeAdapter> {
        Some(self)
    }
}

impl MergeAdapter for Unmergeable {
    fn get_module(&self, _c1: &dyn DocSet, _c2: &dyn DocSet) -> Option<Arc<dyn SetModule>> {
        None
    }
}

#[test]
fn foreign_collections_delegate_to_their_module() {
    let native = Collection::TreeSet(vec![1, 2, 3].into_iter().collect());
    let delegations = Arc::new(AtomicUsize::new(0));
    let foreign = External { docids: vec![2, 3, 4], delegations: delegations.clone() };

    let merged = adapt::intersection(Some(&native), Some(&foreign)).unwrap().unwrap();
    assert_eq!(docids(&merged), vec![2, 3]);
    assert_eq!(delegations.load(AtomicOrdering::SeqCst), 1);
}

#[test]
fn two_incompatible_foreign_collections_fail_to_merge() {
    let left = Unmergeable(vec![1, 2]);
    let right = Unmergeable(vec![2, 3]);

    let error = adapt::intersection(Some(&left), Some(&right)).unwrap_err();
    assert!(matches!(error, Error::NoMergeModule { .. }));
}

#[test]
fn bitmap_sets_join_query_composition() {
    let prices = price_index();
    let in_range = prices.apply(Range::new(9000, 9001));

    let recent: BitmapSet = vec![6u32, 7, 8].into_iter().collect();
    let merged = adapt::intersection(Some(&in_range), Some(&recent)).unwrap().unwrap();
    assert_eq!(docids(&merged), vec![6, 7]);
}
