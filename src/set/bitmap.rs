use std::iter::FromIterator;
use std::sync::Arc;

use roaring::RoaringBitmap;

use super::adapt::{DocSet, EstimateLength, MergeAdapter, SetModule};
use super::Collection;
use crate::{DocumentId, Weight};

/// A docid set backed by a compressed bitmap.
///
/// This is not one of the native kinds: it reaches the set algebra through
/// the merge-adapter capability and negotiates a module that runs the merges
/// on the bitmaps themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitmapSet(RoaringBitmap);

impl BitmapSet {
    pub fn new() -> BitmapSet {
        BitmapSet(RoaringBitmap::new())
    }

    pub fn insert(&mut self, docid: DocumentId) -> bool {
        self.0.insert(docid)
    }

    pub fn remove(&mut self, docid: DocumentId) -> bool {
        self.0.remove(docid)
    }

    pub fn contains(&self, docid: DocumentId) -> bool {
        self.0.contains(docid)
    }

    pub fn len(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bitmap(&self) -> &RoaringBitmap {
        &self.0
    }

    pub fn into_bitmap(self) -> RoaringBitmap {
        self.0
    }
}

impl From<RoaringBitmap> for BitmapSet {
    fn from(bitmap: RoaringBitmap) -> BitmapSet {
        BitmapSet(bitmap)
    }
}

impl From<&Collection> for BitmapSet {
    fn from(collection: &Collection) -> BitmapSet {
        collection.keys().collect()
    }
}

impl FromIterator<DocumentId> for BitmapSet {
    fn from_iter<I: IntoIterator<Item = DocumentId>>(docids: I) -> BitmapSet {
        BitmapSet(docids.into_iter().collect())
    }
}

impl DocSet for BitmapSet {
    fn is_mapping(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.0.len() as usize
    }

    fn contains(&self, docid: DocumentId) -> bool {
        self.0.contains(docid)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (DocumentId, Weight)> + '_> {
        Box::new(self.0.iter().map(|docid| (docid, 1)))
    }

    fn merge_adapter(&self) -> Option<&dyn MergeAdapter> {
        Some(self)
    }
}

impl MergeAdapter for BitmapSet {
    /// Bitmaps carry no weights, so the module only covers key-only pairs.
    fn get_module(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Option<Arc<dyn SetModule>> {
        if c1.is_mapping() || c2.is_mapping() {
            None
        } else {
            Some(Arc::new(BitmapModule))
        }
    }
}

impl EstimateLength for BitmapSet {
    fn estimate_length(&self) -> usize {
        self.0.len() as usize
    }
}

#[derive(Debug)]
struct BitmapModule;

fn to_bitmap(set: &dyn DocSet) -> RoaringBitmap {
    set.entries().map(|(docid, _)| docid).collect()
}

fn to_collection(bitmap: RoaringBitmap) -> Collection {
    Collection::Set(bitmap.into_iter().collect())
}

impl SetModule for BitmapModule {
    fn union(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        to_collection(to_bitmap(c1) | to_bitmap(c2))
    }

    fn intersection(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        to_collection(to_bitmap(c1) & to_bitmap(c2))
    }

    fn difference(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        to_collection(to_bitmap(c1) - to_bitmap(c2))
    }

    fn weighted_union(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        _w1: Weight,
        _w2: Weight,
    ) -> (Weight, Collection) {
        // Both operands are key-only by module contract: unweighted union.
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

#[cfg(test)]
mod tests {
    use super::super::adapt;
    use super::*;

    #[test]
    fn bitmap_against_native_tree_set() {
        let bitmap: BitmapSet = vec![2u32, 3, 5, 8].into_iter().collect();
        let native = Collection::TreeSet(vec![1, 2, 3].into_iter().collect());

        let merged = adapt::intersection(Some(&native), Some(&bitmap)).unwrap();
        assert_eq!(merged, Some(Collection::Set(vec![2, 3])));

        let merged = adapt::union(Some(&native), Some(&bitmap)).unwrap();
        assert_eq!(merged, Some(Collection::Set(vec![1, 2, 3, 5, 8])));

        let merged = adapt::difference(Some(&bitmap), Some(&native)).unwrap();
        assert_eq!(merged, Some(Collection::Set(vec![5, 8])));

        assert_eq!(BitmapSet::from(&native).len(), 3);
    }

    #[test]
    fn bitmap_refuses_mapping_operands() {
        let bitmap: BitmapSet = vec![1u32, 2].into_iter().collect();
        let mapping = Collection::Bucket(vec![(1, 10)]);

        let error = adapt::union(Some(&mapping), Some(&bitmap)).unwrap_err();
        assert!(matches!(error, crate::Error::NoMergeModule { .. }));
    }

    #[test]
    fn weighted_merges_follow_the_set_rules() {
        let left: BitmapSet = vec![1u32, 2].into_iter().collect();
        let right: BitmapSet = vec![2u32, 3].into_iter().collect();

        let (weight, merged) = adapt::weighted_union(Some(&left), Some(&right), 3, 4).unwrap();
        assert_eq!(weight, 1);
        assert_eq!(merged, Some(Collection::Set(vec![1, 2, 3])));

        let (weight, merged) =
            adapt::weighted_intersection(Some(&left), Some(&right), 3, 4).unwrap();
        assert_eq!(weight, 7);
        assert_eq!(merged, Some(Collection::Set(vec![2])));
    }

    #[test]
    fn estimate_length_matches_cardinality() {
        let bitmap: BitmapSet = vec![7u32, 9, 11].into_iter().collect();
        assert_eq!(EstimateLength::estimate_length(&bitmap), 3);
    }
}
