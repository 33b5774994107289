pub mod adapt;
pub mod bitmap;
pub mod ops;

use std::collections::{BTreeMap, BTreeSet};
use std::iter::FromIterator;

use serde::{Deserialize, Serialize};

use crate::{DocumentId, Weight};

/// An ordered, deduplicated collection of docids.
///
/// The four kinds differ along two axes: mapping-shaped (each docid carries
/// a weight) versus key-only, and leaf storage versus tree storage. All four
/// iterate their keys in ascending order; `is_mapping` is the capability the
/// set algebra dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    /// Sorted, deduplicated docids in a single leaf.
    Set(Vec<DocumentId>),
    /// Tree-stored docids.
    TreeSet(BTreeSet<DocumentId>),
    /// Sorted `(docid, weight)` pairs in a single leaf.
    Bucket(Vec<(DocumentId, Weight)>),
    /// Tree-stored `(docid, weight)` pairs.
    BTree(BTreeMap<DocumentId, Weight>),
}

impl Collection {
    pub fn empty() -> Collection {
        Collection::Set(Vec::new())
    }

    pub fn is_mapping(&self) -> bool {
        match self {
            Collection::Set(_) | Collection::TreeSet(_) => false,
            Collection::Bucket(_) | Collection::BTree(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::Set(docids) => docids.len(),
            Collection::TreeSet(docids) => docids.len(),
            Collection::Bucket(pairs) => pairs.len(),
            Collection::BTree(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, docid: DocumentId) -> bool {
        match self {
            Collection::Set(docids) => docids.binary_search(&docid).is_ok(),
            Collection::TreeSet(docids) => docids.contains(&docid),
            Collection::Bucket(pairs) => {
                pairs.binary_search_by_key(&docid, |(key, _)| *key).is_ok()
            }
            Collection::BTree(pairs) => pairs.contains_key(&docid),
        }
    }

    /// The weight associated with a docid: the stored value for the mapping
    /// kinds, `1` for members of the key-only kinds.
    pub fn weight(&self, docid: DocumentId) -> Option<Weight> {
        match self {
            Collection::Set(_) | Collection::TreeSet(_) => {
                if self.contains(docid) {
                    Some(1)
                } else {
                    None
                }
            }
            Collection::Bucket(pairs) => pairs
                .binary_search_by_key(&docid, |(key, _)| *key)
                .ok()
                .map(|position| pairs[position].1),
            Collection::BTree(pairs) => pairs.get(&docid).copied(),
        }
    }

    /// The docids in ascending order.
    pub fn keys(&self) -> Box<dyn Iterator<Item = DocumentId> + '_> {
        match self {
            Collection::Set(docids) => Box::new(docids.iter().copied()),
            Collection::TreeSet(docids) => Box::new(docids.iter().copied()),
            Collection::Bucket(pairs) => Box::new(pairs.iter().map(|(key, _)| *key)),
            Collection::BTree(pairs) => Box::new(pairs.keys().copied()),
        }
    }

    /// `(docid, weight)` pairs in ascending docid order, the weight being `1`
    /// for the key-only kinds.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (DocumentId, Weight)> + '_> {
        match self {
            Collection::Set(docids) => Box::new(docids.iter().map(|key| (*key, 1))),
            Collection::TreeSet(docids) => Box::new(docids.iter().map(|key| (*key, 1))),
            Collection::Bucket(pairs) => Box::new(pairs.iter().copied()),
            Collection::BTree(pairs) => Box::new(pairs.iter().map(|(key, value)| (*key, *value))),
        }
    }
}

impl From<BTreeSet<DocumentId>> for Collection {
    fn from(docids: BTreeSet<DocumentId>) -> Collection {
        Collection::TreeSet(docids)
    }
}

impl From<BTreeMap<DocumentId, Weight>> for Collection {
    fn from(pairs: BTreeMap<DocumentId, Weight>) -> Collection {
        Collection::BTree(pairs)
    }
}

impl From<Vec<DocumentId>> for Collection {
    fn from(mut docids: Vec<DocumentId>) -> Collection {
        docids.sort_unstable();
        docids.dedup();
        Collection::Set(docids)
    }
}

impl FromIterator<DocumentId> for Collection {
    fn from_iter<I: IntoIterator<Item = DocumentId>>(docids: I) -> Collection {
        Collection::from(docids.into_iter().collect::<Vec<_>>())
    }
}

/// Anything that can stream its docids in ascending order. Lets the n-ary
/// operations accept both collections and the raw posting sets the indexes
/// store, without copying them first.
pub trait OrderedKeys {
    fn ordered_keys(&self) -> Box<dyn Iterator<Item = DocumentId> + '_>;
}

impl OrderedKeys for Collection {
    fn ordered_keys(&self) -> Box<dyn Iterator<Item = DocumentId> + '_> {
        self.keys()
    }
}

impl OrderedKeys for BTreeSet<DocumentId> {
    fn ordered_keys(&self) -> Box<dyn Iterator<Item = DocumentId> + '_> {
        Box::new(self.iter().copied())
    }
}
