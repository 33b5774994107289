pub mod field;
pub mod intfield;
pub mod keyword;
pub mod path;
pub mod sort;

use std::collections::BTreeMap;
use std::ops::Bound;

use either::Either;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DocumentId, Result};

/// Lifecycle shared by every index of the catalog.
///
/// Mutations are single-writer and atomic at the granularity of one docid:
/// every fallible step runs before the first write, so an error leaves the
/// index untouched.
pub trait CatalogIndex {
    fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()>;

    fn unindex_doc(&mut self, docid: DocumentId);

    fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        self.unindex_doc(docid);
        self.index_doc(docid, document)
    }

    fn clear(&mut self);

    /// The number of documents currently indexed.
    fn indexed_count(&self) -> u64;
}

/// Mutation counter of the persistence contract: the host may replace reads
/// and writes of this value with its own transactional counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Length(u64);

impl Length {
    pub fn new(value: u64) -> Length {
        Length(value)
    }

    pub fn change(&mut self, delta: i64) {
        self.0 = (self.0 as i64).saturating_add(delta).max(0) as u64;
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The values of `map` whose keys fall in the inclusive `[min, max]` range,
/// either endpoint optionally unbounded. An inverted pair of bounds yields
/// nothing instead of panicking like `BTreeMap::range` would.
pub(crate) fn range_values<K, S>(
    map: &BTreeMap<K, S>,
    min: Option<K>,
    max: Option<K>,
) -> impl Iterator<Item = &S>
where
    K: Ord,
{
    if let (Some(min), Some(max)) = (&min, &max) {
        if min > max {
            return Either::Left(std::iter::empty());
        }
    }
    let lower = match min {
        Some(key) => Bound::Included(key),
        None => Bound::Unbounded,
    };
    let upper = match max {
        Some(key) => Bound::Included(key),
        None => Bound::Unbounded,
    };
    Either::Right(map.range((lower, upper)).map(|(_, value)| value))
}
