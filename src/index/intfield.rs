use std::collections::{BTreeMap, BTreeSet};

use either::Either;
use log::{debug, warn};
use serde_json::Value;

use super::field::FieldIndex;
use super::sort::SortedDocids;
use super::{range_values, CatalogIndex};
use crate::discriminator::{Discriminator, IndexableValue};
use crate::query::{Operator, Range};
use crate::set::{ops, Collection};
use crate::{DocumentId, Error, Result};

/// Indexes integer values behind several granularity levels.
///
/// Next to the plain forward index, one coarse forward index per level maps
/// `value / level` (floor division) to the docids falling in that coarse
/// bucket. Large ranges are then answered from a handful of coarse buckets
/// instead of thousands of fine ones.
#[derive(Debug)]
pub struct IntFieldIndex {
    inner: FieldIndex<i64>,
    granular: Vec<GranularLevel>,
}

#[derive(Debug)]
struct GranularLevel {
    level: i64,
    buckets: BTreeMap<i64, BTreeSet<DocumentId>>,
}

/// One or more scalar or range queries, combined with an operator.
#[derive(Debug, Clone)]
pub struct IntQuery {
    pub queries: Vec<Either<i64, Range>>,
    pub operator: Operator,
}

impl IntQuery {
    pub fn new(queries: Vec<Either<i64, Range>>, operator: Operator) -> IntQuery {
        IntQuery { queries, operator }
    }

    pub fn ranges(ranges: Vec<Range>, operator: Operator) -> IntQuery {
        IntQuery { queries: ranges.into_iter().map(Either::Right).collect(), operator }
    }
}

impl From<i64> for IntQuery {
    fn from(value: i64) -> IntQuery {
        IntQuery { queries: vec![Either::Left(value)], operator: Operator::Or }
    }
}

impl From<Range> for IntQuery {
    fn from(range: Range) -> IntQuery {
        IntQuery { queries: vec![Either::Right(range)], operator: Operator::Or }
    }
}

impl From<Vec<Range>> for IntQuery {
    fn from(ranges: Vec<Range>) -> IntQuery {
        IntQuery::ranges(ranges, Operator::Or)
    }
}

impl IntFieldIndex {
    pub const DEFAULT_LEVELS: &'static [i64] = &[1000];

    pub fn new(discriminator: Discriminator) -> IntFieldIndex {
        IntFieldIndex {
            inner: FieldIndex::new(discriminator),
            granular: granular_levels(Self::DEFAULT_LEVELS),
        }
    }

    /// `levels` is the sequence of coarseness levels; every level must be
    /// 1 or greater.
    pub fn with_levels(discriminator: Discriminator, levels: &[i64]) -> Result<IntFieldIndex> {
        for &level in levels {
            if level < 1 {
                return Err(Error::InvalidLevel(level));
            }
        }
        Ok(IntFieldIndex {
            inner: FieldIndex::new(discriminator),
            granular: granular_levels(levels),
        })
    }

    /// Rebuild an integer index from an existing field index, copying the
    /// postings without re-discriminating any document.
    pub fn from_field_index(index: FieldIndex<i64>, levels: &[i64]) -> Result<IntFieldIndex> {
        for &level in levels {
            if level < 1 {
                return Err(Error::InvalidLevel(level));
            }
        }
        let mut granular = granular_levels(levels);
        for (&value, docids) in &index.fwd {
            for granular in granular.iter_mut() {
                granular
                    .buckets
                    .entry(value.div_euclid(granular.level))
                    .or_insert_with(BTreeSet::new)
                    .extend(docids.iter().copied());
            }
        }
        Ok(IntFieldIndex { inner: index, granular })
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn levels(&self) -> impl Iterator<Item = i64> + '_ {
        self.granular.iter().map(|granular| granular.level)
    }

    pub fn value_for(&self, docid: DocumentId) -> Option<i64> {
        self.inner.value_for(docid).copied()
    }

    pub fn indexed_docids(&self) -> Collection {
        self.inner.indexed_docids()
    }

    /// The plain field-index view, for point queries and sorting.
    pub fn as_field_index(&self) -> &FieldIndex<i64> {
        &self.inner
    }

    pub fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        let value = match self.inner.discriminator.discriminate(document) {
            Some(value) => i64::from_document_value(&value)?,
            None => {
                self.unindex_doc(docid);
                return Ok(());
            }
        };
        if self.inner.value_for(docid) == Some(&value) {
            return Ok(());
        }
        self.unindex_doc(docid);
        self.inner.insert(docid, value);
        for granular in self.granular.iter_mut() {
            granular
                .buckets
                .entry(value.div_euclid(granular.level))
                .or_insert_with(BTreeSet::new)
                .insert(docid);
        }
        Ok(())
    }

    pub fn unindex_doc(&mut self, docid: DocumentId) {
        let value = match self.inner.remove(docid) {
            Some(value) => value,
            None => return,
        };
        for granular in self.granular.iter_mut() {
            let coarse = value.div_euclid(granular.level);
            match granular.buckets.get_mut(&coarse) {
                Some(docids) => {
                    docids.remove(&docid);
                    if docids.is_empty() {
                        granular.buckets.remove(&coarse);
                    }
                }
                None => warn!(
                    "granular bucket {} at level {} is missing while unindexing document {}",
                    coarse, granular.level, docid,
                ),
            }
        }
    }

    pub fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        self.unindex_doc(docid);
        self.index_doc(docid, document)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        for granular in self.granular.iter_mut() {
            granular.buckets.clear();
        }
    }

    pub fn apply<Q: Into<IntQuery>>(&self, query: Q) -> Collection {
        let query = query.into();
        self.search(&query.queries, query.operator)
    }

    /// Answer each query element from the granular planner, then combine:
    /// `and` intersects smallest-first, `or` takes the multiunion.
    pub fn search(&self, queries: &[Either<i64, Range>], operator: Operator) -> Collection {
        let mut sets = Vec::with_capacity(queries.len());
        for query in queries {
            let range = match query {
                Either::Left(value) => Range::from(*value),
                Either::Right(range) => *range,
            };
            let (min, max) = range.as_tuple();
            sets.push(ops::multiunion(self.docids_in_range(min, max)));
        }

        if sets.len() == 1 {
            return sets.remove(0);
        }

        match operator {
            Operator::And => {
                sets.sort_by_key(|set| set.len());
                let mut result: Option<Collection> = None;
                for set in &sets {
                    result = ops::intersection(Some(set), result.as_ref());
                }
                result.unwrap_or_else(Collection::empty)
            }
            Operator::Or => ops::multiunion(&sets),
        }
    }

    pub fn sort<'a>(
        &'a self,
        docids: &'a Collection,
        reverse: bool,
        limit: Option<usize>,
    ) -> Result<SortedDocids<'a>> {
        self.inner.sort(docids, reverse, limit)
    }

    /// The posting sets covering the inclusive `[min, max]` range, ready for
    /// a multiunion. Coarse buckets fill the bulk of the range; the gaps on
    /// both sides are refined through the remaining finer levels, and the
    /// plain forward index only serves ranges no level can cover.
    pub fn docids_in_range(
        &self,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Vec<&BTreeSet<DocumentId>> {
        self.range_sets(&self.granular, min, max)
    }

    fn range_sets<'a>(
        &'a self,
        levels: &'a [GranularLevel],
        min: Option<i64>,
        max: Option<i64>,
    ) -> Vec<&'a BTreeSet<DocumentId>> {
        for (position, granular) in levels.iter().enumerate() {
            let level = granular.level;
            // Only coarse buckets lying wholly inside [min, max] are usable:
            // `a` is the first such bucket, `b` the last.
            let a = min.map(|min| (min + level - 1).div_euclid(level));
            let b = max.map(|max| (max - level + 1).div_euclid(level));
            let covers = match (a, b) {
                (Some(a), Some(b)) => a <= b,
                _unbounded => true,
            };
            if !covers {
                continue;
            }

            debug!("range [{:?}, {:?}] covered at level {}", min, max, level);
            let finer = &levels[position + 1..];
            let mut sets = Vec::new();
            if let (Some(min), Some(a)) = (min, a) {
                if min < a * level {
                    sets.extend(self.range_sets(finer, Some(min), Some(a * level - 1)));
                }
            }
            sets.extend(range_values(&granular.buckets, a, b));
            if let (Some(max), Some(b)) = (max, b) {
                if (b + 1) * level - 1 < max {
                    sets.extend(self.range_sets(finer, Some((b + 1) * level), Some(max)));
                }
            }
            return sets;
        }

        range_values(&self.inner.fwd, min, max).collect()
    }
}

fn granular_levels(levels: &[i64]) -> Vec<GranularLevel> {
    let mut levels = levels.to_vec();
    // Coarsest first; the planner walks them in that order.
    levels.sort_unstable_by(|left, right| right.cmp(left));
    levels.dedup();
    levels.into_iter().map(|level| GranularLevel { level, buckets: BTreeMap::new() }).collect()
}

impl CatalogIndex for IntFieldIndex {
    fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        IntFieldIndex::index_doc(self, docid, document)
    }

    fn unindex_doc(&mut self, docid: DocumentId) {
        IntFieldIndex::unindex_doc(self, docid)
    }

    fn clear(&mut self) {
        IntFieldIndex::clear(self)
    }

    fn indexed_count(&self) -> u64 {
        self.inner.len()
    }
}
