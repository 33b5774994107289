use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde_json::Value;

use super::{range_values, CatalogIndex, Length};
use crate::discriminator::{Discriminator, IndexableValue};
use crate::set::{ops, Collection};
use crate::{DocumentId, Result};

/// A single-valued index over one discriminated document value.
///
/// The forward index maps a value to the ordered set of docids carrying it,
/// the reverse index maps a docid back to its value. Both views stay in
/// lockstep under every mutation and empty forward buckets are removed.
#[derive(Debug)]
pub struct FieldIndex<V> {
    pub(crate) discriminator: Discriminator,
    pub(crate) fwd: BTreeMap<V, BTreeSet<DocumentId>>,
    pub(crate) rev: BTreeMap<DocumentId, V>,
    pub(crate) num_docs: Length,
    pub(crate) force_lazy: Option<bool>,
    pub(crate) force_nbest: Option<bool>,
}

/// A point or inclusive-range query over the indexed values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldQuery<V> {
    Value(V),
    Range { min: Option<V>, max: Option<V> },
}

impl<V> FieldQuery<V> {
    pub fn range<A, B>(min: A, max: B) -> FieldQuery<V>
    where
        A: Into<Option<V>>,
        B: Into<Option<V>>,
    {
        FieldQuery::Range { min: min.into(), max: max.into() }
    }
}

impl<V> From<V> for FieldQuery<V> {
    fn from(value: V) -> FieldQuery<V> {
        FieldQuery::Value(value)
    }
}

impl<V: IndexableValue> FieldIndex<V> {
    pub fn new(discriminator: Discriminator) -> FieldIndex<V> {
        FieldIndex {
            discriminator,
            fwd: BTreeMap::new(),
            rev: BTreeMap::new(),
            num_docs: Length::default(),
            force_lazy: None,
            force_nbest: None,
        }
    }

    pub fn len(&self) -> u64 {
        self.num_docs.value()
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs.value() == 0
    }

    /// The number of distinct values currently indexed.
    pub fn values_count(&self) -> usize {
        self.fwd.len()
    }

    pub fn value_for(&self, docid: DocumentId) -> Option<&V> {
        self.rev.get(&docid)
    }

    pub fn indexed_docids(&self) -> Collection {
        Collection::Set(self.rev.keys().copied().collect())
    }

    pub fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        let value = match self.discriminator.discriminate(document) {
            Some(value) => V::from_document_value(&value)?,
            None => {
                self.unindex_doc(docid);
                return Ok(());
            }
        };
        if self.rev.get(&docid) == Some(&value) {
            return Ok(());
        }
        if self.rev.contains_key(&docid) {
            self.remove(docid);
        }
        self.insert(docid, value);
        Ok(())
    }

    pub fn unindex_doc(&mut self, docid: DocumentId) {
        self.remove(docid);
    }

    pub fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        self.unindex_doc(docid);
        self.index_doc(docid, document)
    }

    pub fn clear(&mut self) {
        self.fwd.clear();
        self.rev.clear();
        self.num_docs = Length::default();
    }

    /// The union of the forward buckets matched by the query.
    pub fn apply(&self, query: &FieldQuery<V>) -> Collection {
        match query {
            FieldQuery::Value(value) => match self.fwd.get(value) {
                Some(docids) => Collection::Set(docids.iter().copied().collect()),
                None => Collection::empty(),
            },
            FieldQuery::Range { min, max } => {
                ops::multiunion(range_values(&self.fwd, min.clone(), max.clone()))
            }
        }
    }

    /// Apply the query, then keep only the docids also present in `docids`.
    /// An absent `docids` returns the bare query results.
    pub fn apply_intersect(&self, query: &FieldQuery<V>, docids: Option<&Collection>) -> Collection {
        let results = self.apply(query);
        match ops::intersection(Some(&results), docids) {
            Some(collection) => collection,
            None => Collection::empty(),
        }
    }

    pub(crate) fn insert(&mut self, docid: DocumentId, value: V) {
        self.fwd.entry(value.clone()).or_insert_with(BTreeSet::new).insert(docid);
        self.rev.insert(docid, value);
        self.num_docs.change(1);
    }

    pub(crate) fn remove(&mut self, docid: DocumentId) -> Option<V> {
        let value = self.rev.remove(&docid)?;
        match self.fwd.get_mut(&value) {
            Some(docids) => {
                docids.remove(&docid);
                if docids.is_empty() {
                    self.fwd.remove(&value);
                }
            }
            None => warn!(
                "forward bucket for value {:?} is missing while unindexing document {}",
                value, docid,
            ),
        }
        self.num_docs.change(-1);
        Some(value)
    }
}

impl<V: IndexableValue> CatalogIndex for FieldIndex<V> {
    fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        FieldIndex::index_doc(self, docid, document)
    }

    fn unindex_doc(&mut self, docid: DocumentId) {
        FieldIndex::unindex_doc(self, docid)
    }

    fn clear(&mut self) {
        FieldIndex::clear(self)
    }

    fn indexed_count(&self) -> u64 {
        self.num_docs.value()
    }
}
