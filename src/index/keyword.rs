use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde_json::Value;

use super::{CatalogIndex, Length};
use crate::discriminator::Discriminator;
use crate::query::Operator;
use crate::set::{ops, Collection};
use crate::{DocumentId, Error, Result};

/// A multi-valued index: the discriminated value is a sequence of terms and
/// a docid appears in the forward bucket of each of its terms. An empty term
/// sequence behaves like the sentinel and unindexes the document.
#[derive(Debug)]
pub struct KeywordIndex {
    discriminator: Discriminator,
    fwd: BTreeMap<String, BTreeSet<DocumentId>>,
    rev: BTreeMap<DocumentId, BTreeSet<String>>,
    num_docs: Length,
}

fn terms_from_value(value: &Value) -> Result<BTreeSet<String>> {
    match value {
        Value::Array(terms) => terms
            .iter()
            .map(|term| match term {
                Value::String(term) => Ok(term.clone()),
                other => Err(Error::InvalidFieldValue {
                    expected: "keyword string",
                    value: other.clone(),
                }),
            })
            .collect(),
        other => Err(Error::InvalidFieldValue {
            expected: "sequence of keywords",
            value: other.clone(),
        }),
    }
}

impl KeywordIndex {
    pub fn new(discriminator: Discriminator) -> KeywordIndex {
        KeywordIndex {
            discriminator,
            fwd: BTreeMap::new(),
            rev: BTreeMap::new(),
            num_docs: Length::default(),
        }
    }

    pub fn len(&self) -> u64 {
        self.num_docs.value()
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs.value() == 0
    }

    /// The number of distinct terms currently indexed.
    pub fn terms_count(&self) -> usize {
        self.fwd.len()
    }

    pub fn terms_for(&self, docid: DocumentId) -> Option<&BTreeSet<String>> {
        self.rev.get(&docid)
    }

    pub fn indexed_docids(&self) -> Collection {
        Collection::Set(self.rev.keys().copied().collect())
    }

    pub fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        let terms = match self.discriminator.discriminate(document) {
            Some(value) => terms_from_value(&value)?,
            None => {
                self.unindex_doc(docid);
                return Ok(());
            }
        };
        if terms.is_empty() {
            self.unindex_doc(docid);
            return Ok(());
        }

        match self.rev.get(&docid).cloned() {
            Some(old) if old == terms => {}
            Some(old) => {
                // Only the difference moves.
                for term in old.difference(&terms) {
                    self.remove_term(term, docid);
                }
                for term in terms.difference(&old) {
                    self.insert_term(term, docid);
                }
                self.rev.insert(docid, terms);
            }
            None => {
                for term in &terms {
                    self.insert_term(term, docid);
                }
                self.rev.insert(docid, terms);
                self.num_docs.change(1);
            }
        }
        Ok(())
    }

    pub fn unindex_doc(&mut self, docid: DocumentId) {
        if let Some(terms) = self.rev.remove(&docid) {
            for term in &terms {
                self.remove_term(term, docid);
            }
            self.num_docs.change(-1);
        }
    }

    /// Indexing already diffs the old and new term sets.
    pub fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        self.index_doc(docid, document)
    }

    pub fn clear(&mut self) {
        self.fwd.clear();
        self.rev.clear();
        self.num_docs = Length::default();
    }

    /// `or` unions the term buckets, `and` intersects them smallest-first,
    /// stopping early on an empty intermediate result.
    pub fn search<I, S>(&self, terms: I, operator: Operator) -> Collection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let buckets: Vec<Option<&BTreeSet<DocumentId>>> =
            terms.into_iter().map(|term| self.fwd.get(term.as_ref())).collect();

        match operator {
            Operator::Or => ops::multiunion(buckets.iter().flatten().copied()),
            Operator::And => {
                if buckets.is_empty() || buckets.iter().any(|bucket| bucket.is_none()) {
                    return Collection::empty();
                }
                let mut sorted: Vec<&BTreeSet<DocumentId>> =
                    buckets.into_iter().flatten().collect();
                sorted.sort_by_key(|bucket| bucket.len());

                let mut matched = sorted[0].clone();
                for bucket in &sorted[1..] {
                    matched = matched.intersection(bucket).copied().collect();
                    if matched.is_empty() {
                        break;
                    }
                }
                Collection::Set(matched.into_iter().collect())
            }
        }
    }

    pub fn apply_eq<S: AsRef<str>>(&self, term: S) -> Collection {
        self.search(Some(term), Operator::Or)
    }

    pub fn apply_any<I, S>(&self, terms: I) -> Collection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.search(terms, Operator::Or)
    }

    pub fn apply_in<I, S>(&self, terms: I) -> Collection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.search(terms, Operator::Or)
    }

    pub fn apply_all<I, S>(&self, terms: I) -> Collection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.search(terms, Operator::And)
    }

    fn insert_term(&mut self, term: &str, docid: DocumentId) {
        self.fwd.entry(term.to_string()).or_insert_with(BTreeSet::new).insert(docid);
    }

    fn remove_term(&mut self, term: &str, docid: DocumentId) {
        match self.fwd.get_mut(term) {
            Some(docids) => {
                docids.remove(&docid);
                if docids.is_empty() {
                    self.fwd.remove(term);
                }
            }
            None => warn!(
                "term bucket `{}` is missing while unindexing document {}",
                term, docid,
            ),
        }
    }
}

impl CatalogIndex for KeywordIndex {
    fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        KeywordIndex::index_doc(self, docid, document)
    }

    fn unindex_doc(&mut self, docid: DocumentId) {
        KeywordIndex::unindex_doc(self, docid)
    }

    fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        KeywordIndex::reindex_doc(self, docid, document)
    }

    fn clear(&mut self) {
        KeywordIndex::clear(self)
    }

    fn indexed_count(&self) -> u64 {
        self.num_docs.value()
    }
}
