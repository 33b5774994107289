use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde_json::Value;
use smallvec::SmallVec;

use super::{CatalogIndex, Length};
use crate::discriminator::Discriminator;
use crate::query::Operator;
use crate::set::{ops, Collection};
use crate::{DocumentId, Error, Result};

/// Index over slash-separated hierarchical identifiers.
///
/// Every non-empty path component becomes a key of `index`; under it, the
/// depth of the component maps to the set of docids carrying that component
/// at that depth. A path is either a string (`"/a/b/c"`) or a sequence whose
/// first element, the root, is dropped.
#[derive(Debug)]
pub struct PathIndex {
    discriminator: Discriminator,
    index: BTreeMap<String, BTreeMap<usize, BTreeSet<DocumentId>>>,
    unindex: BTreeMap<DocumentId, String>,
    depth: usize,
    length: Length,
    not_indexed: BTreeSet<DocumentId>,
}

/// One or more paths, a base level and an operator.
///
/// A negative level matches the components at every depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub paths: Vec<String>,
    pub level: i64,
    pub operator: Operator,
}

impl PathQuery {
    pub fn new<I, S>(paths: I) -> PathQuery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathQuery {
            paths: paths.into_iter().map(Into::into).collect(),
            level: 0,
            operator: Operator::Or,
        }
    }

    pub fn with_level(mut self, level: i64) -> PathQuery {
        self.level = level;
        self
    }

    pub fn with_operator(mut self, operator: Operator) -> PathQuery {
        self.operator = operator;
        self
    }

    /// Parse a query from its JSON shape: a bare path, a sequence of paths,
    /// or a mapping `{"query", "level", "operator"}` with defaults
    /// `level = 0` and `operator = "or"` (case-insensitive).
    pub fn from_value(value: &Value) -> Result<PathQuery> {
        match value {
            Value::String(path) => Ok(PathQuery::new(vec![path.clone()])),
            Value::Array(paths) => Ok(PathQuery::new(string_items(paths, value)?)),
            Value::Object(query) => {
                let paths = match query.get("query") {
                    None => Vec::new(),
                    Some(Value::String(path)) => vec![path.clone()],
                    Some(Value::Array(paths)) => string_items(paths, value)?,
                    Some(_other) => return Err(Error::InvalidPathQuery(value.clone())),
                };
                let level = match query.get("level") {
                    None => 0,
                    Some(level) => {
                        level.as_i64().ok_or_else(|| Error::InvalidPathQuery(value.clone()))?
                    }
                };
                let operator = match query.get("operator") {
                    None => Operator::Or,
                    Some(Value::String(operator)) => operator.parse()?,
                    Some(_other) => return Err(Error::InvalidPathQuery(value.clone())),
                };
                Ok(PathQuery { paths, level, operator })
            }
            other => Err(Error::InvalidPathQuery(other.clone())),
        }
    }
}

impl From<&str> for PathQuery {
    fn from(path: &str) -> PathQuery {
        PathQuery::new(vec![path])
    }
}

impl From<(&str, i64)> for PathQuery {
    fn from((path, level): (&str, i64)) -> PathQuery {
        PathQuery::new(vec![path]).with_level(level)
    }
}

fn string_items(items: &[Value], query: &Value) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(path) => Ok(path.clone()),
            _other => Err(Error::InvalidPathQuery(query.clone())),
        })
        .collect()
}

type Components<'a> = SmallVec<[&'a str; 8]>;

fn split_components(path: &str) -> Components {
    path.split('/').filter(|component| !component.is_empty()).collect()
}

/// The stored path string for a document value: a string is kept as-is, a
/// sequence is joined with slashes after dropping its root element.
fn path_from_value(value: &Value) -> Result<String> {
    match value {
        Value::String(path) => Ok(path.clone()),
        Value::Array(parts) => {
            let mut components = Vec::with_capacity(parts.len().saturating_sub(1));
            for part in parts.iter().skip(1) {
                match part {
                    Value::String(component) => components.push(component.as_str()),
                    other => {
                        return Err(Error::InvalidFieldValue {
                            expected: "path component string",
                            value: other.clone(),
                        })
                    }
                }
            }
            Ok(format!("/{}", components.join("/")))
        }
        Value::Object(_) => Err(Error::ObjectPathValue(value.clone())),
        other => Err(Error::InvalidFieldValue {
            expected: "path string or sequence",
            value: other.clone(),
        }),
    }
}

impl PathIndex {
    pub fn new(discriminator: Discriminator) -> PathIndex {
        PathIndex {
            discriminator,
            index: BTreeMap::new(),
            unindex: BTreeMap::new(),
            depth: 0,
            length: Length::default(),
            not_indexed: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> u64 {
        self.length.value()
    }

    pub fn is_empty(&self) -> bool {
        self.length.value() == 0
    }

    /// The deepest component position seen since the last clear.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The stored, normalised path of a docid.
    pub fn path_of(&self, docid: DocumentId) -> Option<&str> {
        self.unindex.get(&docid).map(|path| path.as_str())
    }

    pub fn indexed_docids(&self) -> Collection {
        Collection::Set(self.unindex.keys().copied().collect())
    }

    /// The docids whose discriminator yielded no value.
    pub fn not_indexed(&self) -> Collection {
        Collection::Set(self.not_indexed.iter().copied().collect())
    }

    pub fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        let value = match self.discriminator.discriminate(document) {
            Some(value) => value,
            None => {
                self.unindex_doc(docid);
                self.not_indexed.insert(docid);
                return Ok(());
            }
        };
        let path = path_from_value(&value)?;

        self.not_indexed.remove(&docid);
        if self.unindex.contains_key(&docid) {
            // Drop the previous path so no stale component posting survives.
            self.unindex_doc(docid);
        }

        for (level, component) in split_components(&path).iter().enumerate() {
            self.insert_entry(component, docid, level);
        }
        self.length.change(1);
        self.unindex.insert(docid, path);
        Ok(())
    }

    pub fn unindex_doc(&mut self, docid: DocumentId) {
        self.not_indexed.remove(&docid);
        let path = match self.unindex.remove(&docid) {
            Some(path) => path,
            None => return,
        };
        for (level, component) in split_components(&path).iter().enumerate() {
            let empty_component = match self.index.get_mut(*component) {
                Some(levels) => {
                    if let Some(docids) = levels.get_mut(&level) {
                        docids.remove(&docid);
                        if docids.is_empty() {
                            levels.remove(&level);
                        }
                    } else {
                        warn!(
                            "no posting for component `{}` at level {} while unindexing document {}",
                            component, level, docid,
                        );
                    }
                    levels.is_empty()
                }
                None => {
                    warn!(
                        "component `{}` is missing while unindexing document {}",
                        component, docid,
                    );
                    false
                }
            };
            if empty_component {
                self.index.remove(*component);
            }
        }
        self.length.change(-1);
    }

    pub fn reindex_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        self.unindex_doc(docid);
        self.index_doc(docid, document)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.unindex.clear();
        self.depth = 0;
        self.length = Length::default();
        self.not_indexed.clear();
    }

    /// Match the path components starting at `level`, or at every level when
    /// `level` is negative. An empty path matches every indexed docid.
    pub fn search(&self, path: &str, level: i64) -> Collection {
        let components = split_components(path);
        if components.is_empty() {
            return self.indexed_docids();
        }

        if level >= 0 {
            match self.conjunction(&components, level as usize) {
                Some(docids) => Collection::Set(docids.into_iter().collect()),
                None => Collection::empty(),
            }
        } else {
            let mut results = BTreeSet::new();
            for base in 0..=self.depth {
                if let Some(docids) = self.conjunction(&components, base) {
                    results.extend(docids);
                }
            }
            Collection::Set(results.into_iter().collect())
        }
    }

    /// Intersect the successive component postings with the given base
    /// offset; a missing component or level aborts the whole match.
    fn conjunction(&self, components: &[&str], base: usize) -> Option<BTreeSet<DocumentId>> {
        let mut result: Option<BTreeSet<DocumentId>> = None;
        for (offset, component) in components.iter().enumerate() {
            let docids = self.index.get(*component)?.get(&(base + offset))?;
            result = Some(match result {
                None => docids.clone(),
                Some(matched) => matched.intersection(docids).copied().collect(),
            });
        }
        result
    }

    pub fn apply(&self, query: &PathQuery) -> Collection {
        let mut sets: Vec<Collection> =
            query.paths.iter().map(|path| self.search(path, query.level)).collect();

        match query.operator {
            Operator::Or => ops::multiunion(&sets),
            Operator::And => {
                sets.sort_by_key(|set| set.len());
                let mut result: Option<Collection> = None;
                for set in &sets {
                    result = ops::intersection(result.as_ref(), Some(set));
                    match &result {
                        Some(merged) if merged.is_empty() => break,
                        _otherwise => {}
                    }
                }
                result.unwrap_or_else(Collection::empty)
            }
        }
    }

    fn insert_entry(&mut self, component: &str, docid: DocumentId, level: usize) {
        let levels = self.index.entry(component.to_string()).or_insert_with(BTreeMap::new);
        levels.entry(level).or_insert_with(BTreeSet::new).insert(docid);
        if level > self.depth {
            self.depth = level;
        }
    }
}

impl CatalogIndex for PathIndex {
    fn index_doc(&mut self, docid: DocumentId, document: &Value) -> Result<()> {
        PathIndex::index_doc(self, docid, document)
    }

    fn unindex_doc(&mut self, docid: DocumentId) {
        PathIndex::unindex_doc(self, docid)
    }

    fn clear(&mut self) {
        PathIndex::clear(self)
    }

    fn indexed_count(&self) -> u64 {
        self.length.value()
    }
}
