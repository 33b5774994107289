//! Set algebra over heterogeneous collections.
//!
//! The operations here accept any ordered docid collection, native or
//! foreign. When both operands are native kinds the work goes to the native
//! module; otherwise each operand is asked, in order, for a merge module
//! compatible with both, through the merge-adapter capability. Absent
//! operands short-circuit before any module is selected.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::{ops, Collection};
use crate::{DocumentId, Error, Result, Weight};

/// Object-safe view over an ordered docid collection, native or foreign.
pub trait DocSet: fmt::Debug {
    fn is_mapping(&self) -> bool;

    fn len(&self) -> usize;

    fn contains(&self, docid: DocumentId) -> bool;

    /// `(docid, weight)` pairs in ascending docid order; key-only
    /// collections report a weight of `1`.
    fn entries(&self) -> Box<dyn Iterator<Item = (DocumentId, Weight)> + '_>;

    /// Native collections expose themselves so merges can skip the
    /// materialisation step.
    fn as_native(&self) -> Option<&Collection> {
        None
    }

    /// The merge-adapter capability, when this collection offers it.
    fn merge_adapter(&self) -> Option<&dyn MergeAdapter> {
        None
    }
}

/// Lets a foreign collection participate in the set algebra by negotiating
/// a module able to merge both operands.
pub trait MergeAdapter {
    /// `None` means this collection knows no way to merge with the other.
    fn get_module(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Option<Arc<dyn SetModule>>;
}

/// A length hint that may be cheaper than an exact count. May report 0 even
/// when the collection is not empty.
pub trait EstimateLength {
    fn estimate_length(&self) -> usize;
}

/// The operation table negotiated between two collections.
pub trait SetModule {
    fn union(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection;

    fn intersection(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection;

    fn difference(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection;

    fn weighted_union(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        w1: Weight,
        w2: Weight,
    ) -> (Weight, Collection);

    fn weighted_intersection(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        w1: Weight,
        w2: Weight,
    ) -> (Weight, Collection);
}

impl DocSet for Collection {
    fn is_mapping(&self) -> bool {
        Collection::is_mapping(self)
    }

    fn len(&self) -> usize {
        Collection::len(self)
    }

    fn contains(&self, docid: DocumentId) -> bool {
        Collection::contains(self, docid)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (DocumentId, Weight)> + '_> {
        Collection::entries(self)
    }

    fn as_native(&self) -> Option<&Collection> {
        Some(self)
    }
}

/// Snapshot any collection into a native one: a `Bucket` when it is
/// mapping-shaped, a `Set` otherwise.
pub fn materialize(set: &dyn DocSet) -> Collection {
    native_cow(set).into_owned()
}

fn native_cow(set: &dyn DocSet) -> Cow<Collection> {
    match set.as_native() {
        Some(native) => Cow::Borrowed(native),
        None if set.is_mapping() => Cow::Owned(Collection::Bucket(set.entries().collect())),
        None => Cow::Owned(Collection::Set(set.entries().map(|(key, _)| key).collect())),
    }
}

fn resolve_module(c1: &dyn DocSet, c2: &dyn DocSet) -> Result<Arc<dyn SetModule>> {
    if c1.as_native().is_some() && c2.as_native().is_some() {
        return Ok(Arc::new(NativeModule));
    }
    for candidate in &[c1, c2] {
        if let Some(adapter) = candidate.merge_adapter() {
            if let Some(module) = adapter.get_module(c1, c2) {
                return Ok(module);
            }
        }
    }
    Err(Error::NoMergeModule { left: format!("{:?}", c1), right: format!("{:?}", c2) })
}

pub fn union(c1: Option<&dyn DocSet>, c2: Option<&dyn DocSet>) -> Result<Option<Collection>> {
    match (c1, c2) {
        (None, other) => Ok(other.map(materialize)),
        (other, None) => Ok(other.map(materialize)),
        (Some(c1), Some(c2)) => Ok(Some(resolve_module(c1, c2)?.union(c1, c2))),
    }
}

pub fn intersection(
    c1: Option<&dyn DocSet>,
    c2: Option<&dyn DocSet>,
) -> Result<Option<Collection>> {
    match (c1, c2) {
        (None, other) => Ok(other.map(materialize)),
        (other, None) => Ok(other.map(materialize)),
        (Some(c1), Some(c2)) => Ok(Some(resolve_module(c1, c2)?.intersection(c1, c2))),
    }
}

pub fn difference(
    c1: Option<&dyn DocSet>,
    c2: Option<&dyn DocSet>,
) -> Result<Option<Collection>> {
    match (c1, c2) {
        (None, _) => Ok(None),
        (Some(c1), None) => Ok(Some(materialize(c1))),
        (Some(c1), Some(c2)) => Ok(Some(resolve_module(c1, c2)?.difference(c1, c2))),
    }
}

pub fn weighted_union(
    c1: Option<&dyn DocSet>,
    c2: Option<&dyn DocSet>,
    w1: Weight,
    w2: Weight,
) -> Result<(Weight, Option<Collection>)> {
    match (c1, c2) {
        (None, None) => Ok((0, None)),
        (None, Some(c2)) => Ok((w2, Some(materialize(c2)))),
        (Some(c1), None) => Ok((w1, Some(materialize(c1)))),
        (Some(c1), Some(c2)) => {
            let (weight, merged) = resolve_module(c1, c2)?.weighted_union(c1, c2, w1, w2);
            Ok((weight, Some(merged)))
        }
    }
}

pub fn weighted_intersection(
    c1: Option<&dyn DocSet>,
    c2: Option<&dyn DocSet>,
    w1: Weight,
    w2: Weight,
) -> Result<(Weight, Option<Collection>)> {
    match (c1, c2) {
        (None, None) => Ok((0, None)),
        (None, Some(c2)) => Ok((w2, Some(materialize(c2)))),
        (Some(c1), None) => Ok((w1, Some(materialize(c1)))),
        (Some(c1), Some(c2)) => {
            let (weight, merged) = resolve_module(c1, c2)?.weighted_intersection(c1, c2, w1, w2);
            Ok((weight, Some(merged)))
        }
    }
}

pub fn multiunion(sets: &[&dyn DocSet]) -> Result<Collection> {
    let natives: Option<Vec<&Collection>> = sets.iter().map(|set| set.as_native()).collect();
    match natives {
        Some(natives) => Ok(ops::multiunion(natives)),
        None => {
            let mut result: Option<Collection> = None;
            for set in sets {
                result = union(result.as_ref().map(|merged| merged as &dyn DocSet), Some(*set))?;
            }
            Ok(result.unwrap_or_else(Collection::empty))
        }
    }
}

/// The module merging the native kinds; also the generic fallback a foreign
/// module can use, since it only needs the `DocSet` view of its operands.
#[derive(Debug)]
struct NativeModule;

impl SetModule for NativeModule {
    fn union(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        ops::union_both(&native_cow(c1), &native_cow(c2))
    }

    fn intersection(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        ops::intersection_both(&native_cow(c1), &native_cow(c2))
    }

    fn difference(&self, c1: &dyn DocSet, c2: &dyn DocSet) -> Collection {
        ops::difference_both(&native_cow(c1), &native_cow(c2))
    }

    fn weighted_union(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        w1: Weight,
        w2: Weight,
    ) -> (Weight, Collection) {
        ops::weighted_union_both(&native_cow(c1), &native_cow(c2), w1, w2)
    }

    fn weighted_intersection(
        &self,
        c1: &dyn DocSet,
        c2: &dyn DocSet,
        w1: Weight,
        w2: Weight,
    ) -> (Weight, Collection) {
        ops::weighted_intersection_both(&native_cow(c1), &native_cow(c2), w1, w2)
    }
}
