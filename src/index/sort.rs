//! Sort-with-limit over a field index.
//!
//! Three strategies cover the space: a lazy scan of the forward index for
//! result sets much larger than the index, an n-best selection when a limit
//! keeps only a small fraction, and a full materialised sort otherwise.
//! When both advisory flags trigger, n-best wins.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeSet};

use crate::discriminator::IndexableValue;
use crate::set::Collection;
use crate::{DocumentId, Error, Result};

use super::field::FieldIndex;

/// Below this fraction of the result set, a limit makes n-best worthwhile.
const NBEST_MAX_FRACTION: f64 = 0.25;

impl<V: IndexableValue> FieldIndex<V> {
    /// Force or clear the lazy-strategy flag; testing knob.
    pub fn force_lazy(&mut self, force: Option<bool>) {
        self.force_lazy = force;
    }

    /// Force or clear the n-best-strategy flag; testing knob.
    pub fn force_nbest(&mut self, force: Option<bool>) {
        self.force_nbest = force;
    }

    /// Sort `docids` by their indexed value, ascending by default, ties
    /// broken by docid. Docids unknown to the reverse index are silently
    /// dropped; at most `limit` docids are produced when a limit is given.
    pub fn sort<'a>(
        &'a self,
        docids: &'a Collection,
        reverse: bool,
        limit: Option<usize>,
    ) -> Result<SortedDocids<'a>> {
        if limit == Some(0) {
            return Err(Error::InvalidLimit);
        }

        let rlen = docids.len();
        let numdocs = self.num_docs.value() as usize;
        if rlen == 0 || numdocs == 0 {
            return Ok(SortedDocids { inner: Strategy::Done });
        }

        // Empirical threshold: a lazy scan of the forward index pays off
        // when the result set is much larger than the index.
        let mut use_lazy = rlen > numdocs * (rlen / 100 + 1);
        let mut use_nbest = match limit {
            Some(limit) => (limit as f64) / (rlen as f64) < NBEST_MAX_FRACTION,
            None => false,
        };

        if let Some(force) = self.force_nbest {
            // n-best cannot run without a limit, forced or not.
            use_nbest = force && limit.is_some();
        }
        if let Some(force) = self.force_lazy {
            use_lazy = force;
        }

        let inner = match (use_nbest, limit) {
            (true, Some(limit)) => {
                if reverse {
                    self.nbest_descending(docids, limit)
                } else if limit * 10 <= rlen {
                    self.nbest_ascending_buffer(docids, limit)
                } else {
                    self.nbest_ascending_heap(docids, limit)
                }
            }
            _ if use_lazy => Strategy::Lazy {
                buckets: if reverse {
                    Box::new(self.fwd.values().rev())
                } else {
                    Box::new(self.fwd.values())
                },
                current: None,
                input: docids,
                remaining: limit,
                reverse,
            },
            _ => self.full_sort(docids, reverse, limit),
        };

        Ok(SortedDocids { inner })
    }

    /// The `(value, docid)` pairs of the input docids known to the reverse
    /// index, in input order.
    fn sort_pairs<'a>(
        &'a self,
        docids: &'a Collection,
    ) -> impl Iterator<Item = (&'a V, DocumentId)> + 'a {
        docids.keys().filter_map(move |docid| self.rev.get(&docid).map(|value| (value, docid)))
    }

    fn nbest_descending<'a>(&'a self, docids: &'a Collection, limit: usize) -> Strategy<'a> {
        // A bounded min-heap keeps the `limit` largest pairs seen so far.
        let mut heap: BinaryHeap<Reverse<(&V, DocumentId)>> =
            BinaryHeap::with_capacity(limit + 1);
        for pair in self.sort_pairs(docids) {
            heap.push(Reverse(pair));
            if heap.len() > limit {
                heap.pop();
            }
        }
        let mut pairs: Vec<_> = heap.into_iter().map(|Reverse(pair)| pair).collect();
        pairs.sort_unstable_by(|left, right| right.cmp(left));
        Strategy::Materialized(pairs.into_iter().map(|(_, docid)| docid).collect::<Vec<_>>().into_iter())
    }

    fn nbest_ascending_buffer<'a>(&'a self, docids: &'a Collection, limit: usize) -> Strategy<'a> {
        let mut pairs = self.sort_pairs(docids);
        let mut buffer: Vec<(&V, DocumentId)> = pairs.by_ref().take(limit).collect();
        buffer.sort_unstable();
        if buffer.is_empty() {
            return Strategy::Done;
        }
        let mut largest = buffer[buffer.len() - 1];
        for pair in pairs {
            if largest <= pair {
                continue;
            }
            let at = match buffer.binary_search(&pair) {
                Ok(at) => at,
                Err(at) => at,
            };
            buffer.insert(at, pair);
            buffer.pop();
            largest = buffer[buffer.len() - 1];
        }
        Strategy::Materialized(buffer.into_iter().map(|(_, docid)| docid).collect::<Vec<_>>().into_iter())
    }

    fn nbest_ascending_heap<'a>(&'a self, docids: &'a Collection, limit: usize) -> Strategy<'a> {
        let mut heap: BinaryHeap<Reverse<(&V, DocumentId)>> =
            self.sort_pairs(docids).map(Reverse).collect();
        let take = limit.min(heap.len());
        let mut sorted = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(Reverse((_, docid))) = heap.pop() {
                sorted.push(docid);
            }
        }
        Strategy::Materialized(sorted.into_iter())
    }

    fn full_sort<'a>(
        &'a self,
        docids: &'a Collection,
        reverse: bool,
        limit: Option<usize>,
    ) -> Strategy<'a> {
        let mut pairs: Vec<(&V, DocumentId)> = self.sort_pairs(docids).collect();
        // Input docids ascend, so the stable sort keeps equal values in
        // ascending docid order in both directions.
        if reverse {
            pairs.sort_by(|left, right| right.0.cmp(left.0));
        } else {
            pairs.sort_by(|left, right| left.0.cmp(right.0));
        }
        let take = limit.unwrap_or_else(|| pairs.len()).min(pairs.len());
        let sorted: Vec<DocumentId> =
            pairs.into_iter().take(take).map(|(_, docid)| docid).collect();
        Strategy::Materialized(sorted.into_iter())
    }
}

/// Docids in sorted order; see [`FieldIndex::sort`].
pub struct SortedDocids<'a> {
    inner: Strategy<'a>,
}

enum Strategy<'a> {
    Done,
    Materialized(std::vec::IntoIter<DocumentId>),
    Lazy {
        buckets: Box<dyn Iterator<Item = &'a BTreeSet<DocumentId>> + 'a>,
        current: Option<Box<dyn Iterator<Item = DocumentId> + 'a>>,
        input: &'a Collection,
        remaining: Option<usize>,
        reverse: bool,
    },
}

impl<'a> Iterator for SortedDocids<'a> {
    type Item = DocumentId;

    fn next(&mut self) -> Option<DocumentId> {
        match &mut self.inner {
            Strategy::Done => None,
            Strategy::Materialized(sorted) => sorted.next(),
            Strategy::Lazy { buckets, current, input, remaining, reverse } => {
                if *remaining == Some(0) {
                    return None;
                }
                loop {
                    if let Some(docids) = current.as_mut() {
                        while let Some(docid) = docids.next() {
                            if input.contains(docid) {
                                if let Some(remaining) = remaining.as_mut() {
                                    *remaining -= 1;
                                }
                                return Some(docid);
                            }
                        }
                    }
                    let bucket = buckets.next()?;
                    *current = Some(if *reverse {
                        Box::new(bucket.iter().rev().copied())
                    } else {
                        Box::new(bucket.iter().copied())
                    });
                }
            }
        }
    }
}
