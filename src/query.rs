use std::ops::{RangeFrom, RangeFull, RangeInclusive, RangeToInclusive};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the results of several query terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Or,
    And,
}

impl Default for Operator {
    fn default() -> Operator {
        Operator::Or
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Operator> {
        // Operator comparison is case-insensitive.
        match s.to_lowercase().as_str() {
            "or" => Ok(Operator::Or),
            "and" => Ok(Operator::And),
            _otherwise => Err(Error::UnknownOperator(s.to_string())),
        }
    }
}

/// An inclusive range of integers; either endpoint may be absent,
/// making that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Range {
    pub fn new<A, B>(min: A, max: B) -> Range
    where
        A: Into<Option<i64>>,
        B: Into<Option<i64>>,
    {
        Range { min: min.into(), max: max.into() }
    }

    pub fn unbounded() -> Range {
        Range { min: None, max: None }
    }

    pub fn as_tuple(&self) -> (Option<i64>, Option<i64>) {
        (self.min, self.max)
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| min <= value) && self.max.map_or(true, |max| value <= max)
    }
}

impl From<i64> for Range {
    fn from(value: i64) -> Range {
        Range::new(value, value)
    }
}

impl From<(Option<i64>, Option<i64>)> for Range {
    fn from((min, max): (Option<i64>, Option<i64>)) -> Range {
        Range { min, max }
    }
}

impl From<RangeInclusive<i64>> for Range {
    fn from(range: RangeInclusive<i64>) -> Range {
        Range::new(*range.start(), *range.end())
    }
}

impl From<RangeFrom<i64>> for Range {
    fn from(range: RangeFrom<i64>) -> Range {
        Range::new(range.start, None)
    }
}

impl From<RangeToInclusive<i64>> for Range {
    fn from(range: RangeToInclusive<i64>) -> Range {
        Range::new(None, range.end)
    }
}

impl From<RangeFull> for Range {
    fn from(_: RangeFull) -> Range {
        Range::unbounded()
    }
}
