use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("limit must be 1 or greater")]
    InvalidLimit,
    #[error("discriminator must name a document field or wrap a callable")]
    InvalidDiscriminator,
    #[error("unknown operator `{0}`, expected `and` or `or`")]
    UnknownOperator(String),
    #[error("granularity level `{0}` must be 1 or greater")]
    InvalidLevel(i64),
    #[error("cannot index non-integer value `{0}`")]
    NonIntegerValue(Value),
    #[error("cannot index value `{value}` where a {expected} is expected")]
    InvalidFieldValue { expected: &'static str, value: Value },
    #[error("cannot index object value `{0}` as a path")]
    ObjectPathValue(Value),
    #[error("invalid path query `{0}`")]
    InvalidPathQuery(Value),
    #[error("no merge module for collections {left} and {right}")]
    NoMergeModule { left: String, right: String },
}
