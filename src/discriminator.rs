use std::fmt;

use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::{Error, Result};

/// Extracts the value to index from a document.
///
/// A discriminator is either the name of a top-level document field or an
/// arbitrary callable run against the whole document. Returning `None` is
/// the sentinel meaning the document carries no value for this index.
pub enum Discriminator {
    Field(String),
    Function(Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>),
}

impl Discriminator {
    pub fn field<S: Into<String>>(name: S) -> Result<Discriminator> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidDiscriminator);
        }
        Ok(Discriminator::Field(name))
    }

    pub fn function<F>(function: F) -> Discriminator
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Discriminator::Function(Box::new(function))
    }

    /// A JSON `null` field counts as absent, like a missing field.
    pub fn discriminate(&self, document: &Value) -> Option<Value> {
        match self {
            Discriminator::Field(name) => {
                document.get(name).filter(|value| !value.is_null()).cloned()
            }
            Discriminator::Function(function) => function(document),
        }
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Discriminator::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Discriminator::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Conversion from a discriminated JSON value into an index key type.
pub trait IndexableValue: Clone + Ord + fmt::Debug {
    const EXPECTED: &'static str;

    fn from_document_value(value: &Value) -> Result<Self>;
}

impl IndexableValue for String {
    const EXPECTED: &'static str = "string";

    fn from_document_value(value: &Value) -> Result<String> {
        match value {
            Value::String(string) => Ok(string.clone()),
            other => {
                Err(Error::InvalidFieldValue { expected: Self::EXPECTED, value: other.clone() })
            }
        }
    }
}

impl IndexableValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_document_value(value: &Value) -> Result<i64> {
        value.as_i64().ok_or_else(|| Error::NonIntegerValue(value.clone()))
    }
}

impl IndexableValue for OrderedFloat<f64> {
    const EXPECTED: &'static str = "number";

    fn from_document_value(value: &Value) -> Result<OrderedFloat<f64>> {
        match value.as_f64() {
            Some(float) => Ok(OrderedFloat(float)),
            None => Err(Error::InvalidFieldValue { expected: Self::EXPECTED, value: value.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn field_discriminator_reads_top_level_fields() {
        let discriminator = Discriminator::field("price").unwrap();
        assert_eq!(discriminator.discriminate(&json!({ "price": 12 })), Some(json!(12)));
        assert_eq!(discriminator.discriminate(&json!({ "price": null })), None);
        assert_eq!(discriminator.discriminate(&json!({ "label": "x" })), None);
    }

    #[test]
    fn function_discriminator_receives_the_document() {
        let discriminator = Discriminator::function(|document| Some(document.clone()));
        assert_eq!(discriminator.discriminate(&json!(9000)), Some(json!(9000)));
    }

    #[test]
    fn empty_field_name_is_rejected() {
        assert!(matches!(Discriminator::field(""), Err(Error::InvalidDiscriminator)));
    }

    #[test]
    fn integer_conversion_rejects_other_shapes() {
        assert_eq!(i64::from_document_value(&json!(42)).unwrap(), 42);
        let error = i64::from_document_value(&json!("x")).unwrap_err();
        assert_eq!(error.to_string(), "cannot index non-integer value `\"x\"`");
        assert!(i64::from_document_value(&json!(1.5)).is_err());
    }
}
