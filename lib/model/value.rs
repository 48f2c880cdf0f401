//! Concrete values, the raw inputs and constants of a graph.

use crate::Error;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A real number with a total order, so it can live inside sets and memo keys.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Real(f64);

impl Real {
    pub fn new(value: f64) -> Real {
        Real(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Real {
    fn eq(&self, other: &Real) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Real) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Real) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A concrete value.
///
/// Integers are unbounded. Tuples are the collections folded over by
/// `Reduce` nodes.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Value {
    Boolean(bool),
    Integer(BigInt),
    Real(Real),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn integer<I: Into<BigInt>>(value: I) -> Value {
        Value::Integer(value.into())
    }

    pub fn real(value: f64) -> Value {
        Value::Real(Real::new(value))
    }

    pub fn tuple(values: Vec<Value>) -> Value {
        Value::Tuple(values)
    }

    /// Get the value of this `Value` if it is a `Boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Get the elements of this `Value` if it is a `Tuple`.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match *self {
            Value::Tuple(ref values) => Some(values),
            _ => None,
        }
    }

    /// Numeric values as an `f64`, used when integers and reals mix.
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(ref i) => i.to_f64(),
            Value::Real(r) => Some(r.value()),
            Value::Boolean(_) | Value::Tuple(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Real(_) => "Real",
            Value::Tuple(_) => "Tuple",
        }
    }

    fn from_json(name: &str, json: &serde_json::Value) -> Result<Value, Error> {
        Ok(match *json {
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(ref number) => {
                if let Some(i) = number.as_i64() {
                    Value::integer(i)
                } else if let Some(u) = number.as_u64() {
                    Value::integer(u)
                } else {
                    match number.as_f64() {
                        Some(r) => Value::real(r),
                        None => {
                            return Err(Error::Unsupported(format!(
                                "number {} for argument {}",
                                number, name
                            )))
                        }
                    }
                }
            }
            serde_json::Value::Array(ref elements) => Value::Tuple(
                elements
                    .iter()
                    .map(|element| Value::from_json(name, element))
                    .collect::<Result<Vec<Value>, Error>>()?,
            ),
            ref other => {
                return Err(Error::Unsupported(format!(
                    "json value {} for argument {}",
                    other, name
                )))
            }
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Value {
        Value::real(r)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(ref i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Tuple(ref values) => {
                write!(f, "(")?;
                let mut is_first = true;
                for value in values {
                    if !is_first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                    is_first = false;
                }
                write!(f, ")")
            }
        }
    }
}

/// Concrete arguments for a function call, by parameter name.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Arguments {
        Arguments::default()
    }

    /// Parse arguments from a JSON object, such as `{"number": 2}`.
    ///
    /// Booleans become `Boolean`, integral numbers `Integer`, other numbers
    /// `Real`, and arrays `Tuple`.
    pub fn from_json(json: &str) -> Result<Arguments, Error> {
        let json: serde_json::Value = serde_json::from_str(json)?;
        let object = json
            .as_object()
            .ok_or("arguments must be given as a json object")?;
        let mut arguments = Arguments::new();
        for (name, value) in object {
            arguments.insert(name.clone(), Value::from_json(name, value)?);
        }
        Ok(arguments)
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> From<Vec<(S, Value)>> for Arguments {
    fn from(values: Vec<(S, Value)>) -> Arguments {
        Arguments {
            values: values
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_total_order() {
        assert_eq!(Real::new(2.0), Real::new(2.0));
        assert!(Real::new(-1.5) < Real::new(0.0));
        assert_eq!(Value::real(20.0).to_string(), "20.0");
    }

    #[test]
    fn arguments_from_json() {
        let arguments =
            Arguments::from_json(r#"{"number": 2, "scale": 2.5, "flag": true, "v": [1, 2]}"#)
                .unwrap();

        assert_eq!(arguments.get("number"), Some(&Value::integer(2)));
        assert_eq!(arguments.get("scale"), Some(&Value::real(2.5)));
        assert_eq!(arguments.get("flag"), Some(&Value::Boolean(true)));
        assert_eq!(
            arguments.get("v"),
            Some(&Value::tuple(vec![Value::integer(1), Value::integer(2)]))
        );
        assert_eq!(arguments.len(), 4);
    }

    #[test]
    fn arguments_from_json_rejects_non_objects() {
        assert!(Arguments::from_json("[1, 2]").is_err());
        assert!(Arguments::from_json(r#"{"name": "text"}"#).is_err());
        assert!(matches!(
            Arguments::from_json("{"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn tuple_display() {
        let value = Value::tuple(vec![Value::integer(6), Value::integer(2), Value::integer(2)]);
        assert_eq!(value.to_string(), "(6, 2, 2)");
    }
}
