//! Runtime values
//!
//! `Variable` is the JSON-like value every expression consumes and produces.
//! Values are shared through `Rcvar` so projections can hand out elements
//! without copying them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::{Ast, Comparator, JmespathError, Spanned};

/// Shared pointer to a `Variable`
#[cfg(not(feature = "sync"))]
pub type Rcvar = std::rc::Rc<Variable>;

/// Shared pointer to a `Variable`
#[cfg(feature = "sync")]
pub type Rcvar = std::sync::Arc<Variable>;

/// Largest float that still maps onto a distinct integer (2^53)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// JSON value extended with expression references
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variable {
    #[default]
    Null,
    String(String),
    Bool(bool),
    Number(f64),
    Array(Vec<Rcvar>),
    Object(BTreeMap<String, Rcvar>),
    Expref(Spanned<Ast>),
}

/// Type names as reported by the `type` function and in errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JmespathType {
    Null,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Expref,
}

impl fmt::Display for JmespathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Expref => "expref",
        };
        f.write_str(name)
    }
}

impl Variable {
    /// Parse a JSON document into a variable
    ///
    /// # Errors
    ///
    /// Returns the JSON parser's message when `json` is not valid JSON
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str::<serde_json::Value>(json)
            .map(Self::from)
            .map_err(|err| err.to_string())
    }

    #[must_use]
    pub const fn get_type(&self) -> JmespathType {
        match self {
            Self::Null => JmespathType::Null,
            Self::String(_) => JmespathType::String,
            Self::Bool(_) => JmespathType::Boolean,
            Self::Number(_) => JmespathType::Number,
            Self::Array(_) => JmespathType::Array,
            Self::Object(_) => JmespathType::Object,
            Self::Expref(_) => JmespathType::Expref,
        }
    }

    /// Falsy values are null, false, and empty strings, arrays and objects
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Object(o) => !o.is_empty(),
            Self::Number(_) | Self::Expref(_) => true,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    #[must_use]
    pub const fn is_expref(&self) -> bool {
        matches!(self, Self::Expref(_))
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Vec<Rcvar>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, Rcvar>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_expref(&self) -> Option<&Spanned<Ast>> {
        match self {
            Self::Expref(ast) => Some(ast),
            _ => None,
        }
    }

    /// Object member lookup; null for missing keys and non-objects
    #[must_use]
    pub fn get_field(&self, key: &str) -> Rcvar {
        self.as_object()
            .and_then(|object| object.get(key).cloned())
            .unwrap_or_else(|| Rcvar::new(Self::Null))
    }

    /// Array element lookup; negative indices count from the end
    #[must_use]
    pub fn get_index(&self, idx: i32) -> Rcvar {
        let found = self.as_array().and_then(|array| {
            let position = if idx < 0 {
                array.len().checked_sub(idx.unsigned_abs() as usize)
            } else {
                Some(idx.unsigned_abs() as usize)
            };
            position.and_then(|position| array.get(position).cloned())
        });
        found.unwrap_or_else(|| Rcvar::new(Self::Null))
    }

    /// Python-style slice of an array.
    ///
    /// Returns `None` when the value is not an array or `step` is zero.
    #[must_use]
    pub fn slice(&self, start: Option<i32>, stop: Option<i32>, step: i32) -> Option<Vec<Rcvar>> {
        let array = self.as_array()?;
        if step == 0 {
            return None;
        }
        let len = i64::try_from(array.len()).ok()?;
        let step = i64::from(step);
        let start = start.map_or(if step < 0 { len - 1 } else { 0 }, |s| {
            adjust_endpoint(len, i64::from(s), step)
        });
        let stop = stop.map_or(if step < 0 { -1 } else { len }, |s| {
            adjust_endpoint(len, i64::from(s), step)
        });

        let mut result = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            if let Some(value) = usize::try_from(i).ok().and_then(|i| array.get(i)) {
                result.push(value.clone());
            }
            i += step;
        }
        Some(result)
    }

    /// Compare two values.
    ///
    /// Equality is defined for every pair of values. Ordering comparators
    /// only apply to two numbers and yield `None` otherwise.
    #[must_use]
    pub fn compare(&self, comparator: Comparator, other: &Self) -> Option<bool> {
        match comparator {
            Comparator::Equal => Some(self == other),
            Comparator::NotEqual => Some(self != other),
            _ => match (self, other) {
                (Self::Number(a), Self::Number(b)) => Some(match comparator {
                    Comparator::LessThan => a < b,
                    Comparator::LessThanEqual => a <= b,
                    Comparator::GreaterThan => a > b,
                    _ => a >= b,
                }),
                _ => None,
            },
        }
    }
}

fn adjust_endpoint(len: i64, endpoint: i64, step: i64) -> i64 {
    if endpoint < 0 {
        let adjusted = endpoint + len;
        if adjusted >= 0 {
            adjusted
        } else if step < 0 {
            -1
        } else {
            0
        }
    } else if endpoint >= len {
        if step < 0 { len - 1 } else { len }
    } else {
        endpoint
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order used by `sort`, `max` and `min`: values of the same type
/// compare naturally, mixed types fall back to their type rank.
impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a.cmp(b),
            (Self::Object(a), Self::Object(b)) => a.cmp(b),
            _ => self.get_type().cmp(&other.get_type()),
        }
    }
}

impl From<serde_json::Value> for Variable {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(values) => Self::Array(
                values
                    .into_iter()
                    .map(|value| Rcvar::new(Self::from(value)))
                    .collect(),
            ),
            serde_json::Value::Object(members) => Self::Object(
                members
                    .into_iter()
                    .map(|(key, value)| (key, Rcvar::new(Self::from(value))))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Variable {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl Serialize for Variable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(&**value)?;
                }
                seq.end()
            }
            Self::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, &**value)?;
                }
                map.end()
            }
            Self::Expref(_) => serializer.serialize_str("<expression>"),
        }
    }
}

/// Compact JSON
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Conversion of search input into a shared variable
pub trait ToJmespath {
    /// # Errors
    ///
    /// Returns a conversion error when the value cannot be represented as JSON
    fn to_jmespath(self) -> Result<Rcvar, JmespathError>;
}

impl ToJmespath for Rcvar {
    fn to_jmespath(self) -> Result<Rcvar, JmespathError> {
        Ok(self)
    }
}

impl ToJmespath for Variable {
    fn to_jmespath(self) -> Result<Rcvar, JmespathError> {
        Ok(Rcvar::new(self))
    }
}

impl ToJmespath for serde_json::Value {
    fn to_jmespath(self) -> Result<Rcvar, JmespathError> {
        Ok(Rcvar::new(Variable::from(self)))
    }
}

impl<T: Serialize + ?Sized> ToJmespath for &T {
    fn to_jmespath(self) -> Result<Rcvar, JmespathError> {
        serde_json::to_value(self)
            .map(|value| Rcvar::new(Variable::from(value)))
            .map_err(|err| JmespathError::conversion(err.to_string()))
    }
}
