use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::oid::Oid;

/// A single field value of a stored record.
///
/// The set is closed: it covers the JSON scalars plus the rich types a
/// JSON document cannot carry natively (dates, times, datetimes, byte blobs
/// and nested record identifiers).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
    Oid(Oid),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::Bytes(_) => "bytes",
            Self::Oid(_) => "oid",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Self::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Str,
    &str => Str,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    Oid => Oid,
    Vec<Value> => List,
    BTreeMap<String, Value> => Map,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// The field state of one record: field name to value.
///
/// Fields are kept in name order so that encoded payloads are deterministic.
/// There is no schema: a field absent when a record is saved is simply
/// absent when it is loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, Value>);

macro_rules! typed_getter {
    ($(#[$doc:meta])* $name:ident, $accessor:ident, $ret:ty, $expected:literal) => {
        $(#[$doc])*
        pub fn $name(&self, field: &str) -> Result<$ret, TypeError> {
            let value = self.require(field)?;
            value.$accessor().ok_or_else(|| TypeError::FieldType {
                field: field.to_string(),
                expected: $expected,
                actual: value.type_name(),
            })
        }
    };
}

impl Fields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The field's value, or [`TypeError::MissingField`].
    pub fn require(&self, field: &str) -> Result<&Value, TypeError> {
        self.0
            .get(field)
            .ok_or_else(|| TypeError::MissingField(field.to_string()))
    }

    typed_getter!(get_i64, as_i64, i64, "int");
    typed_getter!(get_f64, as_f64, f64, "float");
    typed_getter!(get_bool, as_bool, bool, "bool");
    typed_getter!(get_date, as_date, NaiveDate, "date");
    typed_getter!(get_time, as_time, NaiveTime, "time");
    typed_getter!(get_datetime, as_datetime, NaiveDateTime, "datetime");

    /// String field, borrowed.
    pub fn get_str(&self, field: &str) -> Result<&str, TypeError> {
        let value = self.require(field)?;
        value.as_str().ok_or_else(|| TypeError::FieldType {
            field: field.to_string(),
            expected: "string",
            actual: value.type_name(),
        })
    }

    /// Byte blob field, borrowed.
    pub fn get_bytes(&self, field: &str) -> Result<&[u8], TypeError> {
        let value = self.require(field)?;
        value.as_bytes().ok_or_else(|| TypeError::FieldType {
            field: field.to_string(),
            expected: "bytes",
            actual: value.type_name(),
        })
    }

    /// Nested identifier field, borrowed.
    pub fn get_oid(&self, field: &str) -> Result<&Oid, TypeError> {
        let value = self.require(field)?;
        value.as_oid().ok_or_else(|| TypeError::FieldType {
            field: field.to_string(),
            expected: "oid",
            actual: value.type_name(),
        })
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    /// Consume into the underlying map.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Fields {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
