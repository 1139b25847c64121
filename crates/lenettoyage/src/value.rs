//! Result value model
//!
//! Values produced by the external graph engine and database are untyped at
//! this boundary. [`ResultValue`] covers the four shapes they come in:
//! scalars, ordered sequences, string-keyed mappings, and attributed objects
//! (a type name plus a named-attribute view).

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Number, Value};

/// Insertion-ordered, string-keyed fields of a mapping or attributed object
///
/// Equality follows map semantics: two field sets are equal when they hold
/// the same keys with equal values, regardless of order.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(String, ResultValue)>,
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl Fields {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty field set with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert a field
    ///
    /// An existing key keeps its position and gets the new value; the
    /// previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: ResultValue) -> Option<ResultValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a field by exact key
    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether a field with this exact key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, ResultValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, ResultValue)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut fields = Fields::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, ResultValue);
    type IntoIter = std::vec::IntoIter<(String, ResultValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Structured object exposing a type name and a named-attribute view
///
/// Graph database nodes and relationships arrive in this shape. Sanitizing
/// one yields a plain mapping of its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedObject {
    type_name: String,
    attributes: Fields,
}

impl AttributedObject {
    /// Create an attributed object
    pub fn new(type_name: impl Into<String>, attributes: Fields) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
        }
    }

    /// Type name reported by the producer (e.g. `Node`, `EpisodicNode`)
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Named-attribute view
    pub fn attributes(&self) -> &Fields {
        &self.attributes
    }
}

/// A value returned by the external graph engine or database
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Null scalar (a legitimate value, distinct from "absent")
    Null,

    /// Boolean scalar
    Bool(bool),

    /// Signed integer scalar
    Int(i64),

    /// Unsigned integer scalar too large for `i64`
    UInt(u64),

    /// Floating-point scalar
    Float(f64),

    /// Text scalar
    Text(String),

    /// Ordered sequence
    Sequence(Vec<ResultValue>),

    /// String-keyed mapping
    Mapping(Fields),

    /// Structured object with a named-attribute view
    Object(AttributedObject),
}

impl ResultValue {
    /// Build an attributed object value
    pub fn object(type_name: impl Into<String>, attributes: Fields) -> Self {
        ResultValue::Object(AttributedObject::new(type_name, attributes))
    }

    /// Integer or floating-point scalar
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ResultValue::Int(_) | ResultValue::UInt(_) | ResultValue::Float(_)
        )
    }

    /// Null, boolean, numeric, or text
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            ResultValue::Sequence(_) | ResultValue::Mapping(_) | ResultValue::Object(_)
        )
    }

    /// Text content, if this is a text scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResultValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Elements, if this is a sequence
    pub fn as_sequence(&self) -> Option<&[ResultValue]> {
        match self {
            ResultValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Named fields of a mapping or attributed object
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            ResultValue::Mapping(fields) => Some(fields),
            ResultValue::Object(object) => Some(object.attributes()),
            _ => None,
        }
    }

    /// Field lookup on a mapping or attributed object
    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        self.fields().and_then(|fields| fields.get(key))
    }

    /// Type name of an attributed object
    pub fn type_name(&self) -> Option<&str> {
        match self {
            ResultValue::Object(object) => Some(object.type_name()),
            _ => None,
        }
    }

    /// Render as a string the way identifiers are echoed back to clients
    ///
    /// Text is returned verbatim; other scalars use their JSON form.
    pub fn to_display_string(&self) -> String {
        match self {
            ResultValue::Text(text) => text.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Convert to JSON; attributed objects become JSON objects
    pub fn to_json(&self) -> Value {
        match self {
            ResultValue::Null => Value::Null,
            ResultValue::Bool(b) => Value::Bool(*b),
            ResultValue::Int(i) => Value::Number(Number::from(*i)),
            ResultValue::UInt(u) => Value::Number(Number::from(*u)),
            ResultValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ResultValue::Text(text) => Value::String(text.clone()),
            ResultValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ResultValue::Mapping(fields) => fields_to_json(fields),
            ResultValue::Object(object) => fields_to_json(object.attributes()),
        }
    }
}

fn fields_to_json(fields: &Fields) -> Value {
    let mut map = Map::new();
    for (key, value) in fields.iter() {
        map.insert(key.to_string(), value.to_json());
    }
    Value::Object(map)
}

impl From<Value> for ResultValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResultValue::Null,
            Value::Bool(b) => ResultValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ResultValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ResultValue::UInt(u)
                } else {
                    ResultValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ResultValue::Text(s),
            Value::Array(items) => {
                ResultValue::Sequence(items.into_iter().map(ResultValue::from).collect())
            }
            Value::Object(map) => ResultValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ResultValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ResultValue> for Value {
    fn from(value: ResultValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for ResultValue {
    fn from(text: &str) -> Self {
        ResultValue::Text(text.to_string())
    }
}

impl From<String> for ResultValue {
    fn from(text: String) -> Self {
        ResultValue::Text(text)
    }
}

impl From<bool> for ResultValue {
    fn from(b: bool) -> Self {
        ResultValue::Bool(b)
    }
}

impl From<i64> for ResultValue {
    fn from(i: i64) -> Self {
        ResultValue::Int(i)
    }
}

impl From<f64> for ResultValue {
    fn from(f: f64) -> Self {
        ResultValue::Float(f)
    }
}

impl From<Vec<ResultValue>> for ResultValue {
    fn from(items: Vec<ResultValue>) -> Self {
        ResultValue::Sequence(items)
    }
}

impl From<Fields> for ResultValue {
    fn from(fields: Fields) -> Self {
        ResultValue::Mapping(fields)
    }
}

impl Serialize for ResultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultValue::Null => serializer.serialize_unit(),
            ResultValue::Bool(b) => serializer.serialize_bool(*b),
            ResultValue::Int(i) => serializer.serialize_i64(*i),
            ResultValue::UInt(u) => serializer.serialize_u64(*u),
            ResultValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            ResultValue::Float(_) => serializer.serialize_unit(),
            ResultValue::Text(text) => serializer.serialize_str(text),
            ResultValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ResultValue::Mapping(fields) => serialize_fields(fields, serializer),
            ResultValue::Object(object) => serialize_fields(object.attributes(), serializer),
        }
    }
}

fn serialize_fields<S: Serializer>(fields: &Fields, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (key, value) in fields.iter() {
        map.serialize_entry(key, value)?;
    }
    map.end()
}
