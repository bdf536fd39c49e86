use std::{borrow::Cow, collections::BTreeMap, fmt};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
};

use crate::{BehaviorError, Token};

/// Structured data carried in actor state and in messages.
///
/// Maps are ordered so that the encoded form of a value is deterministic,
/// which is what allows two snapshots to be compared byte for byte.
///
/// ## Encoding
///
/// Values encode to a plain JSON tree. An actor reference encodes as its
/// token string. To keep that unambiguous a string which would itself parse
/// as a token, or which starts with `~`, is written with an extra leading
/// `~`, and decoding strips exactly one.
///
/// Non-finite floats have no JSON form. Encoding a value which holds one
/// fails, and the runtime refuses them wherever a value enters an effect.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Ref(Token),
}

impl Value {
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Value::Ref(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Insert `key` into a map, turning `Null` into an empty map first.
    ///
    /// # Panics
    ///
    /// If the value is neither a map nor null.
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        if self.is_null() {
            *self = Value::map();
        }
        match self {
            Value::Map(m) => {
                m.insert(key.to_string(), value.into());
            }
            other => panic!("cannot set field {key:?} on non-map value {other:?}"),
        }
    }

    pub fn field(&self, key: &str) -> Result<&Value, BehaviorError> {
        self.get(key)
            .ok_or_else(|| BehaviorError::MissingField(key.to_string()))
    }

    pub fn int_field(&self, key: &str) -> Result<i64, BehaviorError> {
        self.field(key)?
            .as_int()
            .ok_or_else(|| BehaviorError::wrong_type(key, "integer"))
    }

    pub fn str_field(&self, key: &str) -> Result<&str, BehaviorError> {
        self.field(key)?
            .as_str()
            .ok_or_else(|| BehaviorError::wrong_type(key, "string"))
    }

    pub fn ref_field(&self, key: &str) -> Result<&Token, BehaviorError> {
        self.field(key)?
            .as_token()
            .ok_or_else(|| BehaviorError::wrong_type(key, "actor reference"))
    }

    /// False if a non-finite float is reachable from this value. JSON has no
    /// representation for those, so such a value can't be logged or sent.
    pub fn is_encodable(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(items) => items.iter().all(Value::is_encodable),
            Value::Map(m) => m.values().all(Value::is_encodable),
            _ => true,
        }
    }

    /// Every actor reference reachable from this value, depth first.
    pub fn refs(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Value::Ref(t) => out.push(t),
            Value::List(items) => items.iter().for_each(|v| v.collect_refs(out)),
            Value::Map(m) => m.values().for_each(|v| v.collect_refs(out)),
            _ => {}
        }
    }
}

fn escape(s: &str) -> Cow<'_, str> {
    if s.starts_with('~') || Token::parse(s).is_ok() {
        Cow::Owned(format!("~{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

fn unescape(s: &str) -> Value {
    if let Some(rest) = s.strip_prefix('~') {
        return Value::String(rest.to_string());
    }
    match Token::parse(s) {
        Ok(token) => Value::Ref(token),
        Err(_) => Value::String(s.to_string()),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(f) => Err(serde::ser::Error::custom(format!(
                "non-finite float {f} has no encoded form"
            ))),
            Value::String(s) => serializer.serialize_str(&escape(s)),
            Value::Ref(t) => serializer.serialize_str(t.as_str()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E>(self, u: u64) -> Result<Value, E> {
        Ok(i64::try_from(u)
            .map(Value::Int)
            .unwrap_or(Value::Float(u as f64)))
    }

    fn visit_f64<E>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(unescape(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut m = BTreeMap::new();
        while let Some((k, v)) = access.next_entry::<String, Value>()? {
            m.insert(k, v);
        }
        Ok(Value::Map(m))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Token> for Value {
    fn from(t: Token) -> Self {
        Value::Ref(t)
    }
}

impl From<&Token> for Value {
    fn from(t: &Token) -> Self {
        Value::Ref(t.clone())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
