//! Configuration tree data model.
//!
//! A [`Tree`] holds one decoded configuration document. Objects keep their
//! keys in insertion order so a merged result serializes in a readable order,
//! but equality ignores key order.

mod node;

pub use node::Node;

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// The shape of a node. Two colliding values must share a kind to be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Object,
    Array,
    String,
    Integer,
    Float,
    Bool,
    Null,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::Null => "null",
        };
        f.write_str(name)
    }
}

/// An ordered mapping from string keys to trees. Keys are unique.
///
/// Backed by an [`IndexMap`]: lookups are constant time and iteration follows
/// insertion order, matching the order `serde_json` keeps with
/// `preserve_order`.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: IndexMap<String, Tree>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Tree> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `value` under `key`.
    ///
    /// An existing entry is replaced in place and its old value returned, so
    /// the key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Tree) -> Option<Tree> {
        self.entries.insert(key.into(), value)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Tree> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts `value` at a nested key path, creating intermediate objects.
    ///
    /// A non-object value sitting on the path is replaced by an object.
    pub fn insert_path(&mut self, path: &[String], value: Tree) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };

        if rest.is_empty() {
            self.insert(first.clone(), value);
            return;
        }

        let slot = self.entries.entry(first.clone()).or_default();
        if !matches!(slot, Tree::Object(_)) {
            *slot = Tree::new();
        }
        if let Tree::Object(nested) = slot {
            nested.insert_path(rest, value);
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(String, Tree)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Tree)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Object {
    type Item = (String, Tree);
    type IntoIter = indexmap::map::IntoIter<String, Tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One configuration document or a node inside one.
///
/// `Clone` is a deep copy: nodes own their children, so a cloned tree never
/// observes later changes to the original.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Object(Object),
    Array(Vec<Tree>),
    Scalar(Scalar),
}

impl Default for Tree {
    fn default() -> Self {
        Tree::Object(Object::new())
    }
}

impl Tree {
    /// An empty object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn null() -> Self {
        Tree::Scalar(Scalar::Null)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Tree::Object(_) => Kind::Object,
            Tree::Array(_) => Kind::Array,
            Tree::Scalar(Scalar::String(_)) => Kind::String,
            Tree::Scalar(Scalar::Integer(_)) => Kind::Integer,
            Tree::Scalar(Scalar::Float(_)) => Kind::Float,
            Tree::Scalar(Scalar::Bool(_)) => Kind::Bool,
            Tree::Scalar(Scalar::Null) => Kind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Scalar(Scalar::Null))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Tree::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Tree::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Tree]> {
        match self {
            Tree::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Tree::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Starts a null-safe navigation at this node.
    pub fn node(&self) -> Node<'_> {
        Node::Present(self)
    }

    /// Looks up `key`, yielding [`Node::Missing`] if absent or if this is not an object.
    pub fn get(&self, key: &str) -> Node<'_> {
        self.node().get(key)
    }

    /// Looks up an array element, yielding [`Node::Missing`] when out of range.
    pub fn at(&self, index: usize) -> Node<'_> {
        self.node().at(index)
    }

    /// Follows a sequence of object keys.
    ///
    /// ```
    /// use layerconf::parse_str;
    ///
    /// let tree = parse_str(r#"{"server": {"port": 8080}}"#)?;
    /// assert_eq!(tree.lookup(["server", "port"]).as_i32(), 8080);
    /// assert_eq!(tree.lookup(["server", "tls", "cert"]).as_str(), "");
    /// # Ok::<(), layerconf::ConfigError>(())
    /// ```
    pub fn lookup<'k, I>(&self, path: I) -> Node<'_>
    where
        I: IntoIterator<Item = &'k str>,
    {
        self.node().lookup(path)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.as_object().is_some_and(|o| o.contains_key(key))
    }

    /// The kind shared by every element of a non-empty array.
    ///
    /// Returns `None` for mixed arrays, empty arrays and non-arrays.
    pub fn element_kind(&self) -> Option<Kind> {
        let items = self.as_array()?;
        let first = items.first()?.kind();
        items.iter().all(|i| i.kind() == first).then_some(first)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Tree::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Tree::Array(items) => Value::Array(items.iter().map(Tree::to_json).collect()),
            Tree::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Tree::Scalar(Scalar::Integer(i)) => Value::Number((*i).into()),
            Tree::Scalar(Scalar::Float(f)) => {
                Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
            Tree::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Tree::Scalar(Scalar::Null) => Value::Null,
        }
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::null(),
            Value::Bool(b) => Tree::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Tree::Scalar(Scalar::Integer(i)),
                None => Tree::Scalar(Scalar::Float(n.as_f64().unwrap_or_default())),
            },
            Value::String(s) => Tree::Scalar(Scalar::String(s)),
            Value::Array(items) => Tree::Array(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => Tree::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Tree::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<toml::Value> for Tree {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Tree::Scalar(Scalar::String(s)),
            toml::Value::Integer(i) => Tree::Scalar(Scalar::Integer(i)),
            toml::Value::Float(f) => Tree::Scalar(Scalar::Float(f)),
            toml::Value::Boolean(b) => Tree::Scalar(Scalar::Bool(b)),
            toml::Value::Datetime(dt) => Tree::Scalar(Scalar::String(dt.to_string())),
            toml::Value::Array(items) => {
                Tree::Array(items.into_iter().map(Tree::from).collect())
            }
            toml::Value::Table(table) => Tree::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Tree::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Object> for Tree {
    fn from(object: Object) -> Self {
        Tree::Object(object)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Array(items)
    }
}

impl From<Scalar> for Tree {
    fn from(scalar: Scalar) -> Self {
        Tree::Scalar(scalar)
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::Scalar(Scalar::String(s))
    }
}

impl From<i64> for Tree {
    fn from(i: i64) -> Self {
        Tree::Scalar(Scalar::Integer(i))
    }
}

impl From<i32> for Tree {
    fn from(i: i32) -> Self {
        Tree::Scalar(Scalar::Integer(i.into()))
    }
}

impl From<f64> for Tree {
    fn from(f: f64) -> Self {
        Tree::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Scalar(Scalar::Bool(b))
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tree::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Tree::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Tree::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Tree::Scalar(Scalar::Integer(i)) => serializer.serialize_i64(*i),
            Tree::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Tree::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Tree::Scalar(Scalar::Null) => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Tree::from)
    }
}

/// Compact JSON.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_normalizes_variants() {
        let tree = Tree::from(json!({
            "name": "app",
            "port": 8080,
            "ratio": 0.5,
            "debug": true,
            "extra": null,
            "tags": ["a", "b"],
            "db": {"host": "localhost"}
        }));

        assert_eq!(tree.get("name").tree().map(Tree::kind), Some(Kind::String));
        assert_eq!(tree.get("port").tree().map(Tree::kind), Some(Kind::Integer));
        assert_eq!(tree.get("ratio").tree().map(Tree::kind), Some(Kind::Float));
        assert_eq!(tree.get("debug").tree().map(Tree::kind), Some(Kind::Bool));
        assert_eq!(tree.get("extra").tree().map(Tree::kind), Some(Kind::Null));
        assert_eq!(tree.get("tags").tree().map(Tree::kind), Some(Kind::Array));
        assert_eq!(tree.get("db").tree().map(Tree::kind), Some(Kind::Object));
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let tree = Tree::from(json!({"big": u64::MAX}));
        assert_eq!(tree.get("big").tree().map(Tree::kind), Some(Kind::Float));
    }

    #[test]
    fn test_insert_replaces_existing_key_in_place() {
        let mut object = Object::new();
        object.insert("a", Tree::from(1));
        object.insert("b", Tree::from(2));
        let old = object.insert("a", Tree::from(3));

        assert_eq!(old, Some(Tree::from(1)));
        assert_eq!(object.len(), 2);
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(object.get("a"), Some(&Tree::from(3)));
    }

    #[test]
    fn test_object_equality_ignores_order() {
        let a: Object = [("x".to_string(), Tree::from(1)), ("y".to_string(), Tree::from(2))]
            .into_iter()
            .collect();
        let b: Object = [("y".to_string(), Tree::from(2)), ("x".to_string(), Tree::from(1))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_insert_path_creates_and_replaces_intermediates() {
        let mut object = Object::new();
        object.insert("db", Tree::from("not an object"));
        object.insert_path(&["db".to_string(), "port".to_string()], Tree::from(5432));
        object.insert_path(&["db".to_string(), "host".to_string()], Tree::from("h"));

        let tree = Tree::Object(object);
        assert_eq!(tree.lookup(["db", "port"]).as_i64(), 5432);
        assert_eq!(tree.lookup(["db", "host"]).as_str(), "h");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Tree::from(json!({"a": {"b": [1, 2]}}));
        let mut copy = original.clone();
        if let Some(Tree::Object(a)) = copy.as_object_mut().and_then(|o| o.get_mut("a")) {
            a.insert("b", Tree::from("changed"));
        }

        assert_eq!(original.lookup(["a", "b"]).as_i64_vec(), vec![1, 2]);
        assert_eq!(copy.lookup(["a", "b"]).as_str(), "changed");
    }

    #[test]
    fn test_serialize_keeps_insertion_order() {
        let tree = Tree::from(json!({"zeta": 1, "alpha": [true, null], "mid": {"k": "v"}}));
        assert_eq!(
            tree.to_string(),
            r#"{"zeta":1,"alpha":[true,null],"mid":{"k":"v"}}"#
        );
    }

    #[test]
    fn test_element_kind() {
        assert_eq!(Tree::from(json!([1, 2, 3])).element_kind(), Some(Kind::Integer));
        assert_eq!(Tree::from(json!([1, "two"])).element_kind(), None);
        assert_eq!(Tree::from(json!([])).element_kind(), None);
        assert_eq!(Tree::from(json!({"a": 1})).element_kind(), None);
    }

    #[test]
    fn test_from_toml_table() {
        let table: toml::Table = toml::from_str(
            r#"
            name = "svc"
            started = 1979-05-27T07:32:00Z
            [limits]
            max = 10
            "#,
        )
        .unwrap();
        let tree = Tree::from(toml::Value::Table(table));

        assert_eq!(tree.get("name").as_str(), "svc");
        assert_eq!(tree.get("started").as_str(), "1979-05-27T07:32:00Z");
        assert_eq!(tree.lookup(["limits", "max"]).as_i32(), 10);
    }
}
