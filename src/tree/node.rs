//! Null-safe navigation over a [`Tree`].

use super::{Kind, Scalar, Tree};

/// A position reached by navigating a tree.
///
/// Every lookup that fails (absent key, index out of range, stepping into a
/// scalar) yields [`Node::Missing`] instead of an error. `Missing` can be
/// navigated further, always producing `Missing`, and every conversion on it
/// yields the target type's zero value. This lets deeply nested optional
/// settings be read in one expression:
///
/// ```
/// use layerconf::parse_str;
///
/// let tree = parse_str(r#"{"cache": {"ttl": 30}}"#)?;
/// assert_eq!(tree.get("cache").get("ttl").as_i64(), 30);
/// assert_eq!(tree.get("nope").get("deeper").get("still").as_i64(), 0);
/// # Ok::<(), layerconf::ConfigError>(())
/// ```
///
/// A zero value read from `Missing` is indistinguishable from one actually
/// stored in the tree. Use [`exists`](Self::exists) or
/// [`has_key`](Self::has_key) when the difference matters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Node<'a> {
    Present(&'a Tree),
    #[default]
    Missing,
}

impl<'a> From<&'a Tree> for Node<'a> {
    fn from(tree: &'a Tree) -> Self {
        Node::Present(tree)
    }
}

impl<'a> Node<'a> {
    pub fn get(self, key: &str) -> Node<'a> {
        match self {
            Node::Present(Tree::Object(object)) => {
                object.get(key).map_or(Node::Missing, Node::Present)
            }
            _ => Node::Missing,
        }
    }

    pub fn at(self, index: usize) -> Node<'a> {
        match self {
            Node::Present(Tree::Array(items)) => {
                items.get(index).map_or(Node::Missing, Node::Present)
            }
            _ => Node::Missing,
        }
    }

    pub fn lookup<'k, I>(self, path: I) -> Node<'a>
    where
        I: IntoIterator<Item = &'k str>,
    {
        path.into_iter().fold(self, |node, key| node.get(key))
    }

    /// True for any real node, including an explicit `null`.
    pub fn exists(self) -> bool {
        matches!(self, Node::Present(_))
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Node::Missing)
    }

    pub fn has_key(self, key: &str) -> bool {
        self.get(key).exists()
    }

    pub fn tree(self) -> Option<&'a Tree> {
        match self {
            Node::Present(tree) => Some(tree),
            Node::Missing => None,
        }
    }

    pub fn kind(self) -> Option<Kind> {
        self.tree().map(Tree::kind)
    }

    /// Deep copy of the node; `Missing` becomes an empty object.
    pub fn to_tree(self) -> Tree {
        self.tree().cloned().unwrap_or_default()
    }

    fn scalar(self) -> Option<&'a Scalar> {
        self.tree().and_then(Tree::as_scalar)
    }

    pub fn as_opt_str(self) -> Option<&'a str> {
        match self.scalar() {
            Some(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_opt_i64(self) -> Option<i64> {
        match self.scalar() {
            Some(Scalar::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// `None` also when the stored integer does not fit in 32 bits.
    pub fn as_opt_i32(self) -> Option<i32> {
        self.as_opt_i64().and_then(|i| i32::try_from(i).ok())
    }

    pub fn as_opt_f64(self) -> Option<f64> {
        match self.scalar() {
            Some(Scalar::Float(f)) => Some(*f),
            Some(Scalar::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_opt_bool(self) -> Option<bool> {
        match self.scalar() {
            Some(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'a str {
        self.as_opt_str().unwrap_or_default()
    }

    pub fn as_string(self) -> String {
        self.as_str().to_string()
    }

    pub fn as_i64(self) -> i64 {
        self.as_opt_i64().unwrap_or_default()
    }

    pub fn as_i32(self) -> i32 {
        self.as_opt_i32().unwrap_or_default()
    }

    pub fn as_f64(self) -> f64 {
        self.as_opt_f64().unwrap_or_default()
    }

    /// Truthiness of the node.
    ///
    /// A boolean yields its own value, `null` and `Missing` yield `false`, and
    /// any other real node (even an empty object) yields `true`.
    pub fn as_bool(self) -> bool {
        match self {
            Node::Present(Tree::Scalar(Scalar::Bool(b))) => *b,
            Node::Present(Tree::Scalar(Scalar::Null)) | Node::Missing => false,
            Node::Present(_) => true,
        }
    }

    pub fn as_string_vec(self) -> Vec<String> {
        self.collect_items(|n| n.as_opt_str().map(str::to_string))
    }

    pub fn as_i64_vec(self) -> Vec<i64> {
        self.collect_items(Node::as_opt_i64)
    }

    pub fn as_i32_vec(self) -> Vec<i32> {
        self.collect_items(Node::as_opt_i32)
    }

    pub fn as_f64_vec(self) -> Vec<f64> {
        self.collect_items(Node::as_opt_f64)
    }

    pub fn as_bool_vec(self) -> Vec<bool> {
        self.collect_items(Node::as_opt_bool)
    }

    // All-or-nothing: one element of the wrong kind yields an empty vec.
    fn collect_items<T>(self, convert: impl Fn(Node<'a>) -> Option<T>) -> Vec<T> {
        match self {
            Node::Present(Tree::Array(items)) => items
                .iter()
                .map(|item| convert(Node::Present(item)))
                .collect::<Option<Vec<T>>>()
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}
