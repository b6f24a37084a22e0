//! Precedence merging of configuration trees.
//!
//! [`merge`] combines an overlay with a base:
//!
//! - keys present on one side only pass through unchanged;
//! - colliding objects merge recursively;
//! - colliding arrays concatenate, overlay elements first;
//! - colliding scalars resolve to the overlay value;
//! - a `null` on one side of a collision yields the other side;
//! - colliding values of different kinds are a [`MergeError::TypeMismatch`].
//!
//! Arrays are additive on purpose: defaults establish a baseline list and
//! overlays extend it. To replace a list instead, remove the key from the base
//! before merging.

use thiserror::Error;

use crate::tree::{Kind, Node, Object, Tree};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MergeError {
    #[error("type mismatch at '{path}': overlay is {overlay}, base is {base}")]
    TypeMismatch {
        path: String,
        overlay: Kind,
        base: Kind,
    },
}

/// One input to a merge.
///
/// `Missing` is the navigation sentinel (for example "no user file present");
/// `Absent` means no value was supplied at all. Neither contributes anything
/// to the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layer<'a> {
    Tree(&'a Tree),
    Missing,
    Absent,
}

impl<'a> From<&'a Tree> for Layer<'a> {
    fn from(tree: &'a Tree) -> Self {
        Layer::Tree(tree)
    }
}

impl<'a> From<Node<'a>> for Layer<'a> {
    fn from(node: Node<'a>) -> Self {
        match node {
            Node::Present(tree) => Layer::Tree(tree),
            Node::Missing => Layer::Missing,
        }
    }
}

impl<'a> From<Option<&'a Tree>> for Layer<'a> {
    fn from(tree: Option<&'a Tree>) -> Self {
        tree.map_or(Layer::Absent, Layer::Tree)
    }
}

impl Layer<'_> {
    fn into_tree(self) -> Tree {
        match self {
            Layer::Tree(tree) => tree.clone(),
            Layer::Missing | Layer::Absent => Tree::new(),
        }
    }
}

/// Merges `overlay` on top of `base`. The overlay wins collisions.
///
/// Inputs are never modified; the result shares nothing with them.
///
/// ```
/// use layerconf::{merge, parse_str};
///
/// let user = parse_str(r#"{"port": 9000, "plugins": ["extra"]}"#)?;
/// let defaults = parse_str(r#"{"port": 8080, "host": "localhost", "plugins": ["core"]}"#)?;
///
/// let effective = merge(&user, &defaults)?;
/// assert_eq!(effective.get("port").as_i32(), 9000);
/// assert_eq!(effective.get("host").as_str(), "localhost");
/// assert_eq!(effective.get("plugins").as_string_vec(), vec!["extra", "core"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn merge<'a, 'b>(
    overlay: impl Into<Layer<'a>>,
    base: impl Into<Layer<'b>>,
) -> Result<Tree, MergeError> {
    match (overlay.into(), base.into()) {
        (Layer::Tree(overlay), Layer::Tree(base)) => merge_values(overlay, base, ""),
        (Layer::Tree(overlay), _) => Ok(overlay.clone()),
        (_, Layer::Tree(base)) => Ok(base.clone()),
        _ => Ok(Tree::new()),
    }
}

/// Folds sources from right to left; the first source has the highest precedence.
///
/// `merge_all([a, b, c])` equals `merge(a, merge(b, c))`. No sources yield an
/// empty object.
pub fn merge_all<'a, I, L>(sources: I) -> Result<Tree, MergeError>
where
    I: IntoIterator<Item = L>,
    L: Into<Layer<'a>>,
{
    let layers: Vec<Layer<'a>> = sources.into_iter().map(Into::into).collect();
    let mut layers = layers.into_iter().rev();

    let Some(lowest) = layers.next() else {
        return Ok(Tree::new());
    };

    layers.try_fold(lowest.into_tree(), |acc, layer| merge(layer, &acc))
}

fn merge_values(overlay: &Tree, base: &Tree, path: &str) -> Result<Tree, MergeError> {
    if base.is_null() {
        return Ok(overlay.clone());
    }
    if overlay.is_null() {
        return Ok(base.clone());
    }

    match (overlay, base) {
        (Tree::Object(overlay), Tree::Object(base)) => {
            merge_objects(overlay, base, path).map(Tree::Object)
        }
        (Tree::Array(overlay), Tree::Array(base)) => {
            let mut items = Vec::with_capacity(overlay.len() + base.len());
            items.extend(overlay.iter().cloned());
            items.extend(base.iter().cloned());
            Ok(Tree::Array(items))
        }
        _ if overlay.kind() == base.kind() => Ok(overlay.clone()),
        _ => Err(MergeError::TypeMismatch {
            path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
            overlay: overlay.kind(),
            base: base.kind(),
        }),
    }
}

fn merge_objects(overlay: &Object, base: &Object, path: &str) -> Result<Object, MergeError> {
    let mut result = Object::with_capacity(overlay.len() + base.len());

    for (key, value) in overlay.iter() {
        let merged = match base.get(key) {
            Some(base_value) => merge_values(value, base_value, &child_path(path, key))?,
            None => value.clone(),
        };
        result.insert(key, merged);
    }

    for (key, value) in base.iter() {
        if !overlay.contains_key(key) {
            result.insert(key, value.clone());
        }
    }

    Ok(result)
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
