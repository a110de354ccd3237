use crate::document::compare::compare_documents;
use crate::document::Value;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// An ordered sequence of `(key, Value)` pairs.
///
/// Key order is preserved through all mutations: replacing an existing
/// key keeps its position, removing a key shifts later pairs down, and
/// new keys append at the end (or at the front via
/// [Document::insert_front]). Order is observable and significant for
/// equality, comparison, and serialization.
///
/// Documents nest through [Value::Document] and [Value::Array]; the
/// dotted-path algebra over nested documents lives in
/// [crate::document::path].
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::doc;
///
/// let doc = doc! { "name": "Alice", "age": 30 };
/// assert_eq!(doc.len(), 2);
/// assert_eq!(doc.keys().collect::<Vec<_>>(), ["name", "age"]);
/// ```
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Document {
    pairs: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            pairs: IndexMap::new(),
        }
    }

    /// Checks if the document has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of top-level pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs.get(key)
    }

    /// Returns the mutable value stored under `key`, if any.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.pairs.get_mut(key)
    }

    /// Checks whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.contains_key(key)
    }

    /// Stores `value` under `key`.
    ///
    /// An existing key keeps its position; a new key appends at the end.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.pairs.insert(key.into(), value.into())
    }

    /// Stores `value` under `key` at the front of the document.
    ///
    /// An existing key is moved to the front.
    pub fn insert_front<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        let key = key.into();
        self.pairs.shift_remove(key.as_str());
        self.pairs.shift_insert(0, key, value.into());
    }

    /// Removes `key`, shifting later pairs down. Returns the removed value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.pairs.shift_remove(key)
    }

    /// Iterates over `(key, value)` pairs in stored order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.pairs.iter()
    }

    /// Iterates over keys in stored order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(|k| k.as_str())
    }

    /// Iterates over values in stored order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.pairs.values()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        compare_documents(self, other) == Ordering::Equal
    }
}

impl Eq for Document {}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_documents(self, other)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Document {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// A macro to create a [Document] from literal pairs.
///
/// Pair order is preserved. Values accept anything convertible with
/// [`Into<Value>`], nested `doc!` invocations, and vectors of values.
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::doc;
///
/// let doc = doc! {
///     "name": "Alice",
///     "address": doc! { "city": "Berlin" },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };
    ($($key:tt : $value:expr),* $(,)?) => {{
        let mut doc = $crate::document::Document::new();
        $(
            doc.insert($key, $crate::document::Value::from($value));
        )*
        doc
    }};
}

#[cfg(test)]
mod tests {
    use crate::val;

    #[test]
    fn preserves_insertion_order() {
        let doc = doc! { "b": 1, "a": 2, "c": 3 };
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn replacement_keeps_position() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        doc.insert("b", val!(20));
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(doc.get("b"), Some(&val!(20)));
    }

    #[test]
    fn removal_shifts_later_pairs() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        assert_eq!(doc.remove("b"), Some(val!(2)));
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(doc.remove("b"), None);
    }

    #[test]
    fn insert_front_prepends() {
        let mut doc = doc! { "a": 1 };
        doc.insert_front("_id", val!(9));
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, ["_id", "a"]);
    }

    #[test]
    fn equality_respects_order() {
        let a = doc! { "x": 1, "y": 2 };
        let b = doc! { "x": 1, "y": 2 };
        let c = doc! { "y": 2, "x": 1 };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn equality_is_cross_numeric() {
        let a = doc! { "x": 1 };
        let b = doc! { "x": 1i64 };
        assert_eq!(a, b);
    }

    #[test]
    fn nested_macro_builds_embedded_documents() {
        let doc = doc! {
            "user": doc! { "name": "Alice" },
            "tags": vec![val!("a"), val!("b")],
        };
        assert!(doc.get("user").unwrap().is_document());
        assert_eq!(doc.get("tags").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn display_renders_pairs_in_order() {
        let doc = doc! { "a": 1, "b": "x" };
        assert_eq!(format!("{}", doc), "{\"a\": 1, \"b\": \"x\"}");
    }

    #[test]
    fn empty_document() {
        let doc = doc! {};
        assert!(doc.is_empty());
        assert_eq!(doc.len(), 0);
        assert_eq!(doc.get("nope"), None);
    }
}
