//! Raw request query parameters, grouped by key.

use std::collections::BTreeMap;

/// Value of one query parameter: a single string or, when the key was
/// repeated (`?a=1&a=2`), the list of strings in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// The last supplied value. Repeated reserved keys resolve to this.
    #[must_use]
    pub fn last(&self) -> &str {
        match self {
            ParamValue::Single(v) => v,
            ParamValue::List(vs) => vs.last().map_or("", String::as_str),
        }
    }

    /// Every supplied value, in request order.
    #[must_use]
    pub fn all(&self) -> &[String] {
        match self {
            ParamValue::Single(v) => std::slice::from_ref(v),
            ParamValue::List(vs) => vs,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(first) => {
                *self = ParamValue::List(vec![std::mem::take(first), value]);
            }
            ParamValue::List(vs) => vs.push(value),
        }
    }
}

/// Query parameters keyed by name. Keys iterate in sorted order so the
/// filter terms built from them are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, turning the entry into a list if the key repeats.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.push(value);
        } else {
            self.entries.insert(key, ParamValue::Single(value));
        }
    }

    /// Builder-style [`QueryParams::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_become_lists() {
        let params: QueryParams = [("sort", "name"), ("sort", "-createdAt"), ("page", "2")]
            .into_iter()
            .collect();

        assert_eq!(params.len(), 2);
        let sort = params.get("sort").unwrap();
        assert_eq!(sort.all(), ["name".to_string(), "-createdAt".to_string()]);
        assert_eq!(sort.last(), "-createdAt");
        assert_eq!(params.get("page"), Some(&ParamValue::Single("2".to_string())));
    }

    #[test]
    fn iteration_is_key_ordered() {
        let params = QueryParams::new().with("z", "1").with("a", "2");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "z"]);
    }
}
