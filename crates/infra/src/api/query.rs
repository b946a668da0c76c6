//! Request parameter encoding.
//!
//! GET parameters become a query string: list values first, flattened into
//! repeated `key[]=value` pairs in their original order, then the remaining
//! scalars form-encoded. Every other verb sends the parameters as a JSON
//! object body.

use serde_json::{Map, Value};

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    entries: Vec<(String, Value)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, replacing an earlier one with the same key in
    /// place.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Query string without the leading `?`. Empty when there is nothing to
    /// send. `null` values are skipped.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();

        for (key, value) in &self.entries {
            if let Value::Array(items) = value {
                for item in items {
                    pairs.push(format!("{key}[]={}", urlencoding::encode(&scalar_text(item))));
                }
            }
        }

        let mut scalars = url::form_urlencoded::Serializer::new(String::new());
        let mut has_scalars = false;
        for (key, value) in &self.entries {
            if matches!(value, Value::Array(_) | Value::Null) {
                continue;
            }
            scalars.append_pair(key, &scalar_text(value));
            has_scalars = true;
        }
        if has_scalars {
            pairs.push(scalars.finish());
        }

        pairs.join("&")
    }

    /// JSON object body for non-GET requests.
    pub fn to_json_body(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect::<Map<String, Value>>())
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        Self { entries: map.into_iter().collect() }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Booleans are sent as `1`/`0`; objects as their JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
