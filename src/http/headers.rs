use std::collections::HashMap;

/// Request header fields.
///
/// Names are stored exactly as the client sent them. Lookups go through
/// [`Headers::get`], which matches names case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any field whose name differs only in ASCII
    /// case. The later field wins, under the name it was sent with.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.fields.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.fields.insert(name, value.into());
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::headers::Headers;
    /// let mut headers = Headers::new();
    /// headers.insert("Content-Type", "text/plain");
    /// assert_eq!(headers.get("content-type"), Some("text/plain"));
    /// ```
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.fields.get(name) {
            return Some(value.as_str());
        }

        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(name, value)` pairs with names as received.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
