//! Decoded `application/x-www-form-urlencoded` parameters.
//!
//! Query strings and form bodies share one representation: a last-value map for
//! the common single-valued case plus an ordered list of every value per key for
//! repeated keys such as checkbox groups.

use std::collections::HashMap;

use crate::protocol::ParseError;

/// Parameters decoded from a query string or a urlencoded form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    single: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
}

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `key=value` pairs separated by `&`.
    ///
    /// Empty fragments are skipped, a fragment without `=` maps to an empty value,
    /// and both key and value are percent-decoded with `+` meaning space.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(input).map_err(|e| ParseError::invalid_body(format!("malformed form data: {e}")))?;

        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        Ok(params)
    }

    fn insert(&mut self, key: String, value: String) {
        self.multi.entry(key.clone()).or_default().push(value.clone());
        self.single.insert(key, value);
    }

    /// Returns the last value sent for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.single.get(key).map(String::as_str)
    }

    /// Returns every value sent for `key`, in the order they appeared.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.multi.get(key).map(Vec::as_slice)
    }

    /// Iterates over the keys present.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.single.keys().map(String::as_str)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.single.len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty()
    }
}
