//! The [`Properties`] store: local entries over a chain of default layers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Read, Write};
use std::sync::Arc;

use crate::encoding::Encoding;
use crate::error::Result;
use crate::reader::{self, PropertySink};
use crate::writer::{WriteOptions, Writer};

/// Values longer than this are shortened by [`Properties::list`].
const LIST_VALUE_LIMIT: usize = 40;

/// A string key/value store with fallback defaults.
///
/// Lookups consult the local entries first, then each default layer in
/// order. Default layers are shared and read-only; building a store on top
/// of another one flattens that store's chain into a list of layers, so
/// lookups never recurse.
///
/// # Example
///
/// ```
/// use props_core::Properties;
///
/// let mut defaults = Properties::new();
/// defaults.set_property("host", "localhost");
/// defaults.set_property("port", "8080");
///
/// let mut props = Properties::with_defaults(&defaults);
/// props.load_str("port = 9090\n").unwrap();
///
/// assert_eq!(props.get_property("host"), Some("localhost"));
/// assert_eq!(props.get_property("port"), Some("9090"));
/// assert_eq!(props.get_property_or("user", "admin"), "admin");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: BTreeMap<String, String>,
    #[serde(skip)]
    defaults: Vec<Arc<BTreeMap<String, String>>>,
}

impl Properties {
    /// Create an empty store without defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that falls back to `defaults`.
    ///
    /// The current entries of `defaults` become the first layer, followed by
    /// its own default layers.
    pub fn with_defaults(defaults: &Properties) -> Self {
        let mut layers = Vec::with_capacity(defaults.defaults.len() + 1);
        layers.push(Arc::new(defaults.entries.clone()));
        layers.extend(defaults.defaults.iter().cloned());
        Self {
            entries: BTreeMap::new(),
            defaults: layers,
        }
    }

    /// Number of default layers behind the local entries
    pub fn defaults_len(&self) -> usize {
        self.defaults.len()
    }

    /// Look up `key` locally, then in the defaults.
    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .or_else(|| self.defaults.iter().find_map(|layer| layer.get(key)))
            .map(String::as_str)
    }

    /// Like [`Properties::get_property`], returning `fallback` when absent.
    pub fn get_property_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.get_property(key).unwrap_or(fallback)
    }

    /// Look up `key` in the local entries only.
    pub fn get_local(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite a local entry, returning the previous local value.
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a local entry. Defaults are untouched, so the key may still resolve.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of local entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all local entries; defaults stay.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate local entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every resolvable key, local and default, each once.
    pub fn property_names(&self) -> BTreeSet<&str> {
        self.entries
            .keys()
            .chain(self.defaults.iter().flat_map(|layer| layer.keys()))
            .map(String::as_str)
            .collect()
    }

    /// Load from an ISO-8859-1 stream.
    ///
    /// # Errors
    ///
    /// Parse errors abort the load; entries read before the error are kept.
    pub fn load<R: Read>(&mut self, source: R) -> Result<()> {
        self.load_with_encoding(source, Encoding::default())
    }

    /// Load from a stream in the given encoding.
    ///
    /// # Errors
    ///
    /// Parse errors abort the load; entries read before the error are kept.
    pub fn load_with_encoding<R: Read>(&mut self, source: R, encoding: Encoding) -> Result<()> {
        tracing::debug!(%encoding, "Loading properties");
        reader::parse_reader(source, encoding, self)?;
        Ok(())
    }

    /// Load from text already in memory.
    ///
    /// # Errors
    ///
    /// Parse errors abort the load; entries read before the error are kept.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        reader::parse_str(text, self)?;
        Ok(())
    }

    /// Write local entries as ISO-8859-1 with a timestamp line.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn store<W: Write>(&self, out: W, comments: Option<&str>) -> Result<()> {
        self.store_with_options(out, comments, WriteOptions::default())
    }

    /// Write local entries with explicit writer options.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn store_with_options<W: Write>(
        &self,
        out: W,
        comments: Option<&str>,
        options: WriteOptions,
    ) -> Result<()> {
        Writer::new(options).write(out, self.iter(), comments)
    }

    /// Print every resolvable property for debugging.
    ///
    /// Values longer than 40 characters are cut to 37 followed by `...`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn list<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "-- listing properties --")?;
        for key in self.property_names() {
            let value = self.get_property(key).unwrap_or_default();
            if value.chars().count() > LIST_VALUE_LIMIT {
                let head: String = value.chars().take(LIST_VALUE_LIMIT - 3).collect();
                writeln!(out, "{key}={head}...")?;
            } else {
                writeln!(out, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

impl PropertySink for Properties {
    fn accept(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut props = Self::new();
        props.extend(iter);
        props
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Properties {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.set_property(key, value);
        }
    }
}

impl From<HashMap<String, String>> for Properties {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Properties {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            defaults: Vec::new(),
        }
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_property_returns_previous_local_value() {
        let mut props = Properties::new();
        assert_eq!(props.set_property("a", "1"), None);
        assert_eq!(props.set_property("a", "2"), Some("1".to_string()));
        assert_eq!(props.get_property("a"), Some("2"));
    }

    #[test]
    fn set_property_ignores_defaults_for_previous_value() {
        let defaults: Properties = [("a", "d")].into_iter().collect();
        let mut props = Properties::with_defaults(&defaults);
        assert_eq!(props.set_property("a", "local"), None);
    }

    #[test]
    fn defaults_chain_is_flattened() {
        let base: Properties = [("a", "base"), ("b", "base")].into_iter().collect();
        let mut middle = Properties::with_defaults(&base);
        middle.set_property("b", "middle");
        let top = Properties::with_defaults(&middle);

        assert_eq!(top.defaults_len(), 2);
        assert_eq!(top.get_property("a"), Some("base"));
        assert_eq!(top.get_property("b"), Some("middle"));
        assert!(top.is_empty());
    }

    #[test]
    fn remove_reveals_default() {
        let defaults: Properties = [("k", "default")].into_iter().collect();
        let mut props = Properties::with_defaults(&defaults);
        props.set_property("k", "local");
        assert_eq!(props.remove("k"), Some("local".to_string()));
        assert_eq!(props.get_property("k"), Some("default"));
        assert_eq!(props.get_local("k"), None);
        assert!(!props.contains_key("k"));
    }

    #[test]
    fn list_truncates_long_values() {
        let props: Properties = [("long", "x".repeat(50)), ("short", "y".to_string())]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        props.list(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("-- listing properties --\nlong={}...\nshort=y\n", "x".repeat(37))
        );
    }

    #[test]
    fn serde_uses_local_entries_as_map() {
        let defaults: Properties = [("hidden", "d")].into_iter().collect();
        let mut props = Properties::with_defaults(&defaults);
        props.set_property("k", "v");

        let text = toml::to_string(&props).unwrap();
        assert_eq!(text, "k = \"v\"\n");

        let back: Properties = toml::from_str(&text).unwrap();
        assert_eq!(back.get_property("k"), Some("v"));
        assert_eq!(back.defaults_len(), 0);
    }
}
