//! Ordered MIME header fields.

use crate::constants::LINE_END;
use std::fmt;

/// Header fields in emission order.
///
/// Unlike a map, insertion order is kept exactly, since receivers compare
/// rendered header blocks byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    fields: Vec<(String, String)>,
}

impl HeaderFields {
    /// Creates an empty field list.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a field name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Returns an iterator over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders each field as `name: value` followed by `line_break`.
    ///
    /// No blank line is appended after the last field.
    #[must_use]
    pub fn to_block(&self, line_break: &str) -> String {
        let mut block = String::new();
        for (name, value) in &self.fields {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str(line_break);
        }
        block
    }

    /// Consumes the list, returning the raw pairs.
    #[must_use]
    pub fn into_vec(self) -> Vec<(String, String)> {
        self.fields
    }
}

impl fmt::Display for HeaderFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_block(LINE_END))
    }
}

impl IntoIterator for HeaderFields {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_new() {
        let fields = HeaderFields::new();
        assert!(fields.is_empty());
        assert_eq!(fields.to_block("\r\n"), "");
    }

    #[test]
    fn test_fields_keep_order() {
        let mut fields = HeaderFields::new();
        fields.push("Content-Type", "text/plain");
        fields.push("Content-ID", "<a@b>");
        fields.push("Content-Description", "note");

        let names: Vec<&str> = fields.names().collect();
        assert_eq!(names, ["Content-Type", "Content-ID", "Content-Description"]);
    }

    #[test]
    fn test_fields_get_case_insensitive() {
        let mut fields = HeaderFields::new();
        fields.push("Content-Type", "text/plain");
        assert_eq!(fields.get("content-type"), Some("text/plain"));
        assert_eq!(fields.get("Content-ID"), None);
    }

    #[test]
    fn test_fields_block() {
        let mut fields = HeaderFields::new();
        fields.push("Content-Type", "text/plain");
        fields.push("Content-Transfer-Encoding", "8bit");

        assert_eq!(
            fields.to_block("\n"),
            "Content-Type: text/plain\nContent-Transfer-Encoding: 8bit\n"
        );
        assert_eq!(
            fields.to_string(),
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: 8bit\r\n"
        );
    }

    #[test]
    fn test_fields_into_vec() {
        let mut fields = HeaderFields::new();
        fields.push("Content-Language", "en");
        assert_eq!(
            fields.into_vec(),
            vec![("Content-Language".to_string(), "en".to_string())]
        );
    }
}
