//! HTTP header collection
//!
//! Headers keep their insertion order, names compare case-insensitively and
//! duplicates are preserved. The line tokenizer here is the single place
//! header lines are split, for both parsing incoming requests and checking
//! serialized responses: it splits on the first colon only, so header values
//! may themselves contain colons.

use super::MAX_HEADERS;
use std::fmt;

/// Ordered collection of HTTP header pairs
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers::default()
    }

    /// Append a header
    ///
    /// An existing header with the same name is not replaced; the duplicate
    /// is kept in order. Insertions past [`MAX_HEADERS`] are dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if self.headers.len() >= MAX_HEADERS {
            return;
        }
        self.headers.push((name.into(), value.into()));
    }

    /// Get the first value for a name, case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get every value for a name, in insertion order
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Check whether a header is present
    pub fn contains(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// True when no headers are present
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over all pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Tokenize one header line into (name, value)
    ///
    /// The split happens at the first colon; optional whitespace around the
    /// value is stripped. Returns `None` for lines without a colon or with
    /// an empty name.
    pub fn parse_header_line(line: &str) -> Option<(String, String)> {
        let colon = line.find(':')?;
        let name = line[..colon].trim();
        if name.is_empty() {
            return None;
        }
        let value = line[colon + 1..].trim();
        Some((name.to_string(), value.to_string()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
