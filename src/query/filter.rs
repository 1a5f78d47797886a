//! Raw filter predicates
//!
//! A filter is a SQL fragment that has already been translated and
//! sanitized by the caller. It is conjoined to every `WHERE` clause as
//! `AND (<filter>)`. Whitespace-only filters are treated as absent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Optional trusted SQL predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter(Option<String>);

impl QueryFilter {
    /// Build a filter from raw text; blank text means no filter
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_string()))
        }
    }

    /// A filter that matches everything
    pub fn none() -> Self {
        Self(None)
    }

    /// Predicate text, if any
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Fragment appended after the time predicate in a `WHERE` clause
    pub fn where_suffix(&self) -> String {
        match &self.0 {
            Some(predicate) => format!(" AND ({predicate})"),
            None => String::new(),
        }
    }
}

impl Serialize for QueryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for QueryFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.map(QueryFilter::new).unwrap_or_default())
    }
}
