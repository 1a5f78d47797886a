//! Groupable flow columns
//!
//! Every dimension a sankey request may group by is listed in
//! [`QueryColumn`]. Each column has a [`ColumnKind`] that decides how it is
//! rendered in generated SQL:
//!
//! - **Plain** columns are selected and bucketed as-is.
//! - **Dictionary** columns hold numeric keys (e.g. AS numbers) and are
//!   rendered as `"<key>: <name>"` using a ClickHouse dictionary lookup that
//!   falls back to `???` for unknown keys.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fallback label used by dictionary lookups for missing keys
pub const DICTIONARY_FALLBACK: &str = "???";

/// Literal value the store substitutes for buckets outside the top rows
pub const OTHER: &str = "Other";

/// Rendering strategy for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Column value is used verbatim
    Plain,
    /// Column value is a key enriched through a dictionary lookup
    Dictionary {
        /// ClickHouse dictionary name
        dictionary: &'static str,
        /// Attribute fetched from the dictionary
        attribute: &'static str,
    },
}

/// Registry of columns that can be used as sankey dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryColumn {
    /// Exporter hostname
    ExporterName,
    /// Exporter group
    ExporterGroup,
    /// Source AS number
    SrcAS,
    /// Destination AS number
    DstAS,
    /// Source country
    SrcCountry,
    /// Destination country
    DstCountry,
    /// Input interface name
    InIfName,
    /// Output interface name
    OutIfName,
    /// Input interface description
    InIfDescription,
    /// Output interface description
    OutIfDescription,
    /// Input interface connectivity
    InIfConnectivity,
    /// Output interface connectivity
    OutIfConnectivity,
    /// Input interface provider
    InIfProvider,
    /// Output interface provider
    OutIfProvider,
}

impl QueryColumn {
    /// All registered columns, in display order
    pub const ALL: [QueryColumn; 14] = [
        QueryColumn::ExporterName,
        QueryColumn::ExporterGroup,
        QueryColumn::SrcAS,
        QueryColumn::DstAS,
        QueryColumn::SrcCountry,
        QueryColumn::DstCountry,
        QueryColumn::InIfName,
        QueryColumn::OutIfName,
        QueryColumn::InIfDescription,
        QueryColumn::OutIfDescription,
        QueryColumn::InIfConnectivity,
        QueryColumn::OutIfConnectivity,
        QueryColumn::InIfProvider,
        QueryColumn::OutIfProvider,
    ];

    /// Underlying column name in the flows table
    pub fn name(self) -> &'static str {
        match self {
            QueryColumn::ExporterName => "ExporterName",
            QueryColumn::ExporterGroup => "ExporterGroup",
            QueryColumn::SrcAS => "SrcAS",
            QueryColumn::DstAS => "DstAS",
            QueryColumn::SrcCountry => "SrcCountry",
            QueryColumn::DstCountry => "DstCountry",
            QueryColumn::InIfName => "InIfName",
            QueryColumn::OutIfName => "OutIfName",
            QueryColumn::InIfDescription => "InIfDescription",
            QueryColumn::OutIfDescription => "OutIfDescription",
            QueryColumn::InIfConnectivity => "InIfConnectivity",
            QueryColumn::OutIfConnectivity => "OutIfConnectivity",
            QueryColumn::InIfProvider => "InIfProvider",
            QueryColumn::OutIfProvider => "OutIfProvider",
        }
    }

    /// Rendering strategy for this column
    pub fn kind(self) -> ColumnKind {
        match self {
            QueryColumn::SrcAS | QueryColumn::DstAS => ColumnKind::Dictionary {
                dictionary: "asns",
                attribute: "name",
            },
            _ => ColumnKind::Plain,
        }
    }

    /// Form used in `SELECT`/`GROUP BY` when ranking raw tuples
    pub fn select_raw(self) -> &'static str {
        self.name()
    }

    /// Expression replacing values outside the top rows with `'Other'`
    ///
    /// `rows` must be the name of the CTE holding the top tuples.
    pub fn bucket_expression(self) -> String {
        let col = self.name();
        let value = match self.kind() {
            ColumnKind::Plain => col.to_string(),
            ColumnKind::Dictionary {
                dictionary,
                attribute,
            } => format!(
                "concat(toString({col}), ': ', dictGetOrDefault('{dictionary}', '{attribute}', {col}, '{DICTIONARY_FALLBACK}'))"
            ),
        };
        format!("if({col} IN (SELECT {col} FROM rows), {value}, '{OTHER}')")
    }
}

impl fmt::Display for QueryColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryColumn {
    type Err = Error;

    /// Case-insensitive lookup in the registry
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        QueryColumn::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownDimension(wanted.to_string()))
    }
}

impl Serialize for QueryColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for QueryColumn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
