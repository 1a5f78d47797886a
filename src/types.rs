//! Core data types shared by the query and graph layers
//!
//! # Key Types
//!
//! - **`TimeRange`**: Half-open time window `[start, end)` for a flow query
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use kuba_sankey::types::TimeRange;
//!
//! let start = Utc.with_ymd_and_hms(2022, 4, 10, 15, 45, 10).unwrap();
//! let end = Utc.with_ymd_and_hms(2022, 4, 11, 15, 45, 10).unwrap();
//! let range = TimeRange::new(start, end).unwrap();
//! assert_eq!(range.to_string(), "[2022-04-10T15:45:10+00:00, 2022-04-11T15:45:10+00:00)");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time window for a flow query
///
/// The window is half-open: `start` is included, `end` is not. A range is
/// only constructible with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the window (inclusive)
    pub start: DateTime<Utc>,
    /// End of the window (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a validated time range
    ///
    /// Returns [`Error::InvalidRequest`] when `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(Error::invalid(format!(
                "time range end {} must be after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_range() {
        let range = TimeRange::new(at(1), at(3)).unwrap();
        assert_eq!(range.start, at(1));
        assert_eq!(range.end, at(3));
        assert_eq!(
            range.to_string(),
            "[2022-04-10T01:00:00+00:00, 2022-04-10T03:00:00+00:00)"
        );
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(matches!(
            TimeRange::new(at(2), at(2)),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(matches!(
            TimeRange::new(at(5), at(2)),
            Err(Error::InvalidRequest(_))
        ));
    }
}
