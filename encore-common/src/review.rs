//! Review and rating types shared across the Encore subsystem

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Qualitative rating bucket for a concert review
///
/// Exactly three buckets exist. A review is assigned its bucket at
/// submission time and never moves between buckets afterwards; only the
/// order *within* a bucket changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Okay,
    Bad,
}

impl Rating {
    /// All buckets in display hierarchy order (good above okay above bad)
    pub const ALL: [Rating; 3] = [Rating::Good, Rating::Okay, Rating::Bad];

    /// Stable lowercase name used in APIs and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::Okay => "okay",
            Rating::Bad => "bad",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = Error;

    /// Parse the wire spelling of a bucket
    ///
    /// Any string outside `good`/`okay`/`bad` fails with
    /// [`Error::UnknownRating`]; this is the only place an invalid bucket
    /// can enter the system.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Rating::Good),
            "okay" => Ok(Rating::Okay),
            "bad" => Ok(Rating::Bad),
            other => Err(Error::UnknownRating(other.to_string())),
        }
    }
}

/// One reviewed concert placed into a rating bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Stable identifier, unique across all buckets
    pub id: String,
    /// Display title shown during comparison prompts
    pub title: String,
    /// Qualitative bucket, assigned at submission and immutable
    pub rating: Rating,
    /// Optional review text
    pub content: Option<String>,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
    /// Zero-based rank within the bucket (0 = most preferred)
    ///
    /// Managed by the ranking engine; always equals the review's current
    /// storage index in its bucket.
    pub position: usize,
}

impl ReviewItem {
    /// Create a new, not yet ranked review
    pub fn new(id: impl Into<String>, title: impl Into<String>, rating: Rating) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rating,
            content: None,
            created_at: Utc::now(),
            position: 0,
        }
    }

    /// Attach review text
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parse_roundtrip() {
        for rating in Rating::ALL {
            assert_eq!(rating.as_str().parse::<Rating>().unwrap(), rating);
        }
    }

    #[test]
    fn test_rating_rejects_unknown_bucket() {
        let err = "great".parse::<Rating>().unwrap_err();
        match err {
            Error::UnknownRating(s) => assert_eq!(s, "great"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rating_hierarchy_order() {
        assert_eq!(Rating::ALL, [Rating::Good, Rating::Okay, Rating::Bad]);
    }

    #[test]
    fn test_rating_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Okay).unwrap(), "\"okay\"");
        let parsed: Rating = serde_json::from_str("\"bad\"").unwrap();
        assert_eq!(parsed, Rating::Bad);
    }

    #[test]
    fn test_review_builder() {
        let review = ReviewItem::new("r1", "Roskilde 2025", Rating::Good)
            .with_content("Best pit of the summer");
        assert_eq!(review.id, "r1");
        assert_eq!(review.rating, Rating::Good);
        assert_eq!(review.content.as_deref(), Some("Best pit of the summer"));
        assert_eq!(review.position, 0);
    }
}
