//! Notification records and snapshot deduplication.
//!
//! The device never hands us a stable notification id, so identity is purely
//! structural over the four dump fields. Each poll is compared against the
//! immediately preceding one only; nothing here accumulates history, which
//! keeps memory flat no matter how long the daemon runs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One notification as parsed out of a device dump.
///
/// Every dump field is optional because the shade reports whatever subset the
/// posting app supplied. An absent field is not the same notification as an
/// empty one. `observed_at` is the daemon-side parse timestamp and never
/// participates in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Record with every field absent, stamped now.
    pub fn new() -> Self {
        Self {
            ticker: None,
            title: None,
            text: None,
            package: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// True when no dump field was populated at all. The parser drops these.
    pub fn is_blank(&self) -> bool {
        self.ticker.is_none() && self.title.is_none() && self.text.is_none() && self.package.is_none()
    }

    /// Structural identity of this record. Two records are the same
    /// notification iff their keys are equal.
    pub fn identity(&self) -> NotificationKey<'_> {
        NotificationKey {
            ticker: self.ticker.as_deref(),
            title: self.title.as_deref(),
            text: self.text.as_deref(),
            package: self.package.as_deref(),
        }
    }
}

impl Default for NotificationRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite identity key over the four dump fields, nothing else.
/// `None` never equals `Some("")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationKey<'a> {
    ticker: Option<&'a str>,
    title: Option<&'a str>,
    text: Option<&'a str>,
    package: Option<&'a str>,
}

/// Ordered set of records visible in one dump, top of the shade first.
pub type Snapshot = Vec<NotificationRecord>;

/// Records in `current` with no structural match anywhere in `previous`.
///
/// Membership is the only criterion: position changes, removals and the size
/// of either snapshot are irrelevant. Duplicates inside `current` are each
/// checked against `previous` alone, so two identical notifications arriving
/// in the same poll both come back. Output order follows `current`.
pub fn fresh_records(previous: &[NotificationRecord], current: &[NotificationRecord]) -> Vec<NotificationRecord> {
    let seen: HashSet<NotificationKey<'_>> = previous.iter().map(NotificationRecord::identity).collect();
    current
        .iter()
        .filter(|record| !seen.contains(&record.identity()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(title: &str, text: &str) -> NotificationRecord {
        NotificationRecord::new()
            .with_title(title)
            .with_text(text)
            .with_package("com.whatsapp")
    }

    #[test]
    fn everything_is_fresh_against_empty_previous() {
        let current = vec![message("Sam", "hi"), message("Ana", "lunch?")];
        let fresh = fresh_records(&[], &current);
        assert_eq!(fresh, current);
    }

    #[test]
    fn identical_snapshot_yields_nothing() {
        let a = vec![message("Sam", "hi"), message("Ana", "lunch?")];
        let b = vec![message("Sam", "hi"), message("Ana", "lunch?")];
        assert!(fresh_records(&a, &b).is_empty());
    }

    #[test]
    fn reordering_is_not_freshness() {
        let previous = vec![message("Sam", "hi"), message("Ana", "lunch?")];
        let current = vec![message("Ana", "lunch?"), message("Sam", "hi")];
        assert!(fresh_records(&previous, &current).is_empty());
    }

    #[test]
    fn output_preserves_current_order() {
        let previous = vec![message("Sam", "hi")];
        let current = vec![
            message("Zoe", "third"),
            message("Sam", "hi"),
            message("Ana", "first"),
        ];
        let fresh = fresh_records(&previous, &current);
        let titles: Vec<_> = fresh.iter().map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Zoe"), Some("Ana")]);
    }

    #[test]
    fn absent_field_differs_from_empty_field() {
        let previous = vec![NotificationRecord::new().with_title("Sam").with_text("")];
        let current = vec![NotificationRecord::new().with_title("Sam")];
        assert_eq!(fresh_records(&previous, &current).len(), 1);
    }

    #[test]
    fn any_single_field_change_makes_a_new_record() {
        let base = message("Sam", "hi");
        let previous = vec![base.clone()];
        let variants = vec![
            base.clone().with_ticker("Sam: hi"),
            base.clone().with_title("Samuel"),
            base.clone().with_text("hi!"),
            base.clone().with_package("org.telegram.messenger"),
        ];
        assert_eq!(fresh_records(&previous, &variants).len(), 4);
    }

    #[test]
    fn duplicates_within_current_are_kept() {
        let current = vec![message("Sam", "ping"), message("Sam", "ping")];
        assert_eq!(fresh_records(&[], &current).len(), 2);
    }

    #[test]
    fn observed_at_never_affects_identity() {
        let mut earlier = message("Sam", "hi");
        earlier.observed_at = Utc::now() - chrono::Duration::hours(2);
        let later = message("Sam", "hi");
        assert!(fresh_records(&[earlier], &[later]).is_empty());
    }

    #[test]
    fn removals_do_not_resurface_survivors() {
        let previous = vec![message("Sam", "hi"), message("Ana", "lunch?")];
        let current = vec![message("Ana", "lunch?")];
        assert!(fresh_records(&previous, &current).is_empty());
    }
}
