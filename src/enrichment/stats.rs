//! Enrichment statistics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What an enrichment pass changed in a document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStats {
    /// Nodes inserted into the document
    pub nodes_added: usize,
    /// Existing nodes that absorbed new data
    pub nodes_updated: usize,
    /// Nodes removed (replaced virtual roots)
    pub nodes_removed: usize,
    /// Edges inserted into the document
    pub edges_added: usize,
    /// Inputs that were recognised but intentionally not recorded
    pub skipped: usize,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl EnrichmentStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pass left the document untouched
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.nodes_added == 0
            && self.nodes_updated == 0
            && self.nodes_removed == 0
            && self.edges_added == 0
    }

    /// Log a summary of the enrichment pass
    pub fn log_summary(&self, enricher: &str) {
        tracing::info!(
            "{} enrichment complete: {} nodes added, {} updated, {} removed, \
             {} edges added, {} skipped in {:?}",
            enricher,
            self.nodes_added,
            self.nodes_updated,
            self.nodes_removed,
            self.edges_added,
            self.skipped,
            self.duration
        );
    }

    /// Merge stats from another enrichment pass
    pub fn merge(&mut self, other: &Self) {
        self.nodes_added += other.nodes_added;
        self.nodes_updated += other.nodes_updated;
        self.nodes_removed += other.nodes_removed;
        self.edges_added += other.edges_added;
        self.skipped += other.skipped;
        self.duration += other.duration;
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_counters() {
        let mut total = EnrichmentStats::new();
        assert!(total.is_noop());

        let pass = EnrichmentStats {
            nodes_added: 1,
            edges_added: 2,
            skipped: 1,
            ..Default::default()
        };
        total.merge(&pass);
        total.merge(&pass);
        assert_eq!(total.nodes_added, 2);
        assert_eq!(total.edges_added, 4);
        assert_eq!(total.skipped, 2);
        assert!(!total.is_noop());
    }

    #[test]
    fn test_serializes_duration_as_millis() {
        let stats = EnrichmentStats {
            duration: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["duration"], 1500);
    }
}
