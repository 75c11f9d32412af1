//! Result types returned by the indexing pipelines.

use crate::error::DocError;
use serde::{Deserialize, Serialize};

/// What happened to one source document during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocOutcome {
    /// Filename relative to the source root.
    pub filename: String,
    /// Number of records exported for this document. Zero with no error
    /// means the document was skipped (unsupported type, empty content).
    pub records: usize,
    /// Set when the document failed; the run continued without it.
    pub error: Option<DocError>,
}

impl DocOutcome {
    /// A document that produced records.
    pub fn indexed(filename: impl Into<String>, records: usize) -> Self {
        Self {
            filename: filename.into(),
            records,
            error: None,
        }
    }

    /// A document that was skipped as unsupported (not an error).
    pub fn skipped(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            records: 0,
            error: None,
        }
    }

    /// A document that failed.
    pub fn failed(error: DocError) -> Self {
        Self {
            filename: error.filename().to_string(),
            records: 0,
            error: Some(error),
        }
    }
}

/// Summary of a pipeline run.
///
/// A run is considered successful even when some documents failed; check
/// [`IndexingReport::failed`] and the per-document outcomes to decide your
/// own tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingReport {
    /// Documents found by the source scan.
    pub scanned: usize,
    /// Documents that produced at least one record.
    pub indexed: usize,
    /// Documents skipped as unsupported.
    pub skipped: usize,
    /// Documents that failed.
    pub failed: usize,
    /// Total records exported across all documents.
    pub records: usize,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// Per-document outcomes, in completion order.
    pub outcomes: Vec<DocOutcome>,
}

impl IndexingReport {
    /// Assemble a report from per-document outcomes.
    pub fn from_outcomes(outcomes: Vec<DocOutcome>, duration_ms: u64) -> Self {
        let scanned = outcomes.len();
        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        let indexed = outcomes
            .iter()
            .filter(|o| o.error.is_none() && o.records > 0)
            .count();
        let skipped = scanned - failed - indexed;
        let records = outcomes.iter().map(|o| o.records).sum();
        Self {
            scanned,
            indexed,
            skipped,
            failed,
            records,
            duration_ms,
            outcomes,
        }
    }

    /// Errors from all failed documents.
    pub fn errors(&self) -> impl Iterator<Item = &DocError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocError;

    #[test]
    fn report_counts() {
        let outcomes = vec![
            DocOutcome::indexed("a.pdf", 3),
            DocOutcome::skipped("b.txt"),
            DocOutcome::failed(DocError::SplitFailed {
                filename: "c.pdf".into(),
                detail: "corrupt".into(),
            }),
            DocOutcome::indexed("d.jpg", 1),
        ];
        let report = IndexingReport::from_outcomes(outcomes, 42);
        assert_eq!(report.scanned, 4);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.records, 4);
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn skipped_is_not_a_failure() {
        let o = DocOutcome::skipped("notes.txt");
        assert!(o.error.is_none());
        assert_eq!(o.records, 0);
    }
}
