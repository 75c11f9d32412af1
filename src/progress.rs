//! Progress-observer trait for per-document pipeline events.
//!
//! Inject an `Arc<dyn IndexProgress>` via
//! [`crate::config::IndexingConfigBuilder::progress`] to receive events as a
//! pipeline works through its documents. All methods have default no-op
//! implementations so callers only override what they care about.
//!
//! Documents are processed concurrently, so `on_document_done` may be called
//! from several threads at once; implementations must guard shared mutable
//! state themselves.

use crate::report::DocOutcome;

/// Called by a pipeline as it processes documents.
pub trait IndexProgress: Send + Sync {
    /// Called once after the source scan, before any document is processed.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when one document finishes (successfully or not).
    fn on_document_done(&self, outcome: &DocOutcome, total_documents: usize) {
        let _ = (outcome, total_documents);
    }

    /// Called once when the run completes.
    fn on_run_complete(&self, total_documents: usize, failed: usize) {
        let _ = (total_documents, failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        done: AtomicUsize,
    }

    impl IndexProgress for Counting {
        fn on_document_done(&self, _outcome: &DocOutcome, _total: usize) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_noops() {
        let p = Arc::new(Counting {
            done: AtomicUsize::new(0),
        });
        p.on_run_start(10);
        p.on_run_complete(10, 0);
        assert_eq!(p.done.load(Ordering::SeqCst), 0);

        let outcome = DocOutcome {
            filename: "a.md".into(),
            records: 1,
            error: None,
        };
        p.on_document_done(&outcome, 10);
        assert_eq!(p.done.load(Ordering::SeqCst), 1);
    }
}
