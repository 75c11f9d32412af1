//! Error types for the multidex library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MultidexError`] — **Fatal**: the pipeline run cannot proceed at all
//!   (source directory missing, store unreachable, invalid configuration).
//!   Also used for per-call failures inside the splitter and the store
//!   clients, where the contract says the whole operation fails.
//!
//! * [`DocError`] — **Non-fatal**: a single document failed (corrupt PDF,
//!   embedding call exhausted its retries) but the rest of the run is fine.
//!   Stored inside [`crate::report::DocOutcome`] so callers can inspect
//!   partial success rather than losing the whole run to one bad file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the multidex library.
///
/// Document-level failures use [`DocError`] and are stored in
/// [`crate::report::DocOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum MultidexError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Source directory was not found at the given path.
    #[error("source directory not found: '{path}'")]
    SourceNotFound { path: PathBuf },

    /// Filesystem error while scanning or reading a source document.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Splitter errors ───────────────────────────────────────────────────
    /// The document's bytes could not be parsed as the format its
    /// extension claims (e.g. a `.pdf` that pdfium rejects).
    #[error("'{filename}' could not be decoded: {detail}")]
    CorruptDocument { filename: String, detail: String },

    /// pdfium loaded the document but failed to rasterize one page.
    /// No partial page list is returned.
    #[error("rasterization failed for page {page} of '{filename}': {detail}")]
    RasterizationFailed {
        filename: String,
        page: usize,
        detail: String,
    },

    /// A rendered page bitmap could not be PNG-encoded.
    #[error("PNG encoding failed for page {page} of '{filename}': {source}")]
    PageEncodingFailed {
        filename: String,
        page: usize,
        #[source]
        source: image::ImageError,
    },

    /// No pdfium library could be bound.
    #[error(
        "failed to bind to a pdfium library: {0}\n\
         Set PDFIUM_DYNAMIC_LIB_PATH to a directory containing libpdfium, \
         or run the CLI once to download it."
    )]
    PdfiumUnavailable(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// An embedding endpoint rejected the request or returned an
    /// unusable body, after all retries.
    #[error("embedding request failed: {0}")]
    EmbeddingFailed(String),

    /// The extraction LLM returned an error or unparseable output,
    /// after all retries.
    #[error("extraction request failed: {0}")]
    ExtractionFailed(String),

    // ── Export / query errors ─────────────────────────────────────────────
    /// A vector or graph store operation failed.
    #[error("export to {target} failed: {detail}")]
    ExportFailed { target: String, detail: String },

    /// A similarity or graph query failed.
    #[error("query against {target} failed: {detail}")]
    QueryFailed { target: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required environment variable is missing or empty.
    #[error("missing environment variable {name} ({purpose})")]
    MissingEnv {
        name: &'static str,
        purpose: &'static str,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document within a pipeline run.
///
/// Stored alongside [`crate::report::DocOutcome`] when a document fails.
/// The run continues with the remaining documents.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocError {
    /// Splitting failed (corrupt payload, rasterization error).
    #[error("'{filename}': split failed: {detail}")]
    SplitFailed { filename: String, detail: String },

    /// The document is not valid UTF-8 but the pipeline needs text.
    #[error("'{filename}': not valid UTF-8 text")]
    NotText { filename: String },

    /// An embedding call failed after all retries.
    #[error("'{filename}': embedding failed after {retries} retries: {detail}")]
    EmbedFailed {
        filename: String,
        retries: u32,
        detail: String,
    },

    /// LLM extraction failed after all retries.
    #[error("'{filename}': extraction failed after {retries} retries: {detail}")]
    ExtractFailed {
        filename: String,
        retries: u32,
        detail: String,
    },

    /// The store rejected this document's records.
    #[error("'{filename}': export failed: {detail}")]
    ExportFailed { filename: String, detail: String },

    /// The document could not be read from disk.
    #[error("'{filename}': read failed: {detail}")]
    ReadFailed { filename: String, detail: String },
}

impl DocError {
    /// The filename this error is attached to.
    pub fn filename(&self) -> &str {
        match self {
            DocError::SplitFailed { filename, .. }
            | DocError::NotText { filename }
            | DocError::EmbedFailed { filename, .. }
            | DocError::ExtractFailed { filename, .. }
            | DocError::ExportFailed { filename, .. }
            | DocError::ReadFailed { filename, .. } => filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_document_display() {
        let e = MultidexError::CorruptDocument {
            filename: "broken.pdf".into(),
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("broken.pdf"), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn rasterization_failed_display() {
        let e = MultidexError::RasterizationFailed {
            filename: "report.pdf".into(),
            page: 3,
            detail: "render error".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn missing_env_display() {
        let e = MultidexError::MissingEnv {
            name: "MULTIDEX_DATABASE_URL",
            purpose: "Postgres connection string",
        };
        assert!(e.to_string().contains("MULTIDEX_DATABASE_URL"));
    }

    #[test]
    fn doc_error_filename() {
        let e = DocError::EmbedFailed {
            filename: "photo.jpg".into(),
            retries: 3,
            detail: "503".into(),
        };
        assert_eq!(e.filename(), "photo.jpg");
        assert!(e.to_string().contains("3 retries"));
    }
}
