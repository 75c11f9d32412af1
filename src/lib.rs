//! # multidex
//!
//! Multi-format document indexing pipelines: split documents into
//! embeddable records, embed them over HTTP, and export to a vector or
//! graph store. Ships a CLI with an interactive query loop and a REST
//! search endpoint.
//!
//! ## Pipelines
//!
//! ```text
//! files
//!  │
//!  ├─ pages      split → image-embed → Qdrant        (any file type)
//!  ├─ text       chunk → text-embed  → Postgres      (UTF-8 files)
//!  └─ knowledge  LLM extract         → Neo4j         (UTF-8 files)
//! ```
//!
//! At the heart of the page pipeline sits the splitter: filename + bytes in,
//! ordered page images out. PDFs are rasterized per page at 300 DPI and
//! PNG-encoded; image files pass through as a single page; anything else is
//! skipped. See [`pipeline::split`] for the exact contract.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use multidex::pipeline::split;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("report.pdf")?;
//!     for page in split::split("report.pdf", &bytes)? {
//!         println!("page {:?}: {} PNG bytes", page.number, page.image.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Store endpoints are configured through the environment (see
//! [`config::Settings`]); a `.env` file is honoured when the binary starts.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `multidex` binary (clap + indicatif + pdfium bootstrap) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod flows;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IndexingConfig, IndexingConfigBuilder, Settings, DEFAULT_DPI};
pub use error::{DocError, MultidexError};
pub use pipeline::split::{split, split_with_dpi, Page};
pub use progress::IndexProgress;
pub use report::{DocOutcome, IndexingReport};
