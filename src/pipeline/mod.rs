//! Pipeline stages shared by the indexing flows.
//!
//! Each submodule implements exactly one transformation step, so stages are
//! independently testable and a flow is just composition:
//!
//! ```text
//! source ──▶ split ──▶ embed ──▶ export        (page indexing)
//! source ──▶ chunk ──▶ embed ──▶ export        (text indexing)
//! source ──▶ extract ─────────▶ export         (knowledge graph)
//! ```
//!
//! 1. [`source`]  — enumerate documents under a local directory
//! 2. [`split`]   — classify by extension and rasterize PDFs into page
//!    images; flows run it in `spawn_blocking` because pdfium is not
//!    async-safe
//! 3. [`chunk`]   — recursive overlapping text chunking
//! 4. [`embed`]   — HTTP embedding clients with retry/backoff
//! 5. [`extract`] — LLM summary and relationship extraction

pub mod chunk;
pub mod embed;
pub mod extract;
pub mod source;
pub mod split;
