//! The indexing flows: eager, staged drivers over the pipeline stages.
//!
//! Each flow scans the source directory, fans documents out with
//! `buffer_unordered(concurrency)`, and collects per-document outcomes into
//! an [`crate::report::IndexingReport`]. A failed document never aborts the
//! run; fatal errors are reserved for setup (missing source directory,
//! unreachable store).
//!
//! * [`pages::index_pages`] — split files into page images, embed, export
//!   to Qdrant
//! * [`chunks::index_text`] — chunk text files, embed, export to
//!   Postgres/pgvector
//! * [`knowledge::index_knowledge`] — extract summaries and relationships,
//!   export to Neo4j

pub mod chunks;
pub mod knowledge;
pub mod pages;
