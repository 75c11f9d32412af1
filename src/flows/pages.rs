//! Page indexing: every supported file becomes page-image embeddings in a
//! Qdrant collection.

use crate::config::IndexingConfig;
use crate::error::{DocError, MultidexError};
use crate::pipeline::embed::ImageEmbedder;
use crate::pipeline::source::{self, SourceDocument};
use crate::pipeline::split;
use crate::report::{DocOutcome, IndexingReport};
use crate::store::qdrant::PageIndex;
use crate::store::PageRecord;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Run the page-indexing flow over `source_dir`.
///
/// `dim` is the per-vector dimensionality of the image embedder, used to
/// bootstrap the collection on first run.
pub async fn index_pages(
    source_dir: &Path,
    embedder: Arc<dyn ImageEmbedder>,
    index: &PageIndex,
    dim: usize,
    config: &IndexingConfig,
) -> Result<IndexingReport, MultidexError> {
    let start = Instant::now();
    let documents = source::scan(source_dir, &config.included_patterns)?;
    index.ensure_collection(dim).await?;

    let total = documents.len();
    info!("page indexing: {total} documents in {}", source_dir.display());
    if let Some(p) = &config.progress {
        p.on_run_start(total);
    }

    let outcomes: Vec<DocOutcome> = stream::iter(documents.into_iter().map(|doc| {
        let embedder = Arc::clone(&embedder);
        process_document(doc, embedder, index, config)
    }))
    .buffer_unordered(config.concurrency)
    .map(|outcome| {
        if let Some(p) = &config.progress {
            p.on_document_done(&outcome, total);
        }
        outcome
    })
    .collect()
    .await;

    let report = IndexingReport::from_outcomes(outcomes, start.elapsed().as_millis() as u64);
    if let Some(p) = &config.progress {
        p.on_run_complete(report.scanned, report.failed);
    }
    info!(
        "page indexing complete: {}/{} documents, {} records, {}ms",
        report.indexed, report.scanned, report.records, report.duration_ms
    );
    Ok(report)
}

async fn process_document(
    doc: SourceDocument,
    embedder: Arc<dyn ImageEmbedder>,
    index: &PageIndex,
    config: &IndexingConfig,
) -> DocOutcome {
    let content = match tokio::fs::read(&doc.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return DocOutcome::failed(DocError::ReadFailed {
                filename: doc.filename,
                detail: e.to_string(),
            })
        }
    };

    // Splitting is CPU-bound (pdfium); keep it off the async workers.
    let filename = doc.filename.clone();
    let dpi = config.dpi;
    let pages = match tokio::task::spawn_blocking(move || {
        split::split_with_dpi(&filename, &content, dpi)
    })
    .await
    {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return DocOutcome::failed(DocError::SplitFailed {
                filename: doc.filename,
                detail: e.to_string(),
            })
        }
        Err(e) => {
            return DocOutcome::failed(DocError::SplitFailed {
                filename: doc.filename,
                detail: format!("split task panicked: {e}"),
            })
        }
    };

    if pages.is_empty() {
        return DocOutcome::skipped(doc.filename);
    }

    let mut records = Vec::with_capacity(pages.len());
    for page in &pages {
        match embedder.embed_image(&page.image).await {
            Ok(embedding) => {
                records.push(PageRecord::new(doc.filename.clone(), page.number, embedding))
            }
            Err(e) => {
                return DocOutcome::failed(DocError::EmbedFailed {
                    filename: doc.filename,
                    retries: config.max_retries,
                    detail: e.to_string(),
                })
            }
        }
    }

    let count = records.len();
    if let Err(e) = index.upsert(records).await {
        return DocOutcome::failed(DocError::ExportFailed {
            filename: doc.filename,
            detail: e.to_string(),
        });
    }
    DocOutcome::indexed(doc.filename, count)
}
