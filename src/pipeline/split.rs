//! Document page splitting: one file in, zero or more page images out.
//!
//! Classification uses the filename extension only (via `mime_guess`); the
//! bytes are never sniffed. A mislabeled extension therefore yields an empty
//! result (or, for a non-PDF named `*.pdf`, a decode error) — a documented
//! trade-off inherited from the upstream design.
//!
//! Behaviour by classified type:
//!
//! * `application/pdf` — every page is rasterized at the configured DPI and
//!   PNG-encoded; ordinals are 1-based, contiguous, and in source order.
//!   A corrupt PDF fails the whole document; no partial page list escapes.
//! * `image/*` — exactly one [`Page`] with no ordinal and the input bytes
//!   passed through unmodified.
//! * anything else — an empty vector. Unsupported files are a no-op, not an
//!   error.
//!
//! The splitter is synchronous and pure apart from transient decode buffers;
//! callers running it under async runtimes should wrap it in
//! `spawn_blocking` (pdfium is CPU-bound and not async-safe).

use crate::config::DEFAULT_DPI;
use crate::error::MultidexError;
use image::ImageFormat;
use mime_guess::mime;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// A single page produced by the splitter.
///
/// `number` is present only for multi-page source formats (1-based); image
/// files produce a page with `number: None`. `image` holds PNG bytes for
/// rasterized PDF pages and the original bytes for image files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: Option<u32>,
    #[serde(with = "serde_bytes_base64")]
    pub image: Vec<u8>,
}

/// How a filename classifies for splitting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Pdf,
    Image,
    Other,
}

fn media_kind(filename: &str) -> MediaKind {
    match mime_guess::from_path(filename).first() {
        Some(m) if m == mime::APPLICATION_PDF => MediaKind::Pdf,
        Some(m) if m.type_() == mime::IMAGE => MediaKind::Image,
        _ => MediaKind::Other,
    }
}

/// Split a document into page records at the default 300 DPI.
///
/// See the module docs for the classification and failure contract.
pub fn split(filename: &str, content: &[u8]) -> Result<Vec<Page>, MultidexError> {
    split_with_dpi(filename, content, DEFAULT_DPI)
}

/// Split a document into page records, rasterizing PDF pages at `dpi`.
pub fn split_with_dpi(
    filename: &str,
    content: &[u8],
    dpi: u32,
) -> Result<Vec<Page>, MultidexError> {
    match media_kind(filename) {
        MediaKind::Pdf => rasterize_pdf(filename, content, dpi),
        MediaKind::Image => Ok(vec![Page {
            number: None,
            image: content.to_vec(),
        }]),
        MediaKind::Other => {
            debug!("skipping '{}': no supported media type for extension", filename);
            Ok(Vec::new())
        }
    }
}

/// Bind to a pdfium library: a copy next to the executable wins, then the
/// system install (which also honours `PDFIUM_DYNAMIC_LIB_PATH`).
fn bind_pdfium() -> Result<Pdfium, MultidexError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| MultidexError::PdfiumUnavailable(format!("{e:?}")))
}

fn rasterize_pdf(filename: &str, content: &[u8], dpi: u32) -> Result<Vec<Page>, MultidexError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_byte_slice(content, None)
            .map_err(|e| MultidexError::CorruptDocument {
                filename: filename.to_string(),
                detail: format!("{e:?}"),
            })?;

    // PDF user space is 72 points per inch.
    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let pages = document.pages();
    let mut out = Vec::with_capacity(pages.len() as usize);

    for (index, page) in pages.iter().enumerate() {
        let ordinal = index + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            MultidexError::RasterizationFailed {
                filename: filename.to_string(),
                page: ordinal,
                detail: format!("{e:?}"),
            }
        })?;

        let image = bitmap.as_image();
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| MultidexError::PageEncodingFailed {
                filename: filename.to_string(),
                page: ordinal,
                source: e,
            })?;

        debug!(
            "rasterized page {} of '{}' → {}x{} px, {} bytes",
            ordinal,
            filename,
            image.width(),
            image.height(),
            buf.len()
        );

        out.push(Page {
            number: Some(ordinal as u32),
            image: buf,
        });
    }

    Ok(out)
}

/// Serialize page bytes as base64 so `Page` round-trips through JSON
/// payloads without bloating into a number array.
mod serde_bytes_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension_only() {
        assert_eq!(media_kind("report.pdf"), MediaKind::Pdf);
        assert_eq!(media_kind("REPORT.PDF"), MediaKind::Pdf);
        assert_eq!(media_kind("photo.jpg"), MediaKind::Image);
        assert_eq!(media_kind("photo.jpeg"), MediaKind::Image);
        assert_eq!(media_kind("scan.png"), MediaKind::Image);
        assert_eq!(media_kind("sticker.webp"), MediaKind::Image);
        assert_eq!(media_kind("notes.txt"), MediaKind::Other);
        assert_eq!(media_kind("slides.docx"), MediaKind::Other);
        assert_eq!(media_kind("no_extension"), MediaKind::Other);
        assert_eq!(media_kind(""), MediaKind::Other);
    }

    #[test]
    fn image_passes_through_unmodified() {
        // Not a real JPEG — the splitter never decodes image bytes.
        let bytes = b"\xff\xd8\xff\xe0 not really a jpeg".to_vec();
        let pages = split("photo.jpg", &bytes).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, None);
        assert_eq!(pages[0].image, bytes);
    }

    #[test]
    fn unknown_type_yields_empty() {
        assert!(split("notes.txt", b"arbitrary bytes").unwrap().is_empty());
        assert!(split("archive.docx", b"PK\x03\x04").unwrap().is_empty());
        assert!(split("mystery", b"????").unwrap().is_empty());
    }

    #[test]
    fn image_split_is_idempotent() {
        let bytes = vec![1u8, 2, 3, 4, 5];
        let first = split("a.png", &bytes).unwrap();
        let second = split("a.png", &bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn page_serde_round_trip() {
        let page = Page {
            number: Some(2),
            image: vec![0, 159, 146, 150],
        };
        let json = serde_json::to_string(&page).unwrap();
        // bytes travel as base64, not a number array
        assert!(!json.contains("[0,"));
        let back: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
