//! Splitter integration tests against real PDF bytes.
//!
//! The PDF fixtures are assembled in-process (valid xref offsets included),
//! so the tests need no files on disk. Cases that rasterize require a
//! pdfium library at runtime; they skip themselves when none can be bound,
//! mirroring how classification-only cases never need it.

use multidex::{split, split_with_dpi, MultidexError};

/// Build a minimal but well-formed PDF with `pages` empty pages.
///
/// MediaBox is 144×144 pt (2×2 in), so a 300 DPI render is 600×600 px.
fn minimal_pdf(pages: usize) -> Vec<u8> {
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 3 + i)).collect();
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages
        ),
    ];
    for _ in 0..pages {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 144 144] >>".to_string());
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_pos = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_pos
        )
        .as_bytes(),
    );
    out
}

/// Evaluate a split result, skipping the test when no pdfium is present.
macro_rules! skip_unless_pdfium {
    ($result:expr) => {
        match $result {
            Err(MultidexError::PdfiumUnavailable(_)) => {
                eprintln!("SKIP — no pdfium library available");
                return;
            }
            other => other,
        }
    };
}

#[test]
fn three_page_pdf_yields_ordered_png_pages() {
    let pdf = minimal_pdf(3);
    let pages = skip_unless_pdfium!(split("report.pdf", &pdf)).expect("valid PDF must split");

    assert_eq!(pages.len(), 3);
    let ordinals: Vec<_> = pages.iter().map(|p| p.number).collect();
    assert_eq!(ordinals, vec![Some(1), Some(2), Some(3)]);

    for page in &pages {
        let decoded = image::load_from_memory(&page.image).expect("page bytes must be valid PNG");
        // 144 pt at 300 DPI → 600 px, allow a pixel of rounding either way
        assert!(
            (598..=602).contains(&decoded.width()),
            "unexpected width {}",
            decoded.width()
        );
    }
}

#[test]
fn split_is_deterministic_for_identical_input() {
    let pdf = minimal_pdf(2);
    let first = skip_unless_pdfium!(split("doc.pdf", &pdf)).expect("split");
    let second = split("doc.pdf", &pdf).expect("split");
    assert_eq!(first, second);
}

#[test]
fn dpi_controls_raster_size() {
    let pdf = minimal_pdf(1);
    let pages = skip_unless_pdfium!(split_with_dpi("doc.pdf", &pdf, 72)).expect("split");
    let decoded = image::load_from_memory(&pages[0].image).expect("valid PNG");
    // 144 pt at 72 DPI → 144 px
    assert!((142..=146).contains(&decoded.width()));
}

#[test]
fn broken_pdf_is_a_fatal_decode_error() {
    let result = skip_unless_pdfium!(split("broken.pdf", b"these are not PDF bytes"));
    match result {
        Err(MultidexError::CorruptDocument { filename, .. }) => {
            assert_eq!(filename, "broken.pdf");
        }
        other => panic!("expected CorruptDocument, got {other:?}"),
    }
}

// ── Classification-only scenarios (no pdfium involved) ───────────────────────

#[test]
fn jpeg_bytes_pass_through_as_single_page() {
    let bytes = b"\xff\xd8\xff\xe0JFIF-ish payload".to_vec();
    let pages = split("photo.jpg", &bytes).expect("image split always succeeds");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].number, None);
    assert_eq!(pages[0].image, bytes);
}

#[test]
fn unsupported_types_are_silently_skipped() {
    assert!(split("notes.txt", b"arbitrary bytes").unwrap().is_empty());
    assert!(split("slides.docx", b"PK\x03\x04").unwrap().is_empty());
    assert!(split("no_extension", b"data").unwrap().is_empty());
}
