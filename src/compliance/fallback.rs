use tracing::warn;

use super::contains_bytes;
use super::report::{CheckReport, ValidatorKind};

pub const FALLBACK_NOTICE: &str = "veraPDF not available - using basic validation";

const MIN_PDF_SIZE: usize = 1024;
const TRAILER_WINDOW: usize = 1024;

/// Byte-level PDF/A plausibility checks used when veraPDF cannot run.
///
/// Errors: missing `%PDF-` header, fewer than 1024 bytes. Warnings: no
/// `%%EOF` in the last 1024 bytes, no XMP packet. The report always
/// carries [`FALLBACK_NOTICE`].
pub fn fallback_check(pdf: &[u8]) -> CheckReport {
    let mut report = CheckReport::new(ValidatorKind::Fallback);

    if !pdf.starts_with(b"%PDF-") {
        report.errors.push("Invalid PDF header".into());
    }
    if pdf.len() < MIN_PDF_SIZE {
        report.errors.push("PDF file too small".into());
    }
    let tail = &pdf[pdf.len().saturating_sub(TRAILER_WINDOW)..];
    if !contains_bytes(tail, b"%%EOF") {
        report
            .warnings
            .push("PDF trailer not found in expected location".into());
    }
    if !contains_bytes(pdf, b"<x:xmpmeta") {
        report
            .warnings
            .push("XMP metadata not found (required for PDF/A)".into());
    }
    report.warnings.push(FALLBACK_NOTICE.into());

    warn!(bytes = pdf.len(), "PDF/A validation degraded to heuristics");
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        let r = fallback_check(b"");
        assert!(!r.is_valid);
        assert_eq!(r.errors, vec!["Invalid PDF header", "PDF file too small"]);
        assert_eq!(r.validator, ValidatorKind::Fallback);
        assert!(r.warnings.iter().any(|w| w == FALLBACK_NOTICE));
    }

    #[test]
    fn plausible_pdf_passes_with_warnings() {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend(std::iter::repeat_n(b' ', 2000));
        pdf.extend_from_slice(b"<x:xmpmeta>\n%%EOF\n");
        let r = fallback_check(&pdf);
        assert!(r.is_valid, "{:?}", r.errors);
        assert_eq!(r.warnings, vec![FALLBACK_NOTICE]);
    }

    #[test]
    fn trailer_must_be_near_the_end() {
        let mut pdf = b"%PDF-1.7\n%%EOF\n".to_vec();
        pdf.extend(std::iter::repeat_n(b' ', 2000));
        let r = fallback_check(&pdf);
        assert!(r.is_valid);
        assert!(r
            .warnings
            .contains(&"PDF trailer not found in expected location".to_string()));
        assert!(r
            .warnings
            .contains(&"XMP metadata not found (required for PDF/A)".to_string()));
    }
}
