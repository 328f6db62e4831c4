use super::contains_bytes;
use super::report::{CheckReport, ValidatorKind};
use crate::facturx::{FACTURX_FILENAME, ZUGFERD_FILENAME};

/// Factur-X markers in the raw PDF bytes: an `/EmbeddedFiles` name tree,
/// a recognized attachment name, and a PDF/A output intent.
pub fn facturx_structure_check(pdf: &[u8]) -> CheckReport {
    let mut report = CheckReport::new(ValidatorKind::FacturxStructure);

    if !contains_bytes(pdf, b"/EmbeddedFiles") {
        report
            .errors
            .push("No embedded files found - Factur-X requires embedded XML".into());
    }
    let has_name = [FACTURX_FILENAME, ZUGFERD_FILENAME]
        .iter()
        .any(|name| contains_bytes(pdf, name.as_bytes()));
    if !has_name {
        report
            .errors
            .push("Factur-X XML file not found in embedded files".into());
    }
    if !contains_bytes(pdf, b"/GTS_PDFA1") && !contains_bytes(pdf, b"/GTS_PDFA3") {
        report
            .warnings
            .push("PDF/A conformance declaration not found".into());
    }
    report.finish()
}
