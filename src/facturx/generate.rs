use serde::Serialize;
use tracing::{info, warn};

use super::embed::{EmbedStatus, embed_xml};
use super::extract::extract_xml;
use super::metadata::DocumentMetadata;
use super::render::PdfRenderer;
use crate::cii::{ConformanceLevel, detect_level, to_cii_xml_with_level, validate_xml_structure};
use crate::compliance::{ComplianceValidator, ValidationReport};
use crate::core::{FacturxError, Invoice};

/// A finished Factur-X document and everything learned while producing it.
#[derive(Debug, Clone)]
pub struct GeneratedInvoice {
    pub pdf: Vec<u8>,
    pub xml: String,
    pub level: ConformanceLevel,
    pub embed_status: EmbedStatus,
    pub validation: ValidationReport,
}

/// Encode, render, embed and validate one invoice.
///
/// An XML document that fails the structural check is fatal
/// ([`FacturxError::XmlGeneration`]); a failed embedding is not, it shows
/// up in `embed_status` and in the validation report.
pub fn generate_facturx(
    invoice: &Invoice,
    renderer: &dyn PdfRenderer,
    level: ConformanceLevel,
    meta: &DocumentMetadata,
    validator: &ComplianceValidator,
) -> Result<GeneratedInvoice, FacturxError> {
    let xml = to_cii_xml_with_level(invoice, level)?;
    let structure = validate_xml_structure(&xml);
    if !structure.is_valid {
        return Err(FacturxError::XmlGeneration(format!(
            "Invalid XML structure: {}",
            structure.errors.join("; ")
        )));
    }

    let rendered = renderer.render(invoice)?;
    let outcome = embed_xml(&rendered, &xml, level, meta);
    if let EmbedStatus::Degraded { reason } = &outcome.status {
        warn!(number = %invoice.number, %reason, "generated PDF without embedded XML");
    }
    let validation = validator.validate(&outcome.pdf);

    info!(
        number = %invoice.number,
        level = %level,
        bytes = outcome.pdf.len(),
        valid = validation.is_valid,
        "generated Factur-X invoice"
    );
    Ok(GeneratedInvoice {
        pdf: outcome.pdf,
        xml,
        level,
        embed_status: outcome.status,
        validation,
    })
}

/// Per-invoice result of [`generate_batch`].
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub invoice_number: String,
    pub result: Result<GeneratedInvoice, FacturxError>,
}

/// Generate several invoices; one failure does not stop the others.
pub fn generate_batch(
    invoices: &[Invoice],
    renderer: &dyn PdfRenderer,
    level: ConformanceLevel,
    meta: &DocumentMetadata,
    validator: &ComplianceValidator,
) -> Vec<BatchItem> {
    invoices
        .iter()
        .enumerate()
        .map(|(index, invoice)| BatchItem {
            index,
            invoice_number: invoice.number.clone(),
            result: generate_facturx(invoice, renderer, level, meta, validator),
        })
        .collect()
}

/// Summary of an arbitrary PDF as a Factur-X document. Output only: a
/// detected BASIC WL level serializes but is not accepted back as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacturxInfo {
    /// Embedded XML declares a recognized level.
    pub is_facturx: bool,
    pub level: Option<ConformanceLevel>,
    pub has_xml: bool,
    pub file_size: usize,
    pub validation: ValidationReport,
}

pub fn inspect(pdf: &[u8], validator: &ComplianceValidator) -> FacturxInfo {
    let embedded = extract_xml(pdf);
    let level = embedded
        .as_ref()
        .and_then(|e| e.text())
        .and_then(detect_level);
    FacturxInfo {
        is_facturx: level.is_some(),
        level,
        has_xml: embedded.is_some(),
        file_size: pdf.len(),
        validation: validator.validate(pdf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BusinessConfiguration, create_invoice, sample_request};
    use crate::facturx::SummaryPdfRenderer;
    use chrono::NaiveDate;

    fn sample() -> Invoice {
        create_invoice(
            &sample_request(),
            &BusinessConfiguration::default(),
            "FX-2024-000001",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
        .unwrap()
    }

    struct BrokenRenderer;

    impl PdfRenderer for BrokenRenderer {
        fn render(&self, _invoice: &Invoice) -> Result<Vec<u8>, FacturxError> {
            Ok(b"%PDF-1.7 truncated".to_vec())
        }
    }

    #[test]
    fn end_to_end_basic() {
        let generated = generate_facturx(
            &sample(),
            &SummaryPdfRenderer::default(),
            ConformanceLevel::Basic,
            &DocumentMetadata::default(),
            &ComplianceValidator::without_external_tool(),
        )
        .unwrap();

        assert_eq!(generated.embed_status, EmbedStatus::Embedded);
        let v = &generated.validation;
        assert!(v.has_xml);
        assert!(v.xml_valid);
        assert_eq!(v.facturx_level.as_deref(), Some("basic"));
        assert!(v.is_valid, "{:?}", v.errors);
        assert_eq!(extract_xml(&generated.pdf).unwrap().text(), Some(generated.xml.as_str()));
    }

    #[test]
    fn embedding_failure_is_reported_not_raised() {
        let generated = generate_facturx(
            &sample(),
            &BrokenRenderer,
            ConformanceLevel::Basic,
            &DocumentMetadata::default(),
            &ComplianceValidator::without_external_tool(),
        )
        .unwrap();
        assert!(matches!(generated.embed_status, EmbedStatus::Degraded { .. }));
        assert_eq!(generated.pdf, b"%PDF-1.7 truncated");
        assert!(!generated.validation.has_xml);
        assert!(!generated.validation.is_valid);
    }

    #[test]
    fn inspect_reports_level() {
        let validator = ComplianceValidator::without_external_tool();
        let generated = generate_facturx(
            &sample(),
            &SummaryPdfRenderer::default(),
            ConformanceLevel::Extended,
            &DocumentMetadata::default(),
            &validator,
        )
        .unwrap();
        let info = inspect(&generated.pdf, &validator);
        assert!(info.is_facturx);
        assert!(info.has_xml);
        assert_eq!(info.level, Some(ConformanceLevel::Extended));
        assert_eq!(info.file_size, generated.pdf.len());

        let plain = inspect(b"hello", &validator);
        assert!(!plain.is_facturx);
        assert!(!plain.validation.is_valid);
    }

    #[test]
    fn batch_keeps_going() {
        let items = generate_batch(
            &[sample(), sample()],
            &BrokenRenderer,
            ConformanceLevel::Minimum,
            &DocumentMetadata::default(),
            &ComplianceValidator::without_external_tool(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].index, 1);
        assert!(items.iter().all(|i| i.result.is_ok()));
    }
}
