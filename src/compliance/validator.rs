use tracing::{debug, warn};

use super::checker::{ComplianceChecker, NoExternalChecker};
use super::fallback::fallback_check;
use super::report::{CheckReport, ValidationInfo, ValidationReport, ValidatorKind};
use super::structure::facturx_structure_check;
use super::verapdf::VeraPdfChecker;
use crate::cii::{detect_level, validate_xml_structure};
use crate::config::ComplianceSettings;
use crate::facturx::extract_xml;

/// Combines XML extraction, PDF/A checking and the Factur-X structure
/// check into one report. Validation never fails: every input, PDF or
/// not, yields a [`ValidationReport`].
pub struct ComplianceValidator {
    checker: Box<dyn ComplianceChecker>,
}

impl ComplianceValidator {
    pub fn new(checker: impl ComplianceChecker + 'static) -> Self {
        Self {
            checker: Box::new(checker),
        }
    }

    /// Look for veraPDF once and keep the result.
    pub fn from_settings(settings: &ComplianceSettings) -> Self {
        Self::new(VeraPdfChecker::discover(settings))
    }

    /// Heuristic PDF/A checks only.
    pub fn without_external_tool() -> Self {
        Self::new(NoExternalChecker)
    }

    /// PDF/A-3 check through the external tool, or the fallback.
    pub fn validate_pdfa3(&self, pdf: &[u8]) -> CheckReport {
        if !self.checker.is_available() {
            return fallback_check(pdf);
        }
        match self.checker.check(pdf) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "external PDF/A validation failed, using fallback");
                let mut report = fallback_check(pdf);
                report.warnings.insert(0, format!("External validation failed: {e}"));
                report
            }
        }
    }

    pub fn validate_facturx_structure(&self, pdf: &[u8]) -> CheckReport {
        facturx_structure_check(pdf)
    }

    /// Full validation of a (supposed) Factur-X PDF.
    ///
    /// A PDF without embedded XML is not an error by itself: it gets a
    /// warning, the structure check is skipped and validity comes from the
    /// PDF/A check alone.
    pub fn validate(&self, pdf: &[u8]) -> ValidationReport {
        let mut report = ValidationReport {
            is_valid: true,
            facturx_level: None,
            has_xml: false,
            xml_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            validator: ValidatorKind::Comprehensive,
            xml_filename: None,
            pdfa3_validation: None,
            facturx_validation: None,
            xml_validation: None,
        };

        match extract_xml(pdf) {
            Some(embedded) => {
                report.has_xml = true;
                match embedded.text() {
                    Some(xml) => {
                        let xml_report = validate_xml_structure(xml);
                        report.xml_valid = xml_report.is_valid;
                        report.errors.extend(xml_report.errors.iter().cloned());
                        match detect_level(xml) {
                            Some(level) => report.facturx_level = Some(level.to_string()),
                            None => report
                                .warnings
                                .push("Could not determine Factur-X level".into()),
                        }
                        report.xml_validation = Some(xml_report);
                    }
                    None => report
                        .errors
                        .push("XML parsing error: embedded XML is not valid UTF-8".into()),
                }
                report.xml_filename = Some(embedded.filename);
            }
            None => report.warnings.push("No Factur-X XML found in PDF".into()),
        }

        let pdfa = self.validate_pdfa3(pdf);
        report.errors.extend(pdfa.errors.iter().cloned());
        report.warnings.extend(pdfa.warnings.iter().cloned());

        let structure = report.has_xml.then(|| self.validate_facturx_structure(pdf));
        if let Some(s) = &structure {
            report.errors.extend(s.errors.iter().cloned());
            report.warnings.extend(s.warnings.iter().cloned());
        }

        report.is_valid = pdfa.is_valid
            && structure.as_ref().is_none_or(|s| s.is_valid)
            && (!report.has_xml || report.xml_valid);
        report.pdfa3_validation = Some(pdfa);
        report.facturx_validation = structure;

        debug!(
            valid = report.is_valid,
            has_xml = report.has_xml,
            level = report.facturx_level.as_deref().unwrap_or("-"),
            errors = report.errors.len(),
            "validated PDF"
        );
        report
    }

    pub fn validation_info(&self) -> ValidationInfo {
        ValidationInfo {
            verapdf_available: self.checker.is_available(),
            verapdf_path: self.checker.location(),
            supported_validations: vec![
                "PDF/A-3 compliance".into(),
                "Factur-X structure".into(),
                "Comprehensive validation".into(),
            ],
        }
    }
}

impl Default for ComplianceValidator {
    fn default() -> Self {
        Self::without_external_tool()
    }
}
