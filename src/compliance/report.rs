use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cii::XmlValidationReport;

/// Which backend produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidatorKind {
    #[serde(rename = "veraPDF")]
    VeraPdf,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "facturx_structure")]
    FacturxStructure,
    #[serde(rename = "comprehensive")]
    Comprehensive,
}

impl ValidatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeraPdf => "veraPDF",
            Self::Fallback => "fallback",
            Self::FacturxStructure => "facturx_structure",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check (PDF/A, fallback heuristics or Factur-X structure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validator: ValidatorKind,
    /// Validation profile reported by veraPDF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

impl CheckReport {
    pub fn new(validator: ValidatorKind) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            validator,
            profile: None,
            statement: None,
        }
    }

    /// Validity follows from the collected errors.
    pub(crate) fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// The comprehensive report handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Declared conformance level, e.g. `"basic"`.
    pub facturx_level: Option<String>,
    pub has_xml: bool,
    pub xml_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validator: ValidatorKind,
    /// Embedded filename, when XML was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdfa3_validation: Option<CheckReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facturx_validation: Option<CheckReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_validation: Option<XmlValidationReport>,
}

impl ValidationReport {
    /// True when the PDF/A check ran on the heuristic fallback.
    pub fn is_degraded(&self) -> bool {
        self.pdfa3_validation
            .as_ref()
            .is_some_and(|r| r.validator == ValidatorKind::Fallback)
    }
}

/// What validation tooling this process has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationInfo {
    pub verapdf_available: bool,
    pub verapdf_path: Option<String>,
    pub supported_validations: Vec<String>,
}
