use thiserror::Error;

/// Errors that can occur while building, encoding, packaging or checking an invoice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FacturxError {
    /// One or more validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// The CII encoder could not serialize a structurally valid invoice.
    #[error("XML generation error: {0}")]
    XmlGeneration(String),

    /// Attaching the XML or writing PDF metadata failed.
    #[error("packaging error: {0}")]
    Packaging(String),

    /// The external compliance tool was unavailable, timed out or returned garbage.
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Lookup by invoice number or id failed.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Invoice number sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// Settings could not be loaded or are inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FacturxError {
    /// Whether the caller can degrade instead of failing the whole request.
    ///
    /// Packaging falls back to the unmodified PDF, external tool failures
    /// fall back to the heuristic validator.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Packaging(_) | Self::ExternalTool(_))
    }

    pub(crate) fn from_findings(errors: &[ValidationError]) -> Self {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation(msg)
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "seller.address.country").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// EN 16931 business rule ID if applicable (e.g. "BR-CO-15").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a rule ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Create a validation error with an EN 16931 rule ID.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}
