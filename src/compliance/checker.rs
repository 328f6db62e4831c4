use super::report::CheckReport;
use crate::core::FacturxError;

/// An external PDF/A compliance tool.
///
/// [`ComplianceValidator`](super::ComplianceValidator) asks
/// [`is_available`](Self::is_available) before every run and falls back to
/// byte-level heuristics when it is false or when [`check`](Self::check)
/// returns an error.
pub trait ComplianceChecker: Send + Sync {
    fn is_available(&self) -> bool;

    /// Where the tool lives, for diagnostics.
    fn location(&self) -> Option<String> {
        None
    }

    /// Check one PDF. Tool failures are [`FacturxError::ExternalTool`].
    fn check(&self, pdf: &[u8]) -> Result<CheckReport, FacturxError>;
}

/// A checker that is never available; every validation uses the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalChecker;

impl ComplianceChecker for NoExternalChecker {
    fn is_available(&self) -> bool {
        false
    }

    fn check(&self, _pdf: &[u8]) -> Result<CheckReport, FacturxError> {
        Err(FacturxError::ExternalTool(
            "no external compliance tool configured".into(),
        ))
    }
}
