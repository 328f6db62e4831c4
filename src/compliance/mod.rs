//! PDF/A-3 and Factur-X compliance checking.
//!
//! [`ComplianceValidator`] runs an external [`ComplianceChecker`] (veraPDF)
//! when one is available and degrades to byte-level heuristics otherwise.
//! Reports always name the backend that produced them.

mod checker;
mod fallback;
mod report;
mod structure;
mod validator;
mod verapdf;

pub use checker::{ComplianceChecker, NoExternalChecker};
pub use fallback::{FALLBACK_NOTICE, fallback_check};
pub use report::{CheckReport, ValidationInfo, ValidationReport, ValidatorKind};
pub use structure::facturx_structure_check;
pub use validator::ComplianceValidator;
pub use verapdf::{VeraPdfChecker, parse_verapdf_output};

pub(crate) fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
