//! Cross Industry Invoice (UN/CEFACT CII D16B) XML codec.
//!
//! Writes the Factur-X flavour of CII from an [`Invoice`](crate::core::Invoice),
//! checks the structure of CII documents and reads back element values and
//! the declared conformance level.

mod encode;
mod level;
mod read;
mod validate;
mod xml_utils;

pub use encode::{to_cii_xml, to_cii_xml_with_level};
pub use level::ConformanceLevel;
pub use read::{detect_level, element_values, guideline_id};
pub use validate::{XmlValidationReport, validate_xml_structure};
pub use xml_utils::{format_date, format_decimal, parse_date};

/// Namespace URIs of the CII wire format.
pub mod cii_ns {
    pub const RSM: &str = "urn:un:unece:uncefact:data:standard:CrossIndustryInvoice:100";
    pub const QDT: &str = "urn:un:unece:uncefact:data:standard:QualifiedDataType:100";
    pub const RAM: &str =
        "urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:100";
    pub const UDT: &str = "urn:un:unece:uncefact:data:standard:UnqualifiedDataType:100";
    pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
}
