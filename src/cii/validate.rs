use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cii_ns;
use super::level::ConformanceLevel;
use super::read::guideline_id;

/// Result of a structural check. Always produced, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Anchors every Factur-X CII document must contain, as (namespace, local name).
const REQUIRED_ELEMENTS: [(&str, &str, &str); 4] = [
    (cii_ns::RSM, "rsm", "ExchangedDocumentContext"),
    (cii_ns::RSM, "rsm", "SupplyChainTradeTransaction"),
    (cii_ns::RAM, "ram", "SellerTradeParty"),
    (cii_ns::RAM, "ram", "BuyerTradeParty"),
];

/// Fast shape check of a CII document.
///
/// Parses with namespace resolution and asserts the root element and the
/// four required anchors. This is not XSD validation. A parse failure is
/// recorded as an error entry.
pub fn validate_xml_structure(xml: &str) -> XmlValidationReport {
    let mut report = XmlValidationReport::default();
    let mut found = [false; REQUIRED_ELEMENTS.len()];
    let mut root_seen = false;
    let mut depth = 0usize;

    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        let (resolved, event) = match reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => {
                report.errors.push(format!("XML parsing error: {e}"));
                break;
            }
        };
        let (start, empty) = match &event {
            Event::Start(e) => (Some(e), false),
            Event::Empty(e) => (Some(e), true),
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                (None, false)
            }
            Event::Eof => break,
            _ => (None, false),
        };
        let Some(start) = start else { continue };

        let ns = match resolved {
            ResolveResult::Bound(Namespace(ns)) => Some(ns),
            _ => None,
        };
        let local = start.local_name();
        let local = local.as_ref();

        if !root_seen {
            root_seen = true;
            if ns != Some(cii_ns::RSM.as_bytes()) || local != b"CrossIndustryInvoice" {
                report.errors.push(format!(
                    "Unexpected root element: {}",
                    String::from_utf8_lossy(start.name().as_ref())
                ));
            }
        }
        for (i, (uri, _, name)) in REQUIRED_ELEMENTS.iter().enumerate() {
            if ns == Some(uri.as_bytes()) && local == name.as_bytes() {
                found[i] = true;
            }
        }
        if !empty {
            depth += 1;
        }
    }

    if report.errors.is_empty() {
        if !root_seen {
            report.errors.push("XML parsing error: no root element".into());
        } else if depth != 0 {
            report
                .errors
                .push("XML parsing error: unexpected end of document".into());
        } else {
            for (i, (_, prefix, name)) in REQUIRED_ELEMENTS.iter().enumerate() {
                if !found[i] {
                    report
                        .errors
                        .push(format!("Missing required element: {prefix}:{name}"));
                }
            }
            match guideline_id(xml) {
                Some(id) if ConformanceLevel::from_guideline_id(&id).is_none() => report
                    .warnings
                    .push(format!("Unrecognized guideline identifier: {id}")),
                Some(_) => {}
                None => report
                    .warnings
                    .push("Guideline identifier not found".into()),
            }
        }
    }

    report.is_valid = report.errors.is_empty();
    debug!(
        valid = report.is_valid,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "checked CII structure"
    );
    report
}
