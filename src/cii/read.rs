use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::level::ConformanceLevel;
use crate::core::FacturxError;

const GUIDELINE_PATH: &str =
    "CrossIndustryInvoice/ExchangedDocumentContext/GuidelineSpecifiedDocumentContextParameter/ID";

/// Flatten a document into `(path, value)` pairs in document order.
///
/// Paths are built from local names, so prefixes and indentation do not
/// affect the result. Attributes appear as `path/@name`. Two encodings of
/// the same invoice compare equal through this view.
pub fn element_values(xml: &str) -> Result<Vec<(String, String)>, FacturxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(local_name(&e));
                push_attributes(&e, &stack, &mut out)?;
            }
            Ok(Event::Empty(e)) => {
                stack.push(local_name(&e));
                push_attributes(&e, &stack, &mut out)?;
                stack.pop();
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(parse_error)?;
                if !text.is_empty() && !stack.is_empty() {
                    out.push((stack.join("/"), text.into_owned()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(e)),
            _ => {}
        }
    }
    Ok(out)
}

/// The declared guideline URN, if any.
pub fn guideline_id(xml: &str) -> Option<String> {
    element_values(xml)
        .ok()?
        .into_iter()
        .find(|(path, _)| path == GUIDELINE_PATH)
        .map(|(_, value)| value.trim().to_string())
}

/// The conformance level named by the guideline URN, if recognized.
pub fn detect_level(xml: &str) -> Option<ConformanceLevel> {
    guideline_id(xml).and_then(|id| ConformanceLevel::from_guideline_id(&id))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn push_attributes(
    e: &BytesStart<'_>,
    stack: &[String],
    out: &mut Vec<(String, String)>,
) -> Result<(), FacturxError> {
    for attr in e.attributes() {
        let attr = attr.map_err(parse_error)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(parse_error)?;
        out.push((format!("{}/@{name}", stack.join("/")), value.into_owned()));
    }
    Ok(())
}

fn parse_error(e: impl std::fmt::Display) -> FacturxError {
    FacturxError::Validation(format!("XML parsing error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_text_and_attributes() {
        let xml = r#"<?xml version="1.0"?>
<a:Root xmlns:a="urn:a">
  <a:Amount currencyID="EUR">10.00</a:Amount>
  <a:Name>Smith &amp; Co</a:Name>
  <a:Empty/>
</a:Root>"#;
        let values = element_values(xml).unwrap();
        assert_eq!(
            values,
            vec![
                ("Root/Amount/@currencyID".to_string(), "EUR".to_string()),
                ("Root/Amount".to_string(), "10.00".to_string()),
                ("Root/Name".to_string(), "Smith & Co".to_string()),
            ]
        );
    }

    #[test]
    fn indentation_does_not_change_values() {
        let compact = r#"<r xmlns="urn:x"><a>1</a><b k="v">2</b></r>"#;
        let pretty = "<r xmlns=\"urn:x\">\n    <a>1</a>\n    <b k=\"v\">2</b>\n</r>\n";
        assert_eq!(element_values(compact).unwrap(), element_values(pretty).unwrap());
    }

    #[test]
    fn detects_level_from_guideline() {
        let xml = format!(
            "<rsm:CrossIndustryInvoice xmlns:rsm=\"r\" xmlns:ram=\"m\">\
             <rsm:ExchangedDocumentContext>\
             <ram:GuidelineSpecifiedDocumentContextParameter><ram:ID>{}</ram:ID>\
             </ram:GuidelineSpecifiedDocumentContextParameter>\
             </rsm:ExchangedDocumentContext></rsm:CrossIndustryInvoice>",
            ConformanceLevel::Minimum.guideline_id()
        );
        assert_eq!(detect_level(&xml), Some(ConformanceLevel::Minimum));
        assert_eq!(detect_level("<x/>"), None);
        assert_eq!(guideline_id("<<<"), None);
    }

    #[test]
    fn malformed_is_error() {
        assert!(element_values("<a><b></a>").is_err());
    }
}
