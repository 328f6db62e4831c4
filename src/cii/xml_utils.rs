use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;

use crate::core::FacturxError;

/// Indented UTF-8 XML writer with the small vocabulary the CII encoder needs.
///
/// Every method returns `&mut Self` so element runs can be chained with `?`.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, FacturxError> {
        let mut w = Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        };
        w.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(w)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<&mut Self, FacturxError> {
        self.inner
            .write_event(event)
            .map_err(|e| FacturxError::XmlGeneration(format!("XML write error: {e}")))?;
        Ok(self)
    }

    pub fn into_string(self) -> Result<String, FacturxError> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| FacturxError::XmlGeneration(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, FacturxError> {
        self.start_element_with_attrs(name, &[])
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturxError> {
        let tag = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.emit(Event::Start(tag))
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, FacturxError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, FacturxError> {
        self.text_element_with_attrs(name, text, &[])
    }

    /// `<name attrs..>text</name>`, text escaped.
    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturxError> {
        self.start_element_with_attrs(name, attrs)?
            .emit(Event::Text(BytesText::new(text)))?
            .end_element(name)
    }

    /// Monetary amount carrying `currencyID`.
    pub fn amount_element(
        &mut self,
        name: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<&mut Self, FacturxError> {
        let value = format_decimal(amount);
        self.text_element_with_attrs(name, &value, &[("currencyID", currency)])
    }

    pub fn quantity_element(
        &mut self,
        name: &str,
        quantity: Decimal,
        unit_code: &str,
    ) -> Result<&mut Self, FacturxError> {
        let value = format_decimal(quantity);
        self.text_element_with_attrs(name, &value, &[("unitCode", unit_code)])
    }

    /// `<name><{prefix}:DateTimeString format="102">YYYYMMDD</..></name>`
    pub fn date_element(
        &mut self,
        name: &str,
        date: NaiveDate,
        prefix: &str,
    ) -> Result<&mut Self, FacturxError> {
        let inner = format!("{prefix}:DateTimeString");
        self.start_element(name)?
            .text_element_with_attrs(&inner, &format_date(date), &[("format", "102")])?
            .end_element(name)
    }
}

/// Decimal text for CII: at least two fraction digits, no trailing zeros past that.
pub fn format_decimal(d: Decimal) -> String {
    let mut n = d.normalize();
    if n.scale() < 2 {
        n.rescale(2);
    }
    n.to_string()
}

/// Date format code 102: `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Inverse of [`format_date`].
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d").ok()
}
