use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::cii::format_decimal;
use crate::core::{FacturxError, Invoice, Party};

/// Produces the human-readable PDF that the XML gets embedded into.
pub trait PdfRenderer {
    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>, FacturxError>;
}

/// Plain-text A4 rendering of an invoice: header, parties, one row per
/// line, VAT breakdown and totals. Long invoices continue on further pages.
#[derive(Debug, Clone)]
pub struct SummaryPdfRenderer {
    pub font_size: i64,
    pub line_height: i64,
}

impl Default for SummaryPdfRenderer {
    fn default() -> Self {
        Self {
            font_size: 10,
            line_height: 14,
        }
    }
}

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;

impl PdfRenderer for SummaryPdfRenderer {
    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>, FacturxError> {
        let text = summary_lines(invoice);
        let per_page = ((PAGE_HEIGHT - 2 * MARGIN) / self.line_height).max(1) as usize;

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });

        let mut kids = Vec::new();
        for chunk in text.chunks(per_page) {
            let content = self.page_content(chunk);
            let encoded = content
                .encode()
                .map_err(|e| FacturxError::Packaging(format!("failed to encode page: {e}")))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Contents" => Object::Reference(content_id),
                "Resources" => Object::Reference(resources_id),
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| FacturxError::Packaging(format!("failed to save PDF: {e}")))?;
        Ok(output)
    }
}

impl SummaryPdfRenderer {
    fn page_content(&self, lines: &[String]) -> Content {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), self.font_size.into()]),
            Operation::new("TL", vec![self.line_height.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in lines {
            ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(line))]));
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("ET", vec![]));
        Content { operations: ops }
    }
}

/// Helvetica with WinAnsiEncoding covers Latin-1; anything else becomes `?`.
fn win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn summary_lines(inv: &Invoice) -> Vec<String> {
    let cur = inv.currency.as_str();
    let mut out = vec![
        format!("INVOICE {}", inv.number),
        format!("Type: {}", inv.type_code.code()),
        format!("Issue date: {}", inv.issue_date),
    ];
    if let Some(due) = inv.due_date {
        out.push(format!("Due date: {due}"));
    }
    out.push(String::new());
    party_lines(&mut out, "Seller", &inv.seller);
    out.push(String::new());
    party_lines(&mut out, "Buyer", &inv.buyer);
    out.push(String::new());

    for line in &inv.lines {
        out.push(format!(
            "{}  {}  {} {} x {} {}  = {} {}  (VAT {} {}%)",
            line.id,
            line.name,
            format_decimal(line.quantity),
            line.unit_code,
            format_decimal(line.unit_price),
            cur,
            format_decimal(line.line_total),
            cur,
            line.vat_category,
            format_decimal(line.vat_rate),
        ));
    }
    out.push(String::new());
    for row in &inv.vat_breakdown {
        out.push(format!(
            "VAT {} {}%: basis {} {}, tax {} {}",
            row.category,
            format_decimal(row.rate),
            format_decimal(row.taxable_amount),
            cur,
            format_decimal(row.vat_amount),
            cur,
        ));
    }
    let t = &inv.totals;
    out.push(format!("Total excl. VAT: {} {cur}", format_decimal(t.tax_exclusive_amount)));
    out.push(format!("VAT: {} {cur}", format_decimal(t.tax_total_amount)));
    out.push(format!("Total incl. VAT: {} {cur}", format_decimal(t.tax_inclusive_amount)));
    if !t.prepaid_amount.is_zero() {
        out.push(format!("Prepaid: {} {cur}", format_decimal(t.prepaid_amount)));
    }
    out.push(format!("Amount due: {} {cur}", format_decimal(t.payable_amount)));

    if let Some(terms) = &inv.payment_terms {
        out.push(String::new());
        if let Some(desc) = &terms.description {
            out.push(format!("Payment terms: {desc}"));
        }
        if let Some(iban) = terms.bank_account.as_ref().and_then(|b| b.iban.as_deref()) {
            out.push(format!("IBAN: {iban}"));
        }
    }
    if let Some(note) = &inv.note {
        out.push(String::new());
        out.push(note.clone());
    }
    out
}

fn party_lines(out: &mut Vec<String>, role: &str, party: &Party) {
    out.push(format!("{role}: {}", party.name));
    out.push(party.address.street.clone());
    out.push(format!(
        "{} {} {}",
        party.address.postal_code, party.address.city, party.address.country
    ));
    if let Some(vat) = party.vat_number() {
        out.push(format!("VAT ID: {vat}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BusinessConfiguration, create_invoice, sample_request};
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

    #[test]
    fn renders_loadable_single_page() {
        let pdf = SummaryPdfRenderer::default().render(&sample()).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.7"));
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_invoices_paginate() {
        let renderer = SummaryPdfRenderer {
            font_size: 10,
            line_height: 200,
        };
        let pdf = renderer.render(&sample()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn summary_mentions_totals() {
        let lines = summary_lines(&sample());
        assert_eq!(lines[0], "INVOICE FX-2024-000001");
        assert!(lines.iter().any(|l| l == "Amount due: 7440.00 EUR"));
        assert!(lines.iter().any(|l| l.contains("Software Development Services")));
    }

    #[test]
    fn non_latin1_is_replaced() {
        assert_eq!(win_ansi("Élan €"), vec![0xC9, b'l', b'a', b'n', b' ', b'?']);
    }
}
