use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::{InvoiceBuilder, InvoiceLineBuilder};
use super::business::BusinessConfiguration;
use super::countries::CountryCode;
use super::currencies::CurrencyCode;
use super::error::FacturxError;
use super::types::*;

/// Caller input for a new invoice. The seller, number, issue date and
/// totals are supplied by [`create_invoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCreateRequest {
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub invoice_type: InvoiceTypeCode,
    /// Falls back to the configured default currency.
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    pub buyer: Party,
    pub lines: Vec<LineRequest>,
    #[serde(default)]
    pub order_reference: Option<String>,
    #[serde(default)]
    pub contract_reference: Option<String>,
    #[serde(default)]
    pub project_reference: Option<String>,
    #[serde(default)]
    pub payment_terms: Option<PaymentTerms>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub preceding_invoice: Option<PrecedingInvoiceReference>,
    #[serde(default)]
    pub prepaid_amount: Decimal,
    #[serde(default)]
    pub exemption_reasons: Vec<VatExemption>,
}

/// One requested invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    #[serde(default = "default_unit_code")]
    pub unit_code: String,
    pub unit_price: Decimal,
    /// Optional caller-computed total, checked against quantity x unit price.
    #[serde(default)]
    pub line_total: Option<Decimal>,
    pub vat_category: VatCategory,
    pub vat_rate: Decimal,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub origin_country: Option<CountryCode>,
}

fn default_unit_code() -> String {
    "C62".to_string()
}

/// Exemption reason text for one VAT category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatExemption {
    pub category: VatCategory,
    pub reason: String,
}

/// Assemble a validated invoice from a request and the seller profile.
///
/// The due date defaults to `issue_date + payment_due_days`; without
/// explicit payment terms the invoice gets a bank transfer to the
/// configured account.
pub fn create_invoice(
    request: &InvoiceCreateRequest,
    config: &BusinessConfiguration,
    number: impl Into<String>,
    issue_date: NaiveDate,
) -> Result<Invoice, FacturxError> {
    let number = number.into();
    let currency = request.currency.unwrap_or(config.default_currency);
    let mut failures = Vec::new();
    let mut lines = Vec::with_capacity(request.lines.len());
    for (i, line) in request.lines.iter().enumerate() {
        match build_line(line, currency) {
            Ok(l) => lines.push(l),
            Err(e) => failures.push(format!("lines[{i}]: {e}")),
        }
    }
    if !failures.is_empty() {
        return Err(FacturxError::Validation(failures.join("; ")));
    }

    let due_date = request
        .due_date
        .unwrap_or_else(|| issue_date + Duration::days(i64::from(config.payment_due_days)));

    let payment_terms = match &request.payment_terms {
        Some(terms) => PaymentTerms {
            due_date: terms.due_date.or(Some(due_date)),
            ..terms.clone()
        },
        None => config.default_payment_terms(Some(due_date)),
    };

    let mut builder = InvoiceBuilder::new(number.clone(), issue_date)
        .type_code(request.invoice_type)
        .currency(currency)
        .due_date(due_date)
        .seller(config.seller_party())
        .buyer(request.buyer.clone())
        .payment_terms(payment_terms)
        .prepaid(request.prepaid_amount);

    for line in lines {
        builder = builder.add_line(line);
    }
    for exemption in &request.exemption_reasons {
        builder = builder.exemption_reason(exemption.category, exemption.reason.clone());
    }
    if let Some(r) = &request.order_reference {
        builder = builder.order_reference(r.clone());
    }
    if let Some(r) = &request.contract_reference {
        builder = builder.contract_reference(r.clone());
    }
    if let Some(r) = &request.project_reference {
        builder = builder.project_reference(r.clone());
    }
    if let Some(n) = &request.note {
        builder = builder.note(n.clone());
    }
    if let Some(p) = &request.preceding_invoice {
        builder = builder.preceding_invoice(p.number.clone(), p.issue_date);
    }

    let invoice = builder.build()?;
    debug!(number = %number, lines = invoice.lines.len(), "assembled invoice from request");
    Ok(invoice)
}

fn build_line(line: &LineRequest, currency: CurrencyCode) -> Result<InvoiceLine, FacturxError> {
    let mut b = InvoiceLineBuilder::new(&line.id, &line.name, line.quantity, line.unit_price)
        .currency(currency)
        .unit_code(&line.unit_code)
        .vat(line.vat_category, line.vat_rate);
    if let Some(d) = &line.description {
        b = b.description(d);
    }
    if let Some(t) = line.line_total {
        b = b.line_total(t);
    }
    if let Some(c) = &line.classification {
        b = b.classification(c);
    }
    if let Some(c) = line.origin_country {
        b = b.origin_country(c);
    }
    b.build()
}

/// The two-line demo request: software development and consultation
/// hours for ACME Corporation in Lyon.
pub fn sample_request() -> InvoiceCreateRequest {
    InvoiceCreateRequest {
        due_date: None,
        invoice_type: InvoiceTypeCode::Commercial,
        currency: Some(CurrencyCode::EUR),
        buyer: Party {
            id: None,
            name: "ACME Corporation".into(),
            trading_name: None,
            address: Address {
                street: "123 Business Avenue".into(),
                additional_street: None,
                city: "Lyon".into(),
                postal_code: "69000".into(),
                subdivision: None,
                country: CountryCode::FR,
            },
            tax_registration: Some(TaxRegistration {
                vat_number: Some("FR98765432109".into()),
                tax_id: Some("FR98765432109".into()),
                tax_scheme: "VAT".into(),
            }),
            legal_registration: None,
            contact: None,
            electronic_address: None,
        },
        lines: vec![
            LineRequest {
                id: "1".into(),
                name: "Software Development Services".into(),
                description: Some("Custom software development - Q1 2024".into()),
                quantity: dec!(40),
                unit_code: "HUR".into(),
                unit_price: dec!(125.00),
                line_total: Some(dec!(5000.00)),
                vat_category: VatCategory::Standard,
                vat_rate: dec!(20.0),
                classification: None,
                origin_country: None,
            },
            LineRequest {
                id: "2".into(),
                name: "Technical Consultation".into(),
                description: Some("Architecture review and recommendations".into()),
                quantity: dec!(8),
                unit_code: "HUR".into(),
                unit_price: dec!(150.00),
                line_total: Some(dec!(1200.00)),
                vat_category: VatCategory::Standard,
                vat_rate: dec!(20.0),
                classification: None,
                origin_country: None,
            },
        ],
        order_reference: Some("PO-ACME-2024-001".into()),
        contract_reference: None,
        project_reference: None,
        payment_terms: None,
        note: Some(
            "Thank you for choosing Factur-X Express for your software development needs.".into(),
        ),
        preceding_invoice: None,
        prepaid_amount: Decimal::ZERO,
        exemption_reasons: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn sample_request_totals() {
        let config = BusinessConfiguration::default();
        let inv = create_invoice(&sample_request(), &config, "FX-2024-000001", issue_date()).unwrap();

        assert_eq!(inv.totals.line_total_amount, dec!(6200.00));
        assert_eq!(inv.totals.tax_total_amount, dec!(1240.00));
        assert_eq!(inv.totals.payable_amount, dec!(7440.00));
        assert_eq!(inv.vat_breakdown.len(), 1);
        assert_eq!(inv.seller.name, "Factur-X Express SAS");
    }

    #[test]
    fn due_date_and_payment_terms_defaulted() {
        let config = BusinessConfiguration::default();
        let inv = create_invoice(&sample_request(), &config, "FX-2024-000001", issue_date()).unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        assert_eq!(inv.due_date, Some(due));
        let terms = inv.payment_terms.unwrap();
        assert_eq!(terms.means, PaymentMeansCode::BankTransfer);
        assert_eq!(terms.description.as_deref(), Some("Net 30 days"));
        assert_eq!(terms.due_date, Some(due));
        assert_eq!(
            terms.bank_account.unwrap().iban.as_deref(),
            Some("FR1420041010050500013M02606")
        );
    }

    #[test]
    fn deviating_line_total_rejected_before_assembly() {
        let mut req = sample_request();
        req.lines[1].line_total = Some(dec!(1250.00));
        let err = create_invoice(&req, &BusinessConfiguration::default(), "X", issue_date())
            .unwrap_err();
        assert!(matches!(err, FacturxError::Validation(_)));
        assert!(err.to_string().contains("lines[1]"), "{err}");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let json = r#"{
            "buyer": {
                "name": "Client SARL",
                "address": {"street": "1 Rue", "city": "Lyon", "postal_code": "69000", "country": "FR"}
            },
            "lines": [
                {"id": "1", "name": "Item", "quantity": "2", "unit_price": "10.50",
                 "vat_category": "AA", "vat_rate": "10"}
            ]
        }"#;
        let req: InvoiceCreateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.invoice_type, InvoiceTypeCode::Commercial);
        assert_eq!(req.lines[0].unit_code, "C62");

        let inv = create_invoice(&req, &BusinessConfiguration::default(), "X-1", issue_date())
            .unwrap();
        assert_eq!(inv.currency, CurrencyCode::EUR);
        assert_eq!(inv.totals.tax_inclusive_amount, dec!(23.10));
    }
}
