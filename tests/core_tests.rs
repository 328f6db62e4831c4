use chrono::NaiveDate;
use facturx::core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seller() -> Party {
    PartyBuilder::new(
        "Atelier Dupont SARL",
        AddressBuilder::new("12 Rue de la Paix", "Paris", "75002", CountryCode::FR).build(),
    )
    .vat_number("FR40303265045")
    .contact(None, None, Some("factures@dupont.fr".into()))
    .build()
}

fn buyer() -> Party {
    PartyBuilder::new(
        "Brasserie du Port",
        AddressBuilder::new("3 Quai Est", "Marseille", "13002", CountryCode::FR).build(),
    )
    .build()
}

fn line(id: &str, qty: Decimal, price: Decimal, cat: VatCategory, rate: Decimal) -> InvoiceLine {
    InvoiceLineBuilder::new(id, format!("Item {id}"), qty, price)
        .vat(cat, rate)
        .build()
        .unwrap()
}

fn sample() -> Invoice {
    create_invoice(
        &sample_request(),
        &BusinessConfiguration::default(),
        "FX-2024-000001",
        date(2024, 1, 15),
    )
    .unwrap()
}

// --- Sample request ---

#[test]
fn sample_request_totals() {
    let inv = sample();
    assert_eq!(inv.totals.line_total_amount, dec!(6200.00));
    assert_eq!(inv.totals.tax_exclusive_amount, dec!(6200.00));
    assert_eq!(inv.totals.tax_total_amount, dec!(1240.00));
    assert_eq!(inv.totals.tax_inclusive_amount, dec!(7440.00));
    assert_eq!(inv.totals.payable_amount, dec!(7440.00));
    assert_eq!(inv.vat_breakdown.len(), 1);
    assert_eq!(inv.vat_breakdown[0].taxable_amount, dec!(6200.00));
}

#[test]
fn sample_request_defaults() {
    let inv = sample();
    assert_eq!(inv.due_date, Some(date(2024, 2, 14)));
    assert_eq!(inv.seller.name, "Factur-X Express SAS");
    assert_eq!(inv.currency, CurrencyCode::EUR);
    let terms = inv.payment_terms.unwrap();
    assert_eq!(terms.means, PaymentMeansCode::BankTransfer);
    assert_eq!(terms.description.as_deref(), Some("Net 30 days"));
    assert_eq!(
        terms.bank_account.unwrap().iban.as_deref(),
        Some("FR1420041010050500013M02606")
    );
}

#[test]
fn request_rejects_inconsistent_line_total() {
    let mut req = sample_request();
    req.lines[0].line_total = Some(dec!(4999.00));
    let err = create_invoice(&req, &BusinessConfiguration::default(), "X-1", date(2024, 1, 15))
        .unwrap_err();
    assert!(matches!(err, FacturxError::Validation(_)));
    assert!(err.to_string().contains("lines[0]"));
}

#[test]
fn request_json_shape() {
    let json = serde_json::to_string(&sample_request()).unwrap();
    let back: InvoiceCreateRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sample_request());
}

#[test]
fn request_with_overflowing_line_is_rejected() {
    let mut req = sample_request();
    let huge = Decimal::from(1_000_000_000_000_000i64);
    req.lines[0].quantity = huge;
    req.lines[0].unit_price = huge;
    req.lines[0].line_total = None;
    let err = create_invoice(&req, &BusinessConfiguration::default(), "X-2", date(2024, 1, 15))
        .unwrap_err();
    assert!(matches!(err, FacturxError::Validation(_)));
    assert!(err.to_string().contains("exceeds the supported amount range"), "{err}");
}

#[test]
fn yen_request_rounds_line_amounts_to_whole_units() {
    let mut req = sample_request();
    req.currency = Some(CurrencyCode::new("JPY").unwrap());
    req.lines.truncate(1);
    req.lines[0].quantity = dec!(3);
    req.lines[0].unit_price = dec!(0.5);
    req.lines[0].line_total = None;

    let inv = create_invoice(&req, &BusinessConfiguration::default(), "JP-1", date(2024, 1, 15))
        .unwrap();
    assert_eq!(inv.lines[0].line_total, dec!(2));
    assert_eq!(inv.totals.line_total_amount, dec!(2));
    assert!(validate_invoice(&inv).is_empty());

    // A caller total is checked against the whole-yen amount too.
    req.lines[0].line_total = Some(dec!(2));
    assert!(create_invoice(&req, &BusinessConfiguration::default(), "JP-2", date(2024, 1, 15)).is_ok());
    req.lines[0].line_total = Some(dec!(1));
    assert!(create_invoice(&req, &BusinessConfiguration::default(), "JP-3", date(2024, 1, 15)).is_err());
}

// --- Builder and calculator ---

#[test]
fn mixed_rates_group_in_first_occurrence_order() {
    let inv = InvoiceBuilder::new("F-100", date(2024, 3, 1))
        .seller(seller())
        .buyer(buyer())
        .add_line(line("1", dec!(2), dec!(10.00), VatCategory::Reduced, dec!(10)))
        .add_line(line("2", dec!(1), dec!(100.00), VatCategory::Standard, dec!(20)))
        .add_line(line("3", dec!(3), dec!(5.00), VatCategory::Reduced, dec!(10)))
        .build()
        .unwrap();

    let rates: Vec<Decimal> = inv.vat_breakdown.iter().map(|b| b.rate).collect();
    assert_eq!(rates, vec![dec!(10), dec!(20)]);
    assert_eq!(inv.vat_breakdown[0].taxable_amount, dec!(35.00));
    assert_eq!(inv.vat_breakdown[0].vat_amount, dec!(3.50));
    assert_eq!(inv.vat_breakdown[1].vat_amount, dec!(20.00));
    assert_eq!(inv.totals.tax_inclusive_amount, dec!(158.50));
}

#[test]
fn vat_rounds_half_away_from_zero() {
    // 0.125 -> 0.13 net, 0.026 -> 0.03 VAT
    let inv = InvoiceBuilder::new("F-101", date(2024, 3, 1))
        .seller(seller())
        .buyer(buyer())
        .add_line(line("1", dec!(1), dec!(0.125), VatCategory::Standard, dec!(20)))
        .build()
        .unwrap();
    assert_eq!(inv.lines[0].line_total, dec!(0.13));
    assert_eq!(inv.vat_breakdown[0].vat_amount, dec!(0.03));
    assert_eq!(round_commercial(dec!(-2.345), 2), dec!(-2.35));
}

#[test]
fn prepaid_reduces_payable() {
    let inv = InvoiceBuilder::new("F-102", date(2024, 3, 1))
        .seller(seller())
        .buyer(buyer())
        .add_line(line("1", dec!(1), dec!(100), VatCategory::Standard, dec!(20)))
        .prepaid(dec!(20))
        .build()
        .unwrap();
    assert_eq!(inv.totals.tax_inclusive_amount, dec!(120.00));
    assert_eq!(inv.totals.payable_amount, dec!(100.00));
}

#[test]
fn exemption_reason_attaches_to_matching_row() {
    let inv = InvoiceBuilder::new("F-103", date(2024, 3, 1))
        .seller(seller())
        .buyer(buyer())
        .add_line(line("1", dec!(1), dec!(500), VatCategory::Exempt, dec!(0)))
        .add_line(line("2", dec!(1), dec!(100), VatCategory::Standard, dec!(20)))
        .exemption_reason(VatCategory::Exempt, "Article 261 du CGI")
        .build()
        .unwrap();
    assert_eq!(
        inv.vat_breakdown[0].exemption_reason.as_deref(),
        Some("Article 261 du CGI")
    );
    assert_eq!(inv.vat_breakdown[1].exemption_reason, None);
    assert_eq!(inv.vat_breakdown[0].vat_amount, Decimal::ZERO);
}

#[test]
fn builder_requires_parties_and_lines() {
    let err = InvoiceBuilder::new("F-1", date(2024, 1, 1)).build().unwrap_err();
    assert!(matches!(err, FacturxError::Builder(_)));

    let err = InvoiceBuilder::new("F-1", date(2024, 1, 1))
        .seller(seller())
        .buyer(buyer())
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("at least one invoice line"));
}

#[test]
fn builder_collects_all_errors() {
    let mut bad_seller = seller();
    bad_seller.name = String::new();
    let err = InvoiceBuilder::new("", date(2024, 1, 1))
        .seller(bad_seller)
        .buyer(buyer())
        .add_line(line("1", dec!(1), dec!(10), VatCategory::Standard, dec!(20)))
        .build()
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("BR-02"), "{msg}");
    assert!(msg.contains("seller"), "{msg}");
}

#[test]
fn line_rejects_zero_quantity() {
    let err = InvoiceLineBuilder::new("1", "Thing", Decimal::ZERO, dec!(10))
        .build()
        .unwrap_err();
    assert!(matches!(err, FacturxError::Validation(_)));
}

#[test]
fn duplicate_line_ids_are_rejected() {
    let err = InvoiceBuilder::new("F-104", date(2024, 3, 1))
        .seller(seller())
        .buyer(buyer())
        .add_line(line("1", dec!(1), dec!(10), VatCategory::Standard, dec!(20)))
        .add_line(line("1", dec!(1), dec!(10), VatCategory::Standard, dec!(20)))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("duplicate line identifier"));
}

#[test]
fn validate_invoice_flags_tampered_totals() {
    let mut inv = sample();
    assert!(validate_invoice(&inv).is_empty());
    inv.totals.line_total_amount += dec!(1);
    let errors = validate_invoice(&inv);
    assert!(errors.iter().any(|e| e.rule.as_deref() == Some("BR-CO-10")));
}

// --- Codes ---

#[test]
fn code_lists() {
    assert_eq!(InvoiceTypeCode::Commercial.code(), 380);
    assert_eq!(InvoiceTypeCode::from_code(381), Some(InvoiceTypeCode::CreditNote));
    assert_eq!(InvoiceTypeCode::from_code(999), None);
    assert_eq!(VatCategory::Standard.code(), "S");
    assert_eq!(VatCategory::from_code("AE"), Some(VatCategory::ReverseCharge));
    assert_eq!(PaymentMeansCode::BankTransfer.code(), 30);
    assert!(CountryCode::new("XX").is_err());
    assert_eq!(CountryCode::new("FR").unwrap(), CountryCode::FR);
    assert!(CountryCode::new("fr").is_err());
    assert!(CurrencyCode::new("EURO").is_err());
}

// --- Numbering ---

#[test]
fn numbering_follows_template() {
    let config = BusinessConfiguration::default();
    let mut seq = config.number_sequence(2024).unwrap();
    assert_eq!(seq.peek(), "FX-2024-000001");
    assert_eq!(seq.next_number(), "FX-2024-000001");
    assert_eq!(seq.next_number(), "FX-2024-000002");
    assert!(seq.auto_advance(date(2025, 1, 2)));
    assert_eq!(seq.next_number(), "FX-2025-000001");
}

#[test]
fn numbering_requires_seq_placeholder() {
    let err = InvoiceNumberSequence::new("INV-{year}", 2024).unwrap_err();
    assert!(matches!(err, FacturxError::Numbering(_)));
}

// --- Store ---

#[test]
fn store_round_trip_and_statistics() {
    let config = BusinessConfiguration::default();
    let mut store = InvoiceStore::new();
    let mut seq = config.number_sequence(2024).unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let inv = create_invoice(&sample_request(), &config, seq.next_number(), date(2024, 1, 15))
            .unwrap();
        ids.push(store.insert(inv).unwrap());
    }

    assert_eq!(store.len(), 3);
    assert_eq!(store.get(ids[1]).unwrap().number, "FX-2024-000002");
    assert_eq!(store.resolve("FX-2024-000003").unwrap().number, "FX-2024-000003");
    assert_eq!(store.resolve(&ids[0].to_string()).unwrap().number, "FX-2024-000001");
    assert_eq!(store.list(2, 1, Some("acme")).len(), 2);
    assert!(store.list(10, 0, Some("nobody")).is_empty());

    let stats = store.statistics();
    assert_eq!(stats.total_invoices, 3);
    assert_eq!(stats.currency_breakdown["EUR"], dec!(22320.00));

    let dup = create_invoice(&sample_request(), &config, "FX-2024-000001", date(2024, 1, 15))
        .unwrap();
    assert!(store.insert(dup).is_err());
    assert!(matches!(
        store.get_by_number("FX-1999-000001"),
        Err(FacturxError::NotFound { .. })
    ));
}
