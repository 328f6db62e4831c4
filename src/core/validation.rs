use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::calculator::{checked_sum, line_amount, within_tolerance};
use super::currencies::CurrencyCode;
use super::error::ValidationError;
use super::types::*;

/// Validate every invariant of an assembled invoice.
/// Returns all validation errors found (not just the first).
pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // BR-02: An Invoice shall have an Invoice number
    if invoice.number.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "number",
            "invoice number must not be empty",
            "BR-02",
        ));
    }
    check_len(&mut errors, "number", Some(&invoice.number), 50);

    validate_party(&invoice.seller, "seller", &mut errors);
    validate_party(&invoice.buyer, "buyer", &mut errors);

    // BR-16: An Invoice shall have at least one Invoice line
    if invoice.lines.is_empty() {
        errors.push(ValidationError::with_rule(
            "lines",
            "invoice must have at least one line",
            "BR-16",
        ));
    }

    let dp = invoice.currency.minor_units();
    let mut seen_ids = HashSet::new();
    for (i, line) in invoice.lines.iter().enumerate() {
        collect_line_errors(line, &format!("lines[{i}]"), dp, &mut errors);
        if !seen_ids.insert(line.id.as_str()) {
            errors.push(ValidationError::new(
                format!("lines[{i}].id"),
                format!("duplicate line identifier '{}'", line.id),
            ));
        }
    }

    if invoice.vat_breakdown.is_empty() {
        errors.push(ValidationError::with_rule(
            "vat_breakdown",
            "invoice must have at least one VAT breakdown row",
            "BR-CO-18",
        ));
    }
    for (i, row) in invoice.vat_breakdown.iter().enumerate() {
        validate_breakdown_row(row, &format!("vat_breakdown[{i}]"), &mut errors);
    }

    errors.extend(validate_totals(&invoice.totals));
    errors.extend(validate_breakdown_sums(invoice));

    // BR-CO-10: Sum of line net amounts
    match checked_sum(invoice.lines.iter().map(|l| l.line_total)) {
        Some(expected) if within_tolerance(invoice.totals.line_total_amount, expected) => {}
        Some(expected) => errors.push(ValidationError::with_rule(
            "totals.line_total_amount",
            format!(
                "line total {} does not match sum of line amounts {}",
                invoice.totals.line_total_amount, expected
            ),
            "BR-CO-10",
        )),
        None => errors.push(out_of_range("totals.line_total_amount", "sum of line amounts")),
    }

    if let Some(terms) = &invoice.payment_terms {
        check_len(&mut errors, "payment_terms.description", terms.description.as_deref(), 500);
        check_len(
            &mut errors,
            "payment_terms.payment_reference",
            terms.payment_reference.as_deref(),
            100,
        );
        if let Some(account) = &terms.bank_account {
            errors.extend(validate_bank_account(account, "payment_terms.bank_account"));
        }
    }

    check_len(&mut errors, "order_reference", invoice.order_reference.as_deref(), 100);
    check_len(&mut errors, "contract_reference", invoice.contract_reference.as_deref(), 100);
    check_len(&mut errors, "project_reference", invoice.project_reference.as_deref(), 100);
    check_len(&mut errors, "note", invoice.note.as_deref(), 1000);
    if let Some(preceding) = &invoice.preceding_invoice {
        if preceding.number.trim().is_empty() {
            errors.push(ValidationError::with_rule(
                "preceding_invoice.number",
                "preceding invoice number must not be empty",
                "BR-55",
            ));
        }
        check_len(&mut errors, "preceding_invoice.number", Some(&preceding.number), 50);
    }

    errors
}

/// Validate a single line: ranges, lengths and `line_total ≈ quantity × unit_price`,
/// the product rounded to two decimals.
pub fn validate_line(line: &InvoiceLine) -> Vec<ValidationError> {
    validate_line_in(line, CurrencyCode::EUR)
}

/// Like [`validate_line`], rounding the product to `currency`'s minor units
/// (so `3 x 0.5` is `2` in JPY).
pub fn validate_line_in(line: &InvoiceLine, currency: CurrencyCode) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    collect_line_errors(line, "line", currency.minor_units(), &mut errors);
    errors
}

/// Check the header total identities at the monetary tolerance.
pub fn validate_totals(totals: &InvoiceTotals) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("line_total_amount", totals.line_total_amount),
        ("allowance_total_amount", totals.allowance_total_amount),
        ("charge_total_amount", totals.charge_total_amount),
        ("tax_exclusive_amount", totals.tax_exclusive_amount),
        ("tax_total_amount", totals.tax_total_amount),
        ("tax_inclusive_amount", totals.tax_inclusive_amount),
        ("prepaid_amount", totals.prepaid_amount),
        ("payable_amount", totals.payable_amount),
    ] {
        if value.is_sign_negative() && !value.is_zero() {
            errors.push(ValidationError::new(
                format!("totals.{field}"),
                format!("{field} must not be negative"),
            ));
        }
    }

    // BR-CO-13: tax exclusive = line total - allowances + charges
    match totals
        .line_total_amount
        .checked_sub(totals.allowance_total_amount)
        .and_then(|v| v.checked_add(totals.charge_total_amount))
    {
        Some(expected) if within_tolerance(totals.tax_exclusive_amount, expected) => {}
        Some(expected) => errors.push(ValidationError::with_rule(
            "totals.tax_exclusive_amount",
            format!(
                "tax exclusive amount {} does not match calculation {}",
                totals.tax_exclusive_amount, expected
            ),
            "BR-CO-13",
        )),
        None => errors.push(out_of_range("totals.tax_exclusive_amount", "tax exclusive amount")),
    }

    // BR-CO-15: tax inclusive = tax exclusive + tax total
    match totals.tax_exclusive_amount.checked_add(totals.tax_total_amount) {
        Some(expected) if within_tolerance(totals.tax_inclusive_amount, expected) => {}
        Some(_) => errors.push(ValidationError::with_rule(
            "totals.tax_inclusive_amount",
            format!(
                "tax inclusive amount {} does not match exclusive {} + tax {}",
                totals.tax_inclusive_amount, totals.tax_exclusive_amount, totals.tax_total_amount
            ),
            "BR-CO-15",
        )),
        None => errors.push(out_of_range("totals.tax_inclusive_amount", "tax inclusive amount")),
    }

    // BR-CO-16: payable = tax inclusive - prepaid
    match totals.tax_inclusive_amount.checked_sub(totals.prepaid_amount) {
        Some(expected) if within_tolerance(totals.payable_amount, expected) => {}
        Some(_) => errors.push(ValidationError::with_rule(
            "totals.payable_amount",
            format!(
                "payable amount {} does not match inclusive {} - prepaid {}",
                totals.payable_amount, totals.tax_inclusive_amount, totals.prepaid_amount
            ),
            "BR-CO-16",
        )),
        None => errors.push(out_of_range("totals.payable_amount", "payable amount")),
    }

    errors
}

/// Breakdown rows must add up to the header tax-exclusive and tax totals.
pub fn validate_breakdown_sums(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match checked_sum(invoice.vat_breakdown.iter().map(|b| b.taxable_amount)) {
        Some(taxable) if within_tolerance(taxable, invoice.totals.tax_exclusive_amount) => {}
        Some(taxable) => errors.push(ValidationError::with_rule(
            "vat_breakdown",
            format!(
                "sum of taxable amounts {} does not match tax exclusive amount {}",
                taxable, invoice.totals.tax_exclusive_amount
            ),
            "BR-CO-17",
        )),
        None => errors.push(out_of_range("vat_breakdown", "sum of taxable amounts")),
    }

    match checked_sum(invoice.vat_breakdown.iter().map(|b| b.vat_amount)) {
        Some(vat) if within_tolerance(vat, invoice.totals.tax_total_amount) => {}
        Some(vat) => errors.push(ValidationError::with_rule(
            "vat_breakdown",
            format!(
                "sum of VAT amounts {} does not match tax total {}",
                vat, invoice.totals.tax_total_amount
            ),
            "BR-CO-14",
        )),
        None => errors.push(out_of_range("vat_breakdown", "sum of VAT amounts")),
    }

    errors
}

/// Length checks for optional bank details.
pub fn validate_bank_account(account: &BankAccount, prefix: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_len(&mut errors, &format!("{prefix}.iban"), account.iban.as_deref(), 34);
    check_len(&mut errors, &format!("{prefix}.bic"), account.bic.as_deref(), 11);
    check_len(
        &mut errors,
        &format!("{prefix}.account_name"),
        account.account_name.as_deref(),
        200,
    );
    check_len(&mut errors, &format!("{prefix}.bank_name"), account.bank_name.as_deref(), 200);
    errors
}

fn out_of_range(field: &str, what: &str) -> ValidationError {
    ValidationError::new(field, format!("{what} exceeds the supported amount range"))
}

fn collect_line_errors(
    line: &InvoiceLine,
    prefix: &str,
    dp: u32,
    errors: &mut Vec<ValidationError>,
) {
    if line.id.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.id"),
            "line identifier must not be empty",
            "BR-21",
        ));
    }
    check_len(errors, &format!("{prefix}.id"), Some(&line.id), 50);

    if line.name.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.name"),
            "item name must not be empty",
            "BR-25",
        ));
    }
    check_len(errors, &format!("{prefix}.name"), Some(&line.name), 200);
    check_len(errors, &format!("{prefix}.description"), line.description.as_deref(), 1000);
    check_len(errors, &format!("{prefix}.classification"), line.classification.as_deref(), 100);

    if line.unit_code.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.unit_code"),
            "unit of measure must not be empty",
            "BR-23",
        ));
    }
    check_len(errors, &format!("{prefix}.unit_code"), Some(&line.unit_code), 10);

    if line.quantity <= Decimal::ZERO {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.quantity"),
            "invoiced quantity must be greater than zero",
            "BR-22",
        ));
    }
    if line.unit_price.is_sign_negative() && !line.unit_price.is_zero() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.unit_price"),
            "item net price must not be negative",
            "BR-27",
        ));
    }
    if line.line_total.is_sign_negative() && !line.line_total.is_zero() {
        errors.push(ValidationError::new(
            format!("{prefix}.line_total"),
            "line total must not be negative",
        ));
    }
    check_rate(errors, &format!("{prefix}.vat_rate"), line.vat_rate);

    match line_amount(line.quantity, line.unit_price, dp) {
        Some(expected) if within_tolerance(line.line_total, expected) => {}
        Some(expected) => errors.push(ValidationError::with_rule(
            format!("{prefix}.line_total"),
            format!(
                "line total {} must equal quantity {} x unit price {} ({})",
                line.line_total, line.quantity, line.unit_price, expected
            ),
            "BR-CO-10",
        )),
        None => errors.push(out_of_range(
            &format!("{prefix}.line_total"),
            "quantity x unit price",
        )),
    }
}

fn validate_breakdown_row(row: &VatBreakdown, prefix: &str, errors: &mut Vec<ValidationError>) {
    check_rate(errors, &format!("{prefix}.rate"), row.rate);
    if row.taxable_amount.is_sign_negative() && !row.taxable_amount.is_zero() {
        errors.push(ValidationError::new(
            format!("{prefix}.taxable_amount"),
            "taxable amount must not be negative",
        ));
    }
    if row.vat_amount.is_sign_negative() && !row.vat_amount.is_zero() {
        errors.push(ValidationError::new(
            format!("{prefix}.vat_amount"),
            "VAT amount must not be negative",
        ));
    }
    check_len(errors, &format!("{prefix}.exemption_reason"), row.exemption_reason.as_deref(), 500);
}

fn validate_party(party: &Party, prefix: &str, errors: &mut Vec<ValidationError>) {
    if party.name.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.name"),
            "name must not be empty",
            if prefix == "seller" { "BR-06" } else { "BR-07" },
        ));
    }
    check_len(errors, &format!("{prefix}.name"), Some(&party.name), 200);
    check_len(errors, &format!("{prefix}.trading_name"), party.trading_name.as_deref(), 200);
    check_len(
        errors,
        &format!("{prefix}.electronic_address"),
        party.electronic_address.as_deref(),
        200,
    );

    let address = &party.address;
    let addr = format!("{prefix}.address");
    if address.city.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{addr}.city"),
            "city must not be empty",
            "BR-09",
        ));
    }
    check_len(errors, &format!("{addr}.street"), Some(&address.street), 200);
    check_len(errors, &format!("{addr}.additional_street"), address.additional_street.as_deref(), 200);
    check_len(errors, &format!("{addr}.city"), Some(&address.city), 100);
    check_len(errors, &format!("{addr}.postal_code"), Some(&address.postal_code), 20);
    check_len(errors, &format!("{addr}.subdivision"), address.subdivision.as_deref(), 100);

    if let Some(tax) = &party.tax_registration {
        check_len(errors, &format!("{prefix}.tax_registration.vat_number"), tax.vat_number.as_deref(), 30);
        check_len(errors, &format!("{prefix}.tax_registration.tax_id"), tax.tax_id.as_deref(), 30);
    }
    if let Some(legal) = &party.legal_registration {
        let p = format!("{prefix}.legal_registration");
        check_len(errors, &format!("{p}.registration_name"), legal.registration_name.as_deref(), 200);
        check_len(errors, &format!("{p}.company_id"), legal.company_id.as_deref(), 50);
        check_len(errors, &format!("{p}.legal_form"), legal.legal_form.as_deref(), 100);
    }
    if let Some(contact) = &party.contact {
        check_len(errors, &format!("{prefix}.contact.name"), contact.name.as_deref(), 100);
        check_len(errors, &format!("{prefix}.contact.phone"), contact.phone.as_deref(), 50);
        check_len(errors, &format!("{prefix}.contact.email"), contact.email.as_deref(), 100);
    }
}

fn check_rate(errors: &mut Vec<ValidationError>, field: &str, rate: Decimal) {
    if (rate.is_sign_negative() && !rate.is_zero()) || rate > dec!(100) {
        errors.push(ValidationError::new(field, "VAT rate must be between 0 and 100"));
    }
}

fn check_len(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        let len = v.chars().count();
        if len > max {
            errors.push(ValidationError::new(
                field,
                format!("must not exceed {max} characters (got {len})"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AddressBuilder, CountryCode, InvoiceBuilder, InvoiceLineBuilder, PartyBuilder,
    };
    use chrono::NaiveDate;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn fr() -> CountryCode {
        CountryCode::new("FR").unwrap()
    }

    fn party(name: &str) -> Party {
        PartyBuilder::new(
            name,
            AddressBuilder::new("1 Rue de Rivoli", "Paris", "75001", fr()).build(),
        )
        .vat_number("FR12345678901")
        .build()
    }

    fn valid_invoice() -> Invoice {
        InvoiceBuilder::new("FX-2024-000001", test_date())
            .seller(party("Seller SAS"))
            .buyer(party("Buyer SARL"))
            .add_line(
                InvoiceLineBuilder::new("1", "Consulting", dec!(2), dec!(100))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn valid_invoice_passes() {
        let errors = validate_invoice(&valid_invoice());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn tampered_totals_detected() {
        let mut inv = valid_invoice();
        inv.totals.tax_inclusive_amount += dec!(0.05);
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.rule.as_deref() == Some("BR-CO-15")));
        assert!(errors.iter().any(|e| e.rule.as_deref() == Some("BR-CO-16")));
    }

    #[test]
    fn one_cent_drift_tolerated() {
        let mut inv = valid_invoice();
        inv.totals.payable_amount += dec!(0.01);
        assert!(validate_totals(&inv.totals).is_empty());
    }

    #[test]
    fn breakdown_must_sum_to_totals() {
        let mut inv = valid_invoice();
        inv.vat_breakdown[0].vat_amount = dec!(10);
        let errors = validate_breakdown_sums(&inv);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_deref(), Some("BR-CO-14"));
    }

    #[test]
    fn line_total_mismatch_detected() {
        let mut inv = valid_invoice();
        inv.lines[0].line_total = dec!(250);
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.field == "lines[0].line_total"));
    }

    #[test]
    fn duplicate_line_ids_detected() {
        let mut inv = valid_invoice();
        let dup = inv.lines[0].clone();
        inv.lines.push(dup);
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.message.contains("duplicate line identifier")));
    }

    #[test]
    fn exempt_without_reason_is_not_enforced() {
        let inv = InvoiceBuilder::new("FX-2024-000002", test_date())
            .seller(party("Seller SAS"))
            .buyer(party("Buyer SARL"))
            .add_line(
                InvoiceLineBuilder::new("1", "Training", dec!(1), dec!(500))
                    .vat(VatCategory::Exempt, dec!(0))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert!(validate_invoice(&inv).is_empty());
    }

    #[test]
    fn field_lengths_checked() {
        let mut inv = valid_invoice();
        inv.payment_terms = Some(PaymentTerms {
            means: PaymentMeansCode::BankTransfer,
            description: None,
            due_date: None,
            payment_reference: None,
            bank_account: Some(BankAccount {
                iban: Some("X".repeat(35)),
                bic: Some("PSSTFRPPPARXX".into()),
                ..Default::default()
            }),
        });
        let errors = validate_invoice(&inv);
        assert!(errors.iter().any(|e| e.field == "payment_terms.bank_account.iban"));
        assert!(errors.iter().any(|e| e.field == "payment_terms.bank_account.bic"));
    }
}
