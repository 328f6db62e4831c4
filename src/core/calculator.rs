use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use super::currencies::CurrencyCode;
use super::error::{FacturxError, ValidationError};
use super::types::{InvoiceTotals, VatBreakdown, VatCategory};

/// Absolute tolerance for every monetary invariant check.
pub const MONETARY_TOLERANCE: Decimal = dec!(0.01);

/// Round to `dp` decimal places using half-up (commercial rounding).
pub fn round_commercial(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `|a - b| <= 0.01`; false when the difference is out of range.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|diff| diff.abs() <= MONETARY_TOLERANCE)
}

/// `quantity x unit_price` rounded to `dp` places, `None` on overflow.
pub fn line_amount(quantity: Decimal, unit_price: Decimal, dp: u32) -> Option<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(|amount| round_commercial(amount, dp))
}

/// Sum that reports overflow as `None` instead of panicking.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

fn out_of_range(field: impl Into<String>, what: &str) -> FacturxError {
    FacturxError::from_findings(&[ValidationError::new(
        field,
        format!("{what} exceeds the supported amount range"),
    )])
}

/// Raw line data the calculator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInput {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    pub vat_category: VatCategory,
}

/// Output of [`calculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    /// One entry per input line, same order.
    pub line_totals: Vec<Decimal>,
    /// Groups in order of first occurrence of each (rate, category).
    pub vat_breakdown: Vec<VatBreakdown>,
    pub totals: InvoiceTotals,
}

/// Derive line totals, the VAT breakdown and the header totals.
///
/// Line totals are `quantity x unit_price` rounded to the currency precision.
/// VAT is computed once per (rate, category) group on the summed taxable base.
/// Allowances and charges are zero.
pub fn calculate(
    lines: &[LineInput],
    currency: CurrencyCode,
    prepaid: Decimal,
) -> Result<Calculation, FacturxError> {
    let mut errors = Vec::new();
    if lines.is_empty() {
        errors.push(ValidationError::with_rule(
            "lines",
            "invoice must have at least one line",
            "BR-16",
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        check_line_input(line, i, &mut errors);
    }
    if prepaid.is_sign_negative() {
        errors.push(ValidationError::new(
            "prepaid_amount",
            "prepaid amount must not be negative",
        ));
    }
    if !errors.is_empty() {
        return Err(FacturxError::from_findings(&errors));
    }

    let dp = currency.minor_units();
    let line_totals = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            line_amount(l.quantity, l.unit_price, dp)
                .ok_or_else(|| out_of_range(format!("lines[{i}].line_total"), "quantity x unit price"))
        })
        .collect::<Result<Vec<Decimal>, FacturxError>>()?;

    // Vec instead of a map: output order must follow first occurrence.
    let mut groups: Vec<(VatCategory, Decimal, Decimal)> = Vec::new();
    for (line, total) in lines.iter().zip(&line_totals) {
        match groups
            .iter_mut()
            .find(|(cat, rate, _)| *cat == line.vat_category && *rate == line.vat_rate)
        {
            Some((_, _, taxable)) => {
                *taxable = taxable
                    .checked_add(*total)
                    .ok_or_else(|| out_of_range("vat_breakdown", "taxable amount"))?;
            }
            None => groups.push((line.vat_category, line.vat_rate, *total)),
        }
    }

    let vat_breakdown = groups
        .into_iter()
        .map(|(category, rate, taxable_amount)| {
            let vat = taxable_amount
                .checked_mul(rate)
                .ok_or_else(|| out_of_range("vat_breakdown", "VAT amount"))?;
            Ok(VatBreakdown {
                category,
                rate,
                taxable_amount,
                vat_amount: round_commercial(vat / dec!(100), dp),
                exemption_reason: None,
            })
        })
        .collect::<Result<Vec<VatBreakdown>, FacturxError>>()?;

    let line_total_amount = checked_sum(line_totals.iter().copied())
        .ok_or_else(|| out_of_range("totals.line_total_amount", "sum of line amounts"))?;
    let tax_total_amount = checked_sum(vat_breakdown.iter().map(|b| b.vat_amount))
        .ok_or_else(|| out_of_range("totals.tax_total_amount", "sum of VAT amounts"))?;
    // Both non-negative here, so this bounds every derived total.
    if line_total_amount.checked_add(tax_total_amount).is_none() {
        return Err(out_of_range("totals.tax_inclusive_amount", "tax inclusive amount"));
    }
    let totals = InvoiceTotals::derive(
        line_total_amount,
        Decimal::ZERO,
        Decimal::ZERO,
        tax_total_amount,
        prepaid,
    );

    debug!(
        lines = lines.len(),
        groups = vat_breakdown.len(),
        payable = %totals.payable_amount,
        "calculated invoice totals"
    );

    Ok(Calculation {
        line_totals,
        vat_breakdown,
        totals,
    })
}

fn check_line_input(line: &LineInput, index: usize, errors: &mut Vec<ValidationError>) {
    let prefix = format!("lines[{index}]");
    if line.quantity <= Decimal::ZERO {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.quantity"),
            "invoiced quantity must be greater than zero",
            "BR-22",
        ));
    }
    if line.unit_price.is_sign_negative() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.unit_price"),
            "item net price must not be negative",
            "BR-27",
        ));
    }
    if line.vat_rate.is_sign_negative() || line.vat_rate > dec!(100) {
        errors.push(ValidationError::new(
            format!("{prefix}.vat_rate"),
            "VAT rate must be between 0 and 100",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: Decimal, price: Decimal, rate: Decimal, cat: VatCategory) -> LineInput {
        LineInput {
            quantity: qty,
            unit_price: price,
            vat_rate: rate,
            vat_category: cat,
        }
    }

    #[test]
    fn minimal_invoice() {
        let calc = calculate(
            &[line(dec!(1), dec!(100.00), dec!(20.0), VatCategory::Standard)],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap();

        assert_eq!(calc.line_totals, vec![dec!(100.00)]);
        assert_eq!(calc.vat_breakdown.len(), 1);
        assert_eq!(calc.vat_breakdown[0].rate, dec!(20.0));
        assert_eq!(calc.vat_breakdown[0].taxable_amount, dec!(100.00));
        assert_eq!(calc.vat_breakdown[0].vat_amount, dec!(20.00));
        assert_eq!(calc.totals.tax_exclusive_amount, dec!(100.00));
        assert_eq!(calc.totals.tax_total_amount, dec!(20.00));
        assert_eq!(calc.totals.tax_inclusive_amount, dec!(120.00));
        assert_eq!(calc.totals.payable_amount, dec!(120.00));
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let calc = calculate(
            &[
                line(dec!(2), dec!(50), dec!(10), VatCategory::Reduced),
                line(dec!(1), dec!(100), dec!(20), VatCategory::Standard),
                line(dec!(3), dec!(10), dec!(10), VatCategory::Reduced),
            ],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap();

        assert_eq!(calc.vat_breakdown.len(), 2);
        assert_eq!(calc.vat_breakdown[0].category, VatCategory::Reduced);
        assert_eq!(calc.vat_breakdown[0].taxable_amount, dec!(130));
        assert_eq!(calc.vat_breakdown[0].vat_amount, dec!(13.00));
        assert_eq!(calc.vat_breakdown[1].category, VatCategory::Standard);
        assert_eq!(calc.vat_breakdown[1].vat_amount, dec!(20.00));
        assert_eq!(calc.totals.tax_total_amount, dec!(33.00));
    }

    #[test]
    fn same_rate_different_category_are_separate_groups() {
        let calc = calculate(
            &[
                line(dec!(1), dec!(10), dec!(0), VatCategory::ZeroRated),
                line(dec!(1), dec!(10), dec!(0), VatCategory::Exempt),
            ],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(calc.vat_breakdown.len(), 2);
    }

    #[test]
    fn rounds_to_currency_precision() {
        let calc = calculate(
            &[line(dec!(3), dec!(0.335), dec!(20), VatCategory::Standard)],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(calc.line_totals[0], dec!(1.01));

        let yen = CurrencyCode::new("JPY").unwrap();
        let calc = calculate(
            &[line(dec!(1), dec!(1005), dec!(10), VatCategory::Standard)],
            yen,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(calc.vat_breakdown[0].vat_amount, dec!(101));
    }

    #[test]
    fn prepaid_reduces_payable() {
        let calc = calculate(
            &[line(dec!(1), dec!(100), dec!(20), VatCategory::Standard)],
            CurrencyCode::EUR,
            dec!(50),
        )
        .unwrap();
        assert_eq!(calc.totals.payable_amount, dec!(70));
    }

    #[test]
    fn rejects_bad_lines() {
        let err = calculate(
            &[
                line(dec!(0), dec!(100), dec!(20), VatCategory::Standard),
                line(dec!(1), dec!(-1), dec!(20), VatCategory::Standard),
            ],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lines[0].quantity"), "{msg}");
        assert!(msg.contains("lines[1].unit_price"), "{msg}");

        assert!(calculate(&[], CurrencyCode::EUR, Decimal::ZERO).is_err());
        assert!(
            calculate(
                &[line(dec!(-2), dec!(1), dec!(20), VatCategory::Standard)],
                CurrencyCode::EUR,
                Decimal::ZERO
            )
            .is_err()
        );
    }

    #[test]
    fn overflowing_amounts_are_rejected() {
        let big = Decimal::from(1_000_000_000_000_000i64);
        let err = calculate(
            &[line(big, big, dec!(20), VatCategory::Standard)],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, FacturxError::Validation(_)));
        assert!(err.to_string().contains("lines[0].line_total"), "{err}");

        let huge = Decimal::MAX / dec!(2);
        let err = calculate(
            &[
                line(dec!(1), huge, dec!(0), VatCategory::ZeroRated),
                line(dec!(1), huge, dec!(0), VatCategory::ZeroRated),
                line(dec!(1), huge, dec!(0), VatCategory::ZeroRated),
            ],
            CurrencyCode::EUR,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds the supported amount range"), "{err}");
    }

    #[test]
    fn zero_decimal_currency_rounds_line_amounts() {
        let yen = CurrencyCode::new("JPY").unwrap();
        let calc = calculate(
            &[line(dec!(3), dec!(0.5), dec!(10), VatCategory::Standard)],
            yen,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(calc.line_totals, vec![dec!(2)]);
        assert_eq!(line_amount(dec!(3), dec!(0.5), 0), Some(dec!(2)));
        assert_eq!(line_amount(Decimal::MAX, dec!(2), 2), None);
    }

    #[test]
    fn tolerance_helper() {
        assert!(within_tolerance(dec!(100.00), dec!(100.01)));
        assert!(!within_tolerance(dec!(100.00), dec!(100.02)));
        assert_eq!(round_commercial(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_commercial(dec!(-2.345), 2), dec!(-2.35));
        assert!(!within_tolerance(Decimal::MAX, Decimal::MIN));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
    }
}
