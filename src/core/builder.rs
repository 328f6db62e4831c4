use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::calculator::{self, LineInput, line_amount};
use super::countries::CountryCode;
use super::currencies::CurrencyCode;
use super::error::FacturxError;
use super::types::*;
use super::validation;

/// Builder for constructing valid invoices.
///
/// Totals and the VAT breakdown are always derived from the lines; the
/// result is checked against every invariant before it is returned.
///
/// ```
/// use facturx::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let fr = CountryCode::new("FR").unwrap();
/// let invoice = InvoiceBuilder::new("FX-2024-000001", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .seller(PartyBuilder::new("Factur-X Express SAS",
///             AddressBuilder::new("42 Avenue des Champs-Élysées", "Paris", "75008", fr).build())
///         .vat_number("FR12345678901")
///         .build())
///     .buyer(PartyBuilder::new("ACME Corporation",
///             AddressBuilder::new("123 Business Avenue", "Lyon", "69000", fr).build())
///         .build())
///     .add_line(InvoiceLineBuilder::new("1", "Consulting", dec!(10), dec!(150.00))
///         .unit_code("HUR")
///         .build()
///         .unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.totals.payable_amount, dec!(1800.00));
/// ```
pub struct InvoiceBuilder {
    number: String,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    type_code: InvoiceTypeCode,
    currency: CurrencyCode,
    seller: Option<Party>,
    buyer: Option<Party>,
    lines: Vec<InvoiceLine>,
    exemption_reasons: Vec<(VatCategory, String)>,
    payment_terms: Option<PaymentTerms>,
    order_reference: Option<String>,
    contract_reference: Option<String>,
    project_reference: Option<String>,
    note: Option<String>,
    preceding_invoice: Option<PrecedingInvoiceReference>,
    prepaid: Decimal,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            issue_date,
            due_date: None,
            type_code: InvoiceTypeCode::Commercial,
            currency: CurrencyCode::EUR,
            seller: None,
            buyer: None,
            lines: Vec::new(),
            exemption_reasons: Vec::new(),
            payment_terms: None,
            order_reference: None,
            contract_reference: None,
            project_reference: None,
            note: None,
            preceding_invoice: None,
            prepaid: Decimal::ZERO,
        }
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn type_code(mut self, code: InvoiceTypeCode) -> Self {
        self.type_code = code;
        self
    }

    pub fn currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    pub fn seller(mut self, party: Party) -> Self {
        self.seller = Some(party);
        self
    }

    pub fn buyer(mut self, party: Party) -> Self {
        self.buyer = Some(party);
        self
    }

    pub fn add_line(mut self, line: InvoiceLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Exemption reason attached to every breakdown row of `category`.
    pub fn exemption_reason(mut self, category: VatCategory, reason: impl Into<String>) -> Self {
        self.exemption_reasons.push((category, reason.into()));
        self
    }

    pub fn payment_terms(mut self, terms: PaymentTerms) -> Self {
        self.payment_terms = Some(terms);
        self
    }

    pub fn order_reference(mut self, reference: impl Into<String>) -> Self {
        self.order_reference = Some(reference.into());
        self
    }

    pub fn contract_reference(mut self, reference: impl Into<String>) -> Self {
        self.contract_reference = Some(reference.into());
        self
    }

    pub fn project_reference(mut self, reference: impl Into<String>) -> Self {
        self.project_reference = Some(reference.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn preceding_invoice(mut self, number: impl Into<String>, issue_date: Option<NaiveDate>) -> Self {
        self.preceding_invoice = Some(PrecedingInvoiceReference {
            number: number.into(),
            issue_date,
        });
        self
    }

    pub fn prepaid(mut self, amount: Decimal) -> Self {
        self.prepaid = amount;
        self
    }

    /// Build the invoice, calculating totals and running validation.
    /// Returns all validation errors (not just the first).
    pub fn build(self) -> Result<Invoice, FacturxError> {
        let seller = self
            .seller
            .ok_or_else(|| FacturxError::Builder("seller is required".into()))?;
        let buyer = self
            .buyer
            .ok_or_else(|| FacturxError::Builder("buyer is required".into()))?;

        if self.lines.is_empty() {
            return Err(FacturxError::Builder(
                "at least one invoice line is required".into(),
            ));
        }
        if self.lines.len() > 10_000 {
            return Err(FacturxError::Builder(
                "invoice cannot have more than 10,000 lines".into(),
            ));
        }

        let inputs: Vec<LineInput> = self
            .lines
            .iter()
            .map(|l| LineInput {
                quantity: l.quantity,
                unit_price: l.unit_price,
                vat_rate: l.vat_rate,
                vat_category: l.vat_category,
            })
            .collect();
        let calc = calculator::calculate(&inputs, self.currency, self.prepaid)?;

        let mut lines = self.lines;
        for (line, total) in lines.iter_mut().zip(calc.line_totals) {
            line.line_total = total;
        }

        let mut vat_breakdown = calc.vat_breakdown;
        for row in &mut vat_breakdown {
            row.exemption_reason = self
                .exemption_reasons
                .iter()
                .find(|(cat, _)| *cat == row.category)
                .map(|(_, reason)| reason.clone());
        }

        let invoice = Invoice {
            number: self.number,
            type_code: self.type_code,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: self.currency,
            seller,
            buyer,
            lines,
            vat_breakdown,
            totals: calc.totals,
            payment_terms: self.payment_terms,
            order_reference: self.order_reference,
            contract_reference: self.contract_reference,
            project_reference: self.project_reference,
            note: self.note,
            preceding_invoice: self.preceding_invoice,
        };

        let errors = validation::validate_invoice(&invoice);
        if !errors.is_empty() {
            return Err(FacturxError::from_findings(&errors));
        }

        Ok(invoice)
    }
}

/// Builder for Party (seller/buyer).
pub struct PartyBuilder {
    id: Option<String>,
    name: String,
    trading_name: Option<String>,
    address: Address,
    tax_registration: Option<TaxRegistration>,
    legal_registration: Option<LegalRegistration>,
    contact: Option<Contact>,
    electronic_address: Option<String>,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            id: None,
            name: name.into(),
            trading_name: None,
            address,
            tax_registration: None,
            legal_registration: None,
            contact: None,
            electronic_address: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn trading_name(mut self, name: impl Into<String>) -> Self {
        self.trading_name = Some(name.into());
        self
    }

    pub fn vat_number(mut self, number: impl Into<String>) -> Self {
        self.registration().vat_number = Some(number.into());
        self
    }

    pub fn tax_id(mut self, id: impl Into<String>) -> Self {
        self.registration().tax_id = Some(id.into());
        self
    }

    fn registration(&mut self) -> &mut TaxRegistration {
        self.tax_registration.get_or_insert_with(|| TaxRegistration {
            vat_number: None,
            tax_id: None,
            tax_scheme: "VAT".into(),
        })
    }

    pub fn legal_registration(mut self, registration: LegalRegistration) -> Self {
        self.legal_registration = Some(registration);
        self
    }

    pub fn contact(
        mut self,
        name: Option<String>,
        phone: Option<String>,
        email: Option<String>,
    ) -> Self {
        self.contact = Some(Contact { name, phone, email });
        self
    }

    pub fn electronic_address(mut self, address: impl Into<String>) -> Self {
        self.electronic_address = Some(address.into());
        self
    }

    pub fn build(self) -> Party {
        Party {
            id: self.id,
            name: self.name,
            trading_name: self.trading_name,
            address: self.address,
            tax_registration: self.tax_registration,
            legal_registration: self.legal_registration,
            contact: self.contact,
            electronic_address: self.electronic_address,
        }
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    street: String,
    additional_street: Option<String>,
    city: String,
    postal_code: String,
    subdivision: Option<String>,
    country: CountryCode,
}

impl AddressBuilder {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: CountryCode,
    ) -> Self {
        Self {
            street: street.into(),
            additional_street: None,
            city: city.into(),
            postal_code: postal_code.into(),
            subdivision: None,
            country,
        }
    }

    pub fn additional_street(mut self, additional: impl Into<String>) -> Self {
        self.additional_street = Some(additional.into());
        self
    }

    pub fn subdivision(mut self, subdivision: impl Into<String>) -> Self {
        self.subdivision = Some(subdivision.into());
        self
    }

    pub fn build(self) -> Address {
        Address {
            street: self.street,
            additional_street: self.additional_street,
            city: self.city,
            postal_code: self.postal_code,
            subdivision: self.subdivision,
            country: self.country,
        }
    }
}

/// Builder for InvoiceLine.
///
/// Defaults to unit `C62` and standard-rated 20 % VAT. When no explicit
/// line total is given it is computed as `quantity x unit_price`.
pub struct InvoiceLineBuilder {
    id: String,
    name: String,
    description: Option<String>,
    quantity: Decimal,
    unit_code: String,
    unit_price: Decimal,
    line_total: Option<Decimal>,
    vat_category: VatCategory,
    vat_rate: Decimal,
    classification: Option<String>,
    origin_country: Option<CountryCode>,
    currency: CurrencyCode,
}

impl InvoiceLineBuilder {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            quantity,
            unit_code: "C62".into(),
            unit_price,
            line_total: None,
            vat_category: VatCategory::Standard,
            vat_rate: dec!(20),
            classification: None,
            origin_country: None,
            currency: CurrencyCode::EUR,
        }
    }

    /// Invoice currency; line amounts are rounded to its minor units.
    pub fn currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    pub fn unit_code(mut self, code: impl Into<String>) -> Self {
        self.unit_code = code.into();
        self
    }

    pub fn vat(mut self, category: VatCategory, rate: Decimal) -> Self {
        self.vat_category = category;
        self.vat_rate = rate;
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Caller-stated total; rejected by `build` if it deviates from
    /// `quantity x unit_price`, rounded to the currency, by more than 0.01.
    pub fn line_total(mut self, total: Decimal) -> Self {
        self.line_total = Some(total);
        self
    }

    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn origin_country(mut self, country: CountryCode) -> Self {
        self.origin_country = Some(country);
        self
    }

    pub fn build(self) -> Result<InvoiceLine, FacturxError> {
        let dp = self.currency.minor_units();
        // An overflowing product is left at zero and reported by validation.
        let line_total = self
            .line_total
            .or_else(|| line_amount(self.quantity, self.unit_price, dp))
            .unwrap_or_default();
        let line = InvoiceLine {
            id: self.id,
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            unit_code: self.unit_code,
            unit_price: self.unit_price,
            line_total,
            vat_category: self.vat_category,
            vat_rate: self.vat_rate,
            classification: self.classification,
            origin_country: self.origin_country,
        };

        let errors = validation::validate_line_in(&line, self.currency);
        if !errors.is_empty() {
            return Err(FacturxError::from_findings(&errors));
        }
        Ok(line)
    }
}
