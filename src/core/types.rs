use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::countries::CountryCode;
use super::currencies::CurrencyCode;
use super::error::FacturxError;

/// BG-0: Invoice: the aggregate root.
///
/// Built once through [`InvoiceBuilder`](super::InvoiceBuilder) or
/// [`create_invoice`](super::create_invoice); regenerating an invoice
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// BT-1: Invoice number (unique business key).
    pub number: String,
    /// BT-3: Invoice type code (UNTDID 1001).
    pub type_code: InvoiceTypeCode,
    /// BT-2: Invoice issue date.
    pub issue_date: NaiveDate,
    /// BT-9: Payment due date.
    pub due_date: Option<NaiveDate>,
    /// BT-5: Invoice currency code.
    pub currency: CurrencyCode,
    /// BG-4: Seller.
    pub seller: Party,
    /// BG-7: Buyer.
    pub buyer: Party,
    /// BG-25: Invoice lines, in caller order.
    pub lines: Vec<InvoiceLine>,
    /// BG-23: VAT breakdown, one row per (rate, category).
    pub vat_breakdown: Vec<VatBreakdown>,
    /// BG-22: Document totals.
    pub totals: InvoiceTotals,
    /// BG-16 / BT-20: Payment terms and instructions.
    pub payment_terms: Option<PaymentTerms>,
    /// BT-13: Purchase order reference.
    pub order_reference: Option<String>,
    /// BT-12: Contract reference.
    pub contract_reference: Option<String>,
    /// BT-11: Project reference.
    pub project_reference: Option<String>,
    /// BT-22: Free-text note.
    pub note: Option<String>,
    /// BG-3: Preceding invoice reference.
    pub preceding_invoice: Option<PrecedingInvoiceReference>,
}

/// BG-4 / BG-7: Party (seller or buyer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// BT-29 / BT-46: Party identifier. Encoders synthesize one when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// BT-27 / BT-44: Name.
    pub name: String,
    /// BT-28 / BT-45: Trading name.
    #[serde(default)]
    pub trading_name: Option<String>,
    /// BG-5 / BG-8: Postal address.
    pub address: Address,
    #[serde(default)]
    pub tax_registration: Option<TaxRegistration>,
    #[serde(default)]
    pub legal_registration: Option<LegalRegistration>,
    /// BG-6 / BG-9: Contact information.
    #[serde(default)]
    pub contact: Option<Contact>,
    /// BT-34 / BT-49: Electronic address.
    #[serde(default)]
    pub electronic_address: Option<String>,
}

impl Party {
    pub fn vat_number(&self) -> Option<&str> {
        self.tax_registration
            .as_ref()
            .and_then(|t| t.vat_number.as_deref())
    }
}

/// BG-5 / BG-8: Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// BT-35 / BT-50: Street + house number.
    pub street: String,
    /// BT-36 / BT-51: Additional address line.
    #[serde(default)]
    pub additional_street: Option<String>,
    /// BT-37 / BT-52: City.
    pub city: String,
    /// BT-38 / BT-53: Postal code.
    pub postal_code: String,
    /// BT-39 / BT-54: Country subdivision.
    #[serde(default)]
    pub subdivision: Option<String>,
    /// BT-40 / BT-55: Country code.
    pub country: CountryCode,
}

/// BT-31 / BT-32 / BT-48: Tax registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRegistration {
    pub vat_number: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default = "default_tax_scheme")]
    pub tax_scheme: String,
}

fn default_tax_scheme() -> String {
    "VAT".to_string()
}

impl TaxRegistration {
    pub fn vat(number: impl Into<String>) -> Self {
        Self {
            vat_number: Some(number.into()),
            tax_id: None,
            tax_scheme: default_tax_scheme(),
        }
    }
}

/// BT-30: Statutory identifiers of a legal entity (SIREN/SIRET and the like).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalRegistration {
    pub registration_name: Option<String>,
    pub company_id: Option<String>,
    pub legal_form: Option<String>,
}

/// BG-6 / BG-9: Contact information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// BT-41 / BT-56: Contact point name.
    pub name: Option<String>,
    /// BT-42 / BT-57: Telephone.
    pub phone: Option<String>,
    /// BT-43 / BT-58: Email.
    pub email: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none()
    }
}

/// BG-17: Bank account for credit transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// BT-84: IBAN.
    pub iban: Option<String>,
    /// BT-86: BIC.
    pub bic: Option<String>,
    /// BT-85: Account name.
    pub account_name: Option<String>,
    pub bank_name: Option<String>,
}

/// BG-16 / BT-20: Payment terms and instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    /// BT-81: Payment means type code.
    pub means: PaymentMeansCode,
    /// BT-20: Payment terms free text.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// BT-83: Remittance information.
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub bank_account: Option<BankAccount>,
}

/// BG-25: Invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// BT-126: Line identifier, unique within the invoice.
    pub id: String,
    /// BT-153: Item name.
    pub name: String,
    /// BT-154: Item description.
    pub description: Option<String>,
    /// BT-129: Invoiced quantity (> 0).
    pub quantity: Decimal,
    /// BT-130: Unit of measure (UNECE Rec 20, "C62" = one).
    pub unit_code: String,
    /// BT-146: Item net price (>= 0).
    pub unit_price: Decimal,
    /// BT-131: Line net amount, quantity x unit price.
    pub line_total: Decimal,
    /// BT-151: VAT category.
    pub vat_category: VatCategory,
    /// BT-152: VAT rate percentage (0..=100).
    pub vat_rate: Decimal,
    /// BT-158: Item classification.
    pub classification: Option<String>,
    /// BT-159: Item country of origin.
    pub origin_country: Option<CountryCode>,
}

/// BG-23: VAT breakdown per (rate, category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatBreakdown {
    /// BT-118
    pub category: VatCategory,
    /// BT-119
    pub rate: Decimal,
    /// BT-116
    pub taxable_amount: Decimal,
    /// BT-117
    pub vat_amount: Decimal,
    /// BT-120
    pub exemption_reason: Option<String>,
}

/// BG-22: Document totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// BT-106: Sum of line net amounts.
    pub line_total_amount: Decimal,
    /// BT-107
    pub allowance_total_amount: Decimal,
    /// BT-108
    pub charge_total_amount: Decimal,
    /// BT-109: line total - allowances + charges.
    pub tax_exclusive_amount: Decimal,
    /// BT-110
    pub tax_total_amount: Decimal,
    /// BT-112: tax exclusive + tax total.
    pub tax_inclusive_amount: Decimal,
    /// BT-113
    pub prepaid_amount: Decimal,
    /// BT-115: tax inclusive - prepaid.
    pub payable_amount: Decimal,
}

impl InvoiceTotals {
    /// Derive the dependent totals from their inputs. Callers check the
    /// amount range first.
    pub(crate) fn derive(
        line_total_amount: Decimal,
        allowance_total_amount: Decimal,
        charge_total_amount: Decimal,
        tax_total_amount: Decimal,
        prepaid_amount: Decimal,
    ) -> Self {
        let tax_exclusive_amount =
            line_total_amount - allowance_total_amount + charge_total_amount;
        let tax_inclusive_amount = tax_exclusive_amount + tax_total_amount;
        Self {
            line_total_amount,
            allowance_total_amount,
            charge_total_amount,
            tax_exclusive_amount,
            tax_total_amount,
            tax_inclusive_amount,
            prepaid_amount,
            payable_amount: tax_inclusive_amount - prepaid_amount,
        }
    }
}

/// BG-3: Reference to the invoice a credit note or correction refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedingInvoiceReference {
    /// BT-25
    pub number: String,
    /// BT-26
    pub issue_date: Option<NaiveDate>,
}

/// UNTDID 5305: VAT category codes used by EN 16931.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VatCategory {
    /// S: Standard rate.
    Standard,
    /// Z: Zero rated.
    ZeroRated,
    /// E: Exempt from tax.
    Exempt,
    /// AE: Reverse charge.
    ReverseCharge,
    /// AA: Reduced rate.
    Reduced,
    /// AB: Super-reduced rate.
    SuperReduced,
}

impl VatCategory {
    /// UNTDID 5305 code letter.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Standard => "S",
            Self::ZeroRated => "Z",
            Self::Exempt => "E",
            Self::ReverseCharge => "AE",
            Self::Reduced => "AA",
            Self::SuperReduced => "AB",
        }
    }

    /// Parse from UNTDID 5305 code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::Standard),
            "Z" => Some(Self::ZeroRated),
            "E" => Some(Self::Exempt),
            "AE" => Some(Self::ReverseCharge),
            "AA" => Some(Self::Reduced),
            "AB" => Some(Self::SuperReduced),
            _ => None,
        }
    }

    /// Categories that carry no VAT and typically state an exemption reason.
    pub fn is_exempt_like(&self) -> bool {
        matches!(self, Self::Exempt | Self::ReverseCharge)
    }
}

impl fmt::Display for VatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for VatCategory {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
            .ok_or_else(|| FacturxError::Validation(format!("unknown VAT category '{value}'")))
    }
}

impl From<VatCategory> for String {
    fn from(category: VatCategory) -> Self {
        category.code().to_string()
    }
}

/// UNTDID 1001: Invoice type codes supported by Factur-X.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InvoiceTypeCode {
    /// 380: Commercial invoice.
    #[default]
    Commercial,
    /// 381: Credit note.
    CreditNote,
    /// 383: Debit note.
    DebitNote,
    /// 384: Corrected invoice.
    Corrective,
}

impl InvoiceTypeCode {
    /// UNTDID 1001 numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Commercial => 380,
            Self::CreditNote => 381,
            Self::DebitNote => 383,
            Self::Corrective => 384,
        }
    }

    /// Parse from UNTDID 1001 numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            380 => Some(Self::Commercial),
            381 => Some(Self::CreditNote),
            383 => Some(Self::DebitNote),
            384 => Some(Self::Corrective),
            _ => None,
        }
    }
}

impl TryFrom<String> for InvoiceTypeCode {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u16>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| FacturxError::Validation(format!("unknown invoice type code '{value}'")))
    }
}

impl From<InvoiceTypeCode> for String {
    fn from(code: InvoiceTypeCode) -> Self {
        code.code().to_string()
    }
}

/// UNTDID 4461: Payment means codes accepted on an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMeansCode {
    /// 30: Credit transfer.
    #[default]
    BankTransfer,
    /// 49: Direct debit.
    DirectDebit,
    /// 54: Credit card.
    CreditCard,
    /// 10: Cash.
    Cash,
    /// 20: Cheque.
    Cheque,
}

impl PaymentMeansCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::BankTransfer => 30,
            Self::DirectDebit => 49,
            Self::CreditCard => 54,
            Self::Cash => 10,
            Self::Cheque => 20,
        }
    }

    /// Parse from UNTDID 4461 numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            30 => Some(Self::BankTransfer),
            49 => Some(Self::DirectDebit),
            54 => Some(Self::CreditCard),
            10 => Some(Self::Cash),
            20 => Some(Self::Cheque),
            _ => None,
        }
    }
}

impl FromStr for PaymentMeansCode {
    type Err = FacturxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| FacturxError::Validation(format!("unknown payment means code '{s}'")))
    }
}

impl TryFrom<String> for PaymentMeansCode {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentMeansCode> for String {
    fn from(code: PaymentMeansCode) -> Self {
        code.code().to_string()
    }
}
