//! ISO 4217 currency codes.
//!
//! Covers the major world currencies relevant to European e-invoicing
//! (EN 16931), together with their minor-unit precision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use super::error::FacturxError;

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search_by(|(c, _)| c.cmp(&code)).is_ok()
}

/// A validated ISO 4217 currency code (BT-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct CurrencyCode {
    code: &'static str,
    minor_units: u32,
}

impl CurrencyCode {
    pub const EUR: Self = Self {
        code: "EUR",
        minor_units: 2,
    };

    pub fn new(code: &str) -> Result<Self, FacturxError> {
        CURRENCY_CODES
            .binary_search_by(|(c, _)| c.cmp(&code))
            .map(|i| {
                let (code, minor_units) = CURRENCY_CODES[i];
                Self { code, minor_units }
            })
            .map_err(|_| {
                FacturxError::Validation(format!(
                    "currency code '{code}' is not a known ISO 4217 code"
                ))
            })
    }

    pub fn as_str(&self) -> &'static str {
        self.code
    }

    /// Number of decimal places amounts are rounded to (2 for EUR, 0 for JPY).
    pub fn minor_units(&self) -> u32 {
        self.minor_units
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::EUR
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl FromStr for CurrencyCode {
    type Err = FacturxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::new(&code).map_err(de::Error::custom)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.code.to_string()
    }
}

/// Sorted list of common ISO 4217 currency codes with their minor units.
/// Sorted for binary search.
static CURRENCY_CODES: &[(&str, u32)] = &[
    ("AED", 2), // UAE Dirham
    ("AMD", 2), // Armenian Dram
    ("AUD", 2), // Australian Dollar
    ("BGN", 2), // Bulgarian Lev
    ("BRL", 2), // Brazilian Real
    ("CAD", 2), // Canadian Dollar
    ("CHF", 2), // Swiss Franc
    ("CNY", 2), // Chinese Yuan
    ("CZK", 2), // Czech Koruna
    ("DKK", 2), // Danish Krone
    ("EGP", 2), // Egyptian Pound
    ("EUR", 2), // Euro
    ("GBP", 2), // Pound Sterling
    ("GEL", 2), // Georgian Lari
    ("HKD", 2), // Hong Kong Dollar
    ("HUF", 2), // Hungarian Forint
    ("IDR", 2), // Indonesian Rupiah
    ("ILS", 2), // Israeli Shekel
    ("INR", 2), // Indian Rupee
    ("ISK", 0), // Icelandic Krona
    ("JPY", 0), // Japanese Yen
    ("KES", 2), // Kenyan Shilling
    ("KRW", 0), // South Korean Won
    ("KZT", 2), // Kazakhstani Tenge
    ("MAD", 2), // Moroccan Dirham
    ("MXN", 2), // Mexican Peso
    ("MYR", 2), // Malaysian Ringgit
    ("NGN", 2), // Nigerian Naira
    ("NOK", 2), // Norwegian Krone
    ("NZD", 2), // New Zealand Dollar
    ("PHP", 2), // Philippine Peso
    ("PLN", 2), // Polish Zloty
    ("RON", 2), // Romanian Leu
    ("RSD", 2), // Serbian Dinar
    ("SAR", 2), // Saudi Riyal
    ("SEK", 2), // Swedish Krona
    ("SGD", 2), // Singapore Dollar
    ("THB", 2), // Thai Baht
    ("TND", 3), // Tunisian Dinar
    ("TRY", 2), // Turkish Lira
    ("TWD", 2), // New Taiwan Dollar
    ("UAH", 2), // Ukrainian Hryvnia
    ("USD", 2), // US Dollar
    ("VND", 0), // Vietnamese Dong
    ("XOF", 0), // West African CFA Franc
    ("ZAR", 2), // South African Rand
];
