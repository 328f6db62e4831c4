//! ISO 3166-1 alpha-2 country codes.
//!
//! [`CountryCode`] can only be constructed from a currently assigned code,
//! so every address and origin country in an invoice is known-good.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use super::error::FacturxError;

/// Check whether `code` is a known ISO 3166-1 alpha-2 country code.
pub fn is_known_country_code(code: &str) -> bool {
    COUNTRY_CODES.binary_search(&code).is_ok()
}

/// A validated ISO 3166-1 alpha-2 country code (BT-40 / BT-55).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct CountryCode(&'static str);

impl CountryCode {
    pub const FR: Self = Self("FR");
    pub const DE: Self = Self("DE");

    /// Look up a code; unknown or lower-case codes are rejected.
    pub fn new(code: &str) -> Result<Self, FacturxError> {
        COUNTRY_CODES
            .binary_search(&code)
            .map(|i| Self(COUNTRY_CODES[i]))
            .map_err(|_| {
                FacturxError::Validation(format!(
                    "country code '{code}' is not a known ISO 3166-1 alpha-2 code"
                ))
            })
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for CountryCode {
    type Err = FacturxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::new(&code).map_err(de::Error::custom)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0.to_string()
    }
}

/// Complete list of ISO 3166-1 alpha-2 country codes (249 entries).
/// Sorted for binary search.
static COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_countries() {
        for code in ["FR", "DE", "BE", "LU", "CH", "US", "JP"] {
            assert!(is_known_country_code(code), "{code}");
            assert_eq!(CountryCode::new(code).unwrap().as_str(), code);
        }
    }

    #[test]
    fn unknown_countries_rejected() {
        assert!(CountryCode::new("XX").is_err());
        assert!(CountryCode::new("").is_err());
        assert!(CountryCode::new("FRA").is_err());
        assert!(CountryCode::new("fr").is_err());
    }

    #[test]
    fn serde_uses_wire_code() {
        let fr: CountryCode = serde_json::from_str("\"FR\"").unwrap();
        assert_eq!(serde_json::to_string(&fr).unwrap(), "\"FR\"");
        assert!(serde_json::from_str::<CountryCode>("\"ZZ\"").is_err());
    }

    #[test]
    fn deserializes_from_owned_input() {
        let json = String::from(r#"{"code": "BE"}"#);
        #[derive(Deserialize)]
        struct Holder {
            code: CountryCode,
        }
        let holder: Holder = serde_json::from_reader(json.as_bytes()).unwrap();
        assert_eq!(holder.code.as_str(), "BE");
        let err = serde_json::from_str::<Holder>(r#"{"code": "be"}"#).err().unwrap();
        assert!(err.to_string().contains("not a known ISO 3166-1"));
    }

    #[test]
    fn list_is_sorted() {
        for window in COUNTRY_CODES.windows(2) {
            assert!(
                window[0] < window[1],
                "country codes not sorted: {} >= {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn list_count() {
        assert_eq!(COUNTRY_CODES.len(), 249);
    }
}
