use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::countries::CountryCode;
use super::currencies::CurrencyCode;
use super::error::FacturxError;
use super::numbering::InvoiceNumberSequence;
use super::types::*;

/// The issuing company's profile, passed explicitly into every
/// invoice-assembly call.
///
/// Invoices copy what they need out of it; changing a configuration
/// never alters an invoice that was already built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfiguration {
    pub company_name: String,
    pub trading_name: Option<String>,
    pub legal_form: Option<String>,
    /// French company register number.
    pub siren: Option<String>,
    /// French establishment number, used as the seller's legal id.
    pub siret: Option<String>,
    pub legal_address: Address,
    pub tax_registration: TaxRegistration,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub bank_account: BankAccount,
    pub default_currency: CurrencyCode,
    pub vat_rates: BTreeMap<String, Decimal>,
    /// `{year}` / `{seq:0N}` template, see [`InvoiceNumberSequence`].
    pub invoice_number_format: String,
    pub starting_sequence: u64,
    pub default_payment_terms: String,
    pub payment_due_days: u32,
}

impl Default for BusinessConfiguration {
    fn default() -> Self {
        Self {
            company_name: "Factur-X Express SAS".into(),
            trading_name: Some("FX Express".into()),
            legal_form: Some("Société par Actions Simplifiée (SAS)".into()),
            siren: Some("123456789".into()),
            siret: Some("12345678900012".into()),
            legal_address: Address {
                street: "42 Avenue des Champs-Élysées".into(),
                additional_street: None,
                city: "Paris".into(),
                postal_code: "75008".into(),
                subdivision: None,
                country: CountryCode::FR,
            },
            tax_registration: TaxRegistration {
                vat_number: Some("FR12345678901".into()),
                tax_id: Some("FR12345678901".into()),
                tax_scheme: "VAT".into(),
            },
            phone: Some("+33 1 42 65 00 00".into()),
            email: Some("contact@facturx-express.fr".into()),
            website: Some("https://facturx-express.fr".into()),
            bank_account: BankAccount {
                iban: Some("FR1420041010050500013M02606".into()),
                bic: Some("PSSTFRPPPAR".into()),
                account_name: Some("Factur-X Express SAS".into()),
                bank_name: Some("La Banque Postale".into()),
            },
            default_currency: CurrencyCode::EUR,
            vat_rates: BTreeMap::from([
                ("standard".to_string(), dec!(20.0)),
                ("reduced".to_string(), dec!(10.0)),
                ("super_reduced".to_string(), dec!(5.5)),
                ("zero".to_string(), dec!(0.0)),
            ]),
            invoice_number_format: "FX-{year}-{seq:06}".into(),
            starting_sequence: 1,
            default_payment_terms: "Net 30 days".into(),
            payment_due_days: 30,
        }
    }
}

impl BusinessConfiguration {
    /// An owned seller party built from the profile.
    pub fn seller_party(&self) -> Party {
        let contact = Contact {
            name: None,
            phone: self.phone.clone(),
            email: self.email.clone(),
        };
        Party {
            id: None,
            name: self.company_name.clone(),
            trading_name: self.trading_name.clone(),
            address: self.legal_address.clone(),
            tax_registration: Some(self.tax_registration.clone()),
            legal_registration: Some(LegalRegistration {
                registration_name: Some(self.company_name.clone()),
                company_id: self.siret.clone(),
                legal_form: self.legal_form.clone(),
            }),
            contact: (!contact.is_empty()).then_some(contact),
            electronic_address: None,
        }
    }

    /// Bank transfer to the configured account, with the default terms text.
    pub fn default_payment_terms(&self, due_date: Option<NaiveDate>) -> PaymentTerms {
        PaymentTerms {
            means: PaymentMeansCode::BankTransfer,
            description: Some(self.default_payment_terms.clone()),
            due_date,
            payment_reference: None,
            bank_account: Some(self.bank_account.clone()),
        }
    }

    /// A number sequence for `year` following the configured template.
    pub fn number_sequence(&self, year: i32) -> Result<InvoiceNumberSequence, FacturxError> {
        InvoiceNumberSequence::starting_at(&self.invoice_number_format, year, self.starting_sequence)
    }

    /// Look up a named VAT rate ("standard", "reduced", ...).
    pub fn vat_rate(&self, name: &str) -> Option<Decimal> {
        self.vat_rates.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_profile() {
        let config = BusinessConfiguration::default();
        assert_eq!(config.company_name, "Factur-X Express SAS");
        assert_eq!(config.legal_address.country.as_str(), "FR");
        assert_eq!(config.vat_rate("super_reduced"), Some(dec!(5.5)));
        assert_eq!(config.vat_rate("unknown"), None);
    }

    #[test]
    fn seller_party_is_an_owned_copy() {
        let mut config = BusinessConfiguration::default();
        let seller = config.seller_party();
        config.company_name = "Renamed SAS".into();

        assert_eq!(seller.name, "Factur-X Express SAS");
        assert_eq!(seller.vat_number(), Some("FR12345678901"));
        let legal = seller.legal_registration.unwrap();
        assert_eq!(legal.company_id.as_deref(), Some("12345678900012"));
        assert_eq!(
            seller.contact.unwrap().email.as_deref(),
            Some("contact@facturx-express.fr")
        );
    }

    #[test]
    fn number_sequence_from_template() {
        let config = BusinessConfiguration::default();
        let mut seq = config.number_sequence(2024).unwrap();
        assert_eq!(seq.next_number(), "FX-2024-000001");
    }

    #[test]
    fn partial_deserialization_keeps_defaults() {
        let config: BusinessConfiguration =
            serde_json::from_str(r#"{"company_name":"Other SARL","payment_due_days":45}"#).unwrap();
        assert_eq!(config.company_name, "Other SARL");
        assert_eq!(config.payment_due_days, 45);
        assert_eq!(config.siret.as_deref(), Some("12345678900012"));
    }
}
