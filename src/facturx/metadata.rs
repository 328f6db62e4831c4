use serde::{Deserialize, Serialize};

use crate::core::BusinessConfiguration;

/// Document information written to the PDF Info dictionary and the XMP packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub title: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub keywords: String,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: "Factur-X Invoice".into(),
            subject: "Electronic Invoice compliant with EN 16931".into(),
            creator: "Factur-X API".into(),
            producer: "Factur-X API".into(),
            keywords: "Factur-X, EN 16931, Electronic Invoice".into(),
        }
    }
}

impl DocumentMetadata {
    /// Defaults with the issuing company as creator.
    pub fn for_business(config: &BusinessConfiguration) -> Self {
        Self {
            creator: config.company_name.clone(),
            ..Self::default()
        }
    }

    /// Title naming a specific invoice number.
    pub fn with_invoice_number(mut self, number: &str) -> Self {
        self.title = format!("Factur-X Invoice {number}");
        self
    }
}
