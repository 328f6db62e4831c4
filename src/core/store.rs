use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FacturxError;
use super::types::Invoice;

/// Opaque storage identifier, independent of the invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for InvoiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// In-memory invoice store.
///
/// Invoices are keyed by [`InvoiceId`]; the invoice number is a unique
/// secondary index. Listing walks insertion order, so every invoice
/// appears exactly once.
#[derive(Debug, Default)]
pub struct InvoiceStore {
    invoices: HashMap<InvoiceId, Invoice>,
    by_number: HashMap<String, InvoiceId>,
    order: Vec<InvoiceId>,
}

/// Aggregate figures over all stored invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_invoices: usize,
    /// Payable amounts summed per currency code. Amounts in different
    /// currencies are never added together.
    pub currency_breakdown: BTreeMap<String, Decimal>,
}

impl InvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an invoice; a number that is already present is rejected.
    pub fn insert(&mut self, invoice: Invoice) -> Result<InvoiceId, FacturxError> {
        if self.by_number.contains_key(&invoice.number) {
            return Err(FacturxError::Validation(format!(
                "invoice number '{}' already exists",
                invoice.number
            )));
        }
        let id = InvoiceId::new();
        self.by_number.insert(invoice.number.clone(), id);
        self.invoices.insert(id, invoice);
        self.order.push(id);
        Ok(id)
    }

    pub fn get(&self, id: InvoiceId) -> Result<&Invoice, FacturxError> {
        self.invoices.get(&id).ok_or_else(|| FacturxError::NotFound {
            resource: "invoice",
            id: id.to_string(),
        })
    }

    pub fn get_by_number(&self, number: &str) -> Result<&Invoice, FacturxError> {
        self.by_number
            .get(number)
            .and_then(|id| self.invoices.get(id))
            .ok_or_else(|| FacturxError::NotFound {
                resource: "invoice",
                id: number.to_string(),
            })
    }

    /// Look up by storage id first, then by invoice number.
    pub fn resolve(&self, id_or_number: &str) -> Result<&Invoice, FacturxError> {
        if let Ok(id) = id_or_number.parse::<InvoiceId>() {
            if let Some(inv) = self.invoices.get(&id) {
                return Ok(inv);
            }
        }
        self.get_by_number(id_or_number)
    }

    /// Page through invoices in insertion order, optionally keeping only
    /// buyers whose name contains `buyer_filter` (case-insensitive).
    pub fn list(&self, limit: usize, offset: usize, buyer_filter: Option<&str>) -> Vec<&Invoice> {
        let needle = buyer_filter.map(str::to_lowercase);
        self.order
            .iter()
            .filter_map(|id| self.invoices.get(id))
            .filter(|inv| match &needle {
                Some(n) => inv.buyer.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .skip(offset)
            .take(limit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn statistics(&self) -> StoreStatistics {
        let mut currency_breakdown = BTreeMap::new();
        for inv in self.invoices.values() {
            let sum = currency_breakdown
                .entry(inv.currency.as_str().to_string())
                .or_insert(Decimal::ZERO);
            *sum = sum.saturating_add(inv.totals.payable_amount);
        }
        StoreStatistics {
            total_invoices: self.invoices.len(),
            currency_breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BusinessConfiguration, CurrencyCode, create_invoice, sample_request};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice(number: &str, buyer: &str) -> Invoice {
        let mut req = sample_request();
        req.buyer.name = buyer.into();
        create_invoice(
            &req,
            &BusinessConfiguration::default(),
            number,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn insert_and_lookup_both_keys() {
        let mut store = InvoiceStore::new();
        let id = store.insert(invoice("FX-1", "ACME")).unwrap();

        assert_eq!(store.get(id).unwrap().number, "FX-1");
        assert_eq!(store.get_by_number("FX-1").unwrap().number, "FX-1");
        assert_eq!(store.resolve(&id.to_string()).unwrap().number, "FX-1");
        assert_eq!(store.resolve("FX-1").unwrap().number, "FX-1");
    }

    #[test]
    fn duplicate_number_rejected() {
        let mut store = InvoiceStore::new();
        store.insert(invoice("FX-1", "ACME")).unwrap();
        assert!(store.insert(invoice("FX-1", "Other")).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_is_not_found() {
        let store = InvoiceStore::new();
        let err = store.resolve("FX-404").unwrap_err();
        assert!(matches!(err, FacturxError::NotFound { .. }));
        assert!(matches!(
            store.get(InvoiceId::new()),
            Err(FacturxError::NotFound { .. })
        ));
    }

    #[test]
    fn list_has_no_duplicates_and_paginates() {
        let mut store = InvoiceStore::new();
        for (n, buyer) in [("A", "ACME"), ("B", "Globex"), ("C", "acme labs")] {
            store.insert(invoice(n, buyer)).unwrap();
        }
        let all: Vec<_> = store.list(10, 0, None).iter().map(|i| i.number.clone()).collect();
        assert_eq!(all, ["A", "B", "C"]);

        let page: Vec<_> = store.list(1, 1, None).iter().map(|i| i.number.clone()).collect();
        assert_eq!(page, ["B"]);

        let acme: Vec<_> = store
            .list(10, 0, Some("ACME"))
            .iter()
            .map(|i| i.number.clone())
            .collect();
        assert_eq!(acme, ["A", "C"]);
    }

    #[test]
    fn statistics_per_currency() {
        let mut store = InvoiceStore::new();
        store.insert(invoice("A", "ACME")).unwrap();
        store.insert(invoice("B", "ACME")).unwrap();
        let stats = store.statistics();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.currency_breakdown.get("EUR"), Some(&dec!(14880.00)));
    }

    #[test]
    fn statistics_keep_currencies_apart() {
        let mut request = sample_request();
        request.currency = Some(CurrencyCode::new("USD").unwrap());
        let dollars = create_invoice(
            &request,
            &BusinessConfiguration::default(),
            "US-1",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
        .unwrap();

        let mut store = InvoiceStore::new();
        store.insert(invoice("A", "ACME")).unwrap();
        store.insert(dollars).unwrap();
        let stats = store.statistics();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.currency_breakdown.len(), 2);
        assert_eq!(stats.currency_breakdown["EUR"], dec!(7440.00));
        assert_eq!(stats.currency_breakdown["USD"], dec!(7440.00));
    }
}
