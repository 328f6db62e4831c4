use rust_decimal::Decimal;
use tracing::debug;

use super::cii_ns;
use super::level::ConformanceLevel;
use super::xml_utils::{XmlWriter, format_decimal};
use crate::core::{FacturxError, Invoice, InvoiceLine, Party, PaymentTerms};

/// Serialize an invoice to CII XML declaring the Basic profile.
pub fn to_cii_xml(invoice: &Invoice) -> Result<String, FacturxError> {
    to_cii_xml_with_level(invoice, ConformanceLevel::Basic)
}

/// Serialize an invoice to CII XML declaring `level`.
///
/// Output is deterministic: the same invoice and level always yield the
/// same bytes.
pub fn to_cii_xml_with_level(
    invoice: &Invoice,
    level: ConformanceLevel,
) -> Result<String, FacturxError> {
    let cur = invoice.currency.as_str();
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "rsm:CrossIndustryInvoice",
        &[
            ("xmlns:rsm", cii_ns::RSM),
            ("xmlns:qdt", cii_ns::QDT),
            ("xmlns:ram", cii_ns::RAM),
            ("xmlns:xs", cii_ns::XS),
            ("xmlns:udt", cii_ns::UDT),
        ],
    )?;

    w.start_element("rsm:ExchangedDocumentContext")?;
    w.start_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
    w.text_element("ram:ID", "A1")?;
    w.end_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
    w.start_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.text_element("ram:ID", level.guideline_id())?;
    w.end_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.end_element("rsm:ExchangedDocumentContext")?;

    w.start_element("rsm:ExchangedDocument")?;
    w.text_element("ram:ID", &invoice.number)?;
    w.text_element("ram:TypeCode", &invoice.type_code.code().to_string())?;
    w.date_element("ram:IssueDateTime", invoice.issue_date, "udt")?;
    write_note(&mut w, "Commercial Invoice")?;
    if let Some(note) = &invoice.note {
        write_note(&mut w, note)?;
    }
    w.end_element("rsm:ExchangedDocument")?;

    w.start_element("rsm:SupplyChainTradeTransaction")?;
    for line in &invoice.lines {
        write_line(&mut w, line, cur)?;
    }
    write_agreement(&mut w, invoice)?;

    w.start_element("ram:ApplicableHeaderTradeDelivery")?;
    w.start_element("ram:ActualDeliverySupplyChainEvent")?;
    w.date_element("ram:OccurrenceDateTime", invoice.issue_date, "udt")?;
    w.end_element("ram:ActualDeliverySupplyChainEvent")?;
    w.end_element("ram:ApplicableHeaderTradeDelivery")?;

    write_settlement(&mut w, invoice, cur)?;
    w.end_element("rsm:SupplyChainTradeTransaction")?;
    w.end_element("rsm:CrossIndustryInvoice")?;

    let xml = w.into_string()?;
    debug!(
        number = %invoice.number,
        level = %level,
        lines = invoice.lines.len(),
        bytes = xml.len(),
        "encoded CII XML"
    );
    Ok(xml)
}

fn write_note(w: &mut XmlWriter, content: &str) -> Result<(), FacturxError> {
    w.start_element("ram:IncludedNote")?;
    w.text_element("ram:Content", content)?;
    w.end_element("ram:IncludedNote")?;
    Ok(())
}

fn write_line(w: &mut XmlWriter, line: &InvoiceLine, cur: &str) -> Result<(), FacturxError> {
    w.start_element("ram:IncludedSupplyChainTradeLineItem")?;

    w.start_element("ram:AssociatedDocumentLineDocument")?;
    w.text_element("ram:LineID", &line.id)?;
    w.end_element("ram:AssociatedDocumentLineDocument")?;

    w.start_element("ram:SpecifiedTradeProduct")?;
    w.text_element("ram:Name", &line.name)?;
    if let Some(desc) = &line.description {
        w.text_element("ram:Description", desc)?;
    }
    if let Some(class) = &line.classification {
        w.start_element("ram:DesignatedProductClassification")?;
        w.text_element("ram:ClassCode", class)?;
        w.end_element("ram:DesignatedProductClassification")?;
    }
    if let Some(origin) = line.origin_country {
        w.start_element("ram:OriginTradeCountry")?;
        w.text_element("ram:ID", origin.as_str())?;
        w.end_element("ram:OriginTradeCountry")?;
    }
    w.end_element("ram:SpecifiedTradeProduct")?;

    w.start_element("ram:SpecifiedLineTradeAgreement")?;
    w.start_element("ram:NetPriceProductTradePrice")?;
    w.amount_element("ram:ChargeAmount", line.unit_price, cur)?;
    w.end_element("ram:NetPriceProductTradePrice")?;
    w.end_element("ram:SpecifiedLineTradeAgreement")?;

    w.start_element("ram:SpecifiedLineTradeDelivery")?;
    w.quantity_element("ram:BilledQuantity", line.quantity, &line.unit_code)?;
    w.end_element("ram:SpecifiedLineTradeDelivery")?;

    w.start_element("ram:SpecifiedLineTradeSettlement")?;
    w.start_element("ram:ApplicableTradeTax")?;
    w.text_element("ram:TypeCode", "VAT")?;
    w.text_element("ram:CategoryCode", line.vat_category.code())?;
    w.text_element(
        "ram:RateApplicablePercent",
        &format_decimal(line.vat_rate),
    )?;
    w.end_element("ram:ApplicableTradeTax")?;
    w.start_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.amount_element("ram:LineTotalAmount", line.line_total, cur)?;
    w.end_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.end_element("ram:SpecifiedLineTradeSettlement")?;

    w.end_element("ram:IncludedSupplyChainTradeLineItem")?;
    Ok(())
}

fn write_agreement(w: &mut XmlWriter, invoice: &Invoice) -> Result<(), FacturxError> {
    w.start_element("ram:ApplicableHeaderTradeAgreement")?;
    if let Some(order_ref) = &invoice.order_reference {
        w.text_element("ram:BuyerReference", order_ref)?;
    }
    write_party(w, "ram:SellerTradeParty", &invoice.seller, "SELLER")?;
    write_party(w, "ram:BuyerTradeParty", &invoice.buyer, "BUYER")?;
    if let Some(contract) = &invoice.contract_reference {
        w.start_element("ram:ContractReferencedDocument")?;
        w.text_element("ram:IssuerAssignedID", contract)?;
        w.end_element("ram:ContractReferencedDocument")?;
    }
    if let Some(project) = &invoice.project_reference {
        w.start_element("ram:SpecifiedProcuringProject")?;
        w.text_element("ram:ID", project)?;
        w.text_element("ram:Name", project)?;
        w.end_element("ram:SpecifiedProcuringProject")?;
    }
    w.end_element("ram:ApplicableHeaderTradeAgreement")?;
    Ok(())
}

/// Trade party in CII schema order: ID, Name, SpecifiedLegalOrganization,
/// DefinedTradeContact, PostalTradeAddress, URIUniversalCommunication,
/// SpecifiedTaxRegistration.
fn write_party(
    w: &mut XmlWriter,
    tag: &str,
    party: &Party,
    role: &str,
) -> Result<(), FacturxError> {
    w.start_element(tag)?;
    let id = party.id.clone().unwrap_or_else(|| format!("{role}_001"));
    w.text_element("ram:ID", &id)?;
    w.text_element("ram:Name", &party.name)?;

    let company_id = party
        .legal_registration
        .as_ref()
        .and_then(|l| l.company_id.as_deref());
    if company_id.is_some() || party.trading_name.is_some() {
        w.start_element("ram:SpecifiedLegalOrganization")?;
        if let Some(cid) = company_id {
            w.text_element("ram:ID", cid)?;
        }
        if let Some(tn) = &party.trading_name {
            w.text_element("ram:TradingBusinessName", tn)?;
        }
        w.end_element("ram:SpecifiedLegalOrganization")?;
    }

    if let Some(contact) = party.contact.as_ref().filter(|c| !c.is_empty()) {
        w.start_element("ram:DefinedTradeContact")?;
        if let Some(name) = &contact.name {
            w.text_element("ram:PersonName", name)?;
        }
        if let Some(phone) = &contact.phone {
            w.start_element("ram:TelephoneUniversalCommunication")?;
            w.text_element("ram:CompleteNumber", phone)?;
            w.end_element("ram:TelephoneUniversalCommunication")?;
        }
        if let Some(email) = &contact.email {
            w.start_element("ram:EmailURIUniversalCommunication")?;
            w.text_element("ram:URIID", email)?;
            w.end_element("ram:EmailURIUniversalCommunication")?;
        }
        w.end_element("ram:DefinedTradeContact")?;
    }

    w.start_element("ram:PostalTradeAddress")?;
    w.text_element("ram:PostcodeCode", &party.address.postal_code)?;
    w.text_element("ram:LineOne", &party.address.street)?;
    w.text_element("ram:CityName", &party.address.city)?;
    w.text_element("ram:CountryID", party.address.country.as_str())?;
    w.end_element("ram:PostalTradeAddress")?;

    if let Some(addr) = &party.electronic_address {
        w.start_element("ram:URIUniversalCommunication")?;
        w.text_element_with_attrs("ram:URIID", addr, &[("schemeID", "EM")])?;
        w.end_element("ram:URIUniversalCommunication")?;
    }

    if let Some(vat) = party.vat_number() {
        w.start_element("ram:SpecifiedTaxRegistration")?;
        w.text_element_with_attrs("ram:ID", vat, &[("schemeID", "VA")])?;
        w.end_element("ram:SpecifiedTaxRegistration")?;
    }

    w.end_element(tag)?;
    Ok(())
}

fn write_settlement(w: &mut XmlWriter, invoice: &Invoice, cur: &str) -> Result<(), FacturxError> {
    w.start_element("ram:ApplicableHeaderTradeSettlement")?;

    if let Some(reference) = invoice
        .payment_terms
        .as_ref()
        .and_then(|t| t.payment_reference.as_deref())
    {
        w.text_element("ram:PaymentReference", reference)?;
    }
    w.text_element("ram:InvoiceCurrencyCode", cur)?;

    if let Some(terms) = &invoice.payment_terms {
        write_payment_means(w, terms)?;
    }

    for row in &invoice.vat_breakdown {
        w.start_element("ram:ApplicableTradeTax")?;
        w.amount_element("ram:CalculatedAmount", row.vat_amount, cur)?;
        w.text_element("ram:TypeCode", "VAT")?;
        if let Some(reason) = &row.exemption_reason {
            w.text_element("ram:ExemptionReason", reason)?;
        }
        w.amount_element("ram:BasisAmount", row.taxable_amount, cur)?;
        w.text_element("ram:CategoryCode", row.category.code())?;
        w.text_element(
            "ram:RateApplicablePercent",
            &format_decimal(row.rate),
        )?;
        w.end_element("ram:ApplicableTradeTax")?;
    }

    if let Some(terms) = &invoice.payment_terms {
        let due = terms.due_date.or(invoice.due_date);
        if terms.description.is_some() || due.is_some() {
            w.start_element("ram:SpecifiedTradePaymentTerms")?;
            if let Some(desc) = &terms.description {
                w.text_element("ram:Description", desc)?;
            }
            if let Some(due) = due {
                w.date_element("ram:DueDateDateTime", due, "udt")?;
            }
            w.end_element("ram:SpecifiedTradePaymentTerms")?;
        }
    } else if let Some(due) = invoice.due_date {
        w.start_element("ram:SpecifiedTradePaymentTerms")?;
        w.date_element("ram:DueDateDateTime", due, "udt")?;
        w.end_element("ram:SpecifiedTradePaymentTerms")?;
    }

    let t = &invoice.totals;
    w.start_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;
    w.amount_element("ram:LineTotalAmount", t.line_total_amount, cur)?;
    if t.charge_total_amount > Decimal::ZERO {
        w.amount_element("ram:ChargeTotalAmount", t.charge_total_amount, cur)?;
    }
    if t.allowance_total_amount > Decimal::ZERO {
        w.amount_element("ram:AllowanceTotalAmount", t.allowance_total_amount, cur)?;
    }
    w.amount_element("ram:TaxBasisTotalAmount", t.tax_exclusive_amount, cur)?;
    w.amount_element("ram:TaxTotalAmount", t.tax_total_amount, cur)?;
    w.amount_element("ram:GrandTotalAmount", t.tax_inclusive_amount, cur)?;
    if t.prepaid_amount > Decimal::ZERO {
        w.amount_element("ram:TotalPrepaidAmount", t.prepaid_amount, cur)?;
    }
    w.amount_element("ram:DuePayableAmount", t.payable_amount, cur)?;
    w.end_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;

    if let Some(preceding) = &invoice.preceding_invoice {
        w.start_element("ram:InvoiceReferencedDocument")?;
        w.text_element("ram:IssuerAssignedID", &preceding.number)?;
        if let Some(date) = preceding.issue_date {
            w.date_element("ram:FormattedIssueDateTime", date, "qdt")?;
        }
        w.end_element("ram:InvoiceReferencedDocument")?;
    }

    w.end_element("ram:ApplicableHeaderTradeSettlement")?;
    Ok(())
}

fn write_payment_means(w: &mut XmlWriter, terms: &PaymentTerms) -> Result<(), FacturxError> {
    w.start_element("ram:SpecifiedTradeSettlementPaymentMeans")?;
    w.text_element("ram:TypeCode", &terms.means.code().to_string())?;
    if let Some(bank) = &terms.bank_account {
        if bank.iban.is_some() || bank.account_name.is_some() {
            w.start_element("ram:PayeePartyCreditorFinancialAccount")?;
            if let Some(iban) = &bank.iban {
                w.text_element("ram:IBANID", iban)?;
            }
            if let Some(name) = &bank.account_name {
                w.text_element("ram:AccountName", name)?;
            }
            w.end_element("ram:PayeePartyCreditorFinancialAccount")?;
        }
        if let Some(bic) = &bank.bic {
            w.start_element("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
            w.text_element("ram:BICID", bic)?;
            w.end_element("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
        }
    }
    w.end_element("ram:SpecifiedTradeSettlementPaymentMeans")?;
    Ok(())
}
