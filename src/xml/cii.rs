use quick_xml::Reader;
use quick_xml::events::Event;

use super::cii_ns;
use super::parsed::{DateLayout, ParsedInvoice, attribute, local_name};
use super::xml_utils::{XmlResult, XmlWriter};
use crate::core::{ConvertError, Invoice};
use crate::mapping::*;

/// Serialize a mapped document as CII (Cross Industry Invoice) XML.
pub fn to_cii_xml(doc: &Document) -> XmlResult {
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "rsm:CrossIndustryInvoice",
        &[
            ("xmlns:rsm", cii_ns::RSM),
            ("xmlns:ram", cii_ns::RAM),
            ("xmlns:qdt", cii_ns::QDT),
            ("xmlns:udt", cii_ns::UDT),
        ],
    )?;

    // --- ExchangedDocumentContext ---
    w.start_element("rsm:ExchangedDocumentContext")?;
    if let Some(business) = &doc.context.business {
        w.start_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
        w.text_element("ram:ID", business)?;
        w.end_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
    }
    w.start_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.text_element("ram:ID", &doc.context.guideline)?;
    w.end_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.end_element("rsm:ExchangedDocumentContext")?;

    // --- ExchangedDocument ---
    w.start_element("rsm:ExchangedDocument")?;
    w.text_element("ram:ID", &doc.header.id)?;
    w.text_element("ram:TypeCode", doc.header.type_code)?;
    write_cii_date(&mut w, "ram:IssueDateTime", "udt:DateTimeString", &doc.header.issue_date)?;
    w.end_element("rsm:ExchangedDocument")?;

    // --- SupplyChainTradeTransaction ---
    let tx = &doc.transaction;
    w.start_element("rsm:SupplyChainTradeTransaction")?;
    for line in &tx.lines {
        write_cii_line(&mut w, line)?;
    }

    // --- ApplicableHeaderTradeAgreement ---
    w.start_element("ram:ApplicableHeaderTradeAgreement")?;
    w.text_element("ram:BuyerReference", &tx.agreement.buyer_reference)?;
    write_cii_seller(&mut w, &tx.agreement.seller)?;
    write_cii_buyer(&mut w, &tx.agreement.buyer)?;
    w.end_element("ram:ApplicableHeaderTradeAgreement")?;

    // Delivery carries no mapped data but is mandatory in the schema
    w.empty_element("ram:ApplicableHeaderTradeDelivery")?;

    // --- ApplicableHeaderTradeSettlement ---
    write_cii_settlement(&mut w, &tx.settlement)?;

    w.end_element("rsm:SupplyChainTradeTransaction")?;
    w.end_element("rsm:CrossIndustryInvoice")?;

    w.into_string()
}

fn write_cii_date(
    w: &mut XmlWriter,
    element: &str,
    inner: &str,
    date: &DateTimeString,
) -> Result<(), ConvertError> {
    w.start_element(element)?;
    w.text_element_with_attrs(inner, &date.value, &[("format", date.format)])?;
    w.end_element(element)?;
    Ok(())
}

fn write_cii_address(w: &mut XmlWriter, address: &PostalTradeAddress) -> Result<(), ConvertError> {
    w.start_element("ram:PostalTradeAddress")?;
    w.text_element("ram:PostcodeCode", &address.postcode)?;
    if !address.line_one.is_empty() {
        w.text_element("ram:LineOne", &address.line_one)?;
    }
    w.text_element("ram:CityName", &address.city)?;
    w.text_element("ram:CountryID", &address.country_id)?;
    w.end_element("ram:PostalTradeAddress")?;
    Ok(())
}

fn write_cii_uri(w: &mut XmlWriter, uri: &UriCommunication) -> Result<(), ConvertError> {
    w.start_element("ram:URIUniversalCommunication")?;
    w.text_element_with_attrs("ram:URIID", &uri.uri_id, &[("schemeID", uri.scheme_id)])?;
    w.end_element("ram:URIUniversalCommunication")?;
    Ok(())
}

fn write_cii_seller(w: &mut XmlWriter, seller: &Seller) -> Result<(), ConvertError> {
    // Name → DefinedTradeContact → PostalTradeAddress →
    // URIUniversalCommunication → SpecifiedTaxRegistration
    w.start_element("ram:SellerTradeParty")?;
    w.text_element("ram:Name", &seller.name)?;

    if let Some(contact) = &seller.contact {
        w.start_element("ram:DefinedTradeContact")?;
        w.text_element("ram:PersonName", &contact.person_name)?;
        w.start_element("ram:TelephoneUniversalCommunication")?;
        w.text_element("ram:CompleteNumber", &contact.phone)?;
        w.end_element("ram:TelephoneUniversalCommunication")?;
        w.start_element("ram:EmailURIUniversalCommunication")?;
        w.text_element("ram:URIID", &contact.email)?;
        w.end_element("ram:EmailURIUniversalCommunication")?;
        w.end_element("ram:DefinedTradeContact")?;
    }

    write_cii_address(w, &seller.address)?;
    if let Some(email) = &seller.email {
        write_cii_uri(w, email)?;
    }

    let reg = &seller.tax_registration;
    w.start_element("ram:SpecifiedTaxRegistration")?;
    w.text_element_with_attrs("ram:ID", &reg.id, &[("schemeID", reg.scheme_id)])?;
    w.end_element("ram:SpecifiedTaxRegistration")?;

    w.end_element("ram:SellerTradeParty")?;
    Ok(())
}

fn write_cii_buyer(w: &mut XmlWriter, buyer: &Buyer) -> Result<(), ConvertError> {
    w.start_element("ram:BuyerTradeParty")?;
    if let Some(id) = &buyer.id {
        w.text_element("ram:ID", id)?;
    }
    w.text_element("ram:Name", &buyer.name)?;
    write_cii_address(w, &buyer.address)?;
    if let Some(email) = &buyer.email {
        write_cii_uri(w, email)?;
    }
    w.end_element("ram:BuyerTradeParty")?;
    Ok(())
}

fn write_cii_line(w: &mut XmlWriter, line: &Line) -> Result<(), ConvertError> {
    w.start_element("ram:IncludedSupplyChainTradeLineItem")?;

    w.start_element("ram:AssociatedDocumentLineDocument")?;
    w.text_element("ram:LineID", &line.id)?;
    w.end_element("ram:AssociatedDocumentLineDocument")?;

    w.start_element("ram:SpecifiedTradeProduct")?;
    w.text_element("ram:Name", &line.name)?;
    w.end_element("ram:SpecifiedTradeProduct")?;

    w.start_element("ram:SpecifiedLineTradeAgreement")?;
    w.start_element("ram:NetPriceProductTradePrice")?;
    w.text_element("ram:ChargeAmount", &line.net_price)?;
    w.end_element("ram:NetPriceProductTradePrice")?;
    w.end_element("ram:SpecifiedLineTradeAgreement")?;

    w.start_element("ram:SpecifiedLineTradeDelivery")?;
    w.quantity_element(
        "ram:BilledQuantity",
        &line.quantity.amount,
        &line.quantity.unit_code,
    )?;
    w.end_element("ram:SpecifiedLineTradeDelivery")?;

    w.start_element("ram:SpecifiedLineTradeSettlement")?;
    for tax in &line.taxes {
        w.start_element("ram:ApplicableTradeTax")?;
        w.text_element("ram:TypeCode", tax.type_code)?;
        w.text_element("ram:CategoryCode", tax.category_code)?;
        if let Some(percent) = &tax.rate_percent {
            w.text_element("ram:RateApplicablePercent", percent)?;
        }
        w.end_element("ram:ApplicableTradeTax")?;
    }
    w.start_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.text_element("ram:LineTotalAmount", &line.total)?;
    w.end_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.end_element("ram:SpecifiedLineTradeSettlement")?;

    w.end_element("ram:IncludedSupplyChainTradeLineItem")?;
    Ok(())
}

fn write_cii_settlement(w: &mut XmlWriter, s: &Settlement) -> Result<(), ConvertError> {
    w.start_element("ram:ApplicableHeaderTradeSettlement")?;
    w.text_element("ram:InvoiceCurrencyCode", &s.currency)?;

    w.start_element("ram:SpecifiedTradeSettlementPaymentMeans")?;
    w.text_element("ram:TypeCode", &s.payment_means.type_code)?;
    if let Some(iban) = &s.payment_means.payee_iban {
        w.start_element("ram:PayeePartyCreditorFinancialAccount")?;
        w.text_element("ram:IBANID", iban)?;
        w.end_element("ram:PayeePartyCreditorFinancialAccount")?;
    }
    w.end_element("ram:SpecifiedTradeSettlementPaymentMeans")?;

    for tax in &s.taxes {
        w.start_element("ram:ApplicableTradeTax")?;
        w.text_element("ram:CalculatedAmount", &tax.calculated_amount)?;
        w.text_element("ram:TypeCode", tax.type_code)?;
        w.text_element("ram:BasisAmount", &tax.basis_amount)?;
        w.text_element("ram:CategoryCode", tax.category_code)?;
        w.text_element("ram:RateApplicablePercent", &tax.rate_percent)?;
        w.end_element("ram:ApplicableTradeTax")?;
    }

    if let Some(terms) = &s.payment_terms {
        w.start_element("ram:SpecifiedTradePaymentTerms")?;
        w.text_element("ram:Description", terms)?;
        w.end_element("ram:SpecifiedTradePaymentTerms")?;
    }

    let sum = &s.summary;
    w.start_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;
    w.text_element("ram:LineTotalAmount", &sum.line_total)?;
    w.text_element("ram:TaxBasisTotalAmount", &sum.tax_basis_total)?;
    w.amount_element(
        "ram:TaxTotalAmount",
        &sum.tax_total.value,
        &sum.tax_total.currency,
    )?;
    w.text_element("ram:GrandTotalAmount", &sum.grand_total)?;
    w.text_element("ram:DuePayableAmount", &sum.due_payable)?;
    w.end_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;

    if let Some(reference) = &s.referenced_document {
        w.start_element("ram:InvoiceReferencedDocument")?;
        w.text_element("ram:IssuerAssignedID", &reference.issuer_assigned_id)?;
        write_cii_date(
            w,
            "ram:FormattedIssueDateTime",
            "qdt:DateTimeString",
            &reference.issue_date,
        )?;
        w.end_element("ram:InvoiceReferencedDocument")?;
    }

    w.end_element("ram:ApplicableHeaderTradeSettlement")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse CII XML into a canonical invoice.
///
/// Element prefixes are ignored; only local names are matched.
pub fn from_cii_xml(xml: &str) -> Result<Invoice, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut p = ParsedInvoice::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if matches!(name.as_str(), "URIID" | "ID" | "BilledQuantity") {
                    p.current_scheme_id = attribute(e, "schemeID");
                    p.current_unit_code = attribute(e, "unitCode");
                }
                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ConvertError::MalformedInput(format!("XML parse error: {e}")))?;
                if !text.is_empty() {
                    handle_text(&mut p, &path, &text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                let in_line = path.iter().any(|p| p == "IncludedSupplyChainTradeLineItem");
                match ended.as_str() {
                    "IncludedSupplyChainTradeLineItem" => p.push_line(),
                    "ApplicableTradeTax" if in_line => p.push_line_tax(),
                    "ApplicableTradeTax" => p.push_breakdown(),
                    "InvoiceReferencedDocument" => p.push_preceding(),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::MalformedInput(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    p.into_invoice(DateLayout::Compact)
}

fn handle_text(p: &mut ParsedInvoice, path: &[String], text: &str) {
    let leaf = path.last().map(|s| s.as_str()).unwrap_or("");
    let parent = if path.len() >= 2 {
        path[path.len() - 2].as_str()
    } else {
        ""
    };
    let within = |name: &str| path.iter().any(|p| p == name);

    if within("IncludedSupplyChainTradeLineItem") {
        let line = p.current_line.get_or_insert_with(Default::default);
        if within("ApplicableTradeTax") {
            let tax = line.current_tax.get_or_insert_with(Default::default);
            match leaf {
                "CategoryCode" => tax.category_code = Some(text.to_string()),
                "RateApplicablePercent" => tax.percent = Some(text.to_string()),
                _ => {}
            }
            return;
        }
        match leaf {
            "Name" if parent == "SpecifiedTradeProduct" => line.name = Some(text.to_string()),
            "ChargeAmount" if parent == "NetPriceProductTradePrice" => line.price = Some(text.to_string()),
            "BilledQuantity" => {
                line.quantity = Some(text.to_string());
                line.unit = p.current_unit_code.take();
            }
            "LineTotalAmount" => line.total = Some(text.to_string()),
            _ => {}
        }
        return;
    }

    // Document level
    match (parent, leaf) {
        ("ExchangedDocument", "ID") => p.number = Some(text.to_string()),
        ("ExchangedDocument", "TypeCode") => p.type_code = Some(text.to_string()),
        ("IssueDateTime", "DateTimeString") => p.issue_date = Some(text.to_string()),
        (_, "BuyerReference") => p.buyer_reference = Some(text.to_string()),
        (_, "InvoiceCurrencyCode") => p.currency = Some(text.to_string()),
        _ => {}
    }

    for (role, party) in [
        ("SellerTradeParty", &mut p.seller),
        ("BuyerTradeParty", &mut p.buyer),
    ] {
        if !within(role) {
            continue;
        }
        match leaf {
            "Name" if parent == role => party.name = Some(text.to_string()),
            // The buyer's own identifier is its tax identifier
            "ID" if parent == role && role == "BuyerTradeParty" => {
                party.tax_id = Some(text.to_string())
            }
            "ID" if parent == "SpecifiedTaxRegistration"
                && p.current_scheme_id.as_deref().is_none_or(|s| s == SCHEME_VAT) =>
            {
                party.tax_id = Some(text.to_string())
            }
            "PersonName" => party.contact_name = Some(text.to_string()),
            "CompleteNumber" => party.contact_phone = Some(text.to_string()),
            "URIID" if parent == "EmailURIUniversalCommunication" => {
                party.contact_email = Some(text.to_string())
            }
            "URIID" if parent == "URIUniversalCommunication" => party.email = Some(text.to_string()),
            "LineOne" => party.street = Some(text.to_string()),
            "CityName" => party.city = Some(text.to_string()),
            "PostcodeCode" => party.postcode = Some(text.to_string()),
            "CountryID" => party.country = Some(text.to_string()),
            _ => {}
        }
    }

    if within("ApplicableHeaderTradeSettlement") {
        if within("ApplicableTradeTax") {
            let bd = p.current_breakdown.get_or_insert_with(Default::default);
            match leaf {
                "CalculatedAmount" => bd.amount = Some(text.to_string()),
                "BasisAmount" => bd.basis = Some(text.to_string()),
                "CategoryCode" => bd.category_code = Some(text.to_string()),
                "RateApplicablePercent" => bd.percent = Some(text.to_string()),
                _ => {}
            }
            return;
        }
        if within("InvoiceReferencedDocument") {
            let reference = p.current_preceding.get_or_insert_with(Default::default);
            match leaf {
                "IssuerAssignedID" => reference.id = Some(text.to_string()),
                "DateTimeString" => reference.issue_date = Some(text.to_string()),
                _ => {}
            }
            return;
        }
        match (parent, leaf) {
            ("SpecifiedTradeSettlementPaymentMeans", "TypeCode") => p.means_code = Some(text.to_string()),
            ("PayeePartyCreditorFinancialAccount", "IBANID") => p.payee_iban = Some(text.to_string()),
            ("SpecifiedTradePaymentTerms", "Description") => p.payment_terms = Some(text.to_string()),
            ("SpecifiedTradeSettlementHeaderMonetarySummation", field) => match field {
                "LineTotalAmount" => p.line_total = Some(text.to_string()),
                "TaxBasisTotalAmount" => p.tax_basis_total = Some(text.to_string()),
                "TaxTotalAmount" => p.tax_total = Some(text.to_string()),
                "GrandTotalAmount" => p.grand_total = Some(text.to_string()),
                "DuePayableAmount" => p.due_payable = Some(text.to_string()),
                _ => {}
            },
            _ => {}
        }
    }
}
