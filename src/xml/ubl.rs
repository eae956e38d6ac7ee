use quick_xml::Reader;
use quick_xml::events::Event;

use super::parsed::{DateLayout, ParsedInvoice, attribute, local_name};
use super::xml_utils::{XmlResult, XmlWriter};
use super::{UBL_ROOT, ubl_ns};
use crate::core::{ConvertError, Invoice};
use crate::mapping::*;

/// Serialize a mapped document as UBL 2.1 Invoice XML.
///
/// The root is `ubl:Invoice` for every type code, credit notes included.
pub fn to_ubl_xml(doc: &Document) -> XmlResult {
    let tx = &doc.transaction;
    let currency = tx.settlement.currency.as_str();
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "ubl:Invoice",
        &[
            ("xmlns:ubl", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    // BT-24: CustomizationID
    w.text_element("cbc:CustomizationID", &doc.context.guideline)?;
    // BT-23: ProfileID
    if let Some(business) = &doc.context.business {
        w.text_element("cbc:ProfileID", business)?;
    }
    w.text_element("cbc:ID", &doc.header.id)?;
    w.text_element("cbc:IssueDate", &iso_date(&doc.header.issue_date))?;
    w.text_element("cbc:InvoiceTypeCode", doc.header.type_code)?;
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    w.text_element("cbc:BuyerReference", &tx.agreement.buyer_reference)?;

    // BG-3: Preceding invoice reference
    if let Some(reference) = &tx.settlement.referenced_document {
        w.start_element("cac:BillingReference")?;
        w.start_element("cac:InvoiceDocumentReference")?;
        w.text_element("cbc:ID", &reference.issuer_assigned_id)?;
        if !reference.issue_date.value.is_empty() {
            w.text_element("cbc:IssueDate", &iso_date(&reference.issue_date))?;
        }
        w.end_element("cac:InvoiceDocumentReference")?;
        w.end_element("cac:BillingReference")?;
    }

    write_ubl_seller(&mut w, &tx.agreement.seller)?;
    write_ubl_buyer(&mut w, &tx.agreement.buyer)?;

    let s = &tx.settlement;
    w.start_element("cac:PaymentMeans")?;
    w.text_element("cbc:PaymentMeansCode", &s.payment_means.type_code)?;
    if let Some(iban) = &s.payment_means.payee_iban {
        w.start_element("cac:PayeeFinancialAccount")?;
        w.text_element("cbc:ID", iban)?;
        w.end_element("cac:PayeeFinancialAccount")?;
    }
    w.end_element("cac:PaymentMeans")?;

    if let Some(terms) = &s.payment_terms {
        w.start_element("cac:PaymentTerms")?;
        w.text_element("cbc:Note", terms)?;
        w.end_element("cac:PaymentTerms")?;
    }

    // BG-23: VAT breakdown
    w.start_element("cac:TaxTotal")?;
    w.amount_element(
        "cbc:TaxAmount",
        &s.summary.tax_total.value,
        &s.summary.tax_total.currency,
    )?;
    for tax in &s.taxes {
        w.start_element("cac:TaxSubtotal")?;
        w.amount_element("cbc:TaxableAmount", &tax.basis_amount, currency)?;
        w.amount_element("cbc:TaxAmount", &tax.calculated_amount, currency)?;
        write_ubl_tax_category(
            &mut w,
            "cac:TaxCategory",
            tax.category_code,
            Some(&tax.rate_percent),
            tax.type_code,
        )?;
        w.end_element("cac:TaxSubtotal")?;
    }
    w.end_element("cac:TaxTotal")?;

    // BG-22: Document totals
    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", &s.summary.line_total, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", &s.summary.tax_basis_total, currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", &s.summary.grand_total, currency)?;
    w.amount_element("cbc:PayableAmount", &s.summary.due_payable, currency)?;
    w.end_element("cac:LegalMonetaryTotal")?;

    for line in &tx.lines {
        write_ubl_line(&mut w, line, currency)?;
    }

    w.end_element("ubl:Invoice")?;
    w.into_string()
}

/// `YYYYMMDD` → `YYYY-MM-DD`; anything else is passed through.
fn iso_date(date: &DateTimeString) -> String {
    let v = &date.value;
    if v.len() == 8 && v.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &v[..4], &v[4..6], &v[6..])
    } else {
        v.clone()
    }
}

fn write_ubl_address(w: &mut XmlWriter, address: &PostalTradeAddress) -> Result<(), ConvertError> {
    w.start_element("cac:PostalAddress")?;
    if !address.line_one.is_empty() {
        w.text_element("cbc:StreetName", &address.line_one)?;
    }
    w.text_element("cbc:CityName", &address.city)?;
    w.text_element("cbc:PostalZone", &address.postcode)?;
    w.start_element("cac:Country")?;
    w.text_element("cbc:IdentificationCode", &address.country_id)?;
    w.end_element("cac:Country")?;
    w.end_element("cac:PostalAddress")?;
    Ok(())
}

fn write_ubl_endpoint(w: &mut XmlWriter, uri: &UriCommunication) -> Result<(), ConvertError> {
    w.text_element_with_attrs("cbc:EndpointID", &uri.uri_id, &[("schemeID", uri.scheme_id)])?;
    Ok(())
}

fn write_ubl_tax_scheme(w: &mut XmlWriter, company_id: &str) -> Result<(), ConvertError> {
    w.start_element("cac:PartyTaxScheme")?;
    w.text_element("cbc:CompanyID", company_id)?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", TAX_TYPE_VAT)?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:PartyTaxScheme")?;
    Ok(())
}

fn write_ubl_seller(w: &mut XmlWriter, seller: &Seller) -> Result<(), ConvertError> {
    w.start_element("cac:AccountingSupplierParty")?;
    w.start_element("cac:Party")?;
    if let Some(email) = &seller.email {
        write_ubl_endpoint(w, email)?;
    }
    write_ubl_address(w, &seller.address)?;
    write_ubl_tax_scheme(w, &seller.tax_registration.id)?;
    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", &seller.name)?;
    w.end_element("cac:PartyLegalEntity")?;
    if let Some(contact) = &seller.contact {
        w.start_element("cac:Contact")?;
        w.text_element("cbc:Name", &contact.person_name)?;
        w.text_element("cbc:Telephone", &contact.phone)?;
        w.text_element("cbc:ElectronicMail", &contact.email)?;
        w.end_element("cac:Contact")?;
    }
    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingSupplierParty")?;
    Ok(())
}

fn write_ubl_buyer(w: &mut XmlWriter, buyer: &Buyer) -> Result<(), ConvertError> {
    w.start_element("cac:AccountingCustomerParty")?;
    w.start_element("cac:Party")?;
    if let Some(email) = &buyer.email {
        write_ubl_endpoint(w, email)?;
    }
    write_ubl_address(w, &buyer.address)?;
    if let Some(id) = &buyer.id {
        write_ubl_tax_scheme(w, id)?;
    }
    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", &buyer.name)?;
    w.end_element("cac:PartyLegalEntity")?;
    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingCustomerParty")?;
    Ok(())
}

fn write_ubl_tax_category(
    w: &mut XmlWriter,
    element: &str,
    category_code: &str,
    percent: Option<&String>,
    scheme: &str,
) -> Result<(), ConvertError> {
    w.start_element(element)?;
    w.text_element("cbc:ID", category_code)?;
    if let Some(percent) = percent {
        w.text_element("cbc:Percent", percent)?;
    }
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", scheme)?;
    w.end_element("cac:TaxScheme")?;
    w.end_element(element)?;
    Ok(())
}

fn write_ubl_line(w: &mut XmlWriter, line: &Line, currency: &str) -> Result<(), ConvertError> {
    w.start_element("cac:InvoiceLine")?;
    w.text_element("cbc:ID", &line.id)?;
    w.quantity_element(
        "cbc:InvoicedQuantity",
        &line.quantity.amount,
        &line.quantity.unit_code,
    )?;
    w.amount_element("cbc:LineExtensionAmount", &line.total, currency)?;

    w.start_element("cac:Item")?;
    w.text_element("cbc:Name", &line.name)?;
    for tax in &line.taxes {
        write_ubl_tax_category(
            w,
            "cac:ClassifiedTaxCategory",
            tax.category_code,
            tax.rate_percent.as_ref(),
            tax.type_code,
        )?;
    }
    w.end_element("cac:Item")?;

    w.start_element("cac:Price")?;
    w.amount_element("cbc:PriceAmount", &line.net_price, currency)?;
    w.end_element("cac:Price")?;

    w.end_element("cac:InvoiceLine")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse UBL 2.1 Invoice XML into a canonical invoice.
pub fn from_ubl_xml(xml: &str) -> Result<Invoice, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut p = ParsedInvoice::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if matches!(name.as_str(), "EndpointID" | "InvoicedQuantity") {
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
                    handle_ubl_text(&mut p, &path, &text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                match ended.as_str() {
                    "InvoiceLine" => p.push_line(),
                    "ClassifiedTaxCategory" => p.push_line_tax(),
                    "TaxSubtotal" => p.push_breakdown(),
                    "BillingReference" => p.push_preceding(),
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

    p.into_invoice(DateLayout::Iso)
}

fn handle_ubl_text(p: &mut ParsedInvoice, path: &[String], text: &str) {
    let leaf = path.last().map(|s| s.as_str()).unwrap_or("");
    let parent = if path.len() >= 2 {
        path[path.len() - 2].as_str()
    } else {
        ""
    };
    let within = |name: &str| path.iter().any(|p| p == name);

    if within("InvoiceLine") {
        let line = p.current_line.get_or_insert_with(Default::default);
        if within("ClassifiedTaxCategory") {
            let tax = line.current_tax.get_or_insert_with(Default::default);
            match (parent, leaf) {
                ("ClassifiedTaxCategory", "ID") => tax.category_code = Some(text.to_string()),
                ("ClassifiedTaxCategory", "Percent") => tax.percent = Some(text.to_string()),
                _ => {}
            }
            return;
        }
        match (parent, leaf) {
            ("InvoiceLine", "InvoicedQuantity") => {
                line.quantity = Some(text.to_string());
                line.unit = p.current_unit_code.take();
            }
            ("InvoiceLine", "LineExtensionAmount") => line.total = Some(text.to_string()),
            ("Item", "Name") => line.name = Some(text.to_string()),
            ("Price", "PriceAmount") => line.price = Some(text.to_string()),
            _ => {}
        }
        return;
    }

    if parent == UBL_ROOT {
        match leaf {
            "ID" => p.number = Some(text.to_string()),
            "IssueDate" => p.issue_date = Some(text.to_string()),
            "InvoiceTypeCode" => p.type_code = Some(text.to_string()),
            "DocumentCurrencyCode" => p.currency = Some(text.to_string()),
            "BuyerReference" => p.buyer_reference = Some(text.to_string()),
            _ => {}
        }
        return;
    }

    if within("BillingReference") {
        let reference = p.current_preceding.get_or_insert_with(Default::default);
        match (parent, leaf) {
            ("InvoiceDocumentReference", "ID") => reference.id = Some(text.to_string()),
            ("InvoiceDocumentReference", "IssueDate") => {
                reference.issue_date = Some(text.to_string())
            }
            _ => {}
        }
        return;
    }

    for (role, party) in [
        ("AccountingSupplierParty", &mut p.seller),
        ("AccountingCustomerParty", &mut p.buyer),
    ] {
        if !within(role) {
            continue;
        }
        match (parent, leaf) {
            ("Party", "EndpointID") => {
                if p.current_scheme_id.as_deref().is_none_or(|s| s == SCHEME_EMAIL) {
                    party.email = Some(text.to_string());
                }
            }
            ("PartyTaxScheme", "CompanyID") => party.tax_id = Some(text.to_string()),
            ("PartyLegalEntity", "RegistrationName") => party.name = Some(text.to_string()),
            ("PartyName", "Name") if party.name.is_none() => party.name = Some(text.to_string()),
            ("PostalAddress", "StreetName") => party.street = Some(text.to_string()),
            ("PostalAddress", "CityName") => party.city = Some(text.to_string()),
            ("PostalAddress", "PostalZone") => party.postcode = Some(text.to_string()),
            ("Country", "IdentificationCode") => party.country = Some(text.to_string()),
            ("Contact", "Name") => party.contact_name = Some(text.to_string()),
            ("Contact", "Telephone") => party.contact_phone = Some(text.to_string()),
            ("Contact", "ElectronicMail") => party.contact_email = Some(text.to_string()),
            _ => {}
        }
        return;
    }

    if within("TaxSubtotal") {
        let bd = p.current_breakdown.get_or_insert_with(Default::default);
        match (parent, leaf) {
            ("TaxSubtotal", "TaxableAmount") => bd.basis = Some(text.to_string()),
            ("TaxSubtotal", "TaxAmount") => bd.amount = Some(text.to_string()),
            ("TaxCategory", "ID") => bd.category_code = Some(text.to_string()),
            ("TaxCategory", "Percent") => bd.percent = Some(text.to_string()),
            _ => {}
        }
        return;
    }

    match (parent, leaf) {
        ("TaxTotal", "TaxAmount") => p.tax_total = Some(text.to_string()),
        ("PaymentMeans", "PaymentMeansCode") => p.means_code = Some(text.to_string()),
        ("PayeeFinancialAccount", "ID") => p.payee_iban = Some(text.to_string()),
        ("PaymentTerms", "Note") => p.payment_terms = Some(text.to_string()),
        ("LegalMonetaryTotal", "LineExtensionAmount") => p.line_total = Some(text.to_string()),
        ("LegalMonetaryTotal", "TaxExclusiveAmount") => {
            p.tax_basis_total = Some(text.to_string())
        }
        ("LegalMonetaryTotal", "TaxInclusiveAmount") => p.grand_total = Some(text.to_string()),
        ("LegalMonetaryTotal", "PayableAmount") => p.due_payable = Some(text.to_string()),
        _ => {}
    }
}
