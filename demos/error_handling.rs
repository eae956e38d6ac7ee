use chrono::NaiveDate;
use rust_decimal_macros::dec;
use xinvoice::core::*;
use xinvoice::{Format, convert, to_xml};

fn report(label: &str, err: &ConvertError) {
    println!("  {label}: [{:?}] {err}", err.kind());
}

fn main() {
    // ── 1. Mapping error: supplier without tax identifier ─────────────
    println!("=== Mapping Error ===");
    let invoice = InvoiceBuilder::new("RE-2024-001", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .supplier(
            PartyBuilder::new("ACME GmbH")
                .address(AddressBuilder::new("Berlin", "10115", "DE").build())
                .build(),
        )
        .customer(
            PartyBuilder::new("Kunde AG")
                .address(AddressBuilder::new("München", "80331", "DE").build())
                .build(),
        )
        .add_line(
            LineBuilder::new("Consulting", dec!(10), dec!(150))
                .unit("h")
                .tax(TaxCategoryKey::Vat, RateKey::Standard, dec!(19))
                .build(),
        )
        .build()
        .unwrap();

    if let Err(e) = to_xml(&invoice, Format::XRechnungCii) {
        report("to_xml", &e);
    }

    // ── 2. Unsupported invoice type ───────────────────────────────────
    println!("\n=== Unmapped Code ===");
    let mut proforma = invoice.clone();
    proforma.invoice_type = InvoiceType::Proforma;
    if let Err(e) = to_xml(&proforma, Format::Zugferd) {
        report("to_xml", &e);
    }

    // ── 3. Dispatcher errors ──────────────────────────────────────────
    println!("\n=== Dispatcher Errors ===");
    let json = Envelope::from_invoice(&invoice).unwrap().to_json().unwrap();
    let cases: [(&str, &[u8], Option<&str>); 4] = [
        ("missing format", &json, None),
        ("unknown format", &json, Some("pdf")),
        ("unknown root", b"<Order/>", None),
        ("not XML", b"hello", None),
    ];
    for (label, data, format) in cases {
        if let Err(e) = convert(data, format) {
            report(label, &e);
        }
    }
}
