use chrono::NaiveDate;
use rust_decimal_macros::dec;
use xinvoice::core::*;
use xinvoice::{Format, to_xml};

fn main() {
    // Build a canonical invoice; totals are computed by the builder
    let invoice = InvoiceBuilder::new("001", NaiveDate::from_ymd_opt(2024, 2, 13).unwrap())
        .series("SAMPLE")
        .supplier(
            PartyBuilder::new("Provide One GmbH")
                .tax_id("DE", "111111125")
                .address(
                    AddressBuilder::new("Walldorf", "69190", "DE")
                        .street("Dietmar-Hopp-Allee")
                        .num("16")
                        .build(),
                )
                .email("billing@example.com")
                .telephone("+49100200300")
                .person("John", "Doe")
                .build(),
        )
        .customer(
            PartyBuilder::new("Sample Consumer")
                .tax_id("DE", "282741168")
                .address(
                    AddressBuilder::new("München", "80939", "DE")
                        .street("Werner-Heisenberg-Allee")
                        .build(),
                )
                .email("email@sample.com")
                .build(),
        )
        .add_line(
            LineBuilder::new("Development services", dec!(20), dec!(90.00))
                .unit("h")
                .tax(TaxCategoryKey::Vat, RateKey::Standard, dec!(19))
                .build(),
        )
        .ordering_code("XR-2024-2")
        .payment_terms("lorem ipsum")
        .build()
        .unwrap();

    let totals = invoice.totals.as_ref().unwrap();
    println!("Total:   {} EUR", totals.total);
    println!("Tax:     {} EUR", totals.tax);
    println!("Payable: {} EUR", totals.payable);

    for format in Format::ALL {
        match to_xml(&invoice, format) {
            Ok(xml) => println!("\n=== {format} ({} bytes) ===\n{xml}", xml.len()),
            Err(e) => println!("\n=== {format} failed: {e}"),
        }
    }

    // The canonical envelope, as another system would send it
    let json = Envelope::from_invoice(&invoice).unwrap().to_json().unwrap();
    println!("\n=== envelope ===\n{}", String::from_utf8_lossy(&json));
}
