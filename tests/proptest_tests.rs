//! Property-based tests for mapping, code resolution and the dispatcher.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use xinvoice::core::codes::{is_valid_payment_means_code, payment_means_code, tax_category_code};
use xinvoice::core::*;
use xinvoice::mapping::invoice_number;
use xinvoice::{convert, to_canonical, to_xrechnung_cii, to_xrechnung_ubl};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn supplier() -> Party {
    PartyBuilder::new("Provide One GmbH")
        .tax_id("DE", "111111125")
        .address(
            AddressBuilder::new("Walldorf", "69190", "DE")
                .street("Dietmar-Hopp-Allee")
                .build(),
        )
        .email("billing@example.com")
        .build()
}

fn customer() -> Party {
    PartyBuilder::new("Sample Consumer")
        .address(AddressBuilder::new("München", "80939", "DE").build())
        .build()
}

fn build(lines: Vec<Line>) -> Invoice {
    let mut builder = InvoiceBuilder::new("PROP", date(2024, 2, 13))
        .series("SAMPLE")
        .supplier(supplier())
        .customer(customer());
    for line in lines {
        builder = builder.add_line(line);
    }
    builder.build().unwrap()
}

// ── Strategies ──────────────────────────────────────────────────────────────

/// 0.01 to 99999.99.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1u64..10_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1u32..=100u32).prop_map(Decimal::from)
}

fn arb_tax() -> impl Strategy<Value = (RateKey, Decimal)> {
    prop_oneof![
        Just((RateKey::Zero, dec!(0))),
        Just((RateKey::Reduced, dec!(7))),
        Just((RateKey::Standard, dec!(19))),
    ]
}

fn arb_line() -> impl Strategy<Value = Line> {
    (arb_quantity(), arb_price(), arb_tax()).prop_map(|(qty, price, (rate, percent))| {
        LineBuilder::new("Item", qty, price)
            .unit("h")
            .tax(TaxCategoryKey::Vat, rate, percent)
            .build()
    })
}

fn arb_category() -> impl Strategy<Value = TaxCategoryKey> {
    prop_oneof![
        Just(TaxCategoryKey::Vat),
        Just(TaxCategoryKey::Igic),
        Just(TaxCategoryKey::Ipsi),
        Just(TaxCategoryKey::Other),
    ]
}

/// Amount text, biased towards the edges of the `Decimal` range.
fn arb_amount_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(Decimal::MAX.to_string()),
        Just(Decimal::MIN.to_string()),
        arb_price().prop_map(|d| d.to_string()),
    ]
}

fn cii_with_amounts(basis: &str, tax: &str, breakdown: &[String]) -> String {
    let taxes: String = breakdown
        .iter()
        .map(|amount| {
            format!(
                "<ram:ApplicableTradeTax><ram:CalculatedAmount>{amount}</ram:CalculatedAmount>\
                 <ram:CategoryCode>S</ram:CategoryCode></ram:ApplicableTradeTax>"
            )
        })
        .collect();
    format!(
        "<rsm:CrossIndustryInvoice xmlns:rsm=\"r\" xmlns:ram=\"a\">\
         <rsm:SupplyChainTradeTransaction><ram:ApplicableHeaderTradeSettlement>{taxes}\
         <ram:SpecifiedTradeSettlementHeaderMonetarySummation>\
         <ram:TaxBasisTotalAmount>{basis}</ram:TaxBasisTotalAmount>\
         <ram:TaxTotalAmount>{tax}</ram:TaxTotalAmount>\
         </ram:SpecifiedTradeSettlementHeaderMonetarySummation>\
         </ram:ApplicableHeaderTradeSettlement></rsm:SupplyChainTradeTransaction>\
         </rsm:CrossIndustryInvoice>"
    )
}

fn ubl_with_amounts(basis: &str, breakdown: &[String]) -> String {
    let subtotals: String = breakdown
        .iter()
        .map(|amount| {
            format!(
                "<cac:TaxSubtotal><cbc:TaxAmount>{amount}</cbc:TaxAmount>\
                 <cac:TaxCategory><cbc:ID>S</cbc:ID></cac:TaxCategory></cac:TaxSubtotal>"
            )
        })
        .collect();
    format!(
        "<Invoice xmlns:cac=\"a\" xmlns:cbc=\"b\"><cac:TaxTotal>{subtotals}</cac:TaxTotal>\
         <cac:LegalMonetaryTotal><cbc:TaxExclusiveAmount>{basis}</cbc:TaxExclusiveAmount>\
         </cac:LegalMonetaryTotal></Invoice>"
    )
}

// ── Properties ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cii_reverse_preserves_totals(lines in prop::collection::vec(arb_line(), 1..=5)) {
        let invoice = build(lines);
        let xml = to_xrechnung_cii(&invoice).unwrap();
        let parsed = to_canonical(xml.as_bytes()).unwrap().extract_invoice().unwrap();

        prop_assert_eq!(&parsed.code, "SAMPLE-PROP");
        prop_assert_eq!(parsed.issue_date, invoice.issue_date);
        prop_assert_eq!(parsed.lines.len(), invoice.lines.len());

        let expected = invoice.totals.unwrap();
        let totals = parsed.totals.unwrap();
        prop_assert_eq!(totals.total, expected.total);
        prop_assert_eq!(totals.tax, expected.tax);
        prop_assert_eq!(totals.payable, expected.payable);
        for (a, b) in parsed.lines.iter().zip(&invoice.lines) {
            prop_assert_eq!(a.total, b.total);
            prop_assert_eq!(a.quantity, b.quantity);
        }
    }

    #[test]
    fn ubl_reverse_preserves_totals(lines in prop::collection::vec(arb_line(), 1..=5)) {
        let invoice = build(lines);
        let xml = to_xrechnung_ubl(&invoice).unwrap();
        let parsed = to_canonical(xml.as_bytes()).unwrap().extract_invoice().unwrap();

        let expected = invoice.totals.unwrap();
        let totals = parsed.totals.unwrap();
        prop_assert_eq!(totals.total_with_tax, expected.total_with_tax);
        prop_assert_eq!(
            totals.taxes.unwrap().sum,
            expected.taxes.unwrap().sum
        );
    }

    #[test]
    fn summary_copies_totals(lines in prop::collection::vec(arb_line(), 1..=5)) {
        let invoice = build(lines);
        let totals = invoice.totals.clone().unwrap();
        let xml = to_xrechnung_cii(&invoice).unwrap();
        let grand_total = format!("<ram:GrandTotalAmount>{}</ram:GrandTotalAmount>", totals.total_with_tax);
        let due_payable = format!("<ram:DuePayableAmount>{}</ram:DuePayableAmount>", totals.payable);
        prop_assert!(xml.contains(&grand_total));
        prop_assert!(xml.contains(&due_payable));
    }

    #[test]
    fn identifier_joins_series_and_code(series in "[A-Z]{0,4}", code in "[0-9]{1,6}") {
        let id = invoice_number(Some(&series), &code);
        if series.is_empty() {
            prop_assert_eq!(id, code);
        } else {
            prop_assert_eq!(id, format!("{series}-{code}"));
        }
    }

    #[test]
    fn rate_key_wins_over_category(category in arb_category()) {
        prop_assert_eq!(tax_category_code(Some(RateKey::Standard), category).code(), "S");
        prop_assert_eq!(tax_category_code(Some(RateKey::Zero), category).code(), "Z");
        prop_assert_eq!(tax_category_code(Some(RateKey::Exempt), category).code(), "E");
        // pure
        prop_assert_eq!(
            tax_category_code(None, category),
            tax_category_code(None, category)
        );
    }

    #[test]
    fn payment_means_is_always_valid(key in "[a-z+-]{0,24}", ext in proptest::option::of("[0-9A-Z]{0,4}")) {
        let mut instructions = Instructions {
            key,
            ..Default::default()
        };
        if let Some(code) = ext {
            instructions.ext = BTreeMap::from([(EXT_PAYMENT_MEANS.to_string(), code)]);
        }
        prop_assert!(is_valid_payment_means_code(&payment_means_code(Some(&instructions))));
    }

    #[test]
    fn dispatcher_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = convert(&data, Some("xrechnung-cii"));
        let _ = convert(&data, None);
    }

    #[test]
    fn xml_like_input_never_panics(
        body in "[<>/a-zA-Z =\"]{0,200}",
        basis in arb_amount_text(),
        tax in arb_amount_text(),
        breakdown in prop::collection::vec(arb_amount_text(), 0..=3),
    ) {
        let _ = convert(format!("<CrossIndustryInvoice>{body}").as_bytes(), None);
        let _ = convert(format!("<Invoice>{body}").as_bytes(), None);
        let _ = convert(cii_with_amounts(&basis, &tax, &breakdown).as_bytes(), None);
        let _ = convert(ubl_with_amounts(&basis, &breakdown).as_bytes(), None);
    }
}
