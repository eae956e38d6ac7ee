//! # xinvoice
//!
//! Conversion between canonical JSON invoices and the German and French
//! e-invoicing dialects: XRechnung (CII and UBL), Factur-X and ZUGFeRD.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! The target documents follow the [EN 16931](https://standards.cencenelec.eu/dyn/www/f?p=205:110:0::::FSP_PROJECT:60602) semantic model.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use xinvoice::core::*;
//! use xinvoice::{Format, to_xml};
//!
//! let invoice = InvoiceBuilder::new("001", NaiveDate::from_ymd_opt(2024, 2, 13).unwrap())
//!     .series("SAMPLE")
//!     .supplier(PartyBuilder::new("Provide One GmbH")
//!         .tax_id("DE", "111111125")
//!         .address(AddressBuilder::new("Walldorf", "69190", "DE").build())
//!         .build())
//!     .customer(PartyBuilder::new("Sample Consumer")
//!         .address(AddressBuilder::new("München", "80939", "DE").build())
//!         .build())
//!     .add_line(LineBuilder::new("Development services", dec!(20), dec!(90.00))
//!         .unit("h")
//!         .tax(TaxCategoryKey::Vat, RateKey::Standard, dec!(19))
//!         .build())
//!     .build()
//!     .unwrap();
//!
//! let xml = to_xml(&invoice, Format::XRechnungCii).unwrap();
//! assert!(xml.contains("<ram:ID>SAMPLE-001</ram:ID>"));
//! ```
//!
//! ## Conversion directions
//!
//! | Input | Output |
//! |-------|--------|
//! | canonical envelope + `xrechnung-cii` | XRechnung CII |
//! | canonical envelope + `xrechnung-ubl` | XRechnung UBL |
//! | canonical envelope + `facturx` | Factur-X CII |
//! | canonical envelope + `zugferd` | ZUGFeRD CII |
//! | CII or UBL XML | canonical envelope |

pub mod core;
pub mod mapping;
pub mod xml;

mod convert;

pub use convert::*;
