//! CII and UBL serialization of mapped documents, and parsing of both
//! syntaxes back into canonical invoices.
//!
//! # Supported syntaxes
//!
//! - **CII**: UN/CEFACT Cross Industry Invoice (`to_cii_xml`, `from_cii_xml`)
//! - **UBL 2.1**: OASIS Universal Business Language (`to_ubl_xml`, `from_ubl_xml`)

mod cii;
mod parsed;
mod ubl;
pub(crate) mod xml_utils;

pub use cii::{from_cii_xml, to_cii_xml};
pub use ubl::{from_ubl_xml, to_ubl_xml};

/// Local name of the CII root element.
pub const CII_ROOT: &str = "CrossIndustryInvoice";

/// Local name of the UBL invoice root element.
pub const UBL_ROOT: &str = "Invoice";

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}

/// CII namespace URIs.
pub mod cii_ns {
    pub const RSM: &str = "urn:un:unece:uncefact:data:standard:CrossIndustryInvoice:100";
    pub const RAM: &str =
        "urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:100";
    pub const QDT: &str = "urn:un:unece:uncefact:data:standard:QualifiedDataType:100";
    pub const UDT: &str = "urn:un:unece:uncefact:data:standard:UnqualifiedDataType:100";
}
