//! Code resolvers: canonical keys → regulatory code-list values.
//!
//! Every resolver is a pure function. Tables are `match` expressions with an
//! explicit fallback arm.

use serde::{Deserialize, Serialize};

use super::error::ConvertError;
use super::types::{
    EXT_PAYMENT_MEANS, Instructions, Invoice, InvoiceType, RateKey, TAG_SELF_BILLED, TaxCategoryKey,
};

/// UNTDID 5305: tax category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategoryCode {
    /// S: Standard rate.
    StandardRate,
    /// Z: Zero rated goods.
    ZeroRated,
    /// E: Exempt from tax.
    Exempt,
    /// AE: VAT reverse charge.
    ReverseCharge,
    /// K: Intra-community supply, no VAT shown.
    IntraCommunitySupply,
    /// G: Free export item, tax not charged.
    Export,
    /// O: Services outside scope of tax.
    OutsideScope,
    /// L: Canary Islands general indirect tax (IGIC).
    CanaryIslands,
    /// M: Ceuta and Melilla tax (IPSI).
    CeutaMelilla,
}

impl TaxCategoryCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StandardRate => "S",
            Self::ZeroRated => "Z",
            Self::Exempt => "E",
            Self::ReverseCharge => "AE",
            Self::IntraCommunitySupply => "K",
            Self::Export => "G",
            Self::OutsideScope => "O",
            Self::CanaryIslands => "L",
            Self::CeutaMelilla => "M",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Self::StandardRate),
            "Z" => Some(Self::ZeroRated),
            "E" => Some(Self::Exempt),
            "AE" => Some(Self::ReverseCharge),
            "K" => Some(Self::IntraCommunitySupply),
            "G" => Some(Self::Export),
            "O" => Some(Self::OutsideScope),
            "L" => Some(Self::CanaryIslands),
            "M" => Some(Self::CeutaMelilla),
            _ => None,
        }
    }

    /// Canonical (category, rate) keys for a code read from XML.
    ///
    /// Codes without a canonical rate key keep the VAT category and no rate.
    pub fn canonical_keys(&self) -> (TaxCategoryKey, Option<RateKey>) {
        match self {
            Self::StandardRate => (TaxCategoryKey::Vat, Some(RateKey::Standard)),
            Self::ZeroRated => (TaxCategoryKey::Vat, Some(RateKey::Zero)),
            Self::Exempt => (TaxCategoryKey::Vat, Some(RateKey::Exempt)),
            Self::CanaryIslands => (TaxCategoryKey::Igic, None),
            Self::CeutaMelilla => (TaxCategoryKey::Ipsi, None),
            Self::ReverseCharge
            | Self::IntraCommunitySupply
            | Self::Export
            | Self::OutsideScope => (TaxCategoryKey::Vat, None),
        }
    }
}

/// Resolve the tax category code for a rate and category key.
///
/// The rate key wins over the category: a `standard` rate is `S` even for
/// IGIC. The category only decides when the rate is none of standard, zero
/// or exempt.
pub fn tax_category_code(rate: Option<RateKey>, category: TaxCategoryKey) -> TaxCategoryCode {
    match rate {
        Some(RateKey::Standard) => return TaxCategoryCode::StandardRate,
        Some(RateKey::Zero) => return TaxCategoryCode::ZeroRated,
        Some(RateKey::Exempt) => return TaxCategoryCode::Exempt,
        _ => {}
    }
    match category {
        TaxCategoryKey::Igic => TaxCategoryCode::CanaryIslands,
        TaxCategoryKey::Ipsi => TaxCategoryCode::CeutaMelilla,
        _ => TaxCategoryCode::StandardRate,
    }
}

/// UNTDID 1001 document type code for an invoice.
///
/// Self-billed standard invoices are `389`. Types outside the supported set
/// (`proforma`, `debit-note`, `other`) are rejected.
pub fn invoice_type_code(invoice: &Invoice) -> Result<&'static str, ConvertError> {
    if is_self_billed(invoice) {
        return Ok("389");
    }
    match invoice.invoice_type {
        InvoiceType::Standard => Ok("380"),
        InvoiceType::Corrective => Ok("384"),
        InvoiceType::CreditNote => Ok("381"),
        other => Err(ConvertError::UnmappedCode {
            field: "invoice type",
            value: other.to_string(),
        }),
    }
}

fn is_self_billed(invoice: &Invoice) -> bool {
    invoice.invoice_type == InvoiceType::Standard && invoice.has_tag(TAG_SELF_BILLED)
}

/// Invoice type and tags for a UNTDID 1001 code read from XML.
pub fn invoice_type_from_code(code: &str) -> Result<(InvoiceType, Vec<String>), ConvertError> {
    match code.trim() {
        "380" => Ok((InvoiceType::Standard, Vec::new())),
        "381" => Ok((InvoiceType::CreditNote, Vec::new())),
        "384" => Ok((InvoiceType::Corrective, Vec::new())),
        "389" => Ok((InvoiceType::Standard, vec![TAG_SELF_BILLED.to_string()])),
        other => Err(ConvertError::UnmappedCode {
            field: "type code",
            value: other.to_string(),
        }),
    }
}

/// UNTDID 4461 code for an undefined payment instrument.
pub const PAYMENT_MEANS_NOT_DEFINED: &str = "1";

/// UNTDID 4461 payment means code for the payment instructions.
///
/// An explicit `untdid-payment-means` extension takes priority over the
/// means key. Anything that is not a valid 4461 code becomes
/// [`PAYMENT_MEANS_NOT_DEFINED`].
pub fn payment_means_code(instructions: Option<&Instructions>) -> String {
    let Some(instructions) = instructions else {
        return PAYMENT_MEANS_NOT_DEFINED.to_string();
    };
    let code = instructions
        .ext
        .get(EXT_PAYMENT_MEANS)
        .map(|c| c.trim().to_string())
        .or_else(|| means_key_code(&instructions.key).map(str::to_string));

    match code {
        Some(code) if is_valid_payment_means_code(&code) => code,
        other => {
            tracing::trace!(key = %instructions.key, code = ?other, "payment means defaulted");
            PAYMENT_MEANS_NOT_DEFINED.to_string()
        }
    }
}

fn means_key_code(key: &str) -> Option<&'static str> {
    match key {
        "any" => Some("1"),
        "cash" => Some("10"),
        "cheque" => Some("20"),
        "credit-transfer" => Some("30"),
        "debit-transfer" => Some("31"),
        "card" => Some("48"),
        "direct-debit" => Some("49"),
        "credit-transfer+sepa" => Some("58"),
        "direct-debit+sepa" => Some("59"),
        "online" => Some("68"),
        "other" => Some("ZZZ"),
        _ => None,
    }
}

/// Canonical means key for a 4461 code read from XML.
pub fn means_key_for_code(code: &str) -> &'static str {
    match code.trim() {
        "10" => "cash",
        "20" => "cheque",
        "30" | "42" => "credit-transfer",
        "31" => "debit-transfer",
        "48" | "54" | "55" => "card",
        "49" => "direct-debit",
        "58" => "credit-transfer+sepa",
        "59" => "direct-debit+sepa",
        "68" => "online",
        "ZZZ" => "other",
        _ => "any",
    }
}

/// Whether `code` is a UNTDID 4461 payment means code accepted by XRechnung:
/// `1`–`70`, `74`–`78`, `91`–`97` or `ZZZ`.
pub fn is_valid_payment_means_code(code: &str) -> bool {
    if code == "ZZZ" {
        return true;
    }
    match code.parse::<u16>() {
        Ok(n) => matches!(n, 1..=70 | 74..=78 | 91..=97),
        Err(_) => false,
    }
}
