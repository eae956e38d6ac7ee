//! Canonical invoice → dialect-neutral document tree.
//!
//! The tree mirrors the CII structure (`ExchangedDocumentContext`,
//! `ExchangedDocument`, `SupplyChainTradeTransaction`). Every leaf already
//! holds its rendered string, so the XML writers in [`crate::xml`] only walk
//! it and never make mapping decisions.
//!
//! # Example
//!
//! ```
//! use xinvoice::mapping::{Dialect, Document};
//! # fn run(invoice: &xinvoice::core::Invoice) -> Result<(), xinvoice::core::ConvertError> {
//! let doc = Document::new(invoice)?.with_profile(Dialect::XRechnung);
//! assert!(doc.context.business.is_some());
//! # Ok(())
//! # }
//! ```

mod header;
mod line;
mod party;
mod profile;
mod settlement;
mod transaction;

pub use header::*;
pub use line::*;
pub use party::*;
pub use profile::*;
pub use settlement::*;
pub use transaction::*;

use chrono::NaiveDate;

use crate::core::{ConvertError, Invoice, ResultExt};

/// `udt:DateTimeString` format discriminator for `YYYYMMDD`.
pub const ISSUE_DATE_FORMAT: &str = "102";

/// Guideline of a document that has not been given a profile yet (plain EN 16931).
pub const EN16931_GUIDELINE: &str = "urn:cen.eu:en16931:2017";

/// A complete document ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub context: ExchangedContext,
    pub header: Header,
    pub transaction: Transaction,
}

/// `rsm:ExchangedDocumentContext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangedContext {
    /// Business process identifier, only set for profiles that require one.
    pub business: Option<String>,
    pub guideline: String,
}

impl Default for ExchangedContext {
    fn default() -> Self {
        Self {
            business: None,
            guideline: EN16931_GUIDELINE.to_string(),
        }
    }
}

/// A date rendered as `udt:DateTimeString` with its format attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeString {
    pub value: String,
    pub format: &'static str,
}

impl DateTimeString {
    /// `YYYYMMDD`, or an empty value when the date is unset.
    pub fn new(date: Option<NaiveDate>) -> Self {
        Self {
            value: date
                .map(|d| d.format("%Y%m%d").to_string())
                .unwrap_or_default(),
            format: ISSUE_DATE_FORMAT,
        }
    }
}

impl Document {
    /// Map a canonical invoice into a document with the default EN 16931 context.
    pub fn new(invoice: &Invoice) -> Result<Self, ConvertError> {
        let header = Header::new(invoice).context("mapping header")?;
        let transaction = Transaction::new(invoice)?;
        tracing::debug!(
            id = %header.id,
            type_code = header.type_code,
            lines = transaction.lines.len(),
            "document assembled"
        );
        Ok(Self {
            context: ExchangedContext::default(),
            header,
            transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_time_string_rendering() {
        let d = DateTimeString::new(NaiveDate::from_ymd_opt(2024, 2, 13));
        assert_eq!(d.value, "20240213");
        assert_eq!(d.format, "102");

        let empty = DateTimeString::new(None);
        assert_eq!(empty.value, "");
        assert_eq!(empty.format, "102");
    }
}
