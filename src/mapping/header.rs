use super::DateTimeString;
use crate::core::codes::invoice_type_code;
use crate::core::{ConvertError, Invoice};

/// `rsm:ExchangedDocument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: String,
    /// UNTDID 1001 document type.
    pub type_code: &'static str,
    pub issue_date: DateTimeString,
}

impl Header {
    pub fn new(invoice: &Invoice) -> Result<Self, ConvertError> {
        Ok(Self {
            id: invoice_number(invoice.series.as_deref(), &invoice.code),
            type_code: invoice_type_code(invoice)?,
            issue_date: DateTimeString::new(invoice.issue_date),
        })
    }
}

/// `series-code`, or just `code` when the series is empty.
pub fn invoice_number(series: Option<&str>, code: &str) -> String {
    match series {
        Some(series) if !series.is_empty() => format!("{series}-{code}"),
        _ => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceType, TAG_SELF_BILLED};
    use chrono::NaiveDate;

    #[test]
    fn number_with_and_without_series() {
        assert_eq!(invoice_number(Some("SAMPLE"), "001"), "SAMPLE-001");
        assert_eq!(invoice_number(Some(""), "001"), "001");
        assert_eq!(invoice_number(None, "001"), "001");
    }

    #[test]
    fn header_from_invoice() {
        let invoice = Invoice {
            series: Some("SAMPLE".into()),
            code: "001".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 2, 13),
            ..Default::default()
        };
        let header = Header::new(&invoice).unwrap();
        assert_eq!(header.id, "SAMPLE-001");
        assert_eq!(header.type_code, "380");
        assert_eq!(header.issue_date.value, "20240213");
        assert_eq!(header.issue_date.format, "102");
    }

    #[test]
    fn self_billed_header() {
        let invoice = Invoice {
            code: "SB-1".into(),
            tags: vec![TAG_SELF_BILLED.into()],
            ..Default::default()
        };
        let header = Header::new(&invoice).unwrap();
        assert_eq!(header.type_code, "389");
        assert_eq!(header.issue_date.value, "");
    }

    #[test]
    fn debit_note_is_rejected() {
        let invoice = Invoice {
            code: "D-1".into(),
            invoice_type: InvoiceType::DebitNote,
            ..Default::default()
        };
        assert!(Header::new(&invoice).is_err());
    }
}
