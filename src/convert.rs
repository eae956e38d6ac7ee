use std::fmt;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Envelope, Invoice, ResultExt};
use crate::mapping::{Dialect, Document};
use crate::xml::{self, CII_ROOT, UBL_ROOT};

/// Target of a forward conversion: a dialect and the XML syntax it is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "xrechnung-cii")]
    XRechnungCii,
    #[serde(rename = "xrechnung-ubl")]
    XRechnungUbl,
    #[serde(rename = "facturx")]
    FacturX,
    #[serde(rename = "zugferd")]
    Zugferd,
}

/// XML syntax of a serialized invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Cii,
    Ubl,
}

impl Format {
    pub const ALL: [Format; 4] = [
        Format::XRechnungCii,
        Format::XRechnungUbl,
        Format::FacturX,
        Format::Zugferd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XRechnungCii => "xrechnung-cii",
            Self::XRechnungUbl => "xrechnung-ubl",
            Self::FacturX => "facturx",
            Self::Zugferd => "zugferd",
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::XRechnungCii | Self::XRechnungUbl => Dialect::XRechnung,
            Self::FacturX => Dialect::FacturX,
            Self::Zugferd => Dialect::Zugferd,
        }
    }

    pub fn syntax(&self) -> Syntax {
        match self {
            Self::XRechnungUbl => Syntax::Ubl,
            Self::XRechnungCii | Self::FacturX | Self::Zugferd => Syntax::Cii,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                ConvertError::UnrecognizedFormat(format!(
                    "invalid format {s:?} - must be one of: xrechnung-cii, xrechnung-ubl, facturx, zugferd"
                ))
            })
    }
}

/// What an input payload was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A canonical JSON envelope.
    Canonical,
    /// XML with a `CrossIndustryInvoice` root.
    Cii,
    /// XML with a UBL `Invoice` root.
    Ubl,
}

/// Classify a payload without converting it.
///
/// A payload is canonical only if the whole of it parses as JSON; leading
/// bytes are never sniffed.
pub fn detect(data: &[u8]) -> Result<InputKind, ConvertError> {
    if serde_json::from_slice::<serde_json::Value>(data).is_ok() {
        return Ok(InputKind::Canonical);
    }
    let root = extract_root_name(data)?;
    match root.as_str() {
        CII_ROOT => Ok(InputKind::Cii),
        UBL_ROOT => Ok(InputKind::Ubl),
        other => Err(ConvertError::UnrecognizedFormat(format!(
            "unsupported XML root element {other:?}"
        ))),
    }
}

/// Local name of the first element in an XML document.
pub fn extract_root_name(data: &[u8]) -> Result<String, ConvertError> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(ConvertError::MalformedInput(
                    "no root element found in XML".into(),
                ));
            }
            Err(e) => {
                return Err(ConvertError::MalformedInput(format!("parsing XML: {e}")));
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Convert a payload in either direction.
///
/// Canonical JSON is mapped to the XML named by `format`, which is then
/// required. XML (CII or UBL) is parsed back into a pretty-printed canonical
/// envelope, and `format` is ignored.
pub fn convert(data: &[u8], format: Option<&str>) -> Result<Vec<u8>, ConvertError> {
    let kind = detect(data)?;
    tracing::debug!(?kind, format, "converting payload");

    match kind {
        InputKind::Canonical => {
            let format: Format = format
                .ok_or_else(|| {
                    ConvertError::UnrecognizedFormat(
                        "no format given - must be one of: xrechnung-cii, xrechnung-ubl, facturx, zugferd"
                            .into(),
                    )
                })?
                .parse()?;
            let invoice = Envelope::from_slice(data)?.extract_invoice()?;
            Ok(to_xml(&invoice, format)?.into_bytes())
        }
        InputKind::Cii | InputKind::Ubl => to_canonical(data)?.to_json(),
    }
}

/// Map an invoice and apply the profile of `format`.
pub fn document_for(invoice: &Invoice, format: Format) -> Result<Document, ConvertError> {
    Ok(Document::new(invoice)?.with_profile(format.dialect()))
}

/// Map an invoice and serialize it in the syntax of `format`.
pub fn to_xml(invoice: &Invoice, format: Format) -> Result<String, ConvertError> {
    let doc = document_for(invoice, format).context("converting to document")?;
    let xml = match format.syntax() {
        Syntax::Cii => xml::to_cii_xml(&doc),
        Syntax::Ubl => xml::to_ubl_xml(&doc),
    }
    .context("generating XML")?;
    tracing::debug!(%format, bytes = xml.len(), "document serialized");
    Ok(xml)
}

/// Parse CII or UBL XML into a canonical envelope.
pub fn to_canonical(data: &[u8]) -> Result<Envelope, ConvertError> {
    let root = extract_root_name(data)?;
    let text = std::str::from_utf8(data)
        .map_err(|e| ConvertError::MalformedInput(format!("XML is not UTF-8: {e}")))?;
    tracing::debug!(root = %root, "parsing XML");

    let invoice = match root.as_str() {
        CII_ROOT => xml::from_cii_xml(text).context("parsing CII")?,
        UBL_ROOT => xml::from_ubl_xml(text).context("parsing UBL")?,
        other => {
            return Err(ConvertError::UnrecognizedFormat(format!(
                "unsupported XML root element {other:?}"
            )));
        }
    };
    Envelope::from_invoice(&invoice)
}

/// XRechnung in CII syntax.
pub fn to_xrechnung_cii(invoice: &Invoice) -> Result<String, ConvertError> {
    to_xml(invoice, Format::XRechnungCii)
}

/// XRechnung in UBL syntax.
pub fn to_xrechnung_ubl(invoice: &Invoice) -> Result<String, ConvertError> {
    to_xml(invoice, Format::XRechnungUbl)
}

/// Factur-X (CII).
pub fn to_facturx(invoice: &Invoice) -> Result<String, ConvertError> {
    to_xml(invoice, Format::FacturX)
}

/// ZUGFeRD (CII).
pub fn to_zugferd(invoice: &Invoice) -> Result<String, ConvertError> {
    to_xml(invoice, Format::Zugferd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn format_round_trips_through_strings() {
        for format in Format::ALL {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
            assert_eq!(
                serde_json::to_string(&format).unwrap(),
                format!("\"{format}\"")
            );
        }
    }

    #[test]
    fn unknown_format_names_valid_set() {
        let err = "ubl".parse::<Format>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedFormat);
        assert!(err.to_string().contains("xrechnung-cii, xrechnung-ubl, facturx, zugferd"));
    }

    #[test]
    fn format_selects_dialect_and_syntax() {
        assert_eq!(Format::XRechnungUbl.syntax(), Syntax::Ubl);
        assert_eq!(Format::XRechnungUbl.dialect(), Dialect::XRechnung);
        assert_eq!(Format::Zugferd.syntax(), Syntax::Cii);
        assert_eq!(Format::FacturX.dialect(), Dialect::FacturX);
    }

    #[test]
    fn detects_input_kinds() {
        assert_eq!(detect(br#"{"doc":{}}"#).unwrap(), InputKind::Canonical);
        assert_eq!(
            detect(b"<?xml version=\"1.0\"?><rsm:CrossIndustryInvoice xmlns:rsm=\"x\"/>").unwrap(),
            InputKind::Cii
        );
        assert_eq!(detect(b"<Invoice><ID>1</ID></Invoice>").unwrap(), InputKind::Ubl);
    }

    #[test]
    fn json_with_trailing_garbage_is_treated_as_xml() {
        let err = detect(br#"{"doc":{}} trailing"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn unknown_root_is_unrecognized() {
        let err = detect(b"<Order/>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedFormat);
        assert!(err.to_string().contains("Order"));
    }

    #[test]
    fn root_name_ignores_prefix_and_prolog() {
        let xml = b"<?xml version=\"1.0\"?>\n<!-- note -->\n<ubl:Invoice xmlns:ubl=\"x\"></ubl:Invoice>";
        assert_eq!(extract_root_name(xml).unwrap(), "Invoice");
    }

    #[test]
    fn empty_payload_has_no_root() {
        let err = extract_root_name(b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn canonical_input_requires_format() {
        let err = convert(br#"{"doc":{}}"#, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedFormat);
    }

    #[test]
    fn non_invoice_envelope_is_type_mismatch() {
        let data = br#"{"$schema":"https://gobl.org/draft-0/envelope","doc":{"$schema":"https://gobl.org/draft-0/note/message"}}"#;
        let err = convert(data, Some("xrechnung-cii")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
