use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ConvertError;
use super::types::Invoice;

/// Schema URL of a canonical envelope.
pub const ENVELOPE_SCHEMA: &str = "https://gobl.org/draft-0/envelope";

/// Schema URL of a canonical invoice document.
pub const INVOICE_SCHEMA: &str = "https://gobl.org/draft-0/bill/invoice";

/// Canonical envelope wrapping a single document.
///
/// The header is carried through untouched; only the document is mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "$schema", default = "default_schema")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Value>,
    pub doc: Value,
}

fn default_schema() -> String {
    ENVELOPE_SCHEMA.to_string()
}

impl Envelope {
    /// Parse an envelope from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, ConvertError> {
        serde_json::from_slice(data)
            .map_err(|e| ConvertError::MalformedInput(format!("parsing input as envelope: {e}")))
    }

    /// Wrap an invoice, tagging the document with the invoice schema.
    pub fn from_invoice(invoice: &Invoice) -> Result<Self, ConvertError> {
        let mut doc = serde_json::to_value(invoice)
            .map_err(|e| ConvertError::MalformedInput(format!("encoding invoice: {e}")))?;
        if let Value::Object(map) = &mut doc {
            map.insert("$schema".into(), Value::String(INVOICE_SCHEMA.into()));
        }
        Ok(Self {
            schema: default_schema(),
            head: None,
            doc,
        })
    }

    /// The `$schema` of the wrapped document, if any.
    pub fn doc_schema(&self) -> Option<&str> {
        self.doc.get("$schema").and_then(Value::as_str)
    }

    /// Extract the invoice held by this envelope.
    ///
    /// Fails with [`ConvertError::TypeMismatch`] when the document is not an
    /// invoice, and with [`ConvertError::MalformedInput`] when it is an invoice
    /// that does not decode.
    pub fn extract_invoice(&self) -> Result<Invoice, ConvertError> {
        match self.doc_schema() {
            Some(schema) if schema == INVOICE_SCHEMA || schema.ends_with("/bill/invoice") => {}
            Some(schema) => {
                return Err(ConvertError::TypeMismatch(format!(
                    "envelope document is '{schema}', expected an invoice"
                )));
            }
            None => {
                return Err(ConvertError::TypeMismatch(
                    "envelope document has no schema, expected an invoice".into(),
                ));
            }
        }
        Invoice::deserialize(&self.doc)
            .map_err(|e| ConvertError::MalformedInput(format!("parsing invoice document: {e}")))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, ConvertError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| ConvertError::MalformedInput(format!("generating JSON output: {e}")))
    }
}
