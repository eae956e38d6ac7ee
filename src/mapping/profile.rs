use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Document;
use crate::core::ConvertError;

/// XRechnung 3.0 guideline (BT-24).
pub const XRECHNUNG_GUIDELINE: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:xeinkauf.de:kosit:xrechnung_3.0";

/// Factur-X / ZUGFeRD EXTENDED guideline (BT-24).
pub const FACTURX_GUIDELINE: &str =
    "urn:cen.eu:en16931:2017#conformant#urn:factur-x.eu:1p0:extended";

/// Peppol BIS Billing 3.0 business process (BT-23), required by XRechnung.
pub const PEPPOL_BUSINESS_PROCESS: &str = "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0";

/// Regulatory profile a document is declared conformant to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    #[serde(rename = "xrechnung")]
    XRechnung,
    #[serde(rename = "facturx")]
    FacturX,
    Zugferd,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::XRechnung, Dialect::FacturX, Dialect::Zugferd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XRechnung => "xrechnung",
            Self::FacturX => "facturx",
            Self::Zugferd => "zugferd",
        }
    }

    /// Guideline identifier. Factur-X and ZUGFeRD currently share one.
    pub fn guideline(&self) -> &'static str {
        match self {
            Self::XRechnung => XRECHNUNG_GUIDELINE,
            Self::FacturX | Self::Zugferd => FACTURX_GUIDELINE,
        }
    }

    pub fn business_process(&self) -> Option<&'static str> {
        match self {
            Self::XRechnung => Some(PEPPOL_BUSINESS_PROCESS),
            Self::FacturX | Self::Zugferd => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                ConvertError::UnrecognizedFormat(format!(
                    "invalid format {s:?} - must be one of: xrechnung, facturx, zugferd"
                ))
            })
    }
}

impl Document {
    /// Declare the document conformant to `dialect`.
    ///
    /// Sets the guideline and replaces the business process identifier, so
    /// applying a second profile leaves no trace of the first.
    pub fn with_profile(mut self, dialect: Dialect) -> Self {
        self.context.guideline = dialect.guideline().to_string();
        self.context.business = dialect.business_process().map(str::to_string);
        tracing::debug!(%dialect, guideline = %self.context.guideline, "profile applied");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::mapping::*;

    fn bare_document() -> Document {
        Document {
            context: ExchangedContext::default(),
            header: Header {
                id: "001".into(),
                type_code: "380",
                issue_date: DateTimeString::new(None),
            },
            transaction: Transaction {
                lines: Vec::new(),
                agreement: Agreement {
                    buyer_reference: NO_BUYER_REFERENCE.into(),
                    seller: Seller {
                        name: "S".into(),
                        contact: None,
                        address: PostalTradeAddress::default(),
                        email: None,
                        tax_registration: TaxRegistration {
                            id: "DE1".into(),
                            scheme_id: SCHEME_VAT,
                        },
                    },
                    buyer: Buyer {
                        id: None,
                        name: "B".into(),
                        address: PostalTradeAddress::default(),
                        email: None,
                    },
                },
                settlement: Settlement {
                    currency: "EUR".into(),
                    payment_means: PaymentMeans {
                        type_code: "1".into(),
                        payee_iban: None,
                    },
                    taxes: Vec::new(),
                    payment_terms: None,
                    summary: Summary {
                        line_total: "0".into(),
                        tax_basis_total: "0".into(),
                        tax_total: Amount {
                            value: "0".into(),
                            currency: "EUR".into(),
                        },
                        grand_total: "0".into(),
                        due_payable: "0".into(),
                    },
                    referenced_document: None,
                },
            },
        }
    }

    #[test]
    fn xrechnung_profile() {
        let doc = bare_document().with_profile(Dialect::XRechnung);
        assert_eq!(doc.context.guideline, XRECHNUNG_GUIDELINE);
        assert_eq!(
            doc.context.business.as_deref(),
            Some("urn:fdc:peppol.eu:2017:poacc:billing:01:1.0")
        );
    }

    #[test]
    fn facturx_and_zugferd_share_guideline() {
        let fx = bare_document().with_profile(Dialect::FacturX);
        let zf = bare_document().with_profile(Dialect::Zugferd);
        assert_eq!(fx.context, zf.context);
        assert_eq!(fx.context.guideline, FACTURX_GUIDELINE);
        assert_eq!(fx.context.business, None);
    }

    #[test]
    fn reapplying_clears_business_process() {
        let doc = bare_document()
            .with_profile(Dialect::XRechnung)
            .with_profile(Dialect::FacturX);
        assert_eq!(doc.context.business, None);
    }

    #[test]
    fn profile_leaves_body_untouched() {
        let before = bare_document();
        let after = before.clone().with_profile(Dialect::Zugferd);
        assert_eq!(before.header, after.header);
        assert_eq!(before.transaction, after.transaction);
    }

    #[test]
    fn parse_dialect() {
        assert_eq!("xrechnung".parse::<Dialect>().unwrap(), Dialect::XRechnung);
        assert_eq!("facturx".parse::<Dialect>().unwrap(), Dialect::FacturX);
        assert_eq!("zugferd".parse::<Dialect>().unwrap(), Dialect::Zugferd);

        let err = "ubl".parse::<Dialect>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedFormat);
        assert!(err.to_string().contains("xrechnung, facturx, zugferd"));
    }

    #[test]
    fn dialect_serde() {
        let json = serde_json::to_string(&Dialect::FacturX).unwrap();
        assert_eq!(json, "\"facturx\"");
        let d: Dialect = serde_json::from_str("\"xrechnung\"").unwrap();
        assert_eq!(d, Dialect::XRechnung);
    }
}
