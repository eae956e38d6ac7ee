use super::{DateTimeString, TAX_TYPE_VAT, invoice_number};
use crate::core::codes::{payment_means_code, tax_category_code};
use crate::core::{CategoryTotal, ConvertError, Invoice, RateTotal, TaxTotal};

/// `ram:ApplicableHeaderTradeSettlement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub currency: String,
    pub payment_means: PaymentMeans,
    pub taxes: Vec<Tax>,
    pub payment_terms: Option<String>,
    pub summary: Summary,
    pub referenced_document: Option<ReferencedDocument>,
}

/// `ram:SpecifiedTradeSettlementPaymentMeans`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMeans {
    /// UNTDID 4461.
    pub type_code: String,
    pub payee_iban: Option<String>,
}

/// Header-level `ram:ApplicableTradeTax`, one per (category, rate) total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tax {
    pub calculated_amount: String,
    pub type_code: &'static str,
    pub basis_amount: String,
    pub category_code: &'static str,
    pub rate_percent: String,
}

/// `ram:SpecifiedTradeSettlementHeaderMonetarySummation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub line_total: String,
    pub tax_basis_total: String,
    pub tax_total: Amount,
    pub grand_total: String,
    pub due_payable: String,
}

/// An amount carrying its currency attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

/// `ram:InvoiceReferencedDocument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedDocument {
    pub issuer_assigned_id: String,
    pub issue_date: DateTimeString,
}

impl Settlement {
    pub fn new(invoice: &Invoice) -> Result<Self, ConvertError> {
        let totals = invoice
            .totals
            .as_ref()
            .ok_or_else(|| ConvertError::missing("Totals"))?;
        let taxes = new_taxes(totals.taxes.as_ref())?;

        let payment = invoice.payment.as_ref();
        let instructions = payment.and_then(|p| p.instructions.as_ref());
        let payee_iban = instructions
            .and_then(|i| i.credit_transfer.first())
            .and_then(|ct| ct.iban.clone())
            .filter(|iban| !iban.trim().is_empty());

        let referenced_document = invoice.preceding.first().map(|doc| ReferencedDocument {
            issuer_assigned_id: invoice_number(doc.series.as_deref(), &doc.code),
            issue_date: DateTimeString::new(doc.issue_date),
        });

        Ok(Self {
            currency: invoice.currency.clone(),
            payment_means: PaymentMeans {
                type_code: payment_means_code(instructions),
                payee_iban,
            },
            taxes,
            payment_terms: payment
                .and_then(|p| p.terms.as_ref())
                .and_then(|t| t.detail.clone())
                .filter(|d| !d.is_empty()),
            summary: Summary {
                line_total: totals.total.to_string(),
                tax_basis_total: totals.total.to_string(),
                tax_total: Amount {
                    value: totals.tax.to_string(),
                    currency: invoice.currency.clone(),
                },
                grand_total: totals.total_with_tax.to_string(),
                due_payable: totals.payable.to_string(),
            },
            referenced_document,
        })
    }
}

/// One tax record per rate of every category, in category order.
pub fn new_taxes(total: Option<&TaxTotal>) -> Result<Vec<Tax>, ConvertError> {
    let total = total.ok_or_else(|| ConvertError::missing("Total taxes"))?;
    let mut taxes = Vec::new();
    for category in &total.categories {
        for rate in &category.rates {
            taxes.push(new_tax(category, rate)?);
        }
    }
    Ok(taxes)
}

fn new_tax(category: &CategoryTotal, rate: &RateTotal) -> Result<Tax, ConvertError> {
    let percent = rate
        .percent
        .ok_or_else(|| ConvertError::missing("Tax rate percent"))?;
    Ok(Tax {
        calculated_amount: rate.amount.to_string(),
        type_code: TAX_TYPE_VAT,
        basis_amount: rate.base.to_string(),
        category_code: tax_category_code(rate.key, category.code).code(),
        rate_percent: percent.without_symbol(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use rust_decimal_macros::dec;

    fn totals() -> Totals {
        Totals {
            sum: dec!(1800.00),
            total: dec!(1800.00),
            taxes: Some(TaxTotal {
                categories: vec![CategoryTotal {
                    code: TaxCategoryKey::Vat,
                    rates: vec![RateTotal {
                        key: Some(RateKey::Standard),
                        base: dec!(1800.00),
                        percent: Some(Percentage::new(dec!(19.0))),
                        amount: dec!(342.00),
                    }],
                    amount: dec!(342.00),
                }],
                sum: dec!(342.00),
            }),
            tax: dec!(342.00),
            total_with_tax: dec!(2142.00),
            payable: dec!(2142.00),
        }
    }

    fn invoice() -> Invoice {
        Invoice {
            code: "001".into(),
            currency: "EUR".into(),
            totals: Some(totals()),
            ..Default::default()
        }
    }

    #[test]
    fn summary_mirrors_totals() {
        let s = Settlement::new(&invoice()).unwrap();
        assert_eq!(s.currency, "EUR");
        assert_eq!(s.summary.line_total, "1800.00");
        assert_eq!(s.summary.tax_basis_total, "1800.00");
        assert_eq!(s.summary.tax_total.value, "342.00");
        assert_eq!(s.summary.tax_total.currency, "EUR");
        assert_eq!(s.summary.grand_total, "2142.00");
        assert_eq!(s.summary.due_payable, "2142.00");
        assert_eq!(s.payment_means.type_code, "1");
        assert_eq!(s.payment_terms, None);
        assert_eq!(s.referenced_document, None);

        assert_eq!(s.taxes.len(), 1);
        assert_eq!(s.taxes[0].calculated_amount, "342.00");
        assert_eq!(s.taxes[0].basis_amount, "1800.00");
        assert_eq!(s.taxes[0].category_code, "S");
        assert_eq!(s.taxes[0].rate_percent, "19.0");
    }

    #[test]
    fn totals_are_not_recomputed() {
        let mut inv = invoice();
        if let Some(t) = inv.totals.as_mut() {
            t.payable = dec!(1.23);
        }
        let s = Settlement::new(&inv).unwrap();
        assert_eq!(s.summary.due_payable, "1.23");
        assert_eq!(s.summary.grand_total, "2142.00");
    }

    #[test]
    fn zero_rate_category() {
        let mut inv = invoice();
        if let Some(taxes) = inv.totals.as_mut().and_then(|t| t.taxes.as_mut()) {
            let rate = &mut taxes.categories[0].rates[0];
            rate.key = Some(RateKey::Zero);
            rate.percent = Some(Percentage::new(dec!(0)));
        }
        let s = Settlement::new(&inv).unwrap();
        assert_eq!(s.taxes[0].category_code, "Z");
        assert_eq!(s.taxes[0].rate_percent, "0");
    }

    #[test]
    fn missing_percent_fails() {
        let mut inv = invoice();
        if let Some(taxes) = inv.totals.as_mut().and_then(|t| t.taxes.as_mut()) {
            taxes.categories[0].rates[0].percent = None;
        }
        let err = Settlement::new(&inv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    }

    #[test]
    fn missing_totals_fail() {
        let mut inv = invoice();
        inv.totals = None;
        assert_eq!(
            Settlement::new(&inv).unwrap_err().to_string(),
            "Totals not found"
        );

        let mut inv = invoice();
        if let Some(t) = inv.totals.as_mut() {
            t.taxes = None;
        }
        assert_eq!(
            Settlement::new(&inv).unwrap_err().to_string(),
            "Total taxes not found"
        );
    }

    #[test]
    fn payment_terms_and_iban() {
        let mut inv = invoice();
        inv.payment = Some(Payment {
            terms: Some(Terms {
                key: None,
                detail: Some("lorem ipsum".into()),
            }),
            instructions: Some(Instructions {
                key: "credit-transfer+sepa".into(),
                credit_transfer: vec![CreditTransfer {
                    iban: Some("DE75512108001245126199".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        });
        let s = Settlement::new(&inv).unwrap();
        assert_eq!(s.payment_terms.as_deref(), Some("lorem ipsum"));
        assert_eq!(s.payment_means.type_code, "58");
        assert_eq!(
            s.payment_means.payee_iban.as_deref(),
            Some("DE75512108001245126199")
        );
    }

    #[test]
    fn referenced_document_from_preceding() {
        let mut inv = invoice();
        inv.preceding = vec![DocumentReference {
            series: Some("SAMPLE".into()),
            code: "001".into(),
            issue_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 13),
        }];
        let doc = Settlement::new(&inv).unwrap().referenced_document.unwrap();
        assert_eq!(doc.issuer_assigned_id, "SAMPLE-001");
        assert_eq!(doc.issue_date.value, "20240213");
        assert_eq!(doc.issue_date.format, "102");
    }
}
