//! Syntax-neutral capture of a parsed XML invoice and its conversion into
//! the canonical model. The CII and UBL readers fill these structs while
//! walking the element path; neither reader builds canonical types itself.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::codes::{TaxCategoryCode, invoice_type_from_code, means_key_for_code};
use crate::core::units::{UNIT_ONE, unit_key};
use crate::core::*;
use crate::mapping::NO_BUYER_REFERENCE;

#[derive(Debug, Default)]
pub(crate) struct ParsedInvoice {
    pub number: Option<String>,
    pub type_code: Option<String>,
    pub issue_date: Option<String>,
    pub currency: Option<String>,
    pub buyer_reference: Option<String>,

    pub seller: ParsedParty,
    pub buyer: ParsedParty,

    pub lines: Vec<ParsedLine>,
    pub current_line: Option<ParsedLine>,

    pub means_code: Option<String>,
    pub payee_iban: Option<String>,
    pub payment_terms: Option<String>,

    pub preceding: Vec<ParsedReference>,
    pub current_preceding: Option<ParsedReference>,

    pub breakdown: Vec<ParsedTax>,
    pub current_breakdown: Option<ParsedTax>,

    pub line_total: Option<String>,
    pub tax_basis_total: Option<String>,
    pub tax_total: Option<String>,
    pub grand_total: Option<String>,
    pub due_payable: Option<String>,

    // Temp state
    pub current_scheme_id: Option<String>,
    pub current_unit_code: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedParty {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedLine {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub price: Option<String>,
    pub total: Option<String>,
    pub taxes: Vec<ParsedTax>,
    pub current_tax: Option<ParsedTax>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ParsedTax {
    pub category_code: Option<String>,
    pub percent: Option<String>,
    pub basis: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedReference {
    pub id: Option<String>,
    pub issue_date: Option<String>,
}

/// Date layout of the syntax being read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DateLayout {
    /// `YYYYMMDD` (CII format 102).
    Compact,
    /// `YYYY-MM-DD` (UBL).
    Iso,
}

impl DateLayout {
    fn parse(self, s: &str) -> Result<NaiveDate, ConvertError> {
        let fmt = match self {
            Self::Compact => "%Y%m%d",
            Self::Iso => "%Y-%m-%d",
        };
        NaiveDate::parse_from_str(s.trim(), fmt)
            .map_err(|e| ConvertError::MalformedInput(format!("invalid date '{s}': {e}")))
    }
}

fn parse_decimal(field: &str, s: &str) -> Result<Decimal, ConvertError> {
    Decimal::from_str(s.trim())
        .map_err(|e| ConvertError::MalformedInput(format!("invalid {field} '{s}': {e}")))
}

fn parse_opt_decimal(field: &str, s: Option<&str>) -> Result<Option<Decimal>, ConvertError> {
    s.map(|s| parse_decimal(field, s)).transpose()
}

fn parse_percent(s: &str) -> Result<Percentage, ConvertError> {
    parse_decimal("tax percent", s).map(Percentage::new)
}

impl ParsedTax {
    fn keys(&self) -> (TaxCategoryKey, Option<RateKey>) {
        self.category_code
            .as_deref()
            .and_then(|c| TaxCategoryCode::from_code(c.trim()))
            .map(|c| c.canonical_keys())
            .unwrap_or((TaxCategoryKey::Vat, None))
    }

    fn into_combo(self) -> Result<TaxCombo, ConvertError> {
        let (cat, rate) = self.keys();
        Ok(TaxCombo {
            cat,
            rate,
            percent: self.percent.as_deref().map(parse_percent).transpose()?,
        })
    }
}

impl ParsedParty {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tax_id.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.postcode.is_none()
            && self.country.is_none()
    }

    fn into_party(self) -> Option<Party> {
        if self.is_empty() {
            return None;
        }
        let has_address = self.street.is_some()
            || self.city.is_some()
            || self.postcode.is_some()
            || self.country.is_some();
        let addresses = if has_address {
            vec![Address {
                num: None,
                street: self.street,
                locality: self.city.unwrap_or_default(),
                code: self.postcode.unwrap_or_default(),
                country: self.country.unwrap_or_default(),
            }]
        } else {
            Vec::new()
        };

        let emails = self
            .email
            .or(self.contact_email)
            .map(|addr| vec![Email { addr }])
            .unwrap_or_default();

        let people = self
            .contact_name
            .map(|full| {
                let (given, surname) = full.trim().split_once(' ').unwrap_or((full.trim(), ""));
                vec![Person {
                    name: Name {
                        given: given.to_string(),
                        surname: surname.trim().to_string(),
                    },
                }]
            })
            .unwrap_or_default();

        Some(Party {
            name: self.name.unwrap_or_default(),
            tax_id: self.tax_id.as_deref().map(TaxIdentity::parse),
            addresses,
            emails,
            telephones: self
                .contact_phone
                .map(|num| vec![Telephone { num }])
                .unwrap_or_default(),
            people,
        })
    }
}

impl ParsedLine {
    fn into_line(self, index: usize) -> Result<Line, ConvertError> {
        let total = parse_opt_decimal("line total", self.total.as_deref())?.unwrap_or_default();
        let unit = self
            .unit
            .filter(|u| u != UNIT_ONE)
            .map(|code| unit_key(&code).map(str::to_string).unwrap_or(code));
        Ok(Line {
            i: index,
            quantity: parse_opt_decimal("quantity", self.quantity.as_deref())?
                .unwrap_or(Decimal::ONE),
            item: Some(Item {
                name: self.name.unwrap_or_default(),
                price: parse_opt_decimal("price", self.price.as_deref())?.unwrap_or_default(),
                unit,
            }),
            taxes: self
                .taxes
                .into_iter()
                .map(ParsedTax::into_combo)
                .collect::<Result<_, _>>()?,
            sum: None,
            total,
        })
    }
}

/// Group the header tax breakdown by category, keeping document order.
fn tax_total(breakdown: Vec<ParsedTax>) -> Result<TaxTotal, ConvertError> {
    let mut categories: Vec<CategoryTotal> = Vec::new();
    for bd in breakdown {
        let (code, key) = bd.keys();
        let rate = RateTotal {
            key,
            base: parse_opt_decimal("tax basis", bd.basis.as_deref())?.unwrap_or_default(),
            percent: bd.percent.as_deref().map(parse_percent).transpose()?,
            amount: parse_opt_decimal("tax amount", bd.amount.as_deref())?.unwrap_or_default(),
        };
        match categories.iter_mut().find(|c| c.code == code) {
            Some(category) => {
                category.amount = add_amounts("category tax amount", category.amount, rate.amount)?;
                category.rates.push(rate);
            }
            None => categories.push(CategoryTotal {
                code,
                amount: rate.amount,
                rates: vec![rate],
            }),
        }
    }
    let sum = categories
        .iter()
        .try_fold(Decimal::ZERO, |acc, c| add_amounts("tax sum", acc, c.amount))?;
    Ok(TaxTotal { categories, sum })
}

fn add_amounts(what: &str, a: Decimal, b: Decimal) -> Result<Decimal, ConvertError> {
    a.checked_add(b)
        .ok_or_else(|| ConvertError::MalformedInput(format!("{what} overflows")))
}

impl ParsedInvoice {
    /// Close the innermost open collection when its element ends.
    pub fn push_line(&mut self) {
        if let Some(line) = self.current_line.take() {
            self.lines.push(line);
        }
    }

    pub fn push_line_tax(&mut self) {
        if let Some(line) = self.current_line.as_mut() {
            if let Some(tax) = line.current_tax.take() {
                line.taxes.push(tax);
            }
        }
    }

    pub fn push_breakdown(&mut self) {
        if let Some(bd) = self.current_breakdown.take() {
            self.breakdown.push(bd);
        }
    }

    pub fn push_preceding(&mut self) {
        if let Some(reference) = self.current_preceding.take() {
            self.preceding.push(reference);
        }
    }

    pub fn into_invoice(self, dates: DateLayout) -> Result<Invoice, ConvertError> {
        let type_code = self.type_code.as_deref().unwrap_or("380");
        let (invoice_type, tags) = invoice_type_from_code(type_code)?;

        let issue_date = self
            .issue_date
            .as_deref()
            .map(|d| dates.parse(d))
            .transpose()?;

        let currency = self.currency.unwrap_or_else(|| "EUR".to_string());

        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| line.into_line(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let instructions = if self.means_code.is_some() || self.payee_iban.is_some() {
            let code = self.means_code.map(|c| c.trim().to_string());
            let mut ext = BTreeMap::new();
            if let Some(code) = &code {
                ext.insert(EXT_PAYMENT_MEANS.to_string(), code.clone());
            }
            Some(Instructions {
                key: means_key_for_code(code.as_deref().unwrap_or("")).to_string(),
                credit_transfer: self
                    .payee_iban
                    .map(|iban| {
                        vec![CreditTransfer {
                            iban: Some(iban),
                            ..Default::default()
                        }]
                    })
                    .unwrap_or_default(),
                ext,
            })
        } else {
            None
        };
        let terms = self.payment_terms.map(|detail| Terms {
            key: None,
            detail: Some(detail),
        });
        let payment = if instructions.is_some() || terms.is_some() {
            Some(Payment {
                terms,
                instructions,
            })
        } else {
            None
        };

        let preceding = self
            .preceding
            .into_iter()
            .filter_map(|r| r.id.map(|id| (id, r.issue_date)))
            .map(|(code, date)| {
                Ok(DocumentReference {
                    series: None,
                    code,
                    issue_date: date.as_deref().map(|d| dates.parse(d)).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, ConvertError>>()?;

        let ordering = self
            .buyer_reference
            .filter(|r| r != NO_BUYER_REFERENCE)
            .map(|code| Ordering { code: Some(code) });

        let has_totals = self.line_total.is_some()
            || self.tax_basis_total.is_some()
            || self.grand_total.is_some()
            || self.due_payable.is_some();
        let totals = if has_totals {
            let taxes = tax_total(self.breakdown)?;
            let sum = parse_opt_decimal("line total amount", self.line_total.as_deref())?
                .unwrap_or_default();
            let total = parse_opt_decimal("tax basis total", self.tax_basis_total.as_deref())?
                .unwrap_or(sum);
            let tax = parse_opt_decimal("tax total", self.tax_total.as_deref())?
                .unwrap_or(taxes.sum);
            let total_with_tax = match parse_opt_decimal("grand total", self.grand_total.as_deref())? {
                Some(grand) => grand,
                None => add_amounts("grand total", total, tax)?,
            };
            let payable = parse_opt_decimal("due payable", self.due_payable.as_deref())?
                .unwrap_or(total_with_tax);
            Some(Totals {
                sum,
                total,
                taxes: Some(taxes),
                tax,
                total_with_tax,
                payable,
            })
        } else {
            None
        };

        Ok(Invoice {
            tags,
            invoice_type,
            series: None,
            code: self.number.unwrap_or_default(),
            issue_date,
            currency,
            supplier: self.seller.into_party(),
            customer: self.buyer.into_party(),
            lines,
            ordering,
            payment,
            preceding,
            totals,
        })
    }
}

/// Text of a start or empty element's attribute, if present.
pub(crate) fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Local name (prefix stripped) of an element.
pub(crate) fn local_name(e: &quick_xml::events::BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn breakdown_groups_by_category() {
        let tax = |code: &str, percent: &str, basis: &str, amount: &str| ParsedTax {
            category_code: Some(code.into()),
            percent: Some(percent.into()),
            basis: Some(basis.into()),
            amount: Some(amount.into()),
        };
        let total = tax_total(vec![
            tax("S", "19", "100.00", "19.00"),
            tax("Z", "0", "50.00", "0.00"),
            tax("L", "7", "10.00", "0.70"),
        ])
        .unwrap();

        assert_eq!(total.categories.len(), 2);
        assert_eq!(total.categories[0].code, TaxCategoryKey::Vat);
        assert_eq!(total.categories[0].rates.len(), 2);
        assert_eq!(total.categories[0].rates[1].key, Some(RateKey::Zero));
        assert_eq!(total.categories[1].code, TaxCategoryKey::Igic);
        assert_eq!(total.sum, dec!(19.70));
    }

    #[test]
    fn contact_name_is_split_once() {
        let party = ParsedParty {
            name: Some("Provide One GmbH".into()),
            contact_name: Some("John van Doe".into()),
            ..Default::default()
        }
        .into_party()
        .unwrap();
        assert_eq!(party.people[0].name.given, "John");
        assert_eq!(party.people[0].name.surname, "van Doe");
        assert!(party.addresses.is_empty());
    }

    #[test]
    fn empty_party_is_none() {
        assert!(ParsedParty::default().into_party().is_none());
    }

    #[test]
    fn unit_codes_become_keys() {
        let line = ParsedLine {
            name: Some("Hours".into()),
            quantity: Some("2".into()),
            unit: Some("HUR".into()),
            ..Default::default()
        }
        .into_line(1)
        .unwrap();
        assert_eq!(line.item.unwrap().unit.as_deref(), Some("h"));

        let line = ParsedLine {
            unit: Some("C62".into()),
            ..Default::default()
        }
        .into_line(1)
        .unwrap();
        assert_eq!(line.item.unwrap().unit, None);
        assert_eq!(line.quantity, Decimal::ONE);
    }

    #[test]
    fn bad_decimal_is_malformed() {
        let err = ParsedLine {
            price: Some("ten".into()),
            ..Default::default()
        }
        .into_line(1)
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
