use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::ConvertError;
use super::types::*;

/// Builder for canonical invoices.
///
/// `build()` fills in line totals and the totals aggregate the same way a
/// canonical producer would: lines are grouped by (category, rate, percent)
/// in first-seen order and tax is rounded half-up to two places per group.
///
/// ```
/// use xinvoice::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("001", NaiveDate::from_ymd_opt(2024, 2, 13).unwrap())
///     .series("SAMPLE")
///     .supplier(PartyBuilder::new("Provide One GmbH")
///         .tax_id("DE", "111111125")
///         .address(AddressBuilder::new("Walldorf", "69190", "DE").build())
///         .build())
///     .customer(PartyBuilder::new("Sample Consumer")
///         .address(AddressBuilder::new("Berlin", "10115", "DE").build())
///         .build())
///     .add_line(LineBuilder::new("Development services", dec!(20), dec!(90.00))
///         .unit("h")
///         .tax(TaxCategoryKey::Vat, RateKey::Standard, dec!(19))
///         .build())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.totals.unwrap().payable, dec!(2142.00));
/// ```
pub struct InvoiceBuilder {
    code: String,
    series: Option<String>,
    issue_date: Option<NaiveDate>,
    invoice_type: InvoiceType,
    tags: Vec<String>,
    currency: String,
    supplier: Option<Party>,
    customer: Option<Party>,
    lines: Vec<Line>,
    ordering_code: Option<String>,
    payment_terms: Option<String>,
    instructions: Option<Instructions>,
    preceding: Vec<DocumentReference>,
}

impl InvoiceBuilder {
    pub fn new(code: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            code: code.into(),
            series: None,
            issue_date: Some(issue_date),
            invoice_type: InvoiceType::Standard,
            tags: Vec::new(),
            currency: "EUR".to_string(),
            supplier: None,
            customer: None,
            lines: Vec::new(),
            ordering_code: None,
            payment_terms: None,
            instructions: None,
            preceding: Vec::new(),
        }
    }

    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn invoice_type(mut self, invoice_type: InvoiceType) -> Self {
        self.invoice_type = invoice_type;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = code.into();
        self
    }

    pub fn supplier(mut self, party: Party) -> Self {
        self.supplier = Some(party);
        self
    }

    pub fn customer(mut self, party: Party) -> Self {
        self.customer = Some(party);
        self
    }

    pub fn add_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn ordering_code(mut self, code: impl Into<String>) -> Self {
        self.ordering_code = Some(code.into());
        self
    }

    pub fn payment_terms(mut self, detail: impl Into<String>) -> Self {
        self.payment_terms = Some(detail.into());
        self
    }

    pub fn payment_instructions(mut self, instructions: Instructions) -> Self {
        self.instructions = Some(instructions);
        self
    }

    /// Reference an earlier invoice, e.g. the one being corrected.
    pub fn preceding(
        mut self,
        series: Option<&str>,
        code: impl Into<String>,
        issue_date: Option<NaiveDate>,
    ) -> Self {
        self.preceding.push(DocumentReference {
            series: series.map(str::to_string),
            code: code.into(),
            issue_date,
        });
        self
    }

    /// Build the invoice and calculate its totals.
    pub fn build(self) -> Result<Invoice, ConvertError> {
        if self.code.trim().is_empty() {
            return Err(ConvertError::missing("Invoice code"));
        }
        if self.lines.len() > 10_000 {
            return Err(ConvertError::MalformedInput(
                "invoice cannot have more than 10,000 lines".into(),
            ));
        }

        let payment = if self.payment_terms.is_some() || self.instructions.is_some() {
            Some(Payment {
                terms: self.payment_terms.map(|detail| Terms {
                    key: None,
                    detail: Some(detail),
                }),
                instructions: self.instructions,
            })
        } else {
            None
        };

        let mut invoice = Invoice {
            tags: self.tags,
            invoice_type: self.invoice_type,
            series: self.series,
            code: self.code,
            issue_date: self.issue_date,
            currency: self.currency,
            supplier: self.supplier,
            customer: self.customer,
            lines: self.lines,
            ordering: self.ordering_code.map(|code| Ordering { code: Some(code) }),
            payment,
            preceding: self.preceding,
            totals: None,
        };
        calculate_totals(&mut invoice)?;
        Ok(invoice)
    }
}

fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(what: &str) -> ConvertError {
    ConvertError::MalformedInput(format!("{what} overflows"))
}

fn add(what: &str, a: Decimal, b: Decimal) -> Result<Decimal, ConvertError> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

/// Fill in line totals and the invoice totals aggregate.
///
/// Fails when any amount leaves the range of `Decimal`.
pub fn calculate_totals(invoice: &mut Invoice) -> Result<(), ConvertError> {
    for (idx, line) in invoice.lines.iter_mut().enumerate() {
        line.i = idx + 1;
        if let Some(item) = &line.item {
            let amount = line
                .quantity
                .checked_mul(item.price)
                .ok_or_else(|| overflow(&format!("line {} amount", idx + 1)))?;
            let sum = round2(amount);
            line.sum = Some(sum);
            line.total = sum;
        }
    }

    let sum = invoice
        .lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| add("line sum", acc, l.total))?;

    let mut categories: Vec<CategoryTotal> = Vec::new();
    for line in &invoice.lines {
        for combo in &line.taxes {
            let idx = match categories.iter().position(|c| c.code == combo.cat) {
                Some(i) => i,
                None => {
                    categories.push(CategoryTotal {
                        code: combo.cat,
                        ..Default::default()
                    });
                    categories.len() - 1
                }
            };
            let category = &mut categories[idx];
            match category
                .rates
                .iter_mut()
                .find(|r| r.key == combo.rate && r.percent == combo.percent)
            {
                Some(rate) => rate.base = add("tax basis", rate.base, line.total)?,
                None => category.rates.push(RateTotal {
                    key: combo.rate,
                    base: line.total,
                    percent: combo.percent,
                    amount: Decimal::ZERO,
                }),
            }
        }
    }

    let mut tax = Decimal::ZERO;
    for category in &mut categories {
        for rate in &mut category.rates {
            let percent = rate.percent.map(|p| p.value()).unwrap_or(Decimal::ZERO);
            let amount = rate
                .base
                .checked_mul(percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(|| overflow("tax amount"))?;
            rate.amount = round2(amount);
            category.amount = add("category tax amount", category.amount, rate.amount)?;
        }
        tax = add("tax total", tax, category.amount)?;
    }

    let total_with_tax = add("grand total", sum, tax)?;
    invoice.totals = Some(Totals {
        sum,
        total: sum,
        taxes: Some(TaxTotal {
            categories,
            sum: tax,
        }),
        tax,
        total_with_tax,
        payable: total_with_tax,
    });
    Ok(())
}

/// Builder for a supplier or customer.
pub struct PartyBuilder {
    name: String,
    tax_id: Option<TaxIdentity>,
    addresses: Vec<Address>,
    emails: Vec<Email>,
    telephones: Vec<Telephone>,
    people: Vec<Person>,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_id: None,
            addresses: Vec::new(),
            emails: Vec::new(),
            telephones: Vec::new(),
            people: Vec::new(),
        }
    }

    pub fn tax_id(mut self, country: impl Into<String>, code: impl Into<String>) -> Self {
        self.tax_id = Some(TaxIdentity {
            country: country.into(),
            code: code.into(),
        });
        self
    }

    pub fn address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn email(mut self, addr: impl Into<String>) -> Self {
        self.emails.push(Email { addr: addr.into() });
        self
    }

    pub fn telephone(mut self, num: impl Into<String>) -> Self {
        self.telephones.push(Telephone { num: num.into() });
        self
    }

    pub fn person(mut self, given: impl Into<String>, surname: impl Into<String>) -> Self {
        self.people.push(Person {
            name: Name {
                given: given.into(),
                surname: surname.into(),
            },
        });
        self
    }

    pub fn build(self) -> Party {
        Party {
            name: self.name,
            tax_id: self.tax_id,
            addresses: self.addresses,
            emails: self.emails,
            telephones: self.telephones,
            people: self.people,
        }
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    num: Option<String>,
    street: Option<String>,
    locality: String,
    code: String,
    country: String,
}

impl AddressBuilder {
    pub fn new(
        locality: impl Into<String>,
        code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            num: None,
            street: None,
            locality: locality.into(),
            code: code.into(),
            country: country.into(),
        }
    }

    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.street = Some(street.into());
        self
    }

    pub fn num(mut self, num: impl Into<String>) -> Self {
        self.num = Some(num.into());
        self
    }

    pub fn build(self) -> Address {
        Address {
            num: self.num,
            street: self.street,
            locality: self.locality,
            code: self.code,
            country: self.country,
        }
    }
}

/// Builder for Line. The line total is set by [`InvoiceBuilder::build`].
pub struct LineBuilder {
    name: String,
    quantity: Decimal,
    price: Decimal,
    unit: Option<String>,
    taxes: Vec<TaxCombo>,
}

impl LineBuilder {
    pub fn new(name: impl Into<String>, quantity: Decimal, price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            unit: None,
            taxes: Vec::new(),
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn tax(mut self, cat: TaxCategoryKey, rate: RateKey, percent: Decimal) -> Self {
        self.taxes.push(TaxCombo {
            cat,
            rate: Some(rate),
            percent: Some(Percentage::new(percent)),
        });
        self
    }

    /// Add a tax entry without a percent (e.g. exempt supplies).
    pub fn tax_without_percent(mut self, cat: TaxCategoryKey, rate: RateKey) -> Self {
        self.taxes.push(TaxCombo {
            cat,
            rate: Some(rate),
            percent: None,
        });
        self
    }

    pub fn build(self) -> Line {
        Line {
            i: 0,
            quantity: self.quantity,
            item: Some(Item {
                name: self.name,
                price: self.price,
                unit: self.unit,
            }),
            taxes: self.taxes,
            sum: None,
            total: Decimal::ZERO,
        }
    }
}
