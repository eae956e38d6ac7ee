use crate::core::codes::tax_category_code;
use crate::core::units::unece_code;
use crate::core::{ConvertError, Line as InvoiceLine, TaxCombo};

/// Tax scheme of every tax record.
pub const TAX_TYPE_VAT: &str = "VAT";

/// `ram:IncludedSupplyChainTradeLineItem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based position in the invoice.
    pub id: String,
    pub name: String,
    pub net_price: String,
    pub quantity: Quantity,
    pub taxes: Vec<LineTax>,
    pub total: String,
}

/// `ram:BilledQuantity` with its unit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    pub amount: String,
    pub unit_code: String,
}

/// `ram:ApplicableTradeTax` inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTax {
    pub type_code: &'static str,
    pub category_code: &'static str,
    pub rate_percent: Option<String>,
}

impl LineTax {
    pub fn new(combo: &TaxCombo) -> Self {
        Self {
            type_code: TAX_TYPE_VAT,
            category_code: tax_category_code(combo.rate, combo.cat).code(),
            rate_percent: combo.percent.map(|p| p.without_symbol()),
        }
    }
}

impl Line {
    /// Map the line at 1-based position `index`.
    pub fn new(index: usize, line: &InvoiceLine) -> Result<Self, ConvertError> {
        let item = line
            .item
            .as_ref()
            .ok_or_else(|| ConvertError::missing(format!("Line {index} item")))?;

        Ok(Self {
            id: index.to_string(),
            name: item.name.clone(),
            net_price: item.price.to_string(),
            quantity: Quantity {
                amount: line.quantity.to_string(),
                unit_code: unece_code(item.unit.as_deref()),
            },
            taxes: line.taxes.iter().map(LineTax::new).collect(),
            total: line.total.to_string(),
        })
    }
}

/// Map every line, numbering them from 1.
pub fn new_lines(lines: &[InvoiceLine]) -> Result<Vec<Line>, ConvertError> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| Line::new(i + 1, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LineBuilder, RateKey, TaxCategoryKey};
    use rust_decimal_macros::dec;

    fn line() -> InvoiceLine {
        let mut line = LineBuilder::new("Development services", dec!(20), dec!(90.00))
            .unit("h")
            .tax(TaxCategoryKey::Vat, RateKey::Standard, dec!(19))
            .build();
        line.total = dec!(1800.00);
        line
    }

    #[test]
    fn maps_item_quantity_and_tax() {
        let mapped = Line::new(1, &line()).unwrap();
        assert_eq!(mapped.id, "1");
        assert_eq!(mapped.name, "Development services");
        assert_eq!(mapped.net_price, "90.00");
        assert_eq!(mapped.quantity.amount, "20");
        assert_eq!(mapped.quantity.unit_code, "HUR");
        assert_eq!(mapped.taxes.len(), 1);
        assert_eq!(mapped.taxes[0].type_code, "VAT");
        assert_eq!(mapped.taxes[0].category_code, "S");
        assert_eq!(mapped.taxes[0].rate_percent.as_deref(), Some("19"));
        assert_eq!(mapped.total, "1800.00");
    }

    #[test]
    fn ids_follow_position() {
        let lines = new_lines(&[line(), line(), line()]).unwrap();
        let ids: Vec<_> = lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn exempt_tax_has_no_percent() {
        let line = LineBuilder::new("Training", dec!(1), dec!(100))
            .tax_without_percent(TaxCategoryKey::Vat, RateKey::Exempt)
            .build();
        let mapped = Line::new(1, &line).unwrap();
        assert_eq!(mapped.taxes[0].category_code, "E");
        assert_eq!(mapped.taxes[0].rate_percent, None);
        assert_eq!(mapped.quantity.unit_code, "C62");
    }

    #[test]
    fn line_without_item() {
        let mut bare = line();
        bare.item = None;
        let err = new_lines(&[line(), bare]).unwrap_err();
        assert_eq!(err.to_string(), "Line 2 item not found");
    }
}
