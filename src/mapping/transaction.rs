use super::{Agreement, Line, Settlement, new_lines};
use crate::core::{ConvertError, Invoice, ResultExt};

/// `rsm:SupplyChainTradeTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub lines: Vec<Line>,
    pub agreement: Agreement,
    pub settlement: Settlement,
}

impl Transaction {
    /// Run the line, party and settlement mappers in document order.
    ///
    /// The first failing mapper aborts the assembly; its error is wrapped
    /// with the name of the block being built.
    pub fn new(invoice: &Invoice) -> Result<Self, ConvertError> {
        let lines = new_lines(&invoice.lines).context("mapping lines")?;
        let agreement = Agreement::new(invoice).context("mapping agreement")?;
        let settlement = Settlement::new(invoice).context("mapping settlement")?;
        Ok(Self {
            lines,
            agreement,
            settlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn errors_name_the_failing_block() {
        let err = Transaction::new(&Invoice::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(err.to_string(), "mapping agreement: Supplier not found");
    }
}
