use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crewflow_core::{DomainError, DomainResult};

/// Capability of a billable or tax line, as seen by the calculator.
///
/// Estimate and invoice line items both implement this; the calculator is
/// written once against it.
pub trait BillableLine {
    fn quantity(&self) -> Decimal;
    fn unit_price(&self) -> Decimal;
    fn is_tax_line(&self) -> bool;
    /// Percentage of the subtotal (e.g. 8.25). Present iff this is a tax line.
    fn tax_rate(&self) -> Option<Decimal>;
}

/// Caller-facing line shape used when creating or replacing line items.
///
/// Sort order is assigned from input order by the owning aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_tax_line: bool,
    pub tax_rate: Option<Decimal>,
}

impl LineSpec {
    pub fn billable(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            is_tax_line: false,
            tax_rate: None,
        }
    }

    pub fn tax(description: impl Into<String>, tax_rate: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
            is_tax_line: true,
            tax_rate: Some(tax_rate),
        }
    }
}

impl BillableLine for LineSpec {
    fn quantity(&self) -> Decimal {
        self.quantity
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn is_tax_line(&self) -> bool {
        self.is_tax_line
    }

    fn tax_rate(&self) -> Option<Decimal> {
        self.tax_rate
    }
}

/// Quantity and unit price as they are persisted.
///
/// Tax lines charge a percentage of the subtotal; their quantity/unit price
/// carry no meaning and are forced to (1, 0) so the two representations can
/// never disagree.
pub fn normalized_quantity_price(
    is_tax_line: bool,
    quantity: Decimal,
    unit_price: Decimal,
) -> (Decimal, Decimal) {
    if is_tax_line {
        (Decimal::ONE, Decimal::ZERO)
    } else {
        (quantity, unit_price)
    }
}

/// Validate a line-item set before it enters an aggregate.
///
/// Rules:
/// - a tax line must carry a non-negative `tax_rate`;
/// - a non-tax line must not carry a `tax_rate`, needs a positive quantity
///   and a non-negative unit price;
/// - descriptions must be non-blank;
/// - a non-empty set must contain at least one non-tax line to be billable.
pub fn validate_line_specs(lines: &[LineSpec]) -> DomainResult<()> {
    for (idx, line) in lines.iter().enumerate() {
        if line.description.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "line {idx}: description must not be blank"
            )));
        }
        if line.is_tax_line {
            match line.tax_rate {
                Some(rate) if rate >= Decimal::ZERO => {}
                Some(_) => {
                    return Err(DomainError::validation(format!(
                        "line {idx}: tax rate must not be negative"
                    )));
                }
                None => {
                    return Err(DomainError::validation(format!(
                        "line {idx}: tax line requires a tax rate"
                    )));
                }
            }
        } else {
            if line.tax_rate.is_some() {
                return Err(DomainError::validation(format!(
                    "line {idx}: tax rate is only valid on tax lines"
                )));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {idx}: quantity must be positive"
                )));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {idx}: unit price must not be negative"
                )));
            }
        }
    }

    if !lines.is_empty() && lines.iter().all(|l| l.is_tax_line) {
        return Err(DomainError::validation(
            "at least one non-tax line is required",
        ));
    }

    Ok(())
}
