//! Deviation math between quoted, estimated, and resource-plan figures. All
//! amounts here are already in the opportunity's default currency; the db
//! layer converts line items through the `CurrencyConverter` before summing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyConverter;
use crate::domain::plan::PlanLineItem;
use crate::errors::CurrencyError;

/// Revenue/cost/margin rollup for one plan, in a single currency.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub margin: Decimal,
    pub margin_percent: Decimal,
}

/// Sum hours × rate across line items, converting each item's currency into
/// `target_currency`. Non-billable items contribute zero revenue, full cost.
pub fn plan_totals(
    line_items: &[PlanLineItem],
    target_currency: &str,
    rates: &dyn CurrencyConverter,
) -> Result<PlanTotals, CurrencyError> {
    let mut revenue = Decimal::ZERO;
    let mut cost = Decimal::ZERO;

    for item in line_items {
        let hours = item.total_hours();
        if item.billable {
            revenue +=
                rates.convert(hours * item.bill_rate, &item.currency, target_currency)?;
        }
        cost += rates.convert(hours * item.cost_rate, &item.currency, target_currency)?;
    }

    let margin = revenue - cost;
    Ok(PlanTotals { revenue, cost, margin, margin_percent: percent_of(margin, revenue) })
}

/// `part / whole × 100`, defined as 0 when `whole` is 0.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole * Decimal::ONE_HUNDRED
    }
}

/// The deviation report across the three entity families.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparativeSummary {
    pub currency: String,
    pub quote_amount: Decimal,
    pub estimate: PlanTotals,
    pub engagement: PlanTotals,
    pub revenue_deviation: Decimal,
    pub revenue_deviation_percent: Decimal,
    pub margin_percent_deviation: Decimal,
}

impl ComparativeSummary {
    pub fn compute(
        currency: impl Into<String>,
        quote_amount: Decimal,
        estimate: PlanTotals,
        engagement: PlanTotals,
    ) -> Self {
        let revenue_deviation = engagement.revenue - quote_amount;
        let revenue_deviation_percent = percent_of(revenue_deviation, quote_amount);
        let margin_percent_deviation = engagement.margin_percent - estimate.margin_percent;

        Self {
            currency: currency.into(),
            quote_amount,
            estimate,
            engagement,
            revenue_deviation,
            revenue_deviation_percent,
            margin_percent_deviation,
        }
    }
}
