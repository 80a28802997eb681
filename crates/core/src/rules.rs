//! Quote-type business rules checked before a quote row is ever written.

use rust_decimal::Decimal;

use crate::domain::quote::{BillingUnit, CapType, QuoteTypeConfig, TriggerKind};
use crate::errors::DomainError;

/// Absolute tolerance when reconciling payment-trigger sums against the
/// fixed-bid target amount.
pub const TRIGGER_SUM_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn validate_quote_config(config: &QuoteTypeConfig) -> Result<(), DomainError> {
    match config {
        QuoteTypeConfig::FixedBid { target_amount, payment_triggers } => {
            if payment_triggers.is_empty() {
                return Err(DomainError::Validation(
                    "fixed-bid quote requires at least one payment trigger".to_string(),
                ));
            }

            for trigger in payment_triggers {
                if trigger.kind == TriggerKind::Monthly
                    && trigger.installment_count.unwrap_or(0) == 0
                {
                    return Err(DomainError::Validation(
                        "monthly payment trigger requires an installment count".to_string(),
                    ));
                }
            }

            let trigger_sum: Decimal =
                payment_triggers.iter().map(|trigger| trigger.total_amount()).sum();
            if (trigger_sum - target_amount).abs() > TRIGGER_SUM_TOLERANCE {
                return Err(DomainError::Validation(format!(
                    "payment triggers sum to {trigger_sum} but target amount is {target_amount}"
                )));
            }

            Ok(())
        }
        QuoteTypeConfig::TimeMaterials { billing_unit, blended_rate, cap_type, cap_amount } => {
            if *billing_unit == BillingUnit::Blended && blended_rate.is_none() {
                return Err(DomainError::Validation(
                    "blended billing unit requires a blended rate".to_string(),
                ));
            }

            if matches!(cap_type, CapType::Capped | CapType::Floor) && cap_amount.is_none() {
                return Err(DomainError::Validation(format!(
                    "cap type {} requires a cap amount",
                    cap_type.as_str()
                )));
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::validate_quote_config;
    use crate::domain::quote::{
        BillingUnit, CapType, PaymentTrigger, QuoteTypeConfig, TriggerKind,
    };
    use crate::errors::DomainError;

    fn time_trigger(amount: i64) -> PaymentTrigger {
        PaymentTrigger {
            kind: TriggerKind::Time,
            amount: Decimal::from(amount),
            installment_count: None,
            due_date: None,
            sort_order: 0,
        }
    }

    #[test]
    fn fixed_bid_requires_a_trigger() {
        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::from(9000),
            payment_triggers: vec![],
        };
        assert!(matches!(
            validate_quote_config(&config),
            Err(DomainError::Validation(reason)) if reason.contains("at least one")
        ));
    }

    #[test]
    fn fixed_bid_accepts_exact_trigger_sum() {
        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::from(9000),
            payment_triggers: vec![time_trigger(4000), time_trigger(5000)],
        };
        validate_quote_config(&config).expect("exact sum");
    }

    #[test]
    fn fixed_bid_tolerates_one_cent_rounding() {
        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::new(9000_01, 2),
            payment_triggers: vec![time_trigger(9000)],
        };
        validate_quote_config(&config).expect("within tolerance");

        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::new(9000_02, 2),
            payment_triggers: vec![time_trigger(9000)],
        };
        assert!(matches!(
            validate_quote_config(&config),
            Err(DomainError::Validation(reason)) if reason.contains("target amount")
        ));
    }

    #[test]
    fn monthly_triggers_count_per_installment() {
        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::from(9000),
            payment_triggers: vec![PaymentTrigger {
                kind: TriggerKind::Monthly,
                amount: Decimal::from(750),
                installment_count: Some(12),
                due_date: None,
                sort_order: 0,
            }],
        };
        validate_quote_config(&config).expect("monthly sum");
    }

    #[test]
    fn monthly_trigger_without_installments_is_rejected() {
        let config = QuoteTypeConfig::FixedBid {
            target_amount: Decimal::from(0),
            payment_triggers: vec![PaymentTrigger {
                kind: TriggerKind::Monthly,
                amount: Decimal::from(750),
                installment_count: None,
                due_date: None,
                sort_order: 0,
            }],
        };
        assert!(matches!(
            validate_quote_config(&config),
            Err(DomainError::Validation(reason)) if reason.contains("installment")
        ));
    }

    #[test]
    fn blended_unit_requires_blended_rate() {
        let config = QuoteTypeConfig::TimeMaterials {
            billing_unit: BillingUnit::Blended,
            blended_rate: None,
            cap_type: CapType::None,
            cap_amount: None,
        };
        assert!(matches!(
            validate_quote_config(&config),
            Err(DomainError::Validation(reason)) if reason.contains("blended rate")
        ));
    }

    #[test]
    fn capped_and_floor_require_cap_amount() {
        for cap_type in [CapType::Capped, CapType::Floor] {
            let config = QuoteTypeConfig::TimeMaterials {
                billing_unit: BillingUnit::Hourly,
                blended_rate: None,
                cap_type,
                cap_amount: None,
            };
            assert!(matches!(
                validate_quote_config(&config),
                Err(DomainError::Validation(reason)) if reason.contains("cap amount")
            ));
        }
    }

    #[test]
    fn uncapped_hourly_time_materials_is_valid() {
        let config = QuoteTypeConfig::TimeMaterials {
            billing_unit: BillingUnit::Hourly,
            blended_rate: None,
            cap_type: CapType::None,
            cap_amount: None,
        };
        validate_quote_config(&config).expect("valid T&M");
    }
}
