use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::estimate::EstimateId;
use crate::domain::opportunity::OpportunityId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("q-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Invalid,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Invalid => "invalid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "invalid" => Some(Self::Invalid),
            _ => None,
        }
    }

    /// Rejected and invalid quotes admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Invalid)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// One-off payment due at a point in time.
    Time,
    /// Recurring payment; the amount applies per installment.
    Monthly,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "time" => Some(Self::Time),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentTrigger {
    pub kind: TriggerKind,
    pub amount: Decimal,
    pub installment_count: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i32,
}

impl PaymentTrigger {
    /// Contribution to the fixed-bid total: monthly triggers count once per
    /// installment.
    pub fn total_amount(&self) -> Decimal {
        match self.kind {
            TriggerKind::Time => self.amount,
            TriggerKind::Monthly => {
                self.amount * Decimal::from(self.installment_count.unwrap_or(0))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableCompensation {
    pub name: String,
    pub amount: Decimal,
    pub sort_order: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    Hourly,
    Daily,
    Blended,
}

impl BillingUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Blended => "blended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "blended" => Some(Self::Blended),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapType {
    None,
    Capped,
    Floor,
}

impl CapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Capped => "capped",
            Self::Floor => "floor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "capped" => Some(Self::Capped),
            "floor" => Some(Self::Floor),
            _ => None,
        }
    }
}

/// Quote-type-specific commercial terms supplied at creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "quote_type", rename_all = "snake_case")]
pub enum QuoteTypeConfig {
    FixedBid { target_amount: Decimal, payment_triggers: Vec<PaymentTrigger> },
    TimeMaterials {
        billing_unit: BillingUnit,
        blended_rate: Option<Decimal>,
        cap_type: CapType,
        cap_amount: Option<Decimal>,
    },
}

impl QuoteTypeConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::FixedBid { .. } => "fixed_bid",
            Self::TimeMaterials { .. } => "time_materials",
        }
    }
}

/// Immutable-once-created snapshot plus lifecycle metadata. Line items,
/// phases, weekly hours, payment triggers, and variable compensations are
/// copies of the source estimate's data at creation time, never references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub opportunity_id: OpportunityId,
    pub estimate_id: EstimateId,
    pub quote_number: String,
    pub version: i32,
    pub status: QuoteStatus,
    pub is_active: bool,
    pub config: QuoteTypeConfig,
    pub variable_compensations: Vec<VariableCompensation>,
    pub snapshot: Map<String, Value>,
    pub sent_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Deterministic quote number for an opportunity/version pair.
    pub fn derive_number(opportunity_id: &OpportunityId, version: i32) -> String {
        format!("{}-Q{version:03}", opportunity_id.0)
    }

    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Draft, QuoteStatus::Accepted)
                | (QuoteStatus::Draft, QuoteStatus::Rejected)
                | (QuoteStatus::Draft, QuoteStatus::Invalid)
                | (QuoteStatus::Sent, QuoteStatus::Accepted)
                | (QuoteStatus::Sent, QuoteStatus::Rejected)
                | (QuoteStatus::Sent, QuoteStatus::Invalid)
                | (QuoteStatus::Accepted, QuoteStatus::Rejected)
                | (QuoteStatus::Accepted, QuoteStatus::Invalid)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }
}
