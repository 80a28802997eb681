use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quote::QuoteId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementId(pub String);

impl EngagementId {
    pub fn generate() -> Self {
        Self(format!("eng-{}", Uuid::new_v4()))
    }
}

/// The operational resource plan derived from an accepted quote. One-to-one
/// with its quote. Line-item dates are decoupled from the opportunity's date
/// window once derived; the plan is freely editable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: EngagementId,
    pub quote_id: QuoteId,
    pub name: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
