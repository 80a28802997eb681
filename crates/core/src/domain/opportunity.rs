use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::estimate::ReleaseId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

/// The sales/deal record quotes hang off. Carries the default currency and
/// delivery-center reference used for rate lookups and summary reporting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub release_id: ReleaseId,
    pub name: String,
    pub account_name: String,
    pub delivery_center: String,
    pub currency: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Freeze the mutable opportunity fields into the key/value map stored on
    /// a quote. Historical quotes stay readable from this map even if the
    /// opportunity schema changes later.
    pub fn snapshot_metadata(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("account_name".to_string(), Value::String(self.account_name.clone()));
        map.insert("delivery_center".to_string(), Value::String(self.delivery_center.clone()));
        map.insert("currency".to_string(), Value::String(self.currency.clone()));
        map.insert("status".to_string(), Value::String(self.status.clone()));
        map.insert("start_date".to_string(), Value::String(self.start_date.to_string()));
        map.insert("end_date".to_string(), Value::String(self.end_date.to_string()));
        map
    }
}
