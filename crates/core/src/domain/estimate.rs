use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EstimateId(pub String);

impl EstimateId {
    pub fn generate() -> Self {
        Self(format!("est-{}", Uuid::new_v4()))
    }
}

/// Name given to the first estimate of a release when none is supplied.
pub const INITIAL_ESTIMATE_NAME: &str = "INITIAL";

const VERSION_NAME_PREFIX: &str = "VERSION ";

/// A cost/hours plan version. At most one estimate per release carries
/// `active_version = true`; if the release has any estimate, exactly one is
/// active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,
    pub release_id: ReleaseId,
    pub name: String,
    pub active_version: bool,
    pub attributes: Map<String, Value>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Auto-name for the next derived draft: one past the highest existing
/// `VERSION N` name. With no versioned names yet, an `INITIAL` estimate
/// counts as version 1, so the first draft over it is `VERSION 2`.
pub fn next_version_name(existing_names: &[String]) -> String {
    let highest = existing_names
        .iter()
        .filter_map(|name| name.strip_prefix(VERSION_NAME_PREFIX))
        .filter_map(|suffix| suffix.trim().parse::<u32>().ok())
        .max();

    let next = match highest {
        Some(n) => n + 1,
        None if existing_names.iter().any(|name| name == INITIAL_ESTIMATE_NAME) => 2,
        None => 1,
    };

    format!("{VERSION_NAME_PREFIX}{next}")
}
