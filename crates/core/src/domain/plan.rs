use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::week_start;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

impl PhaseId {
    pub fn generate() -> Self {
        Self(format!("ph-{}", Uuid::new_v4()))
    }
}

impl LineItemId {
    pub fn generate() -> Self {
        Self(format!("li-{}", Uuid::new_v4()))
    }
}

/// Display grouping band over a date range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanPhase {
    pub id: PhaseId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub color: Option<String>,
    pub sort_order: i32,
}

/// Planned effort for one week. `week_start` is always the Monday of the
/// week; any other date is normalized on construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyHours {
    pub week_start: NaiveDate,
    pub hours: Decimal,
}

impl WeeklyHours {
    pub fn new(date: NaiveDate, hours: Decimal) -> Self {
        Self { week_start: week_start(date), hours }
    }
}

/// One role/employee assignment row with its weekly effort distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanLineItem {
    pub id: LineItemId,
    pub role_rate_id: String,
    pub employee_id: Option<String>,
    pub bill_rate: Decimal,
    pub cost_rate: Decimal,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sort_order: i32,
    pub billable: bool,
    pub billable_expense_percent: Decimal,
    pub weekly_hours: Vec<WeeklyHours>,
}

impl PlanLineItem {
    pub fn total_hours(&self) -> Decimal {
        self.weekly_hours.iter().map(|week| week.hours).sum()
    }
}

/// The staffing plan shape shared by estimates, quote snapshots, and
/// engagements: phases plus line items with nested weekly hours.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub phases: Vec<PlanPhase>,
    pub line_items: Vec<PlanLineItem>,
}

impl ResourcePlan {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty() && self.line_items.is_empty()
    }
}
