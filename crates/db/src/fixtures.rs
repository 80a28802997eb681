//! Deterministic seed data for tests and local demos. Release and
//! opportunity maintenance is reference-data CRUD owned elsewhere; the
//! lifecycle core only ever reads these rows, so tests seed them directly.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use staffquote_core::{
    LineItemId, OpportunityId, PhaseId, PlanLineItem, PlanPhase, ReleaseId, ResourcePlan,
    WeeklyHours,
};

use crate::DbPool;

const SEED_TIMESTAMP: &str = "2026-03-02T09:00:00Z";

pub async fn seed_release(pool: &DbPool, id: &str) -> ReleaseId {
    sqlx::query("INSERT INTO release (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(format!("Release {id}"))
        .bind(SEED_TIMESTAMP)
        .bind(SEED_TIMESTAMP)
        .execute(pool)
        .await
        .expect("insert release");
    ReleaseId(id.to_string())
}

pub async fn seed_opportunity(
    pool: &DbPool,
    release_id: &ReleaseId,
    id: &str,
    currency: &str,
) -> OpportunityId {
    sqlx::query(
        "INSERT INTO opportunity (
            id, release_id, name, account_name, delivery_center, currency,
            status, start_date, end_date, created_at, updated_at
         ) VALUES (?, ?, ?, 'Acme Corp', 'Lisbon', ?, 'open',
                   '2026-03-02', '2026-06-26', ?, ?)",
    )
    .bind(id)
    .bind(&release_id.0)
    .bind(format!("Opportunity {id}"))
    .bind(currency)
    .bind(SEED_TIMESTAMP)
    .bind(SEED_TIMESTAMP)
    .execute(pool)
    .await
    .expect("insert opportunity");
    OpportunityId(id.to_string())
}

/// The reference staffing plan: one phase, one billable line item at
/// bill 100 / cost 60, 40 hours in each of two weeks. Estimate revenue 8000,
/// cost 4800, margin 3000 (37.5 %).
pub fn sample_plan() -> ResourcePlan {
    let week_one = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
    let week_two = NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date");

    ResourcePlan {
        phases: vec![PlanPhase {
            id: PhaseId::generate(),
            name: "Build".to_string(),
            start_date: week_one,
            end_date: NaiveDate::from_ymd_opt(2026, 3, 13).expect("valid date"),
            color: Some("#0ea5e9".to_string()),
            sort_order: 0,
        }],
        line_items: vec![PlanLineItem {
            id: LineItemId::generate(),
            role_rate_id: "rr-senior-dev".to_string(),
            employee_id: Some("emp-7".to_string()),
            bill_rate: Decimal::from(100),
            cost_rate: Decimal::from(60),
            currency: "USD".to_string(),
            start_date: week_one,
            end_date: NaiveDate::from_ymd_opt(2026, 3, 13).expect("valid date"),
            sort_order: 0,
            billable: true,
            billable_expense_percent: Decimal::ZERO,
            weekly_hours: vec![
                WeeklyHours::new(week_one, Decimal::from(40)),
                WeeklyHours::new(week_two, Decimal::from(40)),
            ],
        }],
    }
}
