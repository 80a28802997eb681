//! Shared SQL for the three structurally identical plan families
//! (estimate / quote / engagement). The quote-creation and derivation paths
//! both copy plans through here inside their enclosing transaction.

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use staffquote_core::{
    LineItemId, PhaseId, PlanLineItem, PlanPhase, ResourcePlan, WeeklyHours,
};

use super::{parse_date, parse_decimal, RepositoryError};

/// Table names for one plan family. Only the constants below ever
/// instantiate this, so interpolating the names into SQL is safe.
pub(crate) struct PlanTables {
    pub phase: &'static str,
    pub line_item: &'static str,
    pub weekly_hours: &'static str,
    pub parent_column: &'static str,
}

pub(crate) const ESTIMATE_PLAN: PlanTables = PlanTables {
    phase: "estimate_phase",
    line_item: "estimate_line_item",
    weekly_hours: "estimate_weekly_hours",
    parent_column: "estimate_id",
};

pub(crate) const QUOTE_PLAN: PlanTables = PlanTables {
    phase: "quote_phase",
    line_item: "quote_line_item",
    weekly_hours: "quote_weekly_hours",
    parent_column: "quote_id",
};

pub(crate) const ENGAGEMENT_PLAN: PlanTables = PlanTables {
    phase: "engagement_phase",
    line_item: "engagement_line_item",
    weekly_hours: "engagement_weekly_hours",
    parent_column: "engagement_id",
};

pub(crate) async fn load_plan(
    conn: &mut SqliteConnection,
    tables: &PlanTables,
    parent_id: &str,
) -> Result<ResourcePlan, RepositoryError> {
    let phase_rows = sqlx::query(&format!(
        "SELECT id, name, start_date, end_date, color, sort_order
         FROM {} WHERE {} = ?
         ORDER BY sort_order ASC, id ASC",
        tables.phase, tables.parent_column,
    ))
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await?;

    let phases = phase_rows.into_iter().map(phase_from_row).collect::<Result<Vec<_>, _>>()?;

    let item_rows = sqlx::query(&format!(
        "SELECT id, role_rate_id, employee_id, bill_rate, cost_rate, currency,
                start_date, end_date, sort_order, billable, billable_expense_percent
         FROM {} WHERE {} = ?
         ORDER BY sort_order ASC, id ASC",
        tables.line_item, tables.parent_column,
    ))
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut line_items = Vec::with_capacity(item_rows.len());
    for row in item_rows {
        let mut item = line_item_from_row(row)?;
        item.weekly_hours = load_weekly_hours(conn, tables, &item.id.0).await?;
        line_items.push(item);
    }

    Ok(ResourcePlan { phases, line_items })
}

/// Weekly hours straight from storage for one line item. Engagement
/// derivation calls this instead of trusting any plan loaded earlier in the
/// request: the copy must reflect every persisted row.
pub(crate) async fn load_weekly_hours(
    conn: &mut SqliteConnection,
    tables: &PlanTables,
    line_item_id: &str,
) -> Result<Vec<WeeklyHours>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT week_start, hours FROM {} WHERE line_item_id = ? ORDER BY week_start ASC",
        tables.weekly_hours,
    ))
    .bind(line_item_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(WeeklyHours {
                week_start: parse_date("week_start", &row.try_get::<String, _>("week_start")?)?,
                hours: parse_decimal("hours", &row.try_get::<String, _>("hours")?)?,
            })
        })
        .collect()
}

pub(crate) async fn insert_plan(
    conn: &mut SqliteConnection,
    tables: &PlanTables,
    parent_id: &str,
    plan: &ResourcePlan,
) -> Result<(), RepositoryError> {
    for phase in &plan.phases {
        sqlx::query(&format!(
            "INSERT INTO {} (id, {}, name, start_date, end_date, color, sort_order)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            tables.phase, tables.parent_column,
        ))
        .bind(&phase.id.0)
        .bind(parent_id)
        .bind(&phase.name)
        .bind(phase.start_date.to_string())
        .bind(phase.end_date.to_string())
        .bind(phase.color.as_deref())
        .bind(phase.sort_order)
        .execute(&mut *conn)
        .await?;
    }

    for item in &plan.line_items {
        sqlx::query(&format!(
            "INSERT INTO {} (
                id, {}, role_rate_id, employee_id, bill_rate, cost_rate, currency,
                start_date, end_date, sort_order, billable, billable_expense_percent
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            tables.line_item, tables.parent_column,
        ))
        .bind(&item.id.0)
        .bind(parent_id)
        .bind(&item.role_rate_id)
        .bind(item.employee_id.as_deref())
        .bind(item.bill_rate.to_string())
        .bind(item.cost_rate.to_string())
        .bind(&item.currency)
        .bind(item.start_date.to_string())
        .bind(item.end_date.to_string())
        .bind(item.sort_order)
        .bind(i32::from(item.billable))
        .bind(item.billable_expense_percent.to_string())
        .execute(&mut *conn)
        .await?;

        insert_weekly_hours(conn, tables, &item.id.0, &item.weekly_hours).await?;
    }

    Ok(())
}

pub(crate) async fn insert_weekly_hours(
    conn: &mut SqliteConnection,
    tables: &PlanTables,
    line_item_id: &str,
    weeks: &[WeeklyHours],
) -> Result<(), RepositoryError> {
    for week in weeks {
        sqlx::query(&format!(
            "INSERT INTO {} (id, line_item_id, week_start, hours) VALUES (?, ?, ?, ?)",
            tables.weekly_hours,
        ))
        .bind(format!("wh-{}", uuid::Uuid::new_v4()))
        .bind(line_item_id)
        .bind(week.week_start.to_string())
        .bind(week.hours.to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Replace the whole plan under a parent. Weekly hours go with their line
/// items via the cascade.
pub(crate) async fn replace_plan(
    conn: &mut SqliteConnection,
    tables: &PlanTables,
    parent_id: &str,
    plan: &ResourcePlan,
) -> Result<(), RepositoryError> {
    for table in [tables.phase, tables.line_item] {
        sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", table, tables.parent_column))
            .bind(parent_id)
            .execute(&mut *conn)
            .await?;
    }

    insert_plan(conn, tables, parent_id, plan).await
}

fn phase_from_row(row: SqliteRow) -> Result<PlanPhase, RepositoryError> {
    Ok(PlanPhase {
        id: PhaseId(row.try_get("id")?),
        name: row.try_get("name")?,
        start_date: parse_date("start_date", &row.try_get::<String, _>("start_date")?)?,
        end_date: parse_date("end_date", &row.try_get::<String, _>("end_date")?)?,
        color: row.try_get("color")?,
        sort_order: row.try_get("sort_order")?,
    })
}

fn line_item_from_row(row: SqliteRow) -> Result<PlanLineItem, RepositoryError> {
    Ok(PlanLineItem {
        id: LineItemId(row.try_get("id")?),
        role_rate_id: row.try_get("role_rate_id")?,
        employee_id: row.try_get("employee_id")?,
        bill_rate: parse_decimal("bill_rate", &row.try_get::<String, _>("bill_rate")?)?,
        cost_rate: parse_decimal("cost_rate", &row.try_get::<String, _>("cost_rate")?)?,
        currency: row.try_get("currency")?,
        start_date: parse_date("start_date", &row.try_get::<String, _>("start_date")?)?,
        end_date: parse_date("end_date", &row.try_get::<String, _>("end_date")?)?,
        sort_order: row.try_get("sort_order")?,
        billable: row.try_get::<i32, _>("billable")? != 0,
        billable_expense_percent: parse_decimal(
            "billable_expense_percent",
            &row.try_get::<String, _>("billable_expense_percent")?,
        )?,
        weekly_hours: Vec::new(),
    })
}
