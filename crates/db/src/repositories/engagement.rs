use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use staffquote_core::{
    Engagement, EngagementId, LineItemId, PhaseId, QuoteId, QuoteStatus, ResourcePlan,
};

use super::plan::{self, ENGAGEMENT_PLAN, QUOTE_PLAN};
use super::quote::require_quote;
use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

/// Delivery-side twin of an accepted quote. Derivation deep-copies the
/// quote's frozen plan into engagement-owned rows so delivery edits never
/// touch the commercial record.
pub struct SqlEngagementRepository {
    pool: DbPool,
}

impl SqlEngagementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Derive the engagement for an accepted quote. Idempotent: a second
    /// call returns the existing engagement without touching its plan.
    ///
    /// Weekly hours are re-read from the quote's stored rows per line item
    /// rather than taken from a plan loaded earlier in the call; the copy
    /// must reflect exactly what is persisted at derivation time.
    pub async fn derive_from_quote(
        &self,
        quote_id: &QuoteId,
        created_by: Option<&str>,
    ) -> Result<Engagement, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = find_by_quote_tx(&mut tx, quote_id).await? {
            return Ok(existing);
        }

        let quote = require_quote(&mut tx, quote_id).await?;
        if quote.status != QuoteStatus::Accepted {
            return Err(staffquote_core::DomainError::Validation(format!(
                "quote {} is {}, only accepted quotes derive an engagement",
                quote_id.0,
                quote.status.as_str()
            ))
            .into());
        }

        let now = Utc::now();
        let engagement = Engagement {
            id: EngagementId::generate(),
            quote_id: quote_id.clone(),
            name: quote.quote_number.clone(),
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO engagement (id, quote_id, name, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&engagement.id.0)
        .bind(&engagement.quote_id.0)
        .bind(&engagement.name)
        .bind(engagement.created_by.as_deref())
        .bind(engagement.created_at.to_rfc3339())
        .bind(engagement.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let source = plan::load_plan(&mut tx, &QUOTE_PLAN, &quote_id.0).await?;

        for phase in &source.phases {
            sqlx::query(
                "INSERT INTO engagement_phase (
                    id, engagement_id, name, start_date, end_date, color, sort_order
                 ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(PhaseId::generate().0)
            .bind(&engagement.id.0)
            .bind(&phase.name)
            .bind(phase.start_date.to_string())
            .bind(phase.end_date.to_string())
            .bind(phase.color.as_deref())
            .bind(phase.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        for item in &source.line_items {
            let copy_id = LineItemId::generate();
            // Dates are carried over verbatim; the engagement starts from
            // the committed commercial timeline.
            sqlx::query(
                "INSERT INTO engagement_line_item (
                    id, engagement_id, role_rate_id, employee_id, bill_rate, cost_rate,
                    currency, start_date, end_date, sort_order, billable,
                    billable_expense_percent
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&copy_id.0)
            .bind(&engagement.id.0)
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
            .execute(&mut *tx)
            .await?;

            let weeks = plan::load_weekly_hours(&mut tx, &QUOTE_PLAN, &item.id.0).await?;
            plan::insert_weekly_hours(&mut tx, &ENGAGEMENT_PLAN, &copy_id.0, &weeks).await?;
        }

        tx.commit().await?;

        tracing::info!(
            engagement_id = %engagement.id.0,
            quote_id = %quote_id.0,
            line_items = source.line_items.len(),
            "engagement derived"
        );

        Ok(engagement)
    }

    pub async fn find_by_id(
        &self,
        id: &EngagementId,
    ) -> Result<Option<Engagement>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, quote_id, name, created_by, created_at, updated_at
             FROM engagement WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(engagement_from_row).transpose()
    }

    pub async fn find_by_quote(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Option<Engagement>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_by_quote_tx(&mut conn, quote_id).await
    }

    pub async fn load_plan(&self, id: &EngagementId) -> Result<ResourcePlan, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        require_engagement(&mut conn, id).await?;
        plan::load_plan(&mut conn, &ENGAGEMENT_PLAN, &id.0).await
    }

    /// Replace the engagement's plan (the delivery staffing edit surface).
    /// The quote's frozen plan is not involved.
    pub async fn save_plan(
        &self,
        id: &EngagementId,
        plan_data: &ResourcePlan,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        require_engagement(&mut tx, id).await?;
        plan::replace_plan(&mut tx, &ENGAGEMENT_PLAN, &id.0, plan_data).await?;
        sqlx::query("UPDATE engagement SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_for_quote(&self, quote_id: &QuoteId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_for_quote_tx(&mut tx, quote_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

/// Drop the quote's engagement and, via the foreign-key cascade, its plan.
pub(crate) async fn delete_for_quote_tx(
    conn: &mut SqliteConnection,
    quote_id: &QuoteId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM engagement WHERE quote_id = ?")
        .bind(&quote_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn find_by_quote_tx(
    conn: &mut SqliteConnection,
    quote_id: &QuoteId,
) -> Result<Option<Engagement>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, quote_id, name, created_by, created_at, updated_at
         FROM engagement WHERE quote_id = ?",
    )
    .bind(&quote_id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(engagement_from_row).transpose()
}

pub(crate) async fn require_engagement(
    conn: &mut SqliteConnection,
    id: &EngagementId,
) -> Result<Engagement, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, quote_id, name, created_by, created_at, updated_at
         FROM engagement WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(engagement_from_row)
        .transpose()?
        .ok_or_else(|| RepositoryError::not_found("engagement", &id.0))
}

fn engagement_from_row(row: SqliteRow) -> Result<Engagement, RepositoryError> {
    let created_at: DateTime<Utc> =
        parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?;
    Ok(Engagement {
        id: EngagementId(row.try_get("id")?),
        quote_id: QuoteId(row.try_get("quote_id")?),
        name: row.try_get("name")?,
        created_by: row.try_get("created_by")?,
        created_at,
        updated_at: parse_timestamp("updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}
