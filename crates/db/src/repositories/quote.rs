use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

use staffquote_core::{
    snapshot_plan, validate_quote_config, BillingUnit, CapType, DomainError, EstimateId,
    Opportunity, OpportunityId, PaymentTrigger, Quote, QuoteId, QuoteStatus, QuoteTypeConfig,
    ReleaseId, ResourcePlan, TriggerKind, VariableCompensation,
};

use super::engagement::{self, SqlEngagementRepository};
use super::estimate::require_estimate;
use super::plan::{self, ESTIMATE_PLAN, QUOTE_PLAN};
use super::{parse_decimal, parse_optional_date, parse_timestamp, RepositoryError};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct QuoteCreateInput {
    pub opportunity_id: OpportunityId,
    pub estimate_id: EstimateId,
    pub config: QuoteTypeConfig,
    pub variable_compensations: Vec<VariableCompensation>,
    pub created_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusHistoryEntry {
    pub from_status: Option<QuoteStatus>,
    pub to_status: QuoteStatus,
    pub actor: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Quote lifecycle controller: creation with snapshotting and version
/// assignment, the invalidation cascade, status transitions, and the
/// advisory opportunity lock.
pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new quote from the opportunity's active estimate. One
    /// transaction covers validation, snapshotting, and the invalidation of
    /// every superseded quote; nothing is visible on failure.
    pub async fn create(&self, input: QuoteCreateInput) -> Result<Quote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let opportunity = require_opportunity(&mut tx, &input.opportunity_id).await?;
        let estimate = require_estimate(&mut tx, &input.estimate_id).await?;

        if estimate.release_id != opportunity.release_id {
            return Err(DomainError::Validation(format!(
                "estimate {} does not belong to release {}",
                estimate.id.0, opportunity.release_id.0
            ))
            .into());
        }
        if !estimate.active_version {
            return Err(DomainError::Validation(format!(
                "estimate {} is not the active version of its release",
                estimate.id.0
            ))
            .into());
        }

        validate_quote_config(&input.config)?;

        let max_version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM quote WHERE opportunity_id = ?")
                .bind(&input.opportunity_id.0)
                .fetch_one(&mut *tx)
                .await?;
        let version = i32::try_from(max_version + 1).map_err(|_| {
            RepositoryError::Decode(format!("quote version overflow: {max_version}"))
        })?;

        // Supersede everything else first; the partial unique index on
        // active quotes requires the slot to be free before the insert.
        let invalidated = invalidate_superseded(&mut tx, &input.opportunity_id, None).await?;

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::generate(),
            opportunity_id: input.opportunity_id.clone(),
            estimate_id: input.estimate_id.clone(),
            quote_number: Quote::derive_number(&input.opportunity_id, version),
            version,
            status: QuoteStatus::Draft,
            is_active: true,
            config: input.config.clone(),
            variable_compensations: input.variable_compensations.clone(),
            snapshot: opportunity.snapshot_metadata(),
            sent_date: None,
            created_by: input.created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        insert_quote(&mut tx, &quote).await?;
        append_history(&mut tx, &quote.id, None, QuoteStatus::Draft, input.created_by.as_deref())
            .await?;

        let estimate_plan = plan::load_plan(&mut tx, &ESTIMATE_PLAN, &input.estimate_id.0).await?;
        plan::insert_plan(&mut tx, &QUOTE_PLAN, &quote.id.0, &snapshot_plan(&estimate_plan))
            .await?;

        tx.commit().await?;

        tracing::info!(
            quote_id = %quote.id.0,
            quote_number = %quote.quote_number,
            version,
            invalidated,
            "quote created from active estimate"
        );

        Ok(quote)
    }

    /// Drive the status state machine. Disallowed transitions are a typed
    /// error. A transition into ACCEPTED commits first and then derives the
    /// engagement; derivation failure is logged and swallowed because the
    /// status field, not the engagement's existence, is authoritative.
    pub async fn update_status(
        &self,
        id: &QuoteId,
        new_status: QuoteStatus,
        sent_date: Option<NaiveDate>,
        actor: Option<&str>,
    ) -> Result<Quote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut quote = require_quote(&mut tx, id).await?;
        let from = quote.status;
        quote.transition_to(new_status).map_err(RepositoryError::Domain)?;

        let now = Utc::now();
        let deactivated = new_status.is_terminal();

        sqlx::query(
            "UPDATE quote SET status = ?, sent_date = COALESCE(?, sent_date),
                    is_active = CASE WHEN ? THEN 0 ELSE is_active END,
                    updated_at = ?
             WHERE id = ?",
        )
        .bind(new_status.as_str())
        .bind(sent_date.map(|date| date.to_string()))
        .bind(deactivated)
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        append_history(&mut tx, id, Some(from), new_status, actor).await?;

        if deactivated {
            engagement::delete_for_quote_tx(&mut tx, id).await?;
        }

        tx.commit().await?;

        if new_status == QuoteStatus::Accepted {
            let engagements = SqlEngagementRepository::new(self.pool.clone());
            match engagements.derive_from_quote(id, actor).await {
                Ok(engagement) => {
                    tracing::info!(
                        quote_id = %id.0,
                        engagement_id = %engagement.id.0,
                        "engagement derived from accepted quote"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        quote_id = %id.0,
                        %error,
                        "engagement derivation failed; quote remains accepted"
                    );
                }
            }
        }

        let mut conn = self.pool.acquire().await?;
        require_quote(&mut conn, id).await
    }

    /// Withdraw the quote from play: clears the active flag, moves the
    /// status to INVALID (REJECTED is preserved as a terminal audit value),
    /// deletes the derived engagement, and frees the opportunity.
    pub async fn deactivate(
        &self,
        id: &QuoteId,
        actor: Option<&str>,
    ) -> Result<Quote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quote = require_quote(&mut tx, id).await?;
        let new_status = match quote.status {
            QuoteStatus::Rejected => QuoteStatus::Rejected,
            _ => QuoteStatus::Invalid,
        };
        let now = Utc::now();

        sqlx::query("UPDATE quote SET is_active = 0, status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(now.to_rfc3339())
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;

        if new_status != quote.status {
            append_history(&mut tx, id, Some(quote.status), new_status, actor).await?;
        }

        let deleted = engagement::delete_for_quote_tx(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(quote_id = %id.0, engagements_deleted = deleted, "quote deactivated");

        let mut conn = self.pool.acquire().await?;
        require_quote(&mut conn, id).await
    }

    pub async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_quote(&mut conn, id).await
    }

    /// The advisory lock probe: an opportunity with an active quote may not
    /// take edits or a competing quote through other endpoints.
    pub async fn check_active_quote(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM quote WHERE opportunity_id = ? AND is_active = 1")
                .bind(&opportunity_id.0)
                .fetch_optional(&mut *conn)
                .await?;

        match id {
            Some(id) => load_quote(&mut conn, &QuoteId(id)).await,
            None => Ok(None),
        }
    }

    /// Guard used by the opportunity/estimate edit surfaces.
    pub async fn ensure_unlocked(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<(), RepositoryError> {
        match self.check_active_quote(opportunity_id).await? {
            Some(quote) => Err(DomainError::Validation(format!(
                "opportunity {} is locked by active quote {}",
                opportunity_id.0, quote.quote_number
            ))
            .into()),
            None => Ok(()),
        }
    }

    pub async fn list_for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM quote WHERE opportunity_id = ? ORDER BY version ASC",
        )
        .bind(&opportunity_id.0)
        .fetch_all(&mut *conn)
        .await?;

        let mut quotes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(quote) = load_quote(&mut conn, &QuoteId(id)).await? {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    /// The quote's frozen copy of the estimate plan.
    pub async fn load_plan(&self, id: &QuoteId) -> Result<ResourcePlan, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        require_quote(&mut conn, id).await?;
        plan::load_plan(&mut conn, &QUOTE_PLAN, &id.0).await
    }

    pub async fn status_history(
        &self,
        id: &QuoteId,
    ) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT from_status, to_status, actor, occurred_at
             FROM quote_status_history
             WHERE quote_id = ?
             ORDER BY occurred_at ASC, id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(history_from_row).collect()
    }
}

/// Mark every non-terminal quote of the opportunity INVALID and drop its
/// engagement. `except` spares the quote being worked on. Returns how many
/// quotes were invalidated.
async fn invalidate_superseded(
    conn: &mut SqliteConnection,
    opportunity_id: &OpportunityId,
    except: Option<&QuoteId>,
) -> Result<u32, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, status FROM quote
         WHERE opportunity_id = ? AND status NOT IN ('rejected', 'invalid')",
    )
    .bind(&opportunity_id.0)
    .fetch_all(&mut *conn)
    .await?;

    let now = Utc::now().to_rfc3339();
    let mut invalidated = 0u32;

    for row in rows {
        let id = QuoteId(row.try_get("id")?);
        if Some(&id) == except {
            continue;
        }
        let status_raw: String = row.try_get("status")?;
        let from = QuoteStatus::parse(&status_raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown quote status `{status_raw}`"))
        })?;

        sqlx::query("UPDATE quote SET status = 'invalid', is_active = 0, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id.0)
            .execute(&mut *conn)
            .await?;
        append_history(conn, &id, Some(from), QuoteStatus::Invalid, None).await?;
        engagement::delete_for_quote_tx(conn, &id).await?;
        invalidated += 1;
    }

    // Terminal quotes cannot be active, but clearing the flag here keeps the
    // active-quote slot free regardless of past data.
    sqlx::query("UPDATE quote SET is_active = 0 WHERE opportunity_id = ? AND is_active = 1")
        .bind(&opportunity_id.0)
        .execute(&mut *conn)
        .await?;

    Ok(invalidated)
}

async fn append_history(
    conn: &mut SqliteConnection,
    quote_id: &QuoteId,
    from: Option<QuoteStatus>,
    to: QuoteStatus,
    actor: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO quote_status_history (id, quote_id, from_status, to_status, actor, occurred_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(format!("qsh-{}", Uuid::new_v4()))
    .bind(&quote_id.0)
    .bind(from.map(|status| status.as_str()))
    .bind(to.as_str())
    .bind(actor)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_quote(conn: &mut SqliteConnection, quote: &Quote) -> Result<(), RepositoryError> {
    let snapshot_json = serde_json::to_string(&quote.snapshot)
        .map_err(|error| RepositoryError::Decode(format!("encode snapshot: {error}")))?;

    let (target_amount, billing_unit, blended_rate, cap_type, cap_amount) = match &quote.config {
        QuoteTypeConfig::FixedBid { target_amount, .. } => {
            (Some(target_amount.to_string()), None, None, None, None)
        }
        QuoteTypeConfig::TimeMaterials { billing_unit, blended_rate, cap_type, cap_amount } => (
            None,
            Some(billing_unit.as_str()),
            blended_rate.map(|rate| rate.to_string()),
            Some(cap_type.as_str()),
            cap_amount.map(|amount| amount.to_string()),
        ),
    };

    sqlx::query(
        "INSERT INTO quote (
            id, opportunity_id, estimate_id, quote_number, version, status, is_active,
            quote_type, target_amount, billing_unit, blended_rate, cap_type, cap_amount,
            snapshot_json, sent_date, created_by, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&quote.id.0)
    .bind(&quote.opportunity_id.0)
    .bind(&quote.estimate_id.0)
    .bind(&quote.quote_number)
    .bind(quote.version)
    .bind(quote.status.as_str())
    .bind(i32::from(quote.is_active))
    .bind(quote.config.type_name())
    .bind(target_amount)
    .bind(billing_unit)
    .bind(blended_rate)
    .bind(cap_type)
    .bind(cap_amount)
    .bind(snapshot_json)
    .bind(quote.sent_date.map(|date| date.to_string()))
    .bind(quote.created_by.as_deref())
    .bind(quote.created_at.to_rfc3339())
    .bind(quote.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    if let QuoteTypeConfig::FixedBid { payment_triggers, .. } = &quote.config {
        for trigger in payment_triggers {
            sqlx::query(
                "INSERT INTO quote_payment_trigger (
                    id, quote_id, kind, amount, installment_count, due_date, sort_order
                 ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(format!("pt-{}", Uuid::new_v4()))
            .bind(&quote.id.0)
            .bind(trigger.kind.as_str())
            .bind(trigger.amount.to_string())
            .bind(trigger.installment_count.map(i64::from))
            .bind(trigger.due_date.map(|date| date.to_string()))
            .bind(trigger.sort_order)
            .execute(&mut *conn)
            .await?;
        }
    }

    for compensation in &quote.variable_compensations {
        sqlx::query(
            "INSERT INTO quote_variable_compensation (id, quote_id, name, amount, sort_order)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format!("vc-{}", Uuid::new_v4()))
        .bind(&quote.id.0)
        .bind(&compensation.name)
        .bind(compensation.amount.to_string())
        .bind(compensation.sort_order)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub(crate) async fn load_quote(
    conn: &mut SqliteConnection,
    id: &QuoteId,
) -> Result<Option<Quote>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, opportunity_id, estimate_id, quote_number, version, status, is_active,
                quote_type, target_amount, billing_unit, blended_rate, cap_type, cap_amount,
                snapshot_json, sent_date, created_by, created_at, updated_at
         FROM quote WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let triggers = load_payment_triggers(conn, id).await?;
    let compensations = load_variable_compensations(conn, id).await?;
    quote_from_row(row, triggers, compensations).map(Some)
}

pub(crate) async fn require_quote(
    conn: &mut SqliteConnection,
    id: &QuoteId,
) -> Result<Quote, RepositoryError> {
    load_quote(conn, id).await?.ok_or_else(|| RepositoryError::not_found("quote", &id.0))
}

pub(crate) async fn require_opportunity(
    conn: &mut SqliteConnection,
    id: &OpportunityId,
) -> Result<Opportunity, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, release_id, name, account_name, delivery_center, currency, status,
                start_date, end_date, created_at, updated_at
         FROM opportunity WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(opportunity_from_row)
        .transpose()?
        .ok_or_else(|| RepositoryError::not_found("opportunity", &id.0))
}

async fn load_payment_triggers(
    conn: &mut SqliteConnection,
    quote_id: &QuoteId,
) -> Result<Vec<PaymentTrigger>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT kind, amount, installment_count, due_date, sort_order
         FROM quote_payment_trigger WHERE quote_id = ?
         ORDER BY sort_order ASC, id ASC",
    )
    .bind(&quote_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let kind_raw: String = row.try_get("kind")?;
            let kind = TriggerKind::parse(&kind_raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown payment trigger kind `{kind_raw}`"))
            })?;
            let installment_count = row
                .try_get::<Option<i64>, _>("installment_count")?
                .map(|count| {
                    u32::try_from(count).map_err(|_| {
                        RepositoryError::Decode(format!("invalid installment count {count}"))
                    })
                })
                .transpose()?;

            Ok(PaymentTrigger {
                kind,
                amount: parse_decimal("amount", &row.try_get::<String, _>("amount")?)?,
                installment_count,
                due_date: parse_optional_date("due_date", row.try_get("due_date")?)?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

async fn load_variable_compensations(
    conn: &mut SqliteConnection,
    quote_id: &QuoteId,
) -> Result<Vec<VariableCompensation>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT name, amount, sort_order
         FROM quote_variable_compensation WHERE quote_id = ?
         ORDER BY sort_order ASC, id ASC",
    )
    .bind(&quote_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(VariableCompensation {
                name: row.try_get("name")?,
                amount: parse_decimal("amount", &row.try_get::<String, _>("amount")?)?,
                sort_order: row.try_get("sort_order")?,
            })
        })
        .collect()
}

fn quote_from_row(
    row: SqliteRow,
    payment_triggers: Vec<PaymentTrigger>,
    variable_compensations: Vec<VariableCompensation>,
) -> Result<Quote, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = QuoteStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown quote status `{status_raw}`")))?;

    let version_raw: i64 = row.try_get("version")?;
    let version = i32::try_from(version_raw)
        .map_err(|_| RepositoryError::Decode(format!("quote version overflow: {version_raw}")))?;

    let quote_type: String = row.try_get("quote_type")?;
    let config = match quote_type.as_str() {
        "fixed_bid" => {
            let target_raw: Option<String> = row.try_get("target_amount")?;
            let target_raw = target_raw.ok_or_else(|| {
                RepositoryError::Decode("fixed-bid quote without target_amount".to_string())
            })?;
            QuoteTypeConfig::FixedBid {
                target_amount: parse_decimal("target_amount", &target_raw)?,
                payment_triggers,
            }
        }
        "time_materials" => {
            let billing_unit_raw: Option<String> = row.try_get("billing_unit")?;
            let billing_unit_raw = billing_unit_raw.ok_or_else(|| {
                RepositoryError::Decode("time-materials quote without billing_unit".to_string())
            })?;
            let billing_unit = BillingUnit::parse(&billing_unit_raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown billing unit `{billing_unit_raw}`"))
            })?;

            let cap_type_raw: Option<String> = row.try_get("cap_type")?;
            let cap_type_raw = cap_type_raw.ok_or_else(|| {
                RepositoryError::Decode("time-materials quote without cap_type".to_string())
            })?;
            let cap_type = CapType::parse(&cap_type_raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown cap type `{cap_type_raw}`"))
            })?;

            QuoteTypeConfig::TimeMaterials {
                billing_unit,
                blended_rate: row
                    .try_get::<Option<String>, _>("blended_rate")?
                    .map(|rate| parse_decimal("blended_rate", &rate))
                    .transpose()?,
                cap_type,
                cap_amount: row
                    .try_get::<Option<String>, _>("cap_amount")?
                    .map(|amount| parse_decimal("cap_amount", &amount))
                    .transpose()?,
            }
        }
        other => {
            return Err(RepositoryError::Decode(format!("unknown quote type `{other}`")));
        }
    };

    let snapshot_raw: String = row.try_get("snapshot_json")?;
    let snapshot: Map<String, Value> = serde_json::from_str(&snapshot_raw)
        .map_err(|error| RepositoryError::Decode(format!("decode snapshot_json: {error}")))?;

    Ok(Quote {
        id: QuoteId(row.try_get("id")?),
        opportunity_id: OpportunityId(row.try_get("opportunity_id")?),
        estimate_id: EstimateId(row.try_get("estimate_id")?),
        quote_number: row.try_get("quote_number")?,
        version,
        status,
        is_active: row.try_get::<i32, _>("is_active")? != 0,
        config,
        variable_compensations,
        snapshot,
        sent_date: parse_optional_date("sent_date", row.try_get("sent_date")?)?,
        created_by: row.try_get("created_by")?,
        created_at: parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp("updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}

fn opportunity_from_row(row: SqliteRow) -> Result<Opportunity, RepositoryError> {
    Ok(Opportunity {
        id: OpportunityId(row.try_get("id")?),
        release_id: ReleaseId(row.try_get("release_id")?),
        name: row.try_get("name")?,
        account_name: row.try_get("account_name")?,
        delivery_center: row.try_get("delivery_center")?,
        currency: row.try_get("currency")?,
        status: row.try_get("status")?,
        start_date: super::parse_date("start_date", &row.try_get::<String, _>("start_date")?)?,
        end_date: super::parse_date("end_date", &row.try_get::<String, _>("end_date")?)?,
        created_at: parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp("updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}

fn history_from_row(row: SqliteRow) -> Result<StatusHistoryEntry, RepositoryError> {
    let from_status = row
        .try_get::<Option<String>, _>("from_status")?
        .map(|value| {
            QuoteStatus::parse(&value).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown quote status `{value}`"))
            })
        })
        .transpose()?;

    let to_raw: String = row.try_get("to_status")?;
    let to_status = QuoteStatus::parse(&to_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown quote status `{to_raw}`")))?;

    Ok(StatusHistoryEntry {
        from_status,
        to_status,
        actor: row.try_get("actor")?,
        occurred_at: parse_timestamp("occurred_at", &row.try_get::<String, _>("occurred_at")?)?,
    })
}
