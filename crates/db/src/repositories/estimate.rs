use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use staffquote_core::{
    next_version_name, snapshot_plan, Estimate, EstimateId, ReleaseId, ResourcePlan,
};

use super::plan::{self, ESTIMATE_PLAN};
use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

/// Estimate version manager: owns the single-active-version invariant per
/// release and the draft/clone derivations.
pub struct SqlEstimateRepository {
    pool: DbPool,
}

impl SqlEstimateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &EstimateId) -> Result<Option<Estimate>, RepositoryError> {
        let row = sqlx::query(SELECT_ESTIMATE_WHERE_ID)
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(estimate_from_row).transpose()
    }

    /// The authoritative estimate for a release, if any. No error when the
    /// release has no active estimate.
    pub async fn get_active(
        &self,
        release_id: &ReleaseId,
    ) -> Result<Option<Estimate>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, release_id, name, active_version, attributes_json,
                    created_by, created_at, updated_at
             FROM estimate
             WHERE release_id = ? AND active_version = 1",
        )
        .bind(&release_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(estimate_from_row).transpose()
    }

    /// Make `id` the release's single active version. Every sibling is
    /// demoted in the same transaction; calling this on an already-active
    /// estimate is a no-op.
    pub async fn activate(&self, id: &EstimateId) -> Result<Estimate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let estimate = require_estimate(&mut tx, id).await?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE estimate SET active_version = 0, updated_at = ?
             WHERE release_id = ? AND id <> ? AND active_version = 1",
        )
        .bind(&now)
        .bind(&estimate.release_id.0)
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE estimate SET active_version = 1, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.find_by_id(id).await?.ok_or_else(|| RepositoryError::not_found("estimate", &id.0))
    }

    /// Derive a new draft for the release. With no active estimate the draft
    /// becomes active immediately (nothing to branch from); otherwise it is
    /// created inactive with the active estimate's plan and attributes
    /// deep-copied in.
    pub async fn create_draft(
        &self,
        release_id: &ReleaseId,
        name: Option<&str>,
        created_by: Option<&str>,
    ) -> Result<Estimate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        require_release(&mut tx, release_id).await?;

        let existing_names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM estimate WHERE release_id = ?")
                .bind(&release_id.0)
                .fetch_all(&mut *tx)
                .await?;

        let active_row = sqlx::query(
            "SELECT id, release_id, name, active_version, attributes_json,
                    created_by, created_at, updated_at
             FROM estimate
             WHERE release_id = ? AND active_version = 1",
        )
        .bind(&release_id.0)
        .fetch_optional(&mut *tx)
        .await?;
        let active = active_row.map(estimate_from_row).transpose()?;

        let draft_name = match name {
            Some(name) => name.to_string(),
            None => next_version_name(&existing_names),
        };

        let now = Utc::now();
        let draft = Estimate {
            id: EstimateId::generate(),
            release_id: release_id.clone(),
            name: draft_name,
            active_version: active.is_none(),
            attributes: active
                .as_ref()
                .map(|estimate| estimate.attributes.clone())
                .unwrap_or_default(),
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        insert_estimate(&mut tx, &draft).await?;

        if let Some(active) = &active {
            let source_plan = plan::load_plan(&mut tx, &ESTIMATE_PLAN, &active.id.0).await?;
            let copy = snapshot_plan(&source_plan);
            plan::insert_plan(&mut tx, &ESTIMATE_PLAN, &draft.id.0, &copy).await?;
        }

        tx.commit().await?;
        Ok(draft)
    }

    /// Deep copy into a new, inactive estimate. Active flags elsewhere are
    /// untouched.
    pub async fn clone_estimate(
        &self,
        id: &EstimateId,
        new_name: Option<&str>,
    ) -> Result<Estimate, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let source = require_estimate(&mut tx, id).await?;
        let now = Utc::now();
        let copy = Estimate {
            id: EstimateId::generate(),
            release_id: source.release_id.clone(),
            name: new_name.map(str::to_string).unwrap_or_else(|| format!("{} (copy)", source.name)),
            active_version: false,
            attributes: source.attributes.clone(),
            created_by: source.created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        insert_estimate(&mut tx, &copy).await?;

        let source_plan = plan::load_plan(&mut tx, &ESTIMATE_PLAN, &id.0).await?;
        plan::insert_plan(&mut tx, &ESTIMATE_PLAN, &copy.id.0, &snapshot_plan(&source_plan))
            .await?;

        tx.commit().await?;
        Ok(copy)
    }

    pub async fn load_plan(&self, id: &EstimateId) -> Result<ResourcePlan, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        require_estimate(&mut conn, id).await?;
        plan::load_plan(&mut conn, &ESTIMATE_PLAN, &id.0).await
    }

    /// Replace the estimate's plan wholesale (the line-item edit surface).
    pub async fn save_plan(
        &self,
        id: &EstimateId,
        plan_data: &ResourcePlan,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        require_estimate(&mut tx, id).await?;
        plan::replace_plan(&mut tx, &ESTIMATE_PLAN, &id.0, plan_data).await?;
        sqlx::query("UPDATE estimate SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

const SELECT_ESTIMATE_WHERE_ID: &str = "SELECT id, release_id, name, active_version, \
     attributes_json, created_by, created_at, updated_at FROM estimate WHERE id = ?";

pub(crate) async fn require_estimate(
    conn: &mut SqliteConnection,
    id: &EstimateId,
) -> Result<Estimate, RepositoryError> {
    let row = sqlx::query(SELECT_ESTIMATE_WHERE_ID)
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(estimate_from_row)
        .transpose()?
        .ok_or_else(|| RepositoryError::not_found("estimate", &id.0))
}

async fn require_release(
    conn: &mut SqliteConnection,
    id: &ReleaseId,
) -> Result<(), RepositoryError> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM release WHERE id = ?")
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;
    exists.map(|_| ()).ok_or_else(|| RepositoryError::not_found("release", &id.0))
}

async fn insert_estimate(
    conn: &mut SqliteConnection,
    estimate: &Estimate,
) -> Result<(), RepositoryError> {
    let attributes_json = serde_json::to_string(&estimate.attributes)
        .map_err(|error| RepositoryError::Decode(format!("encode attributes: {error}")))?;

    sqlx::query(
        "INSERT INTO estimate (
            id, release_id, name, active_version, attributes_json,
            created_by, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&estimate.id.0)
    .bind(&estimate.release_id.0)
    .bind(&estimate.name)
    .bind(i32::from(estimate.active_version))
    .bind(attributes_json)
    .bind(estimate.created_by.as_deref())
    .bind(estimate.created_at.to_rfc3339())
    .bind(estimate.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn estimate_from_row(row: SqliteRow) -> Result<Estimate, RepositoryError> {
    let attributes_raw: String = row.try_get("attributes_json")?;
    let attributes: Map<String, Value> = serde_json::from_str(&attributes_raw)
        .map_err(|error| RepositoryError::Decode(format!("decode attributes_json: {error}")))?;

    Ok(Estimate {
        id: EstimateId(row.try_get("id")?),
        release_id: ReleaseId(row.try_get("release_id")?),
        name: row.try_get("name")?,
        active_version: row.try_get::<i32, _>("active_version")? != 0,
        attributes,
        created_by: row.try_get("created_by")?,
        created_at: parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp("updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}
