//! services/api/src/adapters/postgres.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `PlanRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgQueryResult, types::Json, FromRow, PgPool};
use study_plan_core::{
    CompletionId, GeneratedPlan, PersistedPlan, PlanId, PlanParameters, PlanRepository,
    PlanStatus, PortError, PortResult, ProgressSnapshot, UserId,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `PlanRepository` port.
#[derive(Clone)]
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    /// Creates a new `PgPlanRepository`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const SELECT_COLUMNS: &str = "id, content, params, status, progress, is_starred, is_tracked, \
                              completed_items, created_at, updated_at";

#[derive(FromRow)]
struct PlanRecord {
    id: String,
    content: Json<GeneratedPlan>,
    params: Json<PlanParameters>,
    status: String,
    progress: i16,
    is_starred: bool,
    is_tracked: bool,
    completed_items: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlanRecord {
    fn to_domain(self) -> PortResult<PersistedPlan> {
        let status = PlanStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("plan {} has unknown status {}", self.id, self.status))
        })?;
        let progress = u8::try_from(self.progress).map_err(|_| {
            PortError::Unexpected(format!("plan {} has invalid progress {}", self.id, self.progress))
        })?;
        Ok(PersistedPlan {
            id: PlanId(self.id),
            plan: self.content.0,
            params: self.params.0,
            status,
            progress,
            is_starred: self.is_starred,
            is_tracked: self.is_tracked,
            completed_items: self.completed_items.into_iter().map(CompletionId).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn completion_ids(items: &std::collections::BTreeSet<CompletionId>) -> Vec<String> {
    items.iter().map(|id| id.0.clone()).collect()
}

/// A write that touched no row means the plan does not exist for this user.
fn expect_row(result: PgQueryResult, plan_id: &PlanId) -> PortResult<()> {
    if result.rows_affected() == 0 {
        Err(PortError::NotFound(format!("Plan {plan_id} not found")))
    } else {
        Ok(())
    }
}

//=========================================================================================
// `PlanRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn insert_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO study_plans \
             (id, user_id, content, params, status, progress, is_starred, is_tracked, \
              completed_items, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(plan.id.as_str())
        .bind(&user_id.0)
        .bind(Json(&plan.plan))
        .bind(Json(&plan.params))
        .bind(plan.status.as_str())
        .bind(i16::from(plan.progress))
        .bind(plan.is_starred)
        .bind(plan.is_tracked)
        .bind(completion_ids(&plan.completed_items))
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_plans(&self, user_id: &UserId) -> PortResult<Vec<PersistedPlan>> {
        let records = sqlx::query_as::<_, PlanRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM study_plans WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(PlanRecord::to_domain).collect()
    }

    async fn get_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<PersistedPlan> {
        sqlx::query_as::<_, PlanRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM study_plans WHERE user_id = $1 AND id = $2"
        ))
        .bind(&user_id.0)
        .bind(plan_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Plan {plan_id} not found")),
            _ => unexpected(e),
        })?
        .to_domain()
    }

    async fn replace_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE study_plans SET content = $3, params = $4, status = $5, progress = $6, \
             is_starred = $7, is_tracked = $8, completed_items = $9, updated_at = $10 \
             WHERE user_id = $1 AND id = $2",
        )
        .bind(&user_id.0)
        .bind(plan.id.as_str())
        .bind(Json(&plan.plan))
        .bind(Json(&plan.params))
        .bind(plan.status.as_str())
        .bind(i16::from(plan.progress))
        .bind(plan.is_starred)
        .bind(plan.is_tracked)
        .bind(completion_ids(&plan.completed_items))
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row(result, &plan.id)
    }

    async fn update_progress(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        progress: &ProgressSnapshot,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE study_plans SET progress = $3, completed_items = $4, updated_at = NOW() \
             WHERE user_id = $1 AND id = $2",
        )
        .bind(&user_id.0)
        .bind(plan_id.as_str())
        .bind(i16::from(progress.progress))
        .bind(completion_ids(&progress.completed_items))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row(result, plan_id)
    }

    async fn set_starred(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        starred: bool,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE study_plans SET is_starred = $3, updated_at = NOW() \
             WHERE user_id = $1 AND id = $2",
        )
        .bind(&user_id.0)
        .bind(plan_id.as_str())
        .bind(starred)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row(result, plan_id)
    }

    async fn delete_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM study_plans WHERE user_id = $1 AND id = $2")
            .bind(&user_id.0)
            .bind(plan_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_row(result, plan_id)
    }
}
