//! PostgreSQL implementation of BroadcastStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::broadcast::{Broadcast, BroadcastReport, BroadcastStatus};
use crate::domain::foundation::{BroadcastId, DomainError, ErrorCode, ExternalId};
use crate::ports::BroadcastStore;

use super::db_error;

pub struct PostgresBroadcastStore {
    pool: PgPool,
}

impl PostgresBroadcastStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BroadcastRow {
    id: i64,
    message: String,
    recipients: Vec<i64>,
    status: String,
}

fn parse_status(s: &str) -> Result<BroadcastStatus, DomainError> {
    match s {
        "pending" => Ok(BroadcastStatus::Pending),
        "running" => Ok(BroadcastStatus::Running),
        "completed" => Ok(BroadcastStatus::Completed),
        "failed" => Ok(BroadcastStatus::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid broadcast status value: {}", s),
        )),
    }
}

#[async_trait]
impl BroadcastStore for PostgresBroadcastStore {
    async fn find(&self, id: BroadcastId) -> Result<Option<Broadcast>, DomainError> {
        let row: Option<BroadcastRow> = sqlx::query_as(
            "SELECT id, message, recipients, status FROM broadcast WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch broadcast", e))?;

        row.map(|row| {
            Ok(Broadcast {
                id: BroadcastId::new(row.id),
                message: row.message,
                recipients: row.recipients.into_iter().map(ExternalId::new).collect(),
                status: parse_status(&row.status)?,
            })
        })
        .transpose()
    }

    async fn set_status(
        &self,
        id: BroadcastId,
        status: BroadcastStatus,
        report: Option<BroadcastReport>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE broadcast SET
                status = $2,
                sent = COALESCE($3, sent),
                failed = COALESCE($4, failed),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(status.as_str())
        .bind(report.map(|r| r.sent as i32))
        .bind(report.map(|r| r.failed as i32))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update broadcast status", e))?;
        Ok(())
    }
}
