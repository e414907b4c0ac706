//! PostgreSQL implementations of the promo code and tariff promo code stores.
//!
//! The activation limit holds under concurrency because the increment
//! is a single conditional UPDATE. The per-customer limit is the
//! activation table's primary key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{CodeId, CustomerId, DomainError, ErrorCode, Timestamp};
use crate::domain::offer::{
    CodeValue, NewPromoCode, NewPromoTariffCode, PromoCode, PromoTariffCode,
};
use crate::ports::{PromoCodeRepository, PromoTariffCodeRepository};

use super::db_error;

fn code_value(raw: String) -> Result<CodeValue, DomainError> {
    CodeValue::try_from(raw).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored code: {}", e))
    })
}

fn unique_violation(err: sqlx::Error, code: &CodeValue) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return DomainError::new(ErrorCode::Conflict, format!("code {} already exists", code));
        }
    }
    db_error("create code", err)
}

// ════════════════════════════════════════════════════════════════════════════════
// Generic promo codes
// ════════════════════════════════════════════════════════════════════════════════

pub struct PostgresPromoCodeRepository {
    pool: PgPool,
}

impl PostgresPromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    id: i64,
    code: String,
    bonus_days: i64,
    max_activations: i32,
    current_activations: i32,
    is_active: bool,
    valid_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = DomainError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        Ok(PromoCode {
            id: CodeId::new(row.id),
            code: code_value(row.code)?,
            bonus_days: row.bonus_days,
            max_activations: row.max_activations,
            current_activations: row.current_activations,
            is_active: row.is_active,
            valid_until: row.valid_until.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl PromoCodeRepository for PostgresPromoCodeRepository {
    async fn create(&self, code: NewPromoCode) -> Result<PromoCode, DomainError> {
        let row: PromoCodeRow = sqlx::query_as(
            r#"
            INSERT INTO promo_code (code, bonus_days, max_activations, valid_until)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, bonus_days, max_activations, current_activations,
                      is_active, valid_until, created_at
            "#,
        )
        .bind(code.code.as_str())
        .bind(code.bonus_days)
        .bind(code.max_activations)
        .bind(code.valid_until.map(|t| *t.as_datetime()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &code.code))?;
        PromoCode::try_from(row)
    }

    async fn find_by_code(&self, code: &CodeValue) -> Result<Option<PromoCode>, DomainError> {
        let row: Option<PromoCodeRow> = sqlx::query_as(
            r#"
            SELECT id, code, bonus_days, max_activations, current_activations,
                   is_active, valid_until, created_at
            FROM promo_code WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch promo code", e))?;
        row.map(PromoCode::try_from).transpose()
    }

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError> {
        sqlx::query("UPDATE promo_code SET is_active = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update promo code", e))?;
        Ok(())
    }

    async fn delete(&self, id: CodeId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM promo_code WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete promo code", e))?;
        Ok(())
    }

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM promo_code_activation WHERE code_id = $1 AND customer_id = $2
            )
            "#,
        )
        .bind(code_id.as_i64())
        .bind(customer_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check promo activation", e))
    }

    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO promo_code_activation (code_id, customer_id, activated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (code_id, customer_id) DO NOTHING
            "#,
        )
        .bind(code_id.as_i64())
        .bind(customer_id.as_i64())
        .bind(*at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record promo activation", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE promo_code SET current_activations = current_activations + 1
            WHERE id = $1 AND current_activations < max_activations
            "#,
        )
        .bind(code_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("increment promo activations", e))?;
        Ok(result.rows_affected() == 1)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tariff promo codes
// ════════════════════════════════════════════════════════════════════════════════

pub struct PostgresPromoTariffCodeRepository {
    pool: PgPool,
}

impl PostgresPromoTariffCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PromoTariffCodeRow {
    id: i64,
    code: String,
    price: i64,
    devices: i32,
    months: i32,
    max_activations: i32,
    current_activations: i32,
    valid_hours: i64,
    is_active: bool,
    valid_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PromoTariffCodeRow> for PromoTariffCode {
    type Error = DomainError;

    fn try_from(row: PromoTariffCodeRow) -> Result<Self, Self::Error> {
        if row.devices <= 0 || row.months <= 0 {
            return Err(DomainError::invariant(format!(
                "tariff promo code {} has non-positive devices or months",
                row.id
            )));
        }
        Ok(PromoTariffCode {
            id: CodeId::new(row.id),
            code: code_value(row.code)?,
            price: row.price,
            devices: row.devices as u32,
            months: row.months as u32,
            max_activations: row.max_activations,
            current_activations: row.current_activations,
            valid_hours: row.valid_hours,
            is_active: row.is_active,
            valid_until: row.valid_until.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const TARIFF_CODE_COLUMNS: &str = r#"
    id, code, price, devices, months, max_activations, current_activations,
    valid_hours, is_active, valid_until, created_at
"#;

#[async_trait]
impl PromoTariffCodeRepository for PostgresPromoTariffCodeRepository {
    async fn create(&self, code: NewPromoTariffCode) -> Result<PromoTariffCode, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO promo_tariff_code
                (code, price, devices, months, max_activations, valid_hours, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TARIFF_CODE_COLUMNS
        );
        let row: PromoTariffCodeRow = sqlx::query_as(&sql)
            .bind(code.code.as_str())
            .bind(code.price)
            .bind(code.devices as i32)
            .bind(code.months as i32)
            .bind(code.max_activations)
            .bind(code.valid_hours)
            .bind(code.valid_until.map(|t| *t.as_datetime()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_violation(e, &code.code))?;
        PromoTariffCode::try_from(row)
    }

    async fn find_by_code(
        &self,
        code: &CodeValue,
    ) -> Result<Option<PromoTariffCode>, DomainError> {
        let sql = format!(
            "SELECT {} FROM promo_tariff_code WHERE code = $1",
            TARIFF_CODE_COLUMNS
        );
        let row: Option<PromoTariffCodeRow> = sqlx::query_as(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch tariff promo code", e))?;
        row.map(PromoTariffCode::try_from).transpose()
    }

    async fn set_active(&self, id: CodeId, active: bool) -> Result<(), DomainError> {
        sqlx::query("UPDATE promo_tariff_code SET is_active = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update tariff promo code", e))?;
        Ok(())
    }

    async fn delete(&self, id: CodeId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM promo_tariff_code WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete tariff promo code", e))?;
        Ok(())
    }

    async fn has_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM promo_tariff_code_activation
                WHERE code_id = $1 AND customer_id = $2
            )
            "#,
        )
        .bind(code_id.as_i64())
        .bind(customer_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check tariff promo activation", e))
    }

    async fn record_activation(
        &self,
        code_id: CodeId,
        customer_id: CustomerId,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO promo_tariff_code_activation (code_id, customer_id, activated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (code_id, customer_id) DO NOTHING
            "#,
        )
        .bind(code_id.as_i64())
        .bind(customer_id.as_i64())
        .bind(*at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record tariff promo activation", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_activations(&self, code_id: CodeId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE promo_tariff_code SET current_activations = current_activations + 1
            WHERE id = $1 AND current_activations < max_activations
            "#,
        )
        .bind(code_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("increment tariff promo activations", e))?;
        Ok(result.rows_affected() == 1)
    }
}
