//! PostgreSQL implementation of PurchaseRepository.
//!
//! Status moves are single conditional UPDATEs; `rows_affected` tells the
//! caller whether it performed the transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{
    Currency, CustomerId, DomainError, ErrorCode, PurchaseId, Timestamp,
};
use crate::domain::offer::OfferKind;
use crate::domain::purchase::{InvoiceType, NewPurchase, Purchase, PurchaseStatus};
use crate::ports::PurchaseRepository;

use super::db_error;

pub struct PostgresPurchaseRepository {
    pool: PgPool,
}

impl PostgresPurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PURCHASE_COLUMNS: &str = r#"
    id, customer_id, amount, currency, month, status, invoice_type,
    correlation_id, tariff_name, device_limit, offer_kind,
    save_payment_method, is_recurring, created_at, paid_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: i64,
    customer_id: i64,
    amount: i64,
    currency: String,
    month: i32,
    status: String,
    invoice_type: String,
    correlation_id: Option<String>,
    tariff_name: Option<String>,
    device_limit: Option<i32>,
    offer_kind: Option<String>,
    save_payment_method: bool,
    is_recurring: bool,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", field, err),
    )
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DomainError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let currency: Currency = row.currency.parse().map_err(|e| corrupt("currency", e))?;
        let status: PurchaseStatus = row.status.parse().map_err(|e| corrupt("status", e))?;
        let invoice_type: InvoiceType = row
            .invoice_type
            .parse()
            .map_err(|e| corrupt("invoice_type", e))?;
        let offer_kind = row
            .offer_kind
            .as_deref()
            .map(str::parse::<OfferKind>)
            .transpose()
            .map_err(|e| corrupt("offer_kind", e))?;

        Ok(Purchase {
            id: PurchaseId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            amount: row.amount,
            currency,
            months: row.month.max(0) as u32,
            status,
            invoice_type,
            correlation_id: row.correlation_id,
            tariff_name: row.tariff_name,
            device_limit: row.device_limit.map(|d| d.max(0) as u32),
            offer_kind,
            save_payment_method: row.save_payment_method,
            is_recurring: row.is_recurring,
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
        })
    }
}

fn rows_into_purchases(rows: Vec<PurchaseRow>) -> Result<Vec<Purchase>, DomainError> {
    rows.into_iter().map(Purchase::try_from).collect()
}

#[async_trait]
impl PurchaseRepository for PostgresPurchaseRepository {
    async fn create(&self, purchase: NewPurchase) -> Result<Purchase, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO purchase (
                customer_id, amount, currency, month, status, invoice_type,
                correlation_id, tariff_name, device_limit, offer_kind, save_payment_method,
                is_recurring
            ) VALUES ($1, $2, $3, $4, 'new', $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        );
        let row: PurchaseRow = sqlx::query_as(&sql)
            .bind(purchase.customer_id.as_i64())
            .bind(purchase.amount)
            .bind(purchase.currency.as_str())
            .bind(purchase.months as i32)
            .bind(purchase.invoice_type.as_str())
            .bind(purchase.correlation_id.clone())
            .bind(purchase.tariff_name.clone())
            .bind(purchase.device_limit.map(|d| d as i32))
            .bind(purchase.offer_kind.map(|k| k.as_str()))
            .bind(purchase.save_payment_method)
            .bind(purchase.is_recurring)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("create purchase", e))?;
        Purchase::try_from(row)
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, DomainError> {
        let sql = format!("SELECT {} FROM purchase WHERE id = $1", PURCHASE_COLUMNS);
        let row: Option<PurchaseRow> = sqlx::query_as(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch purchase", e))?;
        row.map(Purchase::try_from).transpose()
    }

    async fn find_by_correlation_id(
        &self,
        invoice_type: InvoiceType,
        correlation_id: &str,
    ) -> Result<Option<Purchase>, DomainError> {
        let sql = format!(
            "SELECT {} FROM purchase WHERE invoice_type = $1 AND correlation_id = $2",
            PURCHASE_COLUMNS
        );
        let row: Option<PurchaseRow> = sqlx::query_as(&sql)
            .bind(invoice_type.as_str())
            .bind(correlation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch purchase by correlation id", e))?;
        row.map(Purchase::try_from).transpose()
    }

    async fn find_by_invoice_type_and_status(
        &self,
        invoice_type: InvoiceType,
        status: PurchaseStatus,
    ) -> Result<Vec<Purchase>, DomainError> {
        let sql = format!(
            "SELECT {} FROM purchase WHERE invoice_type = $1 AND status = $2 ORDER BY id",
            PURCHASE_COLUMNS
        );
        let rows: Vec<PurchaseRow> = sqlx::query_as(&sql)
            .bind(invoice_type.as_str())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list purchases", e))?;
        rows_into_purchases(rows)
    }

    async fn mark_as_pending(
        &self,
        id: PurchaseId,
        correlation_id: Option<&str>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE purchase
            SET status = 'pending', correlation_id = COALESCE($2, correlation_id)
            WHERE id = $1 AND status = 'new'
            "#,
        )
        .bind(id.as_i64())
        .bind(correlation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark purchase pending", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_as_paid(&self, id: PurchaseId, paid_at: Timestamp) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE purchase SET status = 'paid', paid_at = $2
            WHERE id = $1 AND status IN ('new', 'pending')
            "#,
        )
        .bind(id.as_i64())
        .bind(*paid_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark purchase paid", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_as_cancelled(&self, id: PurchaseId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE purchase SET status = 'cancel' WHERE id = $1 AND status IN ('new', 'pending')",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("cancel purchase", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn has_paid_purchases(&self, customer_id: CustomerId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchase WHERE customer_id = $1 AND status = 'paid')",
        )
        .bind(customer_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check paid purchases", e))
    }

    async fn has_recent_paid_purchase(
        &self,
        customer_id: CustomerId,
        window_minutes: i64,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let since = now.minus_minutes(window_minutes);
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM purchase
                WHERE customer_id = $1 AND status = 'paid' AND paid_at >= $2
            )
            "#,
        )
        .bind(customer_id.as_i64())
        .bind(*since.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check recent payments", e))
    }

    async fn find_open_recurring_charge(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Purchase>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM purchase
            WHERE customer_id = $1 AND is_recurring AND status IN ('new', 'pending')
            ORDER BY id DESC
            LIMIT 1
            "#,
            PURCHASE_COLUMNS
        );
        let row: Option<PurchaseRow> = sqlx::query_as(&sql)
            .bind(customer_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch open recurring charge", e))?;
        row.map(Purchase::try_from).transpose()
    }
}
