//! PostgreSQL implementation of CustomerRepository.
//!
//! Offer snapshots are stored as groups of nullable columns that are
//! always written and cleared together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

use crate::domain::customer::{Customer, PromoOffer, RecurringBilling, WinbackOffer};
use crate::domain::foundation::{
    CodeId, CustomerId, DomainError, ErrorCode, ExternalId, Timestamp,
};
use crate::domain::offer::{Offer, OfferKind};
use crate::ports::CustomerRepository;

use super::db_error;

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CUSTOMER_COLUMNS: &str = r#"
    id, external_id, expire_at, language, created_at,
    recurring_enabled, payment_method_id, recurring_tariff_name,
    recurring_months, recurring_amount, recurring_notified_at,
    winback_offer_sent_at, winback_offer_expires_at, winback_offer_price,
    winback_offer_devices, winback_offer_months,
    promo_offer_code_id, promo_offer_price, promo_offer_devices,
    promo_offer_months, promo_offer_expires_at,
    trial_inactive_notified_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    external_id: i64,
    expire_at: Option<DateTime<Utc>>,
    language: String,
    created_at: DateTime<Utc>,
    recurring_enabled: bool,
    payment_method_id: Option<String>,
    recurring_tariff_name: Option<String>,
    recurring_months: Option<i32>,
    recurring_amount: Option<i64>,
    recurring_notified_at: Option<DateTime<Utc>>,
    winback_offer_sent_at: Option<DateTime<Utc>>,
    winback_offer_expires_at: Option<DateTime<Utc>>,
    winback_offer_price: Option<i64>,
    winback_offer_devices: Option<i32>,
    winback_offer_months: Option<i32>,
    promo_offer_code_id: Option<i64>,
    promo_offer_price: Option<i64>,
    promo_offer_devices: Option<i32>,
    promo_offer_months: Option<i32>,
    promo_offer_expires_at: Option<DateTime<Utc>>,
    trial_inactive_notified_at: Option<DateTime<Utc>>,
}

fn ts(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from_datetime)
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let winback_offer = Offer::from_columns(
            OfferKind::Winback,
            row.winback_offer_price,
            row.winback_offer_devices,
            row.winback_offer_months,
            ts(row.winback_offer_expires_at),
        )?
        .map(|offer| WinbackOffer {
            sent_at: ts(row.winback_offer_sent_at)
                .unwrap_or_else(|| Timestamp::from_datetime(row.created_at)),
            offer,
        });

        let promo_offer = match Offer::from_columns(
            OfferKind::TariffPromo,
            row.promo_offer_price,
            row.promo_offer_devices,
            row.promo_offer_months,
            ts(row.promo_offer_expires_at),
        )? {
            Some(offer) => {
                let code_id = row.promo_offer_code_id.ok_or_else(|| {
                    DomainError::invariant("tariff promo offer stored without its code id")
                })?;
                Some(PromoOffer {
                    code_id: CodeId::new(code_id),
                    offer,
                })
            }
            None => None,
        };

        Ok(Customer {
            id: CustomerId::new(row.id),
            external_id: ExternalId::new(row.external_id),
            expire_at: ts(row.expire_at),
            language: row.language,
            recurring: RecurringBilling {
                enabled: row.recurring_enabled,
                payment_method_id: row.payment_method_id,
                tariff_name: row.recurring_tariff_name,
                months: row.recurring_months.map(|m| m.max(0) as u32),
                amount: row.recurring_amount,
                notified_at: ts(row.recurring_notified_at),
            },
            winback_offer,
            promo_offer,
            trial_inactive_notified_at: ts(row.trial_inactive_notified_at),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

impl PostgresCustomerRepository {
    async fn fetch_one_where(
        &self,
        clause: &str,
        value: i64,
    ) -> Result<Option<Customer>, DomainError> {
        let sql = format!("SELECT {} FROM customer WHERE {} = $1", CUSTOMER_COLUMNS, clause);
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch customer", e))?;
        row.map(Customer::try_from).transpose()
    }

    /// Runs an update that must touch the customer's row.
    async fn execute_for(
        &self,
        id: CustomerId,
        query: Query<'_, Postgres, PgArguments>,
        action: &str,
    ) -> Result<(), DomainError> {
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(action, e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::CustomerNotFound,
                format!("customer {} not found", id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_or_create(
        &self,
        external_id: ExternalId,
        language: &str,
    ) -> Result<Customer, DomainError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let sql = format!(
            r#"
            INSERT INTO customer (external_id, language)
            VALUES ($1, $2)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        );
        let row: CustomerRow = sqlx::query_as(&sql)
            .bind(external_id.as_i64())
            .bind(language)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("create customer", e))?;
        Customer::try_from(row)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DomainError> {
        self.fetch_one_where("id", id.as_i64()).await
    }

    async fn find_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Customer>, DomainError> {
        self.fetch_one_where("external_id", external_id.as_i64())
            .await
    }

    async fn update_expire_at(
        &self,
        id: CustomerId,
        expire_at: Timestamp,
    ) -> Result<(), DomainError> {
        let query = sqlx::query("UPDATE customer SET expire_at = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(*expire_at.as_datetime());
        self.execute_for(id, query, "update customer expiry").await
    }

    async fn update_recurring(
        &self,
        id: CustomerId,
        recurring: &RecurringBilling,
    ) -> Result<(), DomainError> {
        let query = sqlx::query(
            r#"
            UPDATE customer SET
                recurring_enabled = $2,
                payment_method_id = $3,
                recurring_tariff_name = $4,
                recurring_months = $5,
                recurring_amount = $6,
                recurring_notified_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(recurring.enabled)
        .bind(recurring.payment_method_id.clone())
        .bind(recurring.tariff_name.clone())
        .bind(recurring.months.map(|m| m as i32))
        .bind(recurring.amount)
        .bind(recurring.notified_at.map(|t| *t.as_datetime()));
        self.execute_for(id, query, "update recurring billing").await
    }

    async fn set_promo_offer(&self, id: CustomerId, offer: &PromoOffer) -> Result<(), DomainError> {
        let query = sqlx::query(
            r#"
            UPDATE customer SET
                promo_offer_code_id = $2,
                promo_offer_price = $3,
                promo_offer_devices = $4,
                promo_offer_months = $5,
                promo_offer_expires_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(offer.code_id.as_i64())
        .bind(offer.offer.price)
        .bind(offer.offer.devices as i32)
        .bind(offer.offer.months as i32)
        .bind(*offer.offer.expires_at.as_datetime());
        self.execute_for(id, query, "write promo offer").await
    }

    async fn set_winback_offer(
        &self,
        id: CustomerId,
        offer: &WinbackOffer,
    ) -> Result<(), DomainError> {
        let query = sqlx::query(
            r#"
            UPDATE customer SET
                winback_offer_sent_at = $2,
                winback_offer_price = $3,
                winback_offer_devices = $4,
                winback_offer_months = $5,
                winback_offer_expires_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(*offer.sent_at.as_datetime())
        .bind(offer.offer.price)
        .bind(offer.offer.devices as i32)
        .bind(offer.offer.months as i32)
        .bind(*offer.offer.expires_at.as_datetime());
        self.execute_for(id, query, "write winback offer").await
    }

    async fn clear_offer(&self, id: CustomerId, kind: OfferKind) -> Result<(), DomainError> {
        let sql = match kind {
            OfferKind::TariffPromo => {
                r#"
                UPDATE customer SET
                    promo_offer_code_id = NULL,
                    promo_offer_price = NULL,
                    promo_offer_devices = NULL,
                    promo_offer_months = NULL,
                    promo_offer_expires_at = NULL
                WHERE id = $1
                "#
            }
            OfferKind::Winback => {
                r#"
                UPDATE customer SET
                    winback_offer_price = NULL,
                    winback_offer_devices = NULL,
                    winback_offer_months = NULL,
                    winback_offer_expires_at = NULL
                WHERE id = $1
                "#
            }
        };
        let query = sqlx::query(sql).bind(id.as_i64());
        self.execute_for(id, query, "clear offer").await
    }
}
