//! # Settings Repository
//!
//! Storefront key/value settings. Checkout only needs the delivery fee.

use bazaar_core::{DeliveryFeePolicy, Money};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const DELIVERY_FEE_KEY: &str = "delivery_fee_paise";

/// Repository for storefront settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Raw setting value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Writes a setting value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key, value, "Updating setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Configured delivery fee; zero when unset.
    pub async fn delivery_fee(&self) -> DbResult<Money> {
        match self.get(DELIVERY_FEE_KEY).await? {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(|paise| Money::from_paise(paise).floor_at_zero())
                .map_err(|e| DbError::corrupt("setting", format!("{}: {}", DELIVERY_FEE_KEY, e))),
            None => Ok(Money::zero()),
        }
    }

    /// Delivery fee as a policy.
    pub async fn delivery_fee_policy(&self) -> DbResult<DeliveryFeePolicy> {
        Ok(DeliveryFeePolicy::from_amount(self.delivery_fee().await?))
    }

    /// Sets the delivery fee. Negative amounts are stored as zero.
    pub async fn set_delivery_fee(&self, fee: Money) -> DbResult<()> {
        self.set(DELIVERY_FEE_KEY, &fee.floor_at_zero().paise().to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_delivery_fee_defaults_to_free() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.settings().delivery_fee().await.unwrap(), Money::zero());
        assert_eq!(
            db.settings().delivery_fee_policy().await.unwrap(),
            DeliveryFeePolicy::Free
        );
    }

    #[tokio::test]
    async fn test_set_delivery_fee() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set_delivery_fee(Money::from_rupees(100)).await.unwrap();

        assert_eq!(db.settings().delivery_fee().await.unwrap(), Money::from_rupees(100));
    }

    #[tokio::test]
    async fn test_garbage_fee_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set(DELIVERY_FEE_KEY, "lots").await.unwrap();

        assert!(matches!(
            db.settings().delivery_fee().await,
            Err(DbError::CorruptRow { .. })
        ));
    }
}
