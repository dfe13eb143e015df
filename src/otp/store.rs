use crate::{error::AuthError, otp::OtpRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Append-only storage for issued codes.
///
/// `find_latest` must reflect the last committed insert per phone, so
/// implementations need a stable creation-order tiebreak.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Append a new record. Never overwrites earlier rows for the phone.
    async fn insert(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// The most recently created record for `phone`, or `AuthError::NotFound`.
    async fn find_latest(&self, phone: &str) -> Result<OtpRecord, AuthError>;
}

/// Postgres-backed store. The BIGSERIAL id provides the creation-order
/// tiebreak for `find_latest`.
#[derive(Debug, Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn insert(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query("INSERT INTO otp_codes (phone, code, expires_at) VALUES ($1, $2, $3)")
            .bind(phone)
            .bind(code)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        debug!("stored otp code for {phone}");

        Ok(())
    }

    async fn find_latest(&self, phone: &str) -> Result<OtpRecord, AuthError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            "SELECT id, phone, code, created_at, expires_at \
             FROM otp_codes WHERE phone = $1 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(AuthError::NotFound)
    }
}

/// In-memory store, useful for hosts that do not want Postgres and for
/// tests. A per-process sequence stands in for the BIGSERIAL id.
#[derive(Debug, Clone, Default)]
pub struct MemoryOtpStore {
    records: Arc<RwLock<Vec<OtpRecord>>>,
}

impl MemoryOtpStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn insert(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        let id = records.len() as i64 + 1;

        records.push(OtpRecord {
            id,
            phone: phone.to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
            expires_at,
        });

        Ok(())
    }

    async fn find_latest(&self, phone: &str) -> Result<OtpRecord, AuthError> {
        let records = self.records.read().await;

        records
            .iter()
            .rev()
            .find(|record| record.phone == phone)
            .cloned()
            .ok_or(AuthError::NotFound)
    }
}
