use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A directory entry for an authenticated phone. Business fields live in
/// `profile`, owned by the host application.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub phone: String,
    pub profile: Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// User lookup and registration capability consumed by the auth protocol.
///
/// Registration status is read at token-mint time and by the registration
/// guard, never re-checked on ordinary gated requests.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether a user record exists for `phone`.
    async fn is_registered(&self, phone: &str) -> Result<bool, AuthError>;

    /// Create the record for `phone`, carrying the opaque profile payload.
    async fn register(&self, phone: &str, profile: Value) -> Result<(), AuthError>;

    /// The record for `phone`, or `AuthError::NotFound`.
    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, AuthError>;
}

/// Postgres-backed directory.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn is_registered(&self, phone: &str) -> Result<bool, AuthError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1) AS registered")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("registered"))
    }

    async fn register(&self, phone: &str, profile: Value) -> Result<(), AuthError> {
        let result = sqlx::query("INSERT INTO users (id, phone, profile) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(phone)
            .bind(profile)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AuthError::Registration(format!("phone {phone} already registered")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, AuthError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, phone, profile, created_at FROM users WHERE phone = $1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(AuthError::NotFound)
    }
}

/// In-memory directory for hosts without Postgres and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn is_registered(&self, phone: &str) -> Result<bool, AuthError> {
        Ok(self.users.read().await.contains_key(phone))
    }

    async fn register(&self, phone: &str, profile: Value) -> Result<(), AuthError> {
        let mut users = self.users.write().await;

        if users.contains_key(phone) {
            return Err(AuthError::Registration(format!(
                "phone {phone} already registered"
            )));
        }

        users.insert(
            phone.to_string(),
            UserRecord {
                id: Uuid::new_v4(),
                phone: phone.to_string(),
                profile,
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, AuthError> {
        self.users
            .read()
            .await
            .get(phone)
            .cloned()
            .ok_or(AuthError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn register_then_lookup() {
        let directory = MemoryUserDirectory::new();

        assert!(!directory.is_registered("+15551234567").await.unwrap());

        directory
            .register("+15551234567", json!({"name": "Amina"}))
            .await
            .unwrap();

        assert!(directory.is_registered("+15551234567").await.unwrap());

        let record = directory.find_by_phone("+15551234567").await.unwrap();
        assert_eq!(record.phone, "+15551234567");
        assert_eq!(record.profile["name"], "Amina");
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let directory = MemoryUserDirectory::new();

        directory.register("+15551234567", json!({})).await.unwrap();

        let err = directory
            .register("+15551234567", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Registration(_)));
    }

    #[tokio::test]
    async fn unknown_phone_is_not_found() {
        let directory = MemoryUserDirectory::new();

        let err = directory.find_by_phone("+15551234567").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }
}
