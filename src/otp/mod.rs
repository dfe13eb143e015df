pub mod issuer;
pub mod store;
pub mod verifier;

pub use issuer::OtpIssuer;
pub use store::{MemoryOtpStore, OtpStore, PgOtpStore};
pub use verifier::OtpVerifier;

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::FromRow;

/// One issued code for one phone number. Rows are append-only: repeated
/// requests create new rows and only the newest one per phone is ever
/// consulted. Expiry is logical, rows are never deleted here.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: i64,
    pub phone: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    /// A record is expired once `now` reaches `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Six decimal digits, uniform in [100000, 999999].
///
/// Draws from the thread-local CSPRNG, seeded once per thread for the
/// lifetime of the process.
#[must_use]
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
