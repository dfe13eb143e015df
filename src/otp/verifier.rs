use crate::{
    error::AuthError,
    otp::{OtpRecord, OtpStore},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Validates a submitted (phone, code) pair against the store.
///
/// Only the newest record per phone is ever considered; older rows become
/// unreachable even when unexpired. Codes are not consumed on success: a
/// code keeps validating until it expires.
#[derive(Clone)]
pub struct OtpVerifier {
    store: Arc<dyn OtpStore>,
}

impl OtpVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn OtpStore>) -> Self {
        Self { store }
    }

    /// On success returns the accepted record; its `expires_at` becomes the
    /// session expiry.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCode` when no record exists or the code does not
    /// match the newest record, `AuthError::ExpiredCode` when it matches but
    /// has expired, `AuthError::Storage` on persistence failure.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, phone: &str, code: &str) -> Result<OtpRecord, AuthError> {
        let record = match self.store.find_latest(phone).await {
            Ok(record) => record,
            Err(AuthError::NotFound) => return Err(AuthError::InvalidCode),
            Err(e) => return Err(e),
        };

        if record.code != code {
            debug!("otp code mismatch for {phone}");

            return Err(AuthError::InvalidCode);
        }

        if record.is_expired(Utc::now()) {
            debug!("otp code expired for {phone}");

            return Err(AuthError::ExpiredCode);
        }

        Ok(record)
    }
}
