use crate::{
    error::AuthError,
    otp::{generate_code, OtpStore},
    sms::SmsTransport,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Generates codes, persists them with a fixed time-to-live and hands them
/// to the SMS transport.
#[derive(Clone)]
pub struct OtpIssuer {
    store: Arc<dyn OtpStore>,
    sms: Arc<dyn SmsTransport>,
    ttl: Duration,
}

impl OtpIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn OtpStore>, sms: Arc<dyn SmsTransport>, ttl: Duration) -> Self {
        Self { store, sms, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh code for `phone`: generate, store with
    /// `expires_at = now + ttl`, then deliver.
    ///
    /// A delivery failure does not roll back the stored record: the code was
    /// committed and stays valid until it expires.
    ///
    /// # Errors
    ///
    /// `AuthError::Storage` if the insert fails, `AuthError::Delivery` if the
    /// SMS transport rejects the message.
    #[instrument(skip(self))]
    pub async fn issue(&self, phone: &str) -> Result<(), AuthError> {
        let code = generate_code();
        let expires_at = Utc::now() + self.ttl;

        self.store.insert(phone, &code, expires_at).await?;

        debug!("issued otp code for {phone}, expires at {expires_at}");

        self.sms.send(phone, &code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        otp::{MemoryOtpStore, OtpVerifier},
        sms::{FailingSms, RecordingSms},
    };

    #[tokio::test]
    async fn issue_stores_record_with_configured_ttl() {
        let store = Arc::new(MemoryOtpStore::new());
        let sms = Arc::new(RecordingSms::new());
        let issuer = OtpIssuer::new(store.clone(), sms.clone(), Duration::minutes(2));

        let before = Utc::now();
        issuer.issue("+15551234567").await.unwrap();
        let after = Utc::now();

        let record = store.find_latest("+15551234567").await.unwrap();
        assert!(record.expires_at >= before + Duration::minutes(2));
        assert!(record.expires_at <= after + Duration::minutes(2));

        let sent = sms.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+15551234567");
        assert_eq!(sent[0].1, record.code);
    }

    #[tokio::test]
    async fn delivery_failure_leaves_code_usable() {
        let store = Arc::new(MemoryOtpStore::new());
        let issuer = OtpIssuer::new(store.clone(), Arc::new(FailingSms), Duration::minutes(2));

        let err = issuer.issue("+15551234567").await.unwrap_err();
        assert!(matches!(err, AuthError::Delivery(_)));

        // The undelivered code was still committed and verifies
        let record = store.find_latest("+15551234567").await.unwrap();
        let verifier = OtpVerifier::new(store);
        let code = record.code.clone();
        verifier.verify("+15551234567", &code).await.unwrap();
    }
}
