use crate::error::AuthError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// Outbound delivery capability for issued codes.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Deliver `code` to `phone`.
    ///
    /// # Errors
    ///
    /// `AuthError::Delivery` when the message cannot be handed off.
    async fn send(&self, phone: &str, code: &str) -> Result<(), AuthError>;
}

/// Twilio Messages API transport.
#[derive(Debug, Clone)]
pub struct TwilioSms {
    client: Client,
    account_sid: String,
    auth_token: SecretString,
    from: String,
}

impl TwilioSms {
    /// # Errors
    ///
    /// `AuthError::Delivery` if the HTTP client cannot be constructed.
    pub fn new(
        account_sid: String,
        auth_token: SecretString,
        from: String,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(crate::fonkodo::APP_USER_AGENT)
            .build()
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            from,
        })
    }
}

#[async_trait]
impl SmsTransport for TwilioSms {
    #[instrument(skip(self, code))]
    async fn send(&self, phone: &str, code: &str) -> Result<(), AuthError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let body = format!("Your verification code is {code}");

        let mut form: HashMap<&str, &str> = HashMap::new();
        form.insert("To", phone);
        form.insert("From", &self.from);
        form.insert("Body", &body);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("twilio returned {status}: {error_body}");

            return Err(AuthError::Delivery(format!("twilio returned {status}")));
        }

        debug!("sms handed off to twilio for {phone}");

        Ok(())
    }
}

/// Transport that records messages instead of sending them. Handy for tests
/// and for hosts that plug their own delivery behind it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSms {
    messages: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingSms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All (phone, code) pairs handed to this transport so far.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AuthError> {
        self.messages
            .write()
            .await
            .push((phone.to_string(), code.to_string()));

        Ok(())
    }
}

/// Transport that always fails. Used to exercise delivery-failure paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSms;

#[async_trait]
impl SmsTransport for FailingSms {
    async fn send(&self, _phone: &str, _code: &str) -> Result<(), AuthError> {
        Err(AuthError::Delivery("transport unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_transport_captures_messages() {
        let sms = RecordingSms::new();

        sms.send("+15551234567", "123456").await.unwrap();
        sms.send("+15559999999", "654321").await.unwrap();

        let sent = sms.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], ("+15551234567".to_string(), "123456".to_string()));
    }

    #[tokio::test]
    async fn failing_transport_surfaces_delivery_error() {
        let err = FailingSms.send("+15551234567", "123456").await.unwrap_err();
        assert!(matches!(err, AuthError::Delivery(_)));
    }
}
