use crate::error::AuthError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scheme marker required on the Authorization header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Typed claims carried by the session token.
///
/// `exp` is the Unix timestamp of the accepted OTP record's expiry, not a
/// fresh token TTL: the session lives only as long as the OTP event that
/// created it. The token is the sole carrier, there is no server-side
/// session table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub phone: String,
    pub registered: bool,
    pub otp: String,
    pub exp: i64,
}

/// Mints and parses HS256-signed session tokens with a process-wide
/// symmetric secret, read-only after startup.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret)),
            decoding: Arc::new(DecodingKey::from_secret(secret)),
        }
    }

    /// Build and sign a compact token for `claims`.
    ///
    /// # Errors
    ///
    /// `AuthError::Signing` if serialization or signing fails.
    pub fn mint(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding).map_err(AuthError::Signing)
    }

    /// Verify a compact token and return its claims.
    ///
    /// Rejects any algorithm other than HS256, a signature produced with a
    /// different secret, and tokens whose `exp` has passed.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidToken` for every verification failure.
    pub fn parse(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Parse the raw Authorization header value.
    ///
    /// A header without the `"Bearer "` scheme marker is an absent
    /// credential, not a malformed token.
    ///
    /// # Errors
    ///
    /// `AuthError::Unauthenticated` when the marker is missing,
    /// `AuthError::InvalidToken` when verification fails.
    pub fn parse_header(&self, header: &str) -> Result<SessionClaims, AuthError> {
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthError::Unauthenticated)?;

        self.parse(token.trim())
    }
}
