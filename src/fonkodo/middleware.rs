use crate::{
    error::AuthError,
    fonkodo::{AuthState, PATH_REGISTER},
    token::SessionClaims,
};
use axum::{
    extract::{Extension, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Claims projected into the request scope by the gate. Lives for one
/// request only.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    pub phone: String,
    pub registered: bool,
    pub otp: String,
    pub exp: DateTime<Utc>,
}

impl AuthorizationContext {
    fn from_claims(claims: &SessionClaims) -> Result<Self, AuthError> {
        let exp = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;

        Ok(Self {
            phone: claims.phone.clone(),
            registered: claims.registered,
            otp: claims.otp.clone(),
            exp,
        })
    }
}

/// Bearer-token gate for protected routes.
///
/// Per request: extract the Authorization header, parse and verify the
/// token, apply the registration guard on the register route, enforce
/// expiry, then forward the claims in the request extensions. Nothing
/// persists across requests.
pub async fn auth_gate(
    Extension(state): Extension<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let claims = match state.tokens().parse_header(header) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("rejected bearer credentials: {e}");

            return e.into_response();
        }
    };

    // An already-registered phone may not hit the register route again
    if request.uri().path() == PATH_REGISTER && claims.registered {
        debug!("registration guard rejected {}", claims.phone);

        return AuthError::Forbidden.into_response();
    }

    let context = match AuthorizationContext::from_claims(&claims) {
        Ok(context) => context,
        Err(e) => return e.into_response(),
    };

    if Utc::now() >= context.exp {
        debug!("expired claims for {}", context.phone);

        return AuthError::InvalidToken.into_response();
    }

    request.extensions_mut().insert(context);

    next.run(request).await
}
