use crate::{fonkodo::AuthState, token::SessionClaims};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub phone: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub phone: String,
    pub registered: bool,
    pub expiration: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = [LoginResponse], content_type = "application/json"),
        (status = 422, description = "Invalid or expired code"),
    ),
    tag = "auth"
)]
// axum handler exchanging a valid otp code for a session token
#[instrument(skip(state, payload))]
pub async fn login(
    Extension(state): Extension<AuthState>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let phone = request.phone.trim();

    let record = match state.verifier().verify(phone, request.code.trim()).await {
        Ok(record) => record,
        Err(e) => return e.into_response(),
    };

    // Registration status is captured once, at mint time
    let registered = match state.users().is_registered(phone).await {
        Ok(registered) => registered,
        Err(e) => return e.into_response(),
    };

    let claims = SessionClaims {
        phone: phone.to_string(),
        registered,
        otp: record.code.clone(),
        // The session is only as long-lived as the otp record behind it
        exp: record.expires_at.timestamp(),
    };

    let token = match state.tokens().mint(&claims) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    debug!("login successful for {phone}, registered: {registered}");

    Json(LoginResponse {
        token,
        phone: phone.to_string(),
        registered,
        expiration: record.expires_at,
    })
    .into_response()
}
