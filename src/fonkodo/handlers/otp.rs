use crate::fonkodo::{handlers::valid_phone, AuthState};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpRequest {
    pub phone: String,
}

#[utoipa::path(
    post,
    path = "/auth/otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Code stored and handed to the SMS transport"),
        (status = 400, description = "Missing payload or invalid phone number"),
        (status = 500, description = "Storage or delivery failure"),
    ),
    tag = "auth"
)]
// axum handler creating and sending an otp code
#[instrument(skip(state))]
pub async fn otp(
    Extension(state): Extension<AuthState>,
    payload: Option<Json<OtpRequest>>,
) -> Response {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let phone = request.phone.trim();

    if !valid_phone(phone) {
        return (
            StatusCode::BAD_REQUEST,
            "Invalid phone number".to_string(),
        )
            .into_response();
    }

    match state.issuer().issue(phone).await {
        Ok(()) => {
            debug!("otp code issued for {phone}");

            Json(json!({ "message": "code sent" })).into_response()
        }

        Err(e) => e.into_response(),
    }
}
