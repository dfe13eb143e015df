use crate::fonkodo::{middleware::AuthorizationContext, AuthState};
use axum::{
    extract::Extension,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/auth/register",
    responses(
        (status = 200, description = "User registered"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Phone already registered"),
        (status = 422, description = "Registration rejected by the directory"),
    ),
    tag = "auth"
)]
// axum handler forwarding the profile payload to the user directory; the
// auth gate has already rejected tokens carrying registered = true
#[instrument(skip(state, payload))]
pub async fn register(
    Extension(state): Extension<AuthState>,
    Extension(context): Extension<AuthorizationContext>,
    payload: Option<Json<Value>>,
) -> Response {
    let profile = match payload {
        Some(Json(profile)) => profile,
        None => json!({}),
    };

    match state.users().register(&context.phone, profile).await {
        Ok(()) => {
            debug!("registered user for {}", context.phone);

            Json(json!({ "message": "user registered" })).into_response()
        }

        Err(e) => e.into_response(),
    }
}
