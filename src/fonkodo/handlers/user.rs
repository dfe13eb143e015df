use crate::fonkodo::{middleware::AuthorizationContext, AuthState};
use axum::{
    extract::Extension,
    response::{IntoResponse, Json, Response},
};
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/auth/user",
    responses(
        (status = 200, description = "Directory record for the authenticated phone"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No record for the authenticated phone"),
    ),
    tag = "auth"
)]
// axum handler returning the directory record for the authenticated phone
#[instrument(skip(state))]
pub async fn user(
    Extension(state): Extension<AuthState>,
    Extension(context): Extension<AuthorizationContext>,
) -> Response {
    match state.users().find_by_phone(&context.phone).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => e.into_response(),
    }
}
