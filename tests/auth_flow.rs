//! End-to-end exercises of the auth surface against in-memory capabilities:
//! issue a code, log in, present the minted token to the gated routes.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    response::Response,
    Router,
};
use fonkodo::{
    fonkodo::{AuthBuilder, PATH_LOGIN, PATH_OTP, PATH_REGISTER, PATH_USER},
    otp::MemoryOtpStore,
    sms::RecordingSms,
    token::TokenService,
    users::MemoryUserDirectory,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";
const PHONE: &str = "+15551234567";

fn app() -> (Router, RecordingSms) {
    let sms = RecordingSms::new();

    let auth = AuthBuilder::new()
        .secret(SecretString::from(SECRET.to_string()))
        .otp_store(MemoryOtpStore::new())
        .sms_transport(sms.clone())
        .user_directory(MemoryUserDirectory::new())
        .build()
        .expect("all required capabilities are set");

    (auth.router(), sms)
}

async fn post_json(router: &Router, path: &str, body: Value, token: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn get(router: &Router, path: &str, token: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(path);

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn issued_code(sms: &RecordingSms) -> String {
    let sent = sms.sent().await;
    sent.last().expect("a code was sent").1.clone()
}

#[tokio::test]
async fn full_login_and_registration_flow() -> Result<()> {
    let (router, sms) = app();

    // Request a code
    let response = post_json(&router, PATH_OTP, json!({ "phone": PHONE }), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let code = issued_code(&sms).await;
    assert_eq!(code.len(), 6);

    // Wrong code is rejected with the generic body
    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": "000000" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Right code logs in
    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": code }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = body_json(response).await?;
    assert_eq!(login["phone"], PHONE);
    assert_eq!(login["registered"], false);

    let token = login["token"].as_str().unwrap().to_string();

    // The token exp is the otp record expiry, not a fresh ttl
    let claims = TokenService::new(&SecretString::from(SECRET.to_string())).parse(&token)?;
    let expiration: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(login["expiration"].clone())?;
    assert_eq!(claims.exp, expiration.timestamp());
    assert_eq!(claims.otp, code);
    assert!(!claims.registered);

    // No directory record yet
    let response = get(&router, PATH_USER, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Register, then the record is readable
    let response = post_json(
        &router,
        PATH_REGISTER,
        json!({ "name": "Amina" }),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, PATH_USER, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = body_json(response).await?;
    assert_eq!(record["phone"], PHONE);
    assert_eq!(record["profile"]["name"], "Amina");

    // The code is not consumed: logging in again works and now carries
    // registered = true
    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": code }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = body_json(response).await?;
    assert_eq!(login["registered"], true);

    // An already-registered phone may not register again
    let registered_token = login["token"].as_str().unwrap();
    let response = post_json(&router, PATH_REGISTER, json!({}), Some(registered_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn reissuing_makes_older_codes_unreachable() -> Result<()> {
    let (router, sms) = app();

    post_json(&router, PATH_OTP, json!({ "phone": PHONE }), None).await;
    let first = issued_code(&sms).await;

    post_json(&router, PATH_OTP, json!({ "phone": PHONE }), None).await;
    let second = issued_code(&sms).await;

    // Only the newest code logs in
    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": first }),
        None,
    )
    .await;
    if first != second {
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": second }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn gated_routes_require_bearer_credentials() {
    let (router, _) = app();

    let response = get(&router, PATH_USER, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(&router, PATH_REGISTER, json!({}), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&router, PATH_USER, Some("not.a.token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn otp_requests_are_validated() {
    let (router, _) = app();

    let response = post_json(&router, PATH_OTP, json!({ "phone": "bogus" }), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(PATH_OTP)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_against_unknown_phone_is_rejected() {
    let (router, _) = app();

    let response = post_json(
        &router,
        PATH_LOGIN,
        json!({ "phone": PHONE, "code": "123456" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
