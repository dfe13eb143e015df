use crate::{
    cli::globals::GlobalArgs,
    error::AuthError,
    otp::{OtpIssuer, OtpStore, OtpVerifier, PgOtpStore},
    sms::{SmsTransport, TwilioSms},
    token::TokenService,
    users::{PgUserDirectory, UserDirectory},
};
use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware::from_fn,
    routing::{get, post, MethodRouter},
    Router,
};
use chrono::Duration;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub(crate) mod handlers;
pub mod middleware;

use handlers::{
    health::{health, __path_health},
    login::{login, __path_login},
    otp::{otp, __path_otp},
    register::{register, __path_register},
    user::{user, __path_user},
};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub const PATH_OTP: &str = "/auth/otp";
pub const PATH_LOGIN: &str = "/auth/login";
pub const PATH_REGISTER: &str = "/auth/register";
pub const PATH_USER: &str = "/auth/user";
pub const PATH_HEALTH: &str = "/health";

/// Default time-to-live for issued codes; override per deployment profile
/// with the `--otp-ttl` flag.
pub const DEFAULT_OTP_TTL_SECONDS: u64 = 120;

#[derive(OpenApi)]
#[openapi(
    paths(health, otp, login, register, user),
    components(schemas(
        handlers::health::Health,
        handlers::otp::OtpRequest,
        handlers::login::LoginRequest,
        handlers::login::LoginResponse,
    )),
    tags(
        (name = "auth", description = "Phone number OTP authentication API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Shared capabilities behind the auth routes. Cloned per layer, immutable
/// after startup.
#[derive(Clone)]
pub struct AuthState {
    issuer: OtpIssuer,
    verifier: OtpVerifier,
    tokens: TokenService,
    users: Arc<dyn UserDirectory>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        issuer: OtpIssuer,
        verifier: OtpVerifier,
        tokens: TokenService,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            issuer,
            verifier,
            tokens,
            users,
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &OtpIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn verifier(&self) -> &OtpVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }
}

/// Wires the auth routes. The SMS transport, user directory, code store and
/// signing secret are required; handlers may be overridden per route.
/// `build` fails fast when a required capability is unset.
pub struct AuthBuilder {
    ttl: Duration,
    secret: Option<SecretString>,
    store: Option<Arc<dyn OtpStore>>,
    sms: Option<Arc<dyn SmsTransport>>,
    users: Option<Arc<dyn UserDirectory>>,
    otp_handler: Option<MethodRouter>,
    login_handler: Option<MethodRouter>,
    register_handler: Option<MethodRouter>,
    user_handler: Option<MethodRouter>,
}

impl Default for AuthBuilder {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_OTP_TTL_SECONDS as i64),
            secret: None,
            store: None,
            sms: None,
            users: None,
            otp_handler: None,
            login_handler: None,
            register_handler: None,
            user_handler: None,
        }
    }
}

impl AuthBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn secret(mut self, secret: SecretString) -> Self {
        self.secret = Some(secret);
        self
    }

    #[must_use]
    pub fn otp_store(mut self, store: impl OtpStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    #[must_use]
    pub fn sms_transport(mut self, sms: impl SmsTransport + 'static) -> Self {
        self.sms = Some(Arc::new(sms));
        self
    }

    #[must_use]
    pub fn user_directory(mut self, users: impl UserDirectory + 'static) -> Self {
        self.users = Some(Arc::new(users));
        self
    }

    #[must_use]
    pub fn otp_handler(mut self, handler: MethodRouter) -> Self {
        self.otp_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn login_handler(mut self, handler: MethodRouter) -> Self {
        self.login_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn register_handler(mut self, handler: MethodRouter) -> Self {
        self.register_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn user_handler(mut self, handler: MethodRouter) -> Self {
        self.user_handler = Some(handler);
        self
    }

    /// # Errors
    ///
    /// Returns an error when the signing secret, code store, SMS transport
    /// or user directory is missing.
    pub fn build(self) -> Result<Auth> {
        let secret = self.secret.ok_or_else(|| anyhow!("signing secret not set"))?;
        let store = self.store.ok_or_else(|| anyhow!("otp store not set"))?;
        let sms = self.sms.ok_or_else(|| anyhow!("sms transport not set"))?;
        let users = self.users.ok_or_else(|| anyhow!("user directory not set"))?;

        let state = AuthState::new(
            OtpIssuer::new(store.clone(), sms, self.ttl),
            OtpVerifier::new(store),
            TokenService::new(&secret),
            users,
        );

        Ok(Auth {
            state,
            otp_handler: self.otp_handler.unwrap_or_else(|| post(otp)),
            login_handler: self.login_handler.unwrap_or_else(|| post(login)),
            register_handler: self.register_handler.unwrap_or_else(|| post(register)),
            user_handler: self.user_handler.unwrap_or_else(|| get(user)),
        })
    }
}

/// The assembled auth surface: `/auth/otp`, `/auth/login` and, behind the
/// gate, `/auth/register` and `/auth/user`.
pub struct Auth {
    state: AuthState,
    otp_handler: MethodRouter,
    login_handler: MethodRouter,
    register_handler: MethodRouter,
    user_handler: MethodRouter,
}

impl Auth {
    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    #[must_use]
    pub fn router(&self) -> Router {
        let gated = Router::new()
            .route(PATH_REGISTER, self.register_handler.clone())
            .route(PATH_USER, self.user_handler.clone())
            .route_layer(from_fn(middleware::auth_gate));

        Router::new()
            .route(PATH_OTP, self.otp_handler.clone())
            .route(PATH_LOGIN, self.login_handler.clone())
            .merge(gated)
            .layer(Extension(self.state.clone()))
    }
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, ttl_seconds: u64, globals: &GlobalArgs) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .test_before_acquire(true)
        .connect(&dsn)
        .await?;

    let sms = TwilioSms::new(
        globals.twilio_account_sid.clone(),
        globals.twilio_auth_token.clone(),
        globals.twilio_from.clone(),
    )
    .map_err(|e: AuthError| anyhow!(e))?;

    let auth = AuthBuilder::new()
        .ttl(Duration::seconds(i64::try_from(ttl_seconds)?))
        .secret(globals.jwt_secret.clone())
        .otp_store(PgOtpStore::new(pool.clone()))
        .sms_transport(sms)
        .user_directory(PgUserDirectory::new(pool))
        .build()?;

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let app = auth
        .router()
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors),
        )
        .route(PATH_HEALTH, get(health).options(health));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
