//! Session cookie handling and the middleware gating internal routes.

use crate::server::AppContext;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voxlink_common::{Error, SessionId};

use super::error::ApiError;

pub const SESSION_COOKIE_NAME: &str = "voxlink_session";

/// Login request payload
#[derive(Deserialize)]
pub struct LoginRequest {
    pub secret: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl LoginResponse {
    fn failure(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            message: message.to_string(),
            expires_at: None,
        })
    }
}

fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| SessionId::parse(c.value()))
}

/// Whether the request carries a live session cookie.
pub fn has_valid_session(ctx: &AppContext, jar: &CookieJar) -> bool {
    session_id(jar).is_some_and(|id| ctx.sessions.is_valid(&id))
}

/// Middleware rejecting requests without a valid session
pub async fn session_auth_middleware(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !has_valid_session(&ctx, &jar) {
        return Err(Error::Unauthorized.into());
    }
    Ok(next.run(request).await)
}

/// Login handler
pub async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), (StatusCode, Json<LoginResponse>)> {
    if !ctx.sessions.is_configured() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            LoginResponse::failure("Authentication not configured"),
        ));
    }

    match ctx.sessions.login(&payload.secret) {
        Some((id, expires_at)) => {
            let cookie = Cookie::build((SESSION_COOKIE_NAME, id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::seconds(
                    ctx.sessions.timeout().num_seconds(),
                ))
                .build();

            Ok((
                jar.add(cookie),
                Json(LoginResponse {
                    success: true,
                    message: "Login successful".to_string(),
                    expires_at: Some(expires_at),
                }),
            ))
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            LoginResponse::failure("Invalid secret"),
        )),
    }
}

/// Logout handler
pub async fn logout(State(ctx): State<AppContext>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(id) = session_id(&jar) {
        ctx.sessions.logout(&id);
    }

    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (jar.remove(cookie), StatusCode::OK)
}

#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub auth_configured: bool,
    pub authenticated: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Check current auth status
pub async fn auth_status(State(ctx): State<AppContext>, jar: CookieJar) -> Json<AuthStatusResponse> {
    let expires_at = session_id(&jar).and_then(|id| ctx.sessions.expires_at(&id));

    Json(AuthStatusResponse {
        auth_configured: ctx.sessions.is_configured(),
        authenticated: expires_at.is_some(),
        expires_at,
    })
}

/// Generate a bcrypt hash for `secret_hash`
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}
