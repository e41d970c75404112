use std::future::{ready, Ready};

use actix_web::{dev::Payload, error::JsonPayloadError, web, FromRequest, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::extract::extract_bearer;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request");
    let pair = state.auth_service.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: pair.user_id,
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Exchanges the refresh token in the `Authorization` header for a new
/// access token.
pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer(req.headers())?;
    let refreshed = state.auth_service.refresh(&refresh_token).await.map_err(|e| {
        warn!("Refresh rejected: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token: refreshed.access_token,
        refresh_token: refreshed.refresh_token,
    }))
}

pub async fn revoke(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = extract_bearer(req.headers())?;
    state.auth_service.revoke(&refresh_token).await?;

    Ok(HttpResponse::NoContent().finish())
}

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("application state not configured".into()))
}

/// Extractor for routes that require a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(app_state(req).and_then(|state| {
            state
                .auth_service
                .authenticate(req.headers())
                .map(|user_id| AuthenticatedUser { user_id })
                .map_err(AppError::from)
        }))
    }
}

/// Extractor for machine-to-machine webhook routes authenticated by the
/// static api key.
#[derive(Debug, Clone, Copy)]
pub struct WebhookCaller;

impl FromRequest for WebhookCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(app_state(req).and_then(|state| {
            state
                .auth_service
                .authenticate_webhook(req.headers())
                .map(|_| WebhookCaller)
                .map_err(AppError::from)
        }))
    }
}

/// Rejected request bodies get the same JSON error envelope as every
/// other failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected request body: {}", err);
    AppError::ValidationError(err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/api/login", web::post().to(login))
        .route("/api/refresh", web::post().to(refresh))
        .route("/api/revoke", web::post().to(revoke));
}
