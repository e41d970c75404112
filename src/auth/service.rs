use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::http::header::HeaderMap;
use chrono::Duration;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::access_token::AccessTokenCodec;
use crate::auth::clock::Clock;
use crate::auth::extract::{api_key_matches, extract_api_key, extract_bearer};
use crate::auth::password::CredentialHasher;
use crate::auth::refresh_token::{generate_refresh_token, RefreshTokenManager};
use crate::config::AuthConfig;
use crate::db::store::{bounded, RefreshTokenStore, UserStore};
use crate::error::AuthError;

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh. `refresh_token` is set only when rotation is on.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedTokens {
    pub user_id: Uuid,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Ties the credential components together for the HTTP layer.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    /// Verified against on unknown emails so both login failures cost one
    /// argon2 run.
    decoy_hash: String,
    access: AccessTokenCodec,
    refresh: RefreshTokenManager,
    access_ttl: Duration,
    rotate_refresh_tokens: bool,
    webhook_api_key: Option<String>,
    store_timeout: StdDuration,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let hasher = CredentialHasher::new(&config.password)?;
        let decoy_hash = hasher.hash(&generate_refresh_token())?;

        Ok(Self {
            users,
            hasher,
            decoy_hash,
            access: AccessTokenCodec::new(config.jwt_secret.as_bytes(), clock.clone()),
            refresh: RefreshTokenManager::new(
                refresh_tokens,
                clock,
                config.refresh_token_ttl(),
                config.store_timeout(),
            ),
            access_ttl: config.access_token_ttl(),
            rotate_refresh_tokens: config.rotate_refresh_tokens,
            webhook_api_key: config.webhook_api_key.clone().filter(|k| !k.is_empty()),
            store_timeout: config.store_timeout(),
        })
    }

    pub fn access_tokens(&self) -> &AccessTokenCodec {
        &self.access
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenManager {
        &self.refresh
    }

    /// Hashes a password off the async executor.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
    }

    /// Verifies the password for `email` and mints an access/refresh pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = match bounded(self.store_timeout, self.users.find_by_email(email)).await? {
            Some(user) => user,
            None => {
                let _ = self.verify_password(password, &self.decoy_hash).await;
                warn!("Login attempt for unknown account");
                return Err(AuthError::NotFound);
            }
        };

        if let Err(e) = self.verify_password(password, &user.hashed_password).await {
            warn!("Login failed for user {}: {}", user.id, e);
            return Err(e);
        }

        let access_token = self.access.issue(user.id, self.access_ttl)?;
        let refresh_token = self.refresh.issue(user.id).await.map_err(|e| {
            error!("Failed to persist refresh token for user {}: {}", user.id, e);
            e
        })?;

        info!("Login successful for user {}", user.id);
        Ok(TokenPair {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }

    /// Trades a refresh token for a new access token, rotating the refresh
    /// token as well when configured to.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let (user_id, successor) = if self.rotate_refresh_tokens {
            let (successor, user_id) = self.refresh.rotate(refresh_token).await?;
            (user_id, Some(successor))
        } else {
            (self.refresh.exchange(refresh_token).await?, None)
        };

        let access_token = self.access.issue(user_id, self.access_ttl)?;
        info!("Refreshed access token for user {}", user_id);
        Ok(RefreshedTokens {
            user_id,
            access_token,
            refresh_token: successor,
        })
    }

    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.refresh.revoke(refresh_token).await?;
        info!("Refresh token revoked");
        Ok(())
    }

    /// Resolves `Authorization: Bearer <access token>` to a user id.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = extract_bearer(headers)?;
        self.access.validate(&token)
    }

    /// Accepts `Authorization: ApiKey <key>` matching the configured webhook key.
    pub fn authenticate_webhook(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let presented = extract_api_key(headers)?;
        match &self.webhook_api_key {
            Some(expected) if api_key_matches(&presented, expected) => Ok(()),
            _ => {
                warn!("Rejected webhook call with invalid api key");
                Err(AuthError::InvalidApiKey)
            }
        }
    }
}
