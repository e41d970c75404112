//! Opaque, server-tracked refresh tokens.
//!
//! A token is 32 bytes from the OS random source, hex encoded. Its record
//! lives in a [`RefreshTokenStore`]; a token is dead once `revoked_at` is set
//! or `expires_at` has passed. Expiry is evaluated lazily on use.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::clock::Clock;
use crate::db::models::RefreshTokenRecord;
use crate::db::store::{bounded, RefreshTokenStore};
use crate::error::AuthError;

pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Default lifetime of a refresh token.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    store_timeout: StdDuration,
}

impl RefreshTokenManager {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        store_timeout: StdDuration,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            store_timeout,
        }
    }

    /// Creates and persists a token for `user_id`. The token is only
    /// returned once the store has accepted it.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let record = self.new_record(user_id, self.clock.now())?;
        bounded(self.store_timeout, self.store.insert(&record)).await?;
        debug!("Issued refresh token for user {}", user_id);
        Ok(record.token)
    }

    /// Resolves a live token to its user. The token stays valid.
    pub async fn exchange(&self, token: &str) -> Result<Uuid, AuthError> {
        let record = self.live_record(token).await?;
        Ok(record.user_id)
    }

    /// Revokes `token` and issues a successor bound to the same user.
    ///
    /// Of several concurrent rotations of one token exactly one succeeds; the
    /// others fail with `Revoked`.
    pub async fn rotate(&self, token: &str) -> Result<(String, Uuid), AuthError> {
        let record = self.live_record(token).await?;
        let now = self.clock.now();
        let replacement = self.new_record(record.user_id, now)?;

        let rotated = bounded(self.store_timeout, self.store.rotate(token, now, &replacement)).await?;
        if !rotated {
            warn!("Refresh token for user {} was already rotated or revoked", record.user_id);
            return Err(AuthError::Revoked);
        }

        debug!("Rotated refresh token for user {}", record.user_id);
        Ok((replacement.token, record.user_id))
    }

    /// Revokes `token`. Revoking an already revoked token succeeds and keeps
    /// the first revocation time; an unknown token is `NotFound`.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let found = bounded(self.store_timeout, self.store.revoke(token, self.clock.now())).await?;
        if !found {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    fn new_record(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<RefreshTokenRecord, AuthError> {
        RefreshTokenRecord::new(generate_refresh_token(), user_id, now, self.ttl)
            .ok_or_else(|| AuthError::PersistenceFailure("refresh token expiry out of range".into()))
    }

    async fn live_record(&self, token: &str) -> Result<RefreshTokenRecord, AuthError> {
        let record = bounded(self.store_timeout, self.store.find(token))
            .await?
            .ok_or(AuthError::NotFound)?;

        if record.is_expired(self.clock.now()) {
            return Err(AuthError::Expired);
        }
        if record.is_revoked() {
            return Err(AuthError::Revoked);
        }
        Ok(record)
    }
}
