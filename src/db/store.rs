use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{RefreshTokenRecord, UserCredential};
use crate::error::{AuthError, DatabaseError};

/// Durable storage for refresh-token records.
///
/// Implementations must make `revoke` and `rotate` atomic with respect to
/// each other: for one live token, at most one `rotate` may return `true`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Marks the token revoked at `at` unless it already is. Returns `false`
    /// when no record with that value exists.
    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Revokes `old` and inserts `replacement` in one transaction. Returns
    /// `false`, writing nothing, when `old` is missing or already revoked.
    async fn rotate(
        &self,
        old: &str,
        at: DateTime<Utc>,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, DatabaseError>;
}

/// Read access to the user records owned by the surrounding service.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredential>, DatabaseError>;
}

/// Runs a store call under `limit`. Timeouts are reported, never retried.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(AuthError::from),
        Err(_) => Err(DatabaseError::Timeout.into()),
    }
}
