use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{RefreshTokenRecord, UserCredential};
use crate::db::store::{RefreshTokenStore, UserStore};
use crate::error::DatabaseError;

/// Process-local store for single-instance deployments and tests.
///
/// Rotation and revocation run under one write lock, which gives the same
/// single-winner guarantee as the conditional update in Postgres.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<String, UserCredential>>>,
    tokens: Arc<RwLock<HashMap<String, RefreshTokenRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, email: &str, hashed_password: String) -> UserCredential {
        let user = UserCredential {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password,
        };
        self.users.write().await.insert(user.email.clone(), user.clone());
        user
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredential>, DatabaseError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&record.token) {
            return Err(DatabaseError::Duplicate);
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(token) {
            Some(record) => {
                record.revoked_at.get_or_insert(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(
        &self,
        old: &str,
        at: DateTime<Utc>,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, DatabaseError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&replacement.token) {
            return Err(DatabaseError::Duplicate);
        }
        match tokens.get_mut(old) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(at);
            }
            _ => return Ok(false),
        }
        tokens.insert(replacement.token.clone(), replacement.clone());
        Ok(true)
    }
}
