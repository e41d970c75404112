//! Credential extraction from the `Authorization` header.
//!
//! Both schemes take the header value verbatim after an exact,
//! case-sensitive prefix. An empty remainder (`"Bearer "`) is returned as an
//! empty string; rejecting it is left to whoever validates the credential.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

fn authorization(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    if value.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(value)
}

fn strip_scheme<'a>(headers: &'a HeaderMap, prefix: &str) -> Result<&'a str, AuthError> {
    authorization(headers)?
        .strip_prefix(prefix)
        .ok_or(AuthError::MalformedHeader)
}

/// Returns the token from `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    strip_scheme(headers, BEARER_PREFIX).map(str::to_string)
}

/// Returns the key from `Authorization: ApiKey <key>`.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, AuthError> {
    strip_scheme(headers, API_KEY_PREFIX).map(str::to_string)
}

/// Compares a presented key with the configured one. Both sides are hashed
/// first so the comparison time does not depend on the secret's bytes.
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
