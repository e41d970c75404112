//! Signed, stateless access tokens.
//!
//! Tokens are HS256 JWTs: three dot-separated base64url segments (header,
//! claims, signature). Expiry is checked against the injected [`Clock`]
//! rather than the library's wall clock, and the issuer is pinned to
//! [`ISSUER`].

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::clock::Clock;
use crate::error::AuthError;

/// Issuer claim stamped on every access token.
pub const ISSUER: &str = "chirpy-access";

/// Default lifetime of an access token.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub iss: String,
    /// Subject (user UUID)
    #[serde(default)]
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            clock,
        }
    }

    /// Mints a token for `subject` valid for `ttl` from now.
    pub fn issue(&self, subject: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let iat = self.clock.now().timestamp();
        let claims = AccessClaims {
            iss: ISSUER.to_string(),
            sub: subject.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::HashingFailure(format!("failed to sign token: {}", e)))
    }

    /// Verifies `token` and returns its subject.
    ///
    /// Checks run in order: structure, signature, expiry, issuer, subject.
    pub fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self.decode(token)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        if claims.iss != ISSUER {
            return Err(AuthError::WrongIssuer);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedSubject)
    }

    fn decode(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(AuthError::MalformedToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry, issuer and subject are checked by `validate`; a missing
        // `iss` or `sub` decodes as empty and fails there.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::{ManualClock, SystemClock};
    use chrono::{TimeZone, Utc};

    const SECRET: &[u8] = b"test-secret-key-for-testing";

    fn codec_at(clock: Arc<ManualClock>) -> AccessTokenCodec {
        AccessTokenCodec::new(SECRET, clock)
    }

    fn sign(claims: &AccessClaims, secret: &[u8], alg: Algorithm) -> String {
        jsonwebtoken::encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_issue_and_validate() {
        let codec = AccessTokenCodec::new(SECRET, Arc::new(SystemClock));
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id, Duration::hours(1)).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.validate(&token), Ok(user_id));
    }

    #[test]
    fn test_claims_window_matches_ttl() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();
        let codec = codec_at(Arc::new(ManualClock::new(start)));

        let token = codec.issue(Uuid::new_v4(), Duration::seconds(ACCESS_TOKEN_TTL_SECS)).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.iat, start.timestamp());
        assert_eq!(claims.exp, claims.iat + ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_expires_at_boundary() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = codec_at(clock.clone());
        let user_id = Uuid::new_v4();
        let token = codec.issue(user_id, Duration::hours(1)).unwrap();

        clock.advance(Duration::hours(1) - Duration::seconds(1));
        assert_eq!(codec.validate(&token), Ok(user_id));

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.validate(&token), Err(AuthError::Expired));

        clock.advance(Duration::days(3));
        assert_eq!(codec.validate(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let clock = Arc::new(ManualClock::default());
        let issuer = AccessTokenCodec::new(b"secret-1", clock.clone());
        let verifier = AccessTokenCodec::new(b"secret-2", clock);

        let token = issuer.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        assert_eq!(verifier.validate(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_tampered_claims_fail_signature() {
        let codec = codec_at(Arc::new(ManualClock::default()));
        let token = codec.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let other = codec.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        parts[1] = other_parts[1];
        assert_eq!(codec.validate(&parts.join(".")), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_wrong_issuer_with_valid_signature() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());
        let now = clock.now().timestamp();

        let claims = AccessClaims {
            iss: "chirpy-refresh".to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert_eq!(codec.validate(&token), Err(AuthError::WrongIssuer));
    }

    #[test]
    fn test_expiry_checked_before_issuer() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());
        let now = clock.now().timestamp();

        let claims = AccessClaims {
            iss: "someone-else".to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now - 100,
            exp: now - 50,
        };
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert_eq!(codec.validate(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_malformed_subject() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());
        let now = clock.now().timestamp();

        let claims = AccessClaims {
            iss: ISSUER.to_string(),
            sub: "uuid-123".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign(&claims, SECRET, Algorithm::HS256);
        assert_eq!(codec.validate(&token), Err(AuthError::MalformedSubject));
    }

    #[test]
    fn test_missing_issuer_or_subject() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());
        let now = clock.now().timestamp();
        let key = EncodingKey::from_secret(SECRET);

        let no_issuer = serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "iat": now,
            "exp": now + 3600,
        });
        let token = jsonwebtoken::encode(&Header::default(), &no_issuer, &key).unwrap();
        assert_eq!(codec.validate(&token), Err(AuthError::WrongIssuer));

        let no_subject = serde_json::json!({
            "iss": ISSUER,
            "iat": now,
            "exp": now + 3600,
        });
        let token = jsonwebtoken::encode(&Header::default(), &no_subject, &key).unwrap();
        assert_eq!(codec.validate(&token), Err(AuthError::MalformedSubject));
    }

    #[test]
    fn test_missing_expiry_is_malformed() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());

        let claims = serde_json::json!({
            "iss": ISSUER,
            "sub": Uuid::new_v4().to_string(),
            "iat": clock.now().timestamp(),
        });
        let token = jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();
        assert_eq!(codec.validate(&token), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_at(clock.clone());
        let now = clock.now().timestamp();

        let claims = AccessClaims {
            iss: ISSUER.to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign(&claims, SECRET, Algorithm::HS512);
        assert_eq!(codec.validate(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_malformed_structure() {
        let codec = codec_at(Arc::new(ManualClock::default()));

        for token in ["", "invalid-token", "a.b", "a.b.c.d", "a..c", ".b.c", "Bearer x.y.z"] {
            assert_eq!(codec.validate(token), Err(AuthError::MalformedToken), "{token:?}");
        }
        assert_eq!(codec.validate("invalid.token.string"), Err(AuthError::MalformedToken));
    }
}
