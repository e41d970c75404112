//! Authentication module
//!
//! Password hashing, credential extraction from request headers, signed
//! access tokens, and server-tracked refresh tokens.

pub mod access_token;
pub mod clock;
pub mod extract;
pub mod handlers;
pub mod password;
pub mod refresh_token;
mod service;

pub use access_token::{AccessClaims, AccessTokenCodec, ISSUER};
pub use clock::{Clock, ManualClock, SystemClock};
pub use extract::{extract_api_key, extract_bearer};
pub use handlers::{AuthenticatedUser, WebhookCaller};
pub use password::CredentialHasher;
pub use refresh_token::RefreshTokenManager;
pub use service::{AuthService, RefreshedTokens, TokenPair};
