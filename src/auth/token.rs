use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MAX_SESSION_DAYS;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Per-issue nonce, so two tokens for the same user never coincide.
    pub jti: String,
}

/// Issues and verifies signed, time-limited session tokens (HS256).
///
/// Stateless: there is no revocation list, so a token stays valid until `exp`.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], validity: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validity,
        }
    }

    /// Use the configured secret, or a random one that only lives as long as the process.
    pub fn from_config(secret: Option<&str>, validity_days: i64) -> Self {
        let validity = Duration::days(validity_days.clamp(1, MAX_SESSION_DAYS));
        match secret {
            Some(secret) => Self::new(secret.as_bytes(), validity),
            None => {
                tracing::warn!(
                    "No JWT secret configured; using an ephemeral one, sessions end on restart"
                );
                Self::new(generate_secret().as_bytes(), validity)
            }
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issue(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(username, Utc::now())
    }

    pub fn issue_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Username embedded in a valid token; `None` for anything malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against `now` with no leeway.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                return None;
            }
        };

        if now.timestamp() >= data.claims.exp {
            tracing::debug!("Rejected expired session token for {}", data.claims.sub);
            return None;
        }
        Some(data.claims.sub)
    }
}

/// 64-character hex secret.
fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
