// JWT session token issuance and validation

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::auth::models::{Principal, Role};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,  // principal id
    pub role: Role,
    pub iat: i64,  // issued at timestamp
    pub exp: i64,  // expiration timestamp
}

/// Reasons a token fails validation
///
/// Distinguished for logging only; callers facing clients should
/// collapse these into a single unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token signing failed")]
    Signing,
}

/// Identity recovered from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub principal_id: i32,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Token service for JWT operations
///
/// Tokens are stateless: validity is signature plus expiry, nothing is
/// stored server-side and there is no revocation.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    /// Create a new TokenService with the shared secret and token lifetime
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a session token for a principal
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue_for(principal.id, principal.role)
    }

    /// Issue a session token for an id/role pair
    pub fn issue_for(&self, principal_id: i32, role: Role) -> Result<String, TokenError> {
        self.issue_at(principal_id, role, Utc::now().timestamp())
    }

    fn issue_at(&self, principal_id: i32, role: Role, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: principal_id,
            role,
            iat: issued_at,
            exp: issued_at + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Token signing failed: {}", e);
            TokenError::Signing
        })
    }

    /// Verify signature and expiry, then return the encoded identity
    pub fn validate(&self, token: &str) -> Result<TokenIdentity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Malformed)?;

        Ok(TokenIdentity {
            principal_id: claims.sub,
            role: claims.role,
            expires_at,
        })
    }
}
