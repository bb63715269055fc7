//! Bearer token verification
//!
//! Tokens are issued by the auth collaborator; this service only validates
//! them and extracts the caller scope. Validation is stateless: signature,
//! issuer, audience and expiry are checked, nothing is looked up.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{ScopeError, ScopeResult};
use super::{DistrictId, Scope, SchoolId};

/// Role claim carried in a scope token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRole {
    District,
    School,
}

/// Claims carried by a scope token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeClaims {
    /// Subject (the acting user, opaque to the ledger)
    pub sub: String,

    /// Caller role
    pub role: ScopeRole,

    /// The school or district the role applies to
    pub scope_id: Uuid,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,
}

/// Token verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HMAC secret shared with the auth collaborator
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Expected issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected audience
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_secret() -> String {
    "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "district-auth".to_string()
}

fn default_audience() -> String {
    "school-ledger".to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }
}

/// Verifies bearer tokens and extracts the caller scope.
#[derive(Clone)]
pub struct TokenVerifier {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Validate a token and return the scope it establishes.
    pub fn verify(&self, token: &str) -> ScopeResult<Scope> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<ScopeClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ScopeError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => ScopeError::InvalidSignature,
                _ => ScopeError::MalformedToken,
            })?;

        let claims = token_data.claims;
        Ok(match claims.role {
            ScopeRole::District => Scope::District(DistrictId::from(claims.scope_id)),
            ScopeRole::School => Scope::School(SchoolId::from(claims.scope_id)),
        })
    }

    /// Sign a token for the given scope.
    ///
    /// Issuance belongs to the auth collaborator in production; this path
    /// exists for local development and tests.
    pub fn issue(&self, subject: &str, scope: Scope, ttl: Duration) -> ScopeResult<String> {
        let now = Utc::now();
        let (role, scope_id) = match scope {
            Scope::District(district) => (ScopeRole::District, district.as_uuid()),
            Scope::School(school) => (ScopeRole::School, school.as_uuid()),
        };

        let claims = ScopeClaims {
            sub: subject.to_string(),
            role,
            scope_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| ScopeError::SigningFailed)
    }
}
