use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::chakra_user;

#[derive(Debug, Error)]
pub enum ChakraAuthError {
    #[error("authorization token required")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("unknown telegram id")]
    UnknownUser,
    #[error("token error: {0}")]
    TokenError(String),
}

impl ChakraAuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ChakraAuthError::MissingToken => 3001,
            ChakraAuthError::InvalidToken => 3002,
            ChakraAuthError::UnknownUser => 3003,
            ChakraAuthError::TokenError(_) => 3101,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    uid: i32,
    role: String,
    adm: bool,
    exp: usize,
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: i32,
    pub role: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn admin(&self) -> bool {
        self.is_admin || self.role == "owner" || self.role == "admin"
    }

    /// Who may change chakra attributes.
    pub fn can_edit_chakras(&self) -> bool {
        self.admin() || self.role == "responsible"
    }
}

/// HS256 token issuer and verifier.
#[derive(Clone)]
pub struct ChakraAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ChakraAuth {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &chakra_user::Model) -> Result<String, ChakraAuthError> {
        let exp = (Utc::now() + self.ttl).timestamp().max(0) as usize;
        let claims = Claims { sub: user.name.clone(), uid: user.id, role: user.role.clone(), adm: user.is_admin, exp };
        encode(&JwtHeader::default(), &claims, &self.encoding).map_err(|e| ChakraAuthError::TokenError(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Caller, ChakraAuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChakraAuthError::MissingToken);
        }
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| ChakraAuthError::InvalidToken)?;
        Ok(Caller { user_id: data.claims.uid, role: data.claims.role, is_admin: data.claims.adm })
    }
}
