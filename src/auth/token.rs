//! Signed, time-limited password reset tokens.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::models::user::User;

type HmacSha256 = Hmac<Sha256>;

const FINGERPRINT_CONTEXT: &[u8] = b"reset-token password fingerprint\0";

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub user_id: i32,
    /// Keyed digest of the password hash at issue time.
    pub pwd: String,
    pub exp: i64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("reset token has expired")]
    Expired,

    #[error("reset token is invalid")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

#[derive(Clone)]
pub struct ResetTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    fingerprint_key: Vec<u8>,
    ttl: Duration,
}

impl ResetTokens {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            fingerprint_key: secret.to_vec(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = ResetClaims {
            user_id: user.id,
            pwd: self.fingerprint(&user.password)?,
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry. Whether the claims still match the user is up to
    /// the caller, see [`ResetTokens::is_current`].
    pub fn verify(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<ResetClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// True while the user's password is the one the token was issued against.
    pub fn is_current(&self, claims: &ResetClaims, user: &User) -> bool {
        claims.user_id == user.id
            && self
                .fingerprint(&user.password)
                .is_ok_and(|pwd| pwd == claims.pwd)
    }

    /// HMAC of the stored hash under the token secret, hex of the first 16 bytes.
    fn fingerprint(&self, password_hash: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.fingerprint_key)
            .map_err(|_| TokenError::Invalid)?;
        mac.update(FINGERPRINT_CONTEXT);
        mac.update(password_hash.as_bytes());
        Ok(hex::encode(&mac.finalize().into_bytes()[..16]))
    }
}
