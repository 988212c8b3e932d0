// common/src/tokens.rs
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::CommonError;
use crate::messages::TokenPayload;
use crate::utils::{new_correlation_id, unix_now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,     // account / session subject
    pub kind: TokenKind,
    pub jti: String,
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at time
}

/// A minted token and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: i64,
}

impl From<IssuedToken> for TokenPayload {
    fn from(token: IssuedToken) -> Self {
        Self {
            value: token.value,
            expires_at: token.expires_at,
        }
    }
}

/// Access and refresh token handed to the host after login.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

pub fn issue_token(
    subject: &str,
    kind: TokenKind,
    ttl_secs: i64,
    secret: &[u8],
) -> Result<IssuedToken, CommonError> {
    let now = unix_now();
    let expires_at = now + ttl_secs;

    let claims = JwtClaims {
        sub: subject.to_string(),
        kind,
        jti: new_correlation_id(),
        iat: now as usize,
        exp: expires_at as usize,
    };

    let value = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))?;

    Ok(IssuedToken { value, expires_at })
}

/// Mint the access/refresh pair for a subject.
pub fn issue_session_tokens(
    subject: &str,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    secret: &[u8],
) -> Result<SessionTokens, CommonError> {
    Ok(SessionTokens {
        access: issue_token(subject, TokenKind::Access, access_ttl_secs, secret)?,
        refresh: issue_token(subject, TokenKind::Refresh, refresh_ttl_secs, secret)?,
    })
}

// Validate token signature, expiry and kind, returning the subject
pub fn validate_token(token: &str, kind: TokenKind, secret: &[u8]) -> Result<String, CommonError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<JwtClaims>(token, &DecodingKey::from_secret(secret), &validation)?;

    if token_data.claims.kind != kind {
        return Err(jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidToken,
        )
        .into());
    }

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn test_issue_and_validate() {
        let token = issue_token("0xabc", TokenKind::Access, 900, SECRET).unwrap();
        assert!(token.expires_at > unix_now());

        let subject = validate_token(&token.value, TokenKind::Access, SECRET).unwrap();
        assert_eq!(subject, "0xabc");
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let token = issue_token("0xabc", TokenKind::Refresh, 900, SECRET).unwrap();
        assert!(validate_token(&token.value, TokenKind::Access, SECRET).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token("0xabc", TokenKind::Access, 900, SECRET).unwrap();
        assert!(validate_token(&token.value, TokenKind::Access, b"other").is_err());
    }

    #[test]
    fn test_session_pair_differs() {
        let tokens = issue_session_tokens("0xabc", 900, 86400, SECRET).unwrap();
        assert_ne!(tokens.access.value, tokens.refresh.value);
        assert!(tokens.refresh.expires_at > tokens.access.expires_at);
    }
}
