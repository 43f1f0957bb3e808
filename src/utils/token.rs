use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::{User, UserRole},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenClaims {
    pub email: String,
    pub roles: Vec<UserRole>,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserTokens {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

pub fn create_token(
    user: &User,
    secret: &[u8],
    expires_in_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user.email.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(expires_in_minutes)).timestamp() as usize;
    let claims = TokenClaims {
        email: user.email.clone(),
        roles: user.roles.clone(),
        user_id: user.id,
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims),
        Err(_) => Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    }
}

/// Access and refresh tokens for one login.
pub fn create_user_tokens(
    user: &User,
    access_secret: &[u8],
    access_maxage: i64,
    refresh_secret: &[u8],
    refresh_maxage: i64,
) -> Result<UserTokens, jsonwebtoken::errors::Error> {
    Ok(UserTokens {
        access_token: create_token(user, access_secret, access_maxage)?,
        refresh_token: create_token(user, refresh_secret, refresh_maxage)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usermodel::IsActive;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: None,
            phone: None,
            picture: None,
            address: None,
            roles: vec![UserRole::Sender, UserRole::Receiver],
            is_active: IsActive::Active,
            is_verified: true,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn claims_round_trip() {
        let user = user();
        let token = create_token(&user, b"secret", 60).unwrap();
        let claims = decode_token(token, b"secret").unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.roles, user.roles);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token(&user(), b"secret", 60).unwrap();
        let err = decode_token(token, b"other").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token(&user(), b"secret", -10).unwrap();
        assert!(decode_token(token, b"secret").is_err());
    }

    #[test]
    fn access_and_refresh_use_separate_secrets() {
        let tokens = create_user_tokens(&user(), b"access", 15, b"refresh", 600).unwrap();
        assert!(decode_token(tokens.access_token.clone(), b"access").is_ok());
        assert!(decode_token(tokens.access_token, b"refresh").is_err());
        assert!(decode_token(tokens.refresh_token, b"refresh").is_ok());
    }
}
