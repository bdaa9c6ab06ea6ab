//! Registration, login, and JWT verification for the ambient user/auth surface.
//!
//! Adapted from the teacher's original register/login/verify_token trio; the Ed25519 API-key
//! issuance that used to live alongside it belonged to a different surface (signed trading
//! requests) with no counterpart here, and was dropped along with its `api_keys_tb` table.

use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use utoipa::ToSchema;

use crate::core_types::{AuthenticatedUser, UserId};

/// JWT claims. `is_vip` rides along so the gateway can classify priority without a second
/// lookup on every authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub is_vip: bool,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "jane")]
    pub username: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_vip: bool,
}

pub struct UserAuthService {
    db: Pool<Postgres>,
    jwt_secret: String,
}

impl UserAuthService {
    pub fn new(db: Pool<Postgres>, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<i64> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("hashing failed: {}", e))?
            .to_string();

        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO users (username, email, password_hash, is_vip) \
             VALUES ($1, $2, $3, false) RETURNING id",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .context("failed to insert user")?;

        Ok(rec.0)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let row = sqlx::query_as::<_, (i64, String, String, String, bool)>(
            "SELECT id, username, email, password_hash, is_vip FROM users WHERE email = $1",
        )
        .bind(&req.email)
        .fetch_optional(&self.db)
        .await
        .context("db query failed")?
        .ok_or_else(|| anyhow::anyhow!("invalid email or password"))?;

        let (user_id, username, email, password_hash, is_vip) = row;

        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("invalid hash format: {}", e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| anyhow::anyhow!("invalid email or password"))?;

        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(24))
            .expect("valid timestamp")
            .timestamp();

        let claims = Claims {
            sub: user_id.to_string(),
            is_vip,
            exp: expiration as usize,
            iat: Utc::now().timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .context("failed to generate token")?;

        Ok(AuthResponse {
            token,
            user_id,
            username,
            email,
            is_vip,
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

impl Claims {
    pub fn into_authenticated_user(self) -> Result<AuthenticatedUser> {
        let id: i64 = self.sub.parse().context("claims subject was not a user id")?;
        Ok(AuthenticatedUser {
            id: UserId(id),
            is_vip: self.is_vip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(is_vip: bool) -> Claims {
        let now = 1_700_000_000;
        Claims {
            sub: "42".to_string(),
            is_vip,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn jwt_round_trips_through_the_same_secret() {
        let secret = "test-secret";
        let token = encode(
            &Header::default(),
            &claims(true),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let validation = Validation::new(Algorithm::HS256);
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "42");
        assert!(decoded.claims.is_vip);
    }

    #[test]
    fn jwt_rejects_a_token_signed_with_a_different_secret() {
        let token = encode(
            &Header::default(),
            &claims(false),
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();

        let validation = Validation::new(Algorithm::HS256);
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret-b"),
            &validation,
        );
        assert!(result.is_err());
    }

    #[test]
    fn claims_convert_into_an_authenticated_user() {
        let user = claims(true).into_authenticated_user().unwrap();
        assert_eq!(user.id, UserId(42));
        assert!(user.is_vip);
    }

    /// The cryptographic contract `register`/`login` rely on: a correct password verifies, a
    /// wrong one does not.
    #[test]
    fn password_hash_accepts_correct_and_rejects_wrong_password() {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(b"correct horse battery staple", &salt)
            .unwrap()
            .to_string();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert!(
            Argon2::default()
                .verify_password(b"correct horse battery staple", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong password", &parsed)
                .is_err()
        );
    }
}
