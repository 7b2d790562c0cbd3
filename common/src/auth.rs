// Authentication: password hashing, JWT issuing and credential checks

use crate::db::repositories::UserStore;
use crate::errors::AuthError;
use crate::models::{User, UserClaims};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// Password hashing strategy
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// bcrypt with a configurable work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::Hashing(e.to_string())
        })
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(password, hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            AuthError::Hashing(e.to_string())
        })
    }
}

/// A signed token together with its expiry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT token service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    expiration_hours: u64,
}

impl JwtService {
    #[instrument(skip(secret))]
    pub fn new(secret: &str, expiration_hours: u64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expiration_hours,
        }
    }

    /// Sign a token for the given user
    #[instrument(skip(self))]
    pub fn encode_token(&self, user_id: i64) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = i64::try_from(self.expiration_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                error!(
                    expiration_hours = self.expiration_hours,
                    "Token lifetime out of range"
                );
                AuthError::Internal("Token lifetime out of range".to_string())
            })?
            .timestamp();

        let claims = UserClaims {
            user_id,
            exp,
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(error = %e, "Failed to encode JWT token");
                AuthError::Internal(format!("Failed to encode token: {}", e))
            })?;

        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| AuthError::Internal("Token expiry out of range".to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decode and validate a JWT token
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<UserClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                warn!(error = %e, "Rejected JWT token");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(format!("Token validation failed: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }
}

/// Credential checks backed by the user store
#[derive(Clone)]
pub struct DatabaseAuthService {
    jwt_service: JwtService,
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl DatabaseAuthService {
    pub fn new(
        jwt_service: JwtService,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            jwt_service,
            users,
            hasher,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Check an email/password pair
    ///
    /// Every credential failure collapses into `InvalidCredentials` so callers
    /// cannot probe which emails are registered.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();

        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error during authentication");
                AuthError::Internal(format!("Database error: {}", e))
            })?
            .ok_or(AuthError::InvalidCredentials)?;

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(error = %e, user_id = user.id, "Stored password hash is unusable");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Authenticate and issue a token
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IssuedToken, User), AuthError> {
        let user = self.authenticate(email, password).await?;
        let token = self.jwt_service.encode_token(user.id)?;

        tracing::info!(user_id = user.id, "User logged in successfully");
        Ok((token, user))
    }

    /// Exchange a still-valid token for a fresh one
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self.jwt_service.decode_token(token)?;

        let exists = self
            .users
            .find_by_id(claims.user_id)
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?
            .is_some();

        if !exists {
            return Err(AuthError::InvalidToken("User no longer exists".to_string()));
        }

        self.jwt_service.encode_token(claims.user_id)
    }
}
