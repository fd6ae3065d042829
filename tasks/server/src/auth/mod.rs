use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

pub mod api;

/// Lifetime of an issued bearer token.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
}

/// Custom error type for token operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No signing secret was configured.
    #[error("Token signing secret is not configured")]
    MissingSecret,
    /// Represents an error during JWT encoding or decoding.
    #[error("JWT operation failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Mints and checks signed, time-limited bearer tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Produces a signed token that expires after [`TOKEN_LIFETIME_HOURS`].
    fn issue(&self) -> Result<String, TokenError>;

    /// Checks the token signature and expiry, returning its claims.
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HMAC-signed JWT implementation of `TokenIssuer`.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    secret: String,
}

impl JwtTokenIssuer {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let expire = chrono::Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS);
        let claims = Claims {
            exp: expire.timestamp() as usize,
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(jwt)
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Self::validation(),
        )?;
        Ok(token_data.claims)
    }
}
