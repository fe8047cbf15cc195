use crate::models::all_models::UserRole;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize, Serializer};

/// Lifetime of an issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session expired. Sign in again.";

/// Identity of an authenticated principal, as carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
}

/// Wire payload of a token
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    id: i32,
    email: String,
    role: UserRole,
    iat: i64, // Issued-at timestamp
    exp: i64, // Expiration timestamp
}

impl From<TokenClaims> for IdentityClaims {
    fn from(claims: TokenClaims) -> Self {
        IdentityClaims {
            id: claims.id,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    Expired,
    Invalid,
}

/// Outcome of decoding a bearer token.
///
/// A failed decode is not an error in the `Result` sense: it is handed to the
/// request as data, and [`crate::handlers::gate::check`] decides whether the
/// failure matters for the operation at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Verified(IdentityClaims),
    Failed { kind: TokenErrorKind, message: String },
}

impl AuthResult {
    fn expired() -> Self {
        AuthResult::Failed {
            kind: TokenErrorKind::Expired,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    pub fn claims(&self) -> Option<&IdentityClaims> {
        match self {
            AuthResult::Verified(claims) => Some(claims),
            AuthResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthResult::Verified(_) => None,
            AuthResult::Failed { message, .. } => Some(message),
        }
    }

    /// Principal id, or 0 when the token did not verify.
    pub fn id(&self) -> i32 {
        self.claims().map(|c| c.id).unwrap_or(0)
    }

    pub fn email(&self) -> &str {
        self.claims().map(|c| c.email.as_str()).unwrap_or("")
    }

    pub fn role(&self) -> Option<UserRole> {
        self.claims().map(|c| c.role)
    }
}

#[derive(Serialize)]
struct AuthView<'a> {
    id: i32,
    email: &'a str,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

// Flattened `{id, email, role, error}` shape; failures report id 0 and empty strings.
impl Serialize for AuthResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AuthView {
            id: self.id(),
            email: self.email(),
            role: self.role().map(|r| r.to_string()).unwrap_or_default(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// Issues and verifies HS256 bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `decode_at`.
        validation.validate_exp = false;

        TokenCodec {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Generates a token for the given identity, valid for two hours from now.
    pub fn encode(&self, claims: &IdentityClaims) -> Result<String, jsonwebtoken::errors::Error> {
        self.encode_at(claims, Utc::now())
    }

    pub fn encode_at(
        &self,
        claims: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = issued_at + Duration::seconds(TOKEN_TTL_SECS);
        let payload = TokenClaims {
            id: claims.id,
            email: claims.email.clone(),
            role: claims.role,
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
    }

    /// Verifies a token and returns its identity, or a classified failure.
    pub fn decode(&self, token: &str) -> AuthResult {
        self.decode_at(token, Utc::now())
    }

    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult {
        match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if now.timestamp() >= data.claims.exp => AuthResult::expired(),
            Ok(data) => AuthResult::Verified(data.claims.into()),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => AuthResult::expired(),
                _ => AuthResult::Failed {
                    kind: TokenErrorKind::Invalid,
                    message: e.to_string(),
                },
            },
        }
    }
}
