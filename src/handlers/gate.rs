use crate::handlers::auth::{AuthResult, IdentityClaims, TokenErrorKind};
use crate::models::all_models::UserRole;
use thiserror::Error;

pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";
pub const ROLE_MISMATCH_MESSAGE: &str = "User is not authenticated";

/// Rejection raised by [`check`]. Every variant is reported to clients as
/// an authentication failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{}", NOT_AUTHENTICATED_MESSAGE)]
    MissingToken,
    #[error("{message}")]
    Token {
        kind: TokenErrorKind,
        message: String,
    },
    // Reported as unauthenticated on the wire, like the other variants.
    #[error("{}", ROLE_MISMATCH_MESSAGE)]
    RoleMismatch { required: UserRole, actual: UserRole },
}

/// Lets the operation proceed only for a verified principal holding exactly `required`.
///
/// Must run before any persistence call in a privileged handler.
pub fn check(auth: Option<&AuthResult>, required: UserRole) -> Result<&IdentityClaims, AuthError> {
    let claims = match auth {
        None => return Err(AuthError::MissingToken),
        Some(AuthResult::Failed { kind, message }) => {
            return Err(AuthError::Token {
                kind: *kind,
                message: message.clone(),
            })
        }
        Some(AuthResult::Verified(claims)) => claims,
    };

    if claims.role != required {
        return Err(AuthError::RoleMismatch {
            required,
            actual: claims.role,
        });
    }

    Ok(claims)
}
