//! Bearer token extraction.
//!
//! With `AUTH_SECRET` configured every request must present it as a bearer
//! token. Without it the server runs open and unauthenticated requests are
//! treated as anonymous.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Authenticated caller extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The bearer token, or `"anonymous"` on an open server
    pub token: String,
}

impl AuthUser {
    pub fn is_anonymous(&self) -> bool {
        self.token == ANONYMOUS
    }
}

const ANONYMOUS: &str = "anonymous";

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authorize(auth_header, state.config.auth_secret.as_deref())
    }
}

/// Check an `Authorization` header value against the configured secret.
pub fn authorize(header: Option<&str>, secret: Option<&str>) -> Result<AuthUser, AppError> {
    match header {
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .map(str::trim)
                .ok_or(AppError::Unauthorized)?;
            if token.is_empty() {
                return Err(AppError::Unauthorized);
            }
            if let Some(secret) = secret {
                if token != secret {
                    tracing::debug!("rejected bearer token");
                    return Err(AppError::Unauthorized);
                }
            }
            Ok(AuthUser {
                token: token.to_string(),
            })
        }
        None if secret.is_none() => Ok(AuthUser {
            token: ANONYMOUS.to_string(),
        }),
        None => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_server_accepts_anonymous() {
        let user = authorize(None, None).unwrap();
        assert!(user.is_anonymous());
    }

    #[test]
    fn open_server_still_rejects_malformed_headers() {
        assert!(matches!(authorize(Some("Basic abc"), None), Err(AppError::Unauthorized)));
        assert!(matches!(authorize(Some("Bearer "), None), Err(AppError::Unauthorized)));
    }

    #[test]
    fn secret_must_match() {
        let secret = Some("s3cret");
        assert!(matches!(authorize(None, secret), Err(AppError::Unauthorized)));
        assert!(matches!(
            authorize(Some("Bearer wrong"), secret),
            Err(AppError::Unauthorized)
        ));
        let user = authorize(Some("Bearer s3cret"), secret).unwrap();
        assert_eq!(user.token, "s3cret");
        assert!(!user.is_anonymous());
    }
}
