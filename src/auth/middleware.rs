//! Authentication middleware and extractors.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use super::jwt::{decode_token, Claims};
use crate::error::AppError;

/// Authenticated user extractor.
///
/// Use this as a parameter in route handlers to require a logged-in user.
/// Requests without a valid session token are rejected with 403.
///
/// # Example
/// ```ignore
/// async fn protected_route(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
}

impl AuthenticatedUser {
    /// Create from JWT claims.
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

/// Extract the authenticated user from request headers.
fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    // Get Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(AppError::login_required)?;

    // Parse Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .ok_or_else(AppError::login_required)?;

    // Decode and validate token
    let claims = decode_token(token)?;

    // Check expiration
    if claims.is_expired() {
        return Err(AppError::login_required());
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_missing_auth_header() {
        let req = TestRequest::default().to_http_request();
        let result = extract_user(&req);

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_invalid_auth_header_format() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc123"))
            .to_http_request();
        let result = extract_user(&req);

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
