/// Authentication extractors and JWT utilities
use crate::{account::User, config::AuthConfig, context::AppContext, error::PortalError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// JWT claims carried by access and refresh tokens
///
/// The role flags are embedded so handlers can authorize without a
/// database round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// "access" or "refresh"
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Issue an access token for a user
pub fn issue_access_token(user: &User, config: &AuthConfig) -> Result<String, PortalError> {
    issue_token(user, "access", config.access_token_ttl, config)
}

/// Issue a refresh token for a user
pub fn issue_refresh_token(user: &User, config: &AuthConfig) -> Result<String, PortalError> {
    issue_token(user, "refresh", config.refresh_token_ttl, config)
}

fn issue_token(
    user: &User,
    token_type: &str,
    ttl: u64,
    config: &AuthConfig,
) -> Result<String, PortalError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        token_type: token_type.to_string(),
        iat: now,
        exp: now + ttl as i64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| PortalError::Internal(format!("Token encoding failed: {}", e)))
}

/// Verify a JWT and return its claims
///
/// Performs signature verification, expiration checking with a small
/// clock-skew allowance, and claims deserialization.
pub fn verify_token(token: &str, jwt_secret: &str) -> Result<Claims, PortalError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    PortalError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    PortalError::Authentication("Invalid token signature".to_string())
                }
                _ => PortalError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Authenticated caller, extracted from a bearer access token
///
/// Carries the capability predicates handlers authorize against, so no
/// handler reaches into ambient request state.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthUser {
    /// Whether the caller may perform admin-only operations
    pub fn is_staff(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Whether the caller owns the given user id
    pub fn is_self(&self, user_id: i64) -> bool {
        self.id == user_id
    }

    fn from_claims(claims: Claims) -> Result<Self, PortalError> {
        if claims.token_type != "access" {
            return Err(PortalError::Authentication(
                "Not an access token".to_string(),
            ));
        }
        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
            is_staff: claims.is_staff,
            is_superuser: claims.is_superuser,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            PortalError::Authentication("Missing authorization header".to_string())
        })?;

        let claims = verify_token(&token, &state.config.authentication.jwt_secret)?;
        AuthUser::from_claims(claims)
    }
}

/// Optional authenticated caller - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl OptionalAuthUser {
    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthUser {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_bearer_token(&parts.headers)
            .and_then(|token| verify_token(&token, &state.config.authentication.jwt_secret).ok())
            .and_then(|claims| AuthUser::from_claims(claims).ok());

        Ok(OptionalAuthUser(user))
    }
}

/// Staff-only caller - rejects non-staff with Forbidden
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_staff() {
            return Err(PortalError::Authorization(
                "Staff role required".to_string(),
            ));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ReviewStatus;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            access_token_ttl: 3600,
            refresh_token_ttl: 604800,
        }
    }

    fn test_user(staff: bool, superuser: bool) -> User {
        User {
            id: 42,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "unused".to_string(),
            first_name: "Alice".to_string(),
            middle_name: "Q".to_string(),
            last_name: "Reyes".to_string(),
            is_married: false,
            maiden_name: None,
            phone_number: "0917".to_string(),
            batch: "2023".to_string(),
            program: "CS".to_string(),
            valid_id: None,
            review_status: ReviewStatus::Approved,
            is_staff: staff,
            is_superuser: superuser,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let config = test_auth_config();
        let token = issue_access_token(&test_user(true, false), &config).unwrap();

        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert!(claims.is_staff);
        assert!(!claims.is_superuser);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_superuser_flag_embedded_in_token() {
        let config = test_auth_config();
        let token = issue_access_token(&test_user(false, true), &config).unwrap();
        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert!(claims.is_superuser);
    }

    #[test]
    fn test_refresh_token_not_usable_as_access() {
        let config = test_auth_config();
        let token = issue_refresh_token(&test_user(false, false), &config).unwrap();
        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert!(AuthUser::from_claims(claims).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_auth_config();
        let token = issue_access_token(&test_user(false, false), &config).unwrap();
        assert!(verify_token(&token, "another-secret-another-secret!!").is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_capability_predicates() {
        let user = AuthUser {
            id: 7,
            username: "bea".to_string(),
            is_staff: false,
            is_superuser: false,
        };
        assert!(!user.is_staff());
        assert!(user.is_self(7));
        assert!(!user.is_self(8));

        let admin = AuthUser {
            id: 1,
            username: "root".to_string(),
            is_staff: false,
            is_superuser: true,
        };
        // Superusers count as staff for authorization purposes
        assert!(admin.is_staff());
    }
}
