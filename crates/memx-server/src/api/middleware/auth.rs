use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

pub const ROLE_ADMIN: &str = "admin";

/// Session claims minted by the auth frontend after identity-provider
/// login. `sub` is the identity-provider user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::AdminRequired)
        }
    }
}

pub fn verify_session(token: &str, secret: &str) -> Result<SessionClaims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|decoded| decoded.claims)
    .map_err(|_| AppError::Unauthenticated)
}

pub async fn middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let claims = verify_session(token, &state.config.session_secret)?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn token_for(role: &str, secret: &str, ttl: Duration) -> String {
        let claims = SessionClaims {
            sub: "user_123".into(),
            role: role.into(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_verifies() {
        let token = token_for("business", "secret", Duration::hours(1));
        let claims = verify_session(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.role, "business");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token_for("business", "secret", Duration::hours(1));
        assert!(verify_session(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token_for("business", "secret", Duration::hours(-1));
        assert!(verify_session(&token, "secret").is_err());
    }

    #[test]
    fn admin_guard() {
        let admin = AuthContext {
            user_id: "u".into(),
            role: ROLE_ADMIN.into(),
        };
        let member = AuthContext {
            user_id: "u".into(),
            role: "business".into(),
        };
        assert!(admin.require_admin().is_ok());
        assert!(member.require_admin().is_err());
    }
}
