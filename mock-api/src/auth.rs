use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::MockState;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub role: String,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

pub fn create_token(id: &str, role: &str, secret: &str, expiration_hours: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        id: id.to_string(),
        role: role.to_string(),
        exp: (now + Duration::hours(expiration_hours)).timestamp(),
        iat: now.timestamp(),
    };

    // HS256 over an in-memory claim set cannot fail.
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap_or_default()
}

pub fn verify_token(token: &str, secret: &str) -> ApiResult<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| ApiError::Unauthorized(format!("Authentication failed: {}", e)))
}

fn authenticate(state: &MockState, request: &mut Request, role: &str) -> ApiResult<()> {
    let auth = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

    let claims = verify_token(auth.token(), state.jwt_secret())?;
    if claims.role != role {
        return Err(ApiError::Forbidden(format!("{} access required", role)));
    }
    request.extensions_mut().insert(claims);
    Ok(())
}

/// Require a customer token
pub async fn require_user(State(state): State<MockState>, mut request: Request, next: Next) -> ApiResult<Response> {
    authenticate(&state, &mut request, ROLE_USER)?;
    Ok(next.run(request).await)
}

/// Require an admin token
pub async fn require_admin(State(state): State<MockState>, mut request: Request, next: Next) -> ApiResult<Response> {
    authenticate(&state, &mut request, ROLE_ADMIN)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_and_wrong_secret() {
        let token = create_token("u1", ROLE_USER, "s1", 1);
        assert_eq!(verify_token(&token, "s1").unwrap().id, "u1");

        let err = verify_token(&token, "s2").unwrap_err();
        assert!(err.to_string().starts_with("Authentication failed"));
    }
}
