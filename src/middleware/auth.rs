use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

const INSTRUCTOR_ROLES: [&str; 2] = ["instructor", "admin"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn is_instructor(&self) -> bool {
        let role = self.role.as_deref().unwrap_or_default();
        INSTRUCTOR_ROLES.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Claims, Response> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))
}

/// Any authenticated caller. The token subject is the student id.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(req.headers(), &state.config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_instructor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = match authenticate(req.headers(), &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if !claims.is_instructor() {
        tracing::debug!(sub = %claims.sub, "instructor route refused");
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}
