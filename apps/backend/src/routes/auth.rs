//! Authentication middleware

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::Role;
use crate::AppState;

/// Authenticated learner info stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedLearner {
    pub learner_id: Uuid,
    pub role: Role,
}

impl AuthenticatedLearner {
    pub fn require_instructor(&self) -> Result<()> {
        if self.role == Role::Instructor {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Instructor role required".to_string()))
        }
    }
}

/// Extract the token from a `Bearer` Authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Auth middleware - validates the bearer JWT and loads the learner
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = bearer_token(auth_header)
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    let claims = state.tokens.verify(token)?;

    // Tokens outlive deleted accounts, so the learner must still exist
    let learner = state
        .db
        .get_learner(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown learner".to_string()))?;

    request.extensions_mut().insert(AuthenticatedLearner {
        learner_id: learner.id,
        role: learner.role(),
    });

    Ok(next.run(request).await)
}
