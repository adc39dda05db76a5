//! Learner registration and profile endpoints

use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::AppState;

/// POST /api/learners/register
/// Creates a learner and returns a bearer token
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let email = payload.email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(ApiError::Validation(format!("Invalid email: {}", payload.email)));
    }

    let role = payload.role.unwrap_or_default();
    if role == Role::Instructor {
        let allowed = match (&state.config.instructor_signup_code, &payload.instructor_code) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        };
        if !allowed {
            return Err(ApiError::Forbidden("Instructor registration requires a valid code".to_string()));
        }
    }

    let learner = state
        .db
        .create_learner(&email, payload.name.as_deref(), role)
        .await?;
    let (token, _) = state.tokens.issue(learner.id, learner.role(), Utc::now())?;

    tracing::info!("Registered {} {}", role.as_str(), learner.id);

    Ok(Json(RegisterResponse {
        learner_id: learner.id,
        token,
    }))
}

/// GET /api/learners/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
) -> Result<Json<LearnerResponse>> {
    let learner = state
        .db
        .get_learner(auth.learner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Learner not found".to_string()))?;

    Ok(Json(LearnerResponse {
        id: learner.id,
        role: learner.role(),
        email: learner.email,
        name: learner.name,
        created_at: learner.created_at,
    }))
}

/// POST /api/learners/me/token
/// Exchanges a valid token for a fresh one
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
) -> Result<Json<TokenResponse>> {
    let (token, expires_at) = state.tokens.issue(auth.learner_id, auth.role, Utc::now())?;
    Ok(Json(TokenResponse { token, expires_at }))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_check() {
        assert!(is_plausible_email("ada@example.com"));
        assert!(!is_plausible_email("ada"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("ada@localhost"));
        assert!(!is_plausible_email("ada@example."));
    }
}
