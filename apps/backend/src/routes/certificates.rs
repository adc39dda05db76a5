//! Certificate endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::services::storage::StorageError;
use crate::services::{certificate, progress};
use crate::AppState;

/// POST /api/module-certificate
/// Re-runs issuance for a module; safe to call repeatedly. Owner only.
pub async fn issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(payload): Json<ModuleCertificateRequest>,
) -> Result<Json<ModuleCertificateResponse>> {
    let enrollment = progress::owned_enrollment(&state, auth.learner_id, payload.enrollment_id).await?;
    let outcome = progress::issue_and_publish(&state, enrollment.id, payload.module_id).await?;
    Ok(Json(ModuleCertificateResponse::from(&outcome)))
}

/// GET /api/certificates
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
) -> Result<Json<CertificateListResponse>> {
    let certificates = state.db.get_certificates_for_learner(auth.learner_id).await?;
    Ok(Json(CertificateListResponse {
        certificates: certificates.iter().map(DbCertificate::to_view).collect(),
    }))
}

/// GET /api/certificates/:id/file
/// Streams the document, rebuilding it when the upload never happened
pub async fn file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Path(certificate_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let cert = state
        .db
        .get_certificate(certificate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Certificate {}", certificate_id)))?;

    if cert.learner_id != auth.learner_id && auth.role != Role::Instructor {
        return Err(ApiError::Forbidden("Certificate belongs to another learner".to_string()));
    }

    let existing = match &cert.file_key {
        Some(key) => match state.storage.download_file(BucketKind::Certificates, key).await {
            Ok(bytes) => Some(bytes),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let bytes = match existing {
        Some(bytes) => bytes,
        None => {
            tracing::info!("Regenerating document for certificate {}", cert.id);
            let key = certificate::publish(&state.db, &state.storage, cert.id).await?;
            state
                .storage
                .download_file(BucketKind::Certificates, &key)
                .await?
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"certificate-{}.md\"", cert.id),
            ),
        ],
        bytes,
    ))
}

/// GET /api/certificates/verify/:code
/// Public lookup used by third parties to check a certificate
pub async fn verify(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<VerifyCertificateResponse>> {
    let code = certificate::normalize_code(&code);
    let details = state
        .db
        .get_certificate_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("No certificate with this verification code".to_string()))?;
    Ok(Json(VerifyCertificateResponse::from(&details)))
}
