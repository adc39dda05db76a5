//! Certificate verification codes and document publishing.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{ApiError, Result};
use crate::models::{BucketKind, CertificateDetails};
use crate::services::storage::StorageService;

/// Derive the public verification code: 16 uppercase hex chars of
/// SHA-256(module | learner | issued_at), grouped by four.
pub fn verification_code(module_id: Uuid, learner_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(module_id.as_bytes());
    hasher.update(learner_id.as_bytes());
    hasher.update(issued_at.timestamp_micros().to_be_bytes());
    let digest = hasher.finalize();

    let hex: String = digest[..8].iter().map(|b| format!("{:02X}", b)).collect();
    hex.as_bytes()
        .chunks(4)
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalize user input of a verification code (case, spacing).
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Render the certificate document as markdown.
pub fn render_document(details: &CertificateDetails) -> String {
    let holder = details
        .learner_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&details.learner_email);

    format!(
        "# Certificate of Completion\n\n\
         This certifies that **{holder}** has completed the module\n\
         **{module}** of the course **{course}**.\n\n\
         - Grade: {grade:.1}\n\
         - Issued: {issued}\n\
         - Verification code: `{code}`\n",
        holder = holder,
        module = details.module_title,
        course = details.course_title,
        grade = details.grade,
        issued = details.issued_at.format("%Y-%m-%d %H:%M UTC"),
        code = details.verification_code,
    )
}

/// Render, upload and record the document of a certificate.
///
/// The object key depends only on the learner and module, so publishing
/// the same certificate twice overwrites the same object.
pub async fn publish(db: &Database, storage: &StorageService, certificate_id: Uuid) -> Result<String> {
    let details = db
        .get_certificate_details(certificate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Certificate {}", certificate_id)))?;

    let document = render_document(&details);
    let key = StorageService::certificate_key(details.learner_id, details.module_id);

    storage
        .upload_file(
            BucketKind::Certificates,
            &key,
            document.as_bytes(),
            Some("text/markdown"),
        )
        .await?;

    db.set_certificate_file_key(certificate_id, &key).await?;

    tracing::info!("Published certificate {} to {}", certificate_id, key);
    Ok(key)
}
