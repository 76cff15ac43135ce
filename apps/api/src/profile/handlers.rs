use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::profile::StudentProfile;
use crate::profile::extractor::ProfileExtractor;
use crate::profile::text_extractor::{extract_text, ExtractedText};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExtractProfileRequest {
    pub cv_text: String,
}

#[derive(Serialize)]
pub struct UploadProfileResponse {
    pub profile: StudentProfile,
    pub warnings: Vec<String>,
}

/// A CV received as multipart form data, already converted to text.
pub struct CvUpload {
    pub extracted: ExtractedText,
    /// Optional `top_k` form field, unvalidated.
    pub top_k: Option<usize>,
}

/// Rejects blank CV text.
pub fn require_cv_text(cv_text: &str) -> Result<&str, AppError> {
    if cv_text.trim().is_empty() {
        return Err(AppError::Validation("cv_text must not be empty".to_string()));
    }
    Ok(cv_text)
}

/// Reads the `cv` file field (and an optional `top_k` field) and extracts its
/// text on a blocking thread.
pub async fn read_cv_upload(mut multipart: Multipart) -> Result<CvUpload, AppError> {
    let mut document: Option<(Bytes, Option<String>)> = None;
    let mut top_k = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "cv" => {
                let file_name = field.file_name().map(str::to_string);
                document = Some((field.bytes().await?, file_name));
            }
            "top_k" => {
                let raw = field.text().await?;
                let parsed = raw.trim().parse::<usize>().map_err(|_| {
                    AppError::Validation(format!("top_k must be a positive integer, got '{raw}'"))
                })?;
                top_k = Some(parsed);
            }
            _ => {}
        }
    }

    let (bytes, file_name) =
        document.ok_or_else(|| AppError::Validation("Missing 'cv' file field".to_string()))?;

    let extracted = tokio::task::spawn_blocking(move || extract_text(&bytes, file_name.as_deref()))
        .await
        .map_err(|e| {
            if e.is_panic() {
                AppError::UnprocessableEntity("Unable to extract text from the document".to_string())
            } else {
                AppError::Internal(anyhow::anyhow!("CV extraction task failed: {e}"))
            }
        })??;

    Ok(CvUpload { extracted, top_k })
}

/// POST /api/v1/profile/extract
pub async fn handle_extract_profile(
    State(state): State<AppState>,
    Json(req): Json<ExtractProfileRequest>,
) -> Result<Json<StudentProfile>, AppError> {
    let cv_text = require_cv_text(&req.cv_text)?;
    let extractor = ProfileExtractor::new(&state.match_config.field_vocabulary);
    Ok(Json(extractor.extract(cv_text)))
}

/// POST /api/v1/profile/upload
pub async fn handle_upload_profile(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadProfileResponse>, AppError> {
    let upload = read_cv_upload(multipart).await?;
    let extractor = ProfileExtractor::new(&state.match_config.field_vocabulary);
    Ok(Json(UploadProfileResponse {
        profile: extractor.extract(&upload.extracted.text),
        warnings: upload.extracted.warnings,
    }))
}
