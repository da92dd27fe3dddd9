//! Home page and audio file serving.

use actix_files::NamedFile;
use actix_web::{get, http::header::ContentType, web, HttpRequest, HttpResponse};

use crate::error::{AppError, AppResult};
use crate::models::AppState;

/// Validate and sanitize a filename to prevent path traversal attacks.
///
/// Returns an error if the filename contains path traversal sequences.
pub(crate) fn sanitize_filename(filename: &str) -> AppResult<&str> {
    // Reject empty filenames
    if filename.is_empty() {
        return Err(AppError::Validation("Filename cannot be empty".to_string()));
    }

    // Reject path traversal attempts
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!(filename = %filename, "Path traversal attempt blocked");
        return Err(AppError::path_traversal());
    }

    // Reject absolute paths (Unix and Windows)
    if filename.starts_with('/') || filename.chars().nth(1) == Some(':') {
        return Err(AppError::path_traversal());
    }

    Ok(filename)
}

/// Serve the home page.
///
/// GET /
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(include_str!("../../static/index.html"))
}

/// Serve a downloaded audio file.
///
/// GET /audio/{filename}
///
/// Serves straight from the audio folder; playlists only hold filename
/// strings, so there is no ownership relation to check here.
#[get("/audio/{filename}")]
pub async fn serve_audio(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let filename = sanitize_filename(&path)?;
    let full_path = state.audio_folder.join(filename);

    // Check file exists
    if !full_path.exists() {
        return Err(AppError::NotFound(format!("File not found: {}", filename)));
    }

    // Verify the resolved path is still within the audio folder (extra safety)
    let canonical = full_path
        .canonicalize()
        .map_err(|_| AppError::NotFound(format!("File not found: {}", filename)))?;
    let audio_canonical = state
        .audio_folder
        .canonicalize()
        .map_err(|e| AppError::Internal(format!("Audio folder error: {}", e)))?;

    if !canonical.starts_with(&audio_canonical) {
        tracing::warn!(
            requested = %canonical.display(),
            audio_folder = %audio_canonical.display(),
            "Path escape attempt blocked"
        );
        return Err(AppError::path_traversal());
    }

    let file = NamedFile::open(&full_path)?;
    Ok(file.into_response(&req))
}

/// Configure file routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(serve_audio);
}
