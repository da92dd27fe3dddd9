//! Conversion endpoints: admit a download, poll its job.

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::files::sanitize_filename;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::fetch::AUDIO_EXT;
use crate::jobs::{ConversionJob, JobState};
use crate::models::AppState;

/// Request body for a conversion.
///
/// Absent fields deserialize to empty strings so they all fail the same
/// required-field check.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub playlist_name: String,
    #[serde(default)]
    pub audio_name: String,
}

/// Response for an admitted conversion.
#[derive(Debug, Serialize)]
pub struct ConvertAccepted {
    pub message: String,
    pub job_id: Uuid,
    pub filename: String,
    pub status: &'static str,
}

/// Job state as reported to the client.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub playlist: String,
    pub filename: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<ConversionJob> for JobResponse {
    fn from(job: ConversionJob) -> Self {
        let (status, error) = match job.state {
            JobState::Queued => ("queued", None),
            JobState::Running => ("running", None),
            JobState::Completed => ("completed", None),
            JobState::Failed { error } => ("failed", Some(error)),
        };

        Self {
            job_id: job.id,
            playlist: job.playlist,
            filename: job.filename,
            status,
            error,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

/// Admit a conversion.
///
/// POST /convert
///
/// Validates the request and reserves the target filename synchronously,
/// then runs the download in a background task. Responds 202 with a job
/// id the client can poll.
#[post("/convert")]
pub async fn convert(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<ConvertRequest>,
) -> AppResult<HttpResponse> {
    let url = body.url.trim();
    let playlist_name = body.playlist_name.trim();
    let audio_name = body.audio_name.trim();

    if url.is_empty() {
        return Err(AppError::missing_field("url"));
    }
    if playlist_name.is_empty() {
        return Err(AppError::missing_field("playlist_name"));
    }
    if audio_name.is_empty() {
        return Err(AppError::missing_field("audio_name"));
    }

    let audio_name = sanitize_filename(audio_name)?;
    let filename = format!("{}.{}", audio_name, AUDIO_EXT);

    let job = state.convert.admit(user.id, playlist_name, &filename)?;

    let service = state.convert.clone();
    let spawned_job = job.clone();
    let url = url.to_string();
    tokio::spawn(async move {
        service.run(&spawned_job, &url).await;
    });

    Ok(HttpResponse::Accepted().json(ConvertAccepted {
        message: "Download queued".to_string(),
        job_id: job.id,
        filename,
        status: "queued",
    }))
}

/// Poll a conversion job.
///
/// GET /convert/{job_id}
///
/// Jobs are only visible to the user who created them; anything else is
/// a 404 so job ids do not leak between accounts.
#[get("/convert/{job_id}")]
pub async fn job_status(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let job_id = path.into_inner();

    let job = state
        .jobs
        .get(job_id)
        .filter(|job| job.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))?;

    Ok(HttpResponse::Ok().json(JobResponse::from(job)))
}

/// Configure conversion routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(convert).service(job_status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::auth::{JsonUserRepository, SharedUserRepository, UserRepository};
    use crate::fetch::testing::FakeFetcher;
    use crate::jobs::JobRegistry;
    use crate::models::AppState;
    use crate::playlists::{ConvertService, JsonPlaylistRepository, SharedPlaylistRepository};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;
    use std::sync::Arc;

    fn init_test_config() {
        std::env::set_var("JWT_SECRET", "test-secret-key-for-testing-purposes-only");
        let _ = crate::config::init();
    }

    fn test_state(dir: &std::path::Path, fetcher: FakeFetcher) -> AppState {
        let audio_folder = dir.join("audio");
        std::fs::create_dir_all(&audio_folder).unwrap();

        let users: SharedUserRepository =
            Arc::new(JsonUserRepository::new(dir.join("users.json")).unwrap());
        let playlists: SharedPlaylistRepository =
            Arc::new(JsonPlaylistRepository::new(dir.join("playlists.json")).unwrap());
        let jobs = Arc::new(JobRegistry::new());
        let convert_service = Arc::new(ConvertService::new(
            audio_folder.clone(),
            playlists.clone(),
            Arc::new(fetcher),
            jobs.clone(),
        ));

        AppState {
            audio_folder,
            users,
            playlists,
            jobs,
            convert: convert_service,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(api::auth::configure)
                    .configure(api::convert::configure)
                    .configure(api::playlists::configure),
            )
            .await
        };
    }

    macro_rules! register_and_login {
        ($app:expr, $username:expr) => {{
            let req = test::TestRequest::post()
                .uri("/register")
                .set_json(json!({"username": $username, "password": "password123"}))
                .to_request();
            let resp = test::call_service($app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);

            let req = test::TestRequest::post()
                .uri("/login")
                .set_json(json!({"username": $username, "password": "password123"}))
                .to_request();
            let body: serde_json::Value = test::call_and_read_body_json($app, req).await;
            body["token"]["access_token"].as_str().unwrap().to_string()
        }};
    }

    macro_rules! poll_until_done {
        ($app:expr, $token:expr, $job_id:expr) => {{
            let mut result = None;
            for _ in 0..100 {
                let req = test::TestRequest::get()
                    .uri(&format!("/convert/{}", $job_id))
                    .insert_header(("Authorization", format!("Bearer {}", $token)))
                    .to_request();
                let body: serde_json::Value = test::call_and_read_body_json($app, req).await;

                match body["status"].as_str() {
                    Some("completed") | Some("failed") => {
                        result = Some(body);
                        break;
                    }
                    _ => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
                }
            }
            result.expect("job did not finish")
        }};
    }

    #[actix_web::test]
    async fn test_full_conversion_scenario() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let token = register_and_login!(&app, "alice");

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "url": "https://example.com/watch?v=x",
                "playlist_name": "gym",
                "audio_name": "track1"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["filename"], "track1.mp3");
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let done = poll_until_done!(&app, &token, &job_id);
        assert_eq!(done["status"], "completed");
        assert_eq!(done["filename"], "track1.mp3");

        assert!(state.audio_folder.join("track1.mp3").exists());

        let req = test::TestRequest::get()
            .uri("/playlists")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let playlists: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(playlists, json!({"gym": ["track1.mp3"]}));
    }

    #[actix_web::test]
    async fn test_unauthenticated_requests_forbidden() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({
                "url": "https://example.com/watch?v=x",
                "playlist_name": "gym",
                "audio_name": "track1"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get().uri("/playlists").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_missing_fields_rejected() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let token = register_and_login!(&app, "bob");

        for body in [
            json!({"playlist_name": "gym", "audio_name": "track1"}),
            json!({"url": "https://example.com/x", "audio_name": "track1"}),
            json!({"url": "https://example.com/x", "playlist_name": "gym"}),
        ] {
            let req = test::TestRequest::post()
                .uri("/convert")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn test_duplicate_registration_rejected() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let _token = register_and_login!(&app, "carol");

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "carol", "password": "different456"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.users.count().unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_wrong_password_rejected() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let _token = register_and_login!(&app, "dave");

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"username": "dave", "password": "wrongwrong"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_duplicate_filename_conflict() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let token = register_and_login!(&app, "erin");

        let convert_body = json!({
            "url": "https://example.com/watch?v=x",
            "playlist_name": "gym",
            "audio_name": "track1"
        });

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(convert_body.clone())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();
        poll_until_done!(&app, &token, &job_id);

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(convert_body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // The playlist still has exactly one entry.
        let req = test::TestRequest::get()
            .uri("/playlists")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let playlists: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(playlists, json!({"gym": ["track1.mp3"]}));
    }

    #[actix_web::test]
    async fn test_failed_download_reported_to_poller() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::failing("video unavailable"));
        let app = test_app!(state);

        let token = register_and_login!(&app, "frank");

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "url": "https://example.com/gone",
                "playlist_name": "gym",
                "audio_name": "track1"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let done = poll_until_done!(&app, &token, &job_id);
        assert_eq!(done["status"], "failed");
        assert!(done["error"].as_str().unwrap().contains("video unavailable"));

        // Target name freed, no playlist entry.
        assert!(!state.audio_folder.join("track1.mp3").exists());
        let req = test::TestRequest::get()
            .uri("/playlists")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let playlists: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(playlists, json!({}));
    }

    #[actix_web::test]
    async fn test_jobs_invisible_to_other_users() {
        init_test_config();
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), FakeFetcher::succeeding());
        let app = test_app!(state);

        let alice_token = register_and_login!(&app, "alice2");
        let mallory_token = register_and_login!(&app, "mallory");

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header(("Authorization", format!("Bearer {}", alice_token)))
            .set_json(json!({
                "url": "https://example.com/watch?v=x",
                "playlist_name": "gym",
                "audio_name": "secret"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/convert/{}", job_id))
            .insert_header(("Authorization", format!("Bearer {}", mallory_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
