//! Video upload API integration tests.
//!
//! Run with: `cargo test -p tubely-api --test videos_test`

mod helpers;

use axum::http::StatusCode;
use helpers::fixtures::{file_form, mp4_bytes, png_bytes, video_form};
use helpers::{setup_test_app, setup_test_app_with, TestOptions, TEST_URL_BASE};
use serde_json::Value;
use tubely_core::Video;
use uuid::Uuid;

#[tokio::test]
async fn test_upload_video_end_to_end() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(video_form(mp4_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Video = response.json();
    let url = body.video_url.clone().expect("video_url not set");
    let prefix = format!("{}/landscape/", TEST_URL_BASE);
    assert!(url.starts_with(&prefix), "unexpected url {}", url);
    assert!(url.ends_with(".mp4"));
    let name = &url[prefix.len()..url.len() - ".mp4".len()];
    assert_eq!(name.len(), 43);
    assert!(name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

    assert_eq!(app.stored_video(video.id).await.video_url, Some(url));
    let objects = app.stored_objects().await;
    assert_eq!(objects.len(), 1);
    assert!(objects[0].starts_with("landscape/"));
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_portrait_video_key_prefix() {
    let app = setup_test_app_with(TestOptions {
        dimensions: (1080, 1920),
        ..TestOptions::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(video_form(mp4_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let objects = app.stored_objects().await;
    assert!(objects[0].starts_with("portrait/"));
}

#[tokio::test]
async fn test_upload_by_non_owner_is_rejected_without_side_effects() {
    let app = setup_test_app().await;
    let video = app.create_video(Uuid::new_v4()).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header(
            "Authorization",
            format!("Bearer {}", app.token_for(Uuid::new_v4())),
        )
        .multipart(video_form(mp4_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(app.stored_video(video.id).await, video);
    assert!(app.stored_objects().await.is_empty());
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_unsupported_media_type() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(file_form("video", mp4_bytes(), "boots.mov", "video/quicktime"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(app.stored_objects().await.is_empty());
    assert_eq!(app.staged_files(), 0);
    assert!(app.stored_video(video.id).await.video_url.is_none());
}

#[tokio::test]
async fn test_video_over_size_limit() {
    let app = setup_test_app_with(TestOptions {
        max_video_size_bytes: 512,
        ..TestOptions::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(video_form(vec![0u8; 4096]))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(app.staged_files(), 0);
    assert!(app.stored_objects().await.is_empty());
}

#[tokio::test]
async fn test_remux_failure_returns_generic_error() {
    let app = setup_test_app_with(TestOptions {
        remux_fails: true,
        ..TestOptions::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(video_form(mp4_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Couldn't process video");
    assert!(body.get("details").is_none());
    assert_eq!(app.staged_files(), 0);
    assert!(app.stored_objects().await.is_empty());
}

#[tokio::test]
async fn test_metadata_failure_leaves_published_object() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;
    app.videos.set_fail_updates(true);

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(video_form(mp4_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DATABASE_ERROR");
    assert_eq!(body["error"], "Couldn't update video");
    assert_eq!(app.stored_objects().await.len(), 1);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_request_errors() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let token = app.token_for(owner);
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post("/api/videos/not-a-uuid")
        .add_header("Authorization", format!("Bearer {}", token))
        .multipart(video_form(mp4_bytes()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .multipart(video_form(mp4_bytes()))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .client()
        .post(&format!("/api/videos/{}", Uuid::new_v4()))
        .add_header("Authorization", format!("Bearer {}", token))
        .multipart(video_form(mp4_bytes()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app
        .client()
        .post(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", token))
        .multipart(file_form("file", mp4_bytes(), "boots.mp4", "video/mp4"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(app.staged_files(), 0);
    assert!(app.stored_objects().await.is_empty());
}

#[tokio::test]
async fn test_upload_thumbnail() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}/thumbnail", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(file_form("thumbnail", png_bytes(), "boots.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Video = response.json();
    let url = body.thumbnail_url.expect("thumbnail_url not set");
    assert!(url.starts_with(&format!("{}/thumbnails/", TEST_URL_BASE)));
    assert!(url.ends_with(".png"));
    assert!(body.video_url.is_none());
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_thumbnail_over_size_limit() {
    let app = setup_test_app_with(TestOptions {
        max_thumbnail_size_bytes: 16,
        ..TestOptions::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/videos/{}/thumbnail", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .multipart(file_form("thumbnail", png_bytes(), "boots.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_get_video_owner_only() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .get(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", format!("Bearer {}", app.token_for(owner)))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Video = response.json();
    assert_eq!(body.id, video.id);

    let response = app
        .client()
        .get(&format!("/api/videos/{}", video.id))
        .add_header(
            "Authorization",
            format!("Bearer {}", app.token_for(Uuid::new_v4())),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["paths"]["/api/videos/{video_id}"].is_object());
}
