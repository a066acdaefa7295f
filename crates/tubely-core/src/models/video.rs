use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A user-owned video record.
///
/// `video_url` and `thumbnail_url` are replaced wholesale on every successful
/// upload; a re-upload never keeps the previous reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn new(user_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: description.into(),
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Point the record at a freshly published video object.
    pub fn set_video_url(&mut self, url: String) {
        self.video_url = Some(url);
        self.updated_at = Utc::now();
    }

    /// Point the record at a freshly published thumbnail object.
    pub fn set_thumbnail_url(&mut self, url: String) {
        self.thumbnail_url = Some(url);
        self.updated_at = Utc::now();
    }
}
