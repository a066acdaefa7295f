use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Aspect-ratio class of a video, used as the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    /// Classify by exact 16:9 ratio using integer division.
    ///
    /// 1920x1080 is landscape, 1080x1920 is portrait. Anything not matching
    /// `w == 16*h/9` or `h == 16*w/9` exactly (for example 1366x768) is `Other`.
    pub fn classify(width: u32, height: u32) -> Self {
        let (w, h) = (u64::from(width), u64::from(height));
        if w == 16 * h / 9 {
            Orientation::Landscape
        } else if h == 16 * w / 9 {
            Orientation::Portrait
        } else {
            Orientation::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
