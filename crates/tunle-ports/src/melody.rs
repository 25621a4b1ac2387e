use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of bars in every published melody.
pub const BAR_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDto {
    pub note: u8,
    #[serde(default)]
    pub left_quaver: bool,
    #[serde(default)]
    pub right_quaver: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// What the resolver publishes for one calendar date.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MelodyAssets {
    /// Tag used to invalidate cached melody buffers when the day changes.
    pub session_tag: String,
    pub date: Option<NaiveDate>,
    pub difficulty: Option<Difficulty>,
    pub bar_urls: [String; BAR_COUNT],
    pub full_tune_url: String,
    pub bar_notes: [Vec<NoteDto>; BAR_COUNT],
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("no melody published for {0}")]
    NotFound(NaiveDate),
    #[error("invalid melody descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait MelodyResolverPort: Send + Sync {
    fn resolve(&self, date: NaiveDate) -> Result<MelodyAssets, ResolveError>;
}
