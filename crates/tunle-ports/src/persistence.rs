use crate::melody::BAR_COUNT;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Terminal summary of one session as handed to the persistence service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub date: NaiveDate,
    pub bar_hearts: [u8; BAR_COUNT],
    pub score: u32,
    pub completion_time_secs: f64,
    /// Replays of past dates are kept in history but never extend a streak.
    #[serde(default)]
    pub replay: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_played: Option<NaiveDate>,
}

pub trait PersistencePort: Send + Sync {
    fn record_session(&self, record: &SessionRecord) -> Result<(), PersistenceError>;
    fn fetch_history(&self, user_id: &str) -> Result<Vec<SessionRecord>, PersistenceError>;
    fn fetch_streak(&self, user_id: &str) -> Result<StreakStats, PersistenceError>;
}
