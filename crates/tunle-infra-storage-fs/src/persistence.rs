use crate::{read_json, write_json, JsonError};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tunle_ports::persistence::{PersistenceError, PersistencePort, SessionRecord, StreakStats};

/// Session history in `scores.json` and per-user streaks in `streaks.json`.
pub struct FsPersistence {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FsPersistence {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            write_lock: Mutex::new(()),
        }
    }

    fn scores_path(&self) -> PathBuf {
        self.base_dir.join("scores.json")
    }

    fn streaks_path(&self) -> PathBuf {
        self.base_dir.join("streaks.json")
    }

    fn load_scores(&self) -> Result<Vec<SessionRecord>, PersistenceError> {
        load_or_default(&self.scores_path())
    }

    fn load_streaks(&self) -> Result<HashMap<String, StreakStats>, PersistenceError> {
        load_or_default(&self.streaks_path())
    }
}

fn load_or_default<T>(path: &Path) -> Result<T, PersistenceError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path).map_err(persistence_error)
}

fn persistence_error(err: JsonError) -> PersistenceError {
    match err {
        JsonError::Io(e) => PersistenceError::Io(e.to_string()),
        JsonError::Serde(e) => PersistenceError::Serde(e.to_string()),
    }
}

/// Streak after playing `date`. Replays and repeat plays of the same day change nothing.
pub fn advance_streak(stats: StreakStats, date: NaiveDate, replay: bool) -> StreakStats {
    if replay {
        return stats;
    }
    let current_streak = match stats.last_played {
        Some(last) if last >= date => return stats,
        Some(last) if last.succ_opt() == Some(date) => stats.current_streak + 1,
        _ => 1,
    };
    StreakStats {
        current_streak,
        longest_streak: stats.longest_streak.max(current_streak),
        last_played: Some(date),
    }
}

impl PersistencePort for FsPersistence {
    fn record_session(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock();

        let mut scores = self.load_scores()?;
        scores.push(record.clone());
        write_json(&self.scores_path(), &scores).map_err(persistence_error)?;

        let mut streaks = self.load_streaks()?;
        let current = streaks.get(&record.user_id).copied().unwrap_or_default();
        let next = advance_streak(current, record.date, record.replay);
        streaks.insert(record.user_id.clone(), next);
        write_json(&self.streaks_path(), &streaks).map_err(persistence_error)?;

        log::info!(
            target: "storage",
            "recorded {} for {}: score {}, streak {}",
            record.date,
            record.user_id,
            record.score,
            next.current_streak
        );
        Ok(())
    }

    fn fetch_history(&self, user_id: &str) -> Result<Vec<SessionRecord>, PersistenceError> {
        let mut history: Vec<SessionRecord> = self
            .load_scores()?
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect();
        history.sort_by_key(|record| record.date);
        Ok(history)
    }

    fn fetch_streak(&self, user_id: &str) -> Result<StreakStats, PersistenceError> {
        Ok(self
            .load_streaks()?
            .get(user_id)
            .copied()
            .unwrap_or_default())
    }
}
