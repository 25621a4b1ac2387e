use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tunle_domain_eval::{BarOutcome, Hint, SessionState, SessionSummary};
use tunle_ports::persistence::{SessionRecord, StreakStats};
use tunle_ports::types::{PlatformEvent, Volume01};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    /// `None` plays today's melody; any other date is a replay.
    StartSession { date: Option<NaiveDate> },
    ListenAndPractice,
    Perform,
    PressNote { note: u8 },
    Platform { event: PlatformEvent },
    RetryLoad,
    ResetSession,
    DisposeSession,
    SetMasterVolume { volume: Volume01 },
    FetchHistory,
    FetchStreak,
    ExportDiagnostics { path: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub hint: Option<Hint>,
    pub load_state: LoadState,
    pub melody_tag: String,
    pub bundled: bool,
    pub date: Option<NaiveDate>,
    pub replay: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    SessionStateUpdated { snapshot: SessionSnapshot },
    HintUpdated { hint: Option<Hint> },
    BarResolved { bar: usize, outcome: BarOutcome, score: u32 },
    FallbackMelodyUsed { reason: String },
    AudioLoadFailed { reason: String },
    SessionFinished { summary: SessionSummary, completion_secs: f64 },
    SummaryRevealed { summary: SessionSummary },
    HistoryLoaded { records: Vec<SessionRecord> },
    StreakLoaded { streak: StreakStats },
}
