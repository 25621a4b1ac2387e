use crate::hint::{Hint, HintLevel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tunle_domain_melody::Bar;
use tunle_ports::melody::BAR_COUNT;

pub const HEARTS_PER_BAR: u8 = 4;

#[derive(Clone, Copy, Debug)]
pub struct MatchTimings {
    /// How long wrong-note feedback blocks further penalties.
    pub feedback_window: Duration,
    /// Gap between the two wrong cues of a failed bar.
    pub failure_cue_delay: Duration,
    /// Time after the second wrong cue before a failed bar advances.
    pub failed_advance_delay: Duration,
    /// Pacing before the summary is revealed.
    pub session_end_delay: Duration,
}

impl Default for MatchTimings {
    fn default() -> Self {
        Self {
            feedback_window: Duration::from_millis(1000),
            failure_cue_delay: Duration::from_millis(500),
            failed_advance_delay: Duration::from_millis(3000),
            session_end_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Initial,
    Ready,
    Practice,
    Perform,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    Wrong,
    BarComplete,
    Success,
    Start,
}

impl Cue {
    pub const ALL: [Cue; 4] = [Cue::Wrong, Cue::BarComplete, Cue::Success, Cue::Start];

    /// Buffer key the cue is cached under.
    pub fn key(self) -> &'static str {
        match self {
            Cue::Wrong => "wrong",
            Cue::BarComplete => "complete",
            Cue::Success => "success",
            Cue::Start => "start",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarOutcome {
    Completed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    AudioReady,
    StartPractice,
    PracticePlaybackFinished,
    StartPerform,
    NoteInput { note: u8 },
    ClearBarFailing,
    RepeatFailureCue { bar: usize },
    AdvanceFailedBar { bar: usize },
    ResetHintLevel,
    RevealSummary,
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    PlayCue(Cue),
    PlayBarRecording { bar: usize },
    LoadBar { bar: usize },
    /// Re-dispatch `action` after `delay`, unless the session was reset meanwhile.
    Schedule { delay: Duration, action: Action },
    BarResolved { bar: usize, outcome: BarOutcome },
    SessionEnded(SessionSummary),
    PlayFullTune,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub score: u32,
    pub bar_hearts: [u8; BAR_COUNT],
    pub completed_bars: [bool; BAR_COUNT],
    pub failed_bars: [bool; BAR_COUNT],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_note_index: usize,
    pub game_phase: GamePhase,
    pub bar_hearts: [u8; BAR_COUNT],
    pub completed_bars: [bool; BAR_COUNT],
    pub failed_bars: [bool; BAR_COUNT],
    pub is_bar_failing: bool,
    pub hint_level: HintLevel,
    pub current_bar_index: usize,
    pub score: u32,
    pub first_note_hint_armed: bool,
    pub session_complete: bool,
    pub summary_revealed: bool,
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_note_index: 0,
            game_phase: GamePhase::Initial,
            bar_hearts: [HEARTS_PER_BAR; BAR_COUNT],
            completed_bars: [false; BAR_COUNT],
            failed_bars: [false; BAR_COUNT],
            is_bar_failing: false,
            hint_level: HintLevel::None,
            current_bar_index: 0,
            score: 0,
            first_note_hint_armed: false,
            session_complete: false,
            summary_revealed: false,
        }
    }
}

impl SessionState {
    /// Applies one action. `None` means the action was out of phase and nothing changed.
    pub fn reduce(
        &self,
        bars: &[Bar; BAR_COUNT],
        timings: &MatchTimings,
        action: Action,
    ) -> Option<Transition> {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match action {
            Action::AudioReady => {
                if self.game_phase != GamePhase::Initial || self.session_complete {
                    return None;
                }
                next.game_phase = GamePhase::Ready;
            }
            Action::StartPractice => {
                if !self.can_rehearse()
                    || !matches!(
                        self.game_phase,
                        GamePhase::Ready | GamePhase::Practice | GamePhase::Perform
                    )
                {
                    return None;
                }
                next.game_phase = GamePhase::Practice;
                next.first_note_hint_armed = false;
                effects.push(Effect::PlayBarRecording {
                    bar: self.current_bar_index,
                });
            }
            Action::PracticePlaybackFinished => {
                if self.game_phase != GamePhase::Practice {
                    return None;
                }
                next.first_note_hint_armed = true;
            }
            Action::StartPerform => {
                if !self.can_rehearse()
                    || !matches!(self.game_phase, GamePhase::Ready | GamePhase::Practice)
                {
                    return None;
                }
                next.game_phase = GamePhase::Perform;
                next.current_note_index = 0;
                effects.push(Effect::PlayCue(Cue::Start));
            }
            Action::NoteInput { note } => {
                if self.game_phase != GamePhase::Perform || self.failed_bars[self.current_bar_index]
                {
                    return None;
                }
                let bar = &bars[self.current_bar_index];
                let expected = bar.note_at(self.current_note_index)?;
                if expected.matches(note) {
                    next.current_note_index += 1;
                    if next.current_note_index >= bar.len() {
                        effects.push(Effect::PlayCue(Cue::BarComplete));
                        next.score += u32::from(next.bar_hearts[next.current_bar_index]);
                        next.advance_bar(BarOutcome::Completed, timings, &mut effects);
                    }
                } else {
                    if self.is_bar_failing {
                        return None;
                    }
                    next.register_mistake(timings, &mut effects);
                }
            }
            Action::ClearBarFailing => {
                if !self.is_bar_failing {
                    return None;
                }
                next.is_bar_failing = false;
            }
            Action::RepeatFailureCue { bar } => {
                if bar != self.current_bar_index || !self.failed_bars[bar] || self.session_complete
                {
                    return None;
                }
                effects.push(Effect::PlayCue(Cue::Wrong));
            }
            Action::AdvanceFailedBar { bar } => {
                if bar != self.current_bar_index
                    || !self.failed_bars[bar]
                    || self.game_phase == GamePhase::Ended
                {
                    return None;
                }
                next.advance_bar(BarOutcome::Failed, timings, &mut effects);
            }
            Action::ResetHintLevel => {
                next.hint_level = HintLevel::None;
            }
            Action::RevealSummary => {
                if !self.session_complete || self.summary_revealed {
                    return None;
                }
                next.summary_revealed = true;
                effects.push(Effect::PlayFullTune);
            }
            Action::Reset => {
                next = SessionState::default();
            }
        }

        Some(Transition {
            state: next,
            effects,
        })
    }

    /// The note currently revealed to the player, if any.
    pub fn visible_hint(&self, bars: &[Bar; BAR_COUNT]) -> Option<Hint> {
        if !matches!(self.game_phase, GamePhase::Practice | GamePhase::Perform) {
            return None;
        }
        let bar = bars.get(self.current_bar_index)?;
        let position = self.current_note_index;
        let expected = bar.note_at(position)?;

        let first_note = self.first_note_hint_armed && position == 0;
        let escalated = self.game_phase == GamePhase::Perform
            && match self.hint_level {
                HintLevel::None => false,
                HintLevel::FirstTwo => position < 2,
                HintLevel::Full => true,
            };

        (first_note || escalated).then_some(Hint {
            position,
            note: expected.note,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        let mut bar_hearts = self.bar_hearts;
        for (hearts, failed) in bar_hearts.iter_mut().zip(self.failed_bars) {
            if failed {
                *hearts = 0;
            }
        }
        SessionSummary {
            score: self.score,
            bar_hearts,
            completed_bars: self.completed_bars,
            failed_bars: self.failed_bars,
        }
    }

    /// Practice and perform stay open during the feedback window; only a failed bar is closed.
    fn can_rehearse(&self) -> bool {
        !self.session_complete && !self.failed_bars[self.current_bar_index]
    }

    fn register_mistake(&mut self, timings: &MatchTimings, effects: &mut Vec<Effect>) {
        let bar = self.current_bar_index;
        effects.push(Effect::PlayCue(Cue::Wrong));
        self.is_bar_failing = true;
        self.current_note_index = 0;
        self.bar_hearts[bar] = self.bar_hearts[bar].saturating_sub(1);
        self.hint_level = self.hint_level.escalate(self.bar_hearts[bar]);

        if self.bar_hearts[bar] == 0 {
            self.failed_bars[bar] = true;
            effects.push(Effect::Schedule {
                delay: timings.failure_cue_delay,
                action: Action::RepeatFailureCue { bar },
            });
            effects.push(Effect::Schedule {
                delay: timings.failure_cue_delay + timings.feedback_window,
                action: Action::ClearBarFailing,
            });
            effects.push(Effect::Schedule {
                delay: timings.failure_cue_delay + timings.failed_advance_delay,
                action: Action::AdvanceFailedBar { bar },
            });
        } else {
            effects.push(Effect::Schedule {
                delay: timings.feedback_window,
                action: Action::ClearBarFailing,
            });
        }
    }

    fn advance_bar(
        &mut self,
        outcome: BarOutcome,
        timings: &MatchTimings,
        effects: &mut Vec<Effect>,
    ) {
        let bar = self.current_bar_index;
        match outcome {
            BarOutcome::Completed => {
                self.completed_bars[bar] = true;
                effects.push(Effect::PlayCue(Cue::Success));
            }
            BarOutcome::Failed => {
                self.failed_bars[bar] = true;
            }
        }
        effects.push(Effect::BarResolved { bar, outcome });

        self.current_note_index = 0;
        self.is_bar_failing = false;
        self.first_note_hint_armed = false;
        self.hint_level = HintLevel::None;

        if bar + 1 < BAR_COUNT {
            self.current_bar_index = bar + 1;
            self.game_phase = GamePhase::Initial;
            effects.push(Effect::LoadBar { bar: bar + 1 });
        } else {
            self.game_phase = GamePhase::Ended;
            self.session_complete = true;
            effects.push(Effect::SessionEnded(self.summary()));
            effects.push(Effect::Schedule {
                delay: timings.session_end_delay,
                action: Action::RevealSummary,
            });
        }
    }
}

/// Holds the bars of one melody and the state they are judged against.
pub struct SequenceMatcher {
    timings: MatchTimings,
    bars: [Bar; BAR_COUNT],
    state: SessionState,
}

impl SequenceMatcher {
    pub fn new(bars: [Bar; BAR_COUNT], timings: MatchTimings) -> Self {
        Self {
            timings,
            bars,
            state: SessionState::default(),
        }
    }

    /// Applies `action`; `None` when it was ignored as out of phase.
    pub fn dispatch(&mut self, action: Action) -> Option<Vec<Effect>> {
        let transition = self.state.reduce(&self.bars, &self.timings, action)?;
        self.state = transition.state;
        Some(transition.effects)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn bars(&self) -> &[Bar; BAR_COUNT] {
        &self.bars
    }

    pub fn timings(&self) -> &MatchTimings {
        &self.timings
    }

    pub fn visible_hint(&self) -> Option<Hint> {
        self.state.visible_hint(&self.bars)
    }
}
