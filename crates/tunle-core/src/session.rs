use crate::catalog::SoundCatalog;
use crate::ipc::{Event, LoadState, SessionSnapshot};
use crate::lifecycle::LifecycleManager;
use crate::sound_cache::{CompletionCallback, LoadError, SoundCache};
use crate::stopwatch::Stopwatch;
use crate::timers::TimerQueue;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tunle_domain_eval::{Action, Effect, Hint, MatchTimings, SequenceMatcher, SessionSummary};
use tunle_domain_melody::{bundled_melody, melody_from_assets, Melody};
use tunle_ports::clock::ClockPort;
use tunle_ports::melody::MelodyResolverPort;
use tunle_ports::persistence::{PersistencePort, SessionRecord};
use tunle_ports::types::{
    instrument_key, melody_bar_key, melody_full_key, PlatformEvent, Visibility,
    INSTRUMENT_NOTE_COUNT,
};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("sound load failed: {0}")]
    Load(#[from] LoadError),
    #[error("melody has no url for bar {0}")]
    MissingBar(usize),
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub timings: MatchTimings,
    /// Sessions are persisted only for a signed-in user.
    pub user_id: Option<String>,
    pub catalog: SoundCatalog,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timings: MatchTimings::default(),
            user_id: None,
            catalog: SoundCatalog::default(),
        }
    }
}

pub struct SessionPorts {
    pub cache: Arc<SoundCache>,
    pub resolver: Arc<dyn MelodyResolverPort>,
    pub persistence: Option<Arc<dyn PersistencePort>>,
    pub clock: Arc<dyn ClockPort>,
}

/// Notice sent from a completion callback back into the session, tagged with its epoch.
type Notice = (u64, Action);

/// One day's game: owns the matcher and turns its effects into audio, timers and records.
pub struct GameSession {
    cache: Arc<SoundCache>,
    resolver: Arc<dyn MelodyResolverPort>,
    persistence: Option<Arc<dyn PersistencePort>>,
    clock: Arc<dyn ClockPort>,
    config: SessionConfig,
    lifecycle: LifecycleManager,
    melody: Melody,
    matcher: SequenceMatcher,
    date: Option<NaiveDate>,
    replay: bool,
    load_state: LoadState,
    timers: TimerQueue<Action>,
    stopwatch: Stopwatch,
    visibility: Visibility,
    notice_tx: Sender<Notice>,
    notice_rx: Receiver<Notice>,
    last_hint: Option<Hint>,
    events: VecDeque<Event>,
}

impl GameSession {
    pub fn new(ports: SessionPorts, config: SessionConfig) -> Self {
        let melody = bundled_melody();
        let matcher = SequenceMatcher::new(melody.bars.clone(), config.timings);
        let (notice_tx, notice_rx) = mpsc::channel();
        Self {
            lifecycle: LifecycleManager::new(ports.cache.clone()),
            cache: ports.cache,
            resolver: ports.resolver,
            persistence: ports.persistence,
            clock: ports.clock,
            config,
            melody,
            matcher,
            date: None,
            replay: false,
            load_state: LoadState::Idle,
            timers: TimerQueue::new(),
            stopwatch: Stopwatch::new(),
            visibility: Visibility::Visible,
            notice_tx,
            notice_rx,
            last_hint: None,
            events: VecDeque::new(),
        }
    }

    /// Starts the session for `date`, or today when `None`. Any running session is discarded.
    pub fn start(&mut self, date: Option<NaiveDate>) {
        self.timers.bump_epoch();
        self.cache.stop_all_sounds();
        self.lifecycle.subscribe();

        let today = self.clock.today();
        let date = date.unwrap_or(today);
        self.replay = date != today;
        self.date = Some(date);

        self.melody = self.resolve_melody(date);
        self.matcher = SequenceMatcher::new(self.melody.bars.clone(), self.config.timings);
        self.stopwatch = Stopwatch::new();
        self.last_hint = None;
        log::info!(
            target: "session",
            "starting {} (melody {}, replay: {})",
            date,
            self.melody.session_tag,
            self.replay
        );

        self.load_state = LoadState::Loading;
        self.emit_state();
        self.preload();
    }

    /// Restarts the current date from scratch.
    pub fn reset(&mut self) {
        self.start(self.date);
    }

    pub fn retry_load(&mut self) {
        if !matches!(self.load_state, LoadState::Failed { .. }) {
            log::debug!(target: "session", "retry ignored in {:?}", self.load_state);
            return;
        }
        let bar = self.matcher.state().current_bar_index;
        self.load_state = LoadState::Loading;
        self.emit_state();
        if bar == 0 {
            self.preload();
        } else {
            self.load_pending_bar(bar);
        }
    }

    pub fn listen_and_practice(&mut self) {
        self.ensure_instruments();
        self.dispatch(Action::StartPractice);
    }

    pub fn perform(&mut self) {
        self.ensure_instruments();
        self.dispatch(Action::StartPerform);
    }

    pub fn press_note(&mut self, note: u8) {
        if !(1..=INSTRUMENT_NOTE_COUNT).contains(&note) {
            log::debug!(target: "session", "note {} out of range", note);
            return;
        }
        self.cache.play_sound(&instrument_key(note), 0.0, None);
        self.dispatch(Action::NoteInput { note });
    }

    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        let Some(visibility) = self.lifecycle.handle_event(event) else {
            return;
        };
        let now = self.clock.now();
        self.visibility = visibility;
        match visibility {
            Visibility::Hidden => self.stopwatch.pause(now),
            Visibility::Visible => self.stopwatch.resume(now),
        }
    }

    pub fn tick(&mut self) {
        self.cache.poll_completions();

        let epoch = self.timers.epoch();
        let notices: Vec<Action> = self
            .notice_rx
            .try_iter()
            .filter(|(tag, _)| *tag == epoch)
            .map(|(_, action)| action)
            .collect();
        for action in notices {
            self.dispatch(action);
        }

        let now = self.clock.now();
        for action in self.timers.drain_due(now) {
            self.dispatch(action);
        }
    }

    /// Stops audio and detaches from the page. Outstanding timers and callbacks become stale.
    pub fn dispose(&mut self) {
        self.timers.bump_epoch();
        self.cache.stop_all_sounds();
        self.lifecycle.unsubscribe();
        self.stopwatch.pause(self.clock.now());
        log::debug!(target: "session", "disposed");
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.matcher.state().clone(),
            hint: self.matcher.visible_hint(),
            load_state: self.load_state.clone(),
            melody_tag: self.melody.session_tag.clone(),
            bundled: self.melody.is_bundled(),
            date: self.date,
            replay: self.replay,
        }
    }

    pub fn matcher(&self) -> &SequenceMatcher {
        &self.matcher
    }

    pub fn melody(&self) -> &Melody {
        &self.melody
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed(self.clock.now())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    fn resolve_melody(&mut self, date: NaiveDate) -> Melody {
        let resolved = self
            .resolver
            .resolve(date)
            .map_err(|err| err.to_string())
            .and_then(|assets| melody_from_assets(assets).map_err(|err| err.to_string()));

        match resolved {
            Ok(melody) => melody,
            Err(reason) => {
                log::warn!(target: "session", "melody for {} unavailable: {}", date, reason);
                self.events.push_back(Event::FallbackMelodyUsed { reason });
                bundled_melody()
            }
        }
    }

    fn preload(&mut self) {
        if let Err(err) = self.cache.initialize() {
            log::warn!(target: "session", "audio init deferred: {}", err);
        }

        if let Err(err) = self.load_shared_sounds() {
            self.fail_load(err);
            return;
        }

        if let Err(err) = self.load_bar(0) {
            if self.melody.is_bundled() {
                self.fail_load(err);
                return;
            }
            log::warn!(target: "session", "primary melody clip failed, using bundled: {}", err);
            self.events.push_back(Event::FallbackMelodyUsed {
                reason: err.to_string(),
            });
            self.melody = bundled_melody();
            self.matcher = SequenceMatcher::new(self.melody.bars.clone(), self.config.timings);
            if let Err(err) = self.load_bar(0) {
                self.fail_load(err);
                return;
            }
        }

        self.bar_audio_ready();
    }

    fn load_shared_sounds(&self) -> Result<(), SessionError> {
        for (key, url) in self.config.catalog.shared_sounds() {
            if !self.cache.has_sound(&key) {
                self.cache.load_sound(&url, &key, None)?;
            }
        }
        Ok(())
    }

    fn load_bar(&self, bar: usize) -> Result<(), SessionError> {
        let url = self.melody.bar_url(bar).ok_or(SessionError::MissingBar(bar))?;
        self.cache
            .load_sound(url, &melody_bar_key(bar), Some(&self.melody.session_tag))?;
        Ok(())
    }

    fn load_pending_bar(&mut self, bar: usize) {
        self.load_state = LoadState::Loading;
        match self.load_bar(bar) {
            Ok(()) => self.bar_audio_ready(),
            Err(err) => self.fail_load(err),
        }
    }

    fn bar_audio_ready(&mut self) {
        self.load_state = LoadState::Ready;
        if self.matcher.state().current_bar_index == 0 {
            self.stopwatch
                .start(self.clock.now(), self.visibility == Visibility::Visible);
        }
        self.dispatch(Action::AudioReady);
        self.emit_state();
    }

    fn fail_load(&mut self, err: SessionError) {
        log::error!(target: "session", "could not load session audio: {}", err);
        let reason = err.to_string();
        self.load_state = LoadState::Failed {
            reason: reason.clone(),
        };
        self.events.push_back(Event::AudioLoadFailed { reason });
        self.emit_state();
    }

    fn ensure_instruments(&self) {
        if self.cache.verify_buffers() {
            return;
        }
        log::warn!(target: "session", "instrument buffers missing, reloading");
        if let Err(err) = self.cache.reload_instruments() {
            log::warn!(target: "session", "instrument reload failed: {}", err);
        }
    }

    fn dispatch(&mut self, action: Action) {
        let phase = self.matcher.state().game_phase;
        match self.matcher.dispatch(action) {
            Some(effects) => {
                for effect in effects {
                    self.apply(effect);
                }
                self.emit_state();
            }
            None => log::debug!(target: "session", "ignored {:?} in {:?}", action, phase),
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::PlayCue(cue) => {
                self.cache.play_sound(cue.key(), 0.0, None);
            }
            Effect::PlayBarRecording { bar } => {
                let epoch = self.timers.epoch();
                let tx = self.notice_tx.clone();
                let on_complete: CompletionCallback = Box::new(move || {
                    let _ = tx.send((epoch, Action::PracticePlaybackFinished));
                });
                if self
                    .cache
                    .play_sound(&melody_bar_key(bar), 0.0, Some(on_complete))
                    .is_none()
                {
                    log::debug!(target: "session", "practice playback for bar {} unavailable", bar);
                }
            }
            Effect::LoadBar { bar } => self.load_pending_bar(bar),
            Effect::Schedule { delay, action } => {
                self.timers.schedule(self.clock.now(), delay, action);
            }
            Effect::BarResolved { bar, outcome } => {
                log::info!(target: "session", "bar {} {:?}", bar + 1, outcome);
                self.events.push_back(Event::BarResolved {
                    bar,
                    outcome,
                    score: self.matcher.state().score,
                });
            }
            Effect::SessionEnded(summary) => self.finish(summary),
            Effect::PlayFullTune => {
                self.play_full_tune();
                self.events.push_back(Event::SummaryRevealed {
                    summary: self.matcher.state().summary(),
                });
            }
        }
    }

    fn finish(&mut self, summary: SessionSummary) {
        let completion_secs = self.stopwatch.stop(self.clock.now()).as_secs_f64();
        log::info!(
            target: "session",
            "session finished: score {} in {:.1}s",
            summary.score,
            completion_secs
        );
        self.events.push_back(Event::SessionFinished {
            summary,
            completion_secs,
        });
        self.record(summary, completion_secs);
    }

    fn record(&self, summary: SessionSummary, completion_secs: f64) {
        let (Some(persistence), Some(user_id), Some(date)) =
            (self.persistence.as_ref(), self.config.user_id.as_ref(), self.date)
        else {
            log::debug!(target: "session", "no signed-in user, session not recorded");
            return;
        };

        let record = SessionRecord {
            user_id: user_id.clone(),
            date,
            bar_hearts: summary.bar_hearts,
            score: summary.score,
            completion_time_secs: completion_secs,
            replay: self.replay,
        };
        if let Err(err) = persistence.record_session(&record) {
            log::warn!(target: "session", "recording session failed: {}", err);
        }
    }

    fn play_full_tune(&self) {
        let key = melody_full_key();
        if !self.cache.has_sound(&key) {
            if let Err(err) = self.cache.load_sound(
                &self.melody.full_tune_url,
                &key,
                Some(&self.melody.session_tag),
            ) {
                log::warn!(target: "session", "full tune unavailable: {}", err);
                return;
            }
        }
        self.cache.play_sound(&key, 0.0, None);
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        if snapshot.hint != self.last_hint {
            self.last_hint = snapshot.hint;
            self.events.push_back(Event::HintUpdated { hint: snapshot.hint });
        }
        self.events.push_back(Event::SessionStateUpdated { snapshot });
    }
}
