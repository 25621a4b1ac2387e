use crate::catalog::SoundCatalog;
use crate::diagnostics::{export_diagnostics, DiagnosticsInput};
use crate::ipc::{Command, Event};
use crate::session::{GameSession, SessionConfig, SessionPorts};
use crate::sound_cache::{CacheError, SoundCache};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tunle_domain_eval::MatchTimings;
use tunle_ports::assets::{AssetFetchPort, SoundDecoderPort};
use tunle_ports::audio::{AudioBackendPort, AudioError};
use tunle_ports::clock::ClockPort;
use tunle_ports::melody::MelodyResolverPort;
use tunle_ports::persistence::{PersistenceError, PersistencePort};
use tunle_ports::storage::{SettingsDto, StorageError, StoragePort};

const RECENT_NOTES: usize = 32;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("audio cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("history needs a signed-in user")]
    NotSignedIn,
}

/// Adapters the composition root hands to the core.
pub struct AppPorts {
    pub backend: Arc<dyn AudioBackendPort>,
    pub fetcher: Arc<dyn AssetFetchPort>,
    pub decoder: Arc<dyn SoundDecoderPort>,
    pub resolver: Arc<dyn MelodyResolverPort>,
    pub persistence: Option<Arc<dyn PersistencePort>>,
    pub storage: Option<Box<dyn StoragePort>>,
    pub clock: Arc<dyn ClockPort>,
}

pub struct AppCore {
    backend: Arc<dyn AudioBackendPort>,
    cache: Arc<SoundCache>,
    persistence: Option<Arc<dyn PersistencePort>>,
    storage: Option<Box<dyn StoragePort>>,
    /// What was loaded from storage; the only settings ever written back.
    stored_settings: SettingsDto,
    /// `stored_settings` with launch overrides applied.
    settings: SettingsDto,
    session: GameSession,
    events: VecDeque<Event>,
    recent_notes: VecDeque<u8>,
}

impl AppCore {
    pub fn new(ports: AppPorts) -> Self {
        Self::with_overrides(ports, |_| {})
    }

    /// Like `new`, with `overrides` applied to the loaded settings for this run only.
    pub fn with_overrides(ports: AppPorts, overrides: impl FnOnce(&mut SettingsDto)) -> Self {
        let stored_settings = match ports.storage.as_ref() {
            Some(storage) => storage.load_settings().unwrap_or_else(|err| {
                log::warn!(target: "storage", "settings unreadable, using defaults: {}", err);
                SettingsDto::default()
            }),
            None => SettingsDto::default(),
        };
        let mut settings = stored_settings.clone();
        overrides(&mut settings);

        let cache = Arc::new(SoundCache::new(
            ports.backend.clone(),
            ports.fetcher,
            ports.decoder,
        ));
        cache.set_master_volume(settings.master_volume);

        let session = GameSession::new(
            SessionPorts {
                cache: cache.clone(),
                resolver: ports.resolver,
                persistence: ports.persistence.clone(),
                clock: ports.clock,
            },
            session_config(&settings),
        );

        Self {
            backend: ports.backend,
            cache,
            persistence: ports.persistence,
            storage: ports.storage,
            stored_settings,
            settings,
            session,
            events: VecDeque::new(),
            recent_notes: VecDeque::with_capacity(RECENT_NOTES),
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::StartSession { date } => self.session.start(date),
            Command::ListenAndPractice => self.session.listen_and_practice(),
            Command::Perform => self.session.perform(),
            Command::PressNote { note } => {
                self.record_recent_note(note);
                self.session.press_note(note);
            }
            Command::Platform { event } => self.session.handle_platform_event(event),
            Command::RetryLoad => self.session.retry_load(),
            Command::ResetSession => self.session.reset(),
            Command::DisposeSession => self.session.dispose(),
            Command::SetMasterVolume { volume } => {
                self.settings.master_volume = volume;
                self.stored_settings.master_volume = volume;
                self.cache.set_master_volume(volume);
                self.save_settings();
            }
            Command::FetchHistory => {
                let (persistence, user_id) = self.signed_in()?;
                let records = persistence.fetch_history(&user_id)?;
                self.events.push_back(Event::HistoryLoaded { records });
            }
            Command::FetchStreak => {
                let (persistence, user_id) = self.signed_in()?;
                let streak = persistence.fetch_streak(&user_id)?;
                self.events.push_back(Event::StreakLoaded { streak });
            }
            Command::ExportDiagnostics { path } => {
                let audio_outputs = self.backend.list_outputs()?;
                export_diagnostics(
                    Path::new(&path),
                    DiagnosticsInput {
                        settings: &self.settings,
                        audio_outputs,
                        cache: self.cache.snapshot(),
                        session: self.session.snapshot(),
                        recent_notes: self.recent_notes.iter().copied().collect(),
                    },
                )?;
            }
        }
        self.collect_session_events();
        Ok(())
    }

    pub fn tick(&mut self) {
        self.session.tick();
        self.collect_session_events();
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn cache(&self) -> &Arc<SoundCache> {
        &self.cache
    }

    /// Tears the session down and closes the audio context.
    pub fn shutdown(&mut self) {
        self.session.dispose();
        self.cache.dispose();
        self.collect_session_events();
    }

    fn signed_in(&self) -> Result<(Arc<dyn PersistencePort>, String), AppError> {
        match (self.persistence.as_ref(), self.settings.user_id.as_ref()) {
            (Some(persistence), Some(user_id)) => Ok((persistence.clone(), user_id.clone())),
            _ => Err(AppError::NotSignedIn),
        }
    }

    fn collect_session_events(&mut self) {
        self.events.extend(self.session.drain_events());
    }

    fn record_recent_note(&mut self, note: u8) {
        if self.recent_notes.len() == RECENT_NOTES {
            self.recent_notes.pop_front();
        }
        self.recent_notes.push_back(note);
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(err) = storage.save_settings(&self.stored_settings) {
                log::warn!(target: "storage", "saving settings failed: {}", err);
            }
        }
    }
}

pub fn match_timings(settings: &SettingsDto) -> MatchTimings {
    MatchTimings {
        feedback_window: Duration::from_millis(settings.feedback_window_ms),
        failure_cue_delay: Duration::from_millis(settings.failure_cue_delay_ms),
        failed_advance_delay: Duration::from_millis(settings.failed_advance_delay_ms),
        session_end_delay: Duration::from_millis(settings.session_end_delay_ms),
    }
}

fn session_config(settings: &SettingsDto) -> SessionConfig {
    SessionConfig {
        timings: match_timings(settings),
        user_id: settings.user_id.clone(),
        catalog: SoundCatalog::default(),
    }
}
