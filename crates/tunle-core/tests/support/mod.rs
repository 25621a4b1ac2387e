#![allow(dead_code)]

use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tunle_core::{SoundCache, SoundCatalog};
use tunle_ports::assets::{AssetFetchPort, DecodeError, FetchError, SoundDecoderPort};
use tunle_ports::audio::{AudioBackendPort, AudioContextPort, AudioError, ContextState, VoiceId};
use tunle_ports::clock::ClockPort;
use tunle_ports::melody::{MelodyAssets, MelodyResolverPort, NoteDto, ResolveError};
use tunle_ports::persistence::{PersistenceError, PersistencePort, SessionRecord, StreakStats};
use tunle_ports::storage::{SettingsDto, StorageError, StoragePort};
use tunle_ports::types::{AudioConfig, AudioOutputDevice, DecodedBuffer, DeviceId, Volume01};

pub struct StartedVoice {
    pub voice: VoiceId,
    pub frames: usize,
    pub at_secs: f64,
}

pub struct FakeAudioState {
    pub contexts_created: usize,
    pub state: ContextState,
    pub time_secs: f64,
    pub next_voice: u64,
    pub started: Vec<StartedVoice>,
    pub sounding: Vec<VoiceId>,
    pub stopped: Vec<VoiceId>,
    pub finished: Vec<VoiceId>,
    pub volume: f32,
}

/// Audio backend whose voices only finish when a test says so.
pub struct FakeBackend {
    pub audio: Arc<Mutex<FakeAudioState>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            audio: Arc::new(Mutex::new(FakeAudioState {
                contexts_created: 0,
                state: ContextState::Closed,
                time_secs: 0.0,
                next_voice: 1,
                started: Vec::new(),
                sounding: Vec::new(),
                stopped: Vec::new(),
                finished: Vec::new(),
                volume: 1.0,
            })),
        })
    }

    pub fn contexts_created(&self) -> usize {
        self.audio.lock().contexts_created
    }

    pub fn state(&self) -> ContextState {
        self.audio.lock().state
    }

    pub fn started(&self) -> usize {
        self.audio.lock().started.len()
    }

    pub fn last_started_frames(&self) -> Option<usize> {
        self.audio.lock().started.last().map(|voice| voice.frames)
    }

    pub fn sounding(&self) -> Vec<VoiceId> {
        self.audio.lock().sounding.clone()
    }

    /// Plays every sounding voice to its end.
    pub fn finish_all(&self) {
        let mut audio = self.audio.lock();
        let done: Vec<VoiceId> = audio.sounding.drain(..).collect();
        audio.finished.extend(done);
    }

    /// Reports `voice` as finished even if it was stopped, like a racy backend would.
    pub fn report_finished(&self, voice: VoiceId) {
        self.audio.lock().finished.push(voice);
    }
}

impl AudioBackendPort for FakeBackend {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        Ok(vec![AudioOutputDevice {
            id: DeviceId("fake".to_string()),
            name: "Fake Output".to_string(),
            default_config: AudioConfig::default(),
        }])
    }

    fn create_context(&self) -> Result<Box<dyn AudioContextPort>, AudioError> {
        std::thread::sleep(Duration::from_millis(5));
        let mut audio = self.audio.lock();
        audio.contexts_created += 1;
        audio.state = ContextState::Suspended;
        Ok(Box::new(FakeContext {
            audio: self.audio.clone(),
        }))
    }
}

struct FakeContext {
    audio: Arc<Mutex<FakeAudioState>>,
}

impl AudioContextPort for FakeContext {
    fn state(&self) -> ContextState {
        self.audio.lock().state
    }

    fn sample_rate_hz(&self) -> u32 {
        48_000
    }

    fn current_time(&self) -> f64 {
        self.audio.lock().time_secs
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let mut audio = self.audio.lock();
        if audio.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        audio.state = ContextState::Running;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        let mut audio = self.audio.lock();
        if audio.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        audio.state = ContextState::Suspended;
        Ok(())
    }

    fn close(&mut self) {
        let mut audio = self.audio.lock();
        audio.state = ContextState::Closed;
        audio.sounding.clear();
    }

    fn start_voice(
        &mut self,
        buffer: Arc<DecodedBuffer>,
        at_secs: f64,
    ) -> Result<VoiceId, AudioError> {
        let mut audio = self.audio.lock();
        if audio.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        let voice = VoiceId(audio.next_voice);
        audio.next_voice += 1;
        audio.started.push(StartedVoice {
            voice,
            frames: buffer.frames(),
            at_secs,
        });
        audio.sounding.push(voice);
        Ok(voice)
    }

    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), AudioError> {
        let mut audio = self.audio.lock();
        audio.sounding.retain(|v| *v != voice);
        audio.stopped.push(voice);
        Ok(())
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        self.audio.lock().finished.drain(..).collect()
    }

    fn set_master_volume(&mut self, volume: Volume01) {
        self.audio.lock().volume = volume.get();
    }
}

/// Serves byte blobs by url; the blob length becomes the decoded frame count.
#[derive(Default)]
pub struct MemoryFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, url: &str, frames: usize) {
        self.files.lock().insert(url.to_string(), vec![1; frames]);
    }

    pub fn remove(&self, url: &str) {
        self.files.lock().remove(url);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn insert_shared_sounds(&self) {
        for (_, url) in SoundCatalog::default().shared_sounds() {
            self.insert(&url, 4);
        }
    }

    pub fn insert_bundled(&self) {
        for n in 1..=4 {
            self.insert(&format!("bundled/bar{n}.wav"), 8);
        }
        self.insert("bundled/full.wav", 16);
    }
}

impl AssetFetchPort for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().push(url.to_string());
        self.files
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

pub struct LengthDecoder;

impl SoundDecoderPort for LengthDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(DecodedBuffer {
            sample_rate_hz: 48_000,
            left: vec![0.0; bytes.len()],
            right: vec![0.0; bytes.len()],
        })
    }
}

#[derive(Default)]
pub struct FakeResolver {
    melodies: Mutex<HashMap<NaiveDate, MelodyAssets>>,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, assets: MelodyAssets) {
        if let Some(date) = assets.date {
            self.melodies.lock().insert(date, assets);
        }
    }
}

impl MelodyResolverPort for FakeResolver {
    fn resolve(&self, date: NaiveDate) -> Result<MelodyAssets, ResolveError> {
        self.melodies
            .lock()
            .get(&date)
            .cloned()
            .ok_or(ResolveError::NotFound(date))
    }
}

/// Published assets for `date` with the given bars; urls live under the date folder.
pub fn melody_assets(date: NaiveDate, bars: [&[u8]; 4]) -> MelodyAssets {
    let tag = date.to_string();
    let notes = |bar: &[u8]| -> Vec<NoteDto> {
        bar.iter()
            .map(|&note| NoteDto {
                note,
                left_quaver: false,
                right_quaver: false,
            })
            .collect()
    };
    MelodyAssets {
        session_tag: tag.clone(),
        date: Some(date),
        difficulty: None,
        bar_urls: [
            format!("{tag}/bar1.wav"),
            format!("{tag}/bar2.wav"),
            format!("{tag}/bar3.wav"),
            format!("{tag}/bar4.wav"),
        ],
        full_tune_url: format!("{tag}/full.wav"),
        bar_notes: [notes(bars[0]), notes(bars[1]), notes(bars[2]), notes(bars[3])],
    }
}

pub fn insert_melody_clips(fetcher: &MemoryFetcher, assets: &MelodyAssets) {
    for url in &assets.bar_urls {
        fetcher.insert(url, 10);
    }
    fetcher.insert(&assets.full_tune_url, 40);
}

#[derive(Default)]
pub struct RecordingPersistence {
    pub records: Mutex<Vec<SessionRecord>>,
    pub failing: Mutex<HashSet<String>>,
}

impl RecordingPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().clone()
    }

    pub fn fail_for(&self, user_id: &str) {
        self.failing.lock().insert(user_id.to_string());
    }
}

impl PersistencePort for RecordingPersistence {
    fn record_session(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        if self.failing.lock().contains(&record.user_id) {
            return Err(PersistenceError::Backend("offline".to_string()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn fetch_history(&self, user_id: &str) -> Result<Vec<SessionRecord>, PersistenceError> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn fetch_streak(&self, _user_id: &str) -> Result<StreakStats, PersistenceError> {
        Ok(StreakStats::default())
    }
}

pub struct ManualClock {
    now: Mutex<Instant>,
    today: NaiveDate,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
            today,
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn cache_with(fetcher: Arc<MemoryFetcher>) -> (Arc<SoundCache>, Arc<FakeBackend>) {
    let backend = FakeBackend::new();
    let cache = Arc::new(SoundCache::new(backend.clone(), fetcher, Arc::new(LengthDecoder)));
    (cache, backend)
}

/// Gesture observed and context running.
pub fn unlock(cache: &SoundCache) {
    cache.mark_gesture();
    cache.initialize().expect("fake context");
}

#[derive(Default)]
pub struct MemoryStorage {
    pub settings: Arc<Mutex<SettingsDto>>,
    pub saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn with(settings: SettingsDto) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Handle on the saved settings that outlives the boxed port.
    pub fn stored(&self) -> Arc<Mutex<SettingsDto>> {
        Arc::clone(&self.settings)
    }
}

impl StoragePort for MemoryStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        Ok(self.settings.lock().clone())
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        *self.settings.lock() = s.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
