use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tunle_ports::assets::{AssetFetchPort, DecodeError, FetchError, SoundDecoderPort};
use tunle_ports::audio::{AudioBackendPort, AudioContextPort, AudioError, ContextState, VoiceId};
use tunle_ports::types::{
    instrument_key, is_melody_key, DecodedBuffer, Volume01, INSTRUMENT_NOTE_COUNT,
};

/// Runs once, after the sound has finished on its own and left the active set.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("audio context unavailable: {0}")]
    Context(#[from] AudioError),
    #[error("audio context not initialized")]
    NotInitialized,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("decode failed for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
    #[error("no known source for {0}")]
    UnknownSource(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackHandle {
    pub voice: VoiceId,
    pub key: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheSnapshot {
    pub keys: Vec<String>,
    pub active_sounds: usize,
    pub context: Option<ContextState>,
    pub gesture_observed: bool,
    pub page_hidden: bool,
    pub melody_tag: Option<String>,
}

struct ActiveSound {
    key: String,
    on_complete: Option<CompletionCallback>,
}

struct CacheInner {
    context: Option<Box<dyn AudioContextPort>>,
    buffers: HashMap<String, Arc<DecodedBuffer>>,
    sources: HashMap<String, String>,
    active: HashMap<VoiceId, ActiveSound>,
    melody_tag: Option<String>,
    gesture_observed: bool,
    page_hidden: bool,
    master_volume: Volume01,
}

/// Owns the audio context, the decoded clips and the set of sounding voices.
///
/// All mutation goes through these methods; the cache is shared as `Arc<SoundCache>`.
pub struct SoundCache {
    backend: Arc<dyn AudioBackendPort>,
    fetcher: Arc<dyn AssetFetchPort>,
    decoder: Arc<dyn SoundDecoderPort>,
    init_lock: Mutex<()>,
    inner: Mutex<CacheInner>,
}

impl SoundCache {
    pub fn new(
        backend: Arc<dyn AudioBackendPort>,
        fetcher: Arc<dyn AssetFetchPort>,
        decoder: Arc<dyn SoundDecoderPort>,
    ) -> Self {
        Self {
            backend,
            fetcher,
            decoder,
            init_lock: Mutex::new(()),
            inner: Mutex::new(CacheInner {
                context: None,
                buffers: HashMap::new(),
                sources: HashMap::new(),
                active: HashMap::new(),
                melody_tag: None,
                gesture_observed: false,
                page_hidden: false,
                master_volume: Volume01::new(0.8),
            }),
        }
    }

    /// Creates the context if needed and resumes it once a gesture has unlocked audio.
    /// Concurrent callers wait on the first attempt instead of creating their own context.
    pub fn initialize(&self) -> Result<(), CacheError> {
        let _init = self.init_lock.lock();

        if self.inner.lock().context.is_none() {
            let mut context = self.backend.create_context()?;
            let mut inner = self.inner.lock();
            context.set_master_volume(inner.master_volume);
            inner.context = Some(context);
            log::debug!(target: "audio::cache", "audio context created");
        }

        let mut inner = self.inner.lock();
        if inner.gesture_observed && inner.context_state() == Some(ContextState::Suspended) {
            if let Some(context) = inner.context.as_mut() {
                if let Err(err) = context.resume() {
                    log::warn!(target: "audio::cache", "resume after init failed: {}", err);
                }
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().context.is_some()
    }

    pub fn load_sound(
        &self,
        url: &str,
        key: &str,
        session_tag: Option<&str>,
    ) -> Result<(), LoadError> {
        if is_melody_key(key) {
            if let Some(tag) = session_tag {
                self.switch_melody_tag(tag);
            }
        }

        let bytes = self.fetcher.fetch(url).map_err(|source| {
            log::warn!(target: "audio::cache", "fetch {} for {} failed: {}", url, key, source);
            LoadError::Fetch {
                url: url.to_string(),
                source,
            }
        })?;
        let buffer = self.decoder.decode(&bytes).map_err(|source| {
            log::warn!(target: "audio::cache", "decode {} for {} failed: {}", url, key, source);
            LoadError::Decode {
                url: url.to_string(),
                source,
            }
        })?;

        let mut inner = self.inner.lock();
        inner.buffers.insert(key.to_string(), Arc::new(buffer));
        inner.sources.insert(key.to_string(), url.to_string());
        log::debug!(target: "audio::cache", "loaded {} from {}", key, url);
        Ok(())
    }

    /// Starts `key` after `delay_secs`. Returns `None` without side effects when audio is
    /// locked, uninitialized, hidden or the key is unknown.
    pub fn play_sound(
        &self,
        key: &str,
        delay_secs: f64,
        on_complete: Option<CompletionCallback>,
    ) -> Option<PlaybackHandle> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !inner.gesture_observed {
            log::debug!(target: "audio::cache", "play {} skipped: no user gesture yet", key);
            return None;
        }
        let Some(context) = inner.context.as_mut() else {
            log::debug!(target: "audio::cache", "play {} skipped: not initialized", key);
            return None;
        };
        let Some(buffer) = inner.buffers.get(key).cloned() else {
            log::debug!(target: "audio::cache", "play {} skipped: not loaded", key);
            return None;
        };
        if inner.page_hidden {
            log::debug!(target: "audio::cache", "play {} skipped: page hidden", key);
            return None;
        }

        let at = context.current_time() + delay_secs.max(0.0);
        match context.start_voice(buffer, at) {
            Ok(voice) => {
                inner.active.insert(
                    voice,
                    ActiveSound {
                        key: key.to_string(),
                        on_complete,
                    },
                );
                Some(PlaybackHandle {
                    voice,
                    key: key.to_string(),
                })
            }
            Err(err) => {
                log::warn!(target: "audio::cache", "play {} rejected: {}", key, err);
                None
            }
        }
    }

    /// Stops every active voice. Completion callbacks of stopped voices are dropped unrun.
    pub fn stop_all_sounds(&self) -> usize {
        self.inner.lock().stop_all()
    }

    /// Retires voices that finished on their own and runs their callbacks, outside the lock.
    pub fn poll_completions(&self) -> usize {
        let finished: Vec<ActiveSound> = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let Some(context) = inner.context.as_mut() else {
                return 0;
            };
            context
                .drain_finished()
                .into_iter()
                .filter_map(|voice| inner.active.remove(&voice))
                .collect()
        };

        let count = finished.len();
        for sound in finished {
            log::trace!(target: "audio::cache", "{} finished", sound.key);
            if let Some(callback) = sound.on_complete {
                callback();
            }
        }
        count
    }

    pub fn verify_buffers(&self) -> bool {
        let inner = self.inner.lock();
        (1..=INSTRUMENT_NOTE_COUNT).all(|note| inner.buffers.contains_key(&instrument_key(note)))
    }

    /// Reloads `n1..n8` from the urls they were last loaded from.
    pub fn reload_instruments(&self) -> Result<(), LoadError> {
        let sources: Vec<(String, Option<String>)> = {
            let inner = self.inner.lock();
            (1..=INSTRUMENT_NOTE_COUNT)
                .map(instrument_key)
                .map(|key| {
                    let url = inner.sources.get(&key).cloned();
                    (key, url)
                })
                .collect()
        };

        for (key, url) in sources {
            let url = url.ok_or_else(|| LoadError::UnknownSource(key.clone()))?;
            self.load_sound(&url, &key, None)?;
        }
        Ok(())
    }

    pub fn has_sound(&self, key: &str) -> bool {
        self.inner.lock().buffers.contains_key(key)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Records the first user gesture. Returns true only the first time.
    pub fn mark_gesture(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = !inner.gesture_observed;
        inner.gesture_observed = true;
        first
    }

    pub fn gesture_observed(&self) -> bool {
        self.inner.lock().gesture_observed
    }

    pub fn set_page_hidden(&self, hidden: bool) {
        self.inner.lock().page_hidden = hidden;
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.inner.lock().context_state()
    }

    pub fn suspend_context(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let context = inner.context.as_mut().ok_or(CacheError::NotInitialized)?;
        if context.state() == ContextState::Running {
            context.suspend()?;
        }
        Ok(())
    }

    pub fn resume_context(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let context = inner.context.as_mut().ok_or(CacheError::NotInitialized)?;
        if context.state() == ContextState::Suspended {
            context.resume()?;
        }
        Ok(())
    }

    /// Drops the context and builds a fresh one, then reloads the instrument clips.
    pub fn reinitialize(&self) -> Result<(), CacheError> {
        self.close_context();
        self.initialize()?;
        if let Err(err) = self.reload_instruments() {
            log::warn!(target: "audio::cache", "instrument reload after reinit failed: {}", err);
        }
        Ok(())
    }

    pub fn set_master_volume(&self, volume: Volume01) {
        let mut inner = self.inner.lock();
        inner.master_volume = volume;
        if let Some(context) = inner.context.as_mut() {
            context.set_master_volume(volume);
        }
    }

    /// Stops everything and closes the context; buffers stay cached.
    pub fn dispose(&self) {
        self.close_context();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner.buffers.keys().cloned().collect();
        keys.sort();
        CacheSnapshot {
            keys,
            active_sounds: inner.active.len(),
            context: inner.context_state(),
            gesture_observed: inner.gesture_observed,
            page_hidden: inner.page_hidden,
            melody_tag: inner.melody_tag.clone(),
        }
    }

    fn close_context(&self) {
        let mut inner = self.inner.lock();
        inner.stop_all();
        if let Some(mut context) = inner.context.take() {
            context.close();
            log::debug!(target: "audio::cache", "audio context closed");
        }
    }

    fn switch_melody_tag(&self, tag: &str) {
        let mut inner = self.inner.lock();
        if inner.melody_tag.as_deref() == Some(tag) {
            return;
        }
        let before = inner.buffers.len();
        inner.buffers.retain(|key, _| !is_melody_key(key));
        inner.sources.retain(|key, _| !is_melody_key(key));
        log::info!(
            target: "audio::cache",
            "melody tag {:?} -> {}: evicted {} buffers",
            inner.melody_tag,
            tag,
            before - inner.buffers.len()
        );
        inner.melody_tag = Some(tag.to_string());
    }
}

impl CacheInner {
    fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|context| context.state())
    }

    fn stop_all(&mut self) -> usize {
        let active = std::mem::take(&mut self.active);
        if let Some(context) = self.context.as_mut() {
            for voice in active.keys() {
                if let Err(err) = context.stop_voice(*voice) {
                    log::warn!(target: "audio::cache", "stop {:?} failed: {}", voice, err);
                }
            }
        }
        active.len()
    }
}
