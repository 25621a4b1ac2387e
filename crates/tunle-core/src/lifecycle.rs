use crate::sound_cache::SoundCache;
use std::sync::Arc;
use tunle_ports::types::{PlatformEvent, Visibility};

/// Unlocks audio on the first gesture and follows page visibility.
///
/// Nothing here returns an error: failures are logged and the cache keeps its previous state.
pub struct LifecycleManager {
    cache: Arc<SoundCache>,
    subscribed: bool,
    gesture_armed: bool,
}

impl LifecycleManager {
    pub fn new(cache: Arc<SoundCache>) -> Self {
        Self {
            cache,
            subscribed: false,
            gesture_armed: false,
        }
    }

    pub fn subscribe(&mut self) {
        self.subscribed = true;
        self.gesture_armed = !self.cache.gesture_observed();
        log::debug!(target: "lifecycle", "subscribed (gesture armed: {})", self.gesture_armed);
    }

    pub fn unsubscribe(&mut self) {
        self.subscribed = false;
        self.gesture_armed = false;
        log::debug!(target: "lifecycle", "unsubscribed");
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn gesture_armed(&self) -> bool {
        self.gesture_armed
    }

    /// Returns the new visibility when the event changed it.
    pub fn handle_event(&mut self, event: PlatformEvent) -> Option<Visibility> {
        if !self.subscribed {
            return None;
        }
        match event {
            event if event.is_gesture() => {
                self.on_gesture();
                None
            }
            PlatformEvent::VisibilityChanged {
                visibility: Visibility::Hidden,
            } => {
                self.on_hidden();
                Some(Visibility::Hidden)
            }
            PlatformEvent::VisibilityChanged {
                visibility: Visibility::Visible,
            } => {
                self.on_visible();
                Some(Visibility::Visible)
            }
            PlatformEvent::PageShow { persisted } => {
                if persisted {
                    self.on_page_restored();
                }
                None
            }
            _ => None,
        }
    }

    fn on_gesture(&mut self) {
        if !self.gesture_armed {
            return;
        }
        self.gesture_armed = false;
        if self.cache.mark_gesture() {
            log::info!(target: "lifecycle", "first user gesture, unlocking audio");
        }
        if let Err(err) = self.cache.initialize() {
            log::warn!(target: "lifecycle", "audio unlock failed: {}", err);
        }
    }

    fn on_hidden(&mut self) {
        self.cache.set_page_hidden(true);
        let stopped = self.cache.stop_all_sounds();
        if self.cache.is_initialized() {
            if let Err(err) = self.cache.suspend_context() {
                log::warn!(target: "lifecycle", "suspend on hide failed: {}", err);
            }
        }
        log::debug!(target: "lifecycle", "page hidden, stopped {} sounds", stopped);
    }

    fn on_visible(&mut self) {
        self.cache.set_page_hidden(false);
        if !self.cache.gesture_observed() {
            return;
        }

        if !self.cache.is_initialized() {
            if let Err(err) = self.cache.initialize() {
                log::warn!(target: "lifecycle", "init on show failed: {}", err);
            }
            return;
        }

        if let Err(err) = self.cache.resume_context() {
            log::warn!(target: "lifecycle", "resume on show failed: {}", err);
        }
        if !self.cache.verify_buffers() {
            log::warn!(
                target: "lifecycle",
                "instrument buffers missing after show, reinitializing"
            );
            if let Err(err) = self.cache.reinitialize() {
                log::warn!(target: "lifecycle", "reinitialize failed: {}", err);
            }
        }
    }

    fn on_page_restored(&mut self) {
        if !self.cache.gesture_observed() || !self.cache.is_initialized() {
            return;
        }
        if let Err(err) = self.cache.resume_context() {
            log::warn!(target: "lifecycle", "resume after restore failed: {}", err);
        }
    }
}
