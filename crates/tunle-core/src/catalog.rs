use tunle_domain_eval::Cue;
use tunle_ports::types::{instrument_key, INSTRUMENT_NOTE_COUNT};

/// Where the instrument notes and cues live, relative to the asset root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundCatalog {
    pub instrument_dir: String,
    pub cue_dir: String,
    pub extension: String,
}

impl Default for SoundCatalog {
    fn default() -> Self {
        Self {
            instrument_dir: "instrument".to_string(),
            cue_dir: "cues".to_string(),
            extension: "wav".to_string(),
        }
    }
}

impl SoundCatalog {
    pub fn instrument_url(&self, note: u8) -> String {
        format!("{}/{}.{}", self.instrument_dir, instrument_key(note), self.extension)
    }

    pub fn cue_url(&self, cue: Cue) -> String {
        format!("{}/{}.{}", self.cue_dir, cue.key(), self.extension)
    }

    /// `(key, url)` for every sound shared by all sessions.
    pub fn shared_sounds(&self) -> Vec<(String, String)> {
        let notes = (1..=INSTRUMENT_NOTE_COUNT)
            .map(|note| (instrument_key(note), self.instrument_url(note)));
        let cues = Cue::ALL
            .into_iter()
            .map(|cue| (cue.key().to_string(), self.cue_url(cue)));
        notes.chain(cues).collect()
    }
}
