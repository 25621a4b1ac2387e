use crate::import::MelodyError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tunle_ports::melody::{Difficulty, BAR_COUNT};
use tunle_ports::types::INSTRUMENT_NOTE_COUNT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub note: u8,
    /// Display-only flags; matching compares `note` alone.
    pub left_quaver: bool,
    pub right_quaver: bool,
}

impl NoteEvent {
    pub fn plain(note: u8) -> Self {
        Self {
            note,
            left_quaver: false,
            right_quaver: false,
        }
    }

    pub fn matches(&self, note: u8) -> bool {
        self.note == note
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    notes: Vec<NoteEvent>,
}

impl Bar {
    pub fn new(notes: Vec<NoteEvent>) -> Result<Self, MelodyError> {
        if notes.is_empty() {
            return Err(MelodyError::EmptyBar);
        }
        if let Some(bad) = notes
            .iter()
            .find(|n| n.note == 0 || n.note > INSTRUMENT_NOTE_COUNT)
        {
            return Err(MelodyError::NoteOutOfRange(bad.note));
        }
        Ok(Self { notes })
    }

    /// Bar of plain notes, e.g. `Bar::from_notes(&[1, 3, 5])`.
    pub fn from_notes(notes: &[u8]) -> Result<Self, MelodyError> {
        Self::new(notes.iter().copied().map(NoteEvent::plain).collect())
    }

    pub(crate) fn from_static(notes: &[(u8, bool, bool)]) -> Self {
        Self {
            notes: notes
                .iter()
                .map(|&(note, left_quaver, right_quaver)| NoteEvent {
                    note,
                    left_quaver,
                    right_quaver,
                })
                .collect(),
        }
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note_at(&self, index: usize) -> Option<&NoteEvent> {
        self.notes.get(index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MelodySource {
    Published,
    Bundled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Melody {
    pub session_tag: String,
    pub date: Option<NaiveDate>,
    pub difficulty: Option<Difficulty>,
    pub source: MelodySource,
    pub bars: [Bar; BAR_COUNT],
    pub bar_urls: [String; BAR_COUNT],
    pub full_tune_url: String,
}

impl Melody {
    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn bar_url(&self, index: usize) -> Option<&str> {
        self.bar_urls.get(index).map(String::as_str)
    }

    pub fn is_bundled(&self) -> bool {
        self.source == MelodySource::Bundled
    }
}
