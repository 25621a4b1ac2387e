use crate::model::{Bar, Melody, MelodySource, NoteEvent};
use tunle_ports::melody::{MelodyAssets, NoteDto, BAR_COUNT};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MelodyError {
    #[error("bar has no notes")]
    EmptyBar,
    #[error("note {0} is outside the instrument range 1..=8")]
    NoteOutOfRange(u8),
    #[error("bar {index}: {source}")]
    InvalidBar {
        index: usize,
        #[source]
        source: Box<MelodyError>,
    },
    #[error("missing clip url for {0}")]
    MissingUrl(String),
}

/// Validates a resolver payload into an immutable melody.
pub fn melody_from_assets(assets: MelodyAssets) -> Result<Melody, MelodyError> {
    let MelodyAssets {
        session_tag,
        date,
        difficulty,
        bar_urls,
        full_tune_url,
        bar_notes,
    } = assets;

    for (index, url) in bar_urls.iter().enumerate() {
        if url.trim().is_empty() {
            return Err(MelodyError::MissingUrl(format!("bar {}", index + 1)));
        }
    }
    if full_tune_url.trim().is_empty() {
        return Err(MelodyError::MissingUrl("full tune".to_string()));
    }

    let mut bars = Vec::with_capacity(BAR_COUNT);
    for (index, notes) in bar_notes.into_iter().enumerate() {
        let bar = bar_from_dtos(&notes).map_err(|e| MelodyError::InvalidBar {
            index,
            source: Box::new(e),
        })?;
        bars.push(bar);
    }
    let bars: [Bar; BAR_COUNT] = bars
        .try_into()
        .map_err(|_| MelodyError::EmptyBar)?;

    Ok(Melody {
        session_tag,
        date,
        difficulty,
        source: MelodySource::Published,
        bars,
        bar_urls,
        full_tune_url,
    })
}

fn bar_from_dtos(notes: &[NoteDto]) -> Result<Bar, MelodyError> {
    Bar::new(
        notes
            .iter()
            .map(|dto| NoteEvent {
                note: dto.note,
                left_quaver: dto.left_quaver,
                right_quaver: dto.right_quaver,
            })
            .collect(),
    )
}
