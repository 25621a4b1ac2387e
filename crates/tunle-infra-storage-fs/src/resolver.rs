use crate::{read_json, JsonError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tunle_ports::melody::{
    Difficulty, MelodyAssets, MelodyResolverPort, NoteDto, ResolveError, BAR_COUNT,
};

/// Contents of `<root>/<YYYY-MM-DD>/melody.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MelodyDescriptor {
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    pub bars: Vec<Vec<NoteDto>>,
}

/// Publishes one melody per dated folder, with `bar1.wav..bar4.wav` and `full.wav` beside it.
///
/// Clip urls are absolute paths, so they fetch the same regardless of the asset root.
pub struct FsMelodyResolver {
    root: PathBuf,
}

impl FsMelodyResolver {
    /// A relative `root` is anchored to the working directory at construction.
    pub fn new(root: PathBuf) -> Self {
        let root = if root.is_relative() {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(root),
                Err(err) => {
                    log::warn!(
                        target: "storage",
                        "no working directory for {}: {}",
                        root.display(),
                        err
                    );
                    root
                }
            }
        } else {
            root
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }
}

impl MelodyResolverPort for FsMelodyResolver {
    fn resolve(&self, date: NaiveDate) -> Result<MelodyAssets, ResolveError> {
        let folder = self.folder(date);
        let descriptor_path = folder.join("melody.json");
        if !descriptor_path.exists() {
            return Err(ResolveError::NotFound(date));
        }

        let descriptor: MelodyDescriptor = read_json(&descriptor_path).map_err(|err| match err {
            JsonError::Io(e) => ResolveError::Backend(e.to_string()),
            JsonError::Serde(e) => ResolveError::InvalidDescriptor(e.to_string()),
        })?;

        let bar_notes: [Vec<NoteDto>; BAR_COUNT] =
            descriptor.bars.try_into().map_err(|bars: Vec<Vec<NoteDto>>| {
                ResolveError::InvalidDescriptor(format!(
                    "expected {} bars, found {}",
                    BAR_COUNT,
                    bars.len()
                ))
            })?;

        let clip = |name: String| folder.join(name).to_string_lossy().into_owned();
        log::debug!(target: "storage", "resolved melody for {} from {}", date, folder.display());

        Ok(MelodyAssets {
            session_tag: date.format("%Y-%m-%d").to_string(),
            date: Some(date),
            difficulty: descriptor.difficulty,
            bar_urls: std::array::from_fn(|i| clip(format!("bar{}.wav", i + 1))),
            full_tune_url: clip("full.wav".to_string()),
            bar_notes,
        })
    }
}
