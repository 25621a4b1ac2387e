mod fetcher;
mod persistence;
mod resolver;
mod settings;

pub use fetcher::FsAssetFetcher;
pub use persistence::{advance_streak, FsPersistence};
pub use resolver::{FsMelodyResolver, MelodyDescriptor};
pub use settings::FsStorage;

use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub(crate) enum JsonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, JsonError> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

pub(crate) fn write_json<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), JsonError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}
