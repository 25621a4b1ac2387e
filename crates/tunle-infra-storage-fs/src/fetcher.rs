use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tunle_ports::assets::{AssetFetchPort, FetchError};

/// Reads clips from disk. Accepts `file://` urls, absolute paths and paths relative to the
/// asset root.
pub struct FsAssetFetcher {
    base_dir: PathBuf,
}

impl FsAssetFetcher {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(FetchError::Unsupported(url.to_string()));
        }
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }
}

impl AssetFetchPort for FsAssetFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound(path.display().to_string()),
            _ => FetchError::Io(format!("{}: {}", path.display(), e)),
        })
    }
}
