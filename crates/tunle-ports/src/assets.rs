use crate::types::DecodedBuffer;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported url: {0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("corrupt data: {0}")]
    Corrupt(String),
    #[error("empty clip")]
    Empty,
}

/// Raw byte source for sound clips.
pub trait AssetFetchPort: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub trait SoundDecoderPort: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer, DecodeError>;
}
