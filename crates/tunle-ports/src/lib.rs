pub mod assets;
pub mod audio;
pub mod clock;
pub mod melody;
pub mod persistence;
pub mod storage;
pub mod types;

pub use assets::*;
pub use audio::*;
pub use clock::*;
pub use melody::*;
pub use persistence::*;
pub use storage::*;
pub use types::*;
