pub mod bundled;
pub mod import;
pub mod model;

pub use bundled::*;
pub use import::*;
pub use model::*;
