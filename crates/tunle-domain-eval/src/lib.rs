pub mod hint;
pub mod matcher;

pub use hint::*;
pub use matcher::*;
