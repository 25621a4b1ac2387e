pub mod app;
pub mod catalog;
pub mod diagnostics;
pub mod ipc;
pub mod lifecycle;
pub mod session;
pub mod sound_cache;
pub mod stopwatch;
pub mod timers;

pub use app::*;
pub use catalog::*;
pub use diagnostics::*;
pub use ipc::*;
pub use lifecycle::*;
pub use session::*;
pub use sound_cache::*;
pub use stopwatch::*;
pub use timers::*;
