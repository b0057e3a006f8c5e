//! Command implementations for the feescope CLI

mod analyze;
mod history;
mod misc;
mod notify;

pub use analyze::*;
pub use history::*;
pub use misc::*;
pub use notify::*;
