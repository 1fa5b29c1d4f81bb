//! Pipeline entry points for watch cycles.

pub mod reconcile;
pub mod watch;

pub use reconcile::select_new;
pub use watch::{WatchOutcome, run_all, run_watch};
