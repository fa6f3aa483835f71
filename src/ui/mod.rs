//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - main event loop and terminal management
//! - `login` - first-run sign-in form
//! - `input` - keyboard input handling
//! - `events` - applying background task results
//! - `sync` - spawning network operations behind in-flight flags
//! - `render` - view dispatch
//! - `topics`, `reader`, `compose`, `status`, `help` - widgets
//! - `helpers` - shared utilities

mod compose;
mod events;
mod help;
mod helpers;
mod input;
mod login;
mod loop_runner;
mod reader;
mod render;
mod status;
mod sync;
mod topics;

pub use login::run_login;
pub use loop_runner::{run, Action};
