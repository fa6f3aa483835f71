//! Utility functions for common operations.
//!
//! - **Text processing**: Unicode-aware width calculation, truncation, and
//!   stripping of terminal control sequences from forum content
//! - **HTML**: Discourse cooked HTML to plain text
//! - **Filesystem**: atomic owner-only writes for session and cache files

mod fs;
mod html;
mod text;

pub use fs::{ensure_private_dir, write_atomic};
pub use html::cooked_to_text;
pub use text::{display_width, format_relative_time, strip_control_chars, truncate_to_width};
