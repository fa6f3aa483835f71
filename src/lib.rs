//! lurk: a terminal client for Discourse forums that authenticates with
//! browser-style session cookies.
//!
//! The engine (`session`, `discourse`, `storage`) has no terminal
//! dependencies; `ui` drives it from a ratatui front end and `export`
//! from the command line.

pub mod app;
pub mod config;
pub mod discourse;
pub mod export;
pub mod session;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
