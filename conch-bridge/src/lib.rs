//! Conch Bridge library target.
//!
//! The binary entry point is in `main.rs`; the modules live here so
//! `tests/*.rs` can exercise key mapping, layout and dispatch without a
//! terminal.

pub mod app;
pub mod keyboard;
pub mod renderer;
pub mod util;
