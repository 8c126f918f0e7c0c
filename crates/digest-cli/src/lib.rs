//! Paper Digest CLI - plugin registration, presets and commands
//!
//! The binary lives in `main.rs`; this library exposes the pieces the
//! integration tests drive directly.

pub mod commands;
pub mod presets;
