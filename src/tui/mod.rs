//! Line-editor building blocks.
//!
//! Each piece here is independent of the terminal loop: buffer editing, paste
//! compression, history, overlays and their candidate sources, slash-command
//! parsing, and key mapping. `session` composes them.

pub mod commands;
pub mod compression;
pub mod history;
pub mod keys;
pub mod overlay;
pub mod search;
pub mod text_buffer;
