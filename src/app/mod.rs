//! Binary-local application wiring.
//!
//! `main.rs` resolves configuration; this module owns the terminal loop, the
//! prompt view, and the stand-in runtime the loop talks to.

pub(crate) mod echo;
pub(crate) mod event_loop;
pub(crate) mod transcript;
pub(crate) mod view;
