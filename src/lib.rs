//! Pilot: an interactive session engine for agent front ends.
//!
//! The crate owns everything between the keyboard and the agent runtime: a
//! line editor with paste compression, file/command/history overlays, input
//! history, foreground shell commands, and a queue of tool-permission
//! prompts. Rendering and the agent itself stay outside; hosts implement
//! [`session::observer::SessionObserver`] and [`runtime::AgentRuntime`].
//!
//! # Quick start
//!
//! ```no_run
//! use pilot::config::load_config;
//! use pilot::session::observer::NoopObserver;
//! use pilot::session::{EngineOptions, SessionEngine};
//! use std::sync::Arc;
//!
//! # async fn example(runtime: Arc<dyn pilot::runtime::AgentRuntime>) {
//! let config = load_config(None).unwrap();
//! let options = EngineOptions::from_config(&config, std::env::current_dir().unwrap());
//! let (mut engine, mut rx) = SessionEngine::new(options, runtime, Arc::new(NoopObserver));
//! while let Some(message) = rx.recv().await {
//!     engine.handle_message(message);
//! }
//! # }
//! ```

pub mod build_info;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod tui;
