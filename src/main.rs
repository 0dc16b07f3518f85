//! CLI entry point for pilot.

mod app;
mod cli;

use app::echo::EchoRuntime;
use app::transcript::TranscriptObserver;
use clap::Parser;
use crossterm::style::{Color, Stylize};
use pilot::build_info;
use pilot::config::{default_history_path, default_log_path, load_config, Config};
use pilot::error::EngineError;
use pilot::logging;
use pilot::session::permissions::PermissionMode;
use pilot::session::{EngineOptions, SessionEngine};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    if args.version {
        println!("{}", build_info::cli_version_text());
        return;
    }
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "pilot exited with error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args) -> Result<(), EngineError> {
    let mut config = load_config(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);

    let log_path = logging::init(default_log_path());
    tracing::info!(version = build_info::VERSION, log = ?log_path, "pilot starting");

    if !std::io::stdin().is_terminal() {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "pilot needs an interactive terminal",
        )
        .into());
    }

    let mut options = EngineOptions::from_config(&config, std::env::current_dir()?);
    if config.editor.persist_history {
        options.history_path = default_history_path();
    }
    options.plugin_dirs = args.plugin_dirs;

    let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
    let runtime = Arc::new(EchoRuntime::new(
        transcript_tx.clone(),
        options.plugin_dirs.clone(),
    ));
    let observer = Arc::new(TranscriptObserver::new(transcript_tx));
    let (engine, engine_rx) = SessionEngine::new(options, runtime.clone(), observer);
    runtime.attach(engine.permission_broker(), engine.message_sender());

    render_startup_banner(
        config.display.color,
        &engine.options().workdir,
        engine.permission_mode(),
    );
    app::event_loop::run(engine, engine_rx, transcript_rx, config.display.color).await?;
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, args: &cli::Args) {
    if args.no_color {
        config.display.color = false;
    }
    if args.dangerously_skip_permissions {
        config.permissions.mode = PermissionMode::BypassPermissions;
    }
}

fn render_startup_banner(color: bool, workdir: &Path, mode: PermissionMode) {
    let banner = build_info::startup_banner(workdir, mode);
    if color {
        eprintln!("{} {}", "•".with(Color::DarkGrey), banner.as_str().with(Color::Green).bold());
    } else {
        eprintln!("• {banner}");
    }
    eprintln!("  /help for keys, Ctrl+D to quit");
    eprintln!();
}
