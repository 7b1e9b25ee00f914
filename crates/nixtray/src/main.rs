//! nixtray: NixOS flake update tray.

mod app;
mod app_command;
mod check_scheduler;
mod config;
mod desktop;
mod error;
mod tray_command;
mod tray_icon_state;
mod tray_manager;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    check_scheduler::CheckScheduler,
    desktop::{DesktopNotifier, DesktopOpener, TrayStatusForwarder},
    error::{AppError, Result as AppResult},
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::{MenuIds, TrayManager},
};

use crate::config::Config;

use std::sync::Arc;

use nixtray_core::{
    APP_NAME, Collaborators, CommandCatalog, LogSink, Notifier, ProcessSupervisor, Severity,
    UpdateSession,
};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Diagnostics filter used when `RUST_LOG` is unset.
fn default_filter(debug: bool) -> &'static str {
    if debug {
        "nixtray=debug,nixtray_core=debug"
    } else {
        "nixtray=info,nixtray_core=info"
    }
}

/// Log, notify and exit on a fatal startup error.
fn fatal(notifier: &dyn Notifier, context: &str, e: &AppError) -> ! {
    error!(error = ?e, "{}", context);
    notifier.notify(APP_NAME, &format!("{context}: {e}"), Severity::Critical);
    std::process::exit(1);
}

/// Application entry point.
fn main() {
    let notifier = Arc::new(DesktopNotifier);

    // Config is needed before tracing so the debug flag can pick the filter.
    let config = Config::load();
    let debug = config.as_ref().is_ok_and(|c| c.behaviour.debug);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match config {
        Ok(c) => c,
        Err(e) => fatal(notifier.as_ref(), "Failed to load config", &e),
    };

    if let Err(e) = config.validate_repo() {
        fatal(notifier.as_ref(), "Flake repository validation failed", &e);
    }

    let log = LogSink::new(config.log_path());
    log.block("Startup", &config.startup_lines());

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => fatal(notifier.as_ref(), "Failed to create tray icon", &e),
    };

    let catalog = CommandCatalog::new(
        config.flake.repo.clone(),
        config.flake.host.clone(),
        config.tool_paths(),
        std::env::var("NIX_CONFIG").ok(),
    );
    let opener = Arc::new(DesktopOpener);
    let session = Arc::new(UpdateSession::new(
        catalog,
        config.session_settings(),
        Arc::new(ProcessSupervisor::new(log.clone())),
        log,
        Collaborators {
            notifier: notifier.clone(),
            opener: opener.clone(),
            listener: Arc::new(TrayStatusForwarder::new(tray_proxy.clone())),
        },
    ));

    info!(repo = ?config.flake.repo, host = %config.flake.host, "Session ready");

    let (command_tx, command_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = CheckScheduler::new(
        command_tx.clone(),
        config.startup_delay(),
        config.check_interval(),
    );

    let app = App {
        session,
        notifier,
        opener,
        repo: config.flake.repo.clone(),
        tray_proxy,
        command_tx,
        command_rx,
        shutdown_tx,
        menu_ids: tray_manager.menu_ids().clone(),
    };

    // Spawn tokio runtime on separate thread.
    // TrayManager stays on the main thread.
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime: {:?}", e);
                std::process::exit(1);
            }
        };

        rt.block_on(async {
            tokio::join!(
                async {
                    if let Err(e) = scheduler.run(shutdown_rx).await {
                        error!(error = ?e, "Check scheduler error");
                    }
                },
                async {
                    if let Err(e) = app.run().await {
                        error!(error = ?e, "App error");
                    }
                }
            );
        });
    });

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        if let Event::UserEvent(cmd) = event {
            match cmd {
                TrayCommand::Refresh(snapshot) => {
                    if let Err(e) = tray_manager.apply_snapshot(&snapshot) {
                        error!(error = ?e, "Failed to update tray icon");
                    }
                }
                TrayCommand::Shutdown => {
                    *control_flow = ControlFlow::ExitWithCode(0);
                }
            }
        }
    });
}
