//! Binary entrypoint for the kiosk slideshow.
//!
//! Wires signals, the schedule and the library watcher onto one control
//! channel; all playback logic lives in the library crate.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use kiosk_slideshow::config::Configuration;
use kiosk_slideshow::events::ControlCommand;
use kiosk_slideshow::render::SoftwareRenderer;
use kiosk_slideshow::{ControlBridge, schedule, tasks};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(name = "kiosk-slideshow", version, about = "Full-screen photo slideshow")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Start playback immediately (overrides `autostart`)
    #[arg(long, conflicts_with = "no_autostart")]
    autostart: bool,

    /// Stay idle until a start request arrives (overrides `autostart`)
    #[arg(long)]
    no_autostart: bool,

    /// Also append log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8, log_file: Option<&PathBuf>) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("kiosk_slideshow={level}").parse()?)
        .add_directive("notify=warn".parse()?);
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_ref())?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;
    info!(config = %cli.config.display(), ?cfg, "configuration loaded");

    let mut renderer = SoftwareRenderer::new(cfg.canvas.width, cfg.canvas.height);
    if let Some(path) = &cfg.snapshot_path {
        renderer = renderer.with_snapshot_path(path);
    }
    let bridge = ControlBridge::new(renderer, cfg.playback(), Handle::current());

    let (control_tx, control_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    tasks.spawn({
        let bridge = bridge.clone();
        let cancel = cancel.clone();
        async move {
            tasks::control::run(bridge, control_rx, cancel)
                .await
                .context("control task failed")
        }
    });

    if cfg.watch_library {
        tasks.spawn({
            let library = cfg.photo_library_path.clone();
            let ext = cfg.extension.clone();
            let control = control_tx.clone();
            let cancel = cancel.clone();
            async move {
                tasks::files::run(library, ext, control, cancel)
                    .await
                    .context("files task failed")
            }
        });
    }

    let autostart = if cli.autostart {
        true
    } else if cli.no_autostart {
        false
    } else {
        cfg.autostart
    };
    match cfg.schedule {
        Some(auto) => {
            // The schedule decides the initial state.
            tasks.spawn({
                let control = control_tx.clone();
                let cancel = cancel.clone();
                async move {
                    schedule::run(auto, control, cancel)
                        .await
                        .context("schedule task failed")
                }
            });
        }
        None if autostart => {
            control_tx
                .send(ControlCommand::Start)
                .await
                .context("queueing autostart")?;
        }
        None => info!("autostart disabled; waiting for a start request"),
    }

    // Ctrl-D/Ctrl-C shut down
    if io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => tracing::info!("stdin closed; initiating shutdown"),
                Err(err) => tracing::warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        for (kind, command, name) in [
            (SignalKind::user_defined1(), ControlCommand::Toggle, "SIGUSR1"),
            (SignalKind::hangup(), ControlCommand::Reload, "SIGHUP"),
        ] {
            let cancel = cancel.clone();
            let control = control_tx.clone();
            tokio::spawn(async move {
                match signal(kind) {
                    Ok(mut stream) => loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            received = stream.recv() => {
                                if received.is_none() {
                                    break;
                                }
                                tracing::info!(signal = name, ?command, "signal received");
                                if let Err(err) = control.send(command).await {
                                    tracing::warn!("failed to forward {name}: {err}");
                                    break;
                                }
                            }
                        }
                    },
                    Err(err) => tracing::warn!("failed to register {name} handler: {err}"),
                }
            });
        }
    }
    drop(control_tx);

    cancel.cancelled().await;

    // Nothing may issue commands once playback is shut down.
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }
    bridge.shutdown().await;

    Ok(())
}
