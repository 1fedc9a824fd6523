//! # Nullboard Agent - Entry Point
//! src/main.rs
//!
//! Punto de entrada del agente.
//!
//! Config → logging → raíz de almacenamiento → áreas → subcomando. Para
//! `serve` el engine corre en su propio thread y el thread principal espera
//! SIGINT/SIGTERM (o que el engine termine solo) para pararlo.

use anyhow::Context;
use crossbeam_channel::RecvTimeoutError;
use nullboard_agent::areas::SettingsFile;
use nullboard_agent::config::{AreaCommand, Command, Config};
use nullboard_agent::logging;
use nullboard_agent::server::{Engine, EngineDeps};
use nullboard_agent::storage::BoardStore;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::fs;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Cada cuánto el thread principal revisa si el engine sigue vivo
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    let config = Config::new();
    logging::init(config.verbose);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    let root = config.storage_root();
    fs::create_dir_all(&root)
        .with_context(|| format!("failed to create storage root {}", root.display()))?;
    debug!("conf.path: {}", root.display());

    let store = BoardStore::new(&root);
    let mut settings = SettingsFile::open(config.settings_path()).context("failed to load settings")?;

    match config.subcommand() {
        Command::Area(cmd) => area_command(cmd, &mut settings, &store),
        Command::Serve => serve(config, settings, store),
    }
}

/// Gestión de áreas desde la CLI
fn area_command(cmd: AreaCommand, settings: &mut SettingsFile, store: &BoardStore) -> anyhow::Result<()> {
    match cmd {
        AreaCommand::Add { folder } => {
            let entry = settings.add_area(&folder, store)?;
            println!("{}  {}", entry.token, entry.folder);
        }
        AreaCommand::List => {
            if settings.areas().is_empty() {
                println!("No areas configured");
            }
            for entry in settings.areas() {
                println!("{}  {}  {}", entry.token, entry.folder, entry.url);
            }
        }
        AreaCommand::Remove { token } => {
            let entry = settings.remove_area(&token)?;
            println!("Removed area '{}' (files kept)", entry.folder);
        }
    }

    Ok(())
}

fn serve(config: &Config, settings: SettingsFile, store: BoardStore) -> anyhow::Result<()> {
    if settings.areas().is_empty() {
        warn!("No areas configured, every request will be rejected; add one with `area add <folder>`");
    }

    let deps = EngineDeps {
        registry: Box::new(settings),
        store,
        on_activity: Some(Box::new(|| debug!("Engine activity"))),
    };

    let handle = Engine::bind(config, deps)?.spawn()?;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    let signals_handle = signals.handle();
    let (sig_tx, sig_rx) = crossbeam_channel::bounded(1);

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let _ = sig_tx.send(sig);
        }
    });

    loop {
        match sig_rx.recv_timeout(SUPERVISE_INTERVAL) {
            Ok(sig) => {
                info!("Received signal {}, shutting down", sig);
                break;
            }
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => {
                warn!("Engine exited on its own");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    signals_handle.close();
    handle.stop()?;
    Ok(())
}
