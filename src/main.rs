// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stagefx::cancel::CancelHandle;
use stagefx::clock::MasterClock;
use stagefx::config::Config;
use stagefx::dmx::Controller;
use stagefx::fx::FxEngine;
use stagefx::server::{self, AppState};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version,
    about = "A tempo-synchronized stage lighting effects engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the effects engine, transmitters, and the control server.
    Start {
        /// The path to the config file.
        config_path: PathBuf,
    },
    /// Parses and cross-validates a config without starting anything.
    Check {
        /// The path to the config file.
        config_path: PathBuf,
    },
    /// Lists the patched fixtures and groups.
    Fixtures {
        /// The path to the config file.
        config_path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Commands::Start { config_path } => start(&config_path),
        Commands::Check { config_path } => check(&config_path),
        Commands::Fixtures { config_path } => fixtures(&config_path),
    }
}

/// Validates the whole config: addressing, fixture types, group membership.
fn check(config_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Config::load(config_path)?;
    let transmitters = config.transmitter_configs()?;
    let patch = config.build_patch()?;
    println!(
        "OK: {} universe(s), {} fixture(s), {} group(s)",
        transmitters.len(),
        patch.fixtures().len(),
        patch.groups().len()
    );
    Ok(())
}

fn fixtures(config_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Config::load(config_path)?;
    let patch = config.build_patch()?;

    for fixture in patch.fixtures() {
        println!("{} ({})", fixture.key, fixture.type_key);
        for property in fixture.properties() {
            println!("  {} [{:?}]", property.name(), property.kind());
        }
        for element in fixture.elements() {
            println!("  element {}", element.key);
        }
    }
    for group in patch.groups() {
        println!("group {}: {}", group.name, group.flatten().join(", "));
    }
    Ok(())
}

fn start(config_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Config::load(config_path)?;
    let cancel_handle = CancelHandle::new();

    let controller = Arc::new(Controller::new(
        config.transmitter_configs()?,
        cancel_handle.clone(),
    ));
    let patch = Arc::new(config.build_patch()?);
    let clock = Arc::new(MasterClock::new(config.clock.bpm, cancel_handle.clone())?);
    let engine = Arc::new(FxEngine::new(
        patch.clone(),
        controller.clone(),
        clock.clone(),
        cancel_handle.clone(),
    ));

    let state = AppState::new(clock, engine, patch, controller);
    server::start_event_bridges(state.clone(), cancel_handle.clone());

    info!(config = %config_path.display(), "stagefx starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let bind = config.server.bind.clone();
    let result = runtime.block_on(async move {
        tokio::select! {
            served = server::serve(state, &bind) => served,
            shutdown = tokio::signal::ctrl_c() => {
                shutdown.map_err(|err| Box::new(err) as Box<dyn Error + Send + Sync>)
            }
        }
    });

    info!("Shutting down");
    cancel_handle.cancel();
    result.map_err(|err| -> Box<dyn Error> { err })
}
