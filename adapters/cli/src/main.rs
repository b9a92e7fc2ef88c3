#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays geocache in the terminal.

mod commands;
mod config;
mod terminal;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use geocache_core::{inventory_line, LatLng};
use geocache_geolocation::ScriptedGeolocation;
use geocache_system_persistence::{
    store::{JsonFileStore, KeyValueStore, MemoryStore},
    transfer::{decode_transfer, encode_transfer},
};
use geocache_system_session::{Input, Session};
use geocache_world::query;
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{LineCommand, HELP},
    config::CliConfig,
    terminal::TerminalRenderer,
};

type TerminalSession<S> = Session<TerminalRenderer, ScriptedGeolocation, S>;

/// Command-line arguments accepted by the geocache binary.
#[derive(Debug, Parser)]
#[command(
    name = "geocache",
    about = "Collect and craft tokens hidden on a grid laid over the real world."
)]
struct CliArgs {
    /// TOML file overriding gameplay parameters.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// JSON file holding the save. Progress is discarded on exit without one.
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
    /// Position reported by the simulated GPS, written as `lat,lng`.
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_position, allow_hyphen_values = true)]
    gps: Option<LatLng>,
}

/// Entry point for the geocache command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => CliConfig::load(path).context("failed to load configuration")?,
        None => CliConfig::default(),
    };

    let geolocation = args
        .gps
        .map_or_else(ScriptedGeolocation::new, ScriptedGeolocation::with_fix);
    let renderer = TerminalRenderer::new(config.game.grid, config.game.view_radius);

    match args.save.or(config.save) {
        Some(path) => {
            tracing::info!(path = %path.display(), "using save file");
            let store = JsonFileStore::open(path);
            play(Session::start(config.game, renderer, geolocation, store))
        }
        None => {
            tracing::info!("no save file given, progress lasts for this run only");
            play(Session::start(
                config.game,
                renderer,
                geolocation,
                MemoryStore::new(),
            ))
        }
    }
}

fn play<S: KeyValueStore>(mut session: TerminalSession<S>) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "{}",
        inventory_line(query::inventory(session.world()))
    )?;
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read command")?;
        let lines = match line.parse::<LineCommand>() {
            Ok(command) => match execute(&mut session, command) {
                Some(lines) => lines,
                None => break,
            },
            Err(error) => vec![error.to_string()],
        };
        for line in lines {
            writeln!(stdout, "{line}")?;
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Runs a single command, returning the lines to print or `None` to quit.
fn execute<S: KeyValueStore>(
    session: &mut TerminalSession<S>,
    command: LineCommand,
) -> Option<Vec<String>> {
    let lines = match command {
        LineCommand::Move(direction) => with_inventory(session, Input::Move(direction)),
        LineCommand::Click(cell) => with_inventory(session, Input::CellClicked { cell }),
        LineCommand::ToggleGps => session.handle(Input::ToggleGps),
        LineCommand::Fix(position) => {
            session.geolocation_mut().set_fix(position);
            match session.gps_subscription() {
                Some(subscription) => session.handle(Input::GeolocationUpdate {
                    subscription,
                    position,
                }),
                None => vec![
                    "GPS tracking is off, the fix is kept for when it is turned on.".to_owned(),
                ],
            }
        }
        LineCommand::Reset => with_inventory(session, Input::Reset),
        LineCommand::Look => session.renderer().describe(),
        LineCommand::Export => match encode_transfer(&query::snapshot(session.world())) {
            Ok(encoded) => vec![encoded],
            Err(error) => vec![format!("Could not export: {error}.")],
        },
        LineCommand::Import(payload) => match decode_transfer(&payload) {
            Ok(snapshot) => with_inventory(session, Input::Import(snapshot)),
            Err(error) => vec![format!("Could not import: {error}.")],
        },
        LineCommand::Help => HELP.lines().map(str::to_owned).collect(),
        LineCommand::Quit => return None,
    };
    Some(lines)
}

fn with_inventory<S: KeyValueStore>(
    session: &mut TerminalSession<S>,
    input: Input,
) -> Vec<String> {
    let mut lines = session.handle(input);
    lines.push(inventory_line(query::inventory(session.world())));
    lines
}

fn parse_position(value: &str) -> Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG but found '{value}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("'{lat}' is not a latitude"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("'{lng}' is not a longitude"))?;
    let position = LatLng::new(lat, lng);
    if !position.is_finite() {
        return Err(format!("'{value}' is not a finite position"));
    }
    Ok(position)
}
