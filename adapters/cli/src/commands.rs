//! Parsing of the line-oriented commands typed at the prompt.

use std::str::FromStr;

use geocache_core::{CellCoord, Direction, LatLng};
use thiserror::Error;

/// Usage summary printed by `help`.
pub(crate) const HELP: &str = "\
commands:
  n | s | e | w        move one cell north, south, east or west
  click <i> <j>        interact with cell i,j
  gps                  toggle position tracking
  fix <lat> <lng>      report a position fix
  reset                erase all progress
  look                 list visible tokens
  export               print a transfer string for this save
  import <string>      replace this save with a transfer string
  help                 show this message
  quit                 leave the game";

/// Command entered by the player.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum LineCommand {
    Move(Direction),
    Click(CellCoord),
    ToggleGps,
    Fix(LatLng),
    Reset,
    Look,
    Export,
    Import(String),
    Help,
    Quit,
}

/// Reasons a command line could not be understood.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

impl FromStr for LineCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Usage("type 'help' for a list of commands"));
        };
        let arguments: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), arguments.as_slice()) {
            ("n" | "north", []) => Self::Move(Direction::North),
            ("s" | "south", []) => Self::Move(Direction::South),
            ("e" | "east", []) => Self::Move(Direction::East),
            ("w" | "west", []) => Self::Move(Direction::West),
            ("click", [i, j]) => Self::Click(CellCoord::new(number(i)?, number(j)?)),
            ("click", _) => return Err(CommandError::Usage("click <i> <j>")),
            ("gps", []) => Self::ToggleGps,
            ("fix", [lat, lng]) => Self::Fix(LatLng::new(number(lat)?, number(lng)?)),
            ("fix", _) => return Err(CommandError::Usage("fix <lat> <lng>")),
            ("reset", []) => Self::Reset,
            ("look", []) => Self::Look,
            ("export", []) => Self::Export,
            ("import", [payload]) => Self::Import((*payload).to_owned()),
            ("import", _) => return Err(CommandError::Usage("import <string>")),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", []) => Self::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_owned())),
        };
        Ok(command)
    }
}

fn number<T: FromStr>(word: &str) -> Result<T, CommandError> {
    word.parse()
        .map_err(|_| CommandError::NotANumber(word.to_owned()))
}
