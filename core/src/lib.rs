#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the geocache engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values that systems use
//! to redraw cells, persist snapshots and report status to the player.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tooltip attached to the player marker by renderers.
pub const PLAYER_TOOLTIP: &str = "That's you!";

/// Positions closer than this fraction of a cell to a cell boundary snap onto it.
const INDEX_TOLERANCE: f64 = 1e-9;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests an interaction with the token slot of a cell.
    Interact {
        /// Cell the player clicked.
        cell: CellCoord,
    },
    /// Displaces the player by one cell edge in the provided direction.
    MovePlayer {
        /// Direction of travel.
        direction: Direction,
    },
    /// Places the player at an absolute position, typically a geolocation fix.
    SetPosition {
        /// New real-world position of the player.
        position: LatLng,
    },
    /// Replaces all mutable state with a previously captured snapshot.
    Restore {
        /// Snapshot to adopt.
        snapshot: GameSnapshot,
    },
    /// Discards all mutable state and places the player at the provided position.
    Reset {
        /// Position the player starts from after the reset.
        position: LatLng,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the player moved.
    PositionChanged {
        /// Real-world position after the move.
        position: LatLng,
        /// Cell containing the new position.
        cell: CellCoord,
    },
    /// Confirms that the player picked up the token held by a cell.
    TokenCollected {
        /// Cell that was emptied.
        cell: CellCoord,
        /// Value of the collected token.
        value: TokenValue,
    },
    /// Confirms that the player placed the held token into an empty cell.
    TokenDropped {
        /// Cell that received the token.
        cell: CellCoord,
        /// Value of the dropped token.
        value: TokenValue,
    },
    /// Confirms that two matching tokens were combined into one of double value.
    TokensCrafted {
        /// Cell holding the crafted token.
        cell: CellCoord,
        /// Value of the crafted token.
        value: TokenValue,
    },
    /// Reports that the player clicked an empty cell with empty hands.
    CellWasEmpty {
        /// Cell that was clicked.
        cell: CellCoord,
    },
    /// Reports that an interaction was refused without changing state.
    InteractionRejected {
        /// Cell that was clicked.
        cell: CellCoord,
        /// Reason the interaction was refused.
        reason: InteractionRejection,
    },
    /// Requests a redraw of a single cell that an interaction resolved against.
    CellContentChanged {
        /// Cell to redraw.
        cell: CellCoord,
        /// Content the cell resolves to after the interaction.
        content: Option<TokenValue>,
    },
    /// Signals that a crafted token reached the configured win value.
    GameWon {
        /// Value of the winning token.
        value: TokenValue,
    },
    /// Confirms that persisted state replaced the in-memory state.
    StateRestored,
    /// Confirms that all mutable state was discarded.
    WorldReset,
}

impl Event {
    /// Reports whether the event follows a change that must be persisted.
    #[must_use]
    pub const fn mutates_state(&self) -> bool {
        matches!(
            self,
            Self::PositionChanged { .. }
                | Self::CellContentChanged { .. }
                | Self::StateRestored
                | Self::WorldReset
        )
    }
}

/// Reasons an interaction request may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionRejection {
    /// The clicked cell lies outside the interaction radius around the player.
    TooFar {
        /// Chebyshev distance between the player cell and the clicked cell.
        distance: u32,
        /// Configured interaction radius.
        radius: u32,
    },
    /// The held token and the cell token carry different values.
    Mismatch {
        /// Value of the token held by the player.
        held: TokenValue,
        /// Value of the token found in the cell.
        found: TokenValue,
    },
    /// Doubling the matching tokens would exceed the representable range.
    ValueOverflow {
        /// Value that could not be doubled.
        value: TokenValue,
    },
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward increasing latitude.
    North,
    /// Movement toward increasing longitude.
    East,
    /// Movement toward decreasing latitude.
    South,
    /// Movement toward decreasing longitude.
    West,
}

impl Direction {
    /// Cell offset `(di, dj)` produced by a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Location of a single grid cell in the unbounded world grid.
///
/// `i` follows latitude and `j` follows longitude. The textual form `"i,j"`
/// is the key used by persisted override records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    i: i32,
    j: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Latitude-aligned index of the cell.
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Longitude-aligned index of the cell.
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Returns the coordinate displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self {
            i: self.i.saturating_add(di),
            j: self.j.saturating_add(dj),
        }
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.i, self.j)
    }
}

/// Error produced when a textual cell key cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cell key '{0}' is not of the form 'i,j'")]
pub struct CellKeyError(String);

impl FromStr for CellCoord {
    type Err = CellKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CellKeyError(value.to_owned());
        let (i, j) = value.split_once(',').ok_or_else(invalid)?;
        let i = i.trim().parse::<i32>().map_err(|_| invalid())?;
        let j = j.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self::new(i, j))
    }
}

/// Positive value carried by a token. Tokens combine by doubling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TokenValue(u64);

impl TokenValue {
    /// Creates a token value, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Retrieves the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Value of the token produced by combining two tokens of this value.
    #[must_use]
    pub const fn doubled(self) -> Option<Self> {
        match self.0.checked_mul(2) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error produced when converting zero into a [`TokenValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("token values must be positive")]
pub struct ZeroTokenValue;

impl TryFrom<u64> for TokenValue {
    type Error = ZeroTokenValue;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ZeroTokenValue)
    }
}

impl From<TokenValue> for u64 {
    fn from(value: TokenValue) -> Self {
        value.0
    }
}

/// Real-world position expressed in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new position.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Geographic bounds of the region visible in a renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    /// Northern latitude edge.
    pub north: f64,
    /// Southern latitude edge.
    pub south: f64,
    /// Eastern longitude edge.
    pub east: f64,
    /// Western longitude edge.
    pub west: f64,
}

impl GeoBounds {
    /// Creates bounds from the four edges.
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }
}

/// Inclusive rectangle of cells `[i_min, i_max] x [j_min, j_max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRect {
    i_min: i32,
    i_max: i32,
    j_min: i32,
    j_max: i32,
}

impl CellRect {
    /// Creates a rectangle spanning the two corner cells in any order.
    #[must_use]
    pub fn spanning(a: CellCoord, b: CellCoord) -> Self {
        Self {
            i_min: a.i().min(b.i()),
            i_max: a.i().max(b.i()),
            j_min: a.j().min(b.j()),
            j_max: a.j().max(b.j()),
        }
    }

    /// Creates a square rectangle extending `radius` cells around `center`.
    #[must_use]
    pub fn around(center: CellCoord, radius: u32) -> Self {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        Self::spanning(
            center.offset(-radius, -radius),
            center.offset(radius, radius),
        )
    }

    /// Corner with the smallest indices.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        CellCoord::new(self.i_min, self.j_min)
    }

    /// Corner with the largest indices.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        CellCoord::new(self.i_max, self.j_max)
    }

    /// Reports whether the cell lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.i() >= self.i_min
            && cell.i() <= self.i_max
            && cell.j() >= self.j_min
            && cell.j() <= self.j_max
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let rows = u64::from(self.i_max.abs_diff(self.i_min)) + 1;
        let columns = u64::from(self.j_max.abs_diff(self.j_min)) + 1;
        rows.saturating_mul(columns)
    }

    /// Iterates the covered cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        let (j_min, j_max) = (self.j_min, self.j_max);
        (self.i_min..=self.i_max)
            .flat_map(move |i| (j_min..=j_max).map(move |j| CellCoord::new(i, j)))
    }
}

/// Mapping between real-world positions and grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Position that anchors cell `(0, 0)` and where new players start.
    pub origin: LatLng,
    /// Edge length of a cell in degrees.
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            origin: LatLng::new(36.997_936_938_057_016, -122.057_035_075_011_51),
            cell_size: 1e-4,
        }
    }
}

impl GridConfig {
    /// Derives the cell containing the provided position.
    #[must_use]
    pub fn cell_of(&self, position: LatLng) -> CellCoord {
        CellCoord::new(
            grid_index(position.lat - self.origin.lat, self.cell_size),
            grid_index(position.lng - self.origin.lng, self.cell_size),
        )
    }

    /// Derives the inclusive cell rectangle covering the provided bounds.
    #[must_use]
    pub fn rect_of(&self, bounds: GeoBounds) -> CellRect {
        let north_east = self.cell_of(LatLng::new(bounds.north, bounds.east));
        let south_west = self.cell_of(LatLng::new(bounds.south, bounds.west));
        CellRect::spanning(south_west, north_east)
    }

    /// Position at the centre of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> LatLng {
        LatLng::new(
            self.origin.lat + (f64::from(cell.i()) + 0.5) * self.cell_size,
            self.origin.lng + (f64::from(cell.j()) + 0.5) * self.cell_size,
        )
    }

    /// Displaces a position by one cell edge in the provided direction.
    #[must_use]
    pub fn step(&self, position: LatLng, direction: Direction) -> LatLng {
        let (di, dj) = direction.offset();
        LatLng::new(
            position.lat + f64::from(di) * self.cell_size,
            position.lng + f64::from(dj) * self.cell_size,
        )
    }
}

fn grid_index(offset: f64, cell_size: f64) -> i32 {
    let scaled = offset / cell_size;
    let nearest = scaled.round();
    let index = if (scaled - nearest).abs() < INDEX_TOLERANCE {
        nearest
    } else {
        scaled.floor()
    };
    // Float-to-int casts saturate and map NaN to zero.
    index as i32
}

/// Tunable gameplay parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Geometry of the cell grid.
    pub grid: GridConfig,
    /// Probability that a cell holds a token by default.
    pub spawn_probability: f64,
    /// Values a generated token may carry, drawn uniformly.
    pub token_values: Vec<u64>,
    /// Crafting a token of at least this value wins the game.
    pub win_value: u64,
    /// Maximum Chebyshev distance between the player and a clicked cell.
    pub interaction_radius: u32,
    /// Cells visible around the player for renderers without a real viewport.
    pub view_radius: u32,
    /// Optional cap on retained overrides; the least recently modified is evicted.
    pub override_capacity: Option<usize>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            spawn_probability: 0.1,
            token_values: vec![1, 2, 4, 8],
            win_value: 16,
            interaction_radius: 3,
            view_radius: 8,
            override_capacity: None,
        }
    }
}

/// Complete mutable game state exchanged between the world and persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSnapshot {
    /// Token held by the player.
    pub inventory: Option<TokenValue>,
    /// Real-world position of the player.
    pub position: LatLng,
    /// Every recorded override in coordinate order.
    pub overrides: Vec<(CellCoord, Option<TokenValue>)>,
}

impl GameSnapshot {
    /// Snapshot of a new game with the player standing at `position`.
    #[must_use]
    pub const fn fresh(position: LatLng) -> Self {
        Self {
            inventory: None,
            position,
            overrides: Vec::new(),
        }
    }
}

/// Status panel text describing the player's inventory.
#[must_use]
pub fn inventory_line(inventory: Option<TokenValue>) -> String {
    match inventory {
        None => "Inventory: Empty".to_owned(),
        Some(value) => format!("Inventory: Token with value {value}"),
    }
}

/// Human-readable one-line description of an event, if it warrants one.
#[must_use]
pub fn status_line(event: &Event) -> Option<String> {
    let line = match event {
        Event::TokenCollected { cell, value } => {
            format!("Collected a token with value {value} from cell {cell}.")
        }
        Event::TokenDropped { cell, value } => {
            format!("Dropped a token with value {value} into cell {cell}.")
        }
        Event::TokensCrafted { cell, value } => {
            format!("Crafted a token with value {value} in cell {cell}.")
        }
        Event::CellWasEmpty { cell } => format!("Cell {cell} is empty."),
        Event::InteractionRejected { cell, reason } => match reason {
            InteractionRejection::TooFar { distance, radius } => format!(
                "Cell {cell} is too far away ({distance} cells, reach is {radius})."
            ),
            InteractionRejection::Mismatch { held, found } => format!(
                "Cannot combine your token of value {held} with the token of value {found} in cell {cell}."
            ),
            InteractionRejection::ValueOverflow { value } => {
                format!("The token of value {value} in cell {cell} cannot be doubled any further.")
            }
        },
        Event::GameWon { value } => format!("You crafted a token of value {value}. You win!"),
        Event::WorldReset => "Game reset.".to_owned(),
        Event::PositionChanged { .. } | Event::CellContentChanged { .. } | Event::StateRestored => {
            return None
        }
    };
    Some(line)
}
