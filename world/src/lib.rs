#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for the geocache engine.
//!
//! The world owns the player's inventory and position together with the
//! override layer that records every cell the player changed. Cell content
//! resolves through the override layer first and falls back to the
//! deterministic generator. All mutation happens inside [`apply`].

pub mod generation;
pub mod interaction;
pub mod overrides;

use geocache_core::{
    CellCoord, Command, Event, GameConfig, GameSnapshot, InteractionRejection, LatLng, TokenValue,
};

use crate::{
    generation::{Generator, HashLuck, Luck},
    interaction::{decide, Decision},
    overrides::OverrideStore,
};

/// Represents the authoritative geocache world state.
#[derive(Debug)]
pub struct World {
    config: GameConfig,
    generator: Generator,
    overrides: OverrideStore,
    inventory: Option<TokenValue>,
    position: LatLng,
    won: bool,
}

impl World {
    /// Creates a fresh world with the player standing at the grid origin.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self::with_luck(config, Box::new(HashLuck))
    }

    /// Creates a fresh world whose canonical content draws from `luck`.
    #[must_use]
    pub fn with_luck(config: GameConfig, luck: Box<dyn Luck>) -> Self {
        let generator = Generator::new(luck, config.spawn_probability, &config.token_values);
        let overrides =
            OverrideStore::with_capacity_limit(config.override_capacity.map(|cap| cap.max(1)));
        let position = config.grid.origin;
        Self {
            config,
            generator,
            overrides,
            inventory: None,
            position,
            won: false,
        }
    }

    fn resolve(&self, cell: CellCoord) -> Option<TokenValue> {
        match self.overrides.get(cell) {
            Some(content) => content,
            None => self.generator.canonical_content(cell),
        }
    }

    fn player_cell(&self) -> CellCoord {
        self.config.grid.cell_of(self.position)
    }

    fn move_to(&mut self, position: LatLng, out_events: &mut Vec<Event>) {
        if !position.is_finite() {
            tracing::warn!(?position, "ignoring non-finite player position");
            return;
        }
        self.position = position;
        out_events.push(Event::PositionChanged {
            position,
            cell: self.player_cell(),
        });
    }

    fn record_override(
        &mut self,
        cell: CellCoord,
        content: Option<TokenValue>,
        evicted: &mut Vec<CellCoord>,
    ) {
        if let Some(cell) = self.overrides.set(cell, content) {
            evicted.push(cell);
        }
    }

    fn interact(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let distance = self.player_cell().chebyshev_distance(cell);
        let decision = decide(
            self.inventory,
            || self.resolve(cell),
            distance,
            self.config.interaction_radius,
        );
        tracing::debug!(%cell, ?decision, "resolved interaction");

        let mut evicted = Vec::new();
        let content = match decision {
            Decision::TooFar { distance, radius } => {
                out_events.push(Event::InteractionRejected {
                    cell,
                    reason: InteractionRejection::TooFar { distance, radius },
                });
                return;
            }
            Decision::NothingHere => {
                out_events.push(Event::CellWasEmpty { cell });
                None
            }
            Decision::Drop { value } => {
                self.record_override(cell, Some(value), &mut evicted);
                self.inventory = None;
                out_events.push(Event::TokenDropped { cell, value });
                Some(value)
            }
            Decision::Collect { value } => {
                self.record_override(cell, None, &mut evicted);
                self.inventory = Some(value);
                out_events.push(Event::TokenCollected { cell, value });
                None
            }
            Decision::Craft { value } => {
                self.record_override(cell, Some(value), &mut evicted);
                self.inventory = None;
                out_events.push(Event::TokensCrafted { cell, value });
                if value.get() >= self.config.win_value {
                    self.won = true;
                    tracing::info!(%cell, %value, "winning token crafted");
                    out_events.push(Event::GameWon { value });
                }
                Some(value)
            }
            Decision::Mismatch { held, found } => {
                out_events.push(Event::InteractionRejected {
                    cell,
                    reason: InteractionRejection::Mismatch { held, found },
                });
                Some(found)
            }
            Decision::Overflow { value } => {
                out_events.push(Event::InteractionRejected {
                    cell,
                    reason: InteractionRejection::ValueOverflow { value },
                });
                Some(value)
            }
        };

        out_events.push(Event::CellContentChanged { cell, content });

        for cell in evicted {
            out_events.push(Event::CellContentChanged {
                cell,
                content: self.generator.canonical_content(cell),
            });
        }
    }

    fn restore(&mut self, snapshot: GameSnapshot, out_events: &mut Vec<Event>) {
        self.overrides.clear();
        let mut evicted = Vec::new();
        for (cell, content) in snapshot.overrides {
            self.record_override(cell, content, &mut evicted);
        }
        if !evicted.is_empty() {
            tracing::warn!(
                dropped = evicted.len(),
                "restored overrides exceed the configured capacity"
            );
        }
        self.inventory = snapshot.inventory;
        self.won = false;
        out_events.push(Event::StateRestored);

        let position = if snapshot.position.is_finite() {
            snapshot.position
        } else {
            self.config.grid.origin
        };
        self.move_to(position, out_events);
    }

    fn reset(&mut self, position: LatLng, out_events: &mut Vec<Event>) {
        self.overrides.clear();
        self.inventory = None;
        self.won = false;
        tracing::info!("world reset");
        out_events.push(Event::WorldReset);

        let position = if position.is_finite() {
            position
        } else {
            self.config.grid.origin
        };
        self.move_to(position, out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Interact { cell } => world.interact(cell, out_events),
        Command::MovePlayer { direction } => {
            let position = world.config.grid.step(world.position, direction);
            world.move_to(position, out_events);
        }
        Command::SetPosition { position } => world.move_to(position, out_events),
        Command::Restore { snapshot } => world.restore(snapshot, out_events),
        Command::Reset { position } => world.reset(position, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use geocache_core::{CellCoord, GameConfig, GameSnapshot, LatLng, TokenValue};

    use super::World;

    /// Content of `cell`, consulting overrides before the generator.
    #[must_use]
    pub fn resolve(world: &World, cell: CellCoord) -> Option<TokenValue> {
        world.resolve(cell)
    }

    /// Recorded override for `cell`, if the player ever changed it.
    #[must_use]
    pub fn override_at(world: &World, cell: CellCoord) -> Option<Option<TokenValue>> {
        world.overrides.get(cell)
    }

    /// Content the generator assigns to `cell`, ignoring overrides.
    #[must_use]
    pub fn canonical_content(world: &World, cell: CellCoord) -> Option<TokenValue> {
        world.generator.canonical_content(cell)
    }

    /// Number of recorded overrides.
    #[must_use]
    pub fn override_count(world: &World) -> usize {
        world.overrides.len()
    }

    /// Token held by the player.
    #[must_use]
    pub fn inventory(world: &World) -> Option<TokenValue> {
        world.inventory
    }

    /// Real-world position of the player.
    #[must_use]
    pub fn position(world: &World) -> LatLng {
        world.position
    }

    /// Cell containing the player.
    #[must_use]
    pub fn player_cell(world: &World) -> CellCoord {
        world.player_cell()
    }

    /// Gameplay parameters the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Reports whether a winning token was crafted since the last restore or reset.
    #[must_use]
    pub fn has_won(world: &World) -> bool {
        world.won
    }

    /// Captures the complete mutable state for persistence.
    #[must_use]
    pub fn snapshot(world: &World) -> GameSnapshot {
        GameSnapshot {
            inventory: world.inventory,
            position: world.position,
            overrides: world.overrides.iter().collect(),
        }
    }
}
