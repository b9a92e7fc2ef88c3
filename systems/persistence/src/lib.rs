#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Durable storage of the geocache game state.
//!
//! The snapshot is written as three independent records so that a damaged
//! record only costs that part of the state. Loading never fails: every
//! record that is absent or malformed falls back to its fresh-game default.

pub mod store;
pub mod transfer;

use geocache_core::{CellCoord, GameSnapshot, LatLng, TokenValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::{KeyValueStore, StoreError};

/// Record holding the carried token as a JSON integer or `null`.
pub const INVENTORY_KEY: &str = "inventory";
/// Record holding the player position as `{"lat": .., "lng": ..}`.
pub const POSITION_KEY: &str = "position";
/// Record holding the override list as `[["i,j", value | null], ..]`.
pub const OVERRIDES_KEY: &str = "overrides";

/// Saves and restores game snapshots through a [`KeyValueStore`].
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    /// Wraps the provided store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Writes every record of `snapshot`, replacing the previous save.
    ///
    /// The records are handed to the store as one batch, so a failed save
    /// leaves the previous save whole.
    pub fn save(&mut self, snapshot: &GameSnapshot) -> Result<(), StoreError> {
        let inventory = serde_json::to_string(&snapshot.inventory.map(TokenValue::get))?;
        let position = serde_json::to_string(&snapshot.position)?;
        let overrides = serde_json::to_string(&override_records(&snapshot.overrides))?;

        self.store.set_strings(&[
            (INVENTORY_KEY, inventory.as_str()),
            (POSITION_KEY, position.as_str()),
            (OVERRIDES_KEY, overrides.as_str()),
        ])?;
        tracing::debug!(
            overrides = snapshot.overrides.len(),
            "saved game state"
        );
        Ok(())
    }

    /// Reads the saved snapshot.
    ///
    /// Missing or malformed records are replaced by their defaults: an empty
    /// inventory, `default_position` and no overrides. Malformed override
    /// entries are skipped one by one.
    #[must_use]
    pub fn load(&self, default_position: LatLng) -> GameSnapshot {
        let inventory = self
            .load_field::<Option<TokenValue>>(INVENTORY_KEY)
            .flatten();
        let position = self
            .load_field::<LatLng>(POSITION_KEY)
            .filter(|position| {
                let finite = position.is_finite();
                if !finite {
                    tracing::warn!(?position, "saved position is not finite, using default");
                }
                finite
            })
            .unwrap_or(default_position);
        let overrides = self
            .load_field::<Vec<Value>>(OVERRIDES_KEY)
            .map(parse_override_entries)
            .unwrap_or_default();

        GameSnapshot {
            inventory,
            position,
            overrides,
        }
    }

    /// Erases every saved record.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear_all()
    }

    fn load_field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_string(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key, %error, "could not read saved record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, %error, "saved record is malformed, using default");
                None
            }
        }
    }
}

pub(crate) fn override_records(
    overrides: &[(CellCoord, Option<TokenValue>)],
) -> Vec<(String, Option<u64>)> {
    overrides
        .iter()
        .map(|(cell, content)| (cell.to_string(), content.map(TokenValue::get)))
        .collect()
}

fn parse_override_entries(entries: Vec<Value>) -> Vec<(CellCoord, Option<TokenValue>)> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let (key, content) =
                match serde_json::from_value::<(String, Option<TokenValue>)>(entry) {
                    Ok(record) => record,
                    Err(error) => {
                        tracing::warn!(%error, "skipping malformed override entry");
                        return None;
                    }
                };
            match key.parse::<CellCoord>() {
                Ok(cell) => Some((cell, content)),
                Err(error) => {
                    tracing::warn!(%error, "skipping override entry with invalid cell key");
                    None
                }
            }
        })
        .collect()
}
