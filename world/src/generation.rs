//! Deterministic procedural content for cells the player never touched.
//!
//! Canonical content is never stored. Every lookup recomputes it from two
//! independent draws keyed by the cell coordinate and a stream tag, so the
//! same cell always yields the same token regardless of call order.

use std::fmt;

use geocache_core::{CellCoord, TokenValue};
use sha2::{Digest, Sha256};

/// Scale that maps the top 53 bits of a digest onto `[0, 1)`.
const UNIT_SCALE: f64 = (1u64 << 53) as f64;

/// Independent random streams drawn for every cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawTag {
    /// Decides whether the cell holds a token at all.
    HasToken,
    /// Selects the value of the token once existence succeeded.
    TokenValue,
}

impl DrawTag {
    /// Stream label mixed into the hash input.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::HasToken => "hasToken",
            Self::TokenValue => "tokenValue",
        }
    }
}

/// Stable pseudo-random function of a cell and a stream tag.
pub trait Luck: fmt::Debug {
    /// Returns a value in `[0, 1)` that depends only on `cell` and `tag`.
    fn draw(&self, cell: CellCoord, tag: DrawTag) -> f64;
}

/// [`Luck`] backed by SHA-256 over the text `"i,j,tag"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashLuck;

impl Luck for HashLuck {
    fn draw(&self, cell: CellCoord, tag: DrawTag) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(cell.to_string().as_bytes());
        hasher.update(b",");
        hasher.update(tag.key().as_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[0..8]);
        (u64::from_le_bytes(prefix) >> 11) as f64 / UNIT_SCALE
    }
}

/// Pure mapping from a cell coordinate to its canonical content.
#[derive(Debug)]
pub struct Generator {
    luck: Box<dyn Luck>,
    spawn_probability: f64,
    token_values: Vec<TokenValue>,
}

impl Generator {
    /// Creates a generator drawing from `luck`.
    ///
    /// Zero entries in `token_values` are discarded. With no remaining values
    /// every cell is empty.
    #[must_use]
    pub fn new(luck: Box<dyn Luck>, spawn_probability: f64, token_values: &[u64]) -> Self {
        Self {
            luck,
            spawn_probability,
            token_values: token_values
                .iter()
                .copied()
                .filter_map(TokenValue::new)
                .collect(),
        }
    }

    /// Canonical content of `cell` absent any player mutation.
    #[must_use]
    pub fn canonical_content(&self, cell: CellCoord) -> Option<TokenValue> {
        if self.token_values.is_empty() {
            return None;
        }
        if self.luck.draw(cell, DrawTag::HasToken) >= self.spawn_probability {
            return None;
        }

        let draw = self.luck.draw(cell, DrawTag::TokenValue);
        let scaled = (draw * self.token_values.len() as f64).floor();
        let index = (scaled.max(0.0) as usize).min(self.token_values.len() - 1);
        Some(self.token_values[index])
    }
}
