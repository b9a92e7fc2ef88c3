//! Decision table for a click on a cell given the player's single token slot.

use geocache_core::TokenValue;

/// Outcome of an interaction, decided before any state is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The cell is outside the interaction radius.
    TooFar {
        /// Chebyshev distance between the player cell and the target cell.
        distance: u32,
        /// Configured interaction radius.
        radius: u32,
    },
    /// Neither the player nor the cell holds a token.
    NothingHere,
    /// The held token moves into the empty cell.
    Drop {
        /// Value of the dropped token.
        value: TokenValue,
    },
    /// The cell's token moves into the empty inventory.
    Collect {
        /// Value of the collected token.
        value: TokenValue,
    },
    /// Matching tokens merge into one of double value left in the cell.
    Craft {
        /// Value of the crafted token.
        value: TokenValue,
    },
    /// Held and cell tokens differ.
    Mismatch {
        /// Value of the held token.
        held: TokenValue,
        /// Value of the cell token.
        found: TokenValue,
    },
    /// Matching tokens whose doubled value does not fit.
    Overflow {
        /// Value that could not be doubled.
        value: TokenValue,
    },
}

/// Resolves a click against the cell content and the held token.
///
/// `content` is only called once the cell is within `radius`, so an
/// out-of-reach click never resolves the cell.
#[must_use]
pub fn decide<F>(
    inventory: Option<TokenValue>,
    content: F,
    distance: u32,
    radius: u32,
) -> Decision
where
    F: FnOnce() -> Option<TokenValue>,
{
    if distance > radius {
        return Decision::TooFar { distance, radius };
    }

    match (inventory, content()) {
        (None, None) => Decision::NothingHere,
        (Some(value), None) => Decision::Drop { value },
        (None, Some(value)) => Decision::Collect { value },
        (Some(held), Some(found)) if held == found => match held.doubled() {
            Some(value) => Decision::Craft { value },
            None => Decision::Overflow { value: held },
        },
        (Some(held), Some(found)) => Decision::Mismatch { held, found },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: u64) -> Option<TokenValue> {
        TokenValue::new(value)
    }

    fn value(value: u64) -> TokenValue {
        TokenValue::new(value).expect("positive")
    }

    #[test]
    fn empty_hands_on_empty_cell_does_nothing() {
        assert_eq!(decide(None, || None, 0, 3), Decision::NothingHere);
    }

    #[test]
    fn held_token_drops_into_empty_cell() {
        assert_eq!(decide(token(2), || None, 1, 3), Decision::Drop { value: value(2) });
    }

    #[test]
    fn empty_hands_collect_cell_token() {
        assert_eq!(
            decide(None, || token(4), 3, 3),
            Decision::Collect { value: value(4) }
        );
    }

    #[test]
    fn matching_tokens_craft_double_value() {
        assert_eq!(
            decide(token(4), || token(4), 2, 3),
            Decision::Craft { value: value(8) }
        );
    }

    #[test]
    fn differing_tokens_mismatch() {
        assert_eq!(
            decide(token(2), || token(4), 0, 3),
            Decision::Mismatch {
                held: value(2),
                found: value(4)
            }
        );
    }

    #[test]
    fn proximity_is_checked_before_contents() {
        for inventory in [None, token(2)] {
            assert_eq!(
                decide(
                    inventory,
                    || unreachable!("cell resolved out of reach"),
                    10,
                    3
                ),
                Decision::TooFar {
                    distance: 10,
                    radius: 3
                }
            );
        }
    }

    #[test]
    fn doubling_past_range_is_refused() {
        let top = token(u64::MAX);
        assert_eq!(
            decide(top, || top, 0, 3),
            Decision::Overflow {
                value: value(u64::MAX)
            }
        );
    }
}
