//! Text renderer presenting the cells around the player.

use std::collections::BTreeMap;

use geocache_core::{CellCoord, GeoBounds, GridConfig, LatLng, TokenValue, PLAYER_TOOLTIP};
use geocache_rendering::{cell_tooltip, Renderer};

/// Marker identifier handed out by [`TerminalRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MarkerId(u64);

/// Renderer whose viewport spans `view_radius` cells around the player's cell.
#[derive(Debug)]
pub(crate) struct TerminalRenderer {
    grid: GridConfig,
    half_extent: f64,
    player: CellCoord,
    next_marker: u64,
    markers: BTreeMap<MarkerId, (CellCoord, TokenValue)>,
}

impl TerminalRenderer {
    pub(crate) fn new(grid: GridConfig, view_radius: u32) -> Self {
        // Stops just short of the outer cell edges so the window never
        // spills into the next ring of cells.
        let half_extent = (f64::from(view_radius) + 0.499) * grid.cell_size;
        Self {
            player: grid.cell_of(grid.origin),
            grid,
            half_extent,
            next_marker: 0,
            markers: BTreeMap::new(),
        }
    }

    /// Describes the player and every visible token, nearest rows first.
    pub(crate) fn describe(&self) -> Vec<String> {
        let player = self.player;
        let mut visible: Vec<(CellCoord, TokenValue)> = self.markers.values().copied().collect();
        visible.sort_by_key(|(cell, _)| (cell.chebyshev_distance(player), *cell));

        let mut lines = vec![format!("Cell {player}: {PLAYER_TOOLTIP}")];
        if visible.is_empty() {
            lines.push("No tokens in sight.".to_owned());
        }
        lines.extend(
            visible
                .into_iter()
                .map(|(cell, value)| cell_tooltip(cell, value)),
        );
        lines
    }
}

impl Renderer for TerminalRenderer {
    type Handle = MarkerId;

    fn materialize(&mut self, cell: CellCoord, value: TokenValue) -> MarkerId {
        let marker = MarkerId(self.next_marker);
        self.next_marker += 1;
        let _ = self.markers.insert(marker, (cell, value));
        tracing::debug!(marker = marker.0, %cell, %value, "materialize");
        marker
    }

    fn dematerialize(&mut self, marker: MarkerId) {
        if let Some((cell, _)) = self.markers.remove(&marker) {
            tracing::debug!(marker = marker.0, %cell, "dematerialize");
        }
    }

    fn visible_bounds(&self) -> GeoBounds {
        let center = self.grid.cell_center(self.player);
        GeoBounds::new(
            center.lat + self.half_extent,
            center.lat - self.half_extent,
            center.lng + self.half_extent,
            center.lng - self.half_extent,
        )
    }

    fn pan_to(&mut self, position: LatLng) {
        self.player = self.grid.cell_of(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridConfig {
        GridConfig {
            origin: LatLng::new(0.0, 0.0),
            cell_size: 1.0,
        }
    }

    #[test]
    fn viewport_covers_view_radius_around_player() {
        let mut renderer = TerminalRenderer::new(grid(), 2);
        renderer.pan_to(LatLng::new(5.0, -5.0));

        let window = grid().rect_of(renderer.visible_bounds());

        assert_eq!(window.min(), CellCoord::new(3, -7));
        assert_eq!(window.max(), CellCoord::new(7, -3));
    }

    #[test]
    fn describe_lists_player_then_nearest_tokens() {
        let mut renderer = TerminalRenderer::new(grid(), 3);
        renderer.pan_to(grid().cell_center(CellCoord::new(0, 0)));
        let eight = TokenValue::new(8).expect("positive");
        let two = TokenValue::new(2).expect("positive");
        let far = renderer.materialize(CellCoord::new(3, 3), eight);
        let _ = renderer.materialize(CellCoord::new(1, 0), two);

        assert_eq!(
            renderer.describe(),
            vec![
                "Cell 0,0: That's you!".to_owned(),
                "Cell 1,0: token with value 2".to_owned(),
                "Cell 3,3: token with value 8".to_owned(),
            ]
        );

        renderer.dematerialize(far);
        assert_eq!(renderer.describe().len(), 2);
    }

    #[test]
    fn empty_view_says_so() {
        let renderer = TerminalRenderer::new(grid(), 1);
        assert_eq!(renderer.describe()[1], "No tokens in sight.");
    }
}
