#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Viewport-driven cache of materialized cells.
//!
//! The cache remembers which cells currently have a marker in the renderer
//! and reconciles that set against the visible region whenever the view
//! changes. Only visual state is touched here; cell content is resolved
//! through a caller-supplied closure and never modified.

use std::collections::BTreeMap;

use geocache_core::{CellCoord, CellRect, GeoBounds, GridConfig, TokenValue};
use geocache_rendering::Renderer;

/// Default upper bound on the number of cells a single window may cover.
pub const DEFAULT_WINDOW_CELL_LIMIT: u64 = 65_536;

#[derive(Debug)]
struct Materialized<H> {
    handle: H,
    value: TokenValue,
}

/// Summary of the renderer calls issued by a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rectangle the cache now covers.
    pub window: CellRect,
    /// Markers created during the pass.
    pub materialized: usize,
    /// Markers destroyed during the pass.
    pub dematerialized: usize,
}

impl ReconcileReport {
    /// Reports whether the pass issued no renderer calls.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.materialized == 0 && self.dematerialized == 0
    }
}

/// Tracks render handles for cells inside the current window.
#[derive(Debug)]
pub struct ViewportCache<H> {
    materialized: BTreeMap<CellCoord, Materialized<H>>,
    window: Option<CellRect>,
    cell_limit: u64,
}

impl<H> Default for ViewportCache<H> {
    fn default() -> Self {
        Self::with_cell_limit(DEFAULT_WINDOW_CELL_LIMIT)
    }
}

impl<H> ViewportCache<H> {
    /// Creates an empty cache with the default window limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache whose windows never exceed `cell_limit` cells.
    ///
    /// Larger visible regions are shrunk to a square around their centre.
    #[must_use]
    pub fn with_cell_limit(cell_limit: u64) -> Self {
        Self {
            materialized: BTreeMap::new(),
            window: None,
            cell_limit: cell_limit.max(1),
        }
    }

    /// Rectangle covered by the last reconciliation, if any.
    #[must_use]
    pub const fn window(&self) -> Option<CellRect> {
        self.window
    }

    /// Value displayed for `cell`, if it is materialized.
    #[must_use]
    pub fn displayed(&self, cell: CellCoord) -> Option<TokenValue> {
        self.materialized.get(&cell).map(|entry| entry.value)
    }

    /// Number of materialized cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materialized.len()
    }

    /// Reports whether no cell is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materialized.is_empty()
    }

    /// Iterates materialized cells and their displayed values in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, TokenValue)> + '_ {
        self.materialized
            .iter()
            .map(|(cell, entry)| (*cell, entry.value))
    }

    /// Brings the materialized set in line with the visible `bounds`.
    ///
    /// Cells leaving the window are dematerialized, cells entering it are
    /// resolved and materialized when non-empty, and cells that stay inside
    /// keep their existing handle.
    pub fn reconcile<R, F>(
        &mut self,
        bounds: GeoBounds,
        grid: &GridConfig,
        mut resolve: F,
        renderer: &mut R,
    ) -> ReconcileReport
    where
        R: Renderer<Handle = H>,
        F: FnMut(CellCoord) -> Option<TokenValue>,
    {
        let window = self.limit_window(grid.rect_of(bounds));

        let departed: Vec<CellCoord> = self
            .materialized
            .keys()
            .copied()
            .filter(|cell| !window.contains(*cell))
            .collect();
        let dematerialized = departed.len();
        for cell in departed {
            if let Some(entry) = self.materialized.remove(&cell) {
                renderer.dematerialize(entry.handle);
            }
        }

        let mut materialized = 0;
        for cell in window.iter() {
            if self.materialized.contains_key(&cell) {
                continue;
            }
            if let Some(value) = resolve(cell) {
                let handle = renderer.materialize(cell, value);
                let _ = self.materialized.insert(cell, Materialized { handle, value });
                materialized += 1;
            }
        }

        self.window = Some(window);
        let report = ReconcileReport {
            window,
            materialized,
            dematerialized,
        };
        tracing::debug!(
            materialized,
            dematerialized,
            live = self.materialized.len(),
            "reconciled viewport"
        );
        report
    }

    /// Replaces the marker of `cell` so it shows `content`.
    ///
    /// Any existing marker is destroyed. A new one is created only for
    /// non-empty content inside the current window.
    pub fn update_cell_display<R>(
        &mut self,
        cell: CellCoord,
        content: Option<TokenValue>,
        renderer: &mut R,
    ) where
        R: Renderer<Handle = H>,
    {
        if let Some(entry) = self.materialized.remove(&cell) {
            renderer.dematerialize(entry.handle);
        }

        let Some(value) = content else {
            return;
        };
        if self.window.is_some_and(|window| window.contains(cell)) {
            let handle = renderer.materialize(cell, value);
            let _ = self.materialized.insert(cell, Materialized { handle, value });
        }
    }

    /// Dematerializes every cell and forgets the current window.
    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: Renderer<Handle = H>,
    {
        for (_, entry) in std::mem::take(&mut self.materialized) {
            renderer.dematerialize(entry.handle);
        }
        self.window = None;
    }

    fn limit_window(&self, window: CellRect) -> CellRect {
        if window.cell_count() <= self.cell_limit {
            return window;
        }

        let (min, max) = (window.min(), window.max());
        let center = CellCoord::new(midpoint(min.i(), max.i()), midpoint(min.j(), max.j()));
        let side = (self.cell_limit as f64).sqrt().floor() as u32;
        let radius = side.saturating_sub(1) / 2;
        tracing::warn!(
            requested = window.cell_count(),
            limit = self.cell_limit,
            "visible region too large, shrinking window"
        );
        CellRect::around(center, radius)
    }
}

fn midpoint(low: i32, high: i32) -> i32 {
    let sum = i64::from(low) + i64::from(high);
    // The mean of two i32 values always fits in i32.
    i32::try_from(sum.div_euclid(2)).unwrap_or(low)
}
