#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for geocache adapters.
//!
//! Renderers own the visual representation of cells. The engine only ever
//! asks them to create a marker for a cell, destroy a marker it created, report
//! the visible region and recentre on the player. Clicks and viewport changes
//! flow back into the engine as session inputs.

use std::collections::BTreeMap;

use geocache_core::{CellCoord, GeoBounds, LatLng, TokenValue};

/// Rendering backend capable of presenting geocache cells.
pub trait Renderer {
    /// Opaque marker identifier returned by [`Renderer::materialize`].
    type Handle;

    /// Creates the visual representation of a cell holding `value`.
    fn materialize(&mut self, cell: CellCoord, value: TokenValue) -> Self::Handle;

    /// Destroys a representation previously created by this renderer.
    fn dematerialize(&mut self, handle: Self::Handle);

    /// Geographic bounds of the region currently visible.
    fn visible_bounds(&self) -> GeoBounds;

    /// Recentres the view on the provided position.
    fn pan_to(&mut self, position: LatLng);
}

/// Tooltip shown on a materialized cell.
#[must_use]
pub fn cell_tooltip(cell: CellCoord, value: TokenValue) -> String {
    format!("Cell {cell}: token with value {value}")
}

/// Marker identifier allocated by [`RecordingRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(u64);

impl RenderHandle {
    /// Numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Renderer call captured by [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    /// A marker was created.
    Materialize {
        /// Cell the marker represents.
        cell: CellCoord,
        /// Value displayed by the marker.
        value: TokenValue,
        /// Handle allocated for the marker.
        handle: RenderHandle,
    },
    /// A marker was destroyed.
    Dematerialize {
        /// Cell the destroyed marker represented.
        cell: CellCoord,
        /// Handle of the destroyed marker.
        handle: RenderHandle,
    },
    /// The view was recentred.
    PanTo {
        /// New centre of the view.
        position: LatLng,
    },
}

/// Headless renderer that records every call and tracks live markers.
///
/// The visible region keeps a fixed span and follows [`Renderer::pan_to`].
#[derive(Clone, Debug)]
pub struct RecordingRenderer {
    half_height: f64,
    half_width: f64,
    center: LatLng,
    next_handle: u64,
    live: BTreeMap<RenderHandle, (CellCoord, TokenValue)>,
    calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    /// Creates a renderer centred on `center` spanning `half_height` degrees
    /// north and south and `half_width` degrees east and west.
    #[must_use]
    pub fn new(center: LatLng, half_height: f64, half_width: f64) -> Self {
        Self {
            half_height,
            half_width,
            center,
            next_handle: 0,
            live: BTreeMap::new(),
            calls: Vec::new(),
        }
    }

    /// Calls captured since creation or the last [`RecordingRenderer::take_calls`].
    #[must_use]
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Drains the captured calls.
    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    /// Markers currently alive, keyed by cell.
    #[must_use]
    pub fn live_cells(&self) -> BTreeMap<CellCoord, TokenValue> {
        self.live.values().copied().collect()
    }

    /// Number of markers currently alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Changes the span of the visible region, as a zoom would.
    pub fn resize(&mut self, half_height: f64, half_width: f64) {
        self.half_height = half_height;
        self.half_width = half_width;
    }
}

impl Renderer for RecordingRenderer {
    type Handle = RenderHandle;

    fn materialize(&mut self, cell: CellCoord, value: TokenValue) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        let _ = self.live.insert(handle, (cell, value));
        self.calls.push(RenderCall::Materialize {
            cell,
            value,
            handle,
        });
        handle
    }

    fn dematerialize(&mut self, handle: RenderHandle) {
        match self.live.remove(&handle) {
            Some((cell, _)) => self.calls.push(RenderCall::Dematerialize { cell, handle }),
            None => tracing::warn!(handle = handle.get(), "dematerialize of unknown handle"),
        }
    }

    fn visible_bounds(&self) -> GeoBounds {
        GeoBounds::new(
            self.center.lat + self.half_height,
            self.center.lat - self.half_height,
            self.center.lng + self.half_width,
            self.center.lng - self.half_width,
        )
    }

    fn pan_to(&mut self, position: LatLng) {
        self.center = position;
        self.calls.push(RenderCall::PanTo { position });
    }
}
