use std::collections::BTreeMap;

use geocache_core::{CellCoord, GeoBounds, GridConfig, LatLng, TokenValue};
use geocache_rendering::{RecordingRenderer, RenderCall, RenderHandle, Renderer};
use geocache_system_viewport::ViewportCache;

fn unit_grid() -> GridConfig {
    GridConfig {
        origin: LatLng::new(0.0, 0.0),
        cell_size: 1.0,
    }
}

fn token(value: u64) -> TokenValue {
    TokenValue::new(value).expect("positive")
}

/// Renderer viewing cells `[-2, 2] x [-2, 2]` around the centre of cell `(0, 0)`.
fn renderer() -> RecordingRenderer {
    RecordingRenderer::new(LatLng::new(0.5, 0.5), 2.0, 2.0)
}

fn contents() -> BTreeMap<CellCoord, TokenValue> {
    [
        (CellCoord::new(0, 0), token(1)),
        (CellCoord::new(2, -2), token(4)),
        (CellCoord::new(-2, 1), token(2)),
        (CellCoord::new(3, 0), token(8)),
        (CellCoord::new(-10, -10), token(8)),
    ]
    .into_iter()
    .collect()
}

fn reconcile(
    cache: &mut ViewportCache<RenderHandle>,
    renderer: &mut RecordingRenderer,
    contents: &BTreeMap<CellCoord, TokenValue>,
) -> geocache_system_viewport::ReconcileReport {
    let bounds = renderer.visible_bounds();
    cache.reconcile(
        bounds,
        &unit_grid(),
        |cell| contents.get(&cell).copied(),
        renderer,
    )
}

#[test]
fn first_pass_materializes_visible_tokens_only() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();

    let report = reconcile(&mut cache, &mut renderer, &contents);

    assert_eq!(report.materialized, 3);
    assert_eq!(report.dematerialized, 0);
    assert_eq!(report.window.min(), CellCoord::new(-2, -2));
    assert_eq!(report.window.max(), CellCoord::new(2, 2));
    let expected: BTreeMap<CellCoord, TokenValue> = [
        (CellCoord::new(0, 0), token(1)),
        (CellCoord::new(2, -2), token(4)),
        (CellCoord::new(-2, 1), token(2)),
    ]
    .into_iter()
    .collect();
    assert_eq!(renderer.live_cells(), expected);
    assert_eq!(cache.iter().collect::<BTreeMap<_, _>>(), expected);
}

#[test]
fn second_pass_over_same_window_is_a_noop() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();

    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let _ = renderer.take_calls();
    let report = reconcile(&mut cache, &mut renderer, &contents);

    assert!(report.is_noop());
    assert!(
        renderer.calls().is_empty(),
        "unchanged window must not churn the renderer: {:?}",
        renderer.calls()
    );
}

#[test]
fn materialized_cells_are_not_resolved_again() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);

    let mut resolved = Vec::new();
    let bounds = renderer.visible_bounds();
    let _ = cache.reconcile(
        bounds,
        &unit_grid(),
        |cell| {
            resolved.push(cell);
            contents.get(&cell).copied()
        },
        &mut renderer,
    );

    assert!(!resolved.contains(&CellCoord::new(0, 0)));
    assert_eq!(resolved.len(), 25 - 3);
}

#[test]
fn panning_swaps_only_the_edges() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let kept_handle = renderer
        .calls()
        .iter()
        .find_map(|call| match call {
            RenderCall::Materialize { cell, handle, .. } if *cell == CellCoord::new(0, 0) => {
                Some(*handle)
            }
            _ => None,
        })
        .expect("origin cell materialized");

    renderer.pan_to(LatLng::new(1.5, 0.5));
    let _ = renderer.take_calls();
    let report = reconcile(&mut cache, &mut renderer, &contents);

    assert_eq!(report.window.min(), CellCoord::new(-1, -2));
    assert_eq!(report.window.max(), CellCoord::new(3, 2));
    assert_eq!(report.dematerialized, 1);
    assert_eq!(report.materialized, 1);
    assert_eq!(renderer.calls().len(), 2);
    assert!(renderer.calls().iter().any(|call| matches!(
        call,
        RenderCall::Dematerialize { cell, .. } if *cell == CellCoord::new(-2, 1)
    )));
    assert!(renderer.calls().iter().any(|call| matches!(
        call,
        RenderCall::Materialize { cell, value, .. } if *cell == CellCoord::new(3, 0) && *value == token(8)
    )));
    assert!(!renderer.calls().iter().any(|call| matches!(
        call,
        RenderCall::Dematerialize { handle, .. } if *handle == kept_handle
    )));
}

#[test]
fn update_replaces_marker_with_new_value() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let _ = renderer.take_calls();
    let cell = CellCoord::new(0, 0);

    cache.update_cell_display(cell, Some(token(2)), &mut renderer);

    let calls = renderer.take_calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], RenderCall::Dematerialize { cell: c, .. } if c == cell));
    assert!(matches!(
        calls[1],
        RenderCall::Materialize { cell: c, value, .. } if c == cell && value == token(2)
    ));
    assert_eq!(cache.displayed(cell), Some(token(2)));
}

#[test]
fn update_to_empty_only_removes_marker() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let _ = renderer.take_calls();
    let cell = CellCoord::new(2, -2);

    cache.update_cell_display(cell, None, &mut renderer);

    let calls = renderer.take_calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], RenderCall::Dematerialize { cell: c, .. } if c == cell));
    assert_eq!(cache.displayed(cell), None);
    assert_eq!(cache.len(), 2);
}

#[test]
fn update_of_unmaterialized_visible_cell_creates_marker() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let _ = renderer.take_calls();
    let cell = CellCoord::new(1, 1);

    cache.update_cell_display(cell, Some(token(4)), &mut renderer);

    assert_eq!(renderer.take_calls().len(), 1);
    assert_eq!(cache.displayed(cell), Some(token(4)));
}

#[test]
fn update_outside_window_never_materializes() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);
    let _ = renderer.take_calls();

    cache.update_cell_display(CellCoord::new(9, 9), Some(token(4)), &mut renderer);

    assert!(renderer.calls().is_empty());
    assert_eq!(cache.displayed(CellCoord::new(9, 9)), None);
}

#[test]
fn clear_dematerializes_everything() {
    let mut cache = ViewportCache::new();
    let mut renderer = renderer();
    let contents = contents();
    let _ = reconcile(&mut cache, &mut renderer, &contents);

    cache.clear(&mut renderer);

    assert!(cache.is_empty());
    assert_eq!(cache.window(), None);
    assert_eq!(renderer.live_count(), 0);
}

#[test]
fn oversized_region_is_shrunk_around_its_centre() {
    let mut cache = ViewportCache::with_cell_limit(25);
    let mut renderer = RecordingRenderer::new(LatLng::new(0.5, 0.5), 1_000.0, 1_000.0);

    let bounds = renderer.visible_bounds();
    let report = cache.reconcile(bounds, &unit_grid(), |_| None, &mut renderer);

    assert_eq!(report.window.cell_count(), 25);
    assert_eq!(report.window.min(), CellCoord::new(-2, -2));
    assert_eq!(report.window.max(), CellCoord::new(2, 2));
}

#[test]
fn region_spanning_the_whole_grid_is_shrunk() {
    let mut cache = ViewportCache::with_cell_limit(25);
    let mut renderer = renderer();
    let mut resolved = 0;

    let bounds = GeoBounds::new(1e10, -1e10, 1e10, -1e10);
    let report = cache.reconcile(
        bounds,
        &unit_grid(),
        |_| {
            resolved += 1;
            None
        },
        &mut renderer,
    );

    assert_eq!(report.window.cell_count(), 25);
    assert_eq!(report.window.min(), CellCoord::new(-3, -3));
    assert_eq!(report.window.max(), CellCoord::new(1, 1));
    assert_eq!(resolved, 25);
}
