use std::collections::HashMap;

use geocache_core::{
    CellCoord, Command, Event, GameConfig, InteractionRejection, LatLng, TokenValue,
};
use geocache_world::{
    self as world,
    generation::{DrawTag, Luck},
    query, World,
};

/// Luck that returns scripted draws for chosen cells and never spawns elsewhere.
#[derive(Debug, Default)]
struct ScriptedLuck {
    draws: HashMap<(CellCoord, DrawTag), f64>,
}

impl ScriptedLuck {
    fn with_token(mut self, cell: CellCoord, exists: f64, value: f64) -> Self {
        let _ = self.draws.insert((cell, DrawTag::HasToken), exists);
        let _ = self.draws.insert((cell, DrawTag::TokenValue), value);
        self
    }
}

impl Luck for ScriptedLuck {
    fn draw(&self, cell: CellCoord, tag: DrawTag) -> f64 {
        self.draws.get(&(cell, tag)).copied().unwrap_or(0.999)
    }
}

fn token(value: u64) -> TokenValue {
    TokenValue::new(value).expect("positive")
}

fn scenario_config(win_value: u64) -> GameConfig {
    GameConfig {
        spawn_probability: 0.1,
        token_values: vec![1, 2, 4, 8],
        win_value,
        interaction_radius: 3,
        ..GameConfig::default()
    }
}

fn world_at(config: GameConfig, luck: ScriptedLuck, player: CellCoord) -> World {
    let position = config.grid.cell_center(player);
    let mut world = World::with_luck(config, Box::new(luck));
    let mut events = Vec::new();
    world::apply(&mut world, Command::SetPosition { position }, &mut events);
    world
}

fn interact(world: &mut World, cell: CellCoord) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Interact { cell }, &mut events);
    events
}

#[test]
fn collect_scripted_token_at_five_five() {
    let cell = CellCoord::new(5, 5);
    let luck = ScriptedLuck::default().with_token(cell, 0.05, 0.6);
    let mut world = world_at(scenario_config(16), luck, CellCoord::new(4, 4));

    assert_eq!(query::resolve(&world, cell), Some(token(4)));

    let events = interact(&mut world, cell);

    assert_eq!(query::inventory(&world), Some(token(4)));
    assert_eq!(query::override_at(&world, cell), Some(None));
    assert_eq!(
        events,
        vec![
            Event::TokenCollected {
                cell,
                value: token(4)
            },
            Event::CellContentChanged {
                cell,
                content: None
            },
        ]
    );
}

#[test]
fn crafting_to_threshold_signals_win() {
    let source = CellCoord::new(5, 5);
    let target = CellCoord::new(6, 4);
    let luck = ScriptedLuck::default()
        .with_token(source, 0.05, 0.6)
        .with_token(target, 0.02, 0.55);
    let mut world = world_at(scenario_config(8), luck, CellCoord::new(5, 4));

    let _ = interact(&mut world, source);
    let events = interact(&mut world, target);

    assert_eq!(query::inventory(&world), None);
    assert_eq!(query::override_at(&world, target), Some(Some(token(8))));
    assert!(query::has_won(&world));
    assert_eq!(
        events,
        vec![
            Event::TokensCrafted {
                cell: target,
                value: token(8)
            },
            Event::GameWon { value: token(8) },
            Event::CellContentChanged {
                cell: target,
                content: Some(token(8))
            },
        ]
    );
}

#[test]
fn crafting_below_threshold_does_not_win() {
    let source = CellCoord::new(0, 1);
    let target = CellCoord::new(0, 2);
    let luck = ScriptedLuck::default()
        .with_token(source, 0.05, 0.3)
        .with_token(target, 0.05, 0.3);
    let mut world = world_at(scenario_config(16), luck, CellCoord::new(0, 0));

    let _ = interact(&mut world, source);
    let events = interact(&mut world, target);

    assert!(!query::has_won(&world));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::GameWon { .. })));
    assert_eq!(query::resolve(&world, target), Some(token(4)));
}

#[test]
fn mismatched_tokens_are_rejected_without_change() {
    let small = CellCoord::new(1, 1);
    let large = CellCoord::new(1, 2);
    let luck = ScriptedLuck::default()
        .with_token(small, 0.05, 0.3)
        .with_token(large, 0.05, 0.6);
    let mut world = world_at(scenario_config(16), luck, CellCoord::new(0, 0));

    let _ = interact(&mut world, small);
    assert_eq!(query::inventory(&world), Some(token(2)));

    let events = interact(&mut world, large);

    assert_eq!(query::inventory(&world), Some(token(2)));
    assert_eq!(query::override_at(&world, large), None);
    assert_eq!(query::resolve(&world, large), Some(token(4)));
    assert_eq!(
        events.first(),
        Some(&Event::InteractionRejected {
            cell: large,
            reason: InteractionRejection::Mismatch {
                held: token(2),
                found: token(4)
            }
        })
    );
}

#[test]
fn distant_cells_are_rejected_regardless_of_contents() {
    let far = CellCoord::new(10, 0);
    let luck = ScriptedLuck::default().with_token(far, 0.01, 0.1);
    let mut world = world_at(scenario_config(16), luck, CellCoord::new(0, 0));

    let events = interact(&mut world, far);

    assert_eq!(
        events,
        vec![Event::InteractionRejected {
            cell: far,
            reason: InteractionRejection::TooFar {
                distance: 10,
                radius: 3
            }
        }]
    );
    assert_eq!(query::inventory(&world), None);
    assert_eq!(query::override_count(&world), 0);
}

#[test]
fn dropping_into_empty_cell_moves_the_token() {
    let source = CellCoord::new(2, 2);
    let empty = CellCoord::new(-2, -2);
    let luck = ScriptedLuck::default().with_token(source, 0.05, 0.9);
    let mut world = world_at(scenario_config(16), luck, CellCoord::new(0, 0));

    let _ = interact(&mut world, source);
    let events = interact(&mut world, empty);

    assert_eq!(query::inventory(&world), None);
    assert_eq!(query::resolve(&world, empty), Some(token(8)));
    assert_eq!(
        events,
        vec![
            Event::TokenDropped {
                cell: empty,
                value: token(8)
            },
            Event::CellContentChanged {
                cell: empty,
                content: Some(token(8))
            },
        ]
    );
}

#[test]
fn empty_hands_on_empty_cell_reports_empty() {
    let mut world = world_at(
        scenario_config(16),
        ScriptedLuck::default(),
        CellCoord::new(0, 0),
    );

    let events = interact(&mut world, CellCoord::new(1, 0));

    assert_eq!(
        events.first(),
        Some(&Event::CellWasEmpty {
            cell: CellCoord::new(1, 0)
        })
    );
    assert_eq!(query::override_count(&world), 0);
}

#[test]
fn collected_cells_never_respawn() {
    let mut world = World::new(GameConfig::default());
    let cell = CellCoord::new(1, 2);
    assert_eq!(query::resolve(&world, cell), Some(token(8)));

    let _ = interact(&mut world, cell);

    for _ in 0..3 {
        assert_eq!(query::resolve(&world, cell), None);
    }
    assert_eq!(query::canonical_content(&world, cell), Some(token(8)));
}

#[test]
fn default_world_supports_crafting_to_victory() {
    let mut world = World::new(GameConfig::default());

    let _ = interact(&mut world, CellCoord::new(1, 2));
    let events = interact(&mut world, CellCoord::new(-3, -1));

    assert!(query::has_won(&world));
    assert!(events.contains(&Event::GameWon { value: token(16) }));
}

#[test]
fn restore_adopts_snapshot_and_reports_position() {
    let mut source = World::new(GameConfig::default());
    let _ = interact(&mut source, CellCoord::new(1, -1));
    let _ = interact(&mut source, CellCoord::new(0, 0));
    let snapshot = query::snapshot(&source);

    let mut restored = World::new(GameConfig::default());
    let mut events = Vec::new();
    world::apply(
        &mut restored,
        Command::Restore {
            snapshot: snapshot.clone(),
        },
        &mut events,
    );

    assert_eq!(query::snapshot(&restored), snapshot);
    for cell in [CellCoord::new(1, -1), CellCoord::new(0, 0)] {
        assert_eq!(query::resolve(&restored, cell), query::resolve(&source, cell));
    }
    assert_eq!(events.first(), Some(&Event::StateRestored));
    assert!(matches!(events.last(), Some(Event::PositionChanged { .. })));
}

#[test]
fn restore_with_non_finite_position_falls_back_to_origin() {
    let config = GameConfig::default();
    let origin = config.grid.origin;
    let mut world = World::new(config);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::Restore {
            snapshot: geocache_core::GameSnapshot::fresh(LatLng::new(f64::INFINITY, 1.0)),
        },
        &mut events,
    );

    assert_eq!(query::position(&world), origin);
}
