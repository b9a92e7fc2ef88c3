#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session controller that routes inbound inputs through the world reducer.
//!
//! The session owns the world together with the viewport cache and the
//! rendering, geolocation and storage collaborators. Each input is handled
//! to completion before the next one is accepted: the reducer runs, status
//! lines are collected, affected cells are redrawn, the state is saved when
//! it changed, and the view follows the player when they moved.

use geocache_core::{
    status_line, CellCoord, Command, Direction, Event, GameConfig, GameSnapshot, LatLng,
};
use geocache_geolocation::{GeolocationError, GeolocationProvider, SubscriptionId};
use geocache_rendering::Renderer;
use geocache_system_persistence::{store::KeyValueStore, Persistence};
use geocache_system_viewport::{ReconcileReport, ViewportCache};
use geocache_world::{self as world, query, World};

/// External stimulus delivered to a [`Session`].
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// The player clicked a cell on the map.
    CellClicked {
        /// Cell that was clicked.
        cell: CellCoord,
    },
    /// The renderer's visible region changed.
    ViewportChanged,
    /// The geolocation provider reported a new fix.
    GeolocationUpdate {
        /// Subscription the fix was delivered for.
        subscription: SubscriptionId,
        /// Reported position.
        position: LatLng,
    },
    /// The geolocation provider reported an error.
    GeolocationFailed {
        /// Failure reported by the provider.
        error: GeolocationError,
    },
    /// The player moved one cell by hand.
    Move(Direction),
    /// The player toggled automatic position tracking.
    ToggleGps,
    /// The player asked to start over.
    Reset,
    /// The player imported a previously exported save.
    Import(GameSnapshot),
}

/// Controller owning the world and its collaborators.
pub struct Session<R, G, S>
where
    R: Renderer,
{
    world: World,
    cache: ViewportCache<R::Handle>,
    renderer: R,
    geolocation: G,
    persistence: Persistence<S>,
    gps: Option<SubscriptionId>,
}

impl<R, G, S> Session<R, G, S>
where
    R: Renderer,
    G: GeolocationProvider,
    S: KeyValueStore,
{
    /// Starts a session for `config`, resuming whatever `store` holds.
    #[must_use]
    pub fn start(config: GameConfig, renderer: R, geolocation: G, store: S) -> Self {
        Self::start_with_world(World::new(config), renderer, geolocation, store)
    }

    /// Starts a session around a prepared world, resuming whatever `store` holds.
    ///
    /// The saved snapshot replaces the world's mutable state, the renderer is
    /// centred on the player and the visible region is materialized.
    #[must_use]
    pub fn start_with_world(world: World, renderer: R, geolocation: G, store: S) -> Self {
        let persistence = Persistence::new(store);
        let snapshot = persistence.load(query::config(&world).grid.origin);
        let mut session = Self {
            world,
            cache: ViewportCache::new(),
            renderer,
            geolocation,
            persistence,
            gps: None,
        };
        let _ = session.run(Command::Restore { snapshot }, false);
        tracing::info!(
            overrides = query::override_count(&session.world),
            cell = %query::player_cell(&session.world),
            "session started"
        );
        session
    }

    /// Processes a single input and returns the status lines it produced.
    pub fn handle(&mut self, input: Input) -> Vec<String> {
        match input {
            Input::CellClicked { cell } => self.run(Command::Interact { cell }, true),
            Input::ViewportChanged => {
                let _ = self.reconcile();
                Vec::new()
            }
            Input::GeolocationUpdate {
                subscription,
                position,
            } => {
                if self.gps != Some(subscription) {
                    tracing::debug!(
                        subscription = subscription.get(),
                        "discarding fix for inactive subscription"
                    );
                    return Vec::new();
                }
                self.run(Command::SetPosition { position }, true)
            }
            Input::GeolocationFailed { error } => {
                tracing::warn!(%error, "geolocation failed, keeping last known position");
                vec![format!("Location unavailable: {error}.")]
            }
            Input::Move(direction) => self.run(Command::MovePlayer { direction }, true),
            Input::ToggleGps => self.toggle_gps(),
            Input::Reset => self.reset(),
            Input::Import(snapshot) => {
                self.cache.clear(&mut self.renderer);
                let mut lines = self.run(Command::Restore { snapshot }, true);
                lines.push("Save imported.".to_owned());
                lines
            }
        }
    }

    /// Authoritative world state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Viewport cache tracking materialized cells.
    #[must_use]
    pub const fn cache(&self) -> &ViewportCache<R::Handle> {
        &self.cache
    }

    /// Rendering collaborator.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the rendering collaborator, for zooms and resizes.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Geolocation collaborator.
    #[must_use]
    pub const fn geolocation(&self) -> &G {
        &self.geolocation
    }

    /// Mutable access to the geolocation collaborator.
    pub fn geolocation_mut(&mut self) -> &mut G {
        &mut self.geolocation
    }

    /// Durable store holding the save.
    #[must_use]
    pub const fn store(&self) -> &S {
        self.persistence.store()
    }

    /// Active position subscription, if tracking is on.
    #[must_use]
    pub const fn gps_subscription(&self) -> Option<SubscriptionId> {
        self.gps
    }

    fn run(&mut self, command: Command, persist: bool) -> Vec<String> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut lines = Vec::new();
        let mut dirty = false;
        let mut moved_to = None;
        for event in &events {
            if let Some(line) = status_line(event) {
                lines.push(line);
            }
            match event {
                Event::CellContentChanged { cell, content } => {
                    self.cache.update_cell_display(*cell, *content, &mut self.renderer);
                }
                Event::PositionChanged { position, .. } => moved_to = Some(*position),
                _ => {}
            }
            dirty |= event.mutates_state();
        }

        if dirty && persist {
            self.save();
        }
        if let Some(position) = moved_to {
            self.renderer.pan_to(position);
            let _ = self.reconcile();
        }
        lines
    }

    fn save(&mut self) {
        let snapshot = query::snapshot(&self.world);
        if let Err(error) = self.persistence.save(&snapshot) {
            tracing::warn!(%error, "could not save game state");
        }
    }

    fn reconcile(&mut self) -> ReconcileReport {
        let bounds = self.renderer.visible_bounds();
        let world = &self.world;
        self.cache.reconcile(
            bounds,
            &query::config(world).grid,
            |cell| query::resolve(world, cell),
            &mut self.renderer,
        )
    }

    fn toggle_gps(&mut self) -> Vec<String> {
        if let Some(subscription) = self.gps.take() {
            self.geolocation.unsubscribe(subscription);
            tracing::info!("position tracking disabled");
            return vec!["GPS tracking off.".to_owned()];
        }

        match self.geolocation.subscribe() {
            Ok(subscription) => {
                self.gps = Some(subscription);
                tracing::info!(subscription = subscription.get(), "position tracking enabled");
                let mut lines = vec!["GPS tracking on.".to_owned()];
                match self.geolocation.current_position() {
                    Ok(position) => {
                        lines.extend(self.run(Command::SetPosition { position }, true));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "no initial fix, keeping last known position");
                    }
                }
                lines
            }
            Err(error) => {
                tracing::warn!(%error, "could not start position tracking");
                vec![format!("GPS unavailable: {error}.")]
            }
        }
    }

    fn reset(&mut self) -> Vec<String> {
        if let Some(subscription) = self.gps.take() {
            self.geolocation.unsubscribe(subscription);
        }
        if let Err(error) = self.persistence.clear() {
            tracing::warn!(%error, "could not clear saved game state");
        }
        self.cache.clear(&mut self.renderer);

        let position = match self.geolocation.current_position() {
            Ok(position) => position,
            Err(error) => {
                tracing::warn!(%error, "no fix for reset, starting at the origin");
                query::config(&self.world).grid.origin
            }
        };
        self.run(Command::Reset { position }, false)
    }
}
