#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Geolocation collaborator contract for geocache adapters.
//!
//! Providers hand out subscriptions; the host delivers each position fix
//! the platform reports as a separate session input. Unsubscribing is
//! synchronous so no fix is accepted for a subscription once it is gone.

use std::collections::BTreeSet;

use geocache_core::LatLng;
use thiserror::Error;

/// Failure reported by a geolocation provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user refused access to their location.
    #[error("location permission was denied")]
    PermissionDenied,
    /// The platform could not determine a position.
    #[error("position is unavailable")]
    Unavailable,
    /// No fix arrived in time.
    #[error("timed out waiting for a position fix")]
    Timeout,
}

/// Identifier of an active position subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates an identifier from its numeric representation.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Source of real-world player positions.
pub trait GeolocationProvider {
    /// Starts watching the player's position.
    fn subscribe(&mut self) -> Result<SubscriptionId, GeolocationError>;

    /// Stops a watch started by [`GeolocationProvider::subscribe`].
    fn unsubscribe(&mut self, subscription: SubscriptionId);

    /// Requests a one-off position fix.
    fn current_position(&mut self) -> Result<LatLng, GeolocationError>;
}

/// Provider answering from a scripted fix, used by tests and the CLI.
#[derive(Clone, Debug, Default)]
pub struct ScriptedGeolocation {
    fix: Option<LatLng>,
    denied: bool,
    next_id: u64,
    active: BTreeSet<SubscriptionId>,
}

impl ScriptedGeolocation {
    /// Creates a provider that has no fix yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider reporting `fix` as the current position.
    #[must_use]
    pub fn with_fix(fix: LatLng) -> Self {
        Self {
            fix: Some(fix),
            ..Self::default()
        }
    }

    /// Replaces the position reported by [`GeolocationProvider::current_position`].
    pub fn set_fix(&mut self, fix: LatLng) {
        self.fix = Some(fix);
    }

    /// Makes every later request fail with [`GeolocationError::PermissionDenied`].
    pub fn deny(&mut self) {
        self.denied = true;
    }

    /// Reports whether `subscription` is still active.
    #[must_use]
    pub fn is_active(&self, subscription: SubscriptionId) -> bool {
        self.active.contains(&subscription)
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl GeolocationProvider for ScriptedGeolocation {
    fn subscribe(&mut self) -> Result<SubscriptionId, GeolocationError> {
        if self.denied {
            return Err(GeolocationError::PermissionDenied);
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let _ = self.active.insert(id);
        tracing::debug!(subscription = id.get(), "geolocation subscribed");
        Ok(id)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        if !self.active.remove(&subscription) {
            tracing::warn!(
                subscription = subscription.get(),
                "unsubscribe of unknown geolocation subscription"
            );
        }
    }

    fn current_position(&mut self) -> Result<LatLng, GeolocationError> {
        if self.denied {
            return Err(GeolocationError::PermissionDenied);
        }
        self.fix.ok_or(GeolocationError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriptions_are_distinct_and_removable() {
        let mut provider = ScriptedGeolocation::new();
        let first = provider.subscribe().expect("subscribe");
        let second = provider.subscribe().expect("subscribe");

        assert_ne!(first, second);
        provider.unsubscribe(first);
        assert!(!provider.is_active(first));
        assert!(provider.is_active(second));
        assert_eq!(provider.active_count(), 1);
    }

    #[test]
    fn current_position_reports_scripted_fix() {
        let mut provider = ScriptedGeolocation::new();
        assert_eq!(
            provider.current_position(),
            Err(GeolocationError::Unavailable)
        );

        provider.set_fix(LatLng::new(1.0, 2.0));
        assert_eq!(provider.current_position(), Ok(LatLng::new(1.0, 2.0)));
    }

    #[test]
    fn denial_blocks_everything() {
        let mut provider = ScriptedGeolocation::with_fix(LatLng::new(1.0, 2.0));
        provider.deny();

        assert_eq!(
            provider.subscribe(),
            Err(GeolocationError::PermissionDenied)
        );
        assert_eq!(
            provider.current_position(),
            Err(GeolocationError::PermissionDenied)
        );
    }
}
