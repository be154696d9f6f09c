//! Match phases and the registry that tracks the active one.
//!
//! Phases are registered once while the arena is set up and are never removed.
//! Nothing inside the registry moves between phases on its own; the driver of
//! the match calls [`StateRegistry::transition_to`] or
//! [`StateRegistry::advance`].

use crate::error::{ArenaError, ArenaResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A named stage of the match lifecycle.
pub trait MatchPhase: Send + Sync {
    /// Unique name of the phase, e.g. `"waiting"` or `"ingame"`.
    fn name(&self) -> &str;

    /// Whether players may connect while this phase is current.
    fn accepts_new_players(&self) -> bool;

    /// Called when the phase becomes current.
    fn on_enter(&self) {}

    /// Called when another phase replaces this one.
    fn on_leave(&self) {}
}

/// Plain data phase used when no enter/leave behaviour is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    name: String,
    accepts_new_players: bool,
}

impl Phase {
    pub fn new(name: impl Into<String>, accepts_new_players: bool) -> Self {
        Self {
            name: name.into(),
            accepts_new_players,
        }
    }
}

impl MatchPhase for Phase {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_new_players(&self) -> bool {
        self.accepts_new_players
    }
}

/// Ordered collection of phases plus the index of the current one.
#[derive(Default)]
pub struct StateRegistry {
    phases: Vec<Arc<dyn MatchPhase>>,
    current: Option<usize>,
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.phases.iter().map(|phase| phase.name()).collect();
        f.debug_struct("StateRegistry")
            .field("phases", &names)
            .field("current", &self.current().map(|phase| phase.name().to_string()))
            .finish()
    }
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a phase.
    ///
    /// A phase whose name is already registered is ignored and `false` is
    /// returned; the first registration keeps its position.
    pub fn register(&mut self, phase: Arc<dyn MatchPhase>) -> bool {
        if self.position(phase.name()).is_some() {
            warn!("⚠️ Phase '{}' is already registered, ignoring", phase.name());
            return false;
        }

        debug!("📋 Registered phase '{}'", phase.name());
        self.phases.push(phase);
        true
    }

    /// The active phase, or `None` before the first transition.
    pub fn current(&self) -> Option<&Arc<dyn MatchPhase>> {
        self.current.and_then(|index| self.phases.get(index))
    }

    /// Makes the named phase current.
    ///
    /// Runs `on_leave` on the outgoing phase and `on_enter` on the incoming
    /// one, even when both are the same phase.
    pub fn transition_to(&mut self, name: &str) -> ArenaResult<Arc<dyn MatchPhase>> {
        let index = self
            .position(name)
            .ok_or_else(|| ArenaError::UnknownPhase(name.to_string()))?;
        Ok(self.switch(index))
    }

    /// Moves to the phase registered after the current one.
    ///
    /// With no current phase the first registered phase is entered. Returns
    /// `Ok(None)` when the current phase is the last one; the arena stays put.
    pub fn advance(&mut self) -> ArenaResult<Option<Arc<dyn MatchPhase>>> {
        if self.phases.is_empty() {
            return Err(ArenaError::UnknownPhase("<none registered>".to_string()));
        }

        let next = self.current.map_or(0, |index| index + 1);
        if next >= self.phases.len() {
            return Ok(None);
        }
        Ok(Some(self.switch(next)))
    }

    fn switch(&mut self, index: usize) -> Arc<dyn MatchPhase> {
        if let Some(previous) = self.current() {
            previous.on_leave();
        }

        self.current = Some(index);
        let phase = Arc::clone(&self.phases[index]);
        phase.on_enter();

        info!(
            "🔄 Arena phase is now '{}' (joinable: {})",
            phase.name(),
            phase.accepts_new_players()
        );
        phase
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|phase| phase.name() == name)
    }

    /// All registered phases in registration order.
    pub fn phases(&self) -> &[Arc<dyn MatchPhase>] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
