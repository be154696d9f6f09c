//! # Arena Event System
//!
//! A small, synchronous, type-safe event bus used by the arena game mode to
//! publish notifications and to let observers veto pending mutations.
//!
//! ## Core Features
//!
//! - **Type Safety**: Handlers are registered for a concrete event type and are
//!   only ever invoked with that type
//! - **Veto Chain**: Handlers run in registration order and may answer
//!   [`Verdict::Veto`]; the first veto stops the chain
//! - **Failure Isolation**: A failing handler is logged and treated as
//!   [`Verdict::Allow`], so one broken observer cannot block the arena
//! - **Serialization**: Every event is serde-serializable for forwarding to the
//!   host or to logs
//!
//! ## Event Keys
//!
//! ### Core Events (`core:*`)
//! Arena infrastructure events: setting changes, phase changes, player
//! connections, periodic arena info.
//!
//! ### Plugin Events (`plugin:plugin_name:event`)
//! Free-form events emitted by code layered on top of the arena.
//!
//! ## Quick Start Example
//!
//! ```rust
//! use arena_event_system::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct DoorOpened {
//!     door: u32,
//! }
//!
//! let events = create_arena_event_system();
//!
//! events
//!     .on_core_cancellable("door_opened", |event: &DoorOpened| {
//!         Ok(if event.door == 13 { Verdict::Veto } else { Verdict::Allow })
//!     })
//!     .unwrap();
//!
//! assert_eq!(events.emit_core("door_opened", &DoorOpened { door: 1 }), Verdict::Allow);
//! assert_eq!(events.emit_core("door_opened", &DoorOpened { door: 13 }), Verdict::Veto);
//! ```

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

pub mod types;

pub use types::*;

// ============================================================================
// Event Traits and Core Infrastructure
// ============================================================================

/// Core trait that all events must implement.
///
/// Most types get this through the blanket implementation: derive `Debug`,
/// `Serialize` and `Deserialize` and the type is an event.
pub trait Event: Send + Sync + Any + std::fmt::Debug {
    /// Returns the type name of this event for debugging and routing.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to JSON bytes for forwarding to the host.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from JSON bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    /// Returns a reference to this event as `&dyn Any` for dynamic typing.
    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Answer of a single observer in the handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verdict {
    /// Let the action proceed and continue with the next handler
    #[default]
    Allow,
    /// Cancel the action; remaining handlers are not invoked
    Veto,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Veto`].
    pub fn is_veto(self) -> bool {
        matches!(self, Verdict::Veto)
    }
}

/// Handler trait for processing events.
///
/// Most users will not implement this trait directly, but instead use
/// [`TypedEventHandler`] through the `on_*` registration methods.
pub trait EventHandler: Send + Sync {
    /// Handles a type-erased event.
    ///
    /// Returns [`EventError::TypeMismatch`] if `event` is not the type the
    /// handler was registered for.
    fn handle(&self, event: &dyn Any) -> Result<Verdict, EventError>;

    /// Returns the TypeId of the event type this handler expects.
    fn expected_type_id(&self) -> TypeId;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Type-safe wrapper bridging a closure over `&T` to [`EventHandler`].
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync,
{
    /// Creates a new typed event handler.
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync,
{
    fn handle(&self, event: &dyn Any) -> Result<Verdict, EventError> {
        let event = event
            .downcast_ref::<T>()
            .ok_or_else(|| EventError::TypeMismatch {
                handler: self.name.clone(),
                expected: T::type_name(),
            })?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Event System
// ============================================================================

/// The event bus that routes events to their registered handlers.
///
/// Handlers for one key run sequentially in registration order. Emission never
/// fails: handler errors are logged and count as [`Verdict::Allow`]. The
/// handler table is a `DashMap`, so an `Arc<EventSystem>` can be shared with
/// host code that registers observers from other threads.
pub struct EventSystem {
    /// Map of event keys to their registered handlers
    handlers: DashMap<String, Vec<Arc<dyn EventHandler>>>,
    total_handlers: AtomicUsize,
    events_emitted: AtomicU64,
    events_vetoed: AtomicU64,
    handler_failures: AtomicU64,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("keys", &self.handlers.len())
            .field("stats", &self.get_stats())
            .finish()
    }
}

impl EventSystem {
    /// Creates a new event system with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            total_handlers: AtomicUsize::new(0),
            events_emitted: AtomicU64::new(0),
            events_vetoed: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        }
    }

    /// Registers a notification handler for a core event.
    ///
    /// The handler cannot veto; returning `Ok(())` always counts as
    /// [`Verdict::Allow`].
    pub fn on_core<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(&T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.on_core_cancellable(event_name, move |event: &T| {
            handler(event).map(|_| Verdict::Allow)
        })
    }

    /// Registers an observer for a core event that may veto it.
    pub fn on_core_cancellable<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync + 'static,
    {
        let event_key = format!("core:{}", event_name);
        self.register_typed_handler(event_key, handler)
    }

    /// Registers a handler for plugin-to-plugin events.
    pub fn on_plugin<T, F>(
        &self,
        plugin_name: &str,
        event_name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync + 'static,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.register_typed_handler(event_key, handler)
    }

    fn register_typed_handler<T, F>(&self, event_key: String, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(&T) -> Result<Verdict, EventError> + Send + Sync + 'static,
    {
        let mut chain = self.handlers.entry(event_key.clone()).or_default();

        if let Some(existing) = chain.first() {
            if existing.expected_type_id() != TypeId::of::<T>() {
                return Err(EventError::TypeMismatch {
                    handler: existing.handler_name().to_string(),
                    expected: T::type_name(),
                });
            }
        }

        let handler_name = format!("{}::{}#{}", event_key, T::type_name(), chain.len());
        chain.push(Arc::new(TypedEventHandler::new(handler_name, handler)));
        self.total_handlers.fetch_add(1, Ordering::Relaxed);

        debug!("📝 Registered handler for {}", event_key);
        Ok(())
    }

    /// Emits a core event and returns the combined verdict of its observers.
    pub fn emit_core<T>(&self, event_name: &str, event: &T) -> Verdict
    where
        T: Event,
    {
        let event_key = format!("core:{}", event_name);
        self.emit_event(&event_key, event)
    }

    /// Emits a plugin event and returns the combined verdict of its observers.
    pub fn emit_plugin<T>(&self, plugin_name: &str, event_name: &str, event: &T) -> Verdict
    where
        T: Event,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.emit_event(&event_key, event)
    }

    fn emit_event<T>(&self, event_key: &str, event: &T) -> Verdict
    where
        T: Event,
    {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);

        // Snapshot the chain so handlers may register further observers.
        let chain: Vec<Arc<dyn EventHandler>> = match self.handlers.get(event_key) {
            Some(entry) => entry.value().clone(),
            None => {
                trace!("No handlers for event: {}", event_key);
                return Verdict::Allow;
            }
        };

        debug!("📤 Emitting {} to {} handlers", event_key, chain.len());

        for handler in chain {
            match handler.handle(event.as_any()) {
                Ok(Verdict::Allow) => {}
                Ok(Verdict::Veto) => {
                    debug!("🚫 {} vetoed by {}", event_key, handler.handler_name());
                    self.events_vetoed.fetch_add(1, Ordering::Relaxed);
                    return Verdict::Veto;
                }
                Err(e) => {
                    self.handler_failures.fetch_add(1, Ordering::Relaxed);
                    error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                }
            }
        }

        Verdict::Allow
    }

    /// Number of handlers registered under `core:<event_name>`.
    pub fn core_handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .get(&format!("core:{}", event_name))
            .map(|chain| chain.len())
            .unwrap_or(0)
    }

    /// Returns current system statistics.
    pub fn get_stats(&self) -> EventSystemStats {
        EventSystemStats {
            total_handlers: self.total_handlers.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_vetoed: self.events_vetoed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Core Arena Events
// ============================================================================

/// Emitted after the arena admitted a connecting player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConnectedEvent {
    /// Unique identifier for the player
    pub player_id: PlayerId,
    /// Name the directory resolved for the player at connect time
    pub player_name: String,
    /// Unix timestamp when the connection was accepted
    pub timestamp: u64,
}

/// Emitted after a player's session was evicted from the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDisconnectedEvent {
    /// Unique identifier for the player
    pub player_id: PlayerId,
    /// Reason for disconnection
    pub reason: DisconnectReason,
    /// Unix timestamp when the session was evicted
    pub timestamp: u64,
}

// ============================================================================
// Statistics and Error Types
// ============================================================================

/// Statistics about the event system's usage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventSystemStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since system start
    pub events_emitted: u64,
    /// Events whose chain ended in a veto
    pub events_vetoed: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
}

/// Errors that can occur during event system operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting event to bytes
    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
    /// Deserialization failed when converting bytes to event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// A handler was invoked with, or registered for, the wrong event type
    #[error("Handler {handler} expects events of type {expected}")]
    TypeMismatch {
        handler: String,
        expected: &'static str,
    },
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

/// Creates a new shareable arena event system.
pub fn create_arena_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

// ============================================================================
// Test Suite
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize)]
    struct TestEvent {
        message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct OtherEvent {
        value: i32,
    }

    fn test_event(message: &str) -> TestEvent {
        TestEvent {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let events = create_arena_event_system();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            events
                .on_core("server_started", move |event: &TestEvent| {
                    seen.lock().unwrap().push(format!("{}:{}", tag, event.message));
                    Ok(())
                })
                .unwrap();
        }

        let verdict = events.emit_core("server_started", &test_event("go"));

        assert_eq!(verdict, Verdict::Allow);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:go", "second:go", "third:go"]
        );
        assert_eq!(events.core_handler_count("server_started"), 3);
    }

    #[test]
    fn test_first_veto_short_circuits() {
        let events = create_arena_event_system();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        events
            .on_core_cancellable("setting_changed", move |_: &TestEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::Veto)
            })
            .unwrap();

        let counter = Arc::clone(&calls);
        events
            .on_core_cancellable("setting_changed", move |_: &TestEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::Allow)
            })
            .unwrap();

        let verdict = events.emit_core("setting_changed", &test_event("pvp"));

        assert!(verdict.is_veto());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.get_stats().events_vetoed, 1);
    }

    #[test]
    fn test_failing_handler_counts_as_allow() {
        let events = create_arena_event_system();
        let reached = Arc::new(AtomicUsize::new(0));

        events
            .on_core("phase_changed", |_: &TestEvent| {
                Err(EventError::HandlerExecution("boom".to_string()))
            })
            .unwrap();

        let counter = Arc::clone(&reached);
        events
            .on_core("phase_changed", move |_: &TestEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert_eq!(events.emit_core("phase_changed", &test_event("x")), Verdict::Allow);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        assert_eq!(events.get_stats().handler_failures, 1);
    }

    #[test]
    fn test_emit_without_handlers_allows() {
        let events = EventSystem::new();
        assert_eq!(events.emit_core("nobody_listens", &test_event("x")), Verdict::Allow);
        assert_eq!(events.get_stats().events_emitted, 1);
    }

    #[test]
    fn test_conflicting_event_types_are_rejected() {
        let events = EventSystem::new();
        events
            .on_core("mixed", |_: &TestEvent| Ok(()))
            .unwrap();

        let result = events.on_core("mixed", |_: &OtherEvent| Ok(()));
        assert!(matches!(result, Err(EventError::TypeMismatch { .. })));
        assert_eq!(events.get_stats().total_handlers, 1);
    }

    #[test]
    fn test_plugin_namespace_is_separate_from_core() {
        let events = EventSystem::new();
        events
            .on_plugin("cosmetics", "item_bought", |_: &TestEvent| Ok(Verdict::Veto))
            .unwrap();

        assert_eq!(events.emit_core("item_bought", &test_event("x")), Verdict::Allow);
        assert_eq!(
            events.emit_plugin("cosmetics", "item_bought", &test_event("x")),
            Verdict::Veto
        );
    }

    #[test]
    fn test_event_json_round_trip() {
        let event = PlayerConnectedEvent {
            player_id: PlayerId::new(7),
            player_name: "Alex".to_string(),
            timestamp: 1_700_000_000,
        };

        let bytes = Event::serialize(&event).unwrap();
        let decoded = <PlayerConnectedEvent as Event>::deserialize(&bytes).unwrap();
        assert_eq!(decoded.player_id, PlayerId::new(7));
        assert_eq!(decoded.player_name, "Alex");
    }
}
