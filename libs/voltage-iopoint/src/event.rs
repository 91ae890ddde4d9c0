//! Change events
//!
//! Every point state owns one [`ChangeEventSet`] with three events. Events are
//! handed out as [`EventHandle`]s, which keep the whole set alive and carry the
//! index of the event they address, so a subscriber can hold on to an event
//! for as long as it wants without the point exposing its internals.

use crate::attribute::{Direction, EventKind};
use crate::value::ChangeMask;
use parking_lot::RwLock;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Receiver of event notifications
///
/// Called synchronously on the thread that committed the state change.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Identifies a subscription for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A single notification channel
pub struct Event {
    kind: EventKind,
    direction: Direction,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn EventListener>)>>,
    next_id: AtomicU64,
    fire_count: AtomicU64,
}

impl Event {
    fn new(kind: EventKind, direction: Direction) -> Self {
        Self {
            kind,
            direction,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fire_count: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Direction of the state this event belongs to
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of times this event has fired
    pub fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self, listener: impl EventListener + 'static) -> SubscriptionId {
        self.subscribe_arc(Arc::new(listener))
    }

    pub fn subscribe_arc(&self, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a subscription; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Notify all listeners
    ///
    /// The listener list is copied before calling out, so listeners may
    /// subscribe or unsubscribe from within a notification.
    pub fn fire(&self) {
        self.fire_count.fetch_add(1, Ordering::Relaxed);
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(
            event = self.kind.name(),
            direction = self.direction.as_str(),
            listeners = listeners.len(),
            "Fire"
        );

        for listener in listeners {
            listener.on_event(self);
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("direction", &self.direction)
            .field("listeners", &self.listener_count())
            .field("fire_count", &self.fire_count())
            .finish()
    }
}

/// The three change events of one point state
#[derive(Debug)]
pub struct ChangeEventSet {
    events: [Event; 3],
}

impl ChangeEventSet {
    pub fn new(direction: Direction) -> Self {
        Self {
            events: EventKind::ALL.map(|kind| Event::new(kind, direction)),
        }
    }

    pub fn event(&self, kind: EventKind) -> &Event {
        &self.events[kind.index()]
    }

    /// Fire the events selected by a commit's change mask
    ///
    /// Must only be called after the commit is published. Order is
    /// value, quality, then changed.
    pub fn notify(&self, mask: ChangeMask) {
        if mask.value_changed {
            self.event(EventKind::ValueChanged).fire();
        }
        if mask.quality_changed {
            self.event(EventKind::QualityChanged).fire();
        }
        if mask.any_changed() {
            self.event(EventKind::Changed).fire();
        }
    }

    /// Hand out a shared handle to one event of this set
    pub fn handle(self: &Arc<Self>, kind: EventKind) -> EventHandle {
        EventHandle {
            owner: Arc::clone(self),
            kind,
        }
    }

    /// Resolve an event by name
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<EventHandle> {
        EventKind::from_name(name).map(|kind| self.handle(kind))
    }
}

/// Shared handle to one event
///
/// Holds the owning set alive; dereferences to the [`Event`].
#[derive(Clone)]
pub struct EventHandle {
    owner: Arc<ChangeEventSet>,
    kind: EventKind,
}

impl EventHandle {
    /// Whether both handles address the same event of the same state
    pub fn ptr_eq(&self, other: &EventHandle) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.kind == other.kind
    }
}

impl Deref for EventHandle {
    type Target = Event;

    fn deref(&self) -> &Event {
        self.owner.event(self.kind)
    }
}

impl fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
