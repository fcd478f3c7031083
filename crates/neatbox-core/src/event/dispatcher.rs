use std::any::{TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::event::error::EventSystemError;
use crate::event::{Event, EventResult, ListenerId};
use crate::kernel::error::Result;

type Handler = Rc<dyn Fn(&mut dyn Event) -> Result<EventResult>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenerKey {
    Name(String),
    Type(TypeId),
}

struct Listener {
    id: ListenerId,
    key: ListenerKey,
    priority: i32,
    handler: Handler,
}

/// Event dispatcher for registering listeners and dispatching events.
///
/// Listeners are keyed either by event name or by the concrete event type.
/// Both kinds are merged for a dispatch and called by descending priority,
/// equal priorities in registration order.
pub struct EventDispatcher {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<ListenerId>,
}

// Manual Debug implementation for EventDispatcher
impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let named = listeners.iter().filter(|l| matches!(l.key, ListenerKey::Name(_))).count();
        f.debug_struct("EventDispatcher")
            .field("name_listeners_count", &named)
            .field("type_listeners_count", &(listeners.len() - named))
            .field("next_listener_id", &self.next_id.get())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn push(&self, key: ListenerKey, priority: i32, handler: Handler) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push(Listener { id, key, priority, handler });
        id
    }

    /// Register a listener for every event dispatched under `event_name`.
    pub fn add_listener<F>(&self, event_name: impl Into<String>, priority: impl Into<i32>, listener: F) -> ListenerId
    where
        F: Fn(&mut dyn Event) -> Result<EventResult> + 'static,
    {
        let event_name = event_name.into();
        log::debug!("Adding listener for event '{}'", event_name);
        self.push(ListenerKey::Name(event_name), priority.into(), Rc::new(listener))
    }

    /// Register a listener for a concrete event type.
    pub fn add_typed_listener<E, F>(&self, priority: impl Into<i32>, listener: F) -> ListenerId
    where
        E: Event,
        F: Fn(&mut E) -> Result<EventResult> + 'static,
    {
        let handler: Handler = Rc::new(move |event: &mut dyn Event| {
            let event_name = event.name();
            match event.as_any_mut().downcast_mut::<E>() {
                Some(event) => listener(event),
                None => Err(EventSystemError::InvalidEventData {
                    event_name: event_name.to_string(),
                    details: format!("expected event of type {}", type_name::<E>()),
                }
                .into()),
            }
        });
        self.push(ListenerKey::Type(TypeId::of::<E>()), priority.into(), handler)
    }

    /// Remove a listener by the ID returned at registration.
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        if listeners.len() == before {
            return Err(EventSystemError::ListenerNotFound { id }.into());
        }
        Ok(())
    }

    /// Whether anything listens to `event_name`.
    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|l| matches!(&l.key, ListenerKey::Name(name) if name == event_name))
    }

    /// Dispatch `event` under its own name. See [`dispatch_as`](Self::dispatch_as).
    pub fn dispatch(&self, event: &mut dyn Event) -> Result<EventResult> {
        let event_name = event.name();
        self.dispatch_as(event_name, event)
    }

    /// Dispatch `event` to the listeners registered for `event_name` and
    /// for the event's concrete type.
    ///
    /// Returns [`EventResult::Stop`] when propagation was stopped, either by
    /// a listener returning `Stop` or by a listener filling the event's
    /// result slot. A listener error stops propagation and is returned.
    pub fn dispatch_as(&self, event_name: &str, event: &mut dyn Event) -> Result<EventResult> {
        let type_id = event.as_any().type_id();

        // Snapshot so listeners may register further listeners while running
        let mut handlers: Vec<(i32, ListenerId, Handler)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| match &l.key {
                ListenerKey::Name(name) => name == event_name,
                ListenerKey::Type(id) => *id == type_id,
            })
            .map(|l| (l.priority, l.id, l.handler.clone()))
            .collect();
        handlers.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        log::debug!("Dispatching '{}' to {} listener(s)", event_name, handlers.len());

        for (_, id, handler) in handlers {
            if handler(event)? == EventResult::Stop {
                log::debug!("Listener {} stopped propagation of '{}'", id, event_name);
                return Ok(EventResult::Stop);
            }
            if event.has_result() {
                log::debug!("Listener {} set a result for '{}'", id, event_name);
                return Ok(EventResult::Stop);
            }
        }
        Ok(EventResult::Continue)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
