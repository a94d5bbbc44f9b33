//! Synchronous event bus shared by the diagram host and the panel.
//!
//! Listeners subscribe to an event name with a priority; higher priorities are
//! notified first, equal priorities in subscription order. Dispatch happens on
//! the caller's stack, so a listener observes the world exactly as the firing
//! code left it.

use crate::constants::DEFAULT_LISTENER_PRIORITY;
use crate::model::Element;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Fired when the diagram selection changes.
pub const SELECTION_CHANGED: &str = "selection.changed";
/// Fired when one or more elements were changed, added or removed.
pub const ELEMENTS_CHANGED: &str = "elements.changed";
/// Fired when a new root element was installed.
pub const ROOT_ADDED: &str = "root.added";
/// Fired when a properties provider was registered.
pub const PROVIDERS_CHANGED: &str = "propertiesPanel.providersChanged";
/// Fired after the panel resolved groups for an element.
pub const PANEL_UPDATED: &str = "propertiesPanel.updated";
/// Fired after the panel wrote to its layout.
pub const LAYOUT_CHANGED: &str = "propertiesPanel.layoutChanged";

/// Events exchanged between the diagram host and the panel.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// `selection.changed`
    SelectionChanged {
        /// Selection before the change
        old_selection: Vec<Element>,
        /// Selection after the change
        new_selection: Vec<Element>,
    },
    /// `elements.changed`
    ElementsChanged {
        /// Every element touched by the change
        elements: Vec<Element>,
    },
    /// `root.added`
    RootAdded {
        /// The new root
        element: Element,
    },
    /// `propertiesPanel.providersChanged`
    ProvidersChanged,
    /// `propertiesPanel.updated`
    Updated {
        /// Element now displayed, if any
        element: Option<Element>,
    },
    /// `propertiesPanel.layoutChanged`
    LayoutChanged {
        /// Complete layout after the write
        layout: Value,
    },
}

impl PanelEvent {
    /// Wire name of the event, as the host framework spells it.
    pub fn name(&self) -> &'static str {
        match self {
            PanelEvent::SelectionChanged { .. } => SELECTION_CHANGED,
            PanelEvent::ElementsChanged { .. } => ELEMENTS_CHANGED,
            PanelEvent::RootAdded { .. } => ROOT_ADDED,
            PanelEvent::ProvidersChanged => PROVIDERS_CHANGED,
            PanelEvent::Updated { .. } => PANEL_UPDATED,
            PanelEvent::LayoutChanged { .. } => LAYOUT_CHANGED,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&PanelEvent)>;

struct Listener {
    id: ListenerId,
    event: &'static str,
    priority: u32,
    callback: Callback,
}

/// Single-threaded publish/subscribe hub.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes with the default priority.
    pub fn on(&self, event: &'static str, callback: impl Fn(&PanelEvent) + 'static) -> ListenerId {
        self.on_with_priority(event, DEFAULT_LISTENER_PRIORITY, callback)
    }

    /// Subscribes to `event`; higher `priority` listeners run first.
    pub fn on_with_priority(
        &self,
        event: &'static str,
        priority: u32,
        callback: impl Fn(&PanelEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let mut listeners = self.listeners.borrow_mut();
        // after every listener of equal or higher priority
        let index = listeners
            .iter()
            .position(|l| l.priority < priority)
            .unwrap_or(listeners.len());
        listeners.insert(
            index,
            Listener {
                id,
                event,
                priority,
                callback: Rc::new(callback),
            },
        );
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }

    /// Notifies every listener subscribed to the event's name.
    ///
    /// Listeners may subscribe, unsubscribe or fire further events while being notified;
    /// the set of listeners notified is fixed when `fire` is entered.
    pub fn fire(&self, event: &PanelEvent) {
        let callbacks: Vec<Callback> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event.name())
            .map(|l| Rc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of listeners subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event)
            .count()
    }
}
