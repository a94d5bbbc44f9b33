//! Modeling service the panel writes through, with undo/redo.
//!
//! The panel only depends on the [`Modeling`] trait. [`CommandStack`] is the in-memory
//! implementation used by the demo host and by tests: every command mutates a business
//! object, is recorded for undo, and announces the touched element with `elements.changed`.

use crate::constants::MAX_UNDO_HISTORY;
use crate::error::PanelError;
use crate::events::{EventBus, PanelEvent};
use crate::model::{BusinessObjectRef, Element};
use serde_json::{Map, Value};
use std::rc::Rc;

/// Write access to the diagram, as seen by entries and list callbacks.
pub trait Modeling {
    /// Updates properties of the element's own business object.
    fn update_properties(
        &mut self,
        element: &Element,
        properties: Map<String, Value>,
    ) -> Result<(), PanelError> {
        let target = Rc::clone(&element.business_object);
        self.update_moddle_properties(element, &target, properties)
    }

    /// Updates properties of `target`, a business object nested under `element`.
    fn update_moddle_properties(
        &mut self,
        element: &Element,
        target: &BusinessObjectRef,
        properties: Map<String, Value>,
    ) -> Result<(), PanelError>;

    /// Appends `child` to the named collection of `parent`.
    fn add_to_collection(
        &mut self,
        element: &Element,
        parent: &BusinessObjectRef,
        collection: &str,
        child: BusinessObjectRef,
    ) -> Result<(), PanelError>;

    /// Removes the object with `child_id` from the named collection of `parent`.
    fn remove_from_collection(
        &mut self,
        element: &Element,
        parent: &BusinessObjectRef,
        collection: &str,
        child_id: &str,
    ) -> Result<(), PanelError>;
}

/// A reversible change to the diagram.
#[derive(Debug, Clone)]
pub enum Command {
    /// Properties of a business object were replaced
    UpdateProperties {
        /// Element to announce as changed
        element: Element,
        /// Object whose properties changed
        target: BusinessObjectRef,
        /// Values before the change (`Null` for previously unset)
        old_properties: Map<String, Value>,
        /// Values after the change
        new_properties: Map<String, Value>,
    },
    /// A child was inserted into a collection
    ChildAdded {
        /// Element to announce as changed
        element: Element,
        /// Owner of the collection
        parent: BusinessObjectRef,
        /// Collection name
        collection: String,
        /// Insert position
        index: usize,
        /// Inserted child
        child: BusinessObjectRef,
    },
    /// A child was removed from a collection
    ChildRemoved {
        /// Element to announce as changed
        element: Element,
        /// Owner of the collection
        parent: BusinessObjectRef,
        /// Collection name
        collection: String,
        /// Former position
        index: usize,
        /// Removed child
        child: BusinessObjectRef,
    },
}

impl Command {
    fn element(&self) -> &Element {
        match self {
            Command::UpdateProperties { element, .. }
            | Command::ChildAdded { element, .. }
            | Command::ChildRemoved { element, .. } => element,
        }
    }

    /// Applies the command and returns the command that reverses it.
    fn apply(&self) -> Command {
        match self {
            Command::UpdateProperties {
                element,
                target,
                old_properties,
                new_properties,
            } => {
                write_properties(target, new_properties);
                Command::UpdateProperties {
                    element: element.clone(),
                    target: Rc::clone(target),
                    old_properties: new_properties.clone(),
                    new_properties: old_properties.clone(),
                }
            }
            Command::ChildAdded {
                element,
                parent,
                collection,
                index,
                child,
            } => {
                let mut parent_bo = parent.borrow_mut();
                let children = parent_bo.collections.entry(collection.clone()).or_default();
                let index = (*index).min(children.len());
                children.insert(index, Rc::clone(child));
                Command::ChildRemoved {
                    element: element.clone(),
                    parent: Rc::clone(parent),
                    collection: collection.clone(),
                    index,
                    child: Rc::clone(child),
                }
            }
            Command::ChildRemoved {
                element,
                parent,
                collection,
                index,
                child,
            } => {
                let mut parent_bo = parent.borrow_mut();
                let children = parent_bo.collections.entry(collection.clone()).or_default();
                let index = children
                    .iter()
                    .position(|c| Rc::ptr_eq(c, child))
                    .unwrap_or(*index);
                if index < children.len() {
                    children.remove(index);
                }
                Command::ChildAdded {
                    element: element.clone(),
                    parent: Rc::clone(parent),
                    collection: collection.clone(),
                    index,
                    child: Rc::clone(child),
                }
            }
        }
    }
}

fn write_properties(target: &BusinessObjectRef, properties: &Map<String, Value>) {
    let mut target = target.borrow_mut();
    for (key, value) in properties {
        if value.is_null() {
            target.properties.remove(key);
        } else {
            target.properties.insert(key.clone(), value.clone());
        }
    }
}

/// Command executor with bounded undo/redo history.
pub struct CommandStack {
    /// Stack of commands that can be undone (stored as their inverses)
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone (stored as their inverses)
    redo_stack: Vec<Command>,
    bus: Rc<EventBus>,
}

impl CommandStack {
    /// Creates an empty stack announcing changes on `bus`.
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            bus,
        }
    }

    /// Executes a command and records it for undo.
    ///
    /// This clears the redo stack since a new command invalidates any previously undone ones.
    pub fn execute(&mut self, command: Command) {
        let inverse = command.apply();
        self.undo_stack.push(inverse);
        self.redo_stack.clear();

        // Limit undo history size
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
        self.announce(&command);
    }

    /// Returns true if there are commands that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are commands that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Reverts the most recent command. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(inverse) = self.undo_stack.pop() else {
            return false;
        };
        let redo = inverse.apply();
        self.redo_stack.push(redo);
        self.announce(&inverse);
        true
    }

    /// Re-applies the most recently undone command. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        let inverse = command.apply();
        self.undo_stack.push(inverse);
        self.announce(&command);
        true
    }

    /// Clears all undo and redo history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn announce(&self, command: &Command) {
        self.bus.fire(&PanelEvent::ElementsChanged {
            elements: vec![command.element().clone()],
        });
    }
}

impl Modeling for CommandStack {
    fn update_moddle_properties(
        &mut self,
        element: &Element,
        target: &BusinessObjectRef,
        properties: Map<String, Value>,
    ) -> Result<(), PanelError> {
        let old_properties: Map<String, Value> = {
            let target = target.borrow();
            properties
                .keys()
                .map(|key| (key.clone(), target.get(key)))
                .collect()
        };
        if old_properties == properties {
            return Ok(());
        }
        self.execute(Command::UpdateProperties {
            element: element.clone(),
            target: Rc::clone(target),
            old_properties,
            new_properties: properties,
        });
        Ok(())
    }

    fn add_to_collection(
        &mut self,
        element: &Element,
        parent: &BusinessObjectRef,
        collection: &str,
        child: BusinessObjectRef,
    ) -> Result<(), PanelError> {
        let index = parent.borrow().collection(collection).len();
        self.execute(Command::ChildAdded {
            element: element.clone(),
            parent: Rc::clone(parent),
            collection: collection.to_string(),
            index,
            child,
        });
        Ok(())
    }

    fn remove_from_collection(
        &mut self,
        element: &Element,
        parent: &BusinessObjectRef,
        collection: &str,
        child_id: &str,
    ) -> Result<(), PanelError> {
        let children = parent.borrow().collection(collection);
        let index = children
            .iter()
            .position(|c| c.borrow().id == child_id)
            .ok_or_else(|| PanelError::UnknownChild {
                collection: collection.to_string(),
                id: child_id.to_string(),
            })?;
        self.execute(Command::ChildRemoved {
            element: element.clone(),
            parent: Rc::clone(parent),
            collection: collection.to_string(),
            index,
            child: Rc::clone(&children[index]),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ELEMENTS_CHANGED;
    use crate::model::BusinessObject;
    use serde_json::json;
    use std::cell::Cell;

    fn props(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.into(), value);
        map
    }

    fn setup() -> (Rc<EventBus>, CommandStack, Element) {
        let bus = Rc::new(EventBus::new());
        let stack = CommandStack::new(Rc::clone(&bus));
        let element = Element::shape(BusinessObject::new("Task_1", "bpmn:Task"));
        (bus, stack, element)
    }

    #[test]
    fn update_undo_redo_restores_properties() {
        let (_bus, mut stack, element) = setup();
        stack
            .update_properties(&element, props("name", json!("Review")))
            .unwrap();
        assert_eq!(element.name().as_deref(), Some("Review"));

        assert!(stack.undo());
        assert_eq!(element.name(), None);
        assert!(stack.can_redo());

        assert!(stack.redo());
        assert_eq!(element.name().as_deref(), Some("Review"));
        assert!(!stack.can_redo());
    }

    #[test]
    fn no_op_updates_are_not_recorded() {
        let (_bus, mut stack, element) = setup();
        stack.update_properties(&element, props("name", json!("A"))).unwrap();
        stack.update_properties(&element, props("name", json!("A"))).unwrap();
        assert!(stack.undo());
        assert!(!stack.can_undo());
    }

    #[test]
    fn collection_changes_are_reversible() {
        let (_bus, mut stack, element) = setup();
        let parent = Rc::clone(&element.business_object);
        let child = BusinessObject::new("Mapping_1", "io:Input").into_ref();
        stack
            .add_to_collection(&element, &parent, "inputs", Rc::clone(&child))
            .unwrap();
        assert_eq!(parent.borrow().collection("inputs").len(), 1);

        stack
            .remove_from_collection(&element, &parent, "inputs", "Mapping_1")
            .unwrap();
        assert!(parent.borrow().collection("inputs").is_empty());

        stack.undo();
        let restored = parent.borrow().collection("inputs");
        assert!(Rc::ptr_eq(&restored[0], &child));
    }

    #[test]
    fn removing_unknown_children_fails() {
        let (_bus, mut stack, element) = setup();
        let parent = Rc::clone(&element.business_object);
        let err = stack
            .remove_from_collection(&element, &parent, "inputs", "nope")
            .unwrap_err();
        assert!(matches!(err, PanelError::UnknownChild { .. }));
    }

    #[test]
    fn every_command_announces_the_element() {
        let (bus, mut stack, element) = setup();
        let changed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&changed);
        bus.on(ELEMENTS_CHANGED, move |_| counter.set(counter.get() + 1));

        stack.update_properties(&element, props("name", json!("A"))).unwrap();
        stack.undo();
        stack.redo();
        assert_eq!(changed.get(), 3);
    }

    #[test]
    fn history_is_bounded() {
        let (_bus, mut stack, element) = setup();
        for i in 0..(MAX_UNDO_HISTORY + 5) {
            stack
                .update_properties(&element, props("name", json!(i.to_string())))
                .unwrap();
        }
        let mut undone = 0;
        while stack.undo() {
            undone += 1;
        }
        assert_eq!(undone, MAX_UNDO_HISTORY);
    }
}
