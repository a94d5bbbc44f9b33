//! Diagram-side data types consumed by the panel.
//!
//! The panel never owns the diagram. It reads elements and their business objects,
//! and writes back through the [`Modeling`](crate::modeling::Modeling) collaborator.
//! [`DiagramModel`] is a small in-memory host good enough to drive the panel in the
//! demo application and in tests.

use crate::events::{EventBus, PanelEvent};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identifier of a diagram element.
pub type ElementId = String;

/// Shared, mutable handle to a business object.
///
/// Handles are compared by reference: two handles point at the same object exactly when
/// `Rc::ptr_eq` holds, which is what the key registry relies on.
pub type BusinessObjectRef = Rc<RefCell<BusinessObject>>;

/// Domain object behind an element (or nested inside another business object).
#[derive(Debug, Clone, Default)]
pub struct BusinessObject {
    /// Id assigned by the domain model
    pub id: String,
    /// Domain type name, e.g. `bpmn:Task`
    pub type_name: String,
    /// Scalar properties keyed by name
    pub properties: Map<String, Value>,
    /// Named collections of nested objects (e.g. input mappings)
    pub collections: BTreeMap<String, Vec<BusinessObjectRef>>,
}

impl BusinessObject {
    /// Creates a business object with no properties.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper setting one property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Wraps the object into a shared handle.
    pub fn into_ref(self) -> BusinessObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Returns a property, or `Value::Null` if it is not set.
    pub fn get(&self, key: &str) -> Value {
        self.properties.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Returns a copy of the handles in the named collection.
    pub fn collection(&self, name: &str) -> Vec<BusinessObjectRef> {
        self.collections.get(name).cloned().unwrap_or_default()
    }
}

/// Shape category of a diagram element.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// The diagram root (process/collaboration)
    Root {
        /// Implicit roots are created by the host for empty diagrams and are never edited
        implicit: bool,
    },
    /// An external label; the panel edits its target instead
    Label {
        /// Element the label belongs to
        target: Box<Element>,
    },
    /// Any regular shape
    Shape,
    /// Any connection
    Connection,
}

/// A diagram element as seen by the panel.
#[derive(Debug, Clone)]
pub struct Element {
    /// Unique identifier of this element
    pub id: ElementId,
    /// Shape category
    pub kind: ElementKind,
    /// Domain object the element visualizes
    pub business_object: BusinessObjectRef,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Element {
    /// Creates a regular shape element around a business object.
    pub fn shape(business_object: BusinessObject) -> Self {
        Self::new(ElementKind::Shape, business_object)
    }

    /// Creates an element of the given kind; the element id is taken from the business object.
    pub fn new(kind: ElementKind, business_object: BusinessObject) -> Self {
        Self {
            id: business_object.id.clone(),
            kind,
            business_object: business_object.into_ref(),
        }
    }

    /// Creates the external label of `target`.
    pub fn label_of(target: &Element) -> Self {
        Self {
            id: format!("{}_label", target.id),
            kind: ElementKind::Label {
                target: Box::new(target.clone()),
            },
            business_object: Rc::clone(&target.business_object),
        }
    }

    /// Returns true for roots the host created implicitly.
    pub fn is_implicit_root(&self) -> bool {
        matches!(self.kind, ElementKind::Root { implicit: true })
    }

    /// Domain type name of the business object.
    pub fn type_name(&self) -> String {
        self.business_object.borrow().type_name.clone()
    }

    /// Display name of the element, if the business object carries one.
    pub fn name(&self) -> Option<String> {
        self.business_object
            .borrow()
            .properties
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// In-memory diagram: element registry, root and selection.
///
/// Mutations that the real host would announce are fired on the shared [`EventBus`].
pub struct DiagramModel {
    elements: RefCell<Vec<Element>>,
    root: RefCell<Option<Element>>,
    selection: RefCell<Vec<Element>>,
    bus: Rc<EventBus>,
}

impl DiagramModel {
    /// Creates an empty diagram announcing changes on `bus`.
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            elements: RefCell::new(Vec::new()),
            root: RefCell::new(None),
            selection: RefCell::new(Vec::new()),
            bus,
        }
    }

    /// Event bus the diagram fires on.
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Installs `element` as the diagram root and fires `root.added`.
    pub fn set_root(&self, element: Element) {
        self.elements.borrow_mut().retain(|e| e.id != element.id);
        self.elements.borrow_mut().push(element.clone());
        *self.root.borrow_mut() = Some(element.clone());
        self.bus.fire(&PanelEvent::RootAdded { element });
    }

    /// Current root element.
    pub fn root(&self) -> Option<Element> {
        self.root.borrow().clone()
    }

    /// Registers a new element and fires `elements.changed` for it.
    pub fn add_element(&self, element: Element) {
        self.elements.borrow_mut().push(element.clone());
        self.bus.fire(&PanelEvent::ElementsChanged {
            elements: vec![element],
        });
    }

    /// Removes an element (and its label), dropping it from the selection.
    ///
    /// # Returns
    ///
    /// The removed element, or `None` if no element had that id.
    pub fn remove_element(&self, id: &str) -> Option<Element> {
        let removed = {
            let mut elements = self.elements.borrow_mut();
            let index = elements.iter().position(|e| e.id == id)?;
            let removed = elements.remove(index);
            elements.retain(|e| match &e.kind {
                ElementKind::Label { target } => target.id != id,
                _ => true,
            });
            removed
        };
        let was_selected = self.selection.borrow().iter().any(|e| e.id == id);
        if was_selected {
            let remaining: Vec<ElementId> = self
                .selection
                .borrow()
                .iter()
                .filter(|e| e.id != id)
                .map(|e| e.id.clone())
                .collect();
            self.select(&remaining);
        }
        self.bus.fire(&PanelEvent::ElementsChanged {
            elements: vec![removed.clone()],
        });
        Some(removed)
    }

    /// Looks up an element by id.
    pub fn get(&self, id: &str) -> Option<Element> {
        self.elements.borrow().iter().find(|e| e.id == id).cloned()
    }

    /// All registered elements in insertion order.
    pub fn elements(&self) -> Vec<Element> {
        self.elements.borrow().clone()
    }

    /// Currently selected elements.
    pub fn selection(&self) -> Vec<Element> {
        self.selection.borrow().clone()
    }

    /// Replaces the selection and fires `selection.changed`. Unknown ids are ignored.
    pub fn select(&self, ids: &[ElementId]) {
        let new_selection: Vec<Element> = ids.iter().filter_map(|id| self.get(id)).collect();
        let old_selection = self.selection.replace(new_selection.clone());
        self.bus.fire(&PanelEvent::SelectionChanged {
            old_selection,
            new_selection,
        });
    }
}

impl crate::panel::DiagramHost for DiagramModel {
    fn root_element(&self) -> Option<Element> {
        self.root()
    }

    fn element_exists(&self, id: &str) -> bool {
        self.elements.borrow().iter().any(|e| e.id == id)
    }
}
