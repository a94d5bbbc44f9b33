//! Selection-aware coordinator of the panel.
//!
//! [`PanelRoot`] listens to the host's event bus, decides which element the panel shows,
//! and resolves that element's groups through the registered providers. It is independent
//! of egui; the renderer in [`crate::ui`] only reads [`PanelRoot::groups`] and hands the
//! resulting [`PanelEffect`]s back to the host.

use crate::entries::{AddItem, Entry, FieldValue, Group, ListItem, RemoveItem};
use crate::error::PanelError;
use crate::events::{
    EventBus, ListenerId, PanelEvent, ELEMENTS_CHANGED, PROVIDERS_CHANGED, ROOT_ADDED,
    SELECTION_CHANGED,
};
use crate::model::{Element, ElementKind};
use crate::modeling::Modeling;
use crate::provider::{PropertiesProvider, ProviderRegistry};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Read access to the hosting diagram.
pub trait DiagramHost {
    /// Current root element, if any.
    fn root_element(&self) -> Option<Element>;
    /// Whether an element with this id is still part of the diagram.
    fn element_exists(&self, id: &str) -> bool;
}

/// What the panel currently shows.
#[derive(Debug, Clone, Default)]
pub enum PanelSelection {
    /// Nothing selected (or only an implicit root)
    #[default]
    None,
    /// One element
    Element(Element),
    /// More than one element
    Multiple(Vec<Element>),
}

/// A write requested by the renderer, applied by the host after drawing.
#[derive(Clone)]
pub enum PanelEffect {
    /// Commit a field value
    Commit {
        /// Element edited
        element: Element,
        /// Entry edited
        entry: Entry,
        /// New value
        value: FieldValue,
    },
    /// Run a list's add callback
    AddItem {
        /// Element owning the list
        element: Element,
        /// List the add button belongs to
        list_id: String,
        /// Callback to run
        add: AddItem,
    },
    /// Run a list's remove callback
    RemoveItem {
        /// Element owning the list
        element: Element,
        /// List the row belongs to
        list_id: String,
        /// Row to remove
        item: Rc<ListItem>,
        /// Callback to run
        remove: RemoveItem,
    },
}

impl std::fmt::Debug for PanelEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelEffect::Commit { element, entry, value } => f
                .debug_struct("Commit")
                .field("element", &element.id)
                .field("entry", &entry.id)
                .field("value", value)
                .finish(),
            PanelEffect::AddItem { element, list_id, .. } => f
                .debug_struct("AddItem")
                .field("element", &element.id)
                .field("list_id", list_id)
                .finish_non_exhaustive(),
            PanelEffect::RemoveItem {
                element,
                list_id,
                item,
                ..
            } => f
                .debug_struct("RemoveItem")
                .field("element", &element.id)
                .field("list_id", list_id)
                .field("item", &item.id)
                .finish_non_exhaustive(),
        }
    }
}

impl PanelEffect {
    /// Executes the effect against the modeling service.
    pub fn apply(self, modeling: &mut dyn Modeling) -> Result<(), PanelError> {
        match self {
            PanelEffect::Commit {
                element,
                entry,
                value,
            } => entry.commit(modeling, &element, value),
            PanelEffect::AddItem { element, add, .. } => add(modeling, &element),
            PanelEffect::RemoveItem {
                element,
                item,
                remove,
                ..
            } => remove(modeling, &element, &item),
        }
    }
}

/// Resolves what the panel shows in response to diagram events.
pub struct PanelRoot {
    host: Rc<dyn DiagramHost>,
    bus: Rc<EventBus>,
    providers: ProviderRegistry,
    selection: PanelSelection,
    groups: Vec<Group>,
    revision: u64,
}

impl PanelRoot {
    /// Creates a panel showing nothing.
    pub fn new(host: Rc<dyn DiagramHost>, bus: Rc<EventBus>) -> Self {
        Self {
            host,
            bus,
            providers: ProviderRegistry::new(),
            selection: PanelSelection::None,
            groups: Vec::new(),
            revision: 0,
        }
    }

    /// Subscribes the panel to `selection.changed`, `elements.changed`, `root.added` and
    /// `propertiesPanel.providersChanged`.
    ///
    /// Listeners hold a weak reference, so dropping the panel silently detaches it.
    pub fn attach(root: &Rc<RefCell<PanelRoot>>) -> Vec<ListenerId> {
        let bus = Rc::clone(&root.borrow().bus);
        let weak = Rc::downgrade(root);

        let on_selection = {
            let weak = Weak::clone(&weak);
            bus.on(SELECTION_CHANGED, move |event| {
                if let PanelEvent::SelectionChanged { new_selection, .. } = event {
                    with_root(&weak, |root| root.handle_selection_changed(new_selection));
                }
            })
        };
        let on_elements = {
            let weak = Weak::clone(&weak);
            bus.on(ELEMENTS_CHANGED, move |event| {
                if let PanelEvent::ElementsChanged { elements } = event {
                    with_root(&weak, |root| root.handle_elements_changed(elements));
                }
            })
        };
        let on_root = {
            let weak = Weak::clone(&weak);
            bus.on(ROOT_ADDED, move |event| {
                if let PanelEvent::RootAdded { element } = event {
                    with_root(&weak, |root| root.handle_root_added(element));
                }
            })
        };
        let on_providers = bus.on(PROVIDERS_CHANGED, move |_| {
            with_root(&weak, PanelRoot::refresh);
        });
        vec![on_selection, on_elements, on_root, on_providers]
    }

    /// Registers a provider and re-resolves the current element.
    ///
    /// Providers changing behind the panel's back are announced on the bus with
    /// `propertiesPanel.providersChanged` instead.
    pub fn register_provider(&mut self, provider: Rc<dyn PropertiesProvider>, priority: Option<u32>) {
        self.providers.register(provider, priority);
        self.refresh();
    }

    /// Reacts to `selection.changed`.
    pub fn handle_selection_changed(&mut self, new_selection: &[Element]) {
        if new_selection.len() > 1 {
            log::debug!("multiple elements selected ({})", new_selection.len());
            self.selection = PanelSelection::Multiple(new_selection.to_vec());
            self.groups.clear();
            self.revision += 1;
            self.bus.fire(&PanelEvent::Updated { element: None });
            return;
        }
        let element = new_selection
            .first()
            .cloned()
            .or_else(|| self.host.root_element());
        self.show(element);
    }

    /// Reacts to `elements.changed`: re-resolves only if the displayed element changed.
    pub fn handle_elements_changed(&mut self, elements: &[Element]) {
        match &self.selection {
            PanelSelection::Element(current) => {
                let Some(changed) = elements.iter().find(|e| e.id == current.id) else {
                    return;
                };
                if self.host.element_exists(&changed.id) {
                    let changed = changed.clone();
                    self.show(Some(changed));
                } else {
                    log::debug!("displayed element {} was removed", changed.id);
                    self.show(None);
                }
            }
            PanelSelection::Multiple(selected) => {
                if !elements.iter().any(|e| selected.contains(e)) {
                    return;
                }
                let remaining: Vec<Element> = selected
                    .iter()
                    .filter(|e| self.host.element_exists(&e.id))
                    .cloned()
                    .collect();
                self.handle_selection_changed(&remaining);
            }
            PanelSelection::None => {}
        }
    }

    /// Reacts to `root.added`.
    pub fn handle_root_added(&mut self, element: &Element) {
        self.show(Some(element.clone()));
    }

    /// Re-resolves groups for whatever is displayed.
    pub fn refresh(&mut self) {
        match &self.selection {
            PanelSelection::Element(element) => {
                let element = element.clone();
                self.show(Some(element));
            }
            PanelSelection::Multiple(_) | PanelSelection::None => {}
        }
    }

    /// What the panel currently shows.
    pub fn selection(&self) -> &PanelSelection {
        &self.selection
    }

    /// Displayed element, if exactly one.
    pub fn element(&self) -> Option<&Element> {
        match &self.selection {
            PanelSelection::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Groups resolved for the displayed element.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Counter bumped on every resolution; cheap change detection for renderers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn show(&mut self, element: Option<Element>) {
        let element = element.map(resolve_label).filter(|e| !e.is_implicit_root());
        match element {
            Some(element) => {
                self.groups = self.providers.resolve(&element);
                log::debug!(
                    "showing {} with {} group(s)",
                    element.id,
                    self.groups.len()
                );
                self.selection = PanelSelection::Element(element.clone());
                self.revision += 1;
                self.bus.fire(&PanelEvent::Updated {
                    element: Some(element),
                });
            }
            None => {
                self.selection = PanelSelection::None;
                self.groups.clear();
                self.revision += 1;
                self.bus.fire(&PanelEvent::Updated { element: None });
            }
        }
    }
}

/// Labels are edited through the element they belong to.
fn resolve_label(element: Element) -> Element {
    match element.kind {
        ElementKind::Label { target } => *target,
        _ => element,
    }
}

fn with_root(weak: &Weak<RefCell<PanelRoot>>, f: impl FnOnce(&mut PanelRoot)) {
    let Some(root) = weak.upgrade() else {
        return;
    };
    match root.try_borrow_mut() {
        Ok(mut root) => f(&mut root),
        Err(_) => log::warn!("properties panel is busy; event dropped"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{Entry, FieldKind};
    use crate::events::PANEL_UPDATED;
    use crate::model::{BusinessObject, DiagramModel};
    use crate::provider::GroupReducer;
    use std::cell::Cell;

    struct Fixture {
        model: Rc<DiagramModel>,
        root: Rc<RefCell<PanelRoot>>,
        resolutions: Rc<Cell<usize>>,
    }

    fn fixture() -> Fixture {
        let bus = Rc::new(EventBus::new());
        let model = Rc::new(DiagramModel::new(Rc::clone(&bus)));
        let host: Rc<dyn DiagramHost> = model.clone();
        let root = Rc::new(RefCell::new(PanelRoot::new(host, bus)));
        PanelRoot::attach(&root);

        let resolutions = Rc::new(Cell::new(0));
        let counter = Rc::clone(&resolutions);
        root.borrow_mut().register_provider(
            Rc::new(move |element: &Element| -> GroupReducer {
                counter.set(counter.get() + 1);
                let id = element.id.clone();
                Box::new(move |mut groups: Vec<Group>| {
                    groups.push(Group::entries(
                        "general",
                        "General",
                        vec![Entry::property(format!("{id}-name"), "Name", FieldKind::Text, "name")],
                    ));
                    groups
                })
            }),
            None,
        );

        model.set_root(Element::new(
            ElementKind::Root { implicit: false },
            BusinessObject::new("Process_1", "bpmn:Process"),
        ));
        model.add_element(Element::shape(BusinessObject::new("Task_1", "bpmn:Task")));
        model.add_element(Element::shape(BusinessObject::new("Task_2", "bpmn:Task")));
        resolutions.set(0);
        Fixture {
            model,
            root,
            resolutions,
        }
    }

    fn shown(root: &Rc<RefCell<PanelRoot>>) -> Option<String> {
        root.borrow().element().map(|e| e.id.clone())
    }

    #[test]
    fn root_added_shows_the_root() {
        let f = fixture();
        assert_eq!(shown(&f.root).as_deref(), Some("Process_1"));
        assert_eq!(f.root.borrow().groups().len(), 1);
    }

    #[test]
    fn selecting_an_element_resolves_its_groups() {
        let f = fixture();
        f.model.select(&["Task_1".to_string()]);
        assert_eq!(shown(&f.root).as_deref(), Some("Task_1"));
        let root = f.root.borrow();
        assert!(root.groups()[0].find_entry("Task_1-name").is_some());
    }

    #[test]
    fn empty_selection_falls_back_to_the_root() {
        let f = fixture();
        f.model.select(&["Task_1".to_string()]);
        f.model.select(&[]);
        assert_eq!(shown(&f.root).as_deref(), Some("Process_1"));
    }

    #[test]
    fn implicit_root_means_no_selection() {
        let f = fixture();
        f.model.set_root(Element::new(
            ElementKind::Root { implicit: true },
            BusinessObject::new("__implicitroot", "bpmn:Process"),
        ));
        assert!(matches!(f.root.borrow().selection(), PanelSelection::None));
        f.model.select(&[]);
        assert!(f.root.borrow().groups().is_empty());
    }

    #[test]
    fn labels_are_resolved_to_their_target() {
        let f = fixture();
        let task = f.model.get("Task_1").unwrap();
        f.model.add_element(Element::label_of(&task));
        f.model.select(&["Task_1_label".to_string()]);
        assert_eq!(shown(&f.root).as_deref(), Some("Task_1"));
    }

    #[test]
    fn multiple_selection_shows_no_groups() {
        let f = fixture();
        f.model.select(&["Task_1".to_string(), "Task_2".to_string()]);
        let root = f.root.borrow();
        assert!(matches!(root.selection(), PanelSelection::Multiple(list) if list.len() == 2));
        assert!(root.groups().is_empty());
    }

    #[test]
    fn unrelated_element_changes_do_not_resolve() {
        let f = fixture();
        f.model.select(&["Task_1".to_string()]);
        f.resolutions.set(0);

        let other = f.model.get("Task_2").unwrap();
        f.model.bus().fire(&PanelEvent::ElementsChanged {
            elements: vec![other],
        });
        assert_eq!(f.resolutions.get(), 0);

        let same = f.model.get("Task_1").unwrap();
        f.model.bus().fire(&PanelEvent::ElementsChanged {
            elements: vec![same],
        });
        assert_eq!(f.resolutions.get(), 1);
    }

    #[test]
    fn removing_the_displayed_element_clears_the_panel() {
        let f = fixture();
        f.model.select(&["Task_2".to_string()]);
        f.model.remove_element("Task_2");
        // the selection fallback shows the root again
        assert_eq!(shown(&f.root).as_deref(), Some("Process_1"));

        // displayed without being selected in the diagram: no selection fallback kicks in
        let task = f.model.get("Task_1").unwrap();
        f.root.borrow_mut().handle_selection_changed(&[task]);
        f.model.remove_element("Task_1");
        assert!(matches!(f.root.borrow().selection(), PanelSelection::None));
    }

    #[test]
    fn every_resolution_announces_an_update() {
        let f = fixture();
        let updates = Rc::new(Cell::new(0));
        let counter = Rc::clone(&updates);
        f.model.bus().on(PANEL_UPDATED, move |_| counter.set(counter.get() + 1));

        f.model.select(&["Task_1".to_string()]);
        f.model.select(&["Task_1".to_string(), "Task_2".to_string()]);
        assert_eq!(updates.get(), 2);
    }

    #[test]
    fn providers_changed_re_resolves_the_displayed_element() {
        let f = fixture();
        f.model.select(&["Task_1".to_string()]);
        f.resolutions.set(0);

        f.model.bus().fire(&PanelEvent::ProvidersChanged);
        assert_eq!(f.resolutions.get(), 1);
        assert_eq!(shown(&f.root).as_deref(), Some("Task_1"));

        // nothing to re-resolve while several elements are selected
        f.model.select(&["Task_1".to_string(), "Task_2".to_string()]);
        f.resolutions.set(0);
        f.model.bus().fire(&PanelEvent::ProvidersChanged);
        assert_eq!(f.resolutions.get(), 0);
    }

    #[test]
    fn registering_a_provider_re_resolves_directly() {
        let f = fixture();
        let updates = Rc::new(Cell::new(0));
        let counter = Rc::clone(&updates);
        f.model.bus().on(PANEL_UPDATED, move |_| counter.set(counter.get() + 1));

        f.root.borrow_mut().register_provider(
            Rc::new(|_: &Element| -> GroupReducer { Box::new(|groups: Vec<Group>| groups) }),
            Some(10),
        );
        assert_eq!(f.resolutions.get(), 1);
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn dropped_panels_detach_silently() {
        let f = fixture();
        drop(f.root);
        f.model.select(&["Task_1".to_string()]);
    }
}
