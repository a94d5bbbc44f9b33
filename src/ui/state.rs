//! Application state of the demo host.
//!
//! The host owns the diagram, the modeling service and the panel. Everything is wired
//! through one [`EventBus`]: the diagram announces selection and element changes, the
//! command stack announces edits, and the panel root listens to both.

use super::view::PropertiesPanelView;
use crate::config::PanelConfig;
use crate::demo;
use crate::events::{EventBus, ListenerId, PanelEvent, PANEL_UPDATED};
use crate::model::{DiagramModel, ElementId};
use crate::modeling::CommandStack;
use crate::panel::{DiagramHost, PanelEffect, PanelRoot};
use std::cell::RefCell;
use std::rc::Rc;

/// Storage key the panel configuration is persisted under.
pub const CONFIG_STORAGE_KEY: &str = "panel_config";

/// Demo application: an element list next to the properties panel.
pub struct PropertiesApp {
    /// Diagram being edited
    pub(crate) model: Rc<DiagramModel>,
    /// Modeling service with undo/redo
    pub(crate) modeling: CommandStack,
    /// Selection-aware panel coordinator
    pub(crate) panel: Rc<RefCell<PanelRoot>>,
    /// Renderer of the panel
    pub(crate) view: PropertiesPanelView,
    /// Persisted settings
    pub(crate) config: PanelConfig,
    listeners: Vec<ListenerId>,
}

impl Default for PropertiesApp {
    fn default() -> Self {
        Self::new(PanelConfig::default())
    }
}

impl PropertiesApp {
    /// Creates the demo with the sample diagram and its providers.
    pub fn new(config: PanelConfig) -> Self {
        let bus = Rc::new(EventBus::new());
        let model = Rc::new(DiagramModel::new(Rc::clone(&bus)));
        let host: Rc<dyn DiagramHost> = model.clone();
        let panel = Rc::new(RefCell::new(PanelRoot::new(host, Rc::clone(&bus))));

        let mut listeners = PanelRoot::attach(&panel);
        listeners.push(bus.on(PANEL_UPDATED, |event| {
            if let PanelEvent::Updated { element } = event {
                log::debug!(
                    "panel updated for {:?}",
                    element.as_ref().map(|e| e.id.as_str())
                );
            }
        }));
        {
            let mut root = panel.borrow_mut();
            root.register_provider(demo::general_provider(), None);
            root.register_provider(
                demo::input_mappings_provider(),
                Some(demo::INPUT_MAPPINGS_PRIORITY),
            );
        }
        demo::populate(&model);

        let layout_bus = Rc::clone(&bus);
        let layout = config.layout().on_changed(move |layout| {
            layout_bus.fire(&PanelEvent::LayoutChanged {
                layout: layout.clone(),
            });
        });
        let view = PropertiesPanelView::new(Rc::clone(&panel), layout, config.debounce_ms);

        Self {
            modeling: CommandStack::new(bus),
            model,
            panel,
            view,
            config,
            listeners,
        }
    }

    /// Restores the configuration saved by a previous session, if any.
    pub fn from_storage(storage: Option<&dyn eframe::Storage>) -> Self {
        let config = storage
            .and_then(|storage| storage.get_string(CONFIG_STORAGE_KEY))
            .and_then(|json| match PanelConfig::from_json(&json) {
                Ok(config) => Some(config),
                Err(err) => {
                    log::warn!("Ignoring stored panel config: {err}");
                    None
                }
            })
            .unwrap_or_default();
        Self::new(config)
    }

    /// Applies the writes collected while drawing. Failures are logged and skipped.
    pub(crate) fn apply_effects(&mut self, effects: Vec<PanelEffect>) {
        for effect in effects {
            log::debug!("applying {effect:?}");
            if let Err(err) = effect.apply(&mut self.modeling) {
                log::warn!("Panel change rejected: {err}");
            }
        }
    }

    /// Selects one element, or toggles it within the selection when `additive`.
    pub(crate) fn select(&self, id: &str, additive: bool) {
        let mut ids: Vec<ElementId> = if additive {
            self.model.selection().into_iter().map(|e| e.id).collect()
        } else {
            Vec::new()
        };
        match ids.iter().position(|selected| selected == id) {
            Some(index) if additive => {
                ids.remove(index);
            }
            _ => ids.push(id.to_string()),
        }
        self.model.select(&ids);
    }

    pub(crate) fn perform_undo(&mut self) {
        let pending = self.view.flush();
        self.apply_effects(pending);
        if !self.modeling.undo() {
            log::debug!("nothing to undo");
        }
    }

    pub(crate) fn perform_redo(&mut self) {
        if !self.modeling.redo() {
            log::debug!("nothing to redo");
        }
    }
}

impl Drop for PropertiesApp {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.model.bus().off(id);
        }
    }
}
