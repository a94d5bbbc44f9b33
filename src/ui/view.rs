//! The properties panel widget.
//!
//! [`PropertiesPanelView`] draws whatever the [`PanelRoot`] currently shows and returns the
//! writes the user asked for as [`PanelEffect`]s. The host applies them after the frame,
//! which fires `elements.changed` and makes the root re-resolve its groups for the next one.

use super::groups::draw_group;
use super::popup::{ExpressionPopup, PopupEdit};
use crate::debounce::{Debouncer, PendingCommit};
use crate::entries::{Entry, FieldValue};
use crate::group::ErrorMap;
use crate::layout::Layout;
use crate::list::ListController;
use crate::model::{Element, ElementId};
use crate::panel::{PanelEffect, PanelRoot, PanelSelection};
use eframe::egui;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// Placeholder shown when nothing is selected.
pub const EMPTY_PLACEHOLDER: &str = "Select an element to edit its properties.";
/// Placeholder shown for a multi-selection.
pub const MULTIPLE_PLACEHOLDER: &str =
    "Multiple elements are selected. Select a single element to edit its properties.";

/// Everything the draw functions need besides the `Ui`, passed down explicitly.
pub(crate) struct PanelContext<'a> {
    /// Element being edited
    pub element: &'a Element,
    /// Layout store for open states
    pub layout: &'a mut Layout,
    /// Pending text commits
    pub debouncer: &'a mut Debouncer,
    /// Validation messages keyed by entry id
    pub errors: &'a mut ErrorMap,
    /// Rejected values kept on screen, keyed by entry id
    pub drafts: &'a mut HashMap<String, FieldValue>,
    /// Per-list state keyed by list id
    pub lists: &'a mut HashMap<String, ListController>,
    /// Expression editor window
    pub popup: &'a mut ExpressionPopup,
    /// Widget ids of the fields drawn in this frame, keyed by entry id
    pub rendered: &'a mut HashMap<String, egui::Id>,
    /// Writes requested in this frame
    pub effects: &'a mut Vec<PanelEffect>,
    /// Frame time in seconds
    pub now: f64,
}

impl PanelContext<'_> {
    /// Value an entry shows: a pending edit, a rejected draft, or the model value.
    pub fn rendered_value(&self, entry: &Entry) -> FieldValue {
        if let Some(value) = self.debouncer.pending_value(&self.element.id, &entry.id) {
            return value.clone();
        }
        if let Some(value) = self.drafts.get(&entry.id) {
            return value.clone();
        }
        entry.value(self.element)
    }

    /// Routes a value typed by the user: invalid values stay local, valid ones are
    /// committed directly or through the debouncer.
    pub fn input(&mut self, entry: &Entry, value: FieldValue) {
        if let Some(reason) = entry.validate(&value) {
            log::debug!("rejected value for {}: {reason}", entry.id);
            self.errors.insert(entry.id.clone(), reason);
            self.drafts.insert(entry.id.clone(), value);
            self.debouncer.flush_entry(&self.element.id, &entry.id);
            return;
        }
        self.errors.remove(&entry.id);
        self.drafts.remove(&entry.id);
        if entry.debounce {
            self.debouncer.schedule(self.now, self.element, entry, value);
        } else {
            self.effects.push(PanelEffect::Commit {
                element: self.element.clone(),
                entry: entry.clone(),
                value,
            });
        }
    }

    /// Commits a pending edit right away, e.g. when its field loses focus.
    pub fn flush_entry(&mut self, entry: &Entry) {
        if let Some(pending) = self.debouncer.flush_entry(&self.element.id, &entry.id) {
            self.effects.push(commit(pending));
        }
    }
}

fn commit(pending: PendingCommit) -> PanelEffect {
    PanelEffect::Commit {
        element: pending.element,
        entry: pending.entry,
        value: pending.value,
    }
}

/// Renders a [`PanelRoot`] into an egui `Ui`.
pub struct PropertiesPanelView {
    root: Rc<RefCell<PanelRoot>>,
    layout: Layout,
    debouncer: Debouncer,
    errors: ErrorMap,
    drafts: HashMap<String, FieldValue>,
    lists: HashMap<String, ListController>,
    popup: ExpressionPopup,
    rendered: HashMap<String, egui::Id>,
    /// Field widgets drawn in the previous frame
    last_rendered: HashMap<String, egui::Id>,
    element_id: Option<ElementId>,
}

impl PropertiesPanelView {
    /// Creates a view of `root` storing open states in `layout`.
    ///
    /// # Arguments
    ///
    /// * `root` - Panel root deciding what is shown
    /// * `layout` - Layout store, usually restored from the host's storage
    /// * `debounce_ms` - Delay before text edits are committed
    pub fn new(root: Rc<RefCell<PanelRoot>>, layout: Layout, debounce_ms: u64) -> Self {
        Self {
            root,
            layout,
            debouncer: Debouncer::new(debounce_ms),
            errors: ErrorMap::new(),
            drafts: HashMap::new(),
            lists: HashMap::new(),
            popup: ExpressionPopup::default(),
            rendered: HashMap::new(),
            last_rendered: HashMap::new(),
            element_id: None,
        }
    }

    /// Layout store of the panel.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Validation messages of the displayed element.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Whether text edits are waiting to be committed.
    pub fn has_pending_commits(&self) -> bool {
        !self.debouncer.is_idle()
    }

    /// Expression popup state.
    pub fn popup(&self) -> &ExpressionPopup {
        &self.popup
    }

    /// Widget ids of the fields drawn in the last frame, keyed by entry id.
    pub fn rendered_fields(&self) -> &HashMap<String, egui::Id> {
        &self.last_rendered
    }

    /// Returns every pending text commit regardless of its deadline.
    pub fn flush(&mut self) -> Vec<PanelEffect> {
        self.debouncer.flush().into_iter().map(commit).collect()
    }

    /// Draws the panel and returns the writes requested during this frame.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Vec<PanelEffect> {
        let now = ui.input(|i| i.time);
        let mut effects: Vec<PanelEffect> =
            self.debouncer.take_due(now).into_iter().map(commit).collect();

        let root = Rc::clone(&self.root);
        let root = root.borrow();
        let element = match root.selection() {
            PanelSelection::Element(element) => Some(element),
            _ => None,
        };
        self.track_element(element.map(|e| e.id.as_str()));

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| match root.selection() {
                PanelSelection::None => draw_placeholder(ui, EMPTY_PLACEHOLDER),
                PanelSelection::Multiple(_) => draw_placeholder(ui, MULTIPLE_PLACEHOLDER),
                PanelSelection::Element(element) => {
                    draw_header(ui, element);
                    ui.separator();

                    let mut cx = PanelContext {
                        element,
                        layout: &mut self.layout,
                        debouncer: &mut self.debouncer,
                        errors: &mut self.errors,
                        drafts: &mut self.drafts,
                        lists: &mut self.lists,
                        popup: &mut self.popup,
                        rendered: &mut self.rendered,
                        effects: &mut effects,
                        now,
                    };
                    for group in root.groups().iter().filter(|g| g.is_renderable()) {
                        draw_group(ui, &mut cx, group);
                    }
                }
            });

        let list_ids: HashSet<&str> = root.groups().iter().map(|g| g.id()).collect();
        self.lists.retain(|id, _| list_ids.contains(id.as_str()));
        drop(root);

        self.last_rendered = std::mem::take(&mut self.rendered);
        if let Some(edit) = self.popup.show(ui.ctx(), &self.last_rendered) {
            self.input_from_popup(edit, now, &mut effects);
        }

        if let Some(due) = self.debouncer.next_due() {
            ui.ctx()
                .request_repaint_after(Duration::from_secs_f64((due - now).max(0.0)));
        }
        effects
    }

    fn input_from_popup(&mut self, edit: PopupEdit, now: f64, effects: &mut Vec<PanelEffect>) {
        let mut cx = PanelContext {
            element: &edit.element,
            layout: &mut self.layout,
            debouncer: &mut self.debouncer,
            errors: &mut self.errors,
            drafts: &mut self.drafts,
            lists: &mut self.lists,
            popup: &mut self.popup,
            rendered: &mut self.rendered,
            effects,
            now,
        };
        cx.input(&edit.entry, edit.value);
    }

    /// Drops state tied to the previously displayed element.
    fn track_element(&mut self, element_id: Option<&str>) {
        if self.element_id.as_deref() == element_id {
            return;
        }
        log::debug!("panel now shows {element_id:?}");
        self.element_id = element_id.map(str::to_string);
        self.errors.clear();
        self.drafts.clear();
        self.popup.close();
    }
}

fn draw_placeholder(ui: &mut egui::Ui, text: &str) {
    ui.add_space(8.0);
    ui.label(egui::RichText::new(text).italics().weak());
}

fn draw_header(ui: &mut egui::Ui, element: &Element) {
    let type_label = type_label(&element.type_name());
    ui.heading(element.name().unwrap_or_else(|| type_label.clone()));
    ui.label(egui::RichText::new(type_label).small().weak());
}

/// Human-readable form of a type name: `bpmn:UserTask` becomes `User Task`.
pub fn type_label(type_name: &str) -> String {
    let local = type_name.rsplit(':').next().unwrap_or(type_name);
    let mut label = String::with_capacity(local.len() + 4);
    for (i, ch) in local.chars().enumerate() {
        if i > 0 && ch.is_uppercase() {
            label.push(' ');
        }
        label.push(ch);
    }
    label
}
