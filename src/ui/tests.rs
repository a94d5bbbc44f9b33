use super::*;
use crate::config::PanelConfig;
use crate::demo::{DETAILS_GROUP, INPUTS_COLLECTION, INPUT_MAPPINGS_GROUP};
use crate::layout::{group_open_path, list_item_open_path, LayoutStore, PathSegment};
use crate::model::{BusinessObject, Element, ElementKind};
use crate::panel::PanelEffect;
use eframe::egui;
use eframe::App as _;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Drives `PropertiesPanelView` of a demo app frame by frame on one egui context.
struct Harness {
    app: PropertiesApp,
    ctx: egui::Context,
    time: f64,
}

impl Harness {
    fn new(config: PanelConfig) -> Self {
        Self {
            app: PropertiesApp::new(config),
            ctx: egui::Context::default(),
            time: 0.0,
        }
    }

    fn select(&self, id: &str) {
        self.app.select(id, false);
    }

    /// Runs one frame `dt` seconds after the previous one and applies the writes it produced.
    fn frame(&mut self, dt: f64, events: Vec<egui::Event>) -> (egui::FullOutput, Vec<PanelEffect>) {
        self.time += dt;
        let mut raw = egui::RawInput::default();
        raw.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(1200.0, 800.0),
        ));
        raw.time = Some(self.time);
        raw.events = events;

        let mut effects = Vec::new();
        let view = &mut self.app.view;
        let output = self.ctx.run(raw, |ctx| {
            ctx.set_visuals(egui::Visuals::dark());
            egui::CentralPanel::default().show(ctx, |ui| {
                effects.extend(view.show(ui));
            });
        });
        self.app.apply_effects(effects.clone());
        (output, effects)
    }

    /// Moves the pointer onto `pos`, then presses and releases it.
    fn click(&mut self, pos: egui::Pos2) -> Vec<PanelEffect> {
        self.frame(0.05, vec![egui::Event::PointerMoved(pos)]);
        let button = |pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };
        self.frame(0.05, vec![button(true), button(false)]).1
    }

    fn field(&self, entry_id: &str) -> egui::Id {
        *self
            .app
            .view
            .rendered_fields()
            .get(entry_id)
            .unwrap_or_else(|| panic!("{entry_id} should be rendered"))
    }

    fn focus(&self, entry_id: &str) {
        let id = self.field(entry_id);
        self.ctx.memory_mut(|m| m.request_focus(id));
    }

    fn focused(&self) -> Option<egui::Id> {
        self.ctx.memory(|m| m.focused())
    }

    fn layout_flag(&self, path: &[PathSegment]) -> Value {
        self.app.view.layout().get_layout_for_key(path, Value::Null)
    }
}

/// Every piece of text painted in a frame.
fn painted_texts(output: &egui::FullOutput) -> Vec<(String, egui::Rect)> {
    fn walk(shape: &egui::Shape, out: &mut Vec<(String, egui::Rect)>) {
        match shape {
            egui::Shape::Text(text) => {
                out.push((text.galley.text().to_string(), text.visual_bounding_rect()))
            }
            egui::Shape::Vec(shapes) => shapes.iter().for_each(|s| walk(s, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    for clipped in &output.shapes {
        walk(&clipped.shape, &mut out);
    }
    out
}

fn find_text(output: &egui::FullOutput, needle: &str) -> Option<egui::Rect> {
    painted_texts(output)
        .into_iter()
        .find(|(text, _)| text == needle)
        .map(|(_, rect)| rect)
}

fn shows_text(output: &egui::FullOutput, needle: &str) -> bool {
    painted_texts(output).iter().any(|(text, _)| text.contains(needle))
}

fn mapping_ids(app: &PropertiesApp) -> Vec<String> {
    app.model
        .get("Task_Review")
        .expect("review task exists")
        .business_object
        .borrow()
        .collection(INPUTS_COLLECTION)
        .iter()
        .map(|m| m.borrow().id.clone())
        .collect()
}

#[test]
fn root_is_shown_on_start() {
    let mut h = Harness::new(PanelConfig::default());
    let (output, effects) = h.frame(0.0, vec![]);

    assert!(effects.is_empty());
    assert!(shows_text(&output, "Order handling"));
    assert!(shows_text(&output, "Process"));
    assert!(h.app.view.rendered_fields().contains_key("name"));
}

#[test]
fn implicit_root_shows_the_empty_placeholder() {
    let mut h = Harness::new(PanelConfig::default());
    h.app.model.set_root(Element::new(
        ElementKind::Root { implicit: true },
        BusinessObject::new("__implicitroot", "bpmn:Process"),
    ));

    let (output, _) = h.frame(0.0, vec![]);
    assert!(shows_text(&output, EMPTY_PLACEHOLDER));
    assert!(h.app.view.rendered_fields().is_empty());
}

#[test]
fn multiple_selection_shows_its_placeholder() {
    let mut h = Harness::new(PanelConfig::default());
    h.app.select("Task_Review", false);
    h.app.select("Task_Ship", true);
    assert_eq!(h.app.model.selection().len(), 2);

    let (output, _) = h.frame(0.0, vec![]);
    assert!(shows_text(&output, MULTIPLE_PLACEHOLDER));
    assert!(h.app.view.rendered_fields().is_empty());

    // Ctrl-click on a selected element takes it out again
    h.app.select("Task_Ship", true);
    let (output, _) = h.frame(0.0, vec![]);
    assert!(shows_text(&output, "Review order"));
}

#[test]
fn typing_is_committed_once_the_delay_passed() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Ship");
    h.frame(0.0, vec![]);
    h.focus("name");

    let (_, effects) = h.frame(0.1, vec![egui::Event::Text("!".into())]);
    assert!(effects.is_empty(), "nothing is written while typing");
    assert!(h.app.view.has_pending_commits());
    assert_eq!(h.app.model.get("Task_Ship").unwrap().name().as_deref(), Some("Ship order"));

    let (_, effects) = h.frame(0.1, vec![]);
    assert!(effects.is_empty());

    let (_, effects) = h.frame(0.3, vec![]);
    assert_eq!(effects.len(), 1);
    assert!(!h.app.view.has_pending_commits());
    assert_eq!(h.app.model.get("Task_Ship").unwrap().name().as_deref(), Some("Ship order!"));
}

#[test]
fn pending_edit_is_written_to_the_element_it_was_typed_into() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Ship");
    h.frame(0.0, vec![]);
    h.focus("name");
    h.frame(0.1, vec![egui::Event::Text("!".into())]);

    // Selection moves on before the delay is over
    h.select("Task_Review");
    h.frame(1.0, vec![]);

    assert_eq!(h.app.model.get("Task_Ship").unwrap().name().as_deref(), Some("Ship order!"));
    assert_eq!(h.app.model.get("Task_Review").unwrap().name().as_deref(), Some("Review order"));
}

#[test]
fn invalid_input_stays_local() {
    let layout = json!({
        "groups": { INPUT_MAPPINGS_GROUP: { "open": true } },
        "lists": { INPUT_MAPPINGS_GROUP: { "Mapping_1": { "open": true } } },
    });
    let mut h = Harness::new(PanelConfig {
        layout,
        ..PanelConfig::default()
    });
    h.select("Task_Review");
    h.frame(0.0, vec![]);
    h.focus("Mapping_1-target");

    let (output, effects) = h.frame(0.1, vec![egui::Event::Text(" x".into())]);
    assert!(effects.is_empty());
    assert!(!h.app.view.has_pending_commits());
    assert_eq!(
        h.app.view.errors().get("Mapping_1-target").map(String::as_str),
        Some("Must not contain spaces.")
    );

    assert!(shows_text(&output, "Must not contain spaces."));

    let (_, effects) = h.frame(1.0, vec![]);
    assert!(effects.is_empty());

    let review = h.app.model.get("Task_Review").unwrap();
    let mappings = review.business_object.borrow().collection(INPUTS_COLLECTION);
    assert_eq!(mappings[0].borrow().get("target"), json!("orderTotal"));
}

#[test]
fn clicking_a_group_header_stores_its_open_state() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Ship");
    let (output, _) = h.frame(0.0, vec![]);
    assert!(!h.app.view.rendered_fields().contains_key("retries"));

    let header = find_text(&output, "Details").expect("details header is painted");
    h.click(header.center());
    h.frame(0.05, vec![]);

    assert_eq!(h.layout_flag(&group_open_path(DETAILS_GROUP)), json!(true));
    assert!(h.app.view.rendered_fields().contains_key("retries"));
}

#[test]
fn adding_a_mapping_opens_the_list_and_focuses_the_new_row() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Review");
    let (output, _) = h.frame(0.0, vec![]);
    assert_eq!(h.layout_flag(&group_open_path(INPUT_MAPPINGS_GROUP)), Value::Null);

    let add = find_text(&output, "+").expect("add button is painted");
    let effects = h.click(add.center());
    assert!(effects
        .iter()
        .any(|e| matches!(e, PanelEffect::AddItem { list_id, .. } if list_id == INPUT_MAPPINGS_GROUP)));

    let ids = mapping_ids(&h.app);
    assert_eq!(ids.len(), 4);
    let added = ids.last().unwrap().clone();

    // The model changed after drawing, so the next frame shows the new row
    let (output, _) = h.frame(0.05, vec![]);
    assert_eq!(h.layout_flag(&group_open_path(INPUT_MAPPINGS_GROUP)), json!(true));
    assert_eq!(h.focused(), Some(h.field(&format!("{added}-target"))));
    assert!(!h.app.view.rendered_fields().contains_key("Mapping_1-target"));
    assert!(shows_text(&output, "<empty>"));

    // Auto-opening is not persisted
    assert_eq!(
        h.layout_flag(&list_item_open_path(INPUT_MAPPINGS_GROUP, &added)),
        Value::Null
    );
}

#[test]
fn removing_a_mapping_deletes_its_row() {
    let layout = json!({ "groups": { INPUT_MAPPINGS_GROUP: { "open": true } } });
    let mut h = Harness::new(PanelConfig {
        layout,
        ..PanelConfig::default()
    });
    h.select("Task_Review");
    let (output, _) = h.frame(0.0, vec![]);

    let remove_buttons: Vec<egui::Rect> = painted_texts(&output)
        .into_iter()
        .filter(|(text, _)| text == "🗑")
        .map(|(_, rect)| rect)
        .collect();
    assert_eq!(remove_buttons.len(), 3);

    let effects = h.click(remove_buttons[0].center());
    assert!(effects.iter().any(|e| matches!(e, PanelEffect::RemoveItem { .. })));
    assert_eq!(mapping_ids(&h.app).len(), 2);

    let (output, _) = h.frame(0.05, vec![]);
    let remaining = painted_texts(&output)
        .into_iter()
        .filter(|(text, _)| text == "🗑")
        .count();
    assert_eq!(remaining, 2);
}

#[test]
fn closing_the_expression_popup_returns_focus_to_its_field() {
    let layout = json!({ "groups": { DETAILS_GROUP: { "open": true } } });
    let mut h = Harness::new(PanelConfig {
        layout,
        ..PanelConfig::default()
    });
    h.select("Flow_1");
    let (output, _) = h.frame(0.0, vec![]);

    let open = find_text(&output, "✏").expect("popup button is painted");
    h.click(open.center());
    assert!(h.app.view.popup().is_open());
    assert_eq!(h.app.view.popup().source(), Some(h.field("condition")));
    h.frame(0.05, vec![]);

    let escape = |pressed| egui::Event::Key {
        key: egui::Key::Escape,
        physical_key: None,
        pressed,
        repeat: false,
        modifiers: egui::Modifiers::NONE,
    };
    h.frame(0.05, vec![escape(true), escape(false)]);

    assert!(!h.app.view.popup().is_open());
    assert_eq!(h.focused(), Some(h.field("condition")));
}

#[test]
fn switching_elements_closes_the_popup_without_moving_focus() {
    let layout = json!({ "groups": { DETAILS_GROUP: { "open": true } } });
    let mut h = Harness::new(PanelConfig {
        layout,
        ..PanelConfig::default()
    });
    h.select("Flow_1");
    let (output, _) = h.frame(0.0, vec![]);
    let open = find_text(&output, "✏").expect("popup button is painted");
    h.click(open.center());
    assert!(h.app.view.popup().is_open());
    let condition = h.field("condition");

    h.select("Task_Ship");
    h.frame(0.05, vec![]);

    assert!(!h.app.view.popup().is_open());
    assert_ne!(h.focused(), Some(condition));
}

#[test]
fn undo_flushes_pending_text_first() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Ship");
    h.frame(0.0, vec![]);
    h.focus("name");
    h.frame(0.1, vec![egui::Event::Text("!".into())]);
    assert!(h.app.view.has_pending_commits());

    h.app.perform_undo();

    assert!(!h.app.view.has_pending_commits());
    assert_eq!(h.app.model.get("Task_Ship").unwrap().name().as_deref(), Some("Ship order"));
    assert!(h.app.modeling.can_redo());

    h.app.perform_redo();
    assert_eq!(h.app.model.get("Task_Ship").unwrap().name().as_deref(), Some("Ship order!"));
}

#[derive(Default)]
struct MemoryStorage(HashMap<String, String>);

impl eframe::Storage for MemoryStorage {
    fn get_string(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }

    fn flush(&mut self) {}
}

#[test]
fn layout_survives_save_and_restore() {
    let mut h = Harness::new(PanelConfig::default());
    h.select("Task_Ship");
    let (output, _) = h.frame(0.0, vec![]);
    let header = find_text(&output, "Details").expect("details header is painted");
    h.click(header.center());

    let mut storage = MemoryStorage::default();
    h.app.save(&mut storage);
    assert!(storage.0.contains_key(CONFIG_STORAGE_KEY));

    let restored = PropertiesApp::from_storage(Some(&storage));
    assert_eq!(
        restored
            .view
            .layout()
            .get_layout_for_key(&group_open_path(DETAILS_GROUP), Value::Null),
        json!(true)
    );
}

#[test]
fn corrupt_storage_falls_back_to_defaults() {
    let mut storage = MemoryStorage::default();
    storage
        .0
        .insert(CONFIG_STORAGE_KEY.to_string(), "not json".to_string());
    let app = PropertiesApp::from_storage(Some(&storage));
    assert_eq!(app.config.debounce_ms, PanelConfig::default().debounce_ms);
    assert_eq!(app.view.layout().value(), &json!({}));
}

#[test]
fn type_labels_are_humanized() {
    assert_eq!(type_label("bpmn:UserTask"), "User Task");
    assert_eq!(type_label("bpmn:SequenceFlow"), "Sequence Flow");
    assert_eq!(type_label("Process"), "Process");
}

#[test]
fn dropping_the_app_detaches_the_panel() {
    let app = PropertiesApp::default();
    let model = std::rc::Rc::clone(&app.model);
    let panel = std::rc::Rc::clone(&app.panel);
    drop(app);

    model.select(&["Task_Ship".to_string()]);
    assert_eq!(panel.borrow().element().map(|e| e.id.as_str()), Some("Process_1"));
}

#[test]
fn side_panel_width_stays_inside_the_viewport() {
    let widths = |panel_width: f32| {
        let h = Harness::new(PanelConfig {
            panel_width,
            ..PanelConfig::default()
        });
        let mut raw = egui::RawInput::default();
        raw.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(1200.0, 800.0),
        ));
        let mut result = (0.0, 0.0);
        let _ = h.ctx.run(raw, |ctx| result = h.app.side_panel_width(ctx));
        result
    };

    assert_eq!(widths(320.0), (320.0, 1080.0));
    assert_eq!(widths(5000.0), (1080.0, 1080.0));
    assert_eq!(widths(10.0).0, crate::constants::MIN_PANEL_WIDTH);
}

#[test]
fn toggle_fields_commit_on_click() {
    let layout = json!({ "groups": { DETAILS_GROUP: { "open": true } } });
    let mut h = Harness::new(PanelConfig {
        layout,
        ..PanelConfig::default()
    });
    h.select("Task_Ship");
    let (output, _) = h.frame(0.0, vec![]);
    assert!(h.app.view.rendered_fields().contains_key("skippable"));

    let off = find_text(&output, "Off").expect("toggle is painted");
    let effects = h.click(off.center());
    assert!(effects.iter().any(|e| matches!(
        e,
        PanelEffect::Commit { entry, value: crate::entries::FieldValue::Bool(true), .. }
            if entry.id == "skippable"
    )));

    let ship = h.app.model.get("Task_Ship").unwrap();
    assert_eq!(ship.business_object.borrow().get("skippable"), json!(true));
    let (output, _) = h.frame(0.05, vec![]);
    assert!(find_text(&output, "On").is_some());
}
