//! User interface of the properties panel and its demo host.
//!
//! # Module Organization
//!
//! - `view` - The panel widget and the per-frame [`view::PanelContext`]
//! - `groups` - Group headers and dynamic lists
//! - `fields` - Widgets for the individual field kinds
//! - `popup` - Expression editor window
//! - `state` - The demo application state

mod fields;
mod groups;
mod popup;
mod state;
mod view;

pub use popup::ExpressionPopup;
pub use state::{PropertiesApp, CONFIG_STORAGE_KEY};
pub use view::{type_label, PropertiesPanelView, EMPTY_PLACEHOLDER, MULTIPLE_PLACEHOLDER};

use crate::constants::MIN_PANEL_WIDTH;
use eframe::egui;

impl eframe::App for PropertiesApp {
    /// Persist the panel configuration and layout between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let pending = self.view.flush();
        self.apply_effects(pending);
        self.config.layout = self.view.layout().value().clone();
        match self.config.to_json() {
            Ok(json) => {
                storage.set_string(CONFIG_STORAGE_KEY, json);
            }
            Err(err) => {
                log::warn!("Failed to serialize panel config: {err}");
            }
        }
    }

    /// Main update function called by egui for each frame.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `_frame` - The eframe frame
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle undo/redo keyboard shortcuts
        self.handle_undo_redo_keys(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        let (width, max_width) = self.side_panel_width(ctx);

        let effects = egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(width)
            .show(ctx, |ui| {
                // Remember the width so it survives restarts
                self.config.panel_width = ui.available_width().clamp(MIN_PANEL_WIDTH, max_width);
                self.view.show(ui)
            })
            .inner;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_element_list(ui);
        });

        // Writes fire `elements.changed` into the panel root; apply them after drawing
        self.apply_effects(effects);
    }
}

impl PropertiesApp {
    /// Stored panel width kept inside the viewport, and the widest the panel may get.
    fn side_panel_width(&self, ctx: &egui::Context) -> (f32, f32) {
        let viewport_width = ctx.input(|i| i.content_rect().width());
        let max_width = (viewport_width * 0.9).max(MIN_PANEL_WIDTH);
        (self.config.panel_width.clamp(MIN_PANEL_WIDTH, max_width), max_width)
    }

    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        // Text fields keep their own undo
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Z) && i.modifiers.command && !i.modifiers.shift) {
            self.perform_undo();
        } else if ctx.input(|i| {
            (i.key_pressed(egui::Key::Z) && i.modifiers.command && i.modifiers.shift)
                || (i.key_pressed(egui::Key::Y) && i.modifiers.command)
        }) {
            self.perform_redo();
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.modeling.can_undo(), egui::Button::new("Undo"))
                .on_hover_text("Ctrl+Z")
                .clicked()
            {
                self.perform_undo();
            }
            if ui
                .add_enabled(self.modeling.can_redo(), egui::Button::new("Redo"))
                .on_hover_text("Ctrl+Shift+Z")
                .clicked()
            {
                self.perform_redo();
            }
            ui.separator();
            if ui.button("Refresh panel").clicked() {
                self.panel.borrow_mut().refresh();
            }
            if self.view.has_pending_commits() {
                ui.label(egui::RichText::new("saving…").small().weak());
            }
        });
    }

    /// Lists the diagram's elements; clicking one selects it.
    fn draw_element_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Elements");
        ui.label(
            egui::RichText::new("Click to select, Ctrl/Cmd+click to add to the selection.")
                .small()
                .weak(),
        );
        ui.separator();

        let selected: Vec<String> = self.model.selection().into_iter().map(|e| e.id).collect();
        let mut clicked = None;
        for element in self.model.elements() {
            let name = element.name().unwrap_or_else(|| element.id.clone());
            let label = format!("{name} ({})", type_label(&element.type_name()));
            let response = ui.selectable_label(selected.contains(&element.id), label);
            if response.clicked() {
                let additive = ui.input(|i| i.modifiers.command);
                clicked = Some((element.id.clone(), additive));
            }
        }
        if let Some((id, additive)) = clicked {
            self.select(&id, additive);
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Clear selection").clicked() {
                self.model.select(&[]);
            }
            if ui
                .add_enabled(!selected.is_empty(), egui::Button::new("Delete selected"))
                .clicked()
            {
                for id in &selected {
                    self.model.remove_element(id);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests;
