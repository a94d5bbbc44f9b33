//! Larger editor window for expression fields.

use crate::entries::{Entry, FieldValue};
use crate::model::Element;
use eframe::egui;
use std::collections::HashMap;

struct OpenPopup {
    element: Element,
    entry: Entry,
    text: String,
    /// Field that opened the popup
    source: egui::Id,
}

/// A value typed into the popup, addressed to the field that opened it.
pub(crate) struct PopupEdit {
    pub element: Element,
    pub entry: Entry,
    pub value: FieldValue,
}

/// Expression editor window. Closing it hands keyboard focus back to the field that
/// opened it, provided that field is still on screen.
#[derive(Default)]
pub struct ExpressionPopup {
    open: Option<OpenPopup>,
}

impl ExpressionPopup {
    pub(crate) fn open(&mut self, element: &Element, entry: &Entry, text: String, source: egui::Id) {
        self.open = Some(OpenPopup {
            element: element.clone(),
            entry: entry.clone(),
            text,
            source,
        });
    }

    /// Whether the window is showing.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Widget id of the field that opened the popup.
    pub fn source(&self) -> Option<egui::Id> {
        self.open.as_ref().map(|open| open.source)
    }

    /// Closes the window without touching focus.
    pub fn close(&mut self) {
        self.open = None;
    }

    /// Draws the window if open.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `rendered` - Field widgets drawn in the last frame
    pub(crate) fn show(
        &mut self,
        ctx: &egui::Context,
        rendered: &HashMap<String, egui::Id>,
    ) -> Option<PopupEdit> {
        let state = self.open.as_mut()?;
        let mut keep_open = true;
        let mut close_clicked = false;
        let mut edited = None;

        egui::Window::new(format!("Edit {}", state.entry.label))
            .id(egui::Id::new("expression_popup"))
            .open(&mut keep_open)
            .collapsible(false)
            .resizable(true)
            .default_width(420.0)
            .show(ctx, |ui| {
                let response = ui.add(
                    egui::TextEdit::multiline(&mut state.text)
                        .code_editor()
                        .desired_rows(10)
                        .desired_width(f32::INFINITY),
                );
                if response.changed() {
                    edited = Some(PopupEdit {
                        element: state.element.clone(),
                        entry: state.entry.clone(),
                        value: FieldValue::Text(state.text.clone()),
                    });
                }
                if ui.button("Close").clicked() {
                    close_clicked = true;
                }
            });

        let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if !keep_open || close_clicked || escape {
            self.finish(ctx, rendered);
        }
        edited
    }

    fn finish(&mut self, ctx: &egui::Context, rendered: &HashMap<String, egui::Id>) {
        let Some(state) = self.open.take() else {
            return;
        };
        if rendered.get(&state.entry.id) == Some(&state.source) {
            ctx.memory_mut(|memory| memory.request_focus(state.source));
        } else {
            log::debug!("not restoring focus to {}: field is gone", state.entry.id);
        }
    }
}
