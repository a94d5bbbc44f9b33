//! Widgets for the individual field kinds.

use super::view::PanelContext;
use crate::entries::{Entry, FieldKind, FieldValue};
use eframe::egui;

/// Draws one entry: label, widget, validation message and description.
///
/// # Arguments
///
/// * `ui` - The egui UI context
/// * `cx` - Panel state of the current frame
/// * `entry` - Entry to draw
/// * `request_focus` - Whether the widget should take keyboard focus this frame
pub(crate) fn draw_entry(
    ui: &mut egui::Ui,
    cx: &mut PanelContext<'_>,
    entry: &Entry,
    request_focus: bool,
) {
    let current = cx.rendered_value(entry);
    ui.push_id(&entry.id, |ui| {
        if !matches!(entry.field, FieldKind::Checkbox | FieldKind::Toggle) {
            ui.label(entry.label.as_str());
        }

        let (response, edited) = match &entry.field {
            FieldKind::Text => {
                let mut text = current.as_text();
                let response = ui.add(
                    egui::TextEdit::singleline(&mut text).desired_width(f32::INFINITY),
                );
                let edited = response.changed().then(|| FieldValue::Text(text));
                (Some(response), edited)
            }
            FieldKind::TextArea { rows } => {
                let mut text = current.as_text();
                let response = ui.add(
                    egui::TextEdit::multiline(&mut text)
                        .desired_rows(*rows)
                        .desired_width(f32::INFINITY),
                );
                let edited = response.changed().then(|| FieldValue::Text(text));
                (Some(response), edited)
            }
            FieldKind::Number { min, max } => {
                let mut number = current.as_number().unwrap_or_default();
                let range = min.unwrap_or(f64::NEG_INFINITY)..=max.unwrap_or(f64::INFINITY);
                let response = ui.add(egui::DragValue::new(&mut number).range(range));
                let edited = response.changed().then_some(FieldValue::Number(number));
                (Some(response), edited)
            }
            FieldKind::Select { options } => {
                let mut selected = current.as_text();
                let selected_text = options
                    .iter()
                    .find(|o| o.value == selected)
                    .map(|o| o.label.clone())
                    .unwrap_or_default();
                let response = egui::ComboBox::from_id_salt("select")
                    .selected_text(selected_text)
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for option in options {
                            ui.selectable_value(
                                &mut selected,
                                option.value.clone(),
                                option.label.as_str(),
                            );
                        }
                    })
                    .response;
                let edited =
                    (selected != current.as_text()).then(|| FieldValue::Text(selected));
                (Some(response), edited)
            }
            FieldKind::Checkbox => {
                let mut checked = current.as_bool();
                let response = ui.checkbox(&mut checked, entry.label.as_str());
                let edited = response.changed().then_some(FieldValue::Bool(checked));
                (Some(response), edited)
            }
            FieldKind::Toggle => {
                let mut on = current.as_bool();
                let response = ui
                    .horizontal(|ui| {
                        let text = if on { "On" } else { "Off" };
                        let response = ui.toggle_value(&mut on, text);
                        ui.label(entry.label.as_str());
                        response
                    })
                    .inner;
                let edited = response.changed().then_some(FieldValue::Bool(on));
                (Some(response), edited)
            }
            FieldKind::Expression => {
                let mut text = current.as_text();
                let inner = ui.horizontal(|ui| {
                    let open_popup = ui
                        .small_button("✏")
                        .on_hover_text("Open in a larger editor")
                        .clicked();
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut text)
                            .code_editor()
                            .desired_width(f32::INFINITY),
                    );
                    (response, open_popup)
                });
                let (response, open_popup) = inner.inner;
                if open_popup {
                    cx.popup.open(cx.element, entry, text.clone(), response.id);
                }
                let edited = response.changed().then(|| FieldValue::Text(text));
                (Some(response), edited)
            }
            FieldKind::Static => {
                ui.label(egui::RichText::new(current.as_text()).monospace());
                (None, None)
            }
        };

        if let Some(response) = &response {
            cx.rendered.insert(entry.id.clone(), response.id);
            if request_focus {
                response.request_focus();
            }
        }
        if let Some(value) = edited {
            cx.input(entry, value);
        }
        if response.as_ref().is_some_and(egui::Response::lost_focus) {
            cx.flush_entry(entry);
        }

        if let Some(error) = cx.errors.get(&entry.id) {
            ui.colored_label(ui.visuals().error_fg_color, error.as_str());
        }
        if let Some(description) = &entry.description {
            ui.label(egui::RichText::new(description).small().weak());
        }
        ui.add_space(4.0);
    });
}
