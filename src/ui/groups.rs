//! Group headers and dynamic lists.

use super::fields::draw_entry;
use super::view::PanelContext;
use crate::entries::{EntriesGroup, Group, ListGroup};
use crate::group::{group_status, is_group_open, toggle_group, GroupStatus};
use crate::list::{FocusRequest, ListController, ListPass};
use crate::panel::PanelEffect;
use eframe::egui;
use std::rc::Rc;

/// Draws one provider group.
pub(crate) fn draw_group(ui: &mut egui::Ui, cx: &mut PanelContext<'_>, group: &Group) {
    let status = group_status(group, |entry| cx.rendered_value(entry), &*cx.errors);
    match group {
        Group::Entries(entries) => draw_entries_group(ui, cx, group, entries, status),
        Group::List(list) => draw_list_group(ui, cx, list, status),
    }
}

fn header_text(ui: &egui::Ui, label: &str, status: GroupStatus) -> egui::RichText {
    let text = if status.edited {
        format!("{label} •")
    } else {
        label.to_string()
    };
    let text = egui::RichText::new(text).strong();
    if status.has_errors {
        text.color(ui.visuals().error_fg_color)
    } else {
        text
    }
}

fn draw_entries_group(
    ui: &mut egui::Ui,
    cx: &mut PanelContext<'_>,
    group: &Group,
    entries: &EntriesGroup,
    status: GroupStatus,
) {
    let open = is_group_open(&*cx.layout, group);
    let response = egui::CollapsingHeader::new(header_text(ui, &entries.label, status))
        .id_salt(("group", &entries.id))
        .open(Some(open))
        .show(ui, |ui| {
            for entry in &entries.entries {
                draw_entry(ui, cx, entry, false);
            }
        });
    if response.header_response.clicked() {
        if let Err(err) = toggle_group(&mut *cx.layout, group) {
            log::warn!("failed to store open state of {}: {err}", entries.id);
        }
    }
}

fn draw_list_group(
    ui: &mut egui::Ui,
    cx: &mut PanelContext<'_>,
    list: &ListGroup,
    status: GroupStatus,
) {
    let mut controller = cx
        .lists
        .remove(&list.id)
        .unwrap_or_else(|| ListController::new(list.id.as_str()));
    match controller.begin_pass(&mut *cx.layout, &cx.element.id, list) {
        Ok(pass) => {
            let focus = controller.take_focus_request();
            draw_list(ui, cx, &mut controller, list, status, &pass, focus);
        }
        Err(err) => log::warn!("failed to prepare list {}: {err}", list.id),
    }
    cx.lists.insert(list.id.clone(), controller);
}

fn draw_list(
    ui: &mut egui::Ui,
    cx: &mut PanelContext<'_>,
    controller: &mut ListController,
    list: &ListGroup,
    status: GroupStatus,
    pass: &ListPass,
    focus: Option<FocusRequest>,
) {
    ui.push_id(("list", &list.id), |ui| {
        ui.horizontal(|ui| {
            let icon = if pass.open { "⏷" } else { "⏵" };
            let header = ui.add_enabled(
                !list.items.is_empty(),
                egui::Button::new(header_text(ui, &format!("{icon} {}", list.label), status))
                    .frame(false),
            );
            if header.clicked() {
                if let Err(err) = controller.toggle(&mut *cx.layout, list) {
                    log::warn!("failed to store open state of {}: {err}", list.id);
                }
            }
            ui.label(egui::RichText::new(list.items.len().to_string()).small().strong());

            if let Some(add) = &list.add {
                if ui.small_button("+").on_hover_text("Create new list item").clicked() {
                    controller.trigger_add();
                    cx.effects.push(PanelEffect::AddItem {
                        element: cx.element.clone(),
                        list_id: list.id.clone(),
                        add: Rc::clone(add),
                    });
                }
            }
        });

        if pass.open {
            ui.indent("items", |ui| draw_rows(ui, cx, controller, list, pass, focus));
        }
    });
}

fn draw_rows(
    ui: &mut egui::Ui,
    cx: &mut PanelContext<'_>,
    controller: &mut ListController,
    list: &ListGroup,
    pass: &ListPass,
    focus: Option<FocusRequest>,
) {
    for row in &pass.rows {
        ui.push_id(&row.key, |ui| {
            ui.horizontal(|ui| {
                let icon = if row.open { "⏷" } else { "⏵" };
                let label = if row.item.label.is_empty() {
                    "<empty>"
                } else {
                    row.item.label.as_str()
                };
                let header = ui.add(egui::Button::new(format!("{icon} {label}")).frame(false));
                if header.clicked() {
                    if let Err(err) = controller.toggle_item(&mut *cx.layout, &row.item.id) {
                        log::warn!("failed to store open state of {}: {err}", row.item.id);
                    }
                }
                if let Some(remove) = &list.remove {
                    if ui.small_button("🗑").on_hover_text("Delete item").clicked() {
                        cx.effects.push(PanelEffect::RemoveItem {
                            element: cx.element.clone(),
                            list_id: list.id.clone(),
                            item: Rc::clone(&row.item),
                            remove: Rc::clone(remove),
                        });
                    }
                }
            });

            if row.open {
                ui.indent("entries", |ui| {
                    for entry in &row.item.entries {
                        let focused = focus
                            .as_ref()
                            .is_some_and(|f| f.item_id == row.item.id && f.entry_id == entry.id);
                        draw_entry(ui, cx, entry, focused);
                    }
                });
            }
        });
    }
}
