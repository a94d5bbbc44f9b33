//! State behind a rendered list group.
//!
//! [`ListController`] owns the ordering record and the key registry of one list and
//! combines them with the layout store: the list's own open flag lives at
//! `["groups", list_id, "open"]`, each row's at `["lists", list_id, item_id, "open"]`.
//! A row opened because the user just added it is open transiently and is not written
//! to the layout.

use crate::entries::{ListGroup, ListItem};
use crate::error::PanelError;
use crate::key_registry::KeyRegistry;
use crate::layout::{group_open_path, list_item_open_path, use_layout_state, LayoutStore};
use crate::ordering::{ItemId, OrderingState, ReconcileInput, Reconciliation, Trigger};
use std::collections::HashSet;
use std::rc::Rc;

/// Field that should receive keyboard focus on the next draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRequest {
    /// Row holding the field
    pub item_id: ItemId,
    /// Entry to focus
    pub entry_id: String,
}

/// One row as it should be drawn in this pass.
#[derive(Debug, Clone)]
pub struct ListRow {
    /// Row data
    pub item: Rc<ListItem>,
    /// Widget key, stable for as long as the row's domain object lives
    pub key: String,
    /// Whether the row is expanded
    pub open: bool,
}

/// Result of preparing a list for drawing.
#[derive(Debug, Clone)]
pub struct ListPass {
    /// Whether the list itself is expanded
    pub open: bool,
    /// Rows in display order
    pub rows: Vec<ListRow>,
    /// Engine outcome of this pass
    pub reconciliation: Reconciliation,
}

/// Per-list state carried between frames.
#[derive(Debug)]
pub struct ListController {
    list_id: String,
    ordering: OrderingState,
    keys: KeyRegistry,
    auto_opened: HashSet<ItemId>,
    pending_focus: Option<FocusRequest>,
}

impl ListController {
    /// Creates the state of list `list_id`.
    pub fn new(list_id: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            ordering: OrderingState::new(),
            keys: KeyRegistry::new(),
            auto_opened: HashSet::new(),
            pending_focus: None,
        }
    }

    /// Id of the list.
    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    /// Carried ordering record.
    pub fn ordering(&self) -> &OrderingState {
        &self.ordering
    }

    /// Whether the list is expanded according to the layout.
    pub fn is_open(&self, layout: &dyn LayoutStore, default_open: bool) -> bool {
        use_layout_state(layout, group_open_path(&self.list_id), default_open).0
    }

    /// Reconciles the list against its current items and works out what to draw.
    pub fn begin_pass(
        &mut self,
        layout: &mut dyn LayoutStore,
        element_id: &str,
        group: &ListGroup,
    ) -> Result<ListPass, PanelError> {
        let (mut open, set_open) =
            use_layout_state(&*layout, group_open_path(&self.list_id), group.should_open);

        let reconciliation = self.ordering.reconcile(ReconcileInput {
            element: element_id,
            items: &group.items,
            open,
            compare: group.compare.as_ref(),
        });

        if reconciliation.trigger == Trigger::ElementChanged {
            self.auto_opened.clear();
            self.pending_focus = None;
            self.keys.prune();
        }
        if reconciliation.force_open {
            set_open.set(layout, true)?;
            open = true;
        }
        if open && group.items.is_empty() {
            set_open.set(layout, false)?;
            open = false;
        }
        if !open {
            self.auto_opened.clear();
        }

        let current: HashSet<&str> = group.items.iter().map(|item| item.id.as_str()).collect();
        self.auto_opened.retain(|id| current.contains(id.as_str()));
        self.auto_opened
            .extend(reconciliation.freshly_added.iter().cloned());

        // focus the topmost freshly added row
        if let Some(item) = reconciliation
            .order
            .iter()
            .find(|id| reconciliation.freshly_added.contains(*id))
            .and_then(|id| group.items.iter().find(|item| &item.id == id))
        {
            self.pending_focus = item.focus_target().map(|entry| FocusRequest {
                item_id: item.id.clone(),
                entry_id: entry.id.clone(),
            });
        }

        let mut rows = Vec::with_capacity(reconciliation.order.len());
        for id in &reconciliation.order {
            let Some(item) = group.items.iter().find(|item| &item.id == id) else {
                continue;
            };
            let key = self.row_key(item);
            let open = self.is_item_open(&*layout, id);
            rows.push(ListRow {
                item: Rc::clone(item),
                key,
                open,
            });
        }

        Ok(ListPass {
            open,
            rows,
            reconciliation,
        })
    }

    /// Header click. Lists without items never open.
    ///
    /// # Returns
    ///
    /// The open state after the click.
    pub fn toggle(
        &mut self,
        layout: &mut dyn LayoutStore,
        group: &ListGroup,
    ) -> Result<bool, PanelError> {
        let (open, set_open) =
            use_layout_state(&*layout, group_open_path(&self.list_id), group.should_open);
        if group.items.is_empty() {
            return Ok(false);
        }
        set_open.set(layout, !open)?;
        Ok(!open)
    }

    /// Records a click on the add button; the next items change counts as intentional.
    pub fn trigger_add(&mut self) {
        self.ordering.trigger_add();
    }

    /// Whether a row is expanded.
    pub fn is_item_open(&self, layout: &dyn LayoutStore, item_id: &str) -> bool {
        self.auto_opened.contains(item_id)
            || use_layout_state(layout, list_item_open_path(&self.list_id, item_id), false).0
    }

    /// Row header click.
    ///
    /// # Returns
    ///
    /// The row's open state after the click.
    pub fn toggle_item(
        &mut self,
        layout: &mut dyn LayoutStore,
        item_id: &str,
    ) -> Result<bool, PanelError> {
        let open = self.is_item_open(&*layout, item_id);
        self.auto_opened.remove(item_id);
        let (_, set_open) =
            use_layout_state(&*layout, list_item_open_path(&self.list_id, item_id), false);
        set_open.set(layout, !open)?;
        Ok(!open)
    }

    /// Focus request left by the last pass, if not yet consumed.
    pub fn pending_focus(&self) -> Option<&FocusRequest> {
        self.pending_focus.as_ref()
    }

    /// Consumes the focus request.
    pub fn take_focus_request(&mut self) -> Option<FocusRequest> {
        self.pending_focus.take()
    }

    fn row_key(&mut self, item: &Rc<ListItem>) -> String {
        match &item.source {
            Some(source) => self.keys.get_key(source),
            None => item.id.clone(),
        }
    }
}
