//! Display ordering for dynamic lists.
//!
//! A list keeps a carried order of item ids between renders and only changes it in
//! response to a small set of triggers:
//!
//! - **element changed** (including the first render): re-derive from the items, sorted
//!   when a comparator is configured;
//! - **items changed**: drop removed ids, place added ones (top of the list when the list
//!   is closed or the user pressed "add", natural position otherwise);
//! - **open toggled**: sort once on the first opening after a reset;
//! - anything else (e.g. a label edit) leaves the order untouched.
//!
//! The engine is a pure reducer over [`OrderingState`] and knows nothing about egui.
//! After every step the carried order is a permutation of the current item ids.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Identifier of a list item, assigned by the domain model.
pub type ItemId = String;

/// Anything the engine can order.
pub trait Orderable {
    /// Stable id of the item, unique within its list.
    fn item_id(&self) -> &str;
}

impl<T: Orderable + ?Sized> Orderable for Rc<T> {
    fn item_id(&self) -> &str {
        (**self).item_id()
    }
}

/// Sort comparator over list items. Ties keep their previous relative order.
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// Why a render pass happened, as far as ordering is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First render, or the selection moved to another element
    ElementChanged,
    /// The set of item ids changed
    ItemsChanged,
    /// The list was opened or closed
    OpenToggled,
    /// Nothing that affects ordering
    Silent,
}

/// Inputs of one reducer step.
#[derive(Debug)]
pub enum OrderingAction<'a, T> {
    /// Re-initialise for a (new) element.
    ElementChanged {
        /// Element the list now belongs to
        element: &'a str,
        /// Current items in source order
        items: &'a [T],
        /// Whether the list is open
        open: bool,
    },
    /// Items were added and/or removed.
    ItemsChanged {
        /// Current items in source order
        items: &'a [T],
        /// Whether the list is open
        open: bool,
    },
    /// The list was opened or closed without item changes.
    OpenToggled {
        /// Current items in source order
        items: &'a [T],
        /// Whether the list is open now
        open: bool,
    },
    /// The list's own "add" affordance was used; applies to the next items change.
    AddTriggered,
}

/// Ordering record carried by one list between renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingState {
    order: Vec<ItemId>,
    last_item_ids: HashSet<ItemId>,
    element: Option<String>,
    open: bool,
    added_via_action: bool,
    sorted_since_reset: bool,
    freshly_added: Vec<ItemId>,
    force_open: bool,
}

/// Inputs of one render pass.
pub struct ReconcileInput<'a, T> {
    /// Element the list belongs to
    pub element: &'a str,
    /// Current items in source order
    pub items: &'a [T],
    /// Whether the list is currently open
    pub open: bool,
    /// Comparator, or `None` to disable sorting
    pub compare: Option<&'a Comparator<T>>,
}

/// Outcome of one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// What caused this pass
    pub trigger: Trigger,
    /// Display order of item ids
    pub order: Vec<ItemId>,
    /// Items added through the list's own add action in this pass
    pub freshly_added: Vec<ItemId>,
    /// The list has to be opened to show a freshly added item
    pub force_open: bool,
}

impl OrderingState {
    /// Creates an uninitialised record; the first pass is treated as an element change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Carried display order.
    pub fn order(&self) -> &[ItemId] {
        &self.order
    }

    /// Items flagged as freshly added by the last step.
    pub fn freshly_added(&self) -> &[ItemId] {
        &self.freshly_added
    }

    /// Whether the next items change is attributed to the list's add action.
    pub fn is_add_pending(&self) -> bool {
        self.added_via_action
    }

    /// Element the carried order belongs to.
    pub fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    /// Classifies a render pass.
    pub fn trigger_for<T: Orderable>(&self, input: &ReconcileInput<'_, T>) -> Trigger {
        if self.element.as_deref() != Some(input.element) {
            return Trigger::ElementChanged;
        }
        let current: HashSet<&str> = input.items.iter().map(Orderable::item_id).collect();
        let unchanged = current.len() == self.last_item_ids.len()
            && self.last_item_ids.iter().all(|id| current.contains(id.as_str()));
        if !unchanged {
            Trigger::ItemsChanged
        } else if input.open != self.open {
            Trigger::OpenToggled
        } else {
            Trigger::Silent
        }
    }

    /// Runs one render pass: classifies it, applies the matching reducer step and
    /// returns the resulting order and flags.
    pub fn reconcile<T: Orderable>(&mut self, input: ReconcileInput<'_, T>) -> Reconciliation {
        let trigger = self.trigger_for(&input);
        let state = std::mem::take(self);
        let ReconcileInput {
            element,
            items,
            open,
            compare,
        } = input;
        *self = match trigger {
            Trigger::ElementChanged => reduce(
                state,
                OrderingAction::ElementChanged {
                    element,
                    items,
                    open,
                },
                compare,
            ),
            Trigger::ItemsChanged => {
                reduce(state, OrderingAction::ItemsChanged { items, open }, compare)
            }
            Trigger::OpenToggled => {
                reduce(state, OrderingAction::OpenToggled { items, open }, compare)
            }
            Trigger::Silent => state.settled(),
        };
        debug_assert!(self.is_permutation_of(items));
        Reconciliation {
            trigger,
            order: self.order.clone(),
            freshly_added: self.freshly_added.clone(),
            force_open: self.force_open,
        }
    }

    /// Records a click on the list's add affordance.
    pub fn trigger_add(&mut self) {
        self.added_via_action = true;
    }

    fn settled(mut self) -> Self {
        self.freshly_added.clear();
        self.force_open = false;
        self.added_via_action = false;
        self
    }

    fn is_permutation_of<T: Orderable>(&self, items: &[T]) -> bool {
        let ids = distinct_ids(items);
        let order: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        order.len() == self.order.len()
            && ids.len() == self.order.len()
            && ids.iter().all(|id| order.contains(id.as_str()))
    }
}

/// Applies one reducer step.
pub fn reduce<T: Orderable>(
    state: OrderingState,
    action: OrderingAction<'_, T>,
    compare: Option<&Comparator<T>>,
) -> OrderingState {
    match action {
        OrderingAction::ElementChanged {
            element,
            items,
            open,
        } => {
            let ids = distinct_ids(items);
            let order = match compare {
                Some(compare) => sorted(&ids, &index(items), compare),
                None => ids.clone(),
            };
            OrderingState {
                order,
                last_item_ids: ids.into_iter().collect(),
                element: Some(element.to_string()),
                open,
                ..OrderingState::default()
            }
        }
        OrderingAction::ItemsChanged { items, open } => items_changed(state, items, open, compare),
        OrderingAction::OpenToggled { items, open } => {
            let opening = open && !state.open;
            let mut next = state.settled();
            next.open = open;
            if opening && !next.sorted_since_reset {
                if let Some(compare) = compare {
                    next.order = sorted(&next.order, &index(items), compare);
                }
                next.sorted_since_reset = true;
            }
            next
        }
        OrderingAction::AddTriggered => OrderingState {
            added_via_action: true,
            ..state
        },
    }
}

fn items_changed<T: Orderable>(
    state: OrderingState,
    items: &[T],
    open: bool,
    compare: Option<&Comparator<T>>,
) -> OrderingState {
    let ids = distinct_ids(items);
    let current: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let lookup = index(items);

    let removed_any = state
        .last_item_ids
        .iter()
        .any(|id| !current.contains(id.as_str()));
    let mut order: Vec<ItemId> = state
        .order
        .into_iter()
        .filter(|id| current.contains(id.as_str()))
        .collect();
    let carried: HashSet<ItemId> = order.iter().cloned().collect();
    let added: Vec<ItemId> = ids.iter().filter(|id| !carried.contains(*id)).cloned().collect();

    let via_action = state.added_via_action && !added.is_empty();
    let mut freshly_added = Vec::new();
    let mut force_open = false;
    let mut open_now = open;

    if !open || via_action {
        // most recently added first
        for id in &added {
            order.insert(0, id.clone());
        }
        if via_action {
            freshly_added = added.clone();
            if !open {
                force_open = true;
                open_now = true;
            }
        }
    } else {
        for id in &added {
            let position = match (compare, lookup.get(id.as_str())) {
                (Some(compare), Some(item)) => natural_position(&order, *item, &lookup, compare),
                _ => order.len(),
            };
            order.insert(position, id.clone());
        }
    }

    let sorted_since_reset = state.sorted_since_reset && added.is_empty() && !removed_any;

    OrderingState {
        order,
        last_item_ids: ids.into_iter().collect(),
        element: state.element,
        open: open_now,
        added_via_action: false,
        sorted_since_reset,
        freshly_added,
        force_open,
    }
}

/// Ids of `items` in source order, first occurrence wins.
fn distinct_ids<T: Orderable>(items: &[T]) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(Orderable::item_id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn index<T: Orderable>(items: &[T]) -> HashMap<&str, &T> {
    let mut lookup = HashMap::new();
    for item in items {
        lookup.entry(item.item_id()).or_insert(item);
    }
    lookup
}

/// Stable sort of `ids` by `compare`; ties keep their relative order in `ids`.
fn sorted<T: Orderable>(ids: &[ItemId], lookup: &HashMap<&str, &T>, compare: &Comparator<T>) -> Vec<ItemId> {
    let mut entries: Vec<(&ItemId, &T)> = ids
        .iter()
        .filter_map(|id| lookup.get(id.as_str()).map(|item| (id, *item)))
        .collect();
    // `sort_by` is a stable merge sort
    entries.sort_by(|(_, a), (_, b)| compare(a, b));
    entries.into_iter().map(|(id, _)| id.clone()).collect()
}

/// Index before the first carried item that sorts strictly after `item`.
fn natural_position<T: Orderable>(
    order: &[ItemId],
    item: &T,
    lookup: &HashMap<&str, &T>,
    compare: &Comparator<T>,
) -> usize {
    order
        .iter()
        .position(|id| {
            lookup
                .get(id.as_str())
                .is_some_and(|other| compare(item, other) == Ordering::Less)
        })
        .unwrap_or(order.len())
}

/// Case-insensitive alphanumeric comparison of two labels.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
