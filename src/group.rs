//! Open state and status badges of groups.

use crate::entries::{Entry, FieldValue, Group};
use crate::error::PanelError;
use crate::layout::{group_open_path, use_layout_state, LayoutStore};
use std::collections::HashMap;

/// Validation messages keyed by entry id.
pub type ErrorMap = HashMap<String, String>;

/// Badges shown in a group header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupStatus {
    /// At least one entry reports itself edited
    pub edited: bool,
    /// At least one entry, list rows included, has a validation error
    pub has_errors: bool,
}

/// Computes the header badges of `group`.
///
/// # Arguments
///
/// * `rendered` - Value each entry currently shows, which may be an uncommitted edit
/// * `errors` - Validation messages keyed by entry id
pub fn group_status(
    group: &Group,
    rendered: impl Fn(&Entry) -> FieldValue,
    errors: &ErrorMap,
) -> GroupStatus {
    let edited = match group {
        Group::Entries(group) => group
            .entries
            .iter()
            .any(|entry| entry.is_edited(&rendered(entry))),
        // lists show an item count instead
        Group::List(_) => false,
    };
    let has_errors = group
        .all_entries()
        .iter()
        .any(|entry| errors.contains_key(&entry.id));
    GroupStatus { edited, has_errors }
}

/// Whether a group is expanded according to the layout.
pub fn is_group_open(layout: &dyn LayoutStore, group: &Group) -> bool {
    use_layout_state(layout, group_open_path(group.id()), group.should_open()).0
}

/// Flips the open flag of a group of entries and returns the new state.
pub fn toggle_group(layout: &mut dyn LayoutStore, group: &Group) -> Result<bool, PanelError> {
    let (open, set_open) =
        use_layout_state(&*layout, group_open_path(group.id()), group.should_open());
    set_open.set(layout, !open)?;
    Ok(!open)
}
