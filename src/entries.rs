//! Field, entry and group descriptors supplied by providers.
//!
//! Descriptors are plain data plus shared callbacks, rebuilt whenever the panel resolves
//! groups for an element. Callbacks never run while the panel is drawing: the renderer
//! records [`PanelEffect`](crate::panel::PanelEffect)s and the host applies them
//! against its [`Modeling`] service afterwards.

use crate::error::PanelError;
use crate::model::{BusinessObjectRef, Element};
use crate::modeling::Modeling;
use crate::ordering::{compare_labels, Comparator, ItemId, Orderable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::rc::Rc;

/// Value carried by a field widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum FieldValue {
    /// Nothing set
    #[default]
    None,
    /// Text, text area, select and expression fields
    Text(String),
    /// Number fields
    Number(f64),
    /// Checkbox and toggle fields
    Bool(bool),
}

impl FieldValue {
    /// Converts a business object property into a field value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::None,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Converts the value back into a business object property.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::None => Value::Null,
            FieldValue::Text(s) if s.is_empty() => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Text view of the value; numbers and booleans are formatted.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::None => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// Boolean view of the value; anything but `Bool(true)` is false.
    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }

    /// Numeric view of the value, parsing text when needed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// True for `None` and empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::None => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Value committed when chosen
    pub value: String,
    /// Text shown to the user
    pub label: String,
}

impl SelectOption {
    /// Creates an option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Widget used to edit an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Single-line text
    Text,
    /// Multi-line text
    TextArea {
        /// Visible rows
        rows: usize,
    },
    /// Numeric input
    Number {
        /// Smallest accepted value
        min: Option<f64>,
        /// Largest accepted value
        max: Option<f64>,
    },
    /// Drop-down of fixed options
    Select {
        /// Choices in display order
        options: Vec<SelectOption>,
    },
    /// Checkbox
    Checkbox,
    /// Switch-style boolean
    Toggle,
    /// Expression input with a pop-out editor
    Expression,
    /// Read-only text
    Static,
}

impl FieldKind {
    /// Whether the field takes keyboard focus when its list item is auto-focused.
    pub fn is_focusable(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::TextArea { .. }
                | FieldKind::Number { .. }
                | FieldKind::Select { .. }
                | FieldKind::Expression
        )
    }

    /// Whether edits are committed through the debouncer by default.
    pub fn debounces_by_default(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::TextArea { .. } | FieldKind::Expression
        )
    }
}

/// Reads the value of an entry from the element.
pub type GetValue = Rc<dyn Fn(&Element) -> FieldValue>;
/// Writes the value of an entry through the modeling service.
pub type SetValue = Rc<dyn Fn(&mut dyn Modeling, &Element, FieldValue) -> Result<(), PanelError>>;
/// Decides whether an entry shows the "edited" marker, given its rendered value.
pub type IsEdited = Rc<dyn Fn(&FieldValue) -> bool>;
/// Returns a validation message for an invalid value.
pub type Validate = Rc<dyn Fn(&FieldValue) -> Option<String>>;

/// A single labelled field bound to the selected element.
#[derive(Clone)]
pub struct Entry {
    /// Unique id within the panel
    pub id: String,
    /// Field label
    pub label: String,
    /// Help text shown below the field
    pub description: Option<String>,
    /// Widget used to edit the value
    pub field: FieldKind,
    /// Whether text edits are committed through the debouncer
    pub debounce: bool,
    get_value: GetValue,
    set_value: SetValue,
    is_edited: Option<IsEdited>,
    validate: Option<Validate>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl Entry {
    /// Creates an entry from explicit getter and setter callbacks.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        field: FieldKind,
        get_value: impl Fn(&Element) -> FieldValue + 'static,
        set_value: impl Fn(&mut dyn Modeling, &Element, FieldValue) -> Result<(), PanelError> + 'static,
    ) -> Self {
        let debounce = field.debounces_by_default();
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            field,
            debounce,
            get_value: Rc::new(get_value),
            set_value: Rc::new(set_value),
            is_edited: None,
            validate: None,
        }
    }

    /// Creates an entry bound to property `key` of the element's business object.
    pub fn property(
        id: impl Into<String>,
        label: impl Into<String>,
        field: FieldKind,
        key: impl Into<String>,
    ) -> Self {
        let key: Rc<str> = Rc::from(key.into());
        let read_key = Rc::clone(&key);
        Self::new(
            id,
            label,
            field,
            move |element| FieldValue::from_json(&element.business_object.borrow().get(&read_key)),
            move |modeling, element, value| {
                let mut properties = Map::new();
                properties.insert(key.to_string(), value.to_json());
                modeling.update_properties(element, properties)
            },
        )
    }

    /// Creates an entry bound to property `key` of a nested business object.
    pub fn nested_property(
        id: impl Into<String>,
        label: impl Into<String>,
        field: FieldKind,
        target: BusinessObjectRef,
        key: impl Into<String>,
    ) -> Self {
        let key: Rc<str> = Rc::from(key.into());
        let read_key = Rc::clone(&key);
        let read_target = Rc::clone(&target);
        Self::new(
            id,
            label,
            field,
            move |_| FieldValue::from_json(&read_target.borrow().get(&read_key)),
            move |modeling, element, value| {
                let mut properties = Map::new();
                properties.insert(key.to_string(), value.to_json());
                modeling.update_moddle_properties(element, &target, properties)
            },
        )
    }

    /// Adds help text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the "edited" predicate.
    pub fn with_is_edited(mut self, is_edited: impl Fn(&FieldValue) -> bool + 'static) -> Self {
        self.is_edited = Some(Rc::new(is_edited));
        self
    }

    /// Sets the validation callback.
    pub fn with_validate(mut self, validate: impl Fn(&FieldValue) -> Option<String> + 'static) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    /// Overrides whether edits are debounced.
    pub fn debounced(mut self, debounce: bool) -> Self {
        self.debounce = debounce;
        self
    }

    /// Current value of the entry for `element`.
    pub fn value(&self, element: &Element) -> FieldValue {
        (self.get_value)(element)
    }

    /// Whether the rendered value counts as edited. Entries without a predicate never do.
    pub fn is_edited(&self, rendered: &FieldValue) -> bool {
        self.is_edited
            .as_ref()
            .is_some_and(|is_edited| is_edited(rendered))
    }

    /// Validation message for `value`, if it is invalid.
    pub fn validate(&self, value: &FieldValue) -> Option<String> {
        self.validate.as_ref().and_then(|validate| validate(value))
    }

    /// Validates and writes `value` through `modeling`.
    pub fn commit(
        &self,
        modeling: &mut dyn Modeling,
        element: &Element,
        value: FieldValue,
    ) -> Result<(), PanelError> {
        if let Some(reason) = self.validate(&value) {
            return Err(PanelError::InvalidValue {
                entry: self.id.clone(),
                reason,
            });
        }
        (self.set_value)(modeling, element, value)
    }
}

/// `is_edited` predicate treating any non-empty value as edited.
pub fn is_edited_when_set(value: &FieldValue) -> bool {
    !value.is_empty()
}

/// `is_edited` predicate for checkboxes: edited while checked.
pub fn is_edited_when_checked(value: &FieldValue) -> bool {
    value.as_bool()
}

/// One row of a dynamic list.
#[derive(Clone)]
pub struct ListItem {
    /// Stable id from the domain model
    pub id: ItemId,
    /// Row header, also the sort key
    pub label: String,
    /// Sub-form of the row
    pub entries: Vec<Entry>,
    /// Entry to focus when the row was just added; defaults to the first focusable one
    pub auto_focus_entry: Option<String>,
    /// Domain object behind the row, used to key its widgets by identity
    pub source: Option<Rc<dyn Any>>,
}

impl std::fmt::Debug for ListItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl ListItem {
    /// Creates a row.
    pub fn new(id: impl Into<ItemId>, label: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            entries,
            auto_focus_entry: None,
            source: None,
        }
    }

    /// Ties the row's widget identity to a domain object.
    pub fn with_source(mut self, source: Rc<dyn Any>) -> Self {
        self.source = Some(source);
        self
    }

    /// Names the entry to focus when the row is freshly added.
    pub fn with_auto_focus_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.auto_focus_entry = Some(entry_id.into());
        self
    }

    /// Entry that receives focus when the row is freshly added.
    pub fn focus_target(&self) -> Option<&Entry> {
        match &self.auto_focus_entry {
            Some(id) => self.entries.iter().find(|e| &e.id == id),
            None => self.entries.iter().find(|e| e.field.is_focusable()),
        }
    }
}

impl Orderable for ListItem {
    fn item_id(&self) -> &str {
        &self.id
    }
}

/// Callback behind a list's add affordance.
pub type AddItem = Rc<dyn Fn(&mut dyn Modeling, &Element) -> Result<(), PanelError>>;
/// Callback behind a row's remove affordance.
pub type RemoveItem = Rc<dyn Fn(&mut dyn Modeling, &Element, &ListItem) -> Result<(), PanelError>>;

/// A collapsible group of fixed entries.
#[derive(Debug, Clone)]
pub struct EntriesGroup {
    /// Unique group id
    pub id: String,
    /// Header text
    pub label: String,
    /// Entries in display order
    pub entries: Vec<Entry>,
    /// Open state for a group that was never toggled
    pub should_open: bool,
}

/// A collapsible group holding a dynamic list of rows.
#[derive(Clone)]
pub struct ListGroup {
    /// Unique group (and list) id
    pub id: String,
    /// Header text
    pub label: String,
    /// Current rows in source order
    pub items: Vec<Rc<ListItem>>,
    /// Add affordance; `None` hides the add button
    pub add: Option<AddItem>,
    /// Remove affordance; `None` hides the remove buttons
    pub remove: Option<RemoveItem>,
    /// Display comparator; `None` disables sorting
    pub compare: Option<Comparator<Rc<ListItem>>>,
    /// Open state for a list that was never toggled
    pub should_open: bool,
}

impl std::fmt::Debug for ListGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListGroup")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("items", &self.items)
            .field("sorted", &self.compare.is_some())
            .finish_non_exhaustive()
    }
}

impl ListGroup {
    /// Creates a list group sorted by row label.
    pub fn new(id: impl Into<String>, label: impl Into<String>, items: Vec<ListItem>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            items: items.into_iter().map(Rc::new).collect(),
            add: None,
            remove: None,
            compare: Some(label_comparator()),
            should_open: false,
        }
    }

    /// Sets the add callback.
    pub fn with_add(
        mut self,
        add: impl Fn(&mut dyn Modeling, &Element) -> Result<(), PanelError> + 'static,
    ) -> Self {
        self.add = Some(Rc::new(add));
        self
    }

    /// Sets the remove callback.
    pub fn with_remove(
        mut self,
        remove: impl Fn(&mut dyn Modeling, &Element, &ListItem) -> Result<(), PanelError> + 'static,
    ) -> Self {
        self.remove = Some(Rc::new(remove));
        self
    }

    /// Replaces the comparator; `None` keeps rows in insertion order.
    pub fn with_compare(mut self, compare: Option<Comparator<Rc<ListItem>>>) -> Self {
        self.compare = compare;
        self
    }
}

/// Case-insensitive comparator over row labels.
pub fn label_comparator() -> Comparator<Rc<ListItem>> {
    Rc::new(|a: &Rc<ListItem>, b: &Rc<ListItem>| compare_labels(&a.label, &b.label))
}

/// A group as returned by providers.
#[derive(Debug, Clone)]
pub enum Group {
    /// Fixed entries
    Entries(EntriesGroup),
    /// Dynamic list
    List(ListGroup),
}

impl Group {
    /// Creates a closed group of fixed entries.
    pub fn entries(id: impl Into<String>, label: impl Into<String>, entries: Vec<Entry>) -> Self {
        Group::Entries(EntriesGroup {
            id: id.into(),
            label: label.into(),
            entries,
            should_open: false,
        })
    }

    /// Group id.
    pub fn id(&self) -> &str {
        match self {
            Group::Entries(group) => &group.id,
            Group::List(group) => &group.id,
        }
    }

    /// Header text.
    pub fn label(&self) -> &str {
        match self {
            Group::Entries(group) => &group.label,
            Group::List(group) => &group.label,
        }
    }

    /// Default open state.
    pub fn should_open(&self) -> bool {
        match self {
            Group::Entries(group) => group.should_open,
            Group::List(group) => group.should_open,
        }
    }

    /// Marks the group open by default.
    pub fn opened(mut self) -> Self {
        match &mut self {
            Group::Entries(group) => group.should_open = true,
            Group::List(group) => group.should_open = true,
        }
        self
    }

    /// Every entry of the group, including entries of list rows.
    pub fn all_entries(&self) -> Vec<&Entry> {
        match self {
            Group::Entries(group) => group.entries.iter().collect(),
            Group::List(group) => group.items.iter().flat_map(|item| item.entries.iter()).collect(),
        }
    }

    /// Finds an entry by id anywhere in the group.
    pub fn find_entry(&self, id: &str) -> Option<&Entry> {
        self.all_entries().into_iter().find(|entry| entry.id == id)
    }

    /// Groups without anything to show are not rendered. Lists always render (empty state).
    pub fn is_renderable(&self) -> bool {
        match self {
            Group::Entries(group) => !group.entries.is_empty(),
            Group::List(_) => true,
        }
    }
}
