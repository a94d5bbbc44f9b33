//! Path-addressed access to the persisted panel layout.
//!
//! The layout is a nested JSON object, e.g.
//!
//! ```json
//! { "groups": { "general": { "open": true } },
//!   "lists": { "input-mappings": { "Mapping_1": { "open": false } } } }
//! ```
//!
//! Components never cache layout values: every read goes to the store and every write
//! replaces the complete value at its path, so the store stays the single source of truth.

use crate::constants::{LAYOUT_GROUPS_KEY, LAYOUT_LISTS_KEY, LAYOUT_OPEN_KEY};
use crate::error::PanelError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// One step of a layout path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index (object key when the container is an object)
    Index(usize),
}

impl PathSegment {
    fn as_key(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<&String> for PathSegment {
    fn from(key: &String) -> Self {
        PathSegment::Key(key.clone())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Address of a value inside the layout.
pub type LayoutPath = Vec<PathSegment>;

/// Builds a [`LayoutPath`] from anything convertible into segments.
pub fn layout_path<I, S>(segments: I) -> LayoutPath
where
    I: IntoIterator<Item = S>,
    S: Into<PathSegment>,
{
    segments.into_iter().map(Into::into).collect()
}

/// `["groups", group_id, "open"]`
pub fn group_open_path(group_id: &str) -> LayoutPath {
    layout_path([LAYOUT_GROUPS_KEY, group_id, LAYOUT_OPEN_KEY])
}

/// `["lists", list_id, item_id, "open"]`
pub fn list_item_open_path(list_id: &str, item_id: &str) -> LayoutPath {
    layout_path([LAYOUT_LISTS_KEY, list_id, item_id, LAYOUT_OPEN_KEY])
}

/// Key-path addressable store the panel reads and writes but does not own.
pub trait LayoutStore {
    /// Returns the value at `path`, or `default` if nothing is stored there.
    fn get_layout_for_key(&self, path: &[PathSegment], default: Value) -> Value;

    /// Overwrites the value at `path`, creating intermediate objects as needed.
    fn set_layout_for_key(&mut self, path: &[PathSegment], value: Value);
}

/// Typed setter half of [`use_layout_state`].
#[derive(Debug, Clone)]
pub struct LayoutSetter<T> {
    path: LayoutPath,
    _value: PhantomData<fn(T)>,
}

impl<T: Serialize> LayoutSetter<T> {
    /// Writes `value` to the setter's path.
    pub fn set(&self, store: &mut dyn LayoutStore, value: T) -> Result<(), PanelError> {
        let value = serde_json::to_value(value)?;
        store.set_layout_for_key(&self.path, value);
        Ok(())
    }

    /// Path this setter writes to.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }
}

/// Reads the typed value at `path` and returns it with a setter for the same path.
///
/// Reads fail soft: a missing path, or a stored value that does not deserialize into
/// `T`, yields `default`.
pub fn use_layout_state<T>(
    store: &dyn LayoutStore,
    path: LayoutPath,
    default: T,
) -> (T, LayoutSetter<T>)
where
    T: Serialize + DeserializeOwned + Clone,
{
    let fallback = serde_json::to_value(default.clone()).unwrap_or(Value::Null);
    let raw = store.get_layout_for_key(&path, fallback);
    let current = match serde_json::from_value(raw) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("ignoring layout value at {path:?}: {err}");
            default
        }
    };
    (
        current,
        LayoutSetter {
            path,
            _value: PhantomData,
        },
    )
}

/// Layout held in memory as a JSON object, with an optional change callback.
pub struct Layout {
    value: Value,
    on_changed: Option<Box<dyn FnMut(&Value)>>,
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout").field("value", &self.value).finish()
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl Layout {
    /// Wraps an existing layout blob. Anything but an object starts an empty layout.
    pub fn new(value: Value) -> Self {
        let value = if value.is_object() {
            value
        } else {
            Value::Object(Map::new())
        };
        Self {
            value,
            on_changed: None,
        }
    }

    /// Registers a callback invoked with the complete layout after every write.
    pub fn on_changed(mut self, callback: impl FnMut(&Value) + 'static) -> Self {
        self.on_changed = Some(Box::new(callback));
        self
    }

    /// The complete layout blob.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Serialize the layout to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.value)
    }

    /// Deserialize a layout from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl LayoutStore for Layout {
    fn get_layout_for_key(&self, path: &[PathSegment], default: Value) -> Value {
        let mut current = &self.value;
        for segment in path {
            let next = match (current, segment) {
                (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
                (Value::Object(map), segment) => map.get(&segment.as_key()),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return default,
            }
        }
        if current.is_null() {
            default
        } else {
            current.clone()
        }
    }

    fn set_layout_for_key(&mut self, path: &[PathSegment], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            self.value = value;
            return;
        };
        let mut current = &mut self.value;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                unreachable!("replaced by an object above")
            };
            current = map
                .entry(segment.as_key())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Value::Object(map) = current {
            map.insert(last.as_key(), value);
        }
        if let Some(callback) = self.on_changed.as_mut() {
            callback(&self.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn missing_paths_yield_the_default() {
        let layout = Layout::new(json!({ "groups": { "general": { "open": true } } }));
        let (open, _) = use_layout_state(&layout, group_open_path("other"), false);
        assert!(!open);
        let (open, _) = use_layout_state(&layout, group_open_path("general"), false);
        assert!(open);
    }

    #[test]
    fn wrong_typed_values_yield_the_default() {
        let layout = Layout::new(json!({ "groups": { "general": { "open": "yes" } } }));
        let (open, _) = use_layout_state(&layout, group_open_path("general"), true);
        assert!(open);
    }

    #[test]
    fn setter_creates_the_nested_shape() {
        let mut layout = Layout::default();
        let (_, set_open) =
            use_layout_state(&layout, list_item_open_path("input-mappings", "Mapping_1"), false);
        set_open.set(&mut layout, true).unwrap();

        assert_eq!(
            layout.value(),
            &json!({ "lists": { "input-mappings": { "Mapping_1": { "open": true } } } })
        );
        let (open, _) =
            use_layout_state(&layout, list_item_open_path("input-mappings", "Mapping_1"), false);
        assert!(open);
    }

    #[test]
    fn writes_overwrite_non_object_intermediates() {
        let mut layout = Layout::new(json!({ "groups": 3 }));
        layout.set_layout_for_key(&group_open_path("general"), json!(true));
        assert_eq!(layout.value(), &json!({ "groups": { "general": { "open": true } } }));
    }

    #[test]
    fn index_segments_address_arrays_and_objects() {
        let layout = Layout::new(json!({ "widths": [100, 200], "named": { "1": "x" } }));
        assert_eq!(
            layout.get_layout_for_key(&layout_path([PathSegment::from("widths"), PathSegment::Index(1)]), json!(0)),
            json!(200)
        );
        assert_eq!(
            layout.get_layout_for_key(&layout_path([PathSegment::from("named"), PathSegment::Index(1)]), json!(null)),
            json!("x")
        );
    }

    #[test]
    fn change_callback_sees_the_complete_layout() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut layout = Layout::default().on_changed(move |value| sink.borrow_mut().push(value.clone()));

        layout.set_layout_for_key(&group_open_path("a"), json!(true));
        layout.set_layout_for_key(&group_open_path("b"), json!(false));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], json!({ "groups": { "a": { "open": true }, "b": { "open": false } } }));
    }

    #[test]
    fn layout_round_trips_through_json() {
        let mut layout = Layout::default();
        layout.set_layout_for_key(&group_open_path("general"), json!(true));
        let restored = Layout::from_json(&layout.to_json().unwrap()).unwrap();
        assert_eq!(restored.value(), layout.value());
    }
}
