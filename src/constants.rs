//! Shared panel-wide constants.
//! Centralizes tweakable values used across the engine, the renderer and the demo host.

// Providers
/// Priority given to providers registered without an explicit one. Lower runs later.
pub const DEFAULT_PROVIDER_PRIORITY: u32 = 1000;
/// Priority used by event listeners registered without an explicit one. Higher runs first.
pub const DEFAULT_LISTENER_PRIORITY: u32 = 1000;

// Layout
/// Top-level layout key holding per-group state.
pub const LAYOUT_GROUPS_KEY: &str = "groups";
/// Top-level layout key holding per-list-item state.
pub const LAYOUT_LISTS_KEY: &str = "lists";
/// Leaf key holding an open/closed flag.
pub const LAYOUT_OPEN_KEY: &str = "open";

// Editing
/// Delay before a debounced text edit is committed, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

// Undo/redo
/// Maximum number of undo history entries to retain.
pub const MAX_UNDO_HISTORY: usize = 100;

// Panel
/// Default width of the properties side panel in logical points.
pub const DEFAULT_PANEL_WIDTH: f32 = 320.0;
/// Narrowest the properties side panel may be resized to.
pub const MIN_PANEL_WIDTH: f32 = 200.0;
