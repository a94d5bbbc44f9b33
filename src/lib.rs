//! # Properties Panel
//!
//! An element-aware properties panel for a BPMN-style diagram editor. Given the element
//! selected in the diagram, the panel asks registered providers for groups of editable
//! fields and renders them with egui.
//!
//! ## Features
//! - Providers contributing groups in priority order
//! - Collapsible groups whose open state lives in an external layout store
//! - Dynamic lists with add/remove, first-open sorting and stable row ordering
//! - Debounced text commits with validation
//! - Undoable writes through a modeling service
//! - An expression editor popup that hands focus back to its field

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod debounce;
pub mod demo;
pub mod entries;
pub mod error;
pub mod events;
pub mod group;
pub mod key_registry;
pub mod layout;
pub mod list;
pub mod model;
pub mod modeling;
pub mod ordering;
pub mod panel;
pub mod provider;
mod ui;

// Re-export the types hosts need most
pub use config::PanelConfig;
pub use entries::{Entry, FieldKind, FieldValue, Group, ListGroup, ListItem};
pub use error::PanelError;
pub use events::{EventBus, PanelEvent};
pub use layout::{Layout, LayoutStore};
pub use model::{BusinessObject, DiagramModel, Element, ElementKind};
pub use modeling::{CommandStack, Modeling};
pub use panel::{DiagramHost, PanelEffect, PanelRoot, PanelSelection};
pub use provider::PropertiesProvider;
pub use ui::{
    type_label, ExpressionPopup, PropertiesApp, PropertiesPanelView, CONFIG_STORAGE_KEY,
    EMPTY_PLACEHOLDER, MULTIPLE_PLACEHOLDER,
};

/// Runs the demo application: a sample process next to its properties panel.
///
/// The panel layout and width are restored from the previous session if eframe
/// persisted one.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), eframe::Error> {
///     properties_panel::run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Properties Panel",
        options,
        Box::new(|cc| Ok(Box::new(PropertiesApp::from_storage(cc.storage)))),
    )
}
