//! Error type shared by the fallible parts of the panel.

use thiserror::Error;

/// Errors surfaced by layout persistence and by the modeling collaborator.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A child object could not be found in the addressed collection.
    #[error("no object `{id}` in collection `{collection}`")]
    UnknownChild {
        /// Name of the collection that was searched
        collection: String,
        /// Id of the missing child
        id: String,
    },
    /// A layout value could not be converted to or from JSON.
    #[error("layout value could not be converted: {0}")]
    Layout(#[from] serde_json::Error),
    /// A field rejected the value it was asked to commit.
    #[error("invalid value for `{entry}`: {reason}")]
    InvalidValue {
        /// Id of the entry that rejected the value
        entry: String,
        /// Human-readable validation message
        reason: String,
    },
}
