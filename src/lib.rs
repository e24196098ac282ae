//! # Compstore - Component Store
//!
//! Persistence layer for a hierarchical inventory of beamline components.
//!
//! Compstore provides:
//! - A polymorphic component record keyed by a kind discriminator
//!   (group, quadrupole, crystal) with per-kind attributes
//! - SQLite-backed storage with either one table per kind or a single wide table
//! - A self-referential parent/children tree keyed by name at each level
//! - Name-path navigation and an in-memory arena snapshot of the hierarchy

pub mod component;
pub mod path;
pub mod tree;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use component::{Attributes, Component, ComponentId, ComponentKind, NewComponent};
pub use config::{CompstoreConfig, StorageLayout, StoreConfig};
pub use path::ComponentPath;
pub use storage::ComponentStore;
pub use tree::ComponentTree;

/// Result type alias for Compstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Compstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid attributes for {kind}: {reason}")]
    InvalidVariant { kind: ComponentKind, reason: String },

    #[error("Component {parent} already has a child named '{name}'")]
    DuplicateName { parent: ComponentId, name: String },

    #[error("Attaching {child} under {parent} would create a cycle")]
    Cycle { parent: ComponentId, child: ComponentId },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Invalid component name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path '{path}' matches {count} root components")]
    AmbiguousPath { path: String, count: usize },

    #[error("Unknown component kind: {0}")]
    UnknownKind(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Failures of the underlying storage operation.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("component {child} references parent {parent}, which is neither saved nor in the batch")]
    UnsavedParent { child: ComponentId, parent: ComponentId },

    #[error("component {0} has no pending changes to save")]
    NotPending(ComponentId),

    #[error("database uses the {stored} layout but the store was opened with the {requested} layout")]
    LayoutMismatch { stored: StorageLayout, requested: StorageLayout },

    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: ComponentId, reason: String },
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(PersistenceError::Sqlite(err))
    }
}
