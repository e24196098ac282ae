//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - components(id, component_type, name, associated_datafile, parent_id)
//! - quadrupoles(id, prop1) and crystals(id, prop2) in the separate layout,
//!   or prop1/prop2 folded into components in the wide layout
//! - store_meta(key, value)

pub mod schema;
pub mod sqlite;

pub use sqlite::{ComponentStore, StoreStats};
