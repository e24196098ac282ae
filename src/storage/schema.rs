//! Database schema definitions

use crate::config::StorageLayout;

/// Pragmas applied to every connection
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL to create the metadata table recording the layout in use
pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// Base components table for the separate layout
pub const CREATE_COMPONENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY,
    component_type TEXT NOT NULL,
    name TEXT NOT NULL,
    associated_datafile TEXT,
    parent_id INTEGER REFERENCES components(id)
)
"#;

/// Components table for the wide layout: every variant column is folded in
pub const CREATE_WIDE_COMPONENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY,
    component_type TEXT NOT NULL,
    name TEXT NOT NULL,
    associated_datafile TEXT,
    parent_id INTEGER REFERENCES components(id),
    prop1 REAL,
    prop2 REAL
)
"#;

/// Quadrupole extension table, joined 1:1 on id
pub const CREATE_QUADRUPOLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quadrupoles (
    id INTEGER PRIMARY KEY REFERENCES components(id),
    prop1 REAL
)
"#;

/// Crystal extension table, joined 1:1 on id
pub const CREATE_CRYSTALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS crystals (
    id INTEGER PRIMARY KEY REFERENCES components(id),
    prop2 REAL
)
"#;

/// SQL to create indexes.
///
/// Sibling names are unique per parent. Roots have a NULL parent and SQLite
/// treats NULLs as distinct, so root names may repeat.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_components_sibling_name ON components(parent_id, name)",
    "CREATE INDEX IF NOT EXISTS idx_components_name ON components(name)",
    "CREATE INDEX IF NOT EXISTS idx_components_type ON components(component_type)",
];

/// Metadata key holding the layout name
pub const LAYOUT_KEY: &str = "layout";

/// All schema creation statements for a layout
pub fn all_schema_statements(layout: StorageLayout) -> Vec<&'static str> {
    let mut stmts = vec![CREATE_META_TABLE];
    match layout {
        StorageLayout::Separate => {
            stmts.push(CREATE_COMPONENTS_TABLE);
            stmts.push(CREATE_QUADRUPOLES_TABLE);
            stmts.push(CREATE_CRYSTALS_TABLE);
        }
        StorageLayout::Wide => stmts.push(CREATE_WIDE_COMPONENTS_TABLE),
    }
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// SELECT prefix returning `(id, component_type, name, associated_datafile,
/// parent_id, prop1, prop2)` for every component, whatever its kind.
pub fn select_components(layout: StorageLayout) -> &'static str {
    match layout {
        StorageLayout::Separate => {
            "SELECT c.id, c.component_type, c.name, c.associated_datafile, c.parent_id, q.prop1, x.prop2
             FROM components c
             LEFT JOIN quadrupoles q ON q.id = c.id
             LEFT JOIN crystals x ON x.id = c.id"
        }
        StorageLayout::Wide => {
            "SELECT c.id, c.component_type, c.name, c.associated_datafile, c.parent_id, c.prop1, c.prop2
             FROM components c"
        }
    }
}
