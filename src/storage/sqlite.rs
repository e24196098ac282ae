//! SQLite storage implementation

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use rusqlite::{Connection, OptionalExtension, params};
use crate::component::{Attributes, Component, ComponentId, ComponentKind, NewComponent};
use crate::config::{StorageLayout, StoreConfig};
use crate::path::ComponentPath;
use crate::tree::ComponentTree;
use crate::{Error, PersistenceError, Result};
use super::schema;

/// SQLite-backed store for the component hierarchy.
///
/// Components are created pending and written on [`ComponentStore::save`].
/// The parent id on each record is the only stored side of the tree; the
/// children mapping is always derived from it, merging pending changes over
/// the persisted rows.
pub struct ComponentStore {
    conn: Connection,
    layout: StorageLayout,
    next_id: i64,
    pending: BTreeMap<ComponentId, Component>,
}

impl ComponentStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, config: StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: StoreConfig) -> Result<Self> {
        conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        let mut store = Self {
            conn,
            layout: config.layout(),
            next_id: 1,
            pending: BTreeMap::new(),
        };
        store.initialize_schema()?;
        store.next_id = store.max_persisted_id()? + 1;
        tracing::debug!(layout = %store.layout, next_id = store.next_id, "opened component store");
        Ok(store)
    }

    /// Initialize the database schema, refusing a database written with the other layout
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(schema::CREATE_META_TABLE, [])?;

        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                [schema::LAYOUT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(stored) = stored {
            let stored_layout = StorageLayout::parse(&stored).ok_or_else(|| {
                Error::Config(format!("database records unknown layout '{}'", stored))
            })?;
            if stored_layout != self.layout {
                return Err(PersistenceError::LayoutMismatch {
                    stored: stored_layout,
                    requested: self.layout,
                }
                .into());
            }
        }

        for stmt in schema::all_schema_statements(self.layout) {
            self.conn.execute(stmt, [])?;
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO store_meta (key, value) VALUES (?1, ?2)",
            params![schema::LAYOUT_KEY, self.layout.as_str()],
        )?;
        Ok(())
    }

    fn max_persisted_id(&self) -> Result<i64> {
        let max: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM components", [], |row| row.get(0))?;
        Ok(max)
    }

    /// The storage layout this store was opened with
    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    // ========== Creation & Tree Operations ==========

    /// Create a pending component.
    ///
    /// When the draft names a parent, the new component is immediately part of
    /// that parent's children mapping.
    pub fn create(&mut self, draft: NewComponent) -> Result<Component> {
        draft.validate()?;

        if let Some(parent) = draft.parent {
            self.require(parent)?;
            if self.get_children(parent)?.contains_key(&draft.name) {
                return Err(Error::DuplicateName {
                    parent,
                    name: draft.name,
                });
            }
        }

        let id = ComponentId(self.next_id);
        self.next_id += 1;

        let component = Component::from_parts(
            id,
            draft.name,
            draft.associated_datafile,
            draft.parent,
            draft.attributes,
        );
        tracing::debug!(%id, kind = %component.kind(), name = %component.name, "created component");
        self.pending.insert(id, component.clone());
        Ok(component)
    }

    /// Make `child` a direct child of `parent`, moving it away from any
    /// previous parent.
    pub fn attach_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        if parent == child {
            return Err(Error::Cycle { parent, child });
        }
        self.require(parent)?;
        let mut component = self.require(child)?;

        if component.parent == Some(parent) {
            return Ok(());
        }

        if self.ancestor_ids(parent)?.contains(&child) {
            tracing::warn!(%parent, %child, "rejected attach: would create a cycle");
            return Err(Error::Cycle { parent, child });
        }

        if let Some(existing) = self.get_children(parent)?.get(&component.name) {
            if existing.id != child {
                tracing::warn!(%parent, name = %component.name, "rejected attach: duplicate sibling name");
                return Err(Error::DuplicateName {
                    parent,
                    name: component.name,
                });
            }
        }

        tracing::debug!(%parent, %child, previous = ?component.parent, "attached child");
        component.parent = Some(parent);
        self.pending.insert(child, component);
        Ok(())
    }

    /// Turn a component into a root
    pub fn detach(&mut self, child: ComponentId) -> Result<()> {
        let mut component = self.require(child)?;
        if component.parent.is_none() {
            return Ok(());
        }
        tracing::debug!(%child, previous = ?component.parent, "detached component");
        component.parent = None;
        self.pending.insert(child, component);
        Ok(())
    }

    // ========== Persistence ==========

    /// Persist the given pending components in a single transaction.
    ///
    /// Parents inside the batch are written before their children. On any
    /// failure nothing is written and the components stay pending.
    pub fn save(&mut self, ids: &[ComponentId]) -> Result<()> {
        let mut batch: HashMap<ComponentId, Component> = HashMap::new();
        for id in ids {
            let component = self
                .pending
                .get(id)
                .ok_or(PersistenceError::NotPending(*id))?;
            batch.insert(*id, component.clone());
        }
        if batch.is_empty() {
            return Ok(());
        }

        let ordered = self.order_batch(&batch)?;
        let layout = self.layout;

        let tx = self.conn.transaction()?;
        for component in &ordered {
            release_sibling_slot(&tx, component)?;
        }
        for component in &ordered {
            write_component(&tx, layout, component)?;
        }
        tx.commit()?;

        for component in &ordered {
            self.pending.remove(&component.id);
        }
        tracing::info!(count = ordered.len(), layout = %layout, "saved components");
        Ok(())
    }

    /// Persist every pending component
    pub fn save_all(&mut self) -> Result<()> {
        let ids = self.pending_ids();
        self.save(&ids)
    }

    /// Check the tree the batch would leave on disk and order it parents-first.
    fn order_batch(&self, batch: &HashMap<ComponentId, Component>) -> Result<Vec<Component>> {
        let mut depths: HashMap<ComponentId, usize> = HashMap::new();

        for component in batch.values() {
            let mut seen = HashSet::from([component.id]);
            let mut child = component.id;
            let mut current = component.parent;
            let mut depth = 0;

            while let Some(parent) = current {
                if !seen.insert(parent) {
                    return Err(Error::Cycle {
                        parent,
                        child: component.id,
                    });
                }
                current = match batch.get(&parent) {
                    Some(in_batch) => {
                        depth += 1;
                        in_batch.parent
                    }
                    None => match self.persisted_parent(parent)? {
                        Some(grandparent) => grandparent,
                        None => {
                            return Err(PersistenceError::UnsavedParent { child, parent }.into());
                        }
                    },
                };
                child = parent;
            }
            depths.insert(component.id, depth);
        }

        let mut ordered: Vec<Component> = batch.values().cloned().collect();
        ordered.sort_by_key(|c| (depths[&c.id], c.id));
        Ok(ordered)
    }

    /// `None` when the id is not persisted, otherwise its stored parent
    fn persisted_parent(&self, id: ComponentId) -> Result<Option<Option<ComponentId>>> {
        self.conn
            .query_row(
                "SELECT parent_id FROM components WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Ids of components with unsaved changes
    pub fn pending_ids(&self) -> Vec<ComponentId> {
        self.pending.keys().copied().collect()
    }

    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.pending.contains_key(&id)
    }

    // ========== Queries ==========

    /// All persisted components of exactly `kind`, ordered by id
    pub fn query_by_type(&self, kind: ComponentKind) -> Result<Vec<Component>> {
        self.query_persisted("WHERE c.component_type = ?1", params![kind.as_str()])
    }

    /// All persisted components named `name`, of any kind, ordered by id
    pub fn query_by_name(&self, name: &str) -> Result<Vec<Component>> {
        self.query_persisted("WHERE c.name = ?1", params![name])
    }

    /// Live view of one component: pending changes win over the stored row
    pub fn get(&self, id: ComponentId) -> Result<Option<Component>> {
        if let Some(component) = self.pending.get(&id) {
            return Ok(Some(component.clone()));
        }
        self.persisted(id)
    }

    fn require(&self, id: ComponentId) -> Result<Component> {
        self.get(id)?
            .ok_or_else(|| Error::ComponentNotFound(id.to_string()))
    }

    fn persisted(&self, id: ComponentId) -> Result<Option<Component>> {
        let sql = format!("{} WHERE c.id = ?1", schema::select_components(self.layout));
        self.conn
            .query_row(&sql, [id], row_to_component)
            .optional()
            .map_err(Into::into)
    }

    /// Live children mapping of `id`, keyed by child name
    pub fn get_children(&self, id: ComponentId) -> Result<BTreeMap<String, Component>> {
        self.require(id)?;
        let children = self.live_matching(
            "WHERE c.parent_id = ?1",
            params![id],
            |c| c.parent == Some(id),
        )?;
        Ok(children.into_iter().map(|c| (c.name.clone(), c)).collect())
    }

    /// Live root components (no parent), ordered by id
    pub fn roots(&self) -> Result<Vec<Component>> {
        self.live_matching("WHERE c.parent_id IS NULL", params![], |c| c.parent.is_none())
    }

    /// Every live component, ordered by id
    pub fn all(&self) -> Result<Vec<Component>> {
        self.live_matching("", params![], |_| true)
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: ComponentId) -> Result<Vec<Component>> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.require(id)?.parent;

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                return Err(PersistenceError::CorruptRecord {
                    id: parent_id,
                    reason: "parent chain loops".to_string(),
                }
                .into());
            }
            let parent = self.require(parent_id)?;
            current = parent.parent;
            ancestors.push(parent);
        }
        Ok(ancestors)
    }

    fn ancestor_ids(&self, id: ComponentId) -> Result<Vec<ComponentId>> {
        Ok(self.ancestors(id)?.into_iter().map(|c| c.id).collect())
    }

    /// Name path from the root down to `id`
    pub fn path_of(&self, id: ComponentId) -> Result<ComponentPath> {
        let component = self.require(id)?;
        let mut names: Vec<String> = self
            .ancestors(id)?
            .into_iter()
            .rev()
            .map(|c| c.name)
            .collect();
        names.push(component.name);
        ComponentPath::new(names)
    }

    /// Resolve a name path to a single component
    pub fn resolve_path(&self, path: &ComponentPath) -> Result<Component> {
        let mut matches: Vec<Component> = self
            .roots()?
            .into_iter()
            .filter(|c| c.name == path.root())
            .collect();

        let mut current = match matches.len() {
            0 => return Err(Error::ComponentNotFound(path.root().to_string())),
            1 => matches.remove(0),
            count => {
                return Err(Error::AmbiguousPath {
                    path: path.to_path_string(),
                    count,
                });
            }
        };

        for (depth, segment) in path.segments().iter().enumerate().skip(1) {
            current = self
                .get_children(current.id)?
                .remove(segment)
                .ok_or_else(|| Error::ComponentNotFound(path.segments()[..=depth].join("/")))?;
        }
        Ok(current)
    }

    /// Arena snapshot of every live component
    pub fn load_tree(&self) -> Result<ComponentTree> {
        Ok(ComponentTree::from_components(self.all()?))
    }

    fn query_persisted(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Component>> {
        let sql = format!(
            "{} {} ORDER BY c.id",
            schema::select_components(self.layout),
            filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let components = stmt
            .query_map(params, row_to_component)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(components)
    }

    /// Persisted rows matching `filter` without a pending copy, plus pending
    /// components matching `pred`.
    fn live_matching(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
        pred: impl Fn(&Component) -> bool,
    ) -> Result<Vec<Component>> {
        let mut components: Vec<Component> = self
            .query_persisted(filter, params)?
            .into_iter()
            .filter(|c| !self.pending.contains_key(&c.id))
            .collect();
        components.extend(self.pending.values().filter(|c| pred(*c)).cloned());
        components.sort_by_key(|c| c.id);
        Ok(components)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            layout: self.layout,
            groups: 0,
            quadrupoles: 0,
            crystals: 0,
            pending: self.pending.len(),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT component_type, COUNT(*) FROM components GROUP BY component_type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (kind, count) in rows {
            let count = count as usize;
            match kind.parse::<ComponentKind>()? {
                ComponentKind::Group => stats.groups = count,
                ComponentKind::Quadrupole => stats.quadrupoles = count,
                ComponentKind::Crystal => stats.crystals = count,
            }
        }
        Ok(stats)
    }
}

/// Detach a stored row that is about to move to another parent.
///
/// The sibling-name index is checked row by row, so a batch that hands a name
/// from one component to another must vacate the old slot before filling it.
/// NULL parents never collide.
fn release_sibling_slot(conn: &Connection, component: &Component) -> Result<()> {
    let moved = conn.execute(
        "UPDATE components SET parent_id = NULL WHERE id = ?1 AND parent_id IS NOT ?2",
        params![component.id, component.parent],
    )?;
    if moved > 0 {
        tracing::debug!(id = %component.id, "released sibling slot");
    }
    Ok(())
}

/// Upsert one component and its variant attributes.
///
/// The discriminator is only written on insert, so a record's kind never changes.
fn write_component(conn: &Connection, layout: StorageLayout, component: &Component) -> Result<()> {
    match layout {
        StorageLayout::Separate => {
            conn.execute(
                r#"
                INSERT INTO components (id, component_type, name, associated_datafile, parent_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    associated_datafile = excluded.associated_datafile,
                    parent_id = excluded.parent_id
                "#,
                params![
                    component.id,
                    component.kind().as_str(),
                    component.name,
                    component.associated_datafile,
                    component.parent,
                ],
            )?;
            match *component.attributes() {
                Attributes::Group => {}
                Attributes::Quadrupole { prop1 } => {
                    conn.execute(
                        "INSERT INTO quadrupoles (id, prop1) VALUES (?1, ?2)
                         ON CONFLICT(id) DO UPDATE SET prop1 = excluded.prop1",
                        params![component.id, prop1],
                    )?;
                }
                Attributes::Crystal { prop2 } => {
                    conn.execute(
                        "INSERT INTO crystals (id, prop2) VALUES (?1, ?2)
                         ON CONFLICT(id) DO UPDATE SET prop2 = excluded.prop2",
                        params![component.id, prop2],
                    )?;
                }
            }
        }
        StorageLayout::Wide => {
            conn.execute(
                r#"
                INSERT INTO components (id, component_type, name, associated_datafile, parent_id, prop1, prop2)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    associated_datafile = excluded.associated_datafile,
                    parent_id = excluded.parent_id,
                    prop1 = excluded.prop1,
                    prop2 = excluded.prop2
                "#,
                params![
                    component.id,
                    component.kind().as_str(),
                    component.name,
                    component.associated_datafile,
                    component.parent,
                    component.prop1(),
                    component.prop2(),
                ],
            )?;
        }
    }
    tracing::debug!(id = %component.id, kind = %component.kind(), "wrote component row");
    Ok(())
}

/// Helper to convert a row from [`schema::select_components`] to a Component
fn row_to_component(row: &rusqlite::Row<'_>) -> rusqlite::Result<Component> {
    let id: ComponentId = row.get(0)?;
    let kind_str: String = row.get(1)?;

    let kind: ComponentKind = kind_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let missing = |column: usize, field: &str| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Null,
            Box::new(PersistenceError::CorruptRecord {
                id,
                reason: format!("{} without {}", kind, field),
            }),
        )
    };

    let attributes = match kind {
        ComponentKind::Group => Attributes::Group,
        ComponentKind::Quadrupole => Attributes::Quadrupole {
            prop1: row.get::<_, Option<f64>>(5)?.ok_or_else(|| missing(5, "prop1"))?,
        },
        ComponentKind::Crystal => Attributes::Crystal {
            prop2: row.get::<_, Option<f64>>(6)?.ok_or_else(|| missing(6, "prop2"))?,
        },
    };

    Ok(Component::from_parts(
        id,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        attributes,
    ))
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub layout: StorageLayout,
    pub groups: usize,
    pub quadrupoles: usize,
    pub crystals: usize,
    pub pending: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.groups + self.quadrupoles + self.crystals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> Vec<ComponentStore> {
        vec![
            ComponentStore::open_in_memory(StoreConfig::separate()).unwrap(),
            ComponentStore::open_in_memory(StoreConfig::wide()).unwrap(),
        ]
    }

    /// G2 -> {Q5, G1 -> {Q3, Q4}}, saved
    fn build_beamline(store: &mut ComponentStore) -> (ComponentId, ComponentId) {
        let g1 = store.create(NewComponent::group("G1")).unwrap();
        let q3 = store.create(NewComponent::quadrupole("Q3", 3.1)).unwrap();
        let q4 = store.create(NewComponent::quadrupole("Q4", 4.1)).unwrap();
        store.attach_child(g1.id, q3.id).unwrap();
        store.attach_child(g1.id, q4.id).unwrap();

        let g2 = store.create(NewComponent::group("G2")).unwrap();
        store
            .create(NewComponent::quadrupole("Q5", 5.1).with_parent(g2.id))
            .unwrap();
        store.attach_child(g2.id, g1.id).unwrap();
        store.save_all().unwrap();
        (g2.id, g1.id)
    }

    #[test]
    fn test_add_and_read_quadrupoles() {
        for mut store in stores() {
            let q1 = store.create(NewComponent::quadrupole("Q1", 1.2)).unwrap();
            let q2 = store.create(NewComponent::quadrupole("Q2", 2.2)).unwrap();
            store.save(&[q1.id, q2.id]).unwrap();

            let quads = store.query_by_type(ComponentKind::Quadrupole).unwrap();
            assert_eq!(quads.len(), 2);
            for q in &quads {
                assert_eq!(q.kind(), ComponentKind::Quadrupole);
                assert!(q.prop1().unwrap() > 1.0);
            }
            assert_eq!(quads[0], q1);
            assert_eq!(quads[1], q2);
        }
    }

    #[test]
    fn test_add_and_read_crystals() {
        for mut store in stores() {
            let c1 = store.create(NewComponent::crystal("C1", 0.1)).unwrap();
            let c2 = store.create(NewComponent::crystal("C2", 0.2)).unwrap();
            store.save(&[c1.id, c2.id]).unwrap();

            let crystals = store.query_by_type(ComponentKind::Crystal).unwrap();
            assert_eq!(crystals.len(), 2);
            assert!(crystals.iter().all(|c| c.prop2().unwrap() < 1.0));
            assert!(store.query_by_type(ComponentKind::Quadrupole).unwrap().is_empty());
        }
    }

    #[test]
    fn test_group_children() {
        for mut store in stores() {
            let g1 = store.create(NewComponent::group("G1")).unwrap();
            let q3 = store.create(NewComponent::quadrupole("Q3", 3.1)).unwrap();
            let q4 = store.create(NewComponent::quadrupole("Q4", 4.1)).unwrap();
            store.attach_child(g1.id, q3.id).unwrap();
            store.attach_child(g1.id, q4.id).unwrap();
            store.save(&[g1.id, q3.id, q4.id]).unwrap();

            let children = store.get_children(g1.id).unwrap();
            assert_eq!(children.len(), 2);
            assert_eq!(children["Q3"].prop1(), Some(3.1));
            assert_eq!(children["Q3"].parent, Some(g1.id));
        }
    }

    #[test]
    fn test_nested_tree_navigation() {
        for mut store in stores() {
            build_beamline(&mut store);

            let found = store.query_by_name("G2").unwrap();
            assert_eq!(found.len(), 1);
            let g2_children = store.get_children(found[0].id).unwrap();
            assert_eq!(g2_children.len(), 2);

            let g1_children = store.get_children(g2_children["G1"].id).unwrap();
            assert_eq!(g1_children.len(), 2);
            assert!(store.get_children(g2_children["Q5"].id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_children_are_live_before_save() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let g = store.create(NewComponent::group("G")).unwrap();
        let q = store.create(NewComponent::quadrupole("Q", 1.0)).unwrap();
        store.attach_child(g.id, q.id).unwrap();

        assert_eq!(store.get_children(g.id).unwrap()["Q"].id, q.id);
        assert!(store.query_by_type(ComponentKind::Group).unwrap().is_empty());
    }

    #[test]
    fn test_reparent_moves_child() {
        for mut store in stores() {
            let p1 = store.create(NewComponent::group("P1")).unwrap();
            let p2 = store.create(NewComponent::group("P2")).unwrap();
            let c = store
                .create(NewComponent::crystal("C", 0.5).with_parent(p1.id))
                .unwrap();
            store.save_all().unwrap();

            store.attach_child(p2.id, c.id).unwrap();
            assert!(store.get_children(p1.id).unwrap().is_empty());
            assert_eq!(store.get_children(p2.id).unwrap()["C"].id, c.id);
            assert!(store.is_pending(c.id));

            store.save(&[c.id]).unwrap();
            let stored = store.query_by_name("C").unwrap();
            assert_eq!(stored[0].parent, Some(p2.id));
            assert!(store.get_children(p1.id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_cycle_rejected_and_tree_unchanged() {
        for mut store in stores() {
            let (g2, g1) = build_beamline(&mut store);
            let q3 = store.get_children(g1).unwrap()["Q3"].id;

            let before = store.load_tree().unwrap().render();
            assert!(matches!(store.attach_child(q3, g2), Err(Error::Cycle { .. })));
            assert!(matches!(store.attach_child(g1, g2), Err(Error::Cycle { .. })));
            assert!(matches!(store.attach_child(g1, g1), Err(Error::Cycle { .. })));
            assert_eq!(store.load_tree().unwrap().render(), before);
            assert!(store.pending_ids().is_empty());
        }
    }

    #[test]
    fn test_duplicate_sibling_names_rejected() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let g = store.create(NewComponent::group("G")).unwrap();
        let q = store.create(NewComponent::quadrupole("Q", 1.0)).unwrap();
        let other = store.create(NewComponent::quadrupole("Q", 2.0)).unwrap();

        store.attach_child(g.id, q.id).unwrap();
        // re-attaching the same child is fine
        store.attach_child(g.id, q.id).unwrap();
        assert!(matches!(
            store.attach_child(g.id, other.id),
            Err(Error::DuplicateName { .. })
        ));
        assert!(matches!(
            store.create(NewComponent::crystal("Q", 0.1).with_parent(g.id)),
            Err(Error::DuplicateName { .. })
        ));
        assert_eq!(store.get(other.id).unwrap().unwrap().parent, None);
    }

    #[test]
    fn test_same_name_allowed_under_different_parents_and_roots() {
        for mut store in stores() {
            let a = store.create(NewComponent::group("A")).unwrap();
            let b = store.create(NewComponent::group("B")).unwrap();
            store.create(NewComponent::quadrupole("Q", 1.0).with_parent(a.id)).unwrap();
            store.create(NewComponent::quadrupole("Q", 2.0).with_parent(b.id)).unwrap();
            store.create(NewComponent::group("A")).unwrap();
            store.save_all().unwrap();

            assert_eq!(store.query_by_name("Q").unwrap().len(), 2);
            assert_eq!(store.query_by_name("A").unwrap().len(), 2);
        }
    }

    #[test]
    fn test_save_requires_parent_persisted_or_in_batch() {
        for mut store in stores() {
            let g = store.create(NewComponent::group("G")).unwrap();
            let q = store
                .create(NewComponent::quadrupole("Q", 1.0).with_parent(g.id))
                .unwrap();

            let err = store.save(&[q.id]).unwrap_err();
            assert!(matches!(
                err,
                Error::Persistence(PersistenceError::UnsavedParent { .. })
            ));
            assert!(store.is_pending(q.id));
            assert!(store.query_by_name("Q").unwrap().is_empty());

            // child listed first: the batch is still written parents-first
            store.save(&[q.id, g.id]).unwrap();
            assert_eq!(store.query_by_name("Q").unwrap()[0].parent, Some(g.id));
        }
    }

    #[test]
    fn test_save_unknown_id_fails() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let err = store.save(&[ComponentId(42)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Persistence(PersistenceError::NotPending(ComponentId(42)))
        ));
    }

    #[test]
    fn test_partial_save_cannot_write_cycle() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let a = store.create(NewComponent::group("A")).unwrap();
        let b = store.create(NewComponent::group("B")).unwrap();
        store.save_all().unwrap();

        store.attach_child(b.id, a.id).unwrap();
        store.save(&[a.id]).unwrap();

        store.detach(a.id).unwrap();
        store.attach_child(a.id, b.id).unwrap();
        // saving only B would leave A -> B on disk next to B -> A
        assert!(matches!(store.save(&[b.id]), Err(Error::Cycle { .. })));
        store.save(&[a.id, b.id]).unwrap();
        assert_eq!(store.query_by_name("B").unwrap()[0].parent, Some(a.id));
        assert_eq!(store.query_by_name("A").unwrap()[0].parent, None);
    }

    #[test]
    fn test_invalid_variant_on_create() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let draft = NewComponent::new(ComponentKind::Group, "G", Attributes::Crystal { prop2: 1.0 });
        assert!(matches!(store.create(draft), Err(Error::InvalidVariant { .. })));
        assert!(store.pending_ids().is_empty());
    }

    #[test]
    fn test_unknown_parent_on_create() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let draft = NewComponent::group("G").with_parent(ComponentId(7));
        assert!(matches!(store.create(draft), Err(Error::ComponentNotFound(_))));
    }

    #[test]
    fn test_ids_are_unique_across_reopen_of_pending() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        let a = store.create(NewComponent::group("A")).unwrap();
        store.save_all().unwrap();
        let b = store.create(NewComponent::group("B")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_datafile_persisted() {
        for mut store in stores() {
            let c = store
                .create(NewComponent::crystal("C1", 0.3).with_datafile("runs/c1.h5"))
                .unwrap();
            store.save(&[c.id]).unwrap();
            let stored = store.query_by_type(ComponentKind::Crystal).unwrap();
            assert_eq!(stored[0].associated_datafile.as_deref(), Some("runs/c1.h5"));
        }
    }

    #[test]
    fn test_path_navigation() {
        for mut store in stores() {
            let (g2, g1) = build_beamline(&mut store);

            let path = ComponentPath::parse("G2/G1/Q4").unwrap();
            let q4 = store.resolve_path(&path).unwrap();
            assert_eq!(q4.prop1(), Some(4.1));
            assert_eq!(store.path_of(q4.id).unwrap(), path);

            let ancestors: Vec<ComponentId> =
                store.ancestors(q4.id).unwrap().iter().map(|c| c.id).collect();
            assert_eq!(ancestors, vec![g1, g2]);

            let missing = ComponentPath::parse("G2/Q9").unwrap();
            assert!(matches!(
                store.resolve_path(&missing),
                Err(Error::ComponentNotFound(p)) if p == "G2/Q9"
            ));
        }
    }

    #[test]
    fn test_ambiguous_root_path() {
        let mut store = ComponentStore::open_in_memory(StoreConfig::default()).unwrap();
        store.create(NewComponent::group("G")).unwrap();
        store.create(NewComponent::group("G")).unwrap();
        let path = ComponentPath::parse("G").unwrap();
        assert!(matches!(
            store.resolve_path(&path),
            Err(Error::AmbiguousPath { count: 2, .. })
        ));
    }

    #[test]
    fn test_save_hands_name_over_between_components() {
        for mut store in stores() {
            let p1 = store.create(NewComponent::group("P1")).unwrap();
            let p2 = store.create(NewComponent::group("P2")).unwrap();
            let b = store
                .create(NewComponent::quadrupole("X", 1.5).with_parent(p2.id))
                .unwrap();
            let a = store
                .create(NewComponent::crystal("X", 0.5).with_parent(p1.id))
                .unwrap();
            assert!(b.id < a.id);
            store.save_all().unwrap();

            store.detach(a.id).unwrap();
            store.attach_child(p1.id, b.id).unwrap();
            store.save_all().unwrap();

            assert!(store.pending_ids().is_empty());
            assert_eq!(store.get_children(p1.id).unwrap()["X"].id, b.id);
            assert!(store.get_children(p2.id).unwrap().is_empty());
            let stored_a = store.query_by_type(ComponentKind::Crystal).unwrap();
            assert_eq!(stored_a[0].parent, None);
            let stored_b = store.query_by_type(ComponentKind::Quadrupole).unwrap();
            assert_eq!(stored_b[0].parent, Some(p1.id));
        }
    }

    #[test]
    fn test_stats() {
        for mut store in stores() {
            build_beamline(&mut store);
            store.create(NewComponent::crystal("C", 0.1)).unwrap();

            let stats = store.stats().unwrap();
            assert_eq!(stats.groups, 2);
            assert_eq!(stats.quadrupoles, 3);
            assert_eq!(stats.crystals, 0);
            assert_eq!(stats.pending, 1);
            assert_eq!(stats.total(), 5);
        }
    }
}
