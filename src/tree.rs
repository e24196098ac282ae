//! Component Tree - In-memory snapshot of the hierarchy
//!
//! Components live in a flat arena; parent and children links are arena
//! indices resolved from the stored parent ids, so there are no owning
//! pointers between nodes.

use std::collections::{BTreeMap, HashMap};
use crate::component::{Component, ComponentId};

/// Arena-backed snapshot of a component hierarchy.
///
/// Built from a flat list of components. A component whose parent is not in
/// the list is treated as a root.
#[derive(Debug, Default)]
pub struct ComponentTree {
    /// All components, in arena order
    nodes: Vec<Component>,
    /// Component id to arena index
    index: HashMap<ComponentId, usize>,
    /// Children of each arena slot, keyed by name
    children: Vec<BTreeMap<String, usize>>,
    /// Arena indices of root components
    roots: Vec<usize>,
}

impl ComponentTree {
    /// Build a tree from a flat list of components
    pub fn from_components(mut components: Vec<Component>) -> Self {
        components.sort_by_key(|c| c.id);

        let index: HashMap<ComponentId, usize> = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        let mut children = vec![BTreeMap::new(); components.len()];
        let mut roots = Vec::new();

        for (i, component) in components.iter().enumerate() {
            match component.parent.and_then(|p| index.get(&p)) {
                Some(&parent) => {
                    children[parent].insert(component.name.clone(), i);
                }
                None => roots.push(i),
            }
        }
        roots.sort_by(|&a, &b| {
            components[a]
                .name
                .cmp(&components[b].name)
                .then(components[a].id.cmp(&components[b].id))
        });

        Self {
            nodes: components,
            index,
            children,
            roots,
        }
    }

    /// All components below `id`, depth-first, paired with their depth
    /// relative to `id` (direct children are depth 1).
    pub fn descendants(&self, id: ComponentId) -> Vec<(usize, &Component)> {
        let mut out = Vec::new();
        if let Some(&i) = self.index.get(&id) {
            self.collect(i, 0, &mut out);
            out.remove(0);
        }
        out
    }

    /// Every reachable component, depth-first from the roots, with its depth
    pub fn walk(&self) -> Vec<(usize, &Component)> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect(root, 0, &mut out);
        }
        out
    }

    fn collect<'a>(&'a self, i: usize, depth: usize, out: &mut Vec<(usize, &'a Component)>) {
        out.push((depth, &self.nodes[i]));
        for &child in self.children[i].values() {
            self.collect(child, depth + 1, out);
        }
    }


    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the hierarchy as an indented text tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            out.push_str(&node_label(&self.nodes[root]));
            out.push('\n');
            self.render_children(root, "", &mut out);
        }
        out
    }

    /// Render the subtree rooted at `id`, `None` if it is not in the tree
    pub fn render_from(&self, id: ComponentId) -> Option<String> {
        let &i = self.index.get(&id)?;
        let mut out = node_label(&self.nodes[i]);
        out.push('\n');
        self.render_children(i, "", &mut out);
        Some(out)
    }

    fn render_children(&self, i: usize, prefix: &str, out: &mut String) {
        let count = self.children[i].len();
        for (n, &child) in self.children[i].values().enumerate() {
            let last = n + 1 == count;
            out.push_str(prefix);
            out.push_str(if last { "└── " } else { "├── " });
            out.push_str(&node_label(&self.nodes[child]));
            out.push('\n');
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.render_children(child, &next, out);
        }
    }
}

fn node_label(component: &Component) -> String {
    let attrs = component.attributes().to_string();
    if attrs.is_empty() {
        format!("{} [{}]", component.name, component.kind())
    } else {
        format!("{} [{} {}]", component.name, component.kind(), attrs)
    }
}
