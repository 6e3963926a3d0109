use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{Category, CategoryDetails, CategoryId, CategoryRef};

/// CategorySource
///
/// Read access to a category hierarchy. The tree walk only ever needs these
/// two lookups, so any store or snapshot exposing them can be expanded.
pub trait CategorySource {
    fn get_by_id(&self, id: CategoryId) -> Option<&Category>;
    fn get_children(&self, id: CategoryId) -> Vec<CategoryId>;
}

/// CategoryTree
///
/// Arena of category records keyed by id, with a parent -> children index
/// built once from a point-in-time snapshot. Parent links are plain ids, so
/// every traversal is an explicit loop and never recursion.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, Category>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut nodes = HashMap::new();
        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();

        for category in categories {
            if let Some(parent_id) = category.parent_id {
                children.entry(parent_id).or_default().push(category.id);
            }
            nodes.insert(category.id, category);
        }

        Self { nodes, children }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The category itself plus every transitive descendant.
    /// An unknown id yields the empty set.
    pub fn descendant_closure(&self, root_id: CategoryId) -> HashSet<CategoryId> {
        descendant_closure(self, root_id)
    }

    pub fn children_count(&self, id: CategoryId) -> usize {
        self.children.get(&id).map_or(0, Vec::len)
    }

    /// Names from the outermost ancestor down to `id`.
    ///
    /// Stops at the first repeated id so a malformed parent chain still ends.
    pub fn path(&self, id: CategoryId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.nodes.get(&id);

        while let Some(node) = cursor {
            if !seen.insert(node.id) {
                break;
            }
            names.push(node.name.as_str());
            cursor = node.parent_id.and_then(|parent| self.nodes.get(&parent));
        }

        names.reverse();
        names
    }

    /// Whether giving `id` the parent `candidate_parent` would close a loop.
    ///
    /// True when the candidate is `id` itself or already lies inside its
    /// subtree.
    pub fn would_create_cycle(&self, id: CategoryId, candidate_parent: CategoryId) -> bool {
        id == candidate_parent || self.descendant_closure(id).contains(&candidate_parent)
    }

    pub fn details(&self, id: CategoryId) -> Option<CategoryDetails> {
        let node = self.nodes.get(&id)?;
        let parent = node
            .parent_id
            .and_then(|parent_id| self.nodes.get(&parent_id))
            .map(|parent| CategoryRef {
                id: parent.id,
                name: parent.name.clone(),
            });

        Some(CategoryDetails {
            id: node.id,
            name: node.name.clone(),
            parent_id: node.parent_id,
            parent,
            path: self.path(id).join(" -> "),
            children_count: self.children_count(id),
        })
    }
}

impl CategorySource for CategoryTree {
    fn get_by_id(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    fn get_children(&self, id: CategoryId) -> Vec<CategoryId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }
}

/// descendant_closure
///
/// Breadth-first expansion of `root_id` over `get_children`. The visited set
/// is what guarantees termination: an id already seen is never expanded
/// again, even if the source data contains a loop.
pub fn descendant_closure<S>(source: &S, root_id: CategoryId) -> HashSet<CategoryId>
where
    S: CategorySource + ?Sized,
{
    let mut visited = HashSet::new();
    if source.get_by_id(root_id).is_none() {
        return visited;
    }

    let mut frontier = VecDeque::from([root_id]);
    visited.insert(root_id);

    while let Some(current) = frontier.pop_front() {
        for child in source.get_children(current) {
            if visited.insert(child) {
                frontier.push_back(child);
            }
        }
    }

    visited
}
