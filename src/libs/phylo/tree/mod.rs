pub mod io;
pub mod ops;
pub mod query;
pub mod split;
pub mod stat;
#[cfg(test)]
mod tests;
pub mod traversal;

use super::error::TreeError;
use super::node::{Node, NodeId};

/// Arena-backed tree. Node ids are indices into `nodes` and stay valid
/// until `compact()` is called.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    pub(super) nodes: Vec<Node>,
    pub(super) root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node. Returns its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the arena, deleted slots included. Suitable for `Vec` side tables.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root(&self) -> Result<NodeId, TreeError> {
        self.root.ok_or(TreeError::EmptyTree)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).filter(|n| !n.deleted)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).filter(|n| !n.deleted)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get_node(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn set_root(&mut self, id: NodeId) {
        if self.get_node(id).is_some() {
            self.root = Some(id);
        }
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).and_then(|n| n.name.as_deref())
    }

    // --- ops ---

    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), TreeError> {
        ops::add_child(self, parent_id, child_id)
    }

    pub fn compact(&mut self) {
        ops::compact(self)
    }

    pub fn remove_degree_two_nodes(&mut self) {
        ops::remove_degree_two_nodes(self)
    }

    pub fn deroot(&mut self) -> Result<(), TreeError> {
        ops::deroot(self)
    }

    pub fn root_on_edge(&mut self, child_id: NodeId) -> Result<NodeId, TreeError> {
        ops::root_on_edge(self, child_id)
    }

    pub fn prune_to<F>(&mut self, keep: F) -> Result<(), TreeError>
    where
        F: Fn(&Node) -> bool,
    {
        ops::prune_to(self, keep)
    }

    pub fn label_internal(&mut self, prefix: &str) -> Result<(), TreeError> {
        ops::label_internal(self, prefix)
    }

    // --- traversal ---

    pub fn preorder(&self, start_node: NodeId) -> Vec<NodeId> {
        traversal::preorder(self, start_node)
    }

    pub fn postorder(&self, start_node: NodeId) -> Vec<NodeId> {
        traversal::postorder(self, start_node)
    }

    pub fn extract_subtree(&self, root_id: NodeId) -> Result<Tree, TreeError> {
        traversal::extract_subtree(self, root_id)
    }

    // --- query ---

    pub fn get_path_from_root(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        query::get_path_from_root(self, id)
    }

    pub fn mrca(&self, ids: &[NodeId]) -> Result<NodeId, TreeError> {
        query::mrca(self, ids)
    }

    pub fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        query::neighbours(self, id)
    }

    pub fn find_nodes<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        query::find_nodes(self, predicate)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        query::get_node_by_name(self, name)
    }

    // --- stat ---

    /// Leaves of the whole tree, in pre-order
    pub fn get_leaves(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => stat::get_leaves(self, root),
            None => Vec::new(),
        }
    }

    pub fn get_leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        stat::get_leaves(self, id)
    }

    pub fn get_leaf_names(&self) -> Vec<Option<String>> {
        match self.root {
            Some(root) => stat::get_leaf_names(self, root),
            None => Vec::new(),
        }
    }

    pub fn is_rooted(&self) -> bool {
        stat::is_rooted(self)
    }

    // --- io ---

    pub fn to_newick(&self) -> String {
        io::to_newick(self)
    }

    pub fn to_newick_subtree(&self, root: NodeId) -> String {
        io::to_newick_subtree(self, root)
    }
}
