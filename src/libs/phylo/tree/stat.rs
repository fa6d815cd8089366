use super::Tree;
use crate::libs::phylo::node::NodeId;

/// Leaves below `id`, in pre-order.
pub fn get_leaves(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    super::traversal::preorder(tree, id)
        .into_iter()
        .filter(|&n| tree.nodes[n].is_leaf())
        .collect()
}

pub fn get_leaf_names(tree: &Tree, id: NodeId) -> Vec<Option<String>> {
    get_leaves(tree, id)
        .into_iter()
        .map(|leaf| tree.nodes[leaf].name.clone())
        .collect()
}

/// Rooted means the root is bifurcating.
pub fn is_rooted(tree: &Tree) -> bool {
    tree.get_root()
        .and_then(|r| tree.get_node(r))
        .map(|n| n.children.len() == 2)
        .unwrap_or(false)
}

