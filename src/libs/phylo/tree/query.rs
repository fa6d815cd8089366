use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::{Node, NodeId};

/// Ids from the root down to `id`, both included.
pub fn get_path_from_root(tree: &Tree, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
    tree.node(id)?;

    let mut path = vec![id];
    let mut current = id;
    while let Some(p) = tree.nodes[current].parent {
        path.push(p);
        current = p;
    }
    path.reverse();

    if tree.root != Some(path[0]) {
        return Err(TreeError::LogicError(format!(
            "node {} is detached from the root",
            id
        )));
    }
    Ok(path)
}

/// Most recent common ancestor of a set of nodes.
pub fn mrca(tree: &Tree, ids: &[NodeId]) -> Result<NodeId, TreeError> {
    let (&first, rest) = ids
        .split_first()
        .ok_or_else(|| TreeError::LogicError("MRCA of an empty set".to_string()))?;

    let mut path = get_path_from_root(tree, first)?;
    for &id in rest {
        let other = get_path_from_root(tree, id)?;
        let shared = path
            .iter()
            .zip(other.iter())
            .take_while(|(u, v)| u == v)
            .count();
        path.truncate(shared);
    }

    path.last()
        .copied()
        .ok_or_else(|| TreeError::LogicError("nodes share no ancestor".to_string()))
}

/// Children plus parent, i.e. the adjacent nodes when the tree is read unrooted.
pub fn neighbours(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    match tree.get_node(id) {
        Some(node) => node.children.iter().copied().chain(node.parent).collect(),
        None => Vec::new(),
    }
}

/// Number of nodes below `id`, itself excluded.
pub fn count_descendants(tree: &Tree, id: NodeId) -> usize {
    super::traversal::preorder(tree, id).len().saturating_sub(1)
}

pub fn find_nodes<F>(tree: &Tree, predicate: F) -> Vec<NodeId>
where
    F: Fn(&Node) -> bool,
{
    tree.nodes
        .iter()
        .filter(|n| !n.deleted && predicate(n))
        .map(|n| n.id)
        .collect()
}

/// First live node carrying `name`
pub fn get_node_by_name(tree: &Tree, name: &str) -> Option<NodeId> {
    tree.nodes
        .iter()
        .find(|n| !n.deleted && n.name.as_deref() == Some(name))
        .map(|n| n.id)
}
