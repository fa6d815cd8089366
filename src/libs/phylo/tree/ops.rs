use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::{Node, NodeId};
use std::collections::HashMap;

/// Link `child_id` under `parent_id`. The child must be detached.
pub fn add_child(tree: &mut Tree, parent_id: NodeId, child_id: NodeId) -> Result<(), TreeError> {
    if parent_id == child_id {
        return Err(TreeError::LogicError(
            "cannot add a node as its own child".to_string(),
        ));
    }
    tree.node(parent_id)?;
    if let Some(old_parent) = tree.node(child_id)?.parent {
        return Err(TreeError::LogicError(format!(
            "node {} already has parent {}",
            child_id, old_parent
        )));
    }

    tree.nodes[child_id].parent = Some(parent_id);
    tree.nodes[parent_id].children.push(child_id);
    Ok(())
}

/// Soft remove a node. Without `recursive`, children are orphaned.
pub fn remove_node(tree: &mut Tree, id: NodeId, recursive: bool) {
    if tree.get_node(id).is_none() {
        return;
    }

    if let Some(parent_id) = tree.nodes[id].parent {
        if let Some(parent) = tree.get_node_mut(parent_id) {
            parent.children.retain(|&child| child != id);
        }
    }

    let children = std::mem::take(&mut tree.nodes[id].children);
    for child_id in children {
        if recursive {
            remove_node(tree, child_id, true);
        } else if let Some(child) = tree.get_node_mut(child_id) {
            child.parent = None;
        }
    }

    let node = &mut tree.nodes[id];
    node.deleted = true;
    node.parent = None;

    if tree.root == Some(id) {
        tree.root = None;
    }
}

/// Splice out a non-root node; its children move up to its parent at the
/// same position. Edge lengths are summed.
pub fn collapse_node(tree: &mut Tree, id: NodeId) -> Result<(), TreeError> {
    let node = tree.node(id)?;
    let parent_id = node.parent.ok_or_else(|| {
        TreeError::LogicError("cannot collapse the root node".to_string())
    })?;
    let parent_edge = node.length;
    let children = node.children.clone();

    for &child_id in &children {
        let child = &mut tree.nodes[child_id];
        child.parent = Some(parent_id);
        child.length = match (parent_edge, child.length) {
            (Some(p), Some(c)) => Some(p + c),
            (p, c) => p.or(c),
        };
    }

    let siblings = &mut tree.nodes[parent_id].children;
    if let Some(pos) = siblings.iter().position(|&x| x == id) {
        siblings.splice(pos..pos + 1, children);
    }

    let node = &mut tree.nodes[id];
    node.deleted = true;
    node.children.clear();
    node.parent = None;

    Ok(())
}

/// Drop soft-deleted nodes and renumber the arena in place.
/// Every NodeId held outside the tree is invalidated.
pub fn compact(tree: &mut Tree) {
    let old_to_new: HashMap<NodeId, NodeId> = tree
        .nodes
        .iter()
        .filter(|n| !n.deleted)
        .enumerate()
        .map(|(new, n)| (n.id, new))
        .collect();

    let mut nodes: Vec<Node> = Vec::with_capacity(old_to_new.len());
    for old in tree.nodes.iter().filter(|n| !n.deleted) {
        let mut node = old.clone();
        node.id = old_to_new[&old.id];
        node.parent = old.parent.and_then(|p| old_to_new.get(&p).copied());
        node.children = old
            .children
            .iter()
            .filter_map(|c| old_to_new.get(c).copied())
            .collect();
        nodes.push(node);
    }

    tree.root = tree.root.and_then(|r| old_to_new.get(&r).copied());
    tree.nodes = nodes;
}

/// Insert a new node halfway along the edge above `id`. Returns the new node.
pub fn insert_parent(tree: &mut Tree, id: NodeId) -> Result<NodeId, TreeError> {
    let node = tree.node(id)?;
    let parent = node
        .parent
        .ok_or_else(|| TreeError::LogicError(format!("node {} has no parent", id)))?;
    let half = node.length.map(|l| l / 2.0);

    let new_node = tree.add_node();
    tree.nodes[new_node].length = half;
    tree.nodes[new_node].parent = Some(parent);

    // keep the position of `id` among its siblings
    let siblings = &mut tree.nodes[parent].children;
    if let Some(pos) = siblings.iter().position(|&c| c == id) {
        siblings[pos] = new_node;
    }

    tree.nodes[id].parent = Some(new_node);
    tree.nodes[id].length = half;
    tree.nodes[new_node].children.push(id);

    Ok(new_node)
}

/// Collapse every non-root node with exactly one child.
pub fn remove_degree_two_nodes(tree: &mut Tree) {
    while let Some(id) = tree
        .find_nodes(|n| n.parent.is_some() && n.children.len() == 1)
        .first()
        .copied()
    {
        if collapse_node(tree, id).is_err() {
            break;
        }
    }
}

/// Turn a bifurcating root into a multifurcation by splicing out its
/// larger internal child.
pub fn deroot(tree: &mut Tree) -> Result<(), TreeError> {
    let root = tree.root()?;
    let children = tree.node(root)?.children.clone();
    if children.len() != 2 {
        return Err(TreeError::LogicError(format!(
            "root has {} children, expected 2",
            children.len()
        )));
    }

    // heavier child first, the first one on ties
    let target = children
        .iter()
        .enumerate()
        .filter(|(_, &c)| !tree.nodes[c].is_leaf())
        .max_by_key(|(pos, &c)| {
            (
                super::query::count_descendants(tree, c),
                std::cmp::Reverse(*pos),
            )
        })
        .map(|(_, &c)| c)
        .ok_or_else(|| TreeError::LogicError("cannot deroot a two-leaf tree".to_string()))?;

    collapse_node(tree, target)
}

/// Make `new_root_id` the root by reversing the edges on the path to it.
pub fn reroot_at(tree: &mut Tree, new_root_id: NodeId) -> Result<(), TreeError> {
    tree.node(new_root_id)?;
    let old_root = tree.root()?;
    if old_root == new_root_id {
        return Ok(());
    }

    let path = tree.get_path_from_root(new_root_id)?;
    let lengths: Vec<Option<f64>> = path.iter().map(|&id| tree.nodes[id].length).collect();

    for i in (1..path.len()).rev() {
        let child_id = path[i];
        let parent_id = path[i - 1];

        tree.nodes[parent_id].children.retain(|&x| x != child_id);
        tree.nodes[child_id].children.push(parent_id);
        tree.nodes[parent_id].parent = Some(child_id);
        tree.nodes[parent_id].length = lengths[i];
    }

    let new_root = &mut tree.nodes[new_root_id];
    new_root.parent = None;
    new_root.length = None;
    tree.root = Some(new_root_id);

    Ok(())
}

/// Place a bifurcating root on the edge above `child_id`.
///
/// Unary nodes left behind by a previous bifurcating root are removed.
/// Returns the id of the root.
pub fn root_on_edge(tree: &mut Tree, child_id: NodeId) -> Result<NodeId, TreeError> {
    let root = tree.root()?;
    let parent = tree
        .node(child_id)?
        .parent
        .ok_or_else(|| TreeError::LogicError("the root has no edge above it".to_string()))?;

    if parent == root && tree.nodes[root].children.len() == 2 {
        return Ok(root);
    }

    let new_root = insert_parent(tree, child_id)?;
    reroot_at(tree, new_root)?;
    remove_degree_two_nodes(tree);
    Ok(new_root)
}

/// Keep only the leaves accepted by `keep`, dropping emptied clades and
/// unary nodes. A unary root is replaced by its child.
pub fn prune_to<F>(tree: &mut Tree, keep: F) -> Result<(), TreeError>
where
    F: Fn(&Node) -> bool,
{
    let root = tree.root()?;
    let leaves = super::stat::get_leaves(tree, root);
    let doomed: Vec<NodeId> = leaves
        .iter()
        .copied()
        .filter(|&id| !keep(&tree.nodes[id]))
        .collect();
    if doomed.len() == leaves.len() {
        return Err(TreeError::LogicError(
            "pruning would remove every leaf".to_string(),
        ));
    }

    for id in doomed {
        let mut parent = tree.nodes[id].parent;
        remove_node(tree, id, false);
        // walk up through clades that just lost their last child
        while let Some(p) = parent {
            if !tree.nodes[p].children.is_empty() {
                break;
            }
            parent = tree.nodes[p].parent;
            remove_node(tree, p, false);
        }
    }

    remove_degree_two_nodes(tree);

    let mut top = root;
    while tree.nodes[top].children.len() == 1 {
        let child = tree.nodes[top].children[0];
        remove_node(tree, top, false);
        tree.nodes[child].length = None;
        top = child;
    }
    tree.root = Some(top);

    Ok(())
}

/// Name internal nodes `{prefix}0`, `{prefix}1`, ... in pre-order; the root gets 0.
pub fn label_internal(tree: &mut Tree, prefix: &str) -> Result<(), TreeError> {
    let root = tree.root()?;
    let internal: Vec<NodeId> = tree
        .preorder(root)
        .into_iter()
        .filter(|&id| !tree.nodes[id].is_leaf())
        .collect();
    for (k, id) in internal.into_iter().enumerate() {
        tree.nodes[id].set_name(format!("{}{}", prefix, k));
    }
    Ok(())
}
