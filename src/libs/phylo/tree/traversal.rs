use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::NodeId;
use std::collections::HashMap;

/// Node ids in pre-order (parent before children, children in order)
pub fn preorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![start_node];

    while let Some(id) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            stack.extend(node.children.iter().rev());
        }
    }

    result
}

/// Node ids in post-order (children before parent).
///
/// Iterative: gene trees of large orthogroups can be deep ladders.
pub fn postorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![(start_node, false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            result.push(id);
            continue;
        }
        if let Some(node) = tree.get_node(id) {
            stack.push((id, true));
            for &child in node.children.iter().rev() {
                stack.push((child, false));
            }
        }
    }

    result
}

/// Copy the clade below `node_id` into a new tree.
pub fn extract_subtree(tree: &Tree, node_id: NodeId) -> Result<Tree, TreeError> {
    tree.node(node_id)?;

    let mut new_tree = Tree::new();
    let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();

    for old_id in preorder(tree, node_id) {
        let old = &tree.nodes[old_id];
        let new_id = new_tree.add_node();
        id_map.insert(old_id, new_id);

        let node = &mut new_tree.nodes[new_id];
        node.name = old.name.clone();
        node.properties = old.properties.clone();

        if old_id == node_id {
            new_tree.set_root(new_id);
        } else {
            node.length = old.length;
            if let Some(&parent) = old.parent.as_ref().and_then(|p| id_map.get(p)) {
                super::ops::add_child(&mut new_tree, parent, new_id)?;
            }
        }
    }

    Ok(new_tree)
}
