use super::Tree;
use crate::libs::phylo::error::TreeError;
use crate::libs::phylo::node::NodeId;
use fixedbitset::FixedBitSet;

/// Bitset of leaf indices below every node, computed in post-order.
///
/// `index_of` maps a leaf name to a bit in `0..width`; leaves it rejects are
/// reported as errors. The result is indexed by NodeId (deleted slots are empty).
pub fn clade_bitsets<F>(tree: &Tree, width: usize, index_of: F) -> Result<Vec<FixedBitSet>, TreeError>
where
    F: Fn(&str) -> Option<usize>,
{
    let root = tree.root()?;
    let mut sets = vec![FixedBitSet::with_capacity(width); tree.capacity()];

    for id in tree.postorder(root) {
        let node = &tree.nodes[id];
        if node.is_leaf() {
            let name = node.name.as_deref().unwrap_or("");
            let bit = index_of(name)
                .filter(|&b| b < width)
                .ok_or_else(|| TreeError::LogicError(format!("unknown leaf `{}`", name)))?;
            sets[id].insert(bit);
        } else {
            let mut set = FixedBitSet::with_capacity(width);
            for &child in &node.children {
                set.union_with(&sets[child]);
            }
            sets[id] = set;
        }
    }

    Ok(sets)
}

/// Edges of the tree as (lower node, leaves below it), in pre-order.
///
/// On a derooted tree every edge is a distinct bipartition.
pub fn edge_splits(tree: &Tree, clades: &[FixedBitSet]) -> Vec<(NodeId, FixedBitSet)> {
    match tree.get_root() {
        Some(root) => tree
            .preorder(root)
            .into_iter()
            .filter(|&id| id != root)
            .map(|id| (id, clades[id].clone()))
            .collect(),
        None => Vec::new(),
    }
}

/// Complement within `0..width`
pub fn complement(set: &FixedBitSet, width: usize) -> FixedBitSet {
    let mut all = FixedBitSet::with_capacity(width);
    all.insert_range(..);
    all.difference_with(set);
    all
}
