//! Rooted species tree: leaves are species IDs, internal nodes `N0`, `N1`, ...

use crate::libs::error::{OrthoError, Result};
use crate::libs::ids::SpeciesMap;
use crate::libs::phylo::tree::split;
use crate::libs::phylo::{NodeId, Tree};
use fixedbitset::FixedBitSet;
use itertools::Itertools;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SpeciesTree {
    tree: Tree,
    n_species: usize,
    /// Leaf of each species
    leaf_of: Vec<NodeId>,
    /// Species below every node, indexed by NodeId
    clades: Vec<FixedBitSet>,
}

impl SpeciesTree {
    /// The only rooted tree of two species.
    pub fn two_species() -> Result<Self> {
        let tree = Tree::from_newick("(0,1);").map_err(OrthoError::SpeciesTree)?;
        Self::from_rooted_ids(tree, 2)
    }

    /// Leaves must be exactly `0..n_species` and the root bifurcating.
    /// Internal nodes are relabelled.
    pub fn from_rooted_ids(mut tree: Tree, n_species: usize) -> Result<Self> {
        let root = tree.root().map_err(OrthoError::SpeciesTree)?;
        check_leaf_set(&tree, n_species, |name| name.parse::<usize>().ok(), |s| s.to_string())?;

        let degree = tree.get_node(root).map(|n| n.children.len()).unwrap_or(0);
        if degree != 2 {
            return Err(OrthoError::NotRooted(degree));
        }

        tree.label_internal("N").map_err(OrthoError::SpeciesTree)?;
        let clades = split::clade_bitsets(&tree, n_species, |name| name.parse().ok())
            .map_err(OrthoError::SpeciesTree)?;

        let mut leaf_of = vec![0; n_species];
        for leaf in tree.get_leaves() {
            if let Some(s) = tree.name_of(leaf).and_then(|n| n.parse::<usize>().ok()) {
                leaf_of[s] = leaf;
            }
        }

        Ok(Self {
            tree,
            n_species,
            leaf_of,
            clades,
        })
    }

    /// A user tree with species names as leaves, checked before any work starts.
    pub fn from_names(text: &str, filename: &str, species: &SpeciesMap) -> Result<Self> {
        let mut tree = Tree::from_newick(text).map_err(|source| OrthoError::SpeciesTreeParse {
            source,
            filename: filename.to_string(),
        })?;

        check_leaf_set(
            &tree,
            species.len(),
            |name| species.index_of(name),
            |s| species.name(s).to_string(),
        )?;

        for leaf in tree.get_leaves() {
            let id = tree.name_of(leaf).and_then(|n| species.index_of(n));
            if let (Some(id), Some(node)) = (id, tree.get_node_mut(leaf)) {
                node.set_name(id.to_string());
            }
        }

        Self::from_rooted_ids(tree, species.len())
    }

    pub fn from_file(infile: &str, species: &SpeciesMap) -> Result<Self> {
        let text = crate::libs::io::read_to_string(infile)?;
        Self::from_names(&text, infile, species)
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.get_root().unwrap_or(0)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.get_node(node).and_then(|n| n.parent)
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.tree.get_node(node).map(|n| n.is_leaf()).unwrap_or(false)
    }

    pub fn leaf(&self, species: usize) -> Option<NodeId> {
        self.leaf_of.get(species).copied()
    }

    pub fn clade(&self, node: NodeId) -> &FixedBitSet {
        &self.clades[node]
    }

    /// Species below `node`, ascending
    pub fn species_under(&self, node: NodeId) -> Vec<usize> {
        self.clades[node].ones().collect()
    }

    /// `N3` for internal nodes, the species ID for leaves
    pub fn label(&self, node: NodeId) -> &str {
        self.tree.name_of(node).unwrap_or("")
    }

    /// Internal nodes in pre-order, i.e. `N0`, `N1`, ...
    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.tree
            .preorder(self.root())
            .into_iter()
            .filter(|&id| !self.is_leaf(id))
            .collect()
    }

    pub fn node_by_label(&self, label: &str) -> Option<NodeId> {
        self.tree.get_node_by_name(label)
    }

    /// Smallest clade holding every species of `set`; the root for an empty set.
    pub fn mrca(&self, set: &FixedBitSet) -> NodeId {
        let Some(first) = set.ones().next() else {
            return self.root();
        };
        let mut node = self.leaf_of[first];
        while !set.is_subset(&self.clades[node]) {
            match self.parent(node) {
                Some(p) => node = p,
                None => break,
            }
        }
        node
    }

    /// Path from `node` up to the root, both included.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(p) = self.parent(current) {
            path.push(p);
            current = p;
        }
        path
    }

    //----------------------------
    // Output
    //----------------------------

    /// Leaves renamed with `leaf_name`, internal labels kept or dropped.
    fn render<F>(&self, keep_labels: bool, leaf_name: F) -> String
    where
        F: Fn(usize) -> String,
    {
        let mut tree = self.tree.clone();
        for id in self.tree.preorder(self.root()) {
            let leaf = self.is_leaf(id);
            let species = self.tree.name_of(id).and_then(|n| n.parse::<usize>().ok());
            if let Some(node) = tree.get_node_mut(id) {
                match (leaf, species) {
                    (true, Some(s)) => node.set_name(leaf_name(s)),
                    (false, _) if !keep_labels => node.name = None,
                    _ => {}
                }
            }
        }
        tree.to_newick()
    }

    pub fn to_newick_ids(&self) -> String {
        self.render(false, |s| s.to_string())
    }

    pub fn to_newick_names(&self, species: &SpeciesMap) -> String {
        self.render(false, |s| species.name(s).to_string())
    }

    pub fn to_newick_labelled(&self, species: &SpeciesMap) -> String {
        self.render(true, |s| species.name(s).to_string())
    }

    /// Every node name, leaves by species name, suffixed by `suffix(node)`.
    pub fn to_newick_annotated<F>(&self, species: &SpeciesMap, suffix: F) -> String
    where
        F: Fn(NodeId) -> String,
    {
        let mut tree = self.tree.clone();
        for id in self.tree.preorder(self.root()) {
            let base = if self.is_leaf(id) {
                self.label(id)
                    .parse::<usize>()
                    .map(|s| species.name(s).to_string())
                    .unwrap_or_default()
            } else {
                self.label(id).to_string()
            };
            if let Some(node) = tree.get_node_mut(id) {
                node.set_name(format!("{}_{}", base, suffix(id)));
            }
        }
        tree.to_newick()
    }

    /// Display name of a node: `N3` or the species name
    pub fn display_name(&self, node: NodeId, species: &SpeciesMap) -> String {
        if self.is_leaf(node) {
            self.label(node)
                .parse::<usize>()
                .map(|s| species.name(s).to_string())
                .unwrap_or_default()
        } else {
            self.label(node).to_string()
        }
    }
}

/// Reads an unrooted tree with species IDs as leaves. The leaf set is
/// checked here, before any rooting work.
pub fn read_unrooted(infile: &str, n_species: usize) -> Result<Tree> {
    let text = crate::libs::io::read_to_string(infile)?;
    let tree = Tree::from_newick(&text).map_err(|source| OrthoError::SpeciesTreeParse {
        source,
        filename: infile.to_string(),
    })?;
    check_leaf_set(&tree, n_species, |name| name.parse::<usize>().ok(), |s| s.to_string())?;
    Ok(tree)
}

/// Duplicate, missing and extra species, in that order.
fn check_leaf_set<F, G>(tree: &Tree, n_species: usize, index_of: F, name_of: G) -> Result<()>
where
    F: Fn(&str) -> Option<usize>,
    G: Fn(usize) -> String,
{
    let leaves: Vec<String> = tree
        .get_leaf_names()
        .into_iter()
        .map(|n| n.unwrap_or_default())
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for name in &leaves {
        *seen.entry(name.as_str()).or_insert(0) += 1;
    }
    let duplicated: Vec<String> = leaves
        .iter()
        .filter(|n| seen[n.as_str()] > 1)
        .unique()
        .cloned()
        .collect();
    if !duplicated.is_empty() {
        return Err(OrthoError::DuplicateSpecies(duplicated));
    }

    let mut present = vec![false; n_species];
    let mut extra = Vec::new();
    for name in &leaves {
        match index_of(name).filter(|&s| s < n_species) {
            Some(s) => present[s] = true,
            None => extra.push(name.clone()),
        }
    }

    let missing: Vec<String> = (0..n_species)
        .filter(|&s| !present[s])
        .map(&name_of)
        .collect();
    if !missing.is_empty() {
        return Err(OrthoError::MissingSpecies(missing));
    }
    if !extra.is_empty() {
        return Err(OrthoError::ExtraSpecies(extra));
    }
    Ok(())
}
