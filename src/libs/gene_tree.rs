//! Gene trees of single orthogroups, leaves `species_sequence`.
//!
//! Species content is tracked as per-node counts of the genes below each
//! node. The species on the far side of any edge then follow from the
//! totals, so every node can be read in every orientation of the
//! unrooted tree.

use crate::libs::error::{OrthoError, Result};
use crate::libs::ids::{GeneId, SequenceMap};
use crate::libs::orthogroups::og_name;
use crate::libs::phylo::{NodeId, Tree};
use fixedbitset::FixedBitSet;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Duplication seen at one node in one orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicationEvent {
    /// Species below the duplication
    pub species: FixedBitSet,
    /// |sp(a) ∩ sp(b)| / |sp(a) ∪ sp(b)|
    pub support: f64,
    pub well_supported: bool,
}

#[derive(Debug, Clone)]
pub struct GeneTree {
    og: usize,
    tree: Tree,
    n_species: usize,
    /// Indexed by NodeId, `Some` on leaves
    genes: Vec<Option<GeneId>>,
}

pub fn tree_path(dir: &Path, og: usize) -> PathBuf {
    dir.join(format!("{}_tree.txt", og_name(og)))
}

impl GeneTree {
    pub fn parse(og: usize, text: &str, n_species: usize) -> Result<Self> {
        let tree = Tree::from_newick(text).map_err(|e| OrthoError::gene_tree(og_name(og), e))?;
        Self::from_tree(og, tree, n_species)
    }

    /// `dir/OG0000042_tree.txt`; a missing file is recoverable.
    pub fn from_file(og: usize, dir: &Path, n_species: usize) -> Result<Self> {
        let path = tree_path(dir, og);
        if !path.is_file() {
            return Err(OrthoError::MissingGeneTree {
                og: og_name(og),
                filename: path.display().to_string(),
            });
        }
        let text = crate::libs::io::read_to_string(&path.display().to_string())?;
        Self::parse(og, &text, n_species)
    }

    pub fn from_tree(og: usize, tree: Tree, n_species: usize) -> Result<Self> {
        let mut gene_tree = Self {
            og,
            tree,
            n_species,
            genes: Vec::new(),
        };
        gene_tree.index_genes()?;
        Ok(gene_tree)
    }

    fn error(&self, reason: impl ToString) -> OrthoError {
        OrthoError::gene_tree(og_name(self.og), reason)
    }

    fn index_genes(&mut self) -> Result<()> {
        let root = self.tree.root().map_err(|e| self.error(e))?;
        let mut genes = vec![None; self.tree.capacity()];
        let mut seen = HashSet::new();

        for leaf in self.tree.get_leaves_under(root) {
            let name = self.tree.name_of(leaf).unwrap_or("");
            let gene: GeneId = name
                .parse()
                .map_err(|_| self.error(format!("leaf `{}` is not a gene ID", name)))?;
            if gene.species >= self.n_species {
                return Err(self.error(format!(
                    "leaf `{}` belongs to a species outside the analysis",
                    name
                )));
            }
            if !seen.insert(gene) {
                return Err(self.error(format!("leaf `{}` appears twice", name)));
            }
            genes[leaf] = Some(gene);
        }

        self.genes = genes;
        Ok(())
    }

    pub fn og(&self) -> usize {
        self.og
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    pub fn gene(&self, id: NodeId) -> Option<GeneId> {
        self.genes.get(id).copied().flatten()
    }

    /// Genes in leaf pre-order
    pub fn genes(&self) -> Vec<GeneId> {
        self.tree
            .get_leaves()
            .into_iter()
            .filter_map(|id| self.gene(id))
            .collect()
    }

    /// The leaves must be exactly the genes of the orthogroup.
    pub fn check_genes(&self, expected: &[GeneId]) -> Result<()> {
        let mut found = self.genes();
        found.sort();
        let mut expected = expected.to_vec();
        expected.sort();
        if found != expected {
            return Err(self.error(format!(
                "tree has {} leaves that do not match the {} genes of the orthogroup",
                found.len(),
                expected.len()
            )));
        }
        Ok(())
    }

    /// Genes of each species below every node, indexed by NodeId.
    pub fn species_counts(&self) -> Vec<Vec<u32>> {
        let mut counts = vec![Vec::new(); self.tree.capacity()];
        let Some(root) = self.tree.get_root() else {
            return counts;
        };

        for id in self.tree.postorder(root) {
            let mut here = vec![0u32; self.n_species];
            if let Some(gene) = self.gene(id) {
                here[gene.species] += 1;
            } else if let Some(node) = self.tree.get_node(id) {
                for &child in &node.children {
                    for (h, c) in here.iter_mut().zip(&counts[child]) {
                        *h += c;
                    }
                }
            }
            counts[id] = here;
        }
        counts
    }

    /// Species below every node
    pub fn species_sets(&self) -> Vec<FixedBitSet> {
        self.species_counts()
            .iter()
            .map(|c| to_set(c, self.n_species))
            .collect()
    }

    /// Species on the `u` side of the edge between neighbours `v` and `u`.
    fn side(&self, counts: &[Vec<u32>], v: NodeId, u: NodeId) -> FixedBitSet {
        let is_parent = self.tree.get_node(v).and_then(|n| n.parent) == Some(u);
        if !is_parent {
            return to_set(&counts[u], self.n_species);
        }
        let total = self
            .tree
            .get_root()
            .map(|r| counts[r].as_slice())
            .unwrap_or(&[]);
        let mut set = FixedBitSet::with_capacity(self.n_species);
        for (s, (&all, &below)) in total.iter().zip(&counts[v]).enumerate() {
            if all > below {
                set.insert(s);
            }
        }
        set
    }

    /// Whether `v` is a duplication when `up` is taken as its parent side.
    /// Any two overlapping sides make it one, polytomies included.
    fn is_duplication_towards(&self, counts: &[Vec<u32>], v: NodeId, up: NodeId) -> bool {
        let mut union = FixedBitSet::with_capacity(self.n_species);
        let mut sum = 0;
        for u in self.tree.neighbours(v).into_iter().filter(|&u| u != up) {
            let side = self.side(counts, v, u);
            sum += side.count_ones(..);
            union.union_with(&side);
        }
        sum > union.count_ones(..)
    }

    /// Duplications of the tree read unrooted: every node of degree three in
    /// every orientation. Higher-degree nodes are ambiguous and skipped.
    pub fn duplication_events(&self) -> Vec<DuplicationEvent> {
        let Some(root) = self.tree.get_root() else {
            return Vec::new();
        };
        let counts = self.species_counts();
        let mut events = Vec::new();

        for v in self.tree.preorder(root) {
            let neighbours = self.tree.neighbours(v);
            if neighbours.len() != 3 {
                continue;
            }
            for &up in &neighbours {
                let others: Vec<NodeId> = neighbours.iter().copied().filter(|&u| u != up).collect();
                let a = self.side(&counts, v, others[0]);
                let b = self.side(&counts, v, others[1]);
                let shared = a.intersection(&b).count();
                if shared == 0 {
                    continue;
                }

                let mut spanned = a.clone();
                spanned.union_with(&b);
                let size = spanned.count_ones(..);
                let above = self.side(&counts, v, up);
                let outgroup_present = above.difference(&spanned).next().is_some();

                events.push(DuplicationEvent {
                    support: shared as f64 / size as f64,
                    well_supported: a == b && size >= 2 && outgroup_present,
                    species: spanned,
                });
            }
        }
        events
    }

    /// Distinct species sets of the well-supported duplications, sorted.
    pub fn well_supported_duplications(&self) -> Vec<FixedBitSet> {
        let mut distinct: BTreeMap<Vec<usize>, FixedBitSet> = BTreeMap::new();
        for event in self.duplication_events().into_iter().filter(|e| e.well_supported) {
            distinct
                .entry(event.species.ones().collect())
                .or_insert(event.species);
        }
        distinct.into_values().collect()
    }

    pub fn is_rooted(&self) -> bool {
        self.tree.is_rooted()
    }

    /// Root an unrooted tree on the edge giving the fewest duplication nodes,
    /// the first such edge in pre-order. Rooted trees are left alone.
    pub fn root_min_duplications(&mut self) -> Result<()> {
        let root = self.tree.root().map_err(|e| self.error(e))?;
        let degree = self.tree.get_node(root).map(|n| n.children.len()).unwrap_or(0);
        if degree == 2 {
            return Ok(());
        }
        if degree < 2 {
            return Err(self.error(format!("root has {} children", degree)));
        }

        let counts = self.species_counts();
        let order = self.tree.preorder(root);
        let parent_of = |v: NodeId| self.tree.get_node(v).and_then(|n| n.parent);
        let internal = |v: NodeId| self.gene(v).is_none();

        // duplications with the current orientation
        let current: Vec<bool> = (0..self.tree.capacity())
            .map(|v| match parent_of(v) {
                Some(p) if internal(v) && self.tree.get_node(v).is_some() => {
                    self.is_duplication_towards(&counts, v, p)
                }
                _ => false,
            })
            .collect();
        let base = current.iter().filter(|&&d| d).count();

        let mut best: Option<(usize, NodeId)> = None;
        for &c in order.iter().skip(1) {
            let path = self.tree.get_path_from_root(c).map_err(|e| self.error(e))?;
            let mut dups = base;
            // nodes above the new root now look towards it
            for pair in path.windows(2) {
                let (v, next) = (pair[0], pair[1]);
                if current[v] {
                    dups -= 1;
                }
                if self.is_duplication_towards(&counts, v, next) {
                    dups += 1;
                }
            }
            let root_overlap = counts[c]
                .iter()
                .zip(&counts[root])
                .any(|(&below, &all)| below > 0 && all > below);
            if root_overlap {
                dups += 1;
            }

            if best.map_or(true, |(n, _)| dups < n) {
                best = Some((dups, c));
            }
        }

        let (dups, edge) = best.ok_or_else(|| self.error("no edge to root on"))?;
        log::debug!("{}: rooted with {} duplications", og_name(self.og), dups);
        self.tree.root_on_edge(edge).map_err(|e| self.error(e))?;
        self.tree.compact();
        self.index_genes()
    }

    /// Name internal nodes `n0` (root), `n1`, ... in pre-order.
    pub fn label(&mut self) -> Result<()> {
        self.tree.label_internal("n").map_err(|e| self.error(e))
    }

    /// Copy of the tree with accessions on the leaves
    pub fn with_accessions(&self, seqs: &SequenceMap) -> Result<Tree> {
        let mut tree = self.tree.clone();
        for leaf in self.tree.get_leaves() {
            if let Some(gene) = self.gene(leaf) {
                let shown = seqs.display(&gene)?.to_string();
                if let Some(node) = tree.get_node_mut(leaf) {
                    node.set_name(shown);
                }
            }
        }
        Ok(tree)
    }
}

pub fn to_set(counts: &[u32], width: usize) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(width);
    for (s, &c) in counts.iter().enumerate() {
        if c > 0 {
            set.insert(s);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(set: &FixedBitSet) -> Vec<usize> {
        set.ones().collect()
    }

    #[test]
    fn leaves_must_be_gene_ids() {
        assert!(GeneTree::parse(0, "((0_0,1_0),2_0);", 3).is_ok());

        let err = GeneTree::parse(3, "((0_0,x),2_0);", 3).unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("OG0000003"));

        assert!(GeneTree::parse(0, "((0_0,5_0),2_0);", 3).is_err());
        assert!(GeneTree::parse(0, "((0_0,0_0),2_0);", 3).is_err());
        assert!(GeneTree::parse(0, "((0_0,1_0),2_0", 3).is_err());
    }

    #[test]
    fn counts_follow_the_clades() {
        let gt = GeneTree::parse(0, "((0_0,0_1)a,(1_0,2_0)b)r;", 3).unwrap();
        let counts = gt.species_counts();
        let root = gt.tree().get_root().unwrap();
        assert_eq!(counts[root], vec![2, 1, 1]);

        let a = gt.tree().get_node_by_name("a").unwrap();
        assert_eq!(species(&gt.species_sets()[a]), vec![0]);
    }

    #[test]
    fn well_supported_duplication() {
        // species 0,1 duplicated, species 2 as outgroup
        let gt = GeneTree::parse(0, "(((0_0,1_0),(0_1,1_1)),2_0);", 3).unwrap();
        let sets = gt.well_supported_duplications();
        assert_eq!(sets.len(), 1);
        assert_eq!(species(&sets[0]), vec![0, 1]);

        let best = gt
            .duplication_events()
            .into_iter()
            .find(|e| e.well_supported)
            .unwrap();
        assert_eq!(best.support, 1.0);
    }

    #[test]
    fn terminal_duplication_is_not_well_supported() {
        let gt = GeneTree::parse(0, "(((0_0,0_1),1_0),2_0);", 3).unwrap();
        assert!(gt.well_supported_duplications().is_empty());
        assert!(gt
            .duplication_events()
            .iter()
            .any(|e| species(&e.species) == vec![0]));
    }

    #[test]
    fn unrooted_tree_is_rooted_with_fewest_duplications() {
        // rooting between the two copies explains everything with one duplication
        let mut gt = GeneTree::parse(0, "((0_0,1_0),(0_1,1_1),2_0);", 3).unwrap();
        assert!(!gt.is_rooted());
        gt.root_min_duplications().unwrap();
        assert!(gt.is_rooted());
        assert_eq!(gt.genes().len(), 5);

        let mut gt = GeneTree::parse(0, "(0_0,1_0,(2_0,3_0));", 4).unwrap();
        gt.root_min_duplications().unwrap();
        gt.label().unwrap();
        assert_eq!(gt.tree().to_newick(), "(0_0,(1_0,(2_0,3_0)n2)n1)n0;");
    }

    #[test]
    fn accessions_replace_gene_ids() {
        let gt = GeneTree::parse(0, "(0_0,1_0);", 2).unwrap();
        let seqs = SequenceMap::from_counts(vec![1, 1]);
        let tree = gt.with_accessions(&seqs).unwrap();
        assert_eq!(tree.to_newick(), "(0_0,1_0);");
        assert!(gt.check_genes(&[GeneId::new(1, 0), GeneId::new(0, 0)]).is_ok());
        assert!(gt.check_genes(&[GeneId::new(0, 0)]).is_err());
    }
}
