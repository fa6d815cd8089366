//! Gene tree / species tree reconciliation by species overlap.
//!
//! A gene tree node whose children share a species is a duplication, any
//! other internal node a speciation. Every node is mapped to the MRCA of
//! its species in the species tree. Orthologs are the genes on opposite
//! sides of a speciation node.
//!
//! With paralogous clade splitting, a child clade of a speciation node is
//! cut at its well-supported duplications first, and each copy is paired
//! with the other side on its own.

use crate::libs::config::Config;
use crate::libs::error::{OrthoError, Result};
use crate::libs::gene_tree::{tree_path, GeneTree};
use crate::libs::hog::{self, HogEntry};
use crate::libs::ids::{GeneId, SequenceMap, SpeciesMap};
use crate::libs::orthogroups::{og_name, Orthogroups};
use crate::libs::phylo::{NodeId, Tree};
use crate::libs::pool::WorkerPool;
use crate::libs::species_tree::SpeciesTree;
use fixedbitset::FixedBitSet;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrthologType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl OrthologType {
    /// Seen from the side with `n_i` genes
    pub fn classify(n_i: usize, n_j: usize) -> Self {
        match (n_i > 1, n_j > 1) {
            (false, false) => OrthologType::OneToOne,
            (false, true) => OrthologType::OneToMany,
            (true, false) => OrthologType::ManyToOne,
            (true, true) => OrthologType::ManyToMany,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrthologType::OneToOne => "1:1",
            OrthologType::OneToMany => "1:many",
            OrthologType::ManyToOne => "many:1",
            OrthologType::ManyToMany => "many:many",
        }
    }
}

impl fmt::Display for OrthologType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Orthologs between the genes of two species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthologCall {
    pub species_i: usize,
    pub species_j: usize,
    pub genes_i: Vec<GeneId>,
    pub genes_j: Vec<GeneId>,
}

impl OrthologCall {
    pub fn kind(&self) -> OrthologType {
        OrthologType::classify(self.genes_i.len(), self.genes_j.len())
    }

    pub fn reversed(&self) -> Self {
        Self {
            species_i: self.species_j,
            species_j: self.species_i,
            genes_i: self.genes_j.clone(),
            genes_j: self.genes_i.clone(),
        }
    }
}

/// Two sibling clades related by speciation, genes grouped by species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CladePair {
    pub left: BTreeMap<usize, Vec<GeneId>>,
    pub right: BTreeMap<usize, Vec<GeneId>>,
}

fn by_species(genes: &[GeneId]) -> BTreeMap<usize, Vec<GeneId>> {
    let mut map: BTreeMap<usize, Vec<GeneId>> = BTreeMap::new();
    for &g in genes {
        map.entry(g.species).or_default().push(g);
    }
    for list in map.values_mut() {
        list.sort();
    }
    map
}

impl CladePair {
    pub fn new(left: &[GeneId], right: &[GeneId]) -> Self {
        Self {
            left: by_species(left),
            right: by_species(right),
        }
    }

    /// Relationship of the two clades as wholes
    pub fn kind(&self) -> OrthologType {
        let count = |side: &BTreeMap<usize, Vec<GeneId>>| side.values().map(|v| v.len()).sum();
        OrthologType::classify(count(&self.left), count(&self.right))
    }

    /// One call per species pair across the two clades.
    pub fn calls(&self) -> Vec<OrthologCall> {
        let mut calls = Vec::new();
        for (&si, gi) in &self.left {
            for (&sj, gj) in &self.right {
                if si == sj {
                    continue;
                }
                calls.push(OrthologCall {
                    species_i: si,
                    species_j: sj,
                    genes_i: gi.clone(),
                    genes_j: gj.clone(),
                });
            }
        }
        calls
    }
}

/// Orthology of orthogroups too small for a gene tree.
///
/// Three genes of three species are read as the tree `(g0, (g1, g2))`, in
/// orthogroup order.
pub fn closed_form(genes: &[GeneId]) -> Vec<CladePair> {
    let n_species = {
        let mut s: Vec<usize> = genes.iter().map(|g| g.species).collect();
        s.sort_unstable();
        s.dedup();
        s.len()
    };

    match (genes, n_species) {
        ([a, b], 2) => vec![CladePair::new(&[*a], &[*b])],
        ([a, b, c], 3) => vec![
            CladePair::new(&[*a], &[*b, *c]),
            CladePair::new(&[*b], &[*c]),
        ],
        ([first, ..], 2) if genes.len() == 3 => {
            let (left, right): (Vec<GeneId>, Vec<GeneId>) =
                genes.iter().copied().partition(|g| g.species == first.species);
            vec![CladePair::new(&left, &right)]
        }
        _ => Vec::new(),
    }
}

/// A duplication node of a reconciled gene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneDuplication {
    pub og: usize,
    pub species_node: NodeId,
    pub gene_node: String,
    /// Share of the species expected under `species_node` found on both sides
    pub support: f64,
    pub terminal: bool,
    pub genes1: Vec<GeneId>,
    pub genes2: Vec<GeneId>,
}

/// Per-node reconciliation of one gene tree, indexed by gene tree NodeId.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub mrca: Vec<Option<NodeId>>,
    pub duplication: Vec<bool>,
    pub pairs: Vec<CladePair>,
    pub duplications: Vec<GeneDuplication>,
}

fn genes_under(gene_tree: &GeneTree, node: NodeId) -> Vec<GeneId> {
    gene_tree
        .tree()
        .get_leaves_under(node)
        .into_iter()
        .filter_map(|leaf| gene_tree.gene(leaf))
        .collect()
}

/// Sub-clades of `node` left after cutting at every duplication whose
/// support reaches `threshold`, top down and in pre-order.
fn paralogous_clades(tree: &Tree, node: NodeId, support: &[Option<f64>], threshold: f64) -> Vec<NodeId> {
    let mut clades = Vec::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        match (support[id], tree.get_node(id)) {
            (Some(s), Some(n)) if s >= threshold && !n.children.is_empty() => {
                stack.extend(n.children.iter().rev());
            }
            _ => clades.push(id),
        }
    }
    clades
}

/// Classify and map every node of a rooted gene tree, children first.
///
/// `split` is the support threshold for paralogous clade splitting, `None`
/// keeps every child clade whole.
pub fn reconcile_tree(
    gene_tree: &GeneTree,
    species_tree: &SpeciesTree,
    split: Option<f64>,
) -> Result<Reconciled> {
    let tree = gene_tree.tree();
    let root = tree
        .root()
        .map_err(|e| OrthoError::gene_tree(og_name(gene_tree.og()), e))?;
    let n_species = gene_tree.n_species();
    let sets = gene_tree.species_sets();

    let mut result = Reconciled {
        mrca: vec![None; tree.capacity()],
        duplication: vec![false; tree.capacity()],
        pairs: Vec::new(),
        duplications: Vec::new(),
    };
    let mut support: Vec<Option<f64>> = vec![None; tree.capacity()];

    for id in tree.postorder(root) {
        result.mrca[id] = Some(species_tree.mrca(&sets[id]));
        let Some(node) = tree.get_node(id) else {
            continue;
        };
        if node.is_leaf() {
            continue;
        }

        let sizes: usize = node.children.iter().map(|&c| sets[c].count_ones(..)).sum();
        let is_dup = sizes > sets[id].count_ones(..);
        result.duplication[id] = is_dup;

        if is_dup {
            let species_node = species_tree.mrca(&sets[id]);
            let (first, rest) = match node.children.split_first() {
                Some(split) => split,
                None => continue,
            };
            let mut others = FixedBitSet::with_capacity(n_species);
            let mut genes2 = Vec::new();
            for &c in rest {
                others.union_with(&sets[c]);
                genes2.extend(genes_under(gene_tree, c));
            }
            let shared = sets[*first].intersection(&others).count();
            let expected = species_tree.clade(species_node).count_ones(..).max(1);
            let value = shared as f64 / expected as f64;
            support[id] = Some(value);

            result.duplications.push(GeneDuplication {
                og: gene_tree.og(),
                species_node,
                gene_node: tree.name_of(id).unwrap_or("").to_string(),
                support: value,
                terminal: species_tree.is_leaf(species_node),
                genes1: genes_under(gene_tree, *first),
                genes2,
            });
        } else {
            // per child, the gene sets that pair with the other children
            let clades: Vec<Vec<Vec<GeneId>>> = node
                .children
                .iter()
                .map(|&c| {
                    let parts = match split {
                        Some(threshold) => paralogous_clades(tree, c, &support, threshold),
                        None => vec![c],
                    };
                    parts.into_iter().map(|p| genes_under(gene_tree, p)).collect()
                })
                .collect();
            for (x, lefts) in clades.iter().enumerate() {
                for rights in &clades[x + 1..] {
                    for left in lefts {
                        for right in rights {
                            result.pairs.push(CladePair::new(left, right));
                        }
                    }
                }
            }
        }
    }

    Ok(result)
}

/// Everything reconciliation learns about one orthogroup.
#[derive(Debug, Clone, Default)]
pub struct OgResult {
    pub pairs: Vec<CladePair>,
    pub duplications: Vec<GeneDuplication>,
    pub hogs: Vec<HogEntry>,
}

impl OgResult {
    pub fn calls(&self) -> Vec<OrthologCall> {
        self.pairs.iter().flat_map(|p| p.calls()).collect()
    }
}

/// Shared read-only inputs of the per-orthogroup workers.
pub struct Reconciler<'a> {
    pub species_tree: &'a SpeciesTree,
    pub seqs: &'a SequenceMap,
    pub config: &'a Config,
    pub gene_tree_dir: &'a Path,
    /// `Resolved_Gene_Trees/`, written when set
    pub resolved_dir: Option<&'a Path>,
}

impl Reconciler<'_> {
    pub fn reconcile_og(&self, og: usize, genes: &[GeneId]) -> Result<OgResult> {
        let n = genes.len();
        if n < 2 {
            return Ok(OgResult::default());
        }

        if n < self.config.min_seq {
            if n > 3 {
                log::debug!("{}: {} genes, below the gene tree threshold", og_name(og), n);
                return Ok(OgResult::default());
            }
            return Ok(OgResult {
                pairs: closed_form(genes),
                duplications: Vec::new(),
                hogs: hog::small_og_hogs(og, genes, self.species_tree),
            });
        }

        let mut gene_tree =
            GeneTree::from_file(og, self.gene_tree_dir, self.species_tree.n_species())?;
        gene_tree.check_genes(genes)?;
        gene_tree.root_min_duplications()?;
        gene_tree.label()?;

        let split = self
            .config
            .split_paralogous_clades
            .then_some(self.config.dup_support);
        let reconciled = reconcile_tree(&gene_tree, self.species_tree, split)?;
        let hogs = hog::tree_hogs(&gene_tree, &reconciled, self.species_tree);

        if let Some(dir) = self.resolved_dir {
            let tree = gene_tree.with_accessions(self.seqs)?;
            crate::libs::io::write_file(&tree_path(dir, og), &format!("{}\n", tree.to_newick()))?;
        }

        Ok(OgResult {
            pairs: reconciled.pairs,
            duplications: reconciled.duplications,
            hogs,
        })
    }

    /// Reconcile every orthogroup, results keyed by orthogroup index.
    pub fn reconcile_all(
        &self,
        ogs: &Orthogroups,
        pool: &WorkerPool,
    ) -> Result<BTreeMap<usize, OgResult>> {
        let items: Vec<&[GeneId]> = ogs.groups().iter().map(|g| g.as_slice()).collect();
        let results = pool.map_keyed("reconcile", items, |og, genes| self.reconcile_og(og, genes))?;
        log::info!("Reconciled {} of {} orthogroups", results.len(), ogs.len());
        Ok(results)
    }
}

/// `Duplications.tsv`
pub fn duplications_table(
    results: &BTreeMap<usize, OgResult>,
    species_tree: &SpeciesTree,
    species: &SpeciesMap,
    seqs: &SequenceMap,
) -> Result<String> {
    let mut out =
        "Orthogroup\tSpecies Tree Node\tGene Tree Node\tSupport\tType\tGenes 1\tGenes 2\n".to_string();
    let accessions = |genes: &[GeneId]| -> Result<String> {
        Ok(genes
            .iter()
            .map(|g| seqs.display(g))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    };

    for (&og, result) in results {
        for dup in &result.duplications {
            out += &format!(
                "{}\t{}\t{}\t{:.3}\t{}\t{}\t{}\n",
                og_name(og),
                species_tree.display_name(dup.species_node, species),
                dup.gene_node,
                dup.support,
                if dup.terminal { "Terminal" } else { "Non-Terminal" },
                accessions(&dup.genes1)?,
                accessions(&dup.genes2)?,
            );
        }
    }
    Ok(out)
}
