//! Species tree rooting from gene duplications.
//!
//! A well-supported duplication spanning species S shows that S descends
//! from a single ancestor, so the root cannot lie inside S. Every edge of
//! the unrooted species tree is scored by how many duplications keep S on
//! one of its sides.

use crate::libs::error::{OrthoError, Result};
use crate::libs::gene_tree::GeneTree;
use crate::libs::ids::SpeciesMap;
use crate::libs::orthogroups::og_index;
use crate::libs::phylo::tree::split;
use crate::libs::phylo::{NodeId, Tree};
use crate::libs::pool::WorkerPool;
use crate::libs::species_tree::SpeciesTree;
use fixedbitset::FixedBitSet;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::Path;

/// Well-supported duplication sets with the number of gene trees showing each.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    sets: BTreeMap<Vec<usize>, (FixedBitSet, usize)>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets of one gene tree. A set counts once per tree however often it
    /// occurs there.
    pub fn add_sets(&mut self, sets: Vec<FixedBitSet>) {
        let distinct: BTreeMap<Vec<usize>, FixedBitSet> =
            sets.into_iter().map(|s| (s.ones().collect(), s)).collect();
        for (key, set) in distinct {
            self.sets.entry(key).or_insert((set, 0)).1 += 1;
        }
    }

    /// Total number of observations
    pub fn n_events(&self) -> usize {
        self.sets.values().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FixedBitSet, usize)> {
        self.sets.values().map(|(s, n)| (s, *n))
    }
}

/// Gene trees `OG\d{7}_tree.txt` of `dir` with at least four genes.
pub fn gather_evidence(dir: &Path, n_species: usize, pool: &WorkerPool) -> Result<Evidence> {
    let entries = std::fs::read_dir(dir).map_err(|source| OrthoError::CannotOpen {
        source,
        filename: dir.display().to_string(),
    })?;
    let ogs: Vec<usize> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_suffix("_tree.txt").and_then(og_index)
        })
        .sorted()
        .collect();

    let per_tree = pool.map_keyed("evidence", ogs, |_, og| {
        let gene_tree = GeneTree::from_file(og, dir, n_species)?;
        if gene_tree.genes().len() < 4 {
            return Ok(Vec::new());
        }
        Ok(gene_tree.well_supported_duplications())
    })?;

    let mut evidence = Evidence::new();
    for sets in per_tree.into_values() {
        evidence.add_sets(sets);
    }
    Ok(evidence)
}

/// One edge of the unrooted species tree as a possible root.
#[derive(Debug, Clone)]
pub struct RootCandidate {
    /// Lower node of the edge in the derooted tree
    pub node: NodeId,
    /// Species below the edge
    pub split: FixedBitSet,
    pub outgroup: Vec<usize>,
    pub supporting: usize,
    pub contradicting: usize,
}

#[derive(Debug, Clone)]
pub struct Rooting {
    pub candidates: Vec<RootCandidate>,
    /// Indices into `candidates`, in edge pre-order
    pub best: Vec<usize>,
    pub n_events: usize,
    /// One rooted tree per best candidate
    pub rooted: Vec<SpeciesTree>,
}

impl Rooting {
    pub fn species_tree(&self) -> Option<&SpeciesTree> {
        self.rooted.first()
    }

    pub fn best_candidate(&self) -> Option<&RootCandidate> {
        self.best.first().map(|&k| &self.candidates[k])
    }
}

/// Smaller side; on equal sizes the side without species 0.
fn outgroup(split: &FixedBitSet, n_species: usize) -> Vec<usize> {
    let other = split::complement(split, n_species);
    let (a, b) = (split.count_ones(..), other.count_ones(..));
    let side = if a < b || (a == b && !split.contains(0)) {
        split
    } else {
        &other
    };
    side.ones().collect()
}

/// Score every edge of `unrooted` (leaves are species IDs) and root on the best ones.
pub fn root(unrooted: &Tree, n_species: usize, evidence: &Evidence) -> Result<Rooting> {
    if n_species == 2 {
        let tree = SpeciesTree::two_species()?;
        let mut split = FixedBitSet::with_capacity(2);
        split.insert(1);
        return Ok(Rooting {
            candidates: vec![RootCandidate {
                node: tree.leaf(1).unwrap_or(0),
                split,
                outgroup: vec![1],
                supporting: 0,
                contradicting: 0,
            }],
            best: vec![0],
            n_events: 0,
            rooted: vec![tree],
        });
    }
    if n_species < 2 {
        return Err(OrthoError::SpeciesTree(crate::libs::phylo::TreeError::LogicError(
            format!("cannot root a tree of {} species", n_species),
        )));
    }

    let mut tree = unrooted.clone();
    if tree.is_rooted() {
        tree.deroot().map_err(OrthoError::SpeciesTree)?;
    }
    tree.compact();

    let clades = split::clade_bitsets(&tree, n_species, |name| name.parse().ok())
        .map_err(OrthoError::SpeciesTree)?;
    let root = tree.root().map_err(OrthoError::SpeciesTree)?;
    let n_leaves = tree.get_leaves().len();
    if clades[root].count_ones(..) != n_species {
        let missing = (0..n_species)
            .filter(|&s| !clades[root].contains(s))
            .map(|s| s.to_string())
            .collect();
        return Err(OrthoError::MissingSpecies(missing));
    }
    if n_leaves != n_species {
        return Err(OrthoError::DuplicateSpecies(
            tree.get_leaf_names()
                .into_iter()
                .flatten()
                .duplicates()
                .collect(),
        ));
    }

    let candidates: Vec<RootCandidate> = split::edge_splits(&tree, &clades)
        .into_iter()
        .map(|(node, below)| {
            let above = split::complement(&below, n_species);
            let (mut supporting, mut contradicting) = (0, 0);
            for (set, count) in evidence.iter() {
                if set.is_subset(&below) || set.is_subset(&above) {
                    supporting += count;
                } else {
                    contradicting += count;
                }
            }
            RootCandidate {
                node,
                outgroup: outgroup(&below, n_species),
                split: below,
                supporting,
                contradicting,
            }
        })
        .collect();

    let max = candidates.iter().map(|c| c.supporting).max().unwrap_or(0);
    let best: Vec<usize> = candidates
        .iter()
        .positions(|c| c.supporting == max)
        .collect();

    if evidence.is_empty() && n_species < 4 {
        log::warn!(
            "No duplication evidence for {} species, the species tree is rooted on its first edge",
            n_species
        );
    }

    let rooted = best
        .iter()
        .map(|&k| {
            let mut copy = tree.clone();
            copy.root_on_edge(candidates[k].node)
                .map_err(OrthoError::SpeciesTree)?;
            copy.compact();
            SpeciesTree::from_rooted_ids(copy, n_species)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Rooting {
        candidates,
        best,
        n_events: evidence.n_events(),
        rooted,
    })
}

/// Report and write the rooted trees into `dir`.
pub fn write_results(rooting: &Rooting, dir: &Path, species: &SpeciesMap) -> Result<()> {
    let Some(first) = rooting.species_tree() else {
        return Ok(());
    };
    let outgroup_names = |c: &RootCandidate| c.outgroup.iter().map(|&s| species.name(s)).join(", ");

    if let Some(best) = rooting.best_candidate() {
        log::info!(
            "Observed {} well-supported, non-terminal duplications. {} support the best root and {} contradict it.",
            rooting.n_events,
            best.supporting,
            best.contradicting
        );
    }
    for &k in &rooting.best {
        log::info!("Best outgroup(s) for species tree: {}", outgroup_names(&rooting.candidates[k]));
    }
    if rooting.best.len() > 1 {
        log::warn!(
            "{} roots are equally supported, only the first is analysed",
            rooting.best.len()
        );
    }

    let newick = |text: String| text + "\n";
    crate::libs::io::write_file(
        &dir.join("SpeciesTree_rooted.txt"),
        &newick(first.to_newick_names(species)),
    )?;
    crate::libs::io::write_file(
        &dir.join("SpeciesTree_rooted_ids.txt"),
        &newick(first.to_newick_ids()),
    )?;
    crate::libs::io::write_file(
        &dir.join("SpeciesTree_rooted_node_labels.txt"),
        &newick(first.to_newick_labelled(species)),
    )?;
    for (k, tree) in rooting.rooted.iter().enumerate() {
        crate::libs::io::write_file(
            &dir.join(format!("SpeciesTree_rooted_at_outgroup_{}.txt", k)),
            &newick(tree.to_newick_names(species)),
        )?;
    }

    let mut table = "Candidate\tOutgroup\tSupporting\tContradicting\tBest\n".to_string();
    for (k, c) in rooting.candidates.iter().enumerate() {
        table += &format!(
            "{}\t{}\t{}\t{}\t{}\n",
            k,
            outgroup_names(c),
            c.supporting,
            c.contradicting,
            rooting.best.contains(&k)
        );
    }
    crate::libs::io::write_file(&dir.join("STRIDE_Roots.tsv"), &table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(species: &[usize], n: usize) -> FixedBitSet {
        let mut s = FixedBitSet::with_capacity(n);
        for &x in species {
            s.insert(x);
        }
        s
    }

    #[test]
    fn duplications_pick_the_root() {
        let unrooted = Tree::from_newick("(0,1,(2,(3,4)));").unwrap();
        let mut evidence = Evidence::new();
        // three trees saw {0,1} duplicated, one saw {2,3,4}
        for _ in 0..3 {
            evidence.add_sets(vec![set(&[0, 1], 5), set(&[0, 1], 5)]);
        }
        evidence.add_sets(vec![set(&[2, 3, 4], 5)]);
        assert_eq!(evidence.n_events(), 4);

        let rooting = root(&unrooted, 5, &evidence).unwrap();
        assert_eq!(rooting.candidates.len(), 7);
        assert_eq!(rooting.best.len(), 1);

        let best = rooting.best_candidate().unwrap();
        assert_eq!(best.supporting, 4);
        assert_eq!(best.contradicting, 0);
        assert_eq!(best.outgroup, vec![0, 1]);
        assert_eq!(rooting.species_tree().unwrap().to_newick_ids(), "((2,(3,4)),(0,1));");
    }

    #[test]
    fn ties_are_all_reported() {
        let unrooted = Tree::from_newick("(0,1,(2,3));").unwrap();
        let rooting = root(&unrooted, 4, &Evidence::new()).unwrap();
        assert_eq!(rooting.candidates.len(), 5);
        assert_eq!(rooting.best, vec![0, 1, 2, 3, 4]);
        assert_eq!(rooting.rooted.len(), 5);

        // same input, same answer
        let again = root(&unrooted, 4, &Evidence::new()).unwrap();
        assert_eq!(
            again.rooted[0].to_newick_ids(),
            rooting.rooted[0].to_newick_ids()
        );
    }

    #[test]
    fn outgroup_prefers_the_smaller_side() {
        assert_eq!(outgroup(&set(&[2], 4), 4), vec![2]);
        assert_eq!(outgroup(&set(&[0, 1, 2], 4), 4), vec![3]);
        assert_eq!(outgroup(&set(&[0, 1], 4), 4), vec![2, 3]);
        assert_eq!(outgroup(&set(&[2, 3], 4), 4), vec![2, 3]);
    }

    #[test]
    fn two_species_need_no_evidence() {
        let unrooted = Tree::from_newick("(0,1);").unwrap();
        let rooting = root(&unrooted, 2, &Evidence::new()).unwrap();
        assert_eq!(rooting.species_tree().unwrap().to_newick_ids(), "(0,1);");
    }

    #[test]
    fn leaf_set_is_checked() {
        let unrooted = Tree::from_newick("(0,1,(2,2));").unwrap();
        assert!(matches!(
            root(&unrooted, 4, &Evidence::new()),
            Err(OrthoError::MissingSpecies(_))
        ));
        let unrooted = Tree::from_newick("(0,1,(2,(3,3)));").unwrap();
        assert!(matches!(
            root(&unrooted, 4, &Evidence::new()),
            Err(OrthoError::DuplicateSpecies(_))
        ));
    }
}
