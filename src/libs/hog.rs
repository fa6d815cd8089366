//! Hierarchical orthogroups: for every internal species tree node, the sets
//! of genes descending from one ancestral gene at that node.
//!
//! A gene tree node `g` holds a HOG at every species node between a lower
//! and an upper bound on the path to the species root:
//!
//! * lower: `M(g)` for speciations and leaves, the parent of `M(g)` for
//!   duplications, since the copies only merge above it;
//! * upper: `M(p)` of the gene tree parent `p`, included when `p` is a
//!   duplication and excluded when it is a speciation; the species root
//!   for the gene tree root.

use crate::libs::error::{OrthoError, Result};
use crate::libs::gene_tree::GeneTree;
use crate::libs::ids::{GeneId, SequenceMap, SpeciesMap};
use crate::libs::orthogroups::{og_index, og_name};
use crate::libs::phylo::{NodeId, Tree};
use crate::libs::pool::WorkerPool;
use crate::libs::recon::Reconciled;
use crate::libs::species_tree::SpeciesTree;
use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::path::Path;

/// The gene tree clade a HOG was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentClade {
    /// An internal gene tree node, `n3`
    Node(String),
    /// A single gene
    Leaf(GeneId),
    /// No gene tree was built
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HogEntry {
    pub species_node: NodeId,
    pub og: usize,
    pub clade: ParentClade,
    /// Pre-order position of the clade in its gene tree
    pub order: usize,
    pub genes: Vec<GeneId>,
}

/// Species tree nodes from `M(g)` or above, walking up to the bound.
fn span(
    species_tree: &SpeciesTree,
    lower: NodeId,
    skip_lower: bool,
    upper: NodeId,
    upper_included: bool,
) -> Vec<NodeId> {
    let path = species_tree.ancestors(lower);
    let Some(top) = path.iter().position(|&n| n == upper) else {
        return Vec::new();
    };
    let start = usize::from(skip_lower);
    let end = if upper_included { top + 1 } else { top };
    if start >= end {
        return Vec::new();
    }
    path[start..end].to_vec()
}

/// HOGs of a rooted, labelled and reconciled gene tree.
pub fn tree_hogs(
    gene_tree: &GeneTree,
    recon: &Reconciled,
    species_tree: &SpeciesTree,
) -> Vec<HogEntry> {
    let tree = gene_tree.tree();
    let Some(root) = tree.get_root() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (order, id) in tree.preorder(root).into_iter().enumerate() {
        let Some(node) = tree.get_node(id) else {
            continue;
        };
        let Some(mapped) = recon.mrca[id] else {
            continue;
        };

        let (upper, upper_included) = match node.parent {
            None => (species_tree.root(), true),
            Some(p) => match recon.mrca[p] {
                Some(mp) => (mp, recon.duplication[p]),
                None => continue,
            },
        };

        let skip_lower = recon.duplication[id];
        let nodes: Vec<NodeId> = span(species_tree, mapped, skip_lower, upper, upper_included)
            .into_iter()
            .filter(|&n| !species_tree.is_leaf(n))
            .collect();
        if nodes.is_empty() {
            continue;
        }

        let mut genes: Vec<GeneId> = tree
            .get_leaves_under(id)
            .into_iter()
            .filter_map(|leaf| gene_tree.gene(leaf))
            .collect();
        genes.sort();
        let clade = match gene_tree.gene(id) {
            Some(gene) => ParentClade::Leaf(gene),
            None => ParentClade::Node(tree.name_of(id).unwrap_or("").to_string()),
        };

        for species_node in nodes {
            entries.push(HogEntry {
                species_node,
                og: gene_tree.og(),
                clade: clade.clone(),
                order,
                genes: genes.clone(),
            });
        }
    }
    entries
}

/// Orthogroups without a gene tree sit at the MRCA of their species and
/// every node above it.
pub fn small_og_hogs(og: usize, genes: &[GeneId], species_tree: &SpeciesTree) -> Vec<HogEntry> {
    let mut set = fixedbitset::FixedBitSet::with_capacity(species_tree.n_species());
    for g in genes {
        if g.species < species_tree.n_species() {
            set.insert(g.species);
        }
    }
    let mut sorted = genes.to_vec();
    sorted.sort();

    species_tree
        .ancestors(species_tree.mrca(&set))
        .into_iter()
        .filter(|&n| !species_tree.is_leaf(n))
        .map(|species_node| HogEntry {
            species_node,
            og,
            clade: ParentClade::Unresolved,
            order: 0,
            genes: sorted.clone(),
        })
        .collect()
}

/// `N1.HOG0000003`
pub fn hog_name(label: &str, index: usize) -> String {
    format!("{}.HOG{:07}", label, index)
}

/// Groups the entries by species node and names them in
/// (orthogroup, clade order) order.
pub fn collect(entries: Vec<HogEntry>) -> BTreeMap<NodeId, Vec<HogEntry>> {
    let mut by_node: BTreeMap<NodeId, Vec<HogEntry>> = BTreeMap::new();
    for entry in entries {
        by_node.entry(entry.species_node).or_default().push(entry);
    }
    for list in by_node.values_mut() {
        list.sort_by_key(|e| (e.og, e.order));
    }
    by_node
}

/// Writes `N{k}.tsv` for every internal species node, empty ones included.
pub fn write_tables(
    entries: Vec<HogEntry>,
    species_tree: &SpeciesTree,
    species: &SpeciesMap,
    seqs: &SequenceMap,
    dir: &Path,
) -> Result<usize> {
    crate::libs::io::create_dir(dir)?;
    let by_node = collect(entries);
    let mut n_hogs = 0;

    for node in species_tree.internal_nodes() {
        let label = species_tree.label(node);
        let members = species_tree.species_under(node);

        let mut out = "HOG\tOG\tGene Tree Parent Clade".to_string();
        for &s in &members {
            out += &format!("\t{}", species.name(s));
        }
        out += "\n";

        for (index, entry) in by_node.get(&node).into_iter().flatten().enumerate() {
            let clade = match &entry.clade {
                ParentClade::Node(name) => name.clone(),
                ParentClade::Leaf(gene) => seqs.display(gene)?.to_string(),
                ParentClade::Unresolved => "-".to_string(),
            };
            out += &format!("{}\t{}\t{}", hog_name(label, index), og_name(entry.og), clade);
            for &s in &members {
                let cell = entry
                    .genes
                    .iter()
                    .filter(|g| g.species == s)
                    .map(|g| seqs.display(g))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                out += &format!("\t{}", cell);
            }
            out += "\n";
            n_hogs += 1;
        }

        crate::libs::io::write_file(&dir.join(format!("{}.tsv", label)), &out)?;
    }

    Ok(n_hogs)
}

//----------------------------
// Resolved HOG trees
//----------------------------

/// One row of a HOG table, as needed to cut its gene tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HogRow {
    pub hog: String,
    pub og: usize,
    pub clade: String,
    pub genes: Vec<String>,
}

/// Rows with a resolved clade from one `N{k}.tsv`.
pub fn read_table(infile: &str) -> Result<Vec<HogRow>> {
    let reader = crate::libs::io::reader(infile)?;
    let mut rows = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| OrthoError::CannotOpen {
            source,
            filename: infile.to_string(),
        })?;
        if i == 0 || line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let malformed = || OrthoError::MalformedLine {
            filename: infile.to_string(),
            line: i + 1,
            content: line.clone(),
        };
        if fields.len() < 3 {
            return Err(malformed());
        }
        let og = og_index(fields[1]).ok_or_else(malformed)?;
        if fields[2] == "-" {
            continue;
        }
        let genes = fields[3..]
            .iter()
            .flat_map(|cell| cell.split(", "))
            .filter(|g| !g.is_empty())
            .map(|g| g.to_string())
            .collect();
        rows.push(HogRow {
            hog: fields[0].to_string(),
            og,
            clade: fields[2].to_string(),
            genes,
        });
    }
    Ok(rows)
}

/// Subtree of `clade` reduced to the HOG genes.
pub fn hog_tree(gene_tree: &Tree, row: &HogRow) -> Result<Option<Tree>> {
    let Some(node) = gene_tree.get_node_by_name(&row.clade) else {
        return Err(OrthoError::MissingClade {
            hog: row.hog.clone(),
            og: og_name(row.og),
            clade: row.clade.clone(),
        });
    };
    let mut subtree = gene_tree
        .extract_subtree(node)
        .map_err(|e| OrthoError::gene_tree(og_name(row.og), e))?;

    let wanted: HashSet<&str> = row.genes.iter().map(|g| g.as_str()).collect();
    let present: HashSet<String> = subtree.get_leaf_names().into_iter().flatten().collect();
    let absent = row.genes.iter().filter(|g| !present.contains(g.as_str())).count();
    if absent > 0 {
        log::warn!("{}: {} genes are not in clade {}", row.hog, absent, row.clade);
    }
    if !row.genes.iter().any(|g| present.contains(g.as_str())) {
        return Ok(None);
    }

    subtree
        .prune_to(|n| n.name.as_deref().map(|name| wanted.contains(name)).unwrap_or(false))
        .map_err(|e| OrthoError::gene_tree(og_name(row.og), e))?;
    Ok(Some(subtree))
}

/// Cuts `{HOG}_tree.txt` out of the resolved gene trees for every HOG table
/// in `hog_dir`. Returns the number of trees written.
pub fn write_hog_trees(
    hog_dir: &Path,
    trees_dir: &Path,
    out_dir: &Path,
    pool: &WorkerPool,
) -> Result<usize> {
    crate::libs::io::create_dir(out_dir)?;

    let mut tables: Vec<_> = std::fs::read_dir(hog_dir)
        .map_err(|source| OrthoError::CannotOpen {
            source,
            filename: hog_dir.display().to_string(),
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "tsv").unwrap_or(false))
        .collect();
    tables.sort();

    let mut by_og: BTreeMap<usize, Vec<HogRow>> = BTreeMap::new();
    for table in &tables {
        for row in read_table(&table.display().to_string())? {
            by_og.entry(row.og).or_default().push(row);
        }
    }

    let items: Vec<(usize, Vec<HogRow>)> = by_og.into_iter().collect();
    let written = pool.map_keyed("hog trees", items, |_, (og, rows)| {
        let path = crate::libs::gene_tree::tree_path(trees_dir, og);
        if !path.is_file() {
            return Err(OrthoError::MissingGeneTree {
                og: og_name(og),
                filename: path.display().to_string(),
            });
        }
        let text = crate::libs::io::read_to_string(&path.display().to_string())?;
        let tree = Tree::from_newick(&text).map_err(|e| OrthoError::gene_tree(og_name(og), e))?;

        let mut count = 0;
        for row in &rows {
            match hog_tree(&tree, row) {
                Ok(Some(subtree)) => {
                    let outfile = out_dir.join(format!("{}_tree.txt", row.hog));
                    crate::libs::io::write_file(&outfile, &format!("{}\n", subtree.to_newick()))?;
                    count += 1;
                }
                Ok(None) => {}
                Err(e) if !e.is_fatal() => log::warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    })?;

    Ok(written.values().sum())
}
