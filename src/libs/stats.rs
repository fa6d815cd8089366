//! Comparative genomics statistics: ortholog counts between species and
//! duplication summaries.

use crate::libs::error::Result;
use crate::libs::ids::SpeciesMap;
use crate::libs::orthogroups::{og_index, og_name};
use crate::libs::phylo::NodeId;
use crate::libs::recon::{OrthologCall, OrthologType};
use crate::libs::species_tree::SpeciesTree;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Genes of species `i` with an ortholog in species `j`, as `[i][j]` matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthologStats {
    pub total: Vec<Vec<usize>>,
    pub one_to_one: Vec<Vec<usize>>,
    pub one_to_many: Vec<Vec<usize>>,
    pub many_to_one: Vec<Vec<usize>>,
    pub many_to_many: Vec<Vec<usize>>,
}

impl OrthologStats {
    pub fn new(n_species: usize) -> Self {
        let zero = vec![vec![0; n_species]; n_species];
        Self {
            total: zero.clone(),
            one_to_one: zero.clone(),
            one_to_many: zero.clone(),
            many_to_one: zero.clone(),
            many_to_many: zero,
        }
    }

    fn matrix_mut(&mut self, kind: OrthologType) -> &mut Vec<Vec<usize>> {
        match kind {
            OrthologType::OneToOne => &mut self.one_to_one,
            OrthologType::OneToMany => &mut self.one_to_many,
            OrthologType::ManyToOne => &mut self.many_to_one,
            OrthologType::ManyToMany => &mut self.many_to_many,
        }
    }

    /// Counts both directions of the call.
    pub fn add(&mut self, call: &OrthologCall) {
        for directed in [call.clone(), call.reversed()] {
            let (i, j) = (directed.species_i, directed.species_j);
            let n = directed.genes_i.len();
            self.total[i][j] += n;
            self.matrix_mut(directed.kind())[i][j] += n;
        }
    }

    fn table(matrix: &[Vec<usize>], species: &SpeciesMap) -> String {
        let mut out = String::new();
        for name in species.names() {
            out += &format!("\t{}", name);
        }
        out += "\n";
        for (i, row) in matrix.iter().enumerate() {
            out += species.name(i);
            for v in row {
                out += &format!("\t{}", v);
            }
            out += "\n";
        }
        out
    }

    /// `OrthologuesStats_*.tsv`, rows are the species whose genes are counted.
    pub fn write(&self, dir: &Path, species: &SpeciesMap) -> Result<()> {
        let files = [
            ("Totals", &self.total),
            ("one-to-one", &self.one_to_one),
            ("one-to-many", &self.one_to_many),
            ("many-to-one", &self.many_to_one),
            ("many-to-many", &self.many_to_many),
        ];
        for (suffix, matrix) in files {
            let path = dir.join(format!("OrthologuesStats_{}.tsv", suffix));
            crate::libs::io::write_file(&path, &Self::table(matrix, species))?;
        }
        Ok(())
    }
}

//----------------------------
// Duplications
//----------------------------

/// Duplication counts parsed back from `Duplications.tsv`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicationCounts {
    /// (all, well supported) per species tree node
    pub per_node: HashMap<NodeId, (usize, usize)>,
    /// (all, well supported) per orthogroup index
    pub per_og: Vec<(usize, usize)>,
}

/// `None` when the table is absent or does not look like a duplication table.
pub fn read_duplications(
    infile: &Path,
    species_tree: &SpeciesTree,
    species: &SpeciesMap,
    threshold: f64,
) -> Option<DuplicationCounts> {
    let reader = crate::libs::io::reader(&infile.display().to_string()).ok()?;

    let by_name: HashMap<String, NodeId> = species_tree
        .tree()
        .preorder(species_tree.root())
        .into_iter()
        .map(|id| (species_tree.display_name(id, species), id))
        .collect();

    let mut counts = DuplicationCounts::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line.ok()?;
        if i == 0 {
            if !line.starts_with("Orthogroup\tSpecies Tree Node") {
                log::debug!("{}: unexpected header", infile.display());
                return None;
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            log::debug!("{}:{}: too few columns", infile.display(), i + 1);
            return None;
        }
        let og = og_index(fields[0])?;
        let node = *by_name.get(fields[1])?;
        let support: f64 = fields[3].parse().ok()?;
        let supported = usize::from(support >= threshold);

        let entry = counts.per_node.entry(node).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += supported;

        if counts.per_og.len() <= og {
            counts.per_og.resize(og + 1, (0, 0));
        }
        counts.per_og[og].0 += 1;
        counts.per_og[og].1 += supported;
    }
    Some(counts)
}

/// Writes the per node and per orthogroup duplication tables and the
/// annotated species tree. `n_ogs` pads the orthogroup table when known.
/// Returns false when the duplication table was skipped.
pub fn write_duplication_stats(
    infile: &Path,
    species_tree: &SpeciesTree,
    species: &SpeciesMap,
    threshold: f64,
    n_ogs: Option<usize>,
    dir: &Path,
) -> Result<bool> {
    let Some(mut counts) = read_duplications(infile, species_tree, species, threshold) else {
        return Ok(false);
    };
    if let Some(n) = n_ogs {
        if counts.per_og.len() < n {
            counts.per_og.resize(n, (0, 0));
        }
    }

    let percent = (threshold * 100.0).round();
    let header = |first: &str| {
        format!(
            "{}\tDuplications (all)\tDuplications ({}% support)\n",
            first, percent
        )
    };

    let mut per_node = header("Species Tree Node");
    for id in species_tree.tree().preorder(species_tree.root()) {
        let (all, good) = counts.per_node.get(&id).copied().unwrap_or((0, 0));
        per_node += &format!(
            "{}\t{}\t{}\n",
            species_tree.display_name(id, species),
            all,
            good
        );
    }
    crate::libs::io::write_file(&dir.join("Duplications_per_Species_Tree_Node.tsv"), &per_node)?;

    let mut per_og = header("Orthogroup");
    for (og, (all, good)) in counts.per_og.iter().enumerate() {
        per_og += &format!("{}\t{}\t{}\n", og_name(og), all, good);
    }
    crate::libs::io::write_file(&dir.join("Duplications_per_Orthogroup.tsv"), &per_og)?;

    let annotated = species_tree.to_newick_annotated(species, |id| {
        counts.per_node.get(&id).map(|c| c.1).unwrap_or(0).to_string()
    });
    let tree_file = format!("SpeciesTree_Gene_Duplications_{}_Support.txt", threshold);
    crate::libs::io::write_file(&dir.join(tree_file), &format!("{}\n", annotated))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::ids::GeneId;
    use tempfile::TempDir;

    fn names() -> SpeciesMap {
        SpeciesMap::from_names(vec!["A".into(), "B".into(), "C".into()])
    }

    #[test]
    fn categories_sum_to_totals() {
        let mut stats = OrthologStats::new(3);
        stats.add(&OrthologCall {
            species_i: 0,
            species_j: 1,
            genes_i: vec![GeneId::new(0, 0), GeneId::new(0, 1)],
            genes_j: vec![GeneId::new(1, 0)],
        });
        stats.add(&OrthologCall {
            species_i: 0,
            species_j: 2,
            genes_i: vec![GeneId::new(0, 2)],
            genes_j: vec![GeneId::new(2, 0)],
        });

        assert_eq!(stats.total[0][1], 2);
        assert_eq!(stats.total[1][0], 1);
        assert_eq!(stats.many_to_one[0][1], 2);
        assert_eq!(stats.one_to_many[1][0], 1);
        assert_eq!(stats.one_to_one[0][2], 1);
        assert_eq!(stats.one_to_one[2][0], 1);

        for i in 0..3 {
            for j in 0..3 {
                let sum = stats.one_to_one[i][j]
                    + stats.one_to_many[i][j]
                    + stats.many_to_one[i][j]
                    + stats.many_to_many[i][j];
                assert_eq!(sum, stats.total[i][j]);
            }
        }

        let tmp = TempDir::new().unwrap();
        stats.write(tmp.path(), &names()).unwrap();
        let totals = std::fs::read_to_string(tmp.path().join("OrthologuesStats_Totals.tsv")).unwrap();
        assert_eq!(totals, "\tA\tB\tC\nA\t0\t2\t1\nB\t1\t0\t0\nC\t1\t0\t0\n");
    }

    #[test]
    fn duplication_summaries() {
        let tmp = TempDir::new().unwrap();
        let species = names();
        let st = SpeciesTree::from_names("((A,B),C);", "t", &species).unwrap();
        let dups = tmp.path().join("Duplications.tsv");
        std::fs::write(
            &dups,
            "Orthogroup\tSpecies Tree Node\tGene Tree Node\tSupport\tType\tGenes 1\tGenes 2\n\
             OG0000002\tN1\tn3\t1.000\tNon-Terminal\ta, b\tc, d\n\
             OG0000002\tA\tn5\t1.000\tTerminal\ta\te\n\
             OG0000000\tN0\tn0\t0.333\tNon-Terminal\ta\tf\n",
        )
        .unwrap();

        assert!(write_duplication_stats(&dups, &st, &species, 0.5, None, tmp.path()).unwrap());
        let per_node =
            std::fs::read_to_string(tmp.path().join("Duplications_per_Species_Tree_Node.tsv")).unwrap();
        assert_eq!(
            per_node,
            "Species Tree Node\tDuplications (all)\tDuplications (50% support)\n\
             N0\t1\t0\nN1\t1\t1\nA\t1\t1\nB\t0\t0\nC\t0\t0\n"
        );
        let per_og = std::fs::read_to_string(tmp.path().join("Duplications_per_Orthogroup.tsv")).unwrap();
        assert_eq!(per_og.lines().count(), 4);
        assert!(per_og.contains("OG0000001\t0\t0\n"));

        let tree = std::fs::read_to_string(
            tmp.path().join("SpeciesTree_Gene_Duplications_0.5_Support.txt"),
        )
        .unwrap();
        assert_eq!(tree, "((A_1,B_0)N1_1,C_0)N0_0;\n");
    }

    #[test]
    fn missing_or_malformed_tables_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let species = names();
        let st = SpeciesTree::from_names("((A,B),C);", "t", &species).unwrap();

        let absent = tmp.path().join("absent.tsv");
        assert!(!write_duplication_stats(&absent, &st, &species, 0.5, None, tmp.path()).unwrap());

        let bad = tmp.path().join("bad.tsv");
        std::fs::write(&bad, "something else\n").unwrap();
        assert!(!write_duplication_stats(&bad, &st, &species, 0.5, None, tmp.path()).unwrap());
        assert!(!tmp.path().join("Duplications_per_Orthogroup.tsv").exists());
    }
}
