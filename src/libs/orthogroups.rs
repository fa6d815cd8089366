//! Orthogroups: numbering of MCL clusters and the orthogroup tables.

use crate::libs::config::OgOrder;
use crate::libs::error::{OrthoError, Result};
use crate::libs::ids::{GeneId, SequenceMap, SpeciesMap};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::BufRead;
use std::path::Path;

/// `OG0000042`
pub fn og_name(index: usize) -> String {
    format!("OG{:07}", index)
}

/// Inverse of `og_name`
pub fn og_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("OG")?;
    if digits.len() != 7 {
        return None;
    }
    digits.parse().ok()
}

/// Orthogroups indexed by their number. Genes within a group are sorted.
#[derive(Debug, Clone, Default)]
pub struct Orthogroups {
    groups: Vec<Vec<GeneId>>,
}

impl Orthogroups {
    pub fn from_groups(groups: Vec<Vec<GeneId>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|mut g| {
                g.sort();
                g
            })
            .collect();
        Self { groups }
    }

    /// Number the MCL clusters (given as global node offsets) and append
    /// every gene left out of them as a singleton, in gene order.
    pub fn from_clusters(clusters: Vec<Vec<usize>>, seqs: &SequenceMap, order: OgOrder) -> Self {
        let offsets = seqs.offsets();
        let gene_of = |node: usize| {
            let species = offsets.partition_point(|&o| o <= node) - 1;
            GeneId::new(species, node - offsets[species])
        };

        let mut groups: Vec<Vec<GeneId>> = clusters
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.into_iter().map(gene_of).sorted().collect())
            .collect();

        if order == OgOrder::Size {
            // stable: equal sizes keep their smallest-member order
            groups.sort_by_key(|g| (Reverse(g.len()), g[0]));
        }

        let assigned: HashSet<GeneId> = groups.iter().flatten().copied().collect();
        for gene in seqs.genes() {
            if !assigned.contains(&gene) {
                groups.push(vec![gene]);
            }
        }

        Self { groups }
    }

    /// Read `Orthogroups_SequenceIDs.txt`: `OG0000000: 0_1 1_3`
    pub fn from_file(infile: &str) -> Result<Self> {
        let reader = crate::libs::io::reader(infile)?;
        let mut groups = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| OrthoError::CannotOpen {
                source,
                filename: infile.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || OrthoError::MalformedLine {
                filename: infile.to_string(),
                line: i + 1,
                content: line.clone(),
            };
            let (name, genes) = line.split_once(':').ok_or_else(malformed)?;
            if og_index(name.trim()) != Some(groups.len()) {
                return Err(malformed());
            }
            let genes = genes
                .split_whitespace()
                .map(|g| g.parse::<GeneId>())
                .collect::<Result<Vec<_>>>()?;
            groups.push(genes);
        }

        Ok(Self::from_groups(groups))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[GeneId]> {
        self.groups.get(index).map(|g| g.as_slice())
    }

    pub fn groups(&self) -> &[Vec<GeneId>] {
        &self.groups
    }

    pub fn n_assigned(&self) -> usize {
        self.groups.iter().filter(|g| g.len() > 1).count()
    }

    //----------------------------
    // Output
    //----------------------------

    /// Every table of the `Orthogroups/` directory.
    pub fn write_tables(&self, dir: &Path, species: &SpeciesMap, seqs: &SequenceMap) -> Result<()> {
        let header = std::iter::once("Orthogroup")
            .chain(species.names().iter().map(|s| s.as_str()))
            .join("\t");

        let mut assigned = format!("{}\n", header);
        let mut unassigned = format!("{}\n", header);
        let mut counts = format!("{}\tTotal\n", header);
        let mut txt = String::new();

        for (k, genes) in self.groups.iter().enumerate() {
            let cells = self.species_cells(genes, species.len(), seqs)?;
            let row = format!("{}\t{}\n", og_name(k), cells.join("\t"));
            if genes.len() > 1 {
                assigned += &row;
                let per_species = count_per_species(genes, species.len());
                counts += &format!(
                    "{}\t{}\t{}\n",
                    og_name(k),
                    per_species.iter().join("\t"),
                    genes.len()
                );
            } else {
                unassigned += &row;
            }

            let accessions = genes
                .iter()
                .map(|g| seqs.display(g))
                .collect::<Result<Vec<_>>>()?;
            let _ = writeln!(txt, "{}: {}", og_name(k), accessions.join(" "));
        }

        crate::libs::io::write_file(&dir.join("Orthogroups.tsv"), &assigned)?;
        crate::libs::io::write_file(&dir.join("Orthogroups_UnassignedGenes.tsv"), &unassigned)?;
        crate::libs::io::write_file(&dir.join("Orthogroups.GeneCount.tsv"), &counts)?;
        crate::libs::io::write_file(&dir.join("Orthogroups.txt"), &txt)?;
        crate::libs::io::write_file(
            &dir.join("Orthogroups_SpeciesOverlaps.tsv"),
            &self.species_overlaps(species),
        )?;
        crate::libs::io::write_file(&dir.join("Orthogroups_SequenceIDs.txt"), &self.sequence_ids())?;
        Ok(())
    }

    /// Sorted accessions of each species, comma separated
    fn species_cells(&self, genes: &[GeneId], n_species: usize, seqs: &SequenceMap) -> Result<Vec<String>> {
        let mut cells: Vec<Vec<&str>> = vec![Vec::new(); n_species];
        for gene in genes {
            if gene.species < n_species {
                cells[gene.species].push(seqs.display(gene)?);
            }
        }
        Ok(cells
            .into_iter()
            .map(|mut c| {
                c.sort_unstable();
                c.join(", ")
            })
            .collect())
    }

    pub fn sequence_ids(&self) -> String {
        self.groups
            .iter()
            .enumerate()
            .map(|(k, genes)| format!("{}: {}\n", og_name(k), genes.iter().join(" ")))
            .collect()
    }

    /// Number of multi-gene orthogroups shared by each pair of species
    pub fn species_overlaps(&self, species: &SpeciesMap) -> String {
        let n = species.len();
        let mut shared = vec![vec![0usize; n]; n];
        for genes in self.groups.iter().filter(|g| g.len() > 1) {
            let present: Vec<usize> = genes.iter().map(|g| g.species).filter(|&s| s < n).dedup().collect();
            for &a in &present {
                for &b in &present {
                    shared[a][b] += 1;
                }
            }
        }

        let mut out = format!("\t{}\n", species.names().join("\t"));
        for (a, row) in shared.iter().enumerate() {
            out += &format!("{}\t{}\n", species.name(a), row.iter().join("\t"));
        }
        out
    }

    /// Clusters in MCL format, genes as global offsets
    pub fn write_clusters(&self, path: &Path, seqs: &SequenceMap) -> Result<()> {
        let offsets = seqs.offsets();
        let mut out = format!(
            "(mclheader\nmcltype matrix\ndimensions {}x{}\n)\n(mclmatrix\nbegin\n",
            seqs.total(),
            self.groups.len()
        );
        for (k, genes) in self.groups.iter().enumerate() {
            let nodes = genes.iter().map(|g| offsets[g.species] + g.seq).join(" ");
            let _ = writeln!(out, "{}      {} $", k, nodes);
        }
        out.push_str(")\n");
        crate::libs::io::write_file(path, &out)
    }

    /// Per-species summary of how many genes landed in orthogroups.
    pub fn species_statistics(&self, species: &SpeciesMap, seqs: &SequenceMap) -> String {
        let n = species.len();
        let mut in_ogs = vec![0usize; n];
        let mut unassigned = vec![0usize; n];
        let mut ogs_with = vec![0usize; n];
        let mut specific = vec![0usize; n];
        let mut specific_genes = vec![0usize; n];

        for genes in &self.groups {
            let per_species = count_per_species(genes, n);
            if genes.len() == 1 {
                if let Some(g) = genes.first().filter(|g| g.species < n) {
                    unassigned[g.species] += 1;
                }
                continue;
            }
            let present: Vec<usize> = (0..n).filter(|&s| per_species[s] > 0).collect();
            for &s in &present {
                in_ogs[s] += per_species[s];
                ogs_with[s] += 1;
            }
            if let [only] = present.as_slice() {
                specific[*only] += 1;
                specific_genes[*only] += per_species[*only];
            }
        }

        let n_ogs = self.n_assigned();
        let pct = |a: usize, b: usize| {
            if b == 0 {
                "0.0".to_string()
            } else {
                format!("{:.1}", 100.0 * a as f64 / b as f64)
            }
        };
        let counts = seqs.counts();
        let genes = |s: usize| counts.get(s).copied().unwrap_or(0);

        let rows: Vec<(&str, Vec<String>)> = vec![
            ("Number of genes", (0..n).map(|s| genes(s).to_string()).collect()),
            ("Number of genes in orthogroups", (0..n).map(|s| in_ogs[s].to_string()).collect()),
            ("Number of unassigned genes", (0..n).map(|s| unassigned[s].to_string()).collect()),
            ("Percentage of genes in orthogroups", (0..n).map(|s| pct(in_ogs[s], genes(s))).collect()),
            ("Percentage of unassigned genes", (0..n).map(|s| pct(unassigned[s], genes(s))).collect()),
            ("Number of orthogroups containing species", (0..n).map(|s| ogs_with[s].to_string()).collect()),
            ("Percentage of orthogroups containing species", (0..n).map(|s| pct(ogs_with[s], n_ogs)).collect()),
            ("Number of species-specific orthogroups", (0..n).map(|s| specific[s].to_string()).collect()),
            ("Number of genes in species-specific orthogroups", (0..n).map(|s| specific_genes[s].to_string()).collect()),
            ("Percentage of genes in species-specific orthogroups", (0..n).map(|s| pct(specific_genes[s], genes(s))).collect()),
        ];

        let mut out = format!("\t{}\n", species.names().join("\t"));
        for (label, cells) in rows {
            out += &format!("{}\t{}\n", label, cells.join("\t"));
        }
        out
    }
}

fn count_per_species(genes: &[GeneId], n_species: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_species];
    for g in genes.iter().filter(|g| g.species < n_species) {
        counts[g.species] += 1;
    }
    counts
}
