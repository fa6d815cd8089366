//! Ortholog tables under `Orthologues/`.
//!
//! Either one directory per species with a file per partner species,
//! `Orthologues_A/A__v__B.tsv`, or a single `A.tsv` per species when open
//! file handles are scarce. The layout is fixed before reconciliation
//! starts and every row goes through one writer, in orthogroup order.

use crate::libs::error::Result;
use crate::libs::ids::{GeneId, SequenceMap, SpeciesMap};
use crate::libs::orthogroups::og_name;
use crate::libs::recon::OrthologCall;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct OrthologFiles {
    dir: PathBuf,
    fewer_open_files: bool,
    names: Vec<String>,
}

impl OrthologFiles {
    pub fn new(dir: &Path, species: &SpeciesMap, fewer_open_files: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fewer_open_files,
            names: species.names().to_vec(),
        }
    }

    /// File receiving the rows of species `i` against species `j`
    pub fn path(&self, i: usize, j: usize) -> PathBuf {
        let a = &self.names[i];
        if self.fewer_open_files {
            self.dir.join(format!("{}.tsv", a))
        } else {
            self.dir
                .join(format!("Orthologues_{}", a))
                .join(format!("{}__v__{}.tsv", a, self.names[j]))
        }
    }

    fn header(&self, i: usize, j: usize) -> String {
        if self.fewer_open_files {
            "Orthogroup\tSpecies\tGenes\tOrtholog_Species\tOrthologs\tType\n".to_string()
        } else {
            format!("Orthogroup\t{}\t{}\tType\n", self.names[i], self.names[j])
        }
    }

    /// Every file of the layout, keyed the way rows are routed to them.
    fn keys(&self) -> Vec<(usize, usize)> {
        let n = self.names.len();
        if self.fewer_open_files {
            (0..n).map(|i| (i, i)).collect()
        } else {
            (0..n)
                .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
                .collect()
        }
    }

    fn key(&self, i: usize, j: usize) -> (usize, usize) {
        if self.fewer_open_files {
            (i, i)
        } else {
            (i, j)
        }
    }

    fn row(&self, og: usize, call: &OrthologCall, seqs: &SequenceMap) -> Result<String> {
        let genes = |list: &[GeneId]| -> Result<String> {
            Ok(list
                .iter()
                .map(|g| seqs.display(g))
                .collect::<Result<Vec<_>>>()?
                .join(", "))
        };
        let (gi, gj) = (genes(&call.genes_i)?, genes(&call.genes_j)?);
        Ok(if self.fewer_open_files {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                og_name(og),
                self.names[call.species_i],
                gi,
                self.names[call.species_j],
                gj,
                call.kind()
            )
        } else {
            format!("{}\t{}\t{}\t{}\n", og_name(og), gi, gj, call.kind())
        })
    }

    /// Writes every file, both directions of each call. `calls` must come in
    /// orthogroup order. Returns the number of rows.
    pub fn write<'a, I>(&self, calls: I, seqs: &SequenceMap) -> Result<usize>
    where
        I: IntoIterator<Item = (usize, &'a OrthologCall)>,
    {
        let mut buffers: BTreeMap<(usize, usize), String> = self
            .keys()
            .into_iter()
            .map(|(i, j)| ((i, j), self.header(i, j)))
            .collect();

        let mut n_rows = 0;
        for (og, call) in calls {
            for directed in [call.clone(), call.reversed()] {
                let key = self.key(directed.species_i, directed.species_j);
                if let Some(buffer) = buffers.get_mut(&key) {
                    buffer.push_str(&self.row(og, &directed, seqs)?);
                    n_rows += 1;
                }
            }
        }

        for ((i, j), content) in &buffers {
            crate::libs::io::write_file(&self.path(*i, *j), content)?;
        }
        log::info!("Wrote {} ortholog rows to {} files", n_rows, buffers.len());
        Ok(n_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (SpeciesMap, SequenceMap) {
        let species = SpeciesMap::from_names(vec!["A".into(), "B".into(), "C".into()]);
        let seqs = SequenceMap::from_counts(vec![2, 1, 1]);
        (species, seqs)
    }

    fn call() -> OrthologCall {
        OrthologCall {
            species_i: 0,
            species_j: 1,
            genes_i: vec![GeneId::new(0, 0), GeneId::new(0, 1)],
            genes_j: vec![GeneId::new(1, 0)],
        }
    }

    #[test]
    fn one_file_per_pair() {
        let tmp = TempDir::new().unwrap();
        let (species, seqs) = setup();
        let files = OrthologFiles::new(tmp.path(), &species, false);
        let c = call();
        let n = files.write(vec![(3, &c)], &seqs).unwrap();
        assert_eq!(n, 2);

        let ab = std::fs::read_to_string(tmp.path().join("Orthologues_A/A__v__B.tsv")).unwrap();
        assert_eq!(ab, "Orthogroup\tA\tB\tType\nOG0000003\t0_0, 0_1\t1_0\tmany:1\n");
        let ba = std::fs::read_to_string(tmp.path().join("Orthologues_B/B__v__A.tsv")).unwrap();
        assert_eq!(ba, "Orthogroup\tB\tA\tType\nOG0000003\t1_0\t0_0, 0_1\t1:many\n");

        // untouched pairs still get a header
        let ac = std::fs::read_to_string(tmp.path().join("Orthologues_A/A__v__C.tsv")).unwrap();
        assert_eq!(ac, "Orthogroup\tA\tC\tType\n");
    }

    #[test]
    fn one_file_per_species() {
        let tmp = TempDir::new().unwrap();
        let (species, seqs) = setup();
        let files = OrthologFiles::new(tmp.path(), &species, true);
        let c = call();
        files.write(vec![(0, &c)], &seqs).unwrap();

        let a = std::fs::read_to_string(tmp.path().join("A.tsv")).unwrap();
        assert_eq!(
            a,
            "Orthogroup\tSpecies\tGenes\tOrtholog_Species\tOrthologs\tType\nOG0000000\tA\t0_0, 0_1\tB\t1_0\tmany:1\n"
        );
        assert!(tmp.path().join("C.tsv").is_file());
        assert!(!tmp.path().join("Orthologues_A").exists());
    }
}
