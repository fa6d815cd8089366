//! Species and sequence ID maps.
//!
//! `SpeciesIDs.txt` lines look like `0: Mycoplasma_agalactiae.faa` and
//! `SequenceIDs.txt` lines like `0_5: WP_011949.1 elongation factor Tu`.
//! Lines starting with `#` are ignored.

use crate::libs::error::{OrthoError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

/// A gene, keyed by species and its index within the species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneId {
    pub species: usize,
    pub seq: usize,
}

impl GeneId {
    pub fn new(species: usize, seq: usize) -> Self {
        Self { species, seq }
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.species, self.seq)
    }
}

impl FromStr for GeneId {
    type Err = OrthoError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || OrthoError::BadGeneId(s.to_string());
        let (sp, seq) = s.split_once('_').ok_or_else(bad)?;
        Ok(GeneId {
            species: sp.parse().map_err(|_| bad())?,
            seq: seq.parse().map_err(|_| bad())?,
        })
    }
}

/// Splits an `ID: rest` line.
fn split_id_line<'a>(line: &'a str, filename: &str, lineno: usize) -> Result<(&'a str, &'a str)> {
    line.split_once(": ")
        .map(|(id, rest)| (id.trim(), rest.trim()))
        .ok_or_else(|| OrthoError::MalformedLine {
            filename: filename.to_string(),
            line: lineno,
            content: line.to_string(),
        })
}

/// Species file name without its last extension
pub fn species_name(file: &str) -> String {
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// Species names indexed by species ID.
#[derive(Debug, Clone, Default)]
pub struct SpeciesMap {
    names: Vec<String>,
}

impl SpeciesMap {
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn from_file(infile: &str) -> Result<Self> {
        Self::from_reader(crate::libs::io::reader(infile)?, infile)
    }

    pub fn from_reader<R: BufRead>(reader: R, filename: &str) -> Result<Self> {
        let mut names = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| OrthoError::CannotOpen {
                source,
                filename: filename.to_string(),
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, file) = split_id_line(&line, filename, i + 1)?;
            let id: usize = id.parse().map_err(|_| OrthoError::MalformedLine {
                filename: filename.to_string(),
                line: i + 1,
                content: line.clone(),
            })?;
            if id != names.len() {
                return Err(OrthoError::SpeciesNotDense(id));
            }
            names.push(species_name(file));
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, species: usize) -> &str {
        self.names.get(species).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Display accessions and per-species gene counts.
#[derive(Debug, Clone, Default)]
pub struct SequenceMap {
    display: HashMap<GeneId, String>,
    counts: Vec<usize>,
}

impl SequenceMap {
    pub fn from_file(infile: &str, n_species: usize) -> Result<Self> {
        Self::from_reader(crate::libs::io::reader(infile)?, infile, n_species)
    }

    /// Accessions are shortened to their first word unless that makes two of them equal.
    pub fn from_reader<R: BufRead>(reader: R, filename: &str, n_species: usize) -> Result<Self> {
        let mut full: Vec<(GeneId, String)> = Vec::new();
        let mut counts = vec![0usize; n_species];

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| OrthoError::CannotOpen {
                source,
                filename: filename.to_string(),
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, accession) = split_id_line(&line, filename, i + 1)?;
            let gene: GeneId = id.parse()?;
            if gene.species >= n_species {
                continue;
            }
            counts[gene.species] = counts[gene.species].max(gene.seq + 1);
            full.push((gene, accession.to_string()));
        }

        let first_word = |s: &str| s.split_whitespace().next().unwrap_or("").to_string();
        let mut seen = HashSet::new();
        let unique = full.iter().all(|(_, acc)| seen.insert(first_word(acc)));
        if !unique {
            log::warn!(
                "{}: first words of accessions are not unique, using full accessions",
                filename
            );
        }

        let display = full
            .into_iter()
            .map(|(gene, acc)| {
                let shown = if unique { first_word(&acc) } else { acc };
                (gene, shown)
            })
            .collect();

        Ok(Self { display, counts })
    }

    /// Build a map where each gene is shown by its own ID.
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let display = counts
            .iter()
            .enumerate()
            .flat_map(|(sp, &n)| (0..n).map(move |seq| GeneId::new(sp, seq)))
            .map(|g| (g, g.to_string()))
            .collect();
        Self { display, counts }
    }

    pub fn n_species(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Global offset of the first gene of each species
    pub fn offsets(&self) -> Vec<usize> {
        self.counts
            .iter()
            .scan(0, |acc, &n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect()
    }

    pub fn display(&self, gene: &GeneId) -> Result<&str> {
        self.display
            .get(gene)
            .map(|s| s.as_str())
            .ok_or_else(|| OrthoError::IdNotFound(gene.to_string()))
    }

    pub fn contains(&self, gene: &GeneId) -> bool {
        gene.species < self.counts.len() && gene.seq < self.counts[gene.species]
    }

    /// Every gene of every species, in species then sequence order
    pub fn genes(&self) -> impl Iterator<Item = GeneId> + '_ {
        self.counts
            .iter()
            .enumerate()
            .flat_map(|(sp, &n)| (0..n).map(move |seq| GeneId::new(sp, seq)))
    }
}

/// Species and sequence maps of a working directory.
pub fn load_workdir(dir: &std::path::Path) -> Result<(SpeciesMap, SequenceMap)> {
    let species = SpeciesMap::from_file(&dir.join("SpeciesIDs.txt").display().to_string())?;
    let seqs = SequenceMap::from_file(
        &dir.join("SequenceIDs.txt").display().to_string(),
        species.len(),
    )?;
    log::info!("{} species, {} genes", species.len(), seqs.total());
    Ok((species, seqs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gene_id_parse() {
        let g: GeneId = "3_17".parse().unwrap();
        assert_eq!(g, GeneId::new(3, 17));
        assert_eq!(g.to_string(), "3_17");

        assert!("3-17".parse::<GeneId>().is_err());
        assert!("a_1".parse::<GeneId>().is_err());
        assert!("1_2_3".parse::<GeneId>().is_err());
    }

    #[test]
    fn species_map_strips_extension() {
        let text = "0: Mycoplasma_agalactiae.faa\n1: Mus.musculus.fa\n#2: Skipped.fa\n";
        let species = SpeciesMap::from_reader(text.as_bytes(), "SpeciesIDs.txt").unwrap();
        assert_eq!(species.len(), 2);
        assert_eq!(species.name(0), "Mycoplasma_agalactiae");
        assert_eq!(species.name(1), "Mus.musculus");
        assert_eq!(species.index_of("Mus.musculus"), Some(1));
    }

    #[test]
    fn species_map_rejects_gaps() {
        let text = "0: A.fa\n2: C.fa\n";
        let err = SpeciesMap::from_reader(text.as_bytes(), "SpeciesIDs.txt").unwrap_err();
        assert!(matches!(err, OrthoError::SpeciesNotDense(2)));
    }

    #[test]
    fn sequence_map_first_word() {
        let text = "0_0: a1 kinase\n0_1: a2\n1_0: b1 transporter\n";
        let seqs = SequenceMap::from_reader(text.as_bytes(), "SequenceIDs.txt", 2).unwrap();
        assert_eq!(seqs.counts(), &[2, 1]);
        assert_eq!(seqs.offsets(), vec![0, 2]);
        assert_eq!(seqs.display(&GeneId::new(1, 0)).unwrap(), "b1");
        assert!(matches!(
            seqs.display(&GeneId::new(1, 5)),
            Err(OrthoError::IdNotFound(_))
        ));
    }

    #[test]
    fn sequence_map_falls_back_to_full_accession() {
        let text = "0_0: gene one\n1_0: gene two\n";
        let seqs = SequenceMap::from_reader(text.as_bytes(), "SequenceIDs.txt", 2).unwrap();
        assert_eq!(seqs.display(&GeneId::new(0, 0)).unwrap(), "gene one");
        assert_eq!(seqs.display(&GeneId::new(1, 0)).unwrap(), "gene two");
    }
}
