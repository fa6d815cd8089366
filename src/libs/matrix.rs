//! Sparse per-species-pair similarity scores on disk.
//!
//! One file per ordered pair, `Scores{i}_{j}.tsv` or `Scores{i}_{j}.tsv.gz`,
//! each line `query_index<TAB>hit_index<TAB>score`.

use crate::libs::error::{OrthoError, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Rows are genes of the query species, columns genes of the hit species.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    n_cols: usize,
}

impl SimilarityMatrix {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            rows: vec![Vec::new(); n_rows],
            n_cols,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Unchecked insert; call `finalize` before lookups.
    pub fn push(&mut self, row: usize, col: usize, score: f64) {
        self.rows[row].push((col, score));
    }

    /// Sort each row by column and keep the best score of repeated hits.
    pub fn finalize(&mut self) {
        for row in &mut self.rows {
            row.sort_by_key(|&(c, _)| c);
            row.dedup_by(|later, kept| {
                if later.0 == kept.0 {
                    kept.1 = kept.1.max(later.1);
                    true
                } else {
                    false
                }
            });
        }
    }

    pub fn row(&self, row: usize) -> &[(usize, f64)] {
        self.rows.get(row).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let r = self.row(row);
        r.binary_search_by_key(&col, |&(c, _)| c)
            .ok()
            .map(|idx| r[idx].1)
    }
}

/// Directory of score files plus the gene counts used to validate them.
#[derive(Debug, Clone)]
pub struct MatrixStore {
    dir: PathBuf,
    counts: Vec<usize>,
}

impl MatrixStore {
    pub fn new(dir: impl Into<PathBuf>, counts: &[usize]) -> Self {
        Self {
            dir: dir.into(),
            counts: counts.to_vec(),
        }
    }

    fn n_species(&self) -> usize {
        self.counts.len()
    }

    /// Existing file for the pair, plain text preferred
    pub fn path(&self, i: usize, j: usize) -> Option<PathBuf> {
        let plain = self.dir.join(format!("Scores{}_{}.tsv", i, j));
        if plain.is_file() {
            return Some(plain);
        }
        let gz = self.dir.join(format!("Scores{}_{}.tsv.gz", i, j));
        if gz.is_file() {
            return Some(gz);
        }
        None
    }

    /// Fails on the first missing pair, before any heavy work starts.
    pub fn check(&self) -> Result<()> {
        let n = self.n_species();
        for i in 0..n {
            for j in 0..n {
                if self.path(i, j).is_none() {
                    return Err(OrthoError::MissingScores(
                        i,
                        j,
                        self.dir.display().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn load(&self, i: usize, j: usize) -> Result<SimilarityMatrix> {
        let path = self
            .path(i, j)
            .ok_or_else(|| OrthoError::MissingScores(i, j, self.dir.display().to_string()))?;
        let filename = path.display().to_string();
        let reader = crate::libs::io::reader(&filename)?;
        let mut matrix = SimilarityMatrix::new(self.counts[i], self.counts[j]);

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| OrthoError::CannotOpen {
                source,
                filename: filename.clone(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let (q, h, score) = parse_score_line(&line).ok_or_else(|| OrthoError::MalformedLine {
                filename: filename.clone(),
                line: lineno + 1,
                content: line.clone(),
            })?;

            for (index, species) in [(q, i), (h, j)] {
                if index >= self.counts[species] {
                    return Err(OrthoError::GeneOutOfRange {
                        filename: filename.clone(),
                        species,
                        index,
                        count: self.counts[species],
                    });
                }
            }
            if !score.is_finite() || score < 0.0 {
                return Err(OrthoError::InvalidScore {
                    filename: filename.clone(),
                    score,
                });
            }
            matrix.push(q, h, score);
        }

        matrix.finalize();
        Ok(matrix)
    }

    pub fn save(&self, i: usize, j: usize, matrix: &SimilarityMatrix) -> Result<()> {
        let path = self.dir.join(format!("Scores{}_{}.tsv", i, j));
        let err = crate::libs::io::write_err(&path);
        let mut writer = crate::libs::io::writer(&path.display().to_string())?;
        for q in 0..matrix.n_rows() {
            for &(h, score) in matrix.row(q) {
                writeln!(writer, "{}\t{}\t{}", q, h, score).map_err(&err)?;
            }
        }
        writer.flush().map_err(&err)
    }
}

fn parse_score_line(line: &str) -> Option<(usize, usize, f64)> {
    let mut fields = line.split('\t');
    let q = fields.next()?.trim().parse().ok()?;
    let h = fields.next()?.trim().parse().ok()?;
    let score = fields.next()?.trim().parse().ok()?;
    Some((q, h, score))
}
