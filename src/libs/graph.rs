//! Symmetric similarity graph over all genes and its MCL matrix format.
//!
//! Nodes are global offsets: the genes of species 0 first, then species 1,
//! and so on. Two genes are linked when either directional search found a
//! hit, and the weight is the sum of both directional scores.

use crate::libs::error::{OrthoError, Result};
use crate::libs::matrix::{MatrixStore, SimilarityMatrix};
use crate::libs::pool::WorkerPool;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Sparse adjacency rows, each sorted by column.
#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    rows: Vec<Vec<(usize, f64)>>,
}

impl SimilarityGraph {
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>) -> Self {
        Self { rows }
    }

    pub fn n_nodes(&self) -> usize {
        self.rows.len()
    }

    pub fn n_edges(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    pub fn row(&self, node: usize) -> &[(usize, f64)] {
        self.rows.get(node).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<(usize, f64)>] {
        &self.rows
    }

    pub fn weight(&self, a: usize, b: usize) -> Option<f64> {
        let r = self.row(a);
        r.binary_search_by_key(&b, |&(c, _)| c)
            .ok()
            .map(|idx| r[idx].1)
    }
}

/// Rows of species `i`, one per query gene, columns as global offsets.
///
/// `load(x, y)` must return the matrix of searches of species x against y.
pub fn species_rows<F>(
    i: usize,
    offsets: &[usize],
    counts: &[usize],
    load: F,
) -> Result<Vec<Vec<(usize, f64)>>>
where
    F: Fn(usize, usize) -> Result<SimilarityMatrix>,
{
    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); counts[i]];

    for j in 0..counts.len() {
        let forward = load(i, j)?;
        let reverse = if i == j { None } else { Some(load(j, i)?) };
        let reverse = reverse.as_ref().unwrap_or(&forward);

        // hits of species j genes on species i genes, regrouped by the i gene
        let mut back: Vec<Vec<(usize, f64)>> = vec![Vec::new(); counts[i]];
        for h in 0..reverse.n_rows() {
            for &(g, score) in reverse.row(h) {
                back[g].push((h, score));
            }
        }

        for (g, row) in rows.iter_mut().enumerate() {
            // both lists are sorted by h
            let mut fwd = forward.row(g).iter().peekable();
            let mut rev = back[g].iter().peekable();
            loop {
                let entry = match (fwd.peek(), rev.peek()) {
                    (Some(&&(a, wa)), Some(&&(b, wb))) if a == b => {
                        fwd.next();
                        rev.next();
                        (a, wa + wb)
                    }
                    (Some(&&(a, wa)), Some(&&(b, _))) if a < b => {
                        fwd.next();
                        (a, wa)
                    }
                    (_, Some(&&(b, wb))) => {
                        rev.next();
                        (b, wb)
                    }
                    (Some(&&(a, wa)), None) => {
                        fwd.next();
                        (a, wa)
                    }
                    (None, None) => break,
                };
                row.push((offsets[j] + entry.0, entry.1));
            }
        }
    }

    Ok(rows)
}

pub fn mcl_header(n_nodes: usize) -> String {
    format!(
        "(mclheader\nmcltype matrix\ndimensions {}x{}\n)\n\n(mclmatrix\nbegin\n\n",
        n_nodes, n_nodes
    )
}

/// One matrix row: `offset    col:weight col:weight $`
pub fn mcl_row(node: usize, row: &[(usize, f64)]) -> String {
    let mut line = format!("{}    ", node);
    for &(col, w) in row {
        // writing to a String cannot fail
        let _ = write!(line, "{}:{:.3} ", col, w);
    }
    line.push_str("$\n");
    line
}

pub fn shard_path(dir: &Path, species: usize) -> PathBuf {
    dir.join(format!("graph.txt_{}", species))
}

/// Write the rows of one species. The last species closes the matrix.
pub fn write_shard(
    dir: &Path,
    species: usize,
    first_node: usize,
    rows: &[Vec<(usize, f64)>],
    last: bool,
) -> Result<()> {
    let path = shard_path(dir, species);
    let err = crate::libs::io::write_err(&path);
    let mut writer = crate::libs::io::writer(&path.display().to_string())?;
    for (k, row) in rows.iter().enumerate() {
        writer
            .write_all(mcl_row(first_node + k, row).as_bytes())
            .map_err(&err)?;
    }
    if last {
        writer.write_all(b")\n").map_err(&err)?;
    }
    writer.flush().map_err(&err)
}

/// Header followed by every shard in species order.
pub fn merge_shards(dir: &Path, n_species: usize, n_nodes: usize, outfile: &str) -> Result<()> {
    let mut writer = crate::libs::io::writer(outfile)?;
    let err = |source| OrthoError::CannotWrite {
        source,
        filename: outfile.to_string(),
    };
    writer.write_all(mcl_header(n_nodes).as_bytes()).map_err(err)?;
    for i in 0..n_species {
        let path = shard_path(dir, i);
        let mut reader = crate::libs::io::reader(&path.display().to_string())?;
        std::io::copy(&mut reader, &mut writer).map_err(err)?;
    }
    writer.flush().map_err(err)
}

/// Build the graph one species per worker. With `shard_dir` the per-species
/// MCL shards are written as well.
pub fn build(
    store: &MatrixStore,
    counts: &[usize],
    pool: &WorkerPool,
    shard_dir: Option<&Path>,
) -> Result<SimilarityGraph> {
    store.check()?;
    let offsets: Vec<usize> = counts
        .iter()
        .scan(0, |acc, &n| {
            let start = *acc;
            *acc += n;
            Some(start)
        })
        .collect();
    let n_species = counts.len();

    let per_species = pool.map_keyed("graph", (0..n_species).collect(), |_, i: usize| {
        let rows = species_rows(i, &offsets, counts, |x, y| store.load(x, y))?;
        if let Some(dir) = shard_dir {
            write_shard(dir, i, offsets[i], &rows, i + 1 == n_species)?;
        }
        log::debug!("species {}: {} rows", i, rows.len());
        Ok(rows)
    })?;

    let rows: Vec<Vec<(usize, f64)>> = per_species.into_values().flatten().collect();
    log::info!("Similarity graph: {} genes", rows.len());
    Ok(SimilarityGraph::from_rows(rows))
}

/// Read an MCL matrix file. Edges listed in one direction only are mirrored.
pub fn read_mcl(infile: &str) -> Result<SimilarityGraph> {
    let reader = crate::libs::io::reader(infile)?;
    let malformed = |line: usize, content: &str| OrthoError::MalformedLine {
        filename: infile.to_string(),
        line,
        content: content.to_string(),
    };

    let mut n_nodes: Option<usize> = None;
    let mut in_matrix = false;
    let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
    // an entry may span lines; `current` is the row being read
    let mut current: Option<usize> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| OrthoError::CannotOpen {
            source,
            filename: infile.to_string(),
        })?;
        let text = line.trim();

        if !in_matrix {
            if let Some(dims) = text.strip_prefix("dimensions") {
                let n = dims
                    .trim()
                    .split('x')
                    .next()
                    .and_then(|d| d.parse::<usize>().ok())
                    .ok_or_else(|| malformed(lineno + 1, &line))?;
                n_nodes = Some(n);
                rows = vec![Vec::new(); n];
            } else if text == "begin" {
                if n_nodes.is_none() {
                    return Err(malformed(lineno + 1, &line));
                }
                in_matrix = true;
            }
            continue;
        }

        for token in text.split_whitespace() {
            match token {
                ")" => in_matrix = false,
                "$" => current = None,
                _ => match (current, token.split_once(':')) {
                    (None, None) => {
                        let node: usize = token.parse().map_err(|_| malformed(lineno + 1, &line))?;
                        if node >= rows.len() {
                            return Err(malformed(lineno + 1, &line));
                        }
                        current = Some(node);
                    }
                    (Some(node), Some((col, w))) => {
                        let col: usize = col.parse().map_err(|_| malformed(lineno + 1, &line))?;
                        let w: f64 = w.parse().map_err(|_| malformed(lineno + 1, &line))?;
                        if col >= rows.len() {
                            return Err(malformed(lineno + 1, &line));
                        }
                        rows[node].push((col, w));
                    }
                    _ => return Err(malformed(lineno + 1, &line)),
                },
            }
        }
    }

    // symmetrise, keeping the larger weight for edges given twice
    let mut sym: Vec<Vec<(usize, f64)>> = rows.clone();
    for (a, row) in rows.iter().enumerate() {
        for &(b, w) in row {
            sym[b].push((a, w));
        }
    }
    for row in &mut sym {
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

    Ok(SimilarityGraph::from_rows(sym))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n_rows: usize, n_cols: usize, hits: &[(usize, usize, f64)]) -> SimilarityMatrix {
        let mut m = SimilarityMatrix::new(n_rows, n_cols);
        for &(q, h, s) in hits {
            m.push(q, h, s);
        }
        m.finalize();
        m
    }

    // species 0 has 2 genes, species 1 has 1 gene
    fn load(x: usize, y: usize) -> Result<SimilarityMatrix> {
        Ok(match (x, y) {
            (0, 0) => matrix(2, 2, &[(0, 0, 10.0), (0, 1, 2.0)]),
            (0, 1) => matrix(2, 1, &[(0, 0, 5.0)]),
            (1, 0) => matrix(1, 2, &[(0, 0, 4.0), (0, 1, 1.5)]),
            _ => matrix(1, 1, &[(0, 0, 9.0)]),
        })
    }

    /// Every edge is stored in both directions with the same weight.
    fn is_symmetric(graph: &SimilarityGraph) -> bool {
        (0..graph.n_nodes()).all(|a| {
            graph.row(a).iter().all(|&(b, w)| {
                graph.weight(b, a).is_some_and(|back| (back - w).abs() < 1e-9)
            })
        })
    }

    #[test]
    fn rows_sum_both_directions() {
        let offsets = [0, 2];
        let counts = [2, 1];
        let rows0 = species_rows(0, &offsets, &counts, load).unwrap();
        let rows1 = species_rows(1, &offsets, &counts, load).unwrap();

        // self hit counted from both directions of the same matrix
        assert_eq!(rows0[0], vec![(0, 20.0), (1, 2.0), (2, 9.0)]);
        // only the reverse search found 0_1 -> 1_0
        assert_eq!(rows0[1], vec![(0, 2.0), (2, 1.5)]);
        assert_eq!(rows1[0], vec![(0, 9.0), (1, 1.5), (2, 18.0)]);

        let graph = SimilarityGraph::from_rows(rows0.into_iter().chain(rows1).collect());
        assert!(is_symmetric(&graph));
        assert_eq!(graph.weight(1, 2), Some(1.5));
    }

    #[test]
    fn mcl_text_round_trip() {
        assert_eq!(mcl_row(3, &[(0, 1.0), (5, 2.25)]), "3    0:1.000 5:2.250 $\n");
        assert_eq!(mcl_row(4, &[]), "4    $\n");

        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), 0, 0, &[vec![(1, 3.0)], vec![(0, 3.0)]], false).unwrap();
        write_shard(dir.path(), 1, 2, &[vec![]], true).unwrap();

        let out = dir.path().join("graph.txt");
        let out = out.display().to_string();
        merge_shards(dir.path(), 2, 3, &out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("(mclheader\nmcltype matrix\ndimensions 3x3\n)"));
        assert!(text.ends_with("2    $\n)\n"));

        let graph = read_mcl(&out).unwrap();
        assert_eq!(graph.n_nodes(), 3);
        assert_eq!(graph.weight(0, 1), Some(3.0));
        assert!(graph.row(2).is_empty());
    }
}
