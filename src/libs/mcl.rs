//! Markov clustering.
//!
//! Columns are sparse `(row, value)` lists kept sorted by row. The graph is
//! symmetric, so its rows double as the initial columns.

use crate::libs::graph::SimilarityGraph;
use crate::libs::pool::WorkerPool;
use indexmap::IndexMap;
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;
use std::collections::HashMap;

type Column = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct MclParams {
    pub inflation: f64,
    /// Entries below this are dropped after inflation
    pub prune: f64,
    /// Largest entries kept per column
    pub max_per_column: usize,
    pub max_iter: usize,
    /// Largest column change (L1) accepted as converged
    pub tolerance: f64,
}

impl Default for MclParams {
    fn default() -> Self {
        Self {
            inflation: 1.2,
            prune: 1e-5,
            max_per_column: 1000,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

impl MclParams {
    pub fn with_inflation(inflation: f64) -> Self {
        Self {
            inflation,
            ..Self::default()
        }
    }
}

/// Clusters of node indices, each sorted, ordered by smallest member.
/// Nodes without edges are left out.
pub fn cluster(graph: &SimilarityGraph, params: &MclParams, pool: &WorkerPool) -> Vec<Vec<usize>> {
    let mut matrix = initial_matrix(graph);

    for iter in 0..params.max_iter {
        let next = pool.install(|| {
            (0..matrix.len())
                .into_par_iter()
                .map(|j| {
                    let mut col = expand_column(&matrix, j);
                    inflate(&mut col, params);
                    col
                })
                .collect::<Vec<Column>>()
        });

        let change = matrix
            .iter()
            .zip(&next)
            .map(|(old, new)| column_distance(old, new))
            .fold(0.0, f64::max);
        matrix = next;

        log::debug!("MCL iteration {}: change {:.3e}", iter + 1, change);
        if change < params.tolerance {
            break;
        }
    }

    interpret(&matrix)
}

/// Column-stochastic matrix with a self-loop of the column maximum.
fn initial_matrix(graph: &SimilarityGraph) -> Vec<Column> {
    graph
        .rows()
        .iter()
        .enumerate()
        .map(|(j, row)| {
            if row.is_empty() {
                return Vec::new();
            }
            let max = row.iter().map(|&(_, w)| w).fold(0.0, f64::max);
            let mut col: Column = row.iter().copied().filter(|&(i, _)| i != j).collect();
            let pos = col.partition_point(|&(i, _)| i < j);
            col.insert(pos, (j, if max > 0.0 { max } else { 1.0 }));
            normalize(&mut col);
            col
        })
        .collect()
}

fn expand_column(matrix: &[Column], j: usize) -> Column {
    let mut acc: HashMap<usize, f64> = HashMap::new();
    for &(k, m_kj) in &matrix[j] {
        for &(i, m_ik) in &matrix[k] {
            *acc.entry(i).or_insert(0.0) += m_ik * m_kj;
        }
    }
    let mut col: Column = acc.into_iter().collect();
    col.sort_by_key(|&(i, _)| i);
    col
}

/// Power, normalise, prune, normalise again.
fn inflate(col: &mut Column, params: &MclParams) {
    for entry in col.iter_mut() {
        entry.1 = entry.1.powf(params.inflation);
    }
    normalize(col);

    col.retain(|&(_, v)| v >= params.prune);
    if col.len() > params.max_per_column {
        // largest values first, lower row on ties
        col.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        col.truncate(params.max_per_column);
        col.sort_by_key(|&(i, _)| i);
    }
    normalize(col);
}

fn normalize(col: &mut Column) {
    let sum: f64 = col.iter().map(|&(_, v)| v).sum();
    if sum > 0.0 {
        for entry in col.iter_mut() {
            entry.1 /= sum;
        }
    }
}

/// L1 distance of two sorted sparse columns
fn column_distance(a: &Column, b: &Column) -> f64 {
    let (mut x, mut y) = (0, 0);
    let mut dist = 0.0;
    while x < a.len() || y < b.len() {
        match (a.get(x), b.get(y)) {
            (Some(&(i, u)), Some(&(k, v))) if i == k => {
                dist += (u - v).abs();
                x += 1;
                y += 1;
            }
            (Some(&(i, u)), Some(&(k, _))) if i < k => {
                dist += u.abs();
                x += 1;
            }
            (Some(&(_, u)), None) => {
                dist += u.abs();
                x += 1;
            }
            (_, Some(&(_, v))) => {
                dist += v.abs();
                y += 1;
            }
            (None, None) => break,
        }
    }
    dist
}

/// Nodes sharing mass in the converged matrix fall in one cluster.
fn interpret(matrix: &[Column]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(matrix.len());
    for (j, col) in matrix.iter().enumerate() {
        for &(i, v) in col {
            if v > 0.0 {
                uf.union(i, j);
            }
        }
    }

    let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for (node, col) in matrix.iter().enumerate() {
        if col.is_empty() {
            continue;
        }
        groups.entry(uf.find(node)).or_default().push(node);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_triangles(bridge: f64) -> SimilarityGraph {
        let mut rows = vec![Vec::new(); 7];
        let mut link = |a: usize, b: usize, w: f64| {
            rows[a].push((b, w));
            rows[b].push((a, w));
        };
        link(0, 1, 100.0);
        link(0, 2, 100.0);
        link(1, 2, 100.0);
        link(3, 4, 100.0);
        link(3, 5, 100.0);
        link(4, 5, 100.0);
        if bridge > 0.0 {
            link(2, 3, bridge);
        }
        for row in &mut rows {
            row.sort_by_key(|&(c, _)| c);
        }
        SimilarityGraph::from_rows(rows)
    }

    #[test]
    fn separates_weakly_bridged_groups() {
        let pool = WorkerPool::new(2).unwrap();
        let graph = two_triangles(1.0);
        let clusters = cluster(&graph, &MclParams::with_inflation(2.0), &pool);
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn isolated_nodes_are_not_clustered() {
        let pool = WorkerPool::new(1).unwrap();
        let graph = two_triangles(0.0);
        let clusters = cluster(&graph, &MclParams::default(), &pool);
        let clustered: usize = clusters.iter().map(|c| c.len()).sum();
        assert_eq!(clustered, 6);
        assert!(clusters.iter().all(|c| !c.contains(&6)));
    }

    #[test]
    fn columns_stay_stochastic() {
        let graph = two_triangles(5.0);
        let matrix = initial_matrix(&graph);
        for col in matrix.iter().filter(|c| !c.is_empty()) {
            let sum: f64 = col.iter().map(|&(_, v)| v).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        }

        let mut col = expand_column(&matrix, 2);
        inflate(&mut col, &MclParams::default());
        let sum: f64 = col.iter().map(|&(_, v)| v).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pruning_keeps_the_largest_entries() {
        let params = MclParams {
            max_per_column: 2,
            ..MclParams::with_inflation(1.0001)
        };
        let mut col = vec![(0, 0.1), (1, 0.5), (2, 0.4)];
        inflate(&mut col, &params);
        assert_eq!(col.iter().map(|&(i, _)| i).collect::<Vec<_>>(), vec![1, 2]);
    }
}
