pub mod config;
pub mod error;
pub mod gene_tree;
pub mod graph;
pub mod hog;
pub mod ids;
pub mod io;
pub mod matrix;
pub mod mcl;
pub mod orthogroups;
pub mod orthologs;
pub mod phylo;
pub mod pool;
pub mod recon;
pub mod species_tree;
pub mod stats;
pub mod stride;
