//! Subcommand modules for the `orthotree` binary.

pub mod cluster;
pub mod graph;
pub mod hog_trees;
pub mod mcl;
pub mod recon;
pub mod root;
pub mod run;
pub mod stats;

use clap::*;

pub fn arg_parallel() -> Arg {
    Arg::new("parallel")
        .long("parallel")
        .short('p')
        .value_parser(value_parser!(usize))
        .num_args(1)
        .default_value("1")
        .help("Number of threads for parallel processing")
}

pub fn arg_outdir(default: &'static str) -> Arg {
    Arg::new("outdir")
        .long("outdir")
        .short('o')
        .num_args(1)
        .default_value(default)
        .help("Output directory")
}
