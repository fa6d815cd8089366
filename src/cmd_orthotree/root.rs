use clap::*;
use orthotree::libs::config::Config;
use orthotree::libs::ids::{load_workdir, SpeciesMap};
use orthotree::libs::phylo::Tree;
use orthotree::libs::pool::WorkerPool;
use orthotree::libs::species_tree::{self, SpeciesTree};
use orthotree::libs::stride;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("root")
        .about("Roots the species tree with gene duplication events (STRIDE)")
        .after_help(
            r###"
Roots an unrooted species tree on the edge most consistent with the
well-supported duplications seen in the gene trees.

Notes:
* The species tree leaves are species IDs (0, 1, ...).
* Gene trees are `OG0000042_tree.txt` files; trees of fewer than four genes
  are ignored. Unreadable trees are skipped with a warning.
* A duplication is well supported when both sides hold the same species
  and some species lies outside them.
* Every edge is scored; the best ones are all written:
    * Species_Tree/SpeciesTree_rooted.txt              - first best root, names
    * Species_Tree/SpeciesTree_rooted_ids.txt          - same, IDs
    * Species_Tree/SpeciesTree_rooted_node_labels.txt  - same, with N0, N1, ...
    * Species_Tree/SpeciesTree_rooted_at_outgroup_{k}.txt
    * Species_Tree/STRIDE_Roots.tsv                    - every candidate
* With two species the tree is known and `--tree` may be omitted.

Examples:
1. Root with the gene trees of a run:
   orthotree root WorkingDirectory --tree SpeciesTree_unrooted.txt --gene-trees Gene_Trees -o Results

"###,
        )
        .arg(
            Arg::new("workdir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Working directory with SpeciesIDs.txt"),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .num_args(1)
                .help("Unrooted species tree, leaves are species IDs"),
        )
        .arg(
            Arg::new("gene_trees")
                .long("gene-trees")
                .num_args(1)
                .required(true)
                .help("Directory of gene trees"),
        )
        .arg(super::arg_outdir("Results"))
        .arg(super::arg_parallel())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let config = Config::from_args(args)?;
    let workdir = Path::new(args.get_one::<String>("workdir").unwrap());
    let gene_trees = Path::new(args.get_one::<String>("gene_trees").unwrap());
    let tree_file = args.get_one::<String>("tree").map(|s| s.as_str());
    let pool = WorkerPool::new(config.threads)?;

    //----------------------------
    // Ops
    //----------------------------
    let (species, _) = load_workdir(workdir)?;
    let unrooted = unrooted_tree(&species, tree_file)?;
    run(&species, &unrooted, gene_trees, &config, &pool)?;

    Ok(())
}

/// The unrooted species tree of `--tree`, validated against `species`.
/// Without a file only two species can be rooted.
pub fn unrooted_tree(species: &SpeciesMap, tree_file: Option<&str>) -> anyhow::Result<Tree> {
    let n_species = species.len();
    match tree_file {
        Some(infile) => Ok(species_tree::read_unrooted(infile, n_species)?),
        None if n_species == 2 => Ok(Tree::from_newick("(0,1);")?),
        None => anyhow::bail!("an unrooted species tree (--tree) is needed for {} species", n_species),
    }
}

/// Roots the tree and writes `Species_Tree/`. Returns the tree to analyse.
pub fn run(
    species: &SpeciesMap,
    unrooted: &Tree,
    gene_trees: &Path,
    config: &Config,
    pool: &WorkerPool,
) -> anyhow::Result<SpeciesTree> {
    let n_species = species.len();
    let evidence = if n_species > 2 {
        stride::gather_evidence(gene_trees, n_species, pool)?
    } else {
        stride::Evidence::new()
    };

    let rooting = stride::root(unrooted, n_species, &evidence)?;
    stride::write_results(&rooting, &config.outdir.join("Species_Tree"), species)?;

    rooting
        .species_tree()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no rooted species tree"))
}
