use anyhow::Context;
use clap::*;
use orthotree::libs::ids::SpeciesMap;
use orthotree::libs::phylo::Tree;
use orthotree::libs::species_tree::SpeciesTree;
use orthotree::libs::stats;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("stats")
        .about("Summarises gene duplications per species tree node and per orthogroup")
        .after_help(
            r###"
Counts the events of a Duplications.tsv table.

Notes:
* The species tree is the rooted tree of the run, leaves are species names
  (e.g. SpeciesTree_rooted_node_labels.txt); internal nodes are relabelled
  N0, N1, ... in pre-order, as in the duplication table.
* Outputs:
    * Duplications_per_Species_Tree_Node.tsv
    * Duplications_per_Orthogroup.tsv
    * SpeciesTree_Gene_Duplications_{support}_Support.txt - node names
      suffixed with the number of well-supported duplications
* A missing or malformed table produces no output.

Examples:
1. orthotree stats Results/Gene_Duplication_Events/Duplications.tsv \
       --species-tree Results/Species_Tree/SpeciesTree_rooted_node_labels.txt -o stats

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Duplications.tsv"),
        )
        .arg(
            Arg::new("species_tree")
                .long("species-tree")
                .num_args(1)
                .required(true)
                .help("Rooted species tree, leaves are species names"),
        )
        .arg(
            Arg::new("support")
                .long("support")
                .num_args(1)
                .default_value("0.5")
                .value_parser(value_parser!(f64))
                .help("Support threshold of well-supported duplications"),
        )
        .arg(super::arg_outdir("."))
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = Path::new(args.get_one::<String>("infile").unwrap());
    let tree_file = args.get_one::<String>("species_tree").unwrap();
    let support = *args.get_one::<f64>("support").unwrap();
    let outdir = Path::new(args.get_one::<String>("outdir").unwrap());

    //----------------------------
    // Ops
    //----------------------------
    let text = orthotree::libs::io::read_to_string(tree_file)?;
    let names: Vec<String> = Tree::from_newick(&text)
        .with_context(|| format!("cannot parse species tree {}", tree_file))?
        .get_leaf_names()
        .into_iter()
        .flatten()
        .collect();
    let species = SpeciesMap::from_names(names);
    let species_tree = SpeciesTree::from_names(&text, tree_file, &species)?;

    orthotree::libs::io::create_dir(outdir)?;
    if !stats::write_duplication_stats(infile, &species_tree, &species, support, None, outdir)? {
        log::warn!("{}: not a duplication table, nothing written", infile.display());
    }

    Ok(())
}
