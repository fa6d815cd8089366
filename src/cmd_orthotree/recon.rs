use clap::*;
use orthotree::libs::config::Config;
use orthotree::libs::hog;
use orthotree::libs::ids::{load_workdir, SequenceMap, SpeciesMap};
use orthotree::libs::orthogroups::Orthogroups;
use orthotree::libs::orthologs::OrthologFiles;
use orthotree::libs::pool::WorkerPool;
use orthotree::libs::recon::{self, Reconciler};
use orthotree::libs::species_tree::SpeciesTree;
use orthotree::libs::stats::{self, OrthologStats};
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("recon")
        .about("Reconciles gene trees with the species tree: orthologs, duplications, HOGs")
        .after_help(
            r###"
Labels every gene tree node as a speciation or a duplication by species
overlap and reads orthologs, gene duplications and hierarchical
orthogroups (HOGs) off the labelled trees.

Notes:
* The species tree is rooted, with species names as leaves. It is checked
  for missing, extra and duplicated species before any work starts.
* Orthogroups come from Orthogroups_SequenceIDs.txt (`orthotree cluster`).
* Orthogroups of 2 or 3 genes are resolved without a tree. Larger ones
  need `OG0000042_tree.txt` in the gene tree directory; unrooted trees are
  rooted to minimise duplications. A missing or mismatched tree skips the
  orthogroup with a warning.
* Outputs, under the output directory:
    * Orthologues/Orthologues_{A}/{A}__v__{B}.tsv, or Orthologues/{A}.tsv
      with `--fewer-open-files`
    * Gene_Duplication_Events/Duplications.tsv
    * Phylogenetic_Hierarchical_Orthogroups/N{k}.tsv
    * Resolved_Gene_Trees/OG0000042_tree.txt
    * Resolved_HOG_Trees/{HOG}_tree.txt with `--hog-trees`
    * Comparative_Genomics_Statistics/OrthologuesStats_*.tsv and duplication summaries

Examples:
1. Reconcile with a rooted species tree:
   orthotree recon WorkingDirectory --species-tree SpeciesTree_rooted.txt \
       --orthogroups Results/Orthogroups/Orthogroups_SequenceIDs.txt \
       --gene-trees Gene_Trees -o Results

2. One ortholog file per species, with HOG trees:
   orthotree recon WorkingDirectory --species-tree tree.nwk --orthogroups OGs.txt \
       --gene-trees Gene_Trees --fewer-open-files --hog-trees -p 4

"###,
        )
        .arg(
            Arg::new("workdir")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Working directory with the ID maps"),
        )
        .arg(
            Arg::new("species_tree")
                .long("species-tree")
                .num_args(1)
                .required(true)
                .help("Rooted species tree, leaves are species names"),
        )
        .arg(
            Arg::new("orthogroups")
                .long("orthogroups")
                .num_args(1)
                .required(true)
                .help("Orthogroups_SequenceIDs.txt"),
        )
        .arg(
            Arg::new("gene_trees")
                .long("gene-trees")
                .num_args(1)
                .required(true)
                .help("Directory of gene trees"),
        )
        .arg(
            Arg::new("fewer_open_files")
                .long("fewer-open-files")
                .action(ArgAction::SetTrue)
                .help("One ortholog file per species instead of one per species pair"),
        )
        .arg(
            Arg::new("min_seq")
                .long("min-seq")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Smallest orthogroup analysed with a gene tree"),
        )
        .arg(
            Arg::new("split_paralogous_clades")
                .long("split-paralogous-clades")
                .action(ArgAction::SetTrue)
                .help("Split paralogous clades below speciation nodes into separate ortholog groups"),
        )
        .arg(
            Arg::new("hog_trees")
                .long("hog-trees")
                .action(ArgAction::SetTrue)
                .help("Also write the gene tree of every HOG"),
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
    let pool = WorkerPool::new(config.threads)?;

    //----------------------------
    // Ops
    //----------------------------
    let (species, seqs) = load_workdir(workdir)?;
    let species_tree =
        SpeciesTree::from_file(args.get_one::<String>("species_tree").unwrap(), &species)?;
    let ogs = Orthogroups::from_file(args.get_one::<String>("orthogroups").unwrap())?;

    run(&species, &seqs, &species_tree, &ogs, gene_trees, &config, &pool)?;

    Ok(())
}

/// Every reconciliation output and its statistics.
pub fn run(
    species: &SpeciesMap,
    seqs: &SequenceMap,
    species_tree: &SpeciesTree,
    ogs: &Orthogroups,
    gene_trees: &Path,
    config: &Config,
    pool: &WorkerPool,
) -> anyhow::Result<()> {
    let outdir = &config.outdir;
    let stats_dir = outdir.join("Comparative_Genomics_Statistics");
    let dup_file = outdir
        .join("Gene_Duplication_Events")
        .join("Duplications.tsv");
    let resolved_dir = outdir.join("Resolved_Gene_Trees");
    let hog_dir = outdir.join("Phylogenetic_Hierarchical_Orthogroups");
    orthotree::libs::io::create_dir(&resolved_dir)?;

    // fixed before any worker starts
    let files = OrthologFiles::new(&outdir.join("Orthologues"), species, config.fewer_open_files);

    let species_dir = outdir.join("Species_Tree");
    orthotree::libs::io::write_file(
        &species_dir.join("SpeciesTree_rooted.txt"),
        &format!("{}\n", species_tree.to_newick_names(species)),
    )?;
    orthotree::libs::io::write_file(
        &species_dir.join("SpeciesTree_rooted_node_labels.txt"),
        &format!("{}\n", species_tree.to_newick_labelled(species)),
    )?;

    let reconciler = Reconciler {
        species_tree,
        seqs,
        config,
        gene_tree_dir: gene_trees,
        resolved_dir: Some(&resolved_dir),
    };
    let results = reconciler.reconcile_all(ogs, pool)?;

    //----------------------------
    // Orthologs
    //----------------------------
    let calls: Vec<(usize, recon::OrthologCall)> = results
        .iter()
        .flat_map(|(&og, r)| r.calls().into_iter().map(move |c| (og, c)))
        .collect();
    files.write(calls.iter().map(|(og, c)| (*og, c)), seqs)?;

    let mut ortholog_stats = OrthologStats::new(species.len());
    for (_, call) in &calls {
        ortholog_stats.add(call);
    }
    ortholog_stats.write(&stats_dir, species)?;

    //----------------------------
    // Duplications and HOGs
    //----------------------------
    let table = recon::duplications_table(&results, species_tree, species, seqs)?;
    orthotree::libs::io::write_file(&dup_file, &table)?;

    let entries = results.into_values().flat_map(|r| r.hogs).collect();
    let n_hogs = hog::write_tables(entries, species_tree, species, seqs, &hog_dir)?;
    log::info!("{} HOGs written to {}", n_hogs, hog_dir.display());

    if !stats::write_duplication_stats(
        &dup_file,
        species_tree,
        species,
        config.dup_support,
        Some(ogs.len()),
        &stats_dir,
    )? {
        log::warn!("{}: duplication statistics skipped", dup_file.display());
    }

    if config.hog_trees {
        let n = hog::write_hog_trees(&hog_dir, &resolved_dir, &outdir.join("Resolved_HOG_Trees"), pool)?;
        log::info!("{} HOG trees written", n);
    }

    Ok(())
}
