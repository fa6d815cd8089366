use clap::ArgMatches;
use std::path::PathBuf;

/// How orthogroups are numbered after clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OgOrder {
    /// Largest first, ties by smallest member
    Size,
    /// Order in which clusters were found
    Insertion,
}

impl std::str::FromStr for OgOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" => Ok(OgOrder::Size),
            "insertion" => Ok(OgOrder::Insertion),
            _ => Err(format!("unknown orthogroup order `{}`", s)),
        }
    }
}

/// Run settings, built once from the command line and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub threads: usize,
    pub inflation: f64,
    pub og_order: OgOrder,
    /// Orthogroups smaller than this use the closed forms instead of a gene tree
    pub min_seq: usize,
    /// Support threshold for the duplication summaries
    pub dup_support: f64,
    /// Cut child clades of speciation nodes at duplications of at least `dup_support`
    pub split_paralogous_clades: bool,
    pub fewer_open_files: bool,
    pub hog_trees: bool,
    pub outdir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 1,
            inflation: 1.2,
            og_order: OgOrder::Size,
            min_seq: 4,
            dup_support: 0.5,
            split_paralogous_clades: false,
            fewer_open_files: false,
            hog_trees: false,
            outdir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Reads the options a subcommand defines; the others keep their defaults.
    pub fn from_args(args: &ArgMatches) -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Some(&threads) = args.try_get_one::<usize>("parallel").ok().flatten() {
            config.threads = threads.max(1);
        }
        if let Some(&inflation) = args.try_get_one::<f64>("inflation").ok().flatten() {
            if inflation <= 1.0 {
                anyhow::bail!("inflation must be greater than 1, got {}", inflation);
            }
            config.inflation = inflation;
        }
        if let Some(order) = args.try_get_one::<String>("order").ok().flatten() {
            config.og_order = order.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(&min_seq) = args.try_get_one::<usize>("min_seq").ok().flatten() {
            config.min_seq = min_seq.max(2);
        }
        if let Some(outdir) = args.try_get_one::<String>("outdir").ok().flatten() {
            config.outdir = PathBuf::from(outdir);
        }
        if let Ok(Some(&flag)) = args.try_get_one::<bool>("fewer_open_files") {
            config.fewer_open_files = flag;
        }
        if let Ok(Some(&flag)) = args.try_get_one::<bool>("split_paralogous_clades") {
            config.split_paralogous_clades = flag;
        }
        if let Ok(Some(&flag)) = args.try_get_one::<bool>("hog_trees") {
            config.hog_trees = flag;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{value_parser, Arg, ArgAction, Command};

    fn command() -> Command {
        Command::new("t")
            .arg(
                Arg::new("parallel")
                    .long("parallel")
                    .value_parser(value_parser!(usize))
                    .default_value("1"),
            )
            .arg(
                Arg::new("inflation")
                    .long("inflation")
                    .value_parser(value_parser!(f64))
                    .default_value("1.2"),
            )
            .arg(
                Arg::new("fewer_open_files")
                    .long("fewer-open-files")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("split_paralogous_clades")
                    .long("split-paralogous-clades")
                    .action(ArgAction::SetTrue),
            )
    }

    #[test]
    fn config_from_partial_args() {
        let matches = command()
            .try_get_matches_from(["t", "--parallel", "4", "--fewer-open-files"])
            .unwrap();
        let config = Config::from_args(&matches).unwrap();
        assert_eq!(config.threads, 4);
        assert!(config.fewer_open_files);
        assert!(!config.split_paralogous_clades);
        assert_eq!(config.og_order, OgOrder::Size);
        assert_eq!(config.min_seq, 4);
    }

    #[test]
    fn config_split_paralogous_clades() {
        let matches = command()
            .try_get_matches_from(["t", "--split-paralogous-clades"])
            .unwrap();
        let config = Config::from_args(&matches).unwrap();
        assert!(config.split_paralogous_clades);
        assert_eq!(config.dup_support, 0.5);
    }

    #[test]
    fn config_rejects_low_inflation() {
        let matches = command()
            .try_get_matches_from(["t", "--inflation", "0.9"])
            .unwrap();
        assert!(Config::from_args(&matches).is_err());
    }
}
