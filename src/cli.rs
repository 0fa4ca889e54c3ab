use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::Source;

#[derive(Parser, Debug)]
#[command(
    name = "breach_index",
    about = "Aggregates public breach listings into one normalized index",
    version
)]
pub struct Cli {
    /// Log at debug level. RUST_LOG overrides this.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dataset directory. Overrides BREACH_INDEX_OUTPUT_DIR.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scrape live sources, write datasets and regenerate the summary (default).
    Scrape {
        /// Only scrape these sources (canonical name or alias, repeatable).
        #[arg(long, value_name = "SOURCE")]
        only: Vec<Source>,

        /// Skip these sources.
        #[arg(long, value_name = "SOURCE")]
        skip: Vec<Source>,
    },

    /// Regenerate README.md from the datasets already on disk.
    Table {
        #[arg(long)]
        template: Option<PathBuf>,

        #[arg(long)]
        readme: Option<PathBuf>,
    },

    /// Convert the Vigilante.pw CSV export into a JSON dataset.
    Convert {
        #[arg(long)]
        input: PathBuf,
    },

    /// List the sources and their canonical names.
    Sources,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Scrape {
            only: Vec::new(),
            skip: Vec::new(),
        })
    }
}

/// Live sources left after applying `--only` and `--skip`, in catalog order.
pub fn select_sources(only: &[Source], skip: &[Source]) -> Vec<Source> {
    Source::LIVE
        .iter()
        .copied()
        .filter(|s| only.is_empty() || only.contains(s))
        .filter(|s| !skip.contains(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_scrape() {
        let cli = Cli::parse_from(["breach_index"]);
        assert_eq!(
            cli.command(),
            Command::Scrape {
                only: vec![],
                skip: vec![]
            }
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_only_accepts_aliases() {
        let cli = Cli::parse_from(["breach_index", "-v", "scrape", "--only", "hibp", "--only", "Leak-Lookup"]);
        assert!(cli.verbose);
        match cli.command() {
            Command::Scrape { only, .. } => {
                assert_eq!(only, vec![Source::HaveIBeenPwned, Source::LeakLookup])
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        assert!(Cli::try_parse_from(["breach_index", "scrape", "--only", "pastebin"]).is_err());
    }

    #[test]
    fn test_global_output_dir_after_subcommand() {
        let cli = Cli::parse_from(["breach_index", "table", "--output-dir", "/tmp/ds"]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/ds")));
    }

    #[test]
    fn test_select_sources() {
        let all = select_sources(&[], &[]);
        assert_eq!(all, Source::LIVE.to_vec());

        let picked = select_sources(&[Source::Hashmob, Source::HaveIBeenPwned], &[Source::Hashmob]);
        assert_eq!(picked, vec![Source::HaveIBeenPwned]);
    }
}
