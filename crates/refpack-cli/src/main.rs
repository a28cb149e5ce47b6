//! refpack - pack loose git refs into `packed-refs`.

use clap::Parser;
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use config::Config;
use logging::LogFormat;

/// Exit status for fatal errors.
const EXIT_FATAL: i32 = 128;

/// Pack refs into a single packed-refs file and prune the loose copies.
///
/// Annotated tags are peeled from loose objects only; objects stored in
/// packfiles are not read.
#[derive(Parser, Debug)]
#[command(name = "refpack")]
#[command(author, version, about)]
struct Cli {
    /// Path to the git directory
    #[arg(long, env = "GIT_DIR")]
    git_dir: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pack everything, not only tags and already-packed refs
    #[arg(long)]
    all: bool,

    /// Prune loose refs (default)
    #[arg(long, overrides_with = "no_prune")]
    prune: bool,

    /// Keep loose refs after packing them
    #[arg(long, overrides_with = "prune")]
    no_prune: bool,

    /// Milliseconds to wait for packed-refs.lock
    #[arg(long, value_name = "MS")]
    lock_timeout: Option<u64>,

    /// Milliseconds to wait for each loose ref lock while pruning
    #[arg(long, value_name = "MS")]
    ref_lock_timeout: Option<u64>,

    /// Log format: pretty or json
    #[arg(long)]
    log_format: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Applies command-line flags on top of `config`.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(git_dir) = &self.git_dir {
            config.git_dir = git_dir.clone();
        }
        if self.all {
            config.all = true;
        }
        if self.prune {
            config.prune = true;
        }
        if self.no_prune {
            config.prune = false;
        }
        if let Some(ms) = self.lock_timeout {
            config.commit_lock_timeout_ms = ms;
        }
        if let Some(ms) = self.ref_lock_timeout {
            config.ref_lock_timeout_ms = ms;
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        config.log_level = logging::level_for(self.verbose, &config.log_level);
        config
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(config) => cli.apply(config),
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(EXIT_FATAL);
        }
    };

    logging::init_logging(&config.log_level, LogFormat::parse(&config.log_format));

    if let Err(e) = commands::pack(&config) {
        eprintln!("fatal: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(EXIT_FATAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("refpack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--git-dir", "/repo/.git"]).apply(Config::default());
        assert_eq!(config.git_dir, PathBuf::from("/repo/.git"));
        assert!(!config.all);
        assert!(config.prune);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_all_and_no_prune() {
        let config = parse(&["--all", "--no-prune"]).apply(Config::default());
        assert!(config.all);
        assert!(!config.prune);
    }

    #[test]
    fn test_last_prune_flag_wins() {
        let config = parse(&["--no-prune", "--prune"]).apply(Config::default());
        assert!(config.prune);
        let config = parse(&["--prune", "--no-prune"]).apply(Config::default());
        assert!(!config.prune);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = Config {
            prune: false,
            commit_lock_timeout_ms: 10,
            ..Config::default()
        };
        let config = parse(&["--prune", "--lock-timeout", "500", "-vv"]).apply(file);
        assert!(config.prune);
        assert_eq!(config.commit_lock_timeout_ms, 500);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_rejects_unknown_flag() {
        let result = Cli::try_parse_from(["refpack", "--everything"]);
        assert!(result.is_err());
    }
}
