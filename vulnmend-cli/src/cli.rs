//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Vulnmend -- dependency vulnerability remediation tool.
///
/// Use `vulnmend <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "vulnmend", version, about, long_about = None)]
pub struct Cli {
    /// Path to the vulnmend.toml configuration file.
    #[arg(short, long, default_value = "vulnmend.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run remediation for configured repositories.
    Run(RunArgs),

    /// List configured repositories.
    Repos,

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Run remediation sequentially, one repository at a time.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run only this repository (default: all configured repositories).
    #[arg(long)]
    pub repo: Option<String>,
}

/// Manage vulnmend configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scan, publish, metrics, repos).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_all() {
        let args = Cli::try_parse_from(["vulnmend", "run"]);
        assert!(args.is_ok(), "should parse 'run' subcommand");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Run(run_args) => {
                assert!(run_args.repo.is_none(), "repo filter should default to None");
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_single_repo() {
        let args = Cli::try_parse_from(["vulnmend", "run", "--repo", "demo-app"]);
        assert!(args.is_ok(), "should parse run with repo filter");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.repo, Some("demo-app".to_owned()));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_repos() {
        let args = Cli::try_parse_from(["vulnmend", "repos"]);
        assert!(args.is_ok(), "should parse 'repos' subcommand");
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let args = Cli::try_parse_from(["vulnmend", "config", "validate"]);
        assert!(args.is_ok(), "should parse 'config validate' subcommand");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Validate => {}
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let args = Cli::try_parse_from(["vulnmend", "config", "show", "--section", "publish"]);
        assert!(args.is_ok(), "should parse config show with section");
        let cli = args.expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("publish".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_custom_config_path() {
        let args = Cli::try_parse_from(["vulnmend", "-c", "/custom/config.toml", "repos"]);
        assert!(args.is_ok(), "should parse with custom config path");
        let cli = args.expect("parse succeeded");
        assert_eq!(cli.config, std::path::PathBuf::from("/custom/config.toml"));
    }

    #[test]
    fn test_cli_parse_log_level() {
        let args = Cli::try_parse_from(["vulnmend", "--log-level", "debug", "repos"]);
        assert!(args.is_ok(), "should parse with custom log level");
        let cli = args.expect("parse succeeded");
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["vulnmend"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "vulnmend");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"run"), "should have 'run' subcommand");
        assert!(
            subcommands.contains(&"repos"),
            "should have 'repos' subcommand"
        );
        assert!(
            subcommands.contains(&"config"),
            "should have 'config' subcommand"
        );
    }
}
