//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `analyze`: Parse a directory and report what it defines
//! - `deps`: Export the dependency listing as a graph
//! - `ask`: Ask the local model a question, with directory context
//! - `review`: Ask the local model to review a directory
//! - `fix`: Ask the local model to fix an issue in one file
//! - `lint`: Check a directory against Terraform best practices
//! - `interactive`: Question/answer session (the default without a command)
//! - `status`: Check the model server and list its models
//! - `init`: Create an example configuration file
//! - `validate`: Validate a configuration file
//!
//! # Example Usage
//!
//! ```bash
//! # Analyze the root module in ./infra
//! tfagent analyze ./infra
//!
//! # Include nested modules, JSON output
//! tfagent analyze ./infra --recursive --format json --output report.json
//!
//! # Dependency graph
//! tfagent deps ./infra --format dot --output deps.dot
//!
//! # Ask with context
//! tfagent ask "Why does my firewall depend on the VPC?" --dir ./infra
//!
//! # Review with a different model
//! tfagent review ./infra --model llama3:8b
//!
//! # Best-practice checks, failing on warnings
//! tfagent lint ./infra --strict
//!
//! # Interactive session over ./infra
//! tfagent interactive --dir ./infra
//! ```

use crate::types::{GraphFormat, ReportFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tfagent - Terraform configuration analyzer and local-model assistant.
#[derive(Parser, Debug)]
#[command(
    name = "tfagent",
    author,
    version,
    about = "Terraform configuration analyzer and local-model assistant",
    long_about = "tfagent parses Terraform HCL files, extracts resources, variables, outputs, \
                  locals, providers and modules, lists the references between them, and can \
                  ask a local Ollama model questions about the configuration."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "TFAGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run; an interactive session when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a directory and report its configuration
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),

    /// Export the dependency listing as a graph
    #[command(visible_alias = "d")]
    Deps(DepsArgs),

    /// Ask the local model a question
    Ask(AskArgs),

    /// Ask the local model to review a directory
    Review(ReviewArgs),

    /// Ask the local model to fix an issue in one file
    Fix(FixArgs),

    /// Check a directory against Terraform best practices
    #[command(visible_alias = "l")]
    Lint(LintArgs),

    /// Start an interactive question/answer session
    #[command(visible_alias = "i")]
    Interactive(InteractiveArgs),

    /// Check the model server and list available models
    Status,

    /// Create an example configuration file
    Init,

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Directory scanning options shared by the commands that read files.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Walk subdirectories instead of only the root module
    #[arg(short, long)]
    pub recursive: bool,

    /// File or directory names to skip (glob patterns)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Maximum depth for recursive scanning
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,
}

/// Arguments for the analyze command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing Terraform files
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: ReportFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Treat warnings as errors (exit code 1)
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Arguments for the deps command.
#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Directory containing Terraform files
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Output format for the graph
    #[arg(short, long, default_value = "dot", value_enum)]
    pub format: GraphFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Directory whose configuration is sent along as context
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Model to use instead of the configured one (name:tag)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the review command.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Directory to review
    #[arg(value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Model to use instead of the configured one (name:tag)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the fix command.
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Terraform file to fix
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Description of the issue
    #[arg(value_name = "ISSUE")]
    pub issue: String,

    /// Model to use instead of the configured one (name:tag)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the lint command.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Directory containing Terraform files
    #[arg(value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: ReportFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Treat warnings as errors (exit code 1)
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Arguments for the interactive command.
#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Directory whose configuration is sent along with each question
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Model to use instead of the configured one (name:tag)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(value_name = "FILE", default_value = "tfagent.yaml")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_command() {
        let cli = Cli::parse_from(["tfagent", "analyze", "./infra"]);
        match cli.command.unwrap() {
            Commands::Analyze(args) => {
                assert_eq!(args.path, PathBuf::from("./infra"));
                assert_eq!(args.format, ReportFormat::Text);
                assert!(!args.scan.recursive);
                assert!(!args.strict);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_with_options() {
        let cli = Cli::parse_from([
            "tfagent",
            "analyze",
            "./infra",
            "--format",
            "json",
            "--output",
            "report.json",
            "--recursive",
            "--exclude",
            "legacy_*.tf",
            "--exclude",
            "scratch",
            "--strict",
        ]);
        match cli.command.unwrap() {
            Commands::Analyze(args) => {
                assert_eq!(args.format, ReportFormat::Json);
                assert_eq!(args.output, Some(PathBuf::from("report.json")));
                assert!(args.scan.recursive);
                assert_eq!(args.scan.exclude_patterns, vec!["legacy_*.tf", "scratch"]);
                assert!(args.strict);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_deps_command() {
        let cli = Cli::parse_from(["tfagent", "deps", "./infra", "--format", "mermaid", "-r"]);
        match cli.command.unwrap() {
            Commands::Deps(args) => {
                assert_eq!(args.format, GraphFormat::Mermaid);
                assert!(args.scan.recursive);
            }
            _ => panic!("Expected Deps command"),
        }
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from([
            "tfagent",
            "ask",
            "What does this module do?",
            "--dir",
            "./infra",
            "--model",
            "llama3:8b",
        ]);
        match cli.command.unwrap() {
            Commands::Ask(args) => {
                assert_eq!(args.query, "What does this module do?");
                assert_eq!(args.dir, Some(PathBuf::from("./infra")));
                assert_eq!(args.model.as_deref(), Some("llama3:8b"));
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_review_defaults_to_current_dir() {
        let cli = Cli::parse_from(["tfagent", "review"]);
        match cli.command.unwrap() {
            Commands::Review(args) => {
                assert_eq!(args.path, PathBuf::from("."));
                assert!(args.model.is_none());
            }
            _ => panic!("Expected Review command"),
        }
    }

    #[test]
    fn test_simple_commands() {
        assert!(matches!(Cli::parse_from(["tfagent", "init"]).command, Some(Commands::Init)));
        assert!(matches!(Cli::parse_from(["tfagent", "status"]).command, Some(Commands::Status)));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["tfagent", "validate", "custom.yaml"]);
        match cli.command.unwrap() {
            Commands::Validate(args) => {
                assert_eq!(args.file, PathBuf::from("custom.yaml"));
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from([
            "tfagent",
            "-vvv",
            "--config",
            "custom.yaml",
            "analyze",
            "./infra",
        ]);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn test_no_command_means_interactive() {
        let cli = Cli::parse_from(["tfagent", "-v"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_interactive_command() {
        let cli = Cli::parse_from(["tfagent", "i", "--dir", "./infra", "-m", "llama3:8b"]);
        match cli.command.unwrap() {
            Commands::Interactive(args) => {
                assert_eq!(args.dir, PathBuf::from("./infra"));
                assert_eq!(args.model.as_deref(), Some("llama3:8b"));
            }
            _ => panic!("Expected Interactive command"),
        }
    }

    #[test]
    fn test_fix_command() {
        let cli = Cli::parse_from(["tfagent", "fix", "main.tf", "bucket has no tags"]);
        match cli.command.unwrap() {
            Commands::Fix(args) => {
                assert_eq!(args.file, PathBuf::from("main.tf"));
                assert_eq!(args.issue, "bucket has no tags");
            }
            _ => panic!("Expected Fix command"),
        }
    }

    #[test]
    fn test_lint_command() {
        let cli = Cli::parse_from(["tfagent", "lint", "--strict", "--format", "json"]);
        match cli.command.unwrap() {
            Commands::Lint(args) => {
                assert_eq!(args.path, PathBuf::from("."));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(args.strict);
            }
            _ => panic!("Expected Lint command"),
        }
    }

    #[test]
    fn test_alias() {
        let cli = Cli::parse_from(["tfagent", "a", "./infra"]);
        assert!(matches!(cli.command, Some(Commands::Analyze(_))));
    }
}
