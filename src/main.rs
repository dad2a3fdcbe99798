//! tfagent CLI entry point.
//!
//! This binary provides the command-line interface for tfagent.

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tfagent::agent::{Agent, AgentResponse, Reply, Session};
use tfagent::cli::{Cli, Commands, InteractiveArgs};
use tfagent::graph::{export_graph, DependencyGraph};
use tfagent::model::{ModelClient, OllamaClient};
use tfagent::reporter::Reporter;
use tfagent::{Analysis, Analyzer, Config, LintReport, TfAgentError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("{} {e}", "Error:".red().bold());

            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut i = 0;
                while let Some(cause) = source {
                    eprintln!("  {i}: {cause}");
                    source = cause.source();
                    i += 1;
                }
            }

            // RUST_BACKTRACE=1 shows only frames from this crate
            let backtrace = e.backtrace();
            if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
                eprintln!("\nStack backtrace:");
                let rendered = backtrace.to_string();
                let mut in_tfagent = false;
                for line in rendered.lines() {
                    let trimmed = line.trim();
                    if trimmed.contains("tfagent::") {
                        in_tfagent = true;
                        eprintln!("{line}");
                    } else if in_tfagent && trimmed.starts_with("at ") {
                        eprintln!("{line}");
                        in_tfagent = false;
                    } else {
                        in_tfagent = false;
                    }
                }
            }

            let code = e
                .downcast_ref::<TfAgentError>()
                .map_or(1, TfAgentError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        // RUST_LOG wins over -v
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,tfagent={base_level}"))
        })
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let working_dir = std::env::current_dir()?;
    let mut config = Config::load(cli.config.as_deref(), &working_dir)?;
    tracing::debug!("Configuration loaded successfully");

    let command = cli.command.unwrap_or_else(|| {
        Commands::Interactive(InteractiveArgs {
            dir: ".".into(),
            model: None,
        })
    });

    match command {
        Commands::Analyze(args) => {
            config.merge_cli_args(&args.scan);
            if args.output.is_some() {
                config.output.colored = false;
            }

            let analysis = Analyzer::new(config.clone())
                .analyze_directory(&args.path)
                .await?;

            let report = Reporter::new(&config)
                .with_strict(args.strict)
                .generate(&analysis, args.format)?;
            emit(&report, args.output.as_deref())?;

            let exit_code = if analysis.has_parse_errors() {
                2
            } else if args.strict && !analysis.warnings().is_empty() {
                1
            } else {
                0
            };
            Ok(ExitCode::from(exit_code))
        }

        Commands::Deps(args) => {
            config.merge_cli_args(&args.scan);
            let analysis = Analyzer::new(config).analyze_directory(&args.path).await?;
            report_parse_errors(&analysis);

            let graph = DependencyGraph::from_map(&analysis.dependencies);
            let rendered = export_graph(&graph, args.format)?;
            emit(&rendered, args.output.as_deref())?;

            Ok(ExitCode::from(if analysis.has_parse_errors() { 2 } else { 0 }))
        }

        Commands::Ask(args) => {
            override_model(&mut config, args.model)?;
            let agent = Agent::new(OllamaClient::new(&config.model)?, config.clone());

            let spinner = spinner(&format!("Asking {}...", config.model.name), cli.quiet);
            let result = agent.ask(&args.query, args.dir.as_deref()).await;
            spinner.finish_and_clear();

            println!("{}", result?.text);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Review(args) => {
            override_model(&mut config, args.model)?;
            let agent = Agent::new(OllamaClient::new(&config.model)?, config.clone());

            let spinner = spinner(
                &format!("Reviewing {} with {}...", args.path.display(), config.model.name),
                cli.quiet,
            );
            let result = agent.review(&args.path).await;
            spinner.finish_and_clear();

            let response = result?;
            println!("{}", response.text);
            print_findings(&response);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Fix(args) => {
            override_model(&mut config, args.model)?;
            let agent = Agent::new(OllamaClient::new(&config.model)?, config.clone());

            let spinner = spinner(
                &format!("Asking {} for a fix to {}...", config.model.name, args.file.display()),
                cli.quiet,
            );
            let result = agent.suggest_fix(&args.file, &args.issue).await;
            spinner.finish_and_clear();

            let response = result?;
            println!("{}", response.text);
            if response.code_blocks.is_empty() {
                eprintln!("{} no Terraform code block in the answer", "!".yellow());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Lint(args) => {
            config.merge_cli_args(&args.scan);
            if args.output.is_some() {
                config.output.colored = false;
            }

            let analysis = Analyzer::new(config.clone())
                .analyze_directory(&args.path)
                .await?;
            let report = LintReport::from_analysis(&analysis);

            let rendered = Reporter::new(&config)
                .with_strict(args.strict)
                .generate_lint(&report, args.format)?;
            emit(&rendered, args.output.as_deref())?;

            let exit_code = if !report.all_valid() {
                2
            } else if args.strict && report.count(tfagent::lint::Severity::Warning) > 0 {
                1
            } else {
                0
            };
            Ok(ExitCode::from(exit_code))
        }

        Commands::Interactive(args) => {
            override_model(&mut config, args.model)?;
            let agent = Agent::new(OllamaClient::new(&config.model)?, config.clone());
            interactive(&Session::new(&agent, args.dir), cli.quiet).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Status => {
            let client = OllamaClient::new(&config.model)?;
            if !client.health_check().await {
                return Err(tfagent::err!(ModelUnavailable {
                    host: client.host(),
                    message: "no answer from /api/tags".to_string(),
                })
                .into());
            }

            let models = client.list_models().await?;
            println!("{} Model server at {} is up", "✓".green(), client.host());
            println!("Configured model: {}", config.model.name.bold());
            if models.is_empty() {
                println!("No models installed");
            } else {
                println!("Installed models:");
                for model in &models {
                    let marker = if *model == config.model.name { "*" } else { " " };
                    println!("  {marker} {model}");
                }
            }

            if !models.contains(&config.model.name) {
                println!(
                    "{} '{}' is not installed. Run: ollama pull {}",
                    "!".yellow(),
                    config.model.name,
                    config.model.name
                );
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Init => {
            let config_path = Path::new("tfagent.yaml");

            if config_path.exists() {
                anyhow::bail!("Configuration file already exists: {}", config_path.display());
            }

            std::fs::write(config_path, Config::example_yaml())?;
            println!("Created example configuration: tfagent.yaml");
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate(args) => match Config::from_file(&args.file) {
            Ok(_) => {
                println!("Configuration is valid: {}", args.file.display());
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Configuration error: {e}");
                Ok(ExitCode::from(1))
            }
        },
    }
}

fn override_model(config: &mut Config, model: Option<String>) -> anyhow::Result<()> {
    if let Some(model) = model {
        config.model.name = model;
        config.validate()?;
    }
    Ok(())
}

/// Read lines from stdin until `quit`, end of input or Ctrl-C.
async fn interactive(session: &Session<'_, OllamaClient>, quiet: bool) -> anyhow::Result<()> {
    println!(
        "{} interactive mode over {}\nType 'help' for commands, 'quit' to exit.",
        "tfagent".bold(),
        session.directory().display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "you>".blue().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "Interrupted".yellow());
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let spinner = spinner("Thinking...", quiet);
        let result = session.handle(&line).await;
        spinner.finish_and_clear();

        match result {
            Ok(Reply::Quit) => break,
            Ok(Reply::Empty) => {}
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Answer(response)) => println!("{}", response.text),
            Err(e) => {
                tracing::debug!(error = %e, "Session command failed");
                eprintln!("{} {e}", "Error:".red().bold());
            }
        }
    }
    Ok(())
}

/// Write to `output` if given, stdout otherwise.
fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = output {
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "Output written");
    } else {
        println!("{content}");
    }
    Ok(())
}

fn report_parse_errors(analysis: &Analysis) {
    for error in &analysis.parse_errors {
        eprintln!("{} {error}", "warning:".yellow());
    }
}

fn print_findings(response: &AgentResponse) {
    let findings = response.findings();
    if findings.is_empty() {
        return;
    }
    println!(
        "\n{} {} suggestion(s), {} issue(s), {} improvement(s)",
        "Review:".bold(),
        findings.suggestions.len(),
        findings.issues.len(),
        findings.improvements.len()
    );
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
