//! Plain text report generator.

use crate::config::Config;
use crate::error::{Result, TfAgentError};
use crate::lint::{LintReport, Severity};
use crate::reporter::ReportGenerator;
use crate::types::{Analysis, SourceLocation};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Text report generator for CLI output.
pub struct TextReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
    /// Warnings fail the status line
    strict: bool,
}

impl TextReporter {
    /// Create a new text reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            use_colors: config.output.colored,
            verbose: config.output.verbose,
            strict: false,
        }
    }

    /// Treat warnings as failures.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl ReportGenerator for TextReporter {
    fn generate(&self, analysis: &Analysis) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header(analysis));
        output.push('\n');

        output.push_str(&self.format_summary(analysis));
        output.push('\n');

        if analysis.has_parse_errors() {
            output.push_str(&self.format_parse_errors(analysis));
            output.push('\n');
        }

        let warnings = analysis.warnings();
        if !warnings.is_empty() {
            output.push_str(&self.format_warnings(&warnings));
            output.push('\n');
        }

        for section in [
            self.format_resources(analysis),
            self.format_variables(analysis),
            self.format_outputs(analysis),
            self.format_modules(analysis),
            self.format_locals(analysis),
            self.format_dependencies(analysis),
        ] {
            if !section.is_empty() {
                output.push_str(&section);
                output.push('\n');
            }
        }

        output.push_str(&self.format_footer(analysis, warnings.len()));

        Ok(output)
    }
}

impl TextReporter {
    fn section_title(&self, title: &str) -> String {
        let title = if self.use_colors {
            title.bright_cyan().bold().to_string()
        } else {
            title.to_string()
        };
        format!("\n{title}\n{}\n", "-".repeat(80))
    }

    fn new_table(header: Vec<&str>) -> Table {
        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        table
    }

    /// Format the report header.
    fn format_header(&self, analysis: &Analysis) -> String {
        let title = "tfagent Analysis";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let directory = analysis.directory.display().to_string();

        if self.use_colors {
            format!(
                "\n{} {} {}\n{}\n",
                title.bright_white().bold(),
                version.dimmed(),
                format!("({directory})").dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} {version} ({directory})\n{}\n", "=".repeat(80))
        }
    }

    /// Format the summary section.
    fn format_summary(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        let mut output = self.section_title("Summary");

        let failed = analysis.parse_errors.len();
        let failed_str = if self.use_colors && failed > 0 {
            failed.to_string().red().bold().to_string()
        } else {
            failed.to_string()
        };
        output.push_str(&format!(
            "  {} files parsed | {failed_str} failed\n",
            analysis.files.len()
        ));
        output.push_str(&format!(
            "  {} resources | {} data sources | {} modules | {} providers\n",
            config.resources.len(),
            config.data_sources.len(),
            config.modules.len(),
            config.providers.len()
        ));
        output.push_str(&format!(
            "  {} variables | {} outputs | {} locals | {} tfvars values\n",
            config.variables.len(),
            config.outputs.len(),
            config.locals.len(),
            config.variable_values.len()
        ));

        let edges: usize = analysis.dependencies.values().map(std::collections::BTreeSet::len).sum();
        output.push_str(&format!("  {edges} dependency edges\n"));

        output
    }

    /// Format per-file parse failures.
    fn format_parse_errors(&self, analysis: &Analysis) -> String {
        let mut output = self.section_title("Parse Errors");

        for error in &analysis.parse_errors {
            let line = match error {
                TfAgentError::HclParse { file, message, line, column, .. } => {
                    let position = match (line, column) {
                        (Some(l), Some(c)) => format!(":{l}:{c}"),
                        (Some(l), None) => format!(":{l}"),
                        _ => String::new(),
                    };
                    format!("{}{position}: {message}", file.display())
                }
                other => other.to_string(),
            };
            let label = if self.use_colors {
                "ERROR".red().to_string()
            } else {
                "ERROR".to_string()
            };
            output.push_str(&format!("  [{label}] {line}\n"));
        }

        output
    }

    /// Format configuration warnings.
    fn format_warnings(&self, warnings: &[String]) -> String {
        let mut output = self.section_title("Warnings");
        for warning in warnings {
            let label = if self.use_colors {
                "WARNING".yellow().to_string()
            } else {
                "WARNING".to_string()
            };
            output.push_str(&format!("  [{label}] {warning}\n"));
        }
        output
    }

    fn format_resources(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        if config.resources.is_empty() && config.data_sources.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Resources");
        let mut table = Self::new_table(vec!["Address", "Attributes", "Location"]);

        let rows = config
            .resources
            .values()
            .map(|r| (r.key.to_string(), r))
            .chain(config.data_sources.values().map(|r| (format!("data.{}", r.key), r)));
        for (address, entry) in rows {
            table.add_row(vec![
                Cell::new(address),
                Cell::new(entry.attributes.len() + entry.nested_blocks.len()),
                Cell::new(contextual_location(&entry.location)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_variables(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        if config.variables.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Variables");
        let mut table = Self::new_table(vec!["Name", "Type", "Default", "Location"]);

        for var in config.variables.values() {
            let default_cell = match (&var.default, config.variable_values.get(&var.name)) {
                (_, Some(assigned)) => {
                    let text = truncate(&assigned.value.expression_text(), 30);
                    if self.use_colors {
                        Cell::new(format!("{text} (tfvars)")).fg(Color::Green)
                    } else {
                        Cell::new(format!("{text} (tfvars)"))
                    }
                }
                (Some(default), None) => Cell::new(truncate(&default.expression_text(), 30)),
                (None, None) => {
                    if self.use_colors {
                        Cell::new("REQUIRED").fg(Color::Yellow)
                    } else {
                        Cell::new("REQUIRED")
                    }
                }
            };

            let mut name = var.name.clone();
            if var.sensitive == Some(true) {
                name.push_str(" (sensitive)");
            }

            table.add_row(vec![
                Cell::new(name),
                Cell::new(var.type_expr.as_deref().unwrap_or("any")),
                default_cell,
                Cell::new(contextual_location(&var.location)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_outputs(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        if config.outputs.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Outputs");
        let mut table = Self::new_table(vec!["Name", "Value", "Location"]);
        for out in config.outputs.values() {
            let value = if out.sensitive == Some(true) {
                "(sensitive)".to_string()
            } else {
                truncate(out.value.as_deref().unwrap_or(""), 45)
            };
            table.add_row(vec![
                Cell::new(&out.name),
                Cell::new(value),
                Cell::new(contextual_location(&out.location)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_modules(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        if config.modules.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Modules");
        let mut table = Self::new_table(vec!["Name", "Source", "Version", "Location"]);
        for module in config.modules.values() {
            let version_cell = match &module.version {
                Some(v) => Cell::new(v),
                None if self.use_colors => Cell::new("-").fg(Color::DarkGrey),
                None => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(&module.name),
                Cell::new(truncate(module.source.as_deref().unwrap_or("MISSING"), 45)),
                version_cell,
                Cell::new(contextual_location(&module.location)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Locals only show in verbose mode.
    fn format_locals(&self, analysis: &Analysis) -> String {
        let config = &analysis.configuration;
        if !self.verbose || config.locals.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Locals");
        let mut table = Self::new_table(vec!["Name", "Value", "Location"]);
        for local in config.locals.values() {
            table.add_row(vec![
                Cell::new(&local.name),
                Cell::new(truncate(&local.value, 45)),
                Cell::new(contextual_location(&local.location)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Dependency edges only show in verbose mode.
    fn format_dependencies(&self, analysis: &Analysis) -> String {
        if !self.verbose || analysis.dependencies.values().all(std::collections::BTreeSet::is_empty) {
            return String::new();
        }

        let mut output = self.section_title("Dependencies");
        for (from, targets) in &analysis.dependencies {
            if targets.is_empty() {
                continue;
            }
            let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
            output.push_str(&format!("  {from} -> {}\n", targets.join(", ")));
        }
        output
    }

    /// Format the report footer.
    fn format_footer(&self, analysis: &Analysis, warnings: usize) -> String {
        let status = if analysis.has_parse_errors() {
            let text = format!("FAILED - {} file(s) could not be parsed", analysis.parse_errors.len());
            if self.use_colors { text.red().bold().to_string() } else { text }
        } else if warnings > 0 && self.strict {
            let text = "FAILED - Warnings found".to_string();
            if self.use_colors { text.red().bold().to_string() } else { text }
        } else if warnings > 0 {
            let text = "PASSED with warnings".to_string();
            if self.use_colors { text.yellow().to_string() } else { text }
        } else if analysis.configuration.is_empty() {
            "PASSED - No configuration found".to_string()
        } else {
            let text = "PASSED - No issues found".to_string();
            if self.use_colors { text.green().to_string() } else { text }
        };

        format!("\n{status}\n\n")
    }
}

impl TextReporter {
    /// Render a lint run: one Valid/Invalid row per file, then the findings.
    #[must_use]
    pub fn generate_lint(&self, report: &LintReport) -> String {
        let title = "tfagent Validation";
        let mut output = if self.use_colors {
            format!(
                "\n{} {}\n{}\n",
                title.bright_white().bold(),
                format!("({})", report.directory.display()).dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} ({})\n{}\n", report.directory.display(), "=".repeat(80))
        };

        output.push_str(&self.section_title("Files"));
        let mut table = Self::new_table(vec!["File", "Status", "Warnings", "Suggestions"]);
        for file in &report.files {
            let status = match (file.valid, self.use_colors) {
                (true, true) => Cell::new("Valid").fg(Color::Green),
                (true, false) => Cell::new("Valid"),
                (false, true) => Cell::new("Invalid").fg(Color::Red),
                (false, false) => Cell::new("Invalid"),
            };
            table.add_row(vec![
                Cell::new(contextual_location(&SourceLocation::new(&file.path, 0))),
                status,
                Cell::new(file.warnings),
                Cell::new(file.suggestions),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');

        let errors: Vec<&str> = report.files.iter().filter_map(|f| f.error.as_deref()).collect();
        if !errors.is_empty() {
            output.push_str(&self.section_title("Parse Errors"));
            for error in errors {
                let label = if self.use_colors { "ERROR".red().to_string() } else { "ERROR".to_string() };
                output.push_str(&format!("  [{label}] {error}\n"));
            }
        }

        if !report.findings.is_empty() {
            output.push_str(&self.section_title("Findings"));
            for finding in &report.findings {
                let label = match (finding.severity, self.use_colors) {
                    (Severity::Warning, true) => finding.severity.to_string().yellow().to_string(),
                    (Severity::Suggestion, true) => finding.severity.to_string().cyan().to_string(),
                    (_, false) => finding.severity.to_string(),
                };
                output.push_str(&format!(
                    "  [{label}] {}: {} ({})\n",
                    contextual_location(&finding.location),
                    finding.message,
                    finding.code
                ));
            }
        }

        let warnings = report.count(Severity::Warning);
        let suggestions = report.count(Severity::Suggestion);
        let status = if !report.all_valid() {
            let text = "INVALID - some files could not be parsed".to_string();
            if self.use_colors { text.red().bold().to_string() } else { text }
        } else if warnings > 0 && self.strict {
            let text = format!("FAILED - {warnings} warning(s)");
            if self.use_colors { text.red().bold().to_string() } else { text }
        } else {
            let text = format!("VALID - {warnings} warning(s), {suggestions} suggestion(s)");
            if self.use_colors { text.green().to_string() } else { text }
        };
        output.push_str(&format!("\n{status}\n\n"));

        output
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let kept: String = single_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Last two path components plus the line.
/// Example: /home/me/infra/env/prod/main.tf:12 -> prod/main.tf:12
fn contextual_location(location: &SourceLocation) -> String {
    let components: Vec<_> = location.file.components().collect();
    let start_idx = components.len().saturating_sub(2);
    let path = components[start_idx..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if location.line == 0 {
        path
    } else {
        format!("{path}:{}", location.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ParsedConfiguration, ResourceEntry, ResourceKey, UnrecognizedBlock, VariableEntry,
    };
    use std::path::PathBuf;

    fn plain_config(verbose: bool) -> Config {
        let mut config = Config::default();
        config.output.colored = false;
        config.output.verbose = verbose;
        config
    }

    fn create_test_analysis() -> Analysis {
        let mut configuration = ParsedConfiguration::default();
        let key = ResourceKey::new("google_compute_network", "vpc");
        configuration.resources.insert(
            key.clone(),
            ResourceEntry {
                key,
                attributes: Default::default(),
                nested_blocks: Vec::new(),
                location: SourceLocation::new("/work/infra/main.tf", 2),
            },
        );
        configuration.variables.insert(
            "project_id".to_string(),
            VariableEntry {
                name: "project_id".to_string(),
                description: None,
                type_expr: Some("string".to_string()),
                default: None,
                sensitive: None,
                has_validation: false,
                location: SourceLocation::new("/work/infra/variables.tf", 1),
            },
        );

        Analysis {
            directory: PathBuf::from("/work/infra"),
            files: vec![PathBuf::from("/work/infra/main.tf"), PathBuf::from("/work/infra/variables.tf")],
            configuration,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_report_generation() {
        let text = TextReporter::new(&plain_config(false))
            .generate(&create_test_analysis())
            .unwrap();

        assert!(text.contains("tfagent Analysis"));
        assert!(text.contains("Summary"));
        assert!(text.contains("2 files parsed | 0 failed"));
        assert!(text.contains("google_compute_network.vpc"));
        assert!(text.contains("infra/main.tf:2"));
        assert!(text.contains("REQUIRED"));
        assert!(text.contains("PASSED - No issues found"));
        assert!(!text.contains("Locals"));
    }

    #[test]
    fn test_parse_errors_fail_the_status() {
        let mut analysis = create_test_analysis();
        analysis.parse_errors.push(crate::err!(HclParse {
            file: PathBuf::from("broken.tf"),
            message: "unterminated string".to_string(),
            line: Some(3),
            column: Some(10),
        }));

        let text = TextReporter::new(&plain_config(false)).generate(&analysis).unwrap();
        assert!(text.contains("broken.tf:3:10: unterminated string"));
        assert!(text.contains("FAILED - 1 file(s) could not be parsed"));
    }

    #[test]
    fn test_strict_warnings() {
        let mut analysis = create_test_analysis();
        analysis.configuration.unrecognized.push(UnrecognizedBlock {
            block_type: "check".to_string(),
            labels: Vec::new(),
            location: SourceLocation::new("main.tf", 9),
        });

        let lenient = TextReporter::new(&plain_config(false)).generate(&analysis).unwrap();
        assert!(lenient.contains("PASSED with warnings"));

        let strict = TextReporter::new(&plain_config(false))
            .with_strict(true)
            .generate(&analysis)
            .unwrap();
        assert!(strict.contains("FAILED - Warnings found"));
    }

    #[test]
    fn test_lint_report() {
        let mut analysis = create_test_analysis();
        analysis.parse_errors.push(crate::err!(HclParse {
            file: PathBuf::from("/work/infra/broken.tf"),
            message: "unterminated string".to_string(),
            line: Some(3),
            column: None,
        }));
        let report = LintReport::from_analysis(&analysis);

        let text = TextReporter::new(&plain_config(false)).generate_lint(&report);
        assert!(text.contains("tfagent Validation"));
        assert!(text.contains("infra/broken.tf"));
        assert!(text.contains("Invalid"));
        assert!(text.contains("Valid"));
        assert!(text.contains("[SUGGESTION] infra/variables.tf:1: consider adding validation for variable project_id"));
        assert!(text.contains("INVALID - some files could not be parsed"));
    }

    #[test]
    fn test_lint_report_strict() {
        let mut analysis = create_test_analysis();
        let key = ResourceKey::new("aws_s3_bucket", "logs");
        analysis.configuration.resources.insert(
            key.clone(),
            ResourceEntry {
                key,
                attributes: Default::default(),
                nested_blocks: Vec::new(),
                location: SourceLocation::new("/work/infra/main.tf", 8),
            },
        );
        let report = LintReport::from_analysis(&analysis);

        let lenient = TextReporter::new(&plain_config(false)).generate_lint(&report);
        assert!(lenient.contains("[WARNING] infra/main.tf:8: resource aws_s3_bucket.logs should have tags"));
        assert!(lenient.contains("VALID - 1 warning(s), 1 suggestion(s)"));

        let strict = TextReporter::new(&plain_config(false))
            .with_strict(true)
            .generate_lint(&report);
        assert!(strict.contains("FAILED - 1 warning(s)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("a\nb", 10), "a b");
    }

    #[test]
    fn test_contextual_location() {
        assert_eq!(
            contextual_location(&SourceLocation::new("/a/b/c/main.tf", 4)),
            "c/main.tf:4"
        );
        assert_eq!(contextual_location(&SourceLocation::new("main.tf", 0)), "main.tf");
    }
}
