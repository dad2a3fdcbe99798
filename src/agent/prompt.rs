//! Prompt construction.

use crate::config::AgentOptions;
use crate::error::TfAgentError;
use crate::graph::DependencyGraph;
use crate::types::{Analysis, EntryRef, ParsedFile};
use std::fmt::Write as _;
use std::path::Path;

/// Instruction sent by [`Agent::review`](super::Agent::review).
pub const REVIEW_INSTRUCTION: &str = "Please review this Terraform configuration and provide \
suggestions for improvements, security best practices, and potential issues.";

const DOCS_SOURCE: &str = "https://developer.hashicorp.com/terraform";
const SUPPORTED_TERRAFORM: &str = ">= 1.0";

const CAPABILITIES: [&str; 5] = [
    "Write and explain Terraform configurations",
    "Review existing code for correctness and security",
    "Explain resource dependencies and data flow",
    "Suggest provider and module best practices",
    "Troubleshoot syntax and planning errors",
];

const RESPONSE_FORMAT: [&str; 4] = [
    "Answer the question directly before going into detail",
    "Put Terraform code in ```hcl fenced blocks",
    "Refer to files and line numbers when discussing the user's code",
    "Say so when something cannot be determined from the given files",
];

const REVIEW_GUIDELINES: [&str; 6] = [
    "Check for security best practices",
    "Validate syntax and structure",
    "Suggest performance optimizations",
    "Ensure proper resource naming conventions",
    "Verify provider configurations",
    "Check for potential cost optimizations",
];

/// Directory context handed to the prompt builder.
#[derive(Debug)]
pub struct WorkspaceContext {
    /// Every file that was loaded, parsed or not
    pub files: Vec<ParsedFile>,
    /// Result of analysing those files
    pub analysis: Analysis,
}

/// Builds the system and user prompts for the model.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    options: &'a AgentOptions,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for the given agent options.
    #[must_use]
    pub const fn new(options: &'a AgentOptions) -> Self {
        Self { options }
    }

    /// Assistant identity, knowledge snapshot and response rules.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are tfagent {}, an assistant for Terraform infrastructure as code running \
             against a local model.\n\nCAPABILITIES:\n",
            env!("CARGO_PKG_VERSION")
        );
        push_list(&mut prompt, &CAPABILITIES);

        prompt.push_str("\nTERRAFORM KNOWLEDGE:\n");
        let _ = writeln!(prompt, "- Reference documentation: {DOCS_SOURCE}");
        let _ = writeln!(prompt, "- Documentation is current as of {}", self.options.docs_snapshot);
        let _ = writeln!(prompt, "- Target Terraform {SUPPORTED_TERRAFORM} syntax and best practices");
        prompt.push_str("- Never claim to have run terraform plan or apply\n");

        prompt.push_str("\nRESPONSE FORMAT:\n");
        push_list(&mut prompt, &RESPONSE_FORMAT);

        prompt.push_str("\nCODE REVIEW GUIDELINES:\n");
        push_list(&mut prompt, &REVIEW_GUIDELINES);
        prompt
    }

    /// The query plus whatever is known about the working directory.
    #[must_use]
    pub fn user_prompt(&self, query: &str, context: Option<&WorkspaceContext>) -> String {
        let mut prompt = format!("User Query: {query}\n");

        let Some(context) = context else {
            return prompt;
        };
        let analysis = &context.analysis;

        let _ = writeln!(prompt, "\nWORKING DIRECTORY: {}", analysis.directory.display());
        let _ = writeln!(prompt, "TERRAFORM FILES FOUND: {}\n", context.files.len());

        self.push_files(&mut prompt, &analysis.directory, &context.files);
        push_summary(&mut prompt, analysis);
        push_entries(&mut prompt, analysis);
        push_dependencies(&mut prompt, analysis);
        push_parse_errors(&mut prompt, &analysis.parse_errors);

        prompt
    }

    /// Ask for a fix to `issue` in one file, with the file contents attached.
    #[must_use]
    pub fn fix_prompt(&self, file: &ParsedFile, issue: &str) -> String {
        let name = file.path.display();
        let mut prompt = format!(
            "User Query: Please suggest specific fixes for this issue in the Terraform file \
             {name}: {issue}\nReturn the corrected configuration in a ```hcl block.\n\n"
        );

        let content = truncate_to(&file.raw_text, self.options.max_context_bytes);
        let _ = writeln!(prompt, "FILE: {name}");
        let _ = writeln!(prompt, "CONTENT:\n{}", content.trim_end());
        if content.len() < file.raw_text.len() {
            prompt.push_str("... (truncated)\n");
        }
        prompt
    }

    /// File contents until the byte budget runs out.
    fn push_files(&self, prompt: &mut String, directory: &Path, files: &[ParsedFile]) {
        let mut remaining = self.options.max_context_bytes;

        for file in files {
            let name = file.path.strip_prefix(directory).unwrap_or(&file.path);
            if remaining == 0 {
                let _ = writeln!(prompt, "FILE: {} (omitted, context limit reached)\n", name.display());
                continue;
            }

            let content = truncate_to(&file.raw_text, remaining);
            remaining -= content.len();

            let _ = writeln!(prompt, "FILE: {}", name.display());
            let _ = writeln!(prompt, "CONTENT:\n{}", content.trim_end());
            if content.len() < file.raw_text.len() {
                tracing::debug!(
                    file = %file.path.display(),
                    kept_bytes = content.len(),
                    total_bytes = file.raw_text.len(),
                    "Truncated file contents in prompt"
                );
                prompt.push_str("... (truncated)\n");
            }
            prompt.push('\n');
        }
    }
}

fn push_list(prompt: &mut String, items: &[&str]) {
    for item in items {
        let _ = writeln!(prompt, "- {item}");
    }
}

fn push_summary(prompt: &mut String, analysis: &Analysis) {
    let config = &analysis.configuration;
    prompt.push_str("ANALYSIS SUMMARY:\n");
    let _ = writeln!(prompt, "- Total files: {}", analysis.total_files());
    let _ = writeln!(prompt, "- Resources: {}", config.resources.len());
    let _ = writeln!(prompt, "- Data sources: {}", config.data_sources.len());
    let _ = writeln!(prompt, "- Providers: {}", config.providers.len());
    let _ = writeln!(prompt, "- Modules: {}", config.modules.len());
    let _ = writeln!(prompt, "- Variables: {}", config.variables.len());
    let _ = writeln!(prompt, "- Outputs: {}", config.outputs.len());
    let _ = writeln!(prompt, "- Locals: {}", config.locals.len());
    prompt.push('\n');
}

fn push_entries(prompt: &mut String, analysis: &Analysis) {
    let config = &analysis.configuration;
    let graph = DependencyGraph::from_map(&analysis.dependencies);

    if !config.resources.is_empty() {
        prompt.push_str("RESOURCES:\n");
        for resource in config.resources.values() {
            let _ = write!(prompt, "- {} ({})", resource.key, resource.location);
            let dependents = graph.dependents_of(&EntryRef::resource(&resource.key));
            if !dependents.is_empty() {
                let _ = write!(prompt, ", referenced by {}", join(&dependents));
            }
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if !config.variables.is_empty() {
        prompt.push_str("VARIABLES:\n");
        for var in config.variables.values() {
            let _ = write!(prompt, "- {}", var.name);
            if let Some(type_expr) = &var.type_expr {
                let _ = write!(prompt, ": {type_expr}");
            }
            match (&var.default, config.variable_values.get(&var.name)) {
                (_, Some(assigned)) => {
                    let _ = write!(prompt, " = {} (tfvars)", assigned.value.expression_text());
                }
                (Some(default), None) => {
                    let _ = write!(prompt, " = {}", default.expression_text());
                }
                (None, None) => prompt.push_str(" (required)"),
            }
            if var.sensitive == Some(true) {
                prompt.push_str(" [sensitive]");
            }
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if !config.outputs.is_empty() {
        prompt.push_str("OUTPUTS:\n");
        for output in config.outputs.values() {
            let _ = writeln!(
                prompt,
                "- {} = {}",
                output.name,
                output.value.as_deref().unwrap_or("(no value)")
            );
        }
        prompt.push('\n');
    }
}

fn push_dependencies(prompt: &mut String, analysis: &Analysis) {
    let edges: Vec<_> = analysis
        .dependencies
        .iter()
        .filter(|(_, targets)| !targets.is_empty())
        .collect();
    if edges.is_empty() {
        return;
    }

    prompt.push_str("DEPENDENCIES:\n");
    for (from, targets) in edges {
        let targets: Vec<&EntryRef> = targets.iter().collect();
        let _ = writeln!(prompt, "- {from} -> {}", join(&targets));
    }
    prompt.push('\n');
}

fn push_parse_errors(prompt: &mut String, errors: &[TfAgentError]) {
    if errors.is_empty() {
        return;
    }

    prompt.push_str("PARSE ERRORS:\n");
    for error in errors {
        match error {
            TfAgentError::HclParse { file, message, line: Some(line), .. } => {
                let _ = writeln!(prompt, "- {}:{line}: {message}", file.display());
            }
            TfAgentError::HclParse { file, message, .. } => {
                let _ = writeln!(prompt, "- {}: {message}", file.display());
            }
            other => {
                let _ = writeln!(prompt, "- {other}");
            }
        }
    }
    prompt.push('\n');
}

fn join(entries: &[&EntryRef]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Longest prefix of `text` no longer than `max` bytes, on a char boundary.
fn truncate_to(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::Analyzer;

    fn context(files: Vec<ParsedFile>) -> WorkspaceContext {
        let analysis = Analyzer::new(Config::default())
            .analyze_files(Path::new("infra"), &files)
            .unwrap();
        WorkspaceContext { files, analysis }
    }

    fn sample_files() -> Vec<ParsedFile> {
        vec![
            ParsedFile::new(
                "infra/main.tf",
                r#"resource "google_compute_network" "vpc" {
  name = var.network_name
}

resource "google_compute_firewall" "allow_ssh" {
  network = google_compute_network.vpc.id
}
"#,
            ),
            ParsedFile::new(
                "infra/variables.tf",
                "variable \"network_name\" {\n  type = string\n}\n\nvariable \"region\" {\n  default = \"us-central1\"\n}\n",
            ),
            ParsedFile::new("infra/outputs.tf", "output \"vpc_id\" {\n  value = google_compute_network.vpc.id\n}\n"),
            ParsedFile::new("infra/broken.tf", "resource \"a\" \"b\" {\n  name = \"oops\n}\n"),
        ]
    }

    #[test]
    fn test_system_prompt_mentions_snapshot() {
        let options = AgentOptions {
            docs_snapshot: "2025-01-31".to_string(),
            ..AgentOptions::default()
        };
        let prompt = PromptBuilder::new(&options).system_prompt();
        assert!(prompt.contains("Documentation is current as of 2025-01-31"));
        assert!(prompt.contains("CODE REVIEW GUIDELINES:"));
        assert!(prompt.contains("```hcl"));
    }

    #[test]
    fn test_user_prompt_without_context() {
        let options = AgentOptions::default();
        let prompt = PromptBuilder::new(&options).user_prompt("How do modules work?", None);
        assert_eq!(prompt, "User Query: How do modules work?\n");
    }

    #[test]
    fn test_user_prompt_with_context() {
        let options = AgentOptions::default();
        let context = context(sample_files());
        let prompt = PromptBuilder::new(&options).user_prompt("Review this", Some(&context));

        assert!(prompt.starts_with("User Query: Review this\n"));
        assert!(prompt.contains("WORKING DIRECTORY: infra"));
        assert!(prompt.contains("TERRAFORM FILES FOUND: 4"));
        assert!(prompt.contains("FILE: main.tf\nCONTENT:\nresource \"google_compute_network\""));
        assert!(prompt.contains("- Total files: 4"));
        assert!(prompt.contains("- Resources: 2"));
        assert!(prompt.contains(
            "- google_compute_network.vpc (infra/main.tf:1), referenced by google_compute_firewall.allow_ssh, output.vpc_id"
        ));
        assert!(prompt.contains("- network_name: string (required)"));
        assert!(prompt.contains("- region = \"us-central1\""));
        assert!(prompt.contains("- vpc_id = google_compute_network.vpc.id"));
        assert!(prompt.contains("- google_compute_firewall.allow_ssh -> google_compute_network.vpc"));
        assert!(prompt.contains("PARSE ERRORS:\n- infra/broken.tf"));
    }

    #[test]
    fn test_file_contents_respect_budget() {
        let options = AgentOptions {
            max_context_bytes: 40,
            ..AgentOptions::default()
        };
        let files = vec![
            ParsedFile::new("infra/a.tf", format!("# {}\n", "a".repeat(60))),
            ParsedFile::new("infra/b.tf", "# second\n"),
        ];
        let context = context(files);
        let prompt = PromptBuilder::new(&options).user_prompt("q", Some(&context));

        assert!(prompt.contains("... (truncated)"));
        assert!(prompt.contains("FILE: b.tf (omitted, context limit reached)"));
        assert!(!prompt.contains(&"a".repeat(60)));
    }

    #[test]
    fn test_fix_prompt() {
        let options = AgentOptions {
            max_context_bytes: 20,
            ..AgentOptions::default()
        };
        let file = ParsedFile::new(
            "infra/main.tf",
            "resource \"aws_instance\" \"web\" {\n  ami = \"ami-123\"\n}\n",
        );
        let prompt = PromptBuilder::new(&options).fix_prompt(&file, "missing tags");

        assert!(prompt.starts_with(
            "User Query: Please suggest specific fixes for this issue in the Terraform file infra/main.tf: missing tags\n"
        ));
        assert!(prompt.contains("FILE: infra/main.tf\nCONTENT:\nresource \"aws_"));
        assert!(prompt.ends_with("... (truncated)\n"));
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        assert_eq!(truncate_to("héllo", 2), "h");
        assert_eq!(truncate_to("héllo", 3), "hé");
        assert_eq!(truncate_to("abc", 10), "abc");
    }
}
