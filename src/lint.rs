//! Best-practice checks over an extracted configuration.
//!
//! # Checks
//!
//! 1. **Missing tags**: `aws_*` resources without a `tags` argument.
//! 2. **Empty depends_on**: `depends_on = []` on resources, data sources and
//!    modules.
//! 3. **Missing required_version**: `terraform` blocks that do not pin the
//!    Terraform version.
//! 4. **Unvalidated variables**: `variable` blocks without a `validation`
//!    block.
//!
//! The first two are warnings, the last two suggestions. Files that failed to
//! parse are reported as invalid next to the findings.

use crate::types::{Analysis, ParsedConfiguration, SourceLocation, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How much a finding matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth considering
    Suggestion,
    /// Likely a mistake
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suggestion => write!(f, "SUGGESTION"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// One best-practice finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Stable identifier of the check
    pub code: &'static str,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Where the offending block is
    pub location: SourceLocation,
}

impl Finding {
    fn warning(code: &'static str, message: String, location: &SourceLocation) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message,
            location: location.clone(),
        }
    }

    fn suggestion(code: &'static str, message: String, location: &SourceLocation) -> Self {
        Self {
            code,
            severity: Severity::Suggestion,
            message,
            location: location.clone(),
        }
    }
}

/// Run every check over `config`. Findings are sorted by location.
#[must_use]
pub fn lint_configuration(config: &ParsedConfiguration) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (key, resource) in &config.resources {
        if key.resource_type.starts_with("aws_") && !resource.attributes.contains_key("tags") {
            findings.push(Finding::warning(
                "missing-tags",
                format!("resource {key} should have tags"),
                &resource.location,
            ));
        }
        if has_empty_depends_on(&resource.attributes) {
            findings.push(Finding::warning(
                "empty-depends-on",
                format!("resource {key} has an empty depends_on"),
                &resource.location,
            ));
        }
    }

    for (key, data) in &config.data_sources {
        if has_empty_depends_on(&data.attributes) {
            findings.push(Finding::warning(
                "empty-depends-on",
                format!("data source data.{key} has an empty depends_on"),
                &data.location,
            ));
        }
    }

    for (name, module) in &config.modules {
        if has_empty_depends_on(&module.attributes) {
            findings.push(Finding::warning(
                "empty-depends-on",
                format!("module {name} has an empty depends_on"),
                &module.location,
            ));
        }
    }

    for settings in &config.terraform {
        if settings.required_version.is_none() {
            findings.push(Finding::suggestion(
                "missing-required-version",
                "consider adding a required_version constraint".to_string(),
                &settings.location,
            ));
        }
    }

    for (name, variable) in &config.variables {
        if !variable.has_validation {
            findings.push(Finding::suggestion(
                "variable-without-validation",
                format!("consider adding validation for variable {name}"),
                &variable.location,
            ));
        }
    }

    findings.sort_by(|a, b| a.location.cmp(&b.location).then(a.code.cmp(b.code)));
    findings
}

fn has_empty_depends_on(attributes: &BTreeMap<String, Value>) -> bool {
    matches!(attributes.get("depends_on"), Some(Value::List(items)) if items.is_empty())
}

/// Per-file outcome of a lint run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    /// File path
    pub path: PathBuf,
    /// Whether the file parsed
    pub valid: bool,
    /// Parse error message, for invalid files
    pub error: Option<String>,
    /// Warnings located in this file
    pub warnings: usize,
    /// Suggestions located in this file
    pub suggestions: usize,
}

/// Everything a lint run produced for one directory.
#[derive(Debug, Clone, Serialize)]
pub struct LintReport {
    /// The analysed directory
    pub directory: PathBuf,
    /// One status per file, sorted by path
    pub files: Vec<FileStatus>,
    /// All findings, sorted by location
    pub findings: Vec<Finding>,
}

impl LintReport {
    /// Lint the configuration of an analysis and tally findings per file.
    #[must_use]
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let findings = lint_configuration(&analysis.configuration);

        let mut files: Vec<FileStatus> = analysis
            .files
            .iter()
            .map(|path| {
                let count = |severity: Severity| {
                    findings
                        .iter()
                        .filter(|f| f.severity == severity && f.location.file == *path)
                        .count()
                };
                FileStatus {
                    path: path.clone(),
                    valid: true,
                    error: None,
                    warnings: count(Severity::Warning),
                    suggestions: count(Severity::Suggestion),
                }
            })
            .collect();

        files.extend(analysis.parse_errors.iter().filter_map(|error| {
            error.file().map(|path| FileStatus {
                path: path.to_path_buf(),
                valid: false,
                error: Some(error.to_string()),
                warnings: 0,
                suggestions: 0,
            })
        }));
        files.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!(
            files = files.len(),
            findings = findings.len(),
            "Lint complete"
        );

        Self {
            directory: analysis.directory.clone(),
            files,
            findings,
        }
    }

    /// Whether every file parsed.
    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.files.iter().all(|f| f.valid)
    }

    /// Number of findings with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}
