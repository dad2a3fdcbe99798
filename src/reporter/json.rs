//! JSON report generator.

use crate::config::Config;
use crate::error::{Result, TfAgentError};
use crate::lint::LintReport;
use crate::reporter::ReportGenerator;
use crate::types::{
    Analysis, LocalEntry, ModuleEntry, OutputEntry, ProviderEntry, ResourceEntry,
    TerraformSettings, VariableEntry, VariableValue,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON report generator.
pub struct JsonReporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
        }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, analysis: &Analysis) -> Result<String> {
        self.serialize(&JsonReport::from(analysis))
    }
}

impl JsonReporter {
    /// Serialize a lint run.
    ///
    /// # Errors
    ///
    /// Returns `ReportGeneration` if serialization fails.
    pub fn generate_lint(&self, report: &LintReport) -> Result<String> {
        self.serialize(report)
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        json.map_err(|e| crate::err!(ReportGeneration {
            message: format!("Failed to serialize JSON report: {e}"),
        }))
    }
}

/// JSON report structure.
///
/// Keyed collections are flattened to arrays in key order, since resource
/// keys are not plain strings.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// Files that failed to parse
    pub parse_errors: Vec<JsonParseError>,
    /// Non-fatal warnings
    pub warnings: Vec<String>,
    /// `resource` blocks
    pub resources: Vec<&'a ResourceEntry>,
    /// `data` blocks
    pub data_sources: Vec<&'a ResourceEntry>,
    /// `variable` declarations
    pub variables: Vec<&'a VariableEntry>,
    /// `output` declarations
    pub outputs: Vec<&'a OutputEntry>,
    /// Local values
    pub locals: Vec<&'a LocalEntry>,
    /// `provider` blocks
    pub providers: &'a [ProviderEntry],
    /// `module` calls
    pub modules: Vec<&'a ModuleEntry>,
    /// `terraform` settings blocks
    pub terraform: &'a [TerraformSettings],
    /// `.tfvars` assignments
    pub variable_values: &'a BTreeMap<String, VariableValue>,
    /// Referring entry -> referenced entries
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl<'a> From<&'a Analysis> for JsonReport<'a> {
    fn from(analysis: &'a Analysis) -> Self {
        let config = &analysis.configuration;
        let warnings = analysis.warnings();

        Self {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                directory: analysis.directory.display().to_string(),
                files_parsed: analysis.files.len(),
            },
            summary: ReportSummary {
                total_resources: config.resources.len(),
                total_data_sources: config.data_sources.len(),
                total_variables: config.variables.len(),
                total_outputs: config.outputs.len(),
                total_locals: config.locals.len(),
                total_modules: config.modules.len(),
                total_providers: config.providers.len(),
                total_dependency_edges: analysis.dependencies.values().map(std::collections::BTreeSet::len).sum(),
                has_parse_errors: analysis.has_parse_errors(),
                has_warnings: !warnings.is_empty(),
            },
            parse_errors: analysis.parse_errors.iter().map(JsonParseError::from).collect(),
            warnings,
            resources: config.resources.values().collect(),
            data_sources: config.data_sources.values().collect(),
            variables: config.variables.values().collect(),
            outputs: config.outputs.values().collect(),
            locals: config.locals.values().collect(),
            providers: &config.providers,
            modules: config.modules.values().collect(),
            terraform: &config.terraform,
            variable_values: &config.variable_values,
            dependencies: analysis
                .dependencies
                .iter()
                .map(|(from, to)| (from.to_string(), to.iter().map(ToString::to_string).collect()))
                .collect(),
        }
    }
}

/// Report metadata.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    /// tfagent version
    pub version: String,
    /// Report generation timestamp
    pub timestamp: String,
    /// Analysed directory
    pub directory: String,
    /// Number of files parsed successfully
    pub files_parsed: usize,
}

/// Report summary.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub total_resources: usize,
    pub total_data_sources: usize,
    pub total_variables: usize,
    pub total_outputs: usize,
    pub total_locals: usize,
    pub total_modules: usize,
    pub total_providers: usize,
    pub total_dependency_edges: usize,
    pub has_parse_errors: bool,
    pub has_warnings: bool,
}

/// JSON representation of a per-file parse failure.
#[derive(Debug, Serialize)]
pub struct JsonParseError {
    /// File that failed
    pub file: String,
    /// Line, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Column, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Parser message
    pub message: String,
}

impl From<&TfAgentError> for JsonParseError {
    fn from(error: &TfAgentError) -> Self {
        match error {
            TfAgentError::HclParse { file, message, line, column, .. } => Self {
                file: file.display().to_string(),
                line: *line,
                column: *column,
                message: message.clone(),
            },
            other => Self {
                file: other.file().map(|p| p.display().to_string()).unwrap_or_default(),
                line: None,
                column: None,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryKind, EntryRef, ResourceKey, SourceLocation, Value};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn create_test_analysis() -> Analysis {
        let mut analysis = Analysis {
            directory: PathBuf::from("infra"),
            files: vec![PathBuf::from("infra/main.tf")],
            ..Default::default()
        };

        let key = ResourceKey::new("google_compute_network", "vpc");
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), Value::String("main".to_string()));
        attributes.insert("project".to_string(), Value::Expression("var.project_id".to_string()));
        analysis.configuration.resources.insert(
            key.clone(),
            ResourceEntry {
                key: key.clone(),
                attributes,
                nested_blocks: Vec::new(),
                location: SourceLocation::new("infra/main.tf", 1),
            },
        );
        analysis.dependencies.insert(
            EntryRef::resource(&key),
            BTreeSet::from([EntryRef::new(EntryKind::Variable, "project_id")]),
        );
        analysis.parse_errors.push(crate::err!(HclParse {
            file: PathBuf::from("infra/broken.tf"),
            message: "unexpected end of input".to_string(),
            line: Some(4),
            column: None,
        }));
        analysis
    }

    #[test]
    fn test_json_report_generation() {
        let reporter = JsonReporter::new(&Config::default());
        let json = reporter.generate(&create_test_analysis()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["metadata"]["files_parsed"], 1);
        assert_eq!(parsed["summary"]["total_resources"], 1);
        assert_eq!(parsed["summary"]["has_parse_errors"], true);
        assert_eq!(parsed["resources"][0]["key"]["resource_type"], "google_compute_network");
        assert_eq!(parsed["resources"][0]["attributes"]["name"]["type"], "string");
        assert_eq!(parsed["resources"][0]["attributes"]["project"]["value"], "var.project_id");
        assert_eq!(parsed["resources"][0]["location"]["line"], 1);
        assert_eq!(parsed["dependencies"]["google_compute_network.vpc"][0], "var.project_id");
        assert_eq!(parsed["parse_errors"][0]["line"], 4);
        assert!(parsed["parse_errors"][0].get("column").is_none());
    }

    #[test]
    fn test_lint_json() {
        let report = LintReport::from_analysis(&create_test_analysis());
        let json = JsonReporter::new(&Config::default()).generate_lint(&report).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["files"][0]["path"], "infra/broken.tf");
        assert_eq!(parsed["files"][0]["valid"], false);
        assert_eq!(parsed["files"][1]["valid"], true);
        assert!(parsed["findings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_compact_output() {
        let mut config = Config::default();
        config.output.pretty = false;
        let json = JsonReporter::new(&config)
            .generate(&Analysis::default())
            .unwrap();
        assert!(!json.contains('\n'));
    }
}
