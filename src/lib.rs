//! # tfagent
//!
//! A Terraform configuration analyzer and local-model assistant.
//!
//! tfagent reads the Terraform files of a directory, parses them as HCL2,
//! extracts resources, variables, outputs, locals, providers, modules and
//! settings, lists the references between them, and can hand that context
//! to a locally running Ollama model to answer questions or review code.
//!
//! ## Features
//!
//! - **HCL parsing**: Structural blocks with approximate source lines
//! - **Semantic extraction**: Typed entries keyed the way Terraform keys them
//! - **Dependency listing**: Textual `var.`/`local.`/`module.`/`data.` and
//!   resource references, exportable as DOT, Mermaid or JSON
//! - **Reports**: Plain text and JSON
//! - **Validation**: Best-practice checks with a per-file Valid/Invalid table
//! - **Local model**: Prompt building and Ollama access for `ask`/`review`
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfagent::{Analyzer, Config, ReportFormat};
//! use tfagent::reporter::Reporter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let analyzer = Analyzer::new(config.clone());
//!
//!     let analysis = analyzer.analyze_directory("./terraform").await?;
//!
//!     let report = Reporter::new(&config).generate(&analysis, ReportFormat::Json)?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod lint;
pub mod model;
pub mod parser;
pub mod reporter;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use dependencies::list_dependencies;
pub use error::{Result, TfAgentError};
pub use extractor::extract_configuration;
pub use lint::{lint_configuration, LintReport};
pub use types::{
    Analysis, Block, DependencyMap, EntryKind, EntryRef, GraphFormat, ParsedConfiguration,
    ParsedFile, ReportFormat, SourceLocation, Value,
};

use crate::error::ErrorCollector;
use crate::extractor::Extractor;
use crate::parser::{ConfigurationLoader, HclParser, Parser};
use crate::types::Document;
use rayon::prelude::*;
use std::path::Path;

/// Pipeline orchestrator: load, parse, extract, list dependencies.
///
/// Nothing is cached between calls; every analysis starts from the files on
/// disk.
///
/// # Example
///
/// ```rust,no_run
/// use tfagent::{Analyzer, Config};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let analyzer = Analyzer::new(Config::default());
///     let analysis = analyzer.analyze_directory("./infra").await?;
///
///     println!("Found {} resources", analysis.configuration.resources.len());
///     Ok(())
/// }
/// ```
pub struct Analyzer {
    config: Config,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// The configuration this analyzer runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze every Terraform file in a directory.
    ///
    /// Files that fail to parse are reported in [`Analysis::parse_errors`]
    /// and left out of the configuration; the rest are still analyzed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist or a file can't be read
    /// - Two files define the same entry
    /// - A block is structurally invalid (e.g. a resource with one label)
    pub async fn analyze_directory<P: AsRef<Path>>(&self, path: P) -> Result<Analysis> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Analyzing directory");

        let files = ConfigurationLoader::new(&self.config)
            .load_directory(path)
            .await?;
        self.analyze_files(path, &files)
    }

    /// Analyze files that were already loaded from `directory`.
    ///
    /// # Errors
    ///
    /// Same as [`Analyzer::analyze_directory`], minus the load errors.
    pub fn analyze_files(&self, directory: &Path, files: &[ParsedFile]) -> Result<Analysis> {
        let parser = HclParser::new();
        let results: Vec<Result<Document>> = if self.config.scan.parallel {
            files.par_iter().map(|file| parser.parse_document(file)).collect()
        } else {
            files.iter().map(|file| parser.parse_document(file)).collect()
        };

        let mut documents = Vec::with_capacity(results.len());
        let mut collector = ErrorCollector::new();
        for result in results {
            match result {
                Ok(document) => documents.push(document),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        file = %e.file().map(|p| p.display().to_string()).unwrap_or_default(),
                        error = %e,
                        "Skipping file that failed to parse"
                    );
                    collector.add(e);
                }
                Err(e) => return Err(e),
            }
        }

        let mut extractor = Extractor::new();
        for document in &documents {
            extractor.add_document(document)?;
        }
        let configuration = extractor.finish();
        let dependencies = list_dependencies(&configuration);

        let analysis = Analysis {
            directory: directory.to_path_buf(),
            files: documents.into_iter().map(|d| d.path).collect(),
            configuration,
            parse_errors: collector.into_sorted(),
            dependencies,
        };

        tracing::info!(
            path = %directory.display(),
            files = analysis.files.len(),
            parse_errors = analysis.parse_errors.len(),
            resources = analysis.configuration.resources.len(),
            variables = analysis.configuration.variables.len(),
            outputs = analysis.configuration.outputs.len(),
            modules = analysis.configuration.modules.len(),
            "Analysis complete"
        );

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn files() -> Vec<ParsedFile> {
        vec![
            ParsedFile::new("infra/broken.tf", "resource \"x\" \"y\" {\n  name = \"unterminated\n}\n"),
            ParsedFile::new(
                "infra/main.tf",
                "resource \"google_compute_network\" \"vpc\" {\n  name = var.network_name\n}\n",
            ),
            ParsedFile::new("infra/variables.tf", "variable \"network_name\" {\n  type = string\n}\n"),
        ]
    }

    #[test]
    fn test_parse_failures_are_isolated() {
        let analyzer = Analyzer::new(Config::default());
        let analysis = analyzer.analyze_files(Path::new("infra"), &files()).unwrap();

        assert_eq!(analysis.files.len(), 2);
        assert_eq!(analysis.parse_errors.len(), 1);
        assert_eq!(analysis.parse_errors[0].file(), Some(Path::new("infra/broken.tf")));
        assert_eq!(analysis.configuration.resources.len(), 1);
        assert_eq!(analysis.total_files(), 3);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let parallel = Analyzer::new(Config::default())
            .analyze_files(Path::new("infra"), &files())
            .unwrap();

        let mut config = Config::default();
        config.scan.parallel = false;
        let sequential = Analyzer::new(config)
            .analyze_files(Path::new("infra"), &files())
            .unwrap();

        assert_eq!(parallel.files, sequential.files);
        assert_eq!(parallel.configuration, sequential.configuration);
        assert_eq!(parallel.dependencies, sequential.dependencies);
    }

    #[test]
    fn test_duplicates_are_fatal() {
        let files = vec![
            ParsedFile::new("a.tf", "variable \"region\" {}\n"),
            ParsedFile::new("b.tf", "variable \"region\" {}\n"),
        ];
        let result = Analyzer::new(Config::default()).analyze_files(Path::new("."), &files);
        assert!(matches!(result, Err(TfAgentError::DuplicateDefinition { .. })));
    }
}
