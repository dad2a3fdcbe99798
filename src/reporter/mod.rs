//! Report generation module.
//!
//! This module renders an [`Analysis`], or a [`LintReport`] built from one,
//! in two formats:
//! - JSON: Machine-readable structured output
//! - Text: Human-readable CLI output
//!
//! # Example
//!
//! ```rust,ignore
//! use tfagent::reporter::Reporter;
//! use tfagent::types::ReportFormat;
//!
//! let reporter = Reporter::new(&config);
//! println!("{}", reporter.generate(&analysis, ReportFormat::Text)?);
//! ```

mod json;
mod text;

use crate::config::Config;
use crate::error::Result;
use crate::lint::LintReport;
use crate::types::{Analysis, ReportFormat};

pub use json::{JsonReport, JsonReporter};
pub use text::TextReporter;

/// Report generator that supports multiple output formats.
pub struct Reporter {
    config: Config,
    strict: bool,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            strict: false,
        }
    }

    /// Treat warnings as failures in the report status.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Generate a report in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    pub fn generate(&self, analysis: &Analysis, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => JsonReporter::new(&self.config).generate(analysis),
            ReportFormat::Text => TextReporter::new(&self.config)
                .with_strict(self.strict)
                .generate(analysis),
        }
    }

    /// Render a lint run in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn generate_lint(&self, report: &LintReport, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => JsonReporter::new(&self.config).generate_lint(report),
            ReportFormat::Text => Ok(TextReporter::new(&self.config)
                .with_strict(self.strict)
                .generate_lint(report)),
        }
    }
}

/// Trait for report generators.
pub trait ReportGenerator {
    /// Generate a report from an analysis.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    fn generate(&self, analysis: &Analysis) -> Result<String>;
}
