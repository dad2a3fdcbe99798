//! Question answering and code review on top of a local model.
//!
//! The [`Agent`] analyzes a directory, hands the result to the
//! [`PromptBuilder`], sends the prompts through a
//! [`ModelClient`](crate::model::ModelClient) and picks the Terraform code
//! out of the answer.
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌───────────────┐    ┌───────────────┐
//! │ Analyzer │───▶│ PromptBuilder│───▶│ ModelClient   │───▶│ AgentResponse │
//! └──────────┘    └──────────────┘    └───────────────┘    └───────────────┘
//! ```
//!
//! Model failures come back as errors. Nothing is retried.

mod prompt;
mod session;

pub use prompt::{PromptBuilder, WorkspaceContext, REVIEW_INSTRUCTION};
pub use session::{Reply, Session, SESSION_HELP};

use crate::config::Config;
use crate::error::{Result, TfAgentError};
use crate::model::{GenerationRequest, ModelClient};
use crate::parser::ConfigurationLoader;
use crate::types::ParsedFile;
use crate::Analyzer;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;

const SUGGESTION_KEYWORDS: [&str; 4] = ["suggest", "recommend", "consider", "should"];
const ISSUE_KEYWORDS: [&str; 5] = ["issue", "problem", "error", "warning", "security risk"];
const IMPROVEMENT_KEYWORDS: [&str; 4] = ["improve", "optimize", "enhance", "better"];

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentResponse {
    /// Full response text
    pub text: String,
    /// Bodies of the `hcl`/`terraform`/`tf` fenced blocks, in order
    pub code_blocks: Vec<String>,
}

impl AgentResponse {
    /// Wrap a raw model answer.
    #[must_use]
    pub fn new(text: String) -> Self {
        let code_blocks = extract_code_blocks(&text);
        Self { text, code_blocks }
    }

    /// Sort the answer's lines into review categories by keyword.
    #[must_use]
    pub fn findings(&self) -> ReviewFindings {
        ReviewFindings::from_text(&self.text)
    }
}

/// Review lines grouped by the keywords they contain.
///
/// A line may land in more than one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewFindings {
    /// Lines proposing changes
    pub suggestions: Vec<String>,
    /// Lines pointing at problems
    pub issues: Vec<String>,
    /// Lines about making things better
    pub improvements: Vec<String>,
}

impl ReviewFindings {
    fn from_text(text: &str) -> Self {
        let mut findings = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let lower = line.to_lowercase();
            let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

            if has(&SUGGESTION_KEYWORDS) {
                findings.suggestions.push(line.to_string());
            }
            if has(&ISSUE_KEYWORDS) {
                findings.issues.push(line.to_string());
            }
            if has(&IMPROVEMENT_KEYWORDS) {
                findings.improvements.push(line.to_string());
            }
        }
        findings
    }

    /// Whether no line matched any group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty() && self.issues.is_empty() && self.improvements.is_empty()
    }
}

/// Terraform assistant backed by a [`ModelClient`].
pub struct Agent<C> {
    client: C,
    config: Config,
}

impl<C: ModelClient> Agent<C> {
    /// Create an agent using `client` for generation.
    #[must_use]
    pub const fn new(client: C, config: Config) -> Self {
        Self { client, config }
    }

    /// The model client in use.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Answer `query`, with the contents and analysis of `directory` as
    /// context when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be analyzed or the model
    /// call fails.
    pub async fn ask(&self, query: &str, directory: Option<&Path>) -> Result<AgentResponse> {
        let context = match directory {
            Some(dir) => Some(self.gather_context(dir).await?),
            None => None,
        };

        let builder = PromptBuilder::new(&self.config.agent);
        let request = GenerationRequest::from_config(
            &self.config.model,
            builder.user_prompt(query, context.as_ref()),
        )
        .with_system(builder.system_prompt());

        tracing::info!(
            model = %request.model,
            host = %self.client.host(),
            with_context = context.is_some(),
            "Asking model"
        );
        let text = self.client.generate(request).await?;

        let response = AgentResponse::new(text);
        tracing::debug!(code_blocks = response.code_blocks.len(), "Model answered");
        Ok(response)
    }

    /// Ask the model to review the configuration in `directory`.
    ///
    /// # Errors
    ///
    /// Same as [`Agent::ask`].
    pub async fn review(&self, directory: &Path) -> Result<AgentResponse> {
        self.ask(REVIEW_INSTRUCTION, Some(directory)).await
    }

    /// Ask the model how to fix `issue` in the file at `path`.
    ///
    /// The proposed configuration is in the response's `code_blocks`.
    ///
    /// # Errors
    ///
    /// Returns `FileRead` if the file cannot be read, or the model error.
    pub async fn suggest_fix(&self, path: &Path, issue: &str) -> Result<AgentResponse> {
        let raw_text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TfAgentError::file_read(path, e, file!(), line!()))?;
        let file = ParsedFile::new(path, raw_text);

        let builder = PromptBuilder::new(&self.config.agent);
        let request = GenerationRequest::from_config(&self.config.model, builder.fix_prompt(&file, issue))
            .with_system(builder.system_prompt());

        tracing::info!(file = %path.display(), model = %request.model, "Asking model for a fix");
        let response = AgentResponse::new(self.client.generate(request).await?);
        if response.code_blocks.is_empty() {
            tracing::warn!(file = %path.display(), "Model answer contains no Terraform code");
        }
        Ok(response)
    }

    async fn gather_context(&self, directory: &Path) -> Result<WorkspaceContext> {
        let files = ConfigurationLoader::new(&self.config)
            .load_directory(directory)
            .await?;
        let analysis = Analyzer::new(self.config.clone()).analyze_files(directory, &files)?;
        Ok(WorkspaceContext { files, analysis })
    }
}

/// Bodies of ```` ```hcl ````, ```` ```terraform ```` and ```` ```tf ````
/// fenced blocks, in order of appearance.
#[must_use]
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:hcl|terraform|tf)[ \t]*\r?\n(.*?)\r?\n?```").ok())
        .as_ref()
    else {
        return Vec::new();
    };

    re.captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
