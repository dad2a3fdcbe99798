//! Configuration module for tfagent.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`tfagent.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # tfagent.yaml
//!
//! # Scanning options
//! scan:
//!   recursive: false
//!   exclude_patterns:
//!     - "override.tf"
//!     - "*_override.tf"
//!   max_depth: 100
//!   parallel: true
//!
//! # Local model server
//! model:
//!   host: ${OLLAMA_HOST}  # Environment variable expansion
//!   name: codellama:7b-instruct
//!   temperature: 0.7
//!   max_tokens: 4096
//!   timeout_secs: 300
//!
//! # Prompt construction
//! agent:
//!   max_context_bytes: 65536
//!   docs_snapshot: "2024-06-22"
//!
//! # Output options
//! output:
//!   colored: true
//!   verbose: false
//!   pretty: true
//! ```

use crate::error::{Result, ResultExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Configuration files looked up in the working directory, in order.
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["tfagent.yaml", "tfagent.yml", ".tfagent.yaml"];

/// Scanning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Descend into subdirectories instead of reading only the root module.
    pub recursive: bool,

    /// File or directory name patterns to skip (glob patterns).
    pub exclude_patterns: Vec<String>,

    /// Maximum depth for recursive directory scanning.
    pub max_depth: usize,

    /// Parse files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            exclude_patterns: vec!["override.tf".to_string(), "*_override.tf".to_string()],
            max_depth: default_max_depth(),
            parallel: true,
        }
    }
}

/// Local model server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama server.
    pub host: String,

    /// Model name in `name:tag` form.
    pub name: String,

    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,

    /// Upper bound on generated tokens, 1 to 8192.
    pub max_tokens: u32,

    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            name: "codellama:7b-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 300,
        }
    }
}

/// Prompt construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Budget for file contents embedded in a prompt.
    pub max_context_bytes: usize,

    /// Date of the Terraform documentation snapshot the model is told about.
    pub docs_snapshot: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_context_bytes: 64 * 1024,
            docs_snapshot: "2024-06-22".to_string(),
        }
    }
}

/// Output formatting options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Use colored output.
    pub colored: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            colored: true,
            verbose: false,
            pretty: true,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanning options
    pub scan: ScanOptions,

    /// Model server settings
    pub model: ModelConfig,

    /// Prompt construction options
    pub agent: AgentOptions,

    /// Output options
    pub output: OutputOptions,
}

fn default_max_depth() -> usize {
    100
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content, |name| std::env::var(name).ok());

        let config: Self = serde_yaml::from_str(&expanded)
            .to_config_parse_error("Invalid configuration YAML".to_string())?;

        tracing::debug!(
            recursive = config.scan.recursive,
            exclude_patterns = config.scan.exclude_patterns.len(),
            model = %config.model.name,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::TfAgentError::file_read(path, e, file!(), line!()))?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration the CLI should run with.
    ///
    /// An explicit path wins. Otherwise the first of
    /// [`DEFAULT_CONFIG_FILES`] found in `working_dir` is used, then
    /// `<config dir>/tfagent/config.yaml`, then the defaults. Environment
    /// overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file is unreadable or invalid.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        let mut config = match discover(explicit, working_dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                Self::from_file(&path)?
            }
            None => {
                tracing::debug!("No configuration file found, using default configuration");
                Self::default()
            }
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `OLLAMA_HOST` and `TFAGENT_MODEL` on top of file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            tracing::debug!(host = %host, "Model host overridden from environment");
            self.model.host = host;
        }
        if let Some(name) = lookup("TFAGENT_MODEL").filter(|n| !n.trim().is_empty()) {
            tracing::debug!(model = %name, "Model name overridden from environment");
            self.model.name = name;
        }
    }

    /// Check value ranges and formats.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;

        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(crate::err!(ConfigValue {
                key: "model.temperature".to_string(),
                message: format!("must be between 0.0 and 2.0, got {}", model.temperature),
            }));
        }
        if !(1..=8192).contains(&model.max_tokens) {
            return Err(crate::err!(ConfigValue {
                key: "model.max_tokens".to_string(),
                message: format!("must be between 1 and 8192, got {}", model.max_tokens),
            }));
        }
        if model.timeout_secs == 0 {
            return Err(crate::err!(ConfigValue {
                key: "model.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }

        match url::Url::parse(&model.host) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
            Ok(parsed) => {
                return Err(crate::err!(ConfigValue {
                    key: "model.host".to_string(),
                    message: format!("expected an http(s) URL, got scheme '{}'", parsed.scheme()),
                }));
            }
            Err(e) => {
                return Err(crate::err!(ConfigValue {
                    key: "model.host".to_string(),
                    message: format!("'{}' is not a valid URL: {e}", model.host),
                }));
            }
        }

        let valid_name = model
            .name
            .split_once(':')
            .is_some_and(|(name, tag)| !name.is_empty() && !tag.is_empty());
        if !valid_name {
            return Err(crate::err!(ConfigValue {
                key: "model.name".to_string(),
                message: format!("expected 'name:tag', got '{}'", model.name),
            }));
        }

        if self.scan.max_depth == 0 {
            return Err(crate::err!(ConfigValue {
                key: "scan.max_depth".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }
        if self.agent.max_context_bytes == 0 {
            return Err(crate::err!(ConfigValue {
                key: "agent.max_context_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }

        Ok(())
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# tfagent configuration file

# Scanning options
scan:
  # Walk subdirectories instead of only the root module
  recursive: false
  # File or directory names to skip (glob patterns)
  exclude_patterns:
    - "override.tf"
    - "*_override.tf"
  max_depth: 100
  # Parse files in parallel
  parallel: true

# Local Ollama server
model:
  host: "http://localhost:11434"
  # Must be name:tag
  name: "codellama:7b-instruct"
  temperature: 0.7
  max_tokens: 4096
  timeout_secs: 300

# Prompt construction
agent:
  # Upper bound on file contents sent to the model
  max_context_bytes: 65536
  # Terraform documentation snapshot the model is told about
  docs_snapshot: "2024-06-22"

# Output options
output:
  colored: true
  verbose: false
  pretty: true
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::ScanArgs) {
        if args.recursive {
            self.scan.recursive = true;
        }
        if !args.exclude_patterns.is_empty() {
            self.scan
                .exclude_patterns
                .extend(args.exclude_patterns.iter().cloned());
        }
        if let Some(max_depth) = args.max_depth {
            self.scan.max_depth = max_depth;
        }
    }
}

/// Pick the configuration file to load, if any.
fn discover(explicit: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| working_dir.join(name))
        .find(|path| path.is_file())
        .or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("tfagent").join("config.yaml"))
                .filter(|path| path.is_file())
        })
}

/// Expand `${VAR}` and `$VAR` references. Unset variables are left as is.
fn expand_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").ok())
        .as_ref()
    else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex::Captures<'_>| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        lookup(name).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
