//! Core data types used throughout tfagent.
//!
//! This module defines the fundamental data structures for representing:
//! - Source files and locations
//! - The structural HCL representation ([`Block`], [`Value`])
//! - The semantic Terraform view ([`ParsedConfiguration`])
//! - Dependency listings and pipeline results

use crate::error::TfAgentError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where something was defined.
///
/// The line is 1-based and approximate: it points at the block header as
/// located in the raw text. A line of `0` means it could not be located.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the definition lives in
    pub file: PathBuf,
    /// Approximate 1-based line
    pub line: usize,
}

impl SourceLocation {
    /// Create a new location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

/// The flavour of a configuration file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `.tf` configuration
    Terraform,
    /// `.tfvars` variable assignments
    Tfvars,
    /// Generic `.hcl` file
    Hcl,
}

impl FileKind {
    /// Classify a path by extension. Returns `None` for unsupported files.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tf") => Some(Self::Terraform),
            Some("tfvars") => Some(Self::Tfvars),
            Some("hcl") => Some(Self::Hcl),
            _ => None,
        }
    }
}

/// One configuration file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    /// Path of the file (unique per load)
    pub path: PathBuf,
    /// Full file contents
    pub raw_text: String,
    /// File flavour
    pub kind: FileKind,
}

impl ParsedFile {
    /// Build a file from in-memory text, classifying it by extension.
    ///
    /// Unknown extensions are treated as generic HCL.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, raw_text: impl Into<String>) -> Self {
        let path = path.into();
        let kind = FileKind::from_path(&path).unwrap_or(FileKind::Hcl);
        Self {
            path,
            raw_text: raw_text.into(),
            kind,
        }
    }
}

/// An HCL attribute value.
///
/// Literals are kept as literals; anything that would need evaluation
/// (interpolation, traversals, function calls, operators, conditionals,
/// `for` expressions) is kept as its source text in [`Value::Expression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// `null`
    Null,
    /// A string literal or a heredoc without interpolation
    String(String),
    /// A number literal
    Number(f64),
    /// A boolean literal
    Bool(bool),
    /// A tuple / list
    List(Vec<Value>),
    /// An object / map
    Map(BTreeMap<String, Value>),
    /// An unevaluated expression, as HCL text
    Expression(String),
}

impl Value {
    /// Borrow the string literal, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean literal, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value is an opaque expression.
    #[must_use]
    pub const fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }

    /// String literals and expressions as text; other values rendered as HCL.
    ///
    /// Used where a raw, human-readable form is wanted (variable types,
    /// output values, locals).
    #[must_use]
    pub fn raw_text(&self) -> String {
        match self {
            Self::String(s) | Self::Expression(s) => s.clone(),
            other => other.expression_text(),
        }
    }

    /// Render the value back to HCL-like text.
    #[must_use]
    pub fn expression_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::String(s) => format!("{s:?}"),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::expression_text).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k} = {}", v.expression_text()))
                    .collect();
                format!("{{ {} }}", inner.join(", "))
            }
            Self::Expression(expr) => expr.clone(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression_text())
    }
}

/// A structural HCL block, before any Terraform interpretation.
///
/// # Example HCL
///
/// ```hcl
/// resource "google_compute_firewall" "allow_ssh" {
///   network = google_compute_network.vpc.id
///   allow {
///     protocol = "tcp"
///     ports    = ["22"]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block type identifier (e.g. "resource")
    pub block_type: String,
    /// Ordered labels (may be empty)
    pub labels: Vec<String>,
    /// Attribute assignments
    pub attributes: BTreeMap<String, Value>,
    /// Child blocks in source order
    pub nested_blocks: Vec<Block>,
    /// Where the block header is
    pub location: SourceLocation,
}

impl Block {
    /// Label at `index`, if present.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Child blocks of a given type.
    pub fn nested<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.nested_blocks
            .iter()
            .filter(move |b| b.block_type == block_type)
    }

    /// `type "label" "label"` header, as written in HCL.
    #[must_use]
    pub fn header(&self) -> String {
        block_header(&self.block_type, &self.labels)
    }
}

fn block_header(block_type: &str, labels: &[String]) -> String {
    let mut header = block_type.to_string();
    for label in labels {
        header.push_str(&format!(" {label:?}"));
    }
    header
}

/// A top-level `name = value` assignment outside any block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Attribute name
    pub name: String,
    /// Assigned value
    pub value: Value,
    /// Where it was assigned
    pub location: SourceLocation,
}

/// The structural parse of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Source file path
    pub path: PathBuf,
    /// File flavour
    pub kind: FileKind,
    /// Top-level blocks in source order
    pub blocks: Vec<Block>,
    /// Top-level attributes in source order
    pub assignments: Vec<Assignment>,
}

// =============================================================================
// Semantic model
// =============================================================================

/// Identity of a resource or data source: `(type, name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource type (e.g. "google_compute_network")
    pub resource_type: String,
    /// Local name (e.g. "vpc")
    pub name: String,
}

impl ResourceKey {
    /// Create a new key.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// A `resource` or `data` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Type and name
    pub key: ResourceKey,
    /// Top-level attributes of the block
    pub attributes: BTreeMap<String, Value>,
    /// Sub-blocks kept verbatim (e.g. firewall `allow` rules)
    pub nested_blocks: Vec<Block>,
    /// Definition site
    pub location: SourceLocation,
}

/// A `variable` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Variable name
    pub name: String,
    /// `description`, if a string
    pub description: Option<String>,
    /// Raw type expression (e.g. `list(string)`)
    #[serde(rename = "type")]
    pub type_expr: Option<String>,
    /// Default value, structure preserved
    pub default: Option<Value>,
    /// `sensitive`, if set
    pub sensitive: Option<bool>,
    /// Whether at least one `validation` block is present
    pub has_validation: bool,
    /// Definition site
    pub location: SourceLocation,
}

/// An `output` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Output name
    pub name: String,
    /// `description`, if a string
    pub description: Option<String>,
    /// Raw value expression
    pub value: Option<String>,
    /// `sensitive`, if set
    pub sensitive: Option<bool>,
    /// Definition site
    pub location: SourceLocation,
}

/// One named local value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEntry {
    /// Local name
    pub name: String,
    /// Raw value expression
    pub value: String,
    /// Location of the enclosing `locals` block
    pub location: SourceLocation,
}

/// A `provider` configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider local name (e.g. "google")
    pub name: String,
    /// `alias`, if set
    pub alias: Option<String>,
    /// All attributes of the block
    pub attributes: BTreeMap<String, Value>,
    /// Definition site
    pub location: SourceLocation,
}

impl ProviderEntry {
    /// `name` or `name.alias`, the way Terraform refers to it.
    #[must_use]
    pub fn reference(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{alias}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A `module` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Module call name
    pub name: String,
    /// `source`, as written
    pub source: Option<String>,
    /// `version` constraint, as written
    pub version: Option<String>,
    /// Every other argument passed to the module
    pub attributes: BTreeMap<String, Value>,
    /// Definition site
    pub location: SourceLocation,
}

/// One entry of `terraform.required_providers`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequiredProvider {
    /// Provider source address (e.g. "hashicorp/google")
    pub source: Option<String>,
    /// Version constraint, as written
    pub version: Option<String>,
}

/// A `terraform` settings block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformSettings {
    /// `required_version`, as written
    pub required_version: Option<String>,
    /// `required_providers` entries by local name
    pub required_providers: BTreeMap<String, RequiredProvider>,
    /// Backend type label, if a `backend` block is present
    pub backend: Option<String>,
    /// Definition site
    pub location: SourceLocation,
}

/// A value assigned to an input variable in a `.tfvars` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Assigned value
    pub value: Value,
    /// Assignment site
    pub location: SourceLocation,
}

/// A block whose type is not part of the Terraform language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedBlock {
    /// Block type identifier
    pub block_type: String,
    /// Block labels
    pub labels: Vec<String>,
    /// Definition site
    pub location: SourceLocation,
}

impl UnrecognizedBlock {
    /// `type "label"` header, as written in HCL.
    #[must_use]
    pub fn header(&self) -> String {
        block_header(&self.block_type, &self.labels)
    }
}

/// The semantic view of every file in a directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedConfiguration {
    /// `resource` blocks
    pub resources: BTreeMap<ResourceKey, ResourceEntry>,
    /// `data` blocks
    pub data_sources: BTreeMap<ResourceKey, ResourceEntry>,
    /// `variable` declarations
    pub variables: BTreeMap<String, VariableEntry>,
    /// `output` declarations
    pub outputs: BTreeMap<String, OutputEntry>,
    /// Locals merged across every `locals` block
    pub locals: BTreeMap<String, LocalEntry>,
    /// `provider` blocks in source order
    pub providers: Vec<ProviderEntry>,
    /// `module` calls
    pub modules: BTreeMap<String, ModuleEntry>,
    /// `terraform` settings blocks
    pub terraform: Vec<TerraformSettings>,
    /// Values assigned in `.tfvars` files
    pub variable_values: BTreeMap<String, VariableValue>,
    /// Blocks of unknown type
    pub unrecognized: Vec<UnrecognizedBlock>,
    /// Top-level attributes found outside `.tfvars` files
    pub stray_attributes: Vec<Assignment>,
}

impl ParsedConfiguration {
    /// True when nothing at all was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
            && self.data_sources.is_empty()
            && self.variables.is_empty()
            && self.outputs.is_empty()
            && self.locals.is_empty()
            && self.providers.is_empty()
            && self.modules.is_empty()
            && self.terraform.is_empty()
            && self.variable_values.is_empty()
            && self.unrecognized.is_empty()
            && self.stray_attributes.is_empty()
    }

    /// Non-fatal diagnostics worth showing next to the results.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .unrecognized
            .iter()
            .map(|b| format!("{}: unrecognized block type '{}'", b.location, b.header()))
            .collect();

        warnings.extend(self.stray_attributes.iter().map(|a| {
            format!(
                "{}: top-level attribute '{}' outside of any block",
                a.location, a.name
            )
        }));

        warnings
    }

    /// Distinct provider names, from provider blocks, required_providers and
    /// resource type prefixes.
    #[must_use]
    pub fn provider_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.providers.iter().map(|p| p.name.clone()).collect();
        for settings in &self.terraform {
            names.extend(settings.required_providers.keys().cloned());
        }
        for key in self.resources.keys().chain(self.data_sources.keys()) {
            if let Some((prefix, _)) = key.resource_type.split_once('_') {
                names.insert(prefix.to_string());
            }
        }
        names
    }
}

// =============================================================================
// Dependency listing
// =============================================================================

/// The kind of a configuration entry that can reference or be referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// `resource`
    Resource,
    /// `data`
    DataSource,
    /// `variable`
    Variable,
    /// `output`
    Output,
    /// a local value
    Local,
    /// `module`
    Module,
    /// `provider`
    Provider,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resource => "resource",
            Self::DataSource => "data source",
            Self::Variable => "variable",
            Self::Output => "output",
            Self::Local => "local",
            Self::Module => "module",
            Self::Provider => "provider",
        };
        f.write_str(name)
    }
}

/// A `(kind, key)` pair naming one entry of a configuration.
///
/// Resources and data sources use `type.name` as key; everything else uses
/// the bare name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    /// Entry kind
    pub kind: EntryKind,
    /// Entry key
    pub key: String,
}

impl EntryRef {
    /// Create a reference from a kind and key.
    #[must_use]
    pub fn new(kind: EntryKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    /// Reference to a resource.
    #[must_use]
    pub fn resource(key: &ResourceKey) -> Self {
        Self::new(EntryKind::Resource, key.to_string())
    }

    /// Reference to a data source.
    #[must_use]
    pub fn data_source(key: &ResourceKey) -> Self {
        Self::new(EntryKind::DataSource, key.to_string())
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntryKind::Resource | EntryKind::Provider => f.write_str(&self.key),
            EntryKind::DataSource => write!(f, "data.{}", self.key),
            EntryKind::Variable => write!(f, "var.{}", self.key),
            EntryKind::Output => write!(f, "output.{}", self.key),
            EntryKind::Local => write!(f, "local.{}", self.key),
            EntryKind::Module => write!(f, "module.{}", self.key),
        }
    }
}

/// For each entry, the set of entries it textually references.
pub type DependencyMap = BTreeMap<EntryRef, BTreeSet<EntryRef>>;

// =============================================================================
// Pipeline result
// =============================================================================

/// Everything one directory analysis produced.
#[derive(Debug, Default)]
pub struct Analysis {
    /// The analysed directory
    pub directory: PathBuf,
    /// Files that parsed successfully, sorted
    pub files: Vec<PathBuf>,
    /// Semantic view of the successfully parsed files
    pub configuration: ParsedConfiguration,
    /// Per-file syntax errors, sorted by file
    pub parse_errors: Vec<TfAgentError>,
    /// Textual dependency listing
    pub dependencies: DependencyMap,
}

impl Analysis {
    /// Whether any file failed to parse.
    #[must_use]
    pub fn has_parse_errors(&self) -> bool {
        !self.parse_errors.is_empty()
    }

    /// Total files seen, parsed or not.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.files.len() + self.parse_errors.len()
    }

    /// Non-fatal warnings of the configuration.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.configuration.warnings()
    }
}

// =============================================================================
// Output formats
// =============================================================================

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ReportFormat {
    /// Plain text format
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Graph output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum GraphFormat {
    /// DOT format (Graphviz)
    #[default]
    Dot,
    /// JSON format
    Json,
    /// Mermaid diagram format
    Mermaid,
}
