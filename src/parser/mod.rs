//! Loading and structural parsing of Terraform configuration files.
//!
//! This module turns a directory into [`ParsedFile`]s and each file into a
//! structural [`Document`]: blocks with their labels, attributes, nested
//! blocks and approximate source lines. No Terraform meaning is attached
//! here; that happens in [`crate::extractor`].
//!
//! # Supported Files
//!
//! - `.tf` Terraform configuration
//! - `.tfvars` variable assignments
//! - `.hcl` generic HCL (e.g. Terragrunt)
//!
//! # Example
//!
//! ```rust,ignore
//! use tfagent::parser::{ConfigurationLoader, HclParser};
//! use tfagent::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let files = ConfigurationLoader::new(&config)
//!         .load_directory("./terraform".as_ref())
//!         .await?;
//!
//!     let parser = HclParser::new();
//!     for file in &files {
//!         let blocks = parser.parse_file(file)?;
//!         println!("{}: {} blocks", file.path.display(), blocks.len());
//!     }
//!     Ok(())
//! }
//! ```

mod hcl;
mod loader;

pub use hcl::HclParser;
pub use loader::ConfigurationLoader;

use crate::types::{Document, ParsedFile};

/// File extensions to scan for configuration files.
pub const TERRAFORM_EXTENSIONS: &[&str] = &[".tf", ".tfvars", ".hcl"];

/// Directories and files never worth descending into.
pub const SKIP_FILES: &[&str] = &[".terraform", ".terragrunt-cache", "terraform.tfstate"];

/// Trait for turning one file into its structural representation.
///
/// This allows for different parsing implementations
/// (e.g., for testing with canned documents).
pub trait Parser: Send + Sync {
    /// Parse a single file.
    ///
    /// # Errors
    ///
    /// Returns `HclParse` if the file is not valid HCL.
    fn parse_document(&self, file: &ParsedFile) -> crate::Result<Document>;
}
