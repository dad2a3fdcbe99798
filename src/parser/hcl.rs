//! HCL file parser implementation.
//!
//! This module provides the structural parsing functionality using the `hcl-rs` crate.
//! It converts the `hcl-rs` body into the crate's own [`Block`] and [`Value`]
//! types, keeping every non-literal expression as HCL text.

use crate::error::{Result, TfAgentError};
use crate::parser::Parser;
use crate::types::{Assignment, Block, Document, ParsedFile, SourceLocation, Value};

use hcl::{Body, Expression, ObjectKey, Structure, TemplateExpr};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// HCL parser for Terraform files.
#[derive(Debug, Clone, Copy, Default)]
pub struct HclParser;

impl HclParser {
    /// Create a new HCL parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse a file into its top-level blocks.
    ///
    /// # Errors
    ///
    /// Returns `HclParse` if the file is not valid HCL.
    pub fn parse_file(&self, file: &ParsedFile) -> Result<Vec<Block>> {
        self.parse_document(file).map(|doc| doc.blocks)
    }

    /// Parse raw HCL text attributed to `path`.
    ///
    /// # Errors
    ///
    /// Returns `HclParse` if the text is not valid HCL.
    pub fn parse_str(&self, content: &str, path: &Path) -> Result<Vec<Block>> {
        self.parse_document(&ParsedFile::new(path, content))
            .map(|doc| doc.blocks)
    }
}

impl Parser for HclParser {
    fn parse_document(&self, file: &ParsedFile) -> Result<Document> {
        let body: Body = hcl::from_str(&file.raw_text)
            .map_err(|e| parse_error(&file.path, &e))?;

        let locator = LineLocator::new(&file.raw_text);
        let mut cursor = 0;
        let mut blocks = Vec::new();
        let mut assignments = Vec::new();

        for structure in body.into_inner() {
            match structure {
                Structure::Block(block) => {
                    let converted = convert_block(&block, &file.path, &locator, &mut cursor);
                    blocks.push(converted);
                }
                Structure::Attribute(attr) => {
                    let name = attr.key.as_str().to_string();
                    let line = match locator.find_assignment(&name, cursor) {
                        Some(line) => {
                            cursor = line + 1;
                            line
                        }
                        None => 0,
                    };
                    assignments.push(Assignment {
                        value: convert_expression(&attr.expr),
                        location: SourceLocation::new(&file.path, line),
                        name,
                    });
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        tracing::debug!(
            file = %file.path.display(),
            blocks = blocks.len(),
            assignments = assignments.len(),
            "Parsed file"
        );

        Ok(Document {
            path: file.path.clone(),
            kind: file.kind,
            blocks,
            assignments,
        })
    }
}

/// Build an `HclParse` error, pulling line and column out of the message
/// when the underlying parser reports them.
fn parse_error(path: &Path, error: &hcl::Error) -> TfAgentError {
    static POSITION: OnceLock<Option<Regex>> = OnceLock::new();

    let message = error.to_string();
    let position = POSITION
        .get_or_init(|| Regex::new(r"line (\d+), column (\d+)").ok())
        .as_ref()
        .and_then(|re| re.captures(&message))
        .map(|caps| (caps[1].parse::<usize>().ok(), caps[2].parse::<usize>().ok()));

    let (line, column) = position.unwrap_or((None, None));
    let message = message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("-->") && !l.starts_with('|'))
        .last()
        .map_or("invalid HCL", |l| l.trim_start_matches("= ").trim())
        .to_string();

    TfAgentError::hcl_parse(path.to_path_buf(), message, line, column, file!(), line!())
}

/// Convert an `hcl-rs` block, locating its header line in the raw text.
fn convert_block(block: &hcl::Block, path: &Path, locator: &LineLocator, cursor: &mut usize) -> Block {
    let block_type = block.identifier.as_str().to_string();
    let labels: Vec<String> = block.labels.iter().map(|l| l.as_str().to_string()).collect();

    let line = match locator.find_block(&block_type, &labels, *cursor) {
        Some(line) => {
            *cursor = line + 1;
            line
        }
        None => 0,
    };

    let attributes = block
        .body
        .attributes()
        .map(|attr| (attr.key.as_str().to_string(), convert_expression(&attr.expr)))
        .collect();

    let mut nested_cursor = *cursor;
    let nested_blocks = block
        .body
        .blocks()
        .map(|nested| convert_block(nested, path, locator, &mut nested_cursor))
        .collect();

    Block {
        block_type,
        labels,
        attributes,
        nested_blocks,
        location: SourceLocation::new(path, line),
    }
}

/// Convert an expression into a [`Value`].
///
/// Literals map directly; everything that would need evaluation is kept as
/// its HCL text.
fn convert_expression(expr: &Expression) -> Value {
    match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(*b),
        Expression::Number(n) => n
            .as_f64()
            .map_or_else(|| Value::Expression(n.to_string()), Value::Number),
        Expression::String(s) => Value::String(s.clone()),
        Expression::Array(items) => Value::List(items.iter().map(convert_expression).collect()),
        Expression::Object(obj) => {
            let map: BTreeMap<String, Value> = obj
                .iter()
                .map(|(key, value)| (object_key_to_string(key), convert_expression(value)))
                .collect();
            Value::Map(map)
        }
        Expression::TemplateExpr(template) => convert_template(template, expr),
        other => Value::Expression(expression_to_string(other)),
    }
}

/// Templates without interpolation or directives are plain strings.
fn convert_template(template: &TemplateExpr, expr: &Expression) -> Value {
    let literal = match template {
        TemplateExpr::QuotedString(s) => Some(s.as_str()),
        TemplateExpr::Heredoc(heredoc) => Some(heredoc.template.as_str()),
        #[allow(unreachable_patterns)]
        _ => None,
    };

    match literal {
        Some(text) if !has_template_sequence(text) => Value::String(unescape_template(text)),
        _ => Value::Expression(expression_to_string(expr)),
    }
}

/// Whether `text` holds an unescaped `${` or `%{`. `$${` and `%%{` are literals.
fn has_template_sequence(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'$', b'$') | (b'%', b'%') if bytes.get(i + 2) == Some(&b'{') => i += 3,
            (b'$' | b'%', b'{') => return true,
            _ => i += 1,
        }
    }
    false
}

fn unescape_template(text: &str) -> String {
    text.replace("$${", "${").replace("%%{", "%{")
}

/// Render an expression back to HCL text.
fn expression_to_string(expr: &Expression) -> String {
    expr.to_string().trim().to_string()
}

/// Convert an object key to a string.
fn object_key_to_string(key: &ObjectKey) -> String {
    match key {
        ObjectKey::Identifier(id) => id.as_str().to_string(),
        ObjectKey::Expression(Expression::String(s)) => s.clone(),
        ObjectKey::Expression(expr) => expression_to_string(expr),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}

/// Approximate line lookup over the raw file text.
///
/// `hcl-rs` bodies carry no spans, so block headers are found by matching
/// `type "label" ... {` line by line, searching forward from a cursor so that
/// repeated headers resolve in source order.
struct LineLocator<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineLocator<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
        }
    }

    /// 1-based line of the block header at or after line `from`.
    fn find_block(&self, block_type: &str, labels: &[String], from: usize) -> Option<usize> {
        let mut pattern = format!(r"^\s*{}", regex::escape(block_type));
        for label in labels {
            pattern.push_str(&format!(r#"\s+"?{}"?"#, regex::escape(label)));
        }
        pattern.push_str(r"\s*(\{|$)");
        self.find(&pattern, from)
    }

    /// 1-based line of an unindented `name =` assignment at or after line `from`.
    fn find_assignment(&self, name: &str, from: usize) -> Option<usize> {
        let pattern = format!(r"^{}\s*=", regex::escape(name));
        self.find(&pattern, from)
    }

    fn find(&self, pattern: &str, from: usize) -> Option<usize> {
        let re = Regex::new(pattern).ok()?;
        let start = from.saturating_sub(1);
        self.lines
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, line)| re.is_match(line))
            .map(|(idx, _)| idx + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> Vec<Block> {
        HclParser::new()
            .parse_str(content, Path::new("main.tf"))
            .unwrap()
    }

    #[test]
    fn test_parse_resource_with_nested_blocks() {
        let blocks = parse(
            r#"
resource "google_compute_firewall" "allow_ssh" {
  name    = "allow-ssh"
  network = google_compute_network.vpc.id

  allow {
    protocol = "tcp"
    ports    = ["22"]
  }
}
"#,
        );

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.block_type, "resource");
        assert_eq!(block.labels, vec!["google_compute_firewall", "allow_ssh"]);
        assert_eq!(block.location.line, 2);
        assert_eq!(block.attribute("name"), Some(&Value::String("allow-ssh".to_string())));
        assert_eq!(
            block.attribute("network"),
            Some(&Value::Expression("google_compute_network.vpc.id".to_string()))
        );

        let allow = &block.nested_blocks[0];
        assert_eq!(allow.block_type, "allow");
        assert!(allow.labels.is_empty());
        assert_eq!(allow.location.line, 6);
        assert_eq!(
            allow.attribute("ports"),
            Some(&Value::List(vec![Value::String("22".to_string())]))
        );
    }

    #[test]
    fn test_scalar_values() {
        let blocks = parse(
            r#"
variable "settings" {
  default = {
    enabled = true
    count   = 3
    ratio   = 0.5
    nothing = null
  }
}
"#,
        );

        let Some(Value::Map(map)) = blocks[0].attribute("default") else {
            panic!("expected map default");
        };
        assert_eq!(map["enabled"], Value::Bool(true));
        assert_eq!(map["count"], Value::Number(3.0));
        assert_eq!(map["ratio"], Value::Number(0.5));
        assert_eq!(map["nothing"], Value::Null);
    }

    #[test]
    fn test_interpolation_is_kept_as_expression() {
        let blocks = parse(
            r#"
locals {
  name   = "${var.project}-network"
  region = upper(var.region)
  zones  = [for z in var.zones : z if z != ""]
}
"#,
        );

        let locals = &blocks[0];
        assert!(locals.labels.is_empty());
        for key in ["name", "region", "zones"] {
            let value = locals.attribute(key).unwrap();
            assert!(value.is_expression(), "{key} should be an expression: {value:?}");
        }
        assert!(locals.attribute("name").unwrap().raw_text().contains("var.project"));
    }

    #[test]
    fn test_heredoc_is_one_string() {
        let blocks = parse(
            "resource \"google_compute_instance\" \"vm\" {\n  metadata_startup_script = <<EOF\n#!/bin/bash\necho hello\nEOF\n}\n",
        );

        let script = blocks[0].attribute("metadata_startup_script").unwrap();
        let text = script.as_str().unwrap();
        assert!(text.contains("#!/bin/bash"));
        assert!(text.contains("echo hello"));
    }

    #[test]
    fn test_escaped_interpolation_stays_literal() {
        let blocks = parse("locals {\n  t = <<EOF\nplain $${x}\nEOF\n}\n");

        let heredoc = blocks[0].attribute("t").unwrap();
        assert_eq!(heredoc.as_str().map(str::trim_end), Some("plain ${x}"));
    }

    #[test]
    fn test_has_template_sequence() {
        assert!(has_template_sequence("${var.a}"));
        assert!(has_template_sequence("x %{ if true }y%{ endif }"));
        assert!(has_template_sequence("$${a} then ${b}"));
        assert!(!has_template_sequence("$${a}"));
        assert!(!has_template_sequence("%%{a} $ { }"));
        assert!(!has_template_sequence("cost: $5"));
    }

    #[test]
    fn test_comments_are_discarded() {
        let blocks = parse(
            r#"
# leading comment
// another
/* block
   comment */
output "id" {
  value = "x" # trailing
}
"#,
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].location.line, 6);
        assert_eq!(blocks[0].attributes.len(), 1);
    }

    #[test]
    fn test_repeated_headers_resolve_in_order() {
        let blocks = parse(
            r#"
provider "google" {
  region = "us-central1"
}

provider "google" {
  alias  = "west"
  region = "us-west1"
}
"#,
        );

        assert_eq!(blocks[0].location.line, 2);
        assert_eq!(blocks[1].location.line, 6);
    }

    #[test]
    fn test_top_level_assignments() {
        let file = ParsedFile::new("prod.tfvars", "project_id = \"demo\"\nzones = [\"a\", \"b\"]\n");
        let doc = HclParser::new().parse_document(&file).unwrap();

        assert!(doc.blocks.is_empty());
        assert_eq!(doc.assignments.len(), 2);
        assert_eq!(doc.assignments[0].name, "project_id");
        assert_eq!(doc.assignments[0].location.line, 1);
        assert_eq!(doc.assignments[1].location.line, 2);
    }

    #[test]
    fn test_parse_unterminated_string() {
        let result = HclParser::new().parse_str(
            "resource \"a\" \"b\" {\n  name = \"oops\n}\n",
            Path::new("broken.tf"),
        );

        match result {
            Err(TfAgentError::HclParse { file, .. }) => assert_eq!(file, Path::new("broken.tf")),
            other => panic!("expected HclParse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unbalanced_braces() {
        let result = HclParser::new().parse_str("this is not valid { hcl", Path::new("test.tf"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_error_message_is_clean() {
        let result = HclParser::new().parse_str(
            "resource \"a\" \"b\" {\n  = 1\n}\n",
            Path::new("broken.tf"),
        );

        match result {
            Err(TfAgentError::HclParse { message, .. }) => {
                assert!(!message.is_empty());
                assert!(!message.starts_with('='), "message kept marker: {message}");
            }
            other => panic!("expected HclParse, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_file() {
        assert!(parse("").is_empty());
        assert!(parse("# only a comment\n").is_empty());
    }
}
