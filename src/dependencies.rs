//! Textual dependency listing.
//!
//! This is a best-effort scan, not a reference resolver: attribute text is
//! searched for `var.<name>`, `local.<name>`, `module.<name>`,
//! `data.<type>.<name>` and `<type>.<name>`, and a match only becomes an edge
//! when it names an entry that exists in the configuration.
//!
//! Known limitations:
//! - references spelled inside plain string literals are picked up
//! - dynamic references (`lookup(local.map, var.key)`) only yield the parts
//!   spelled literally
//! - no cycle detection and no ordering

use crate::types::{
    Block, DependencyMap, EntryKind, EntryRef, ParsedConfiguration, ResourceEntry, Value,
};

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_\-]*";

fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let pattern = format!(
                r"(?:^|[^\w.])(?:data\.({IDENT})\.({IDENT})|var\.({IDENT})|local\.({IDENT})|module\.({IDENT})|({IDENT})\.({IDENT}))"
            );
            Regex::new(&pattern).ok()
        })
        .as_ref()
}

/// List, for every resource, data source, output, local and module, the
/// entries its attribute text refers to.
///
/// Every scanned entry appears as a key, possibly with an empty set.
#[must_use]
pub fn list_dependencies(config: &ParsedConfiguration) -> DependencyMap {
    let known = known_entries(config);
    let mut map = BTreeMap::new();

    for entry in config.resources.values() {
        let from = EntryRef::resource(&entry.key);
        let refs = references(&resource_text(entry), &from, &known);
        map.insert(from, refs);
    }

    for entry in config.data_sources.values() {
        let from = EntryRef::data_source(&entry.key);
        let refs = references(&resource_text(entry), &from, &known);
        map.insert(from, refs);
    }

    for output in config.outputs.values() {
        let from = EntryRef::new(EntryKind::Output, &output.name);
        let text = output.value.clone().unwrap_or_default();
        let refs = references(&text, &from, &known);
        map.insert(from, refs);
    }

    for local in config.locals.values() {
        let from = EntryRef::new(EntryKind::Local, &local.name);
        let refs = references(&local.value, &from, &known);
        map.insert(from, refs);
    }

    for module in config.modules.values() {
        let from = EntryRef::new(EntryKind::Module, &module.name);
        let text = module
            .attributes
            .values()
            .map(Value::expression_text)
            .collect::<Vec<_>>()
            .join("\n");
        let refs = references(&text, &from, &known);
        map.insert(from, refs);
    }

    let edges: usize = map.values().map(BTreeSet::len).sum();
    tracing::debug!(entries = map.len(), edges, "Dependency listing complete");

    map
}

/// Every entry a reference could resolve to.
fn known_entries(config: &ParsedConfiguration) -> BTreeSet<EntryRef> {
    let mut known = BTreeSet::new();
    known.extend(config.resources.keys().map(EntryRef::resource));
    known.extend(config.data_sources.keys().map(EntryRef::data_source));
    known.extend(config.variables.keys().map(|n| EntryRef::new(EntryKind::Variable, n)));
    known.extend(config.locals.keys().map(|n| EntryRef::new(EntryKind::Local, n)));
    known.extend(config.modules.keys().map(|n| EntryRef::new(EntryKind::Module, n)));
    known
}

fn resource_text(entry: &ResourceEntry) -> String {
    let mut text = String::new();
    for value in entry.attributes.values() {
        text.push_str(&value.expression_text());
        text.push('\n');
    }
    for block in &entry.nested_blocks {
        push_block_text(block, &mut text);
    }
    text
}

fn push_block_text(block: &Block, text: &mut String) {
    for value in block.attributes.values() {
        text.push_str(&value.expression_text());
        text.push('\n');
    }
    for nested in &block.nested_blocks {
        push_block_text(nested, text);
    }
}

/// Scan `text` for references to known entries other than `from`.
fn references(text: &str, from: &EntryRef, known: &BTreeSet<EntryRef>) -> BTreeSet<EntryRef> {
    let Some(pattern) = reference_pattern() else {
        return BTreeSet::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let candidate = if let (Some(t), Some(n)) = (caps.get(1), caps.get(2)) {
                EntryRef::new(EntryKind::DataSource, format!("{}.{}", t.as_str(), n.as_str()))
            } else if let Some(n) = caps.get(3) {
                EntryRef::new(EntryKind::Variable, n.as_str())
            } else if let Some(n) = caps.get(4) {
                EntryRef::new(EntryKind::Local, n.as_str())
            } else if let Some(n) = caps.get(5) {
                EntryRef::new(EntryKind::Module, n.as_str())
            } else if let (Some(t), Some(n)) = (caps.get(6), caps.get(7)) {
                EntryRef::new(EntryKind::Resource, format!("{}.{}", t.as_str(), n.as_str()))
            } else {
                return None;
            };
            (candidate != *from && known.contains(&candidate)).then_some(candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_configuration;
    use crate::parser::HclParser;
    use crate::types::ResourceKey;
    use std::path::Path;

    fn deps(content: &str) -> DependencyMap {
        let blocks = HclParser::new().parse_str(content, Path::new("main.tf")).unwrap();
        list_dependencies(&extract_configuration(&blocks).unwrap())
    }

    fn resource(t: &str, n: &str) -> EntryRef {
        EntryRef::resource(&ResourceKey::new(t, n))
    }

    #[test]
    fn test_firewall_depends_on_network() {
        let map = deps(
            r#"
resource "google_compute_network" "vpc" {
  name = "main"
}

resource "google_compute_firewall" "allow_ssh" {
  network = google_compute_network.vpc.id
  allow {
    protocol = "tcp"
  }
}
"#,
        );

        let firewall = resource("google_compute_firewall", "allow_ssh");
        let network = resource("google_compute_network", "vpc");
        assert!(map[&firewall].contains(&network));
        assert!(map[&network].is_empty());
    }

    #[test]
    fn test_all_reference_kinds() {
        let map = deps(
            r#"
variable "project_id" {}

data "google_compute_zones" "available" {
  project = var.project_id
}

locals {
  prefix = "${var.project_id}-app"
}

module "network" {
  source = "./modules/network"
  zones  = data.google_compute_zones.available.names
  name   = local.prefix
}

output "network_name" {
  value = module.network.name
}
"#,
        );

        let data = EntryRef::new(EntryKind::DataSource, "google_compute_zones.available");
        let var = EntryRef::new(EntryKind::Variable, "project_id");
        let local = EntryRef::new(EntryKind::Local, "prefix");
        let module = EntryRef::new(EntryKind::Module, "network");
        let output = EntryRef::new(EntryKind::Output, "network_name");

        assert_eq!(map[&data], BTreeSet::from([var.clone()]));
        assert_eq!(map[&local], BTreeSet::from([var]));
        assert_eq!(map[&module], BTreeSet::from([data, local]));
        assert_eq!(map[&output], BTreeSet::from([module]));
    }

    #[test]
    fn test_unknown_and_builtin_references_are_ignored() {
        let map = deps(
            r#"
resource "google_compute_instance" "vm" {
  count = 2
  name  = "vm-${count.index}"
  zone  = var.missing
  path  = path.module
}
"#,
        );

        assert!(map[&resource("google_compute_instance", "vm")].is_empty());
    }

    #[test]
    fn test_self_reference_is_ignored() {
        let map = deps(
            r#"
locals {
  a = local.a
  b = local.a
}
"#,
        );

        let a = EntryRef::new(EntryKind::Local, "a");
        let b = EntryRef::new(EntryKind::Local, "b");
        assert!(map[&a].is_empty());
        assert_eq!(map[&b], BTreeSet::from([a]));
    }

    #[test]
    fn test_empty_configuration() {
        assert!(list_dependencies(&ParsedConfiguration::default()).is_empty());
    }
}
