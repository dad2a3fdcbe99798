//! Terraform semantic extraction.
//!
//! Classifies structural [`Block`]s into a [`ParsedConfiguration`]. Every
//! keyed collection rejects redefinitions with `DuplicateDefinition`; the one
//! deliberate last-wins merge is `.tfvars` assignments, which Terraform
//! itself applies in file order.
//!
//! | Block        | Labels          | Goes to                          |
//! |--------------|-----------------|----------------------------------|
//! | `resource`   | type, name      | `resources`                      |
//! | `data`       | type, name      | `data_sources`                   |
//! | `variable`   | name            | `variables`                      |
//! | `output`     | name            | `outputs`                        |
//! | `locals`     | none            | one `locals` entry per attribute |
//! | `provider`   | name            | `providers`                      |
//! | `module`     | name            | `modules`                        |
//! | `terraform`  | none            | `terraform`                      |
//! | anything else|                 | `unrecognized`                   |

use crate::error::Result;
use crate::types::{
    Block, Document, EntryKind, FileKind, LocalEntry, ModuleEntry, OutputEntry,
    ParsedConfiguration, ProviderEntry, RequiredProvider, ResourceEntry, ResourceKey,
    SourceLocation, TerraformSettings, UnrecognizedBlock, Value, VariableEntry, VariableValue,
};

use std::collections::BTreeMap;

/// Classify a flat list of blocks.
///
/// # Errors
///
/// - `DuplicateDefinition` when an entry is defined twice
/// - `HclStructure` when a block lacks its required labels
pub fn extract_configuration(blocks: &[Block]) -> Result<ParsedConfiguration> {
    let mut extractor = Extractor::new();
    for block in blocks {
        extractor.add_block(block)?;
    }
    Ok(extractor.finish())
}

/// Incremental builder for a [`ParsedConfiguration`].
///
/// Documents must be added in a deterministic order (the pipeline uses
/// sorted path order) for `.tfvars` overrides to be reproducible.
#[derive(Debug, Default)]
pub struct Extractor {
    config: ParsedConfiguration,
}

impl Extractor {
    /// Create an empty extractor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parsed file into the configuration.
    ///
    /// # Errors
    ///
    /// See [`extract_configuration`].
    pub fn add_document(&mut self, document: &Document) -> Result<()> {
        for block in &document.blocks {
            self.add_block(block)?;
        }

        for assignment in &document.assignments {
            if document.kind == FileKind::Tfvars {
                let value = VariableValue {
                    value: assignment.value.clone(),
                    location: assignment.location.clone(),
                };
                if let Some(previous) = self.config.variable_values.insert(assignment.name.clone(), value) {
                    tracing::debug!(
                        variable = %assignment.name,
                        previous = %previous.location,
                        current = %assignment.location,
                        "Variable value overridden"
                    );
                }
            } else {
                self.config.stray_attributes.push(assignment.clone());
            }
        }

        Ok(())
    }

    /// Classify a single top-level block.
    ///
    /// # Errors
    ///
    /// See [`extract_configuration`].
    pub fn add_block(&mut self, block: &Block) -> Result<()> {
        match block.block_type.as_str() {
            "resource" => {
                let entry = resource_entry(block)?;
                insert_unique(&mut self.config.resources, entry.key.clone(), entry, EntryKind::Resource, |e| &e.location)
            }
            "data" => {
                let entry = resource_entry(block)?;
                insert_unique(&mut self.config.data_sources, entry.key.clone(), entry, EntryKind::DataSource, |e| &e.location)
            }
            "variable" => {
                let entry = variable_entry(block)?;
                insert_unique(&mut self.config.variables, entry.name.clone(), entry, EntryKind::Variable, |e| &e.location)
            }
            "output" => {
                let entry = output_entry(block)?;
                insert_unique(&mut self.config.outputs, entry.name.clone(), entry, EntryKind::Output, |e| &e.location)
            }
            "locals" => self.add_locals(block),
            "provider" => self.add_provider(block),
            "module" => {
                let entry = module_entry(block)?;
                insert_unique(&mut self.config.modules, entry.name.clone(), entry, EntryKind::Module, |e| &e.location)
            }
            "terraform" => {
                self.config.terraform.push(terraform_settings(block));
                Ok(())
            }
            other => {
                tracing::debug!(block_type = %other, location = %block.location, "Unrecognized block");
                self.config.unrecognized.push(UnrecognizedBlock {
                    block_type: other.to_string(),
                    labels: block.labels.clone(),
                    location: block.location.clone(),
                });
                Ok(())
            }
        }
    }

    /// Finish and hand back the configuration.
    #[must_use]
    pub fn finish(self) -> ParsedConfiguration {
        tracing::debug!(
            resources = self.config.resources.len(),
            data_sources = self.config.data_sources.len(),
            variables = self.config.variables.len(),
            outputs = self.config.outputs.len(),
            locals = self.config.locals.len(),
            modules = self.config.modules.len(),
            "Extraction complete"
        );
        self.config
    }

    fn add_locals(&mut self, block: &Block) -> Result<()> {
        for (name, value) in &block.attributes {
            let entry = LocalEntry {
                name: name.clone(),
                value: value.raw_text(),
                location: block.location.clone(),
            };
            insert_unique(&mut self.config.locals, name.clone(), entry, EntryKind::Local, |e| &e.location)?;
        }
        Ok(())
    }

    fn add_provider(&mut self, block: &Block) -> Result<()> {
        let name = required_label(block, 0, "provider name")?;
        let alias = string_attribute(block, "alias");

        if let Some(existing) = self
            .config
            .providers
            .iter()
            .find(|p| p.name == name && p.alias == alias)
        {
            let reference = existing.reference();
            return Err(crate::err!(DuplicateDefinition {
                kind: EntryKind::Provider,
                name: reference,
                first: existing.location.clone(),
                second: block.location.clone(),
            }));
        }

        self.config.providers.push(ProviderEntry {
            name,
            alias,
            attributes: block.attributes.clone(),
            location: block.location.clone(),
        });
        Ok(())
    }
}

/// Insert into a keyed collection, failing on redefinition.
fn insert_unique<K, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    kind: EntryKind,
    location: impl Fn(&V) -> &SourceLocation,
) -> Result<()>
where
    K: Ord + std::fmt::Display,
{
    if let Some(existing) = map.get(&key) {
        return Err(crate::err!(DuplicateDefinition {
            kind: kind,
            name: key.to_string(),
            first: location(existing).clone(),
            second: location(&value).clone(),
        }));
    }
    map.insert(key, value);
    Ok(())
}

fn required_label(block: &Block, index: usize, what: &str) -> Result<String> {
    block.label(index).map(str::to_string).ok_or_else(|| {
        crate::err!(HclStructure {
            location: block.location.clone(),
            message: format!("'{}' block is missing its {what} label", block.block_type),
        })
    })
}

fn string_attribute(block: &Block, name: &str) -> Option<String> {
    block.attribute(name).and_then(Value::as_str).map(str::to_string)
}

fn resource_entry(block: &Block) -> Result<ResourceEntry> {
    let resource_type = required_label(block, 0, "type")?;
    let name = required_label(block, 1, "name")?;

    Ok(ResourceEntry {
        key: ResourceKey::new(resource_type, name),
        attributes: block.attributes.clone(),
        nested_blocks: block.nested_blocks.clone(),
        location: block.location.clone(),
    })
}

fn variable_entry(block: &Block) -> Result<VariableEntry> {
    Ok(VariableEntry {
        name: required_label(block, 0, "variable name")?,
        description: string_attribute(block, "description"),
        type_expr: block.attribute("type").map(Value::raw_text),
        default: block.attribute("default").cloned(),
        sensitive: block.attribute("sensitive").and_then(Value::as_bool),
        has_validation: block.nested("validation").next().is_some(),
        location: block.location.clone(),
    })
}

fn output_entry(block: &Block) -> Result<OutputEntry> {
    Ok(OutputEntry {
        name: required_label(block, 0, "output name")?,
        description: string_attribute(block, "description"),
        value: block.attribute("value").map(Value::raw_text),
        sensitive: block.attribute("sensitive").and_then(Value::as_bool),
        location: block.location.clone(),
    })
}

fn module_entry(block: &Block) -> Result<ModuleEntry> {
    let name = required_label(block, 0, "module name")?;
    if block.attribute("source").is_none() {
        tracing::warn!(module = %name, location = %block.location, "Module block missing source attribute");
    }

    let attributes = block
        .attributes
        .iter()
        .filter(|(key, _)| key.as_str() != "source" && key.as_str() != "version")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(ModuleEntry {
        name,
        source: string_attribute(block, "source"),
        version: string_attribute(block, "version"),
        attributes,
        location: block.location.clone(),
    })
}

/// Read `required_version`, `required_providers` and the backend type.
fn terraform_settings(block: &Block) -> TerraformSettings {
    let mut required_providers = BTreeMap::new();
    for nested in block.nested("required_providers") {
        for (name, value) in &nested.attributes {
            required_providers.insert(name.clone(), provider_requirement(value));
        }
    }

    TerraformSettings {
        required_version: string_attribute(block, "required_version"),
        required_providers,
        backend: block
            .nested("backend")
            .next()
            .and_then(|b| b.label(0))
            .map(str::to_string),
        location: block.location.clone(),
    }
}

/// A requirement is either a bare version string (pre-0.13 syntax) or an
/// object with `source` and `version`.
fn provider_requirement(value: &Value) -> RequiredProvider {
    match value {
        Value::String(version) => RequiredProvider {
            source: None,
            version: Some(version.clone()),
        },
        Value::Map(map) => RequiredProvider {
            source: map.get("source").and_then(Value::as_str).map(str::to_string),
            version: map.get("version").and_then(Value::as_str).map(str::to_string),
        },
        _ => RequiredProvider::default(),
    }
}
