//! The application: stacks in deploy order, app-wide tags, and synthesis to disk.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::stacks::{
    api_consumers, identity_provider, premium_api, StackSettings, CONSUMERS_STACK, IDENTITY_STACK,
    PREMIUM_STACK,
};
use crate::template::Template;
use crate::{InfraError, Result};

/// Context keys copied onto every stack as tags.
const CONTEXT_TAGS: &[(&str, &str)] = &[
    ("owner", "Owner"),
    ("github_profile", "OwnerProfile"),
    ("github_repo_url", "GithubRepo"),
    ("udemy_profile", "Udemy"),
    ("skill_profile", "SkillShare"),
    ("about_me", "AboutMe"),
];

/// Free-form deployment context, read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Context {
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl Context {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Tags derived from the context; missing or non-string keys are skipped.
    pub fn tags(&self) -> BTreeMap<String, String> {
        CONTEXT_TAGS
            .iter()
            .filter_map(|(key, tag)| {
                self.values
                    .get(*key)
                    .and_then(serde_json::Value::as_str)
                    .map(|value| (tag.to_string(), value.to_string()))
            })
            .collect()
    }
}

pub struct Stack {
    pub name: &'static str,
    pub template: Template,
}

/// Build every stack in deploy order.
pub fn build(settings: &StackSettings) -> Result<Vec<Stack>> {
    Ok(vec![
        Stack {
            name: IDENTITY_STACK,
            template: identity_provider::template(settings)?,
        },
        Stack {
            name: PREMIUM_STACK,
            template: premium_api::template(settings)?,
        },
        Stack {
            name: CONSUMERS_STACK,
            template: api_consumers::template(settings)?,
        },
    ])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub template_file: String,
    pub dependencies: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub stacks: Vec<ManifestEntry>,
}

/// Resolve each stack's dependencies from its imports. Every import must be
/// exported by a stack earlier in the order.
pub fn manifest(stacks: &[Stack], tags: &BTreeMap<String, String>) -> Result<Manifest> {
    let mut exporters: BTreeMap<String, &str> = BTreeMap::new();
    let mut entries = Vec::new();

    for stack in stacks {
        let mut dependencies = BTreeSet::new();
        for import in stack.template.imports() {
            let exporter = exporters.get(&import).ok_or_else(|| InfraError::UnresolvedImport {
                stack: stack.name.to_string(),
                export: import.clone(),
            })?;
            dependencies.insert(exporter.to_string());
        }
        for export in stack.template.exports() {
            exporters.insert(export, stack.name);
        }

        entries.push(ManifestEntry {
            name: stack.name.to_string(),
            template_file: format!("{}.template.json", stack.name),
            dependencies: dependencies.into_iter().collect(),
            tags: tags.clone(),
        });
    }

    Ok(Manifest { stacks: entries })
}

/// Write every template and `manifest.json` into `out_dir`.
pub fn synth(settings: &StackSettings, context: &Context, out_dir: &Path) -> Result<Manifest> {
    let stacks = build(settings)?;
    let manifest = manifest(&stacks, &context.tags())?;

    fs::create_dir_all(out_dir)?;
    for (stack, entry) in stacks.iter().zip(&manifest.stacks) {
        let path = out_dir.join(&entry.template_file);
        fs::write(&path, stack.template.to_json()?)?;
        info!(stack = stack.name, path = %path.display(), "Wrote template");
    }
    fs::write(
        out_dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(manifest)
}
