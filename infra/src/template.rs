//! Typed CloudFormation template model.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::{InfraError, Result};

/// Intrinsic functions.
pub mod intrinsic {
    use serde_json::{json, Value};

    pub fn reference(logical_id: &str) -> Value {
        json!({ "Ref": logical_id })
    }

    pub fn get_att(logical_id: &str, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [logical_id, attribute] })
    }

    pub fn sub(template: &str) -> Value {
        json!({ "Fn::Sub": template })
    }

    pub fn import_value(export_name: &str) -> Value {
        json!({ "Fn::ImportValue": export_name })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

impl Parameter {
    pub fn string(description: impl Into<String>, default: Option<&str>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            default: default.map(String::from),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn depends_on(mut self, logical_id: &str) -> Self {
        self.depends_on.push(logical_id.to_string());
        self
    }

    /// Removed together with the stack.
    pub fn destroy_on_removal(mut self) -> Self {
        self.deletion_policy = Some("Delete".to_string());
        self.update_replace_policy = Some("Delete".to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
}

impl Output {
    pub fn new(value: Value, description: impl Into<String>) -> Self {
        Self {
            value,
            description: description.into(),
            export: None,
        }
    }

    pub fn exported_as(mut self, export_name: &str) -> Self {
        self.export = Some(json!({ "Name": export_name }));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

/// Pseudo parameters every template may reference.
const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: "2010-09-09".to_string(),
            description: description.into(),
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add_parameter(&mut self, logical_id: &str, parameter: Parameter) -> Result<()> {
        self.ensure_free(logical_id)?;
        self.parameters.insert(logical_id.to_string(), parameter);
        Ok(())
    }

    pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> Result<()> {
        self.ensure_free(logical_id)?;
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn add_output(&mut self, name: &str, output: Output) -> Result<()> {
        if self.outputs.contains_key(name) {
            return Err(InfraError::DuplicateLogicalId(name.to_string()));
        }
        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    fn ensure_free(&self, logical_id: &str) -> Result<()> {
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(InfraError::DuplicateLogicalId(logical_id.to_string()));
        }
        Ok(())
    }

    /// Export names this template imports.
    pub fn imports(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for resource in self.resources.values() {
            collect_imports(&resource.properties, &mut found);
        }
        for output in self.outputs.values() {
            collect_imports(&output.value, &mut found);
        }
        found
    }

    /// Export names this template provides.
    pub fn exports(&self) -> BTreeSet<String> {
        self.outputs
            .values()
            .filter_map(|o| o.export.as_ref())
            .filter_map(|e| e.get("Name").and_then(Value::as_str))
            .map(String::from)
            .collect()
    }

    /// Check that every `Ref`, `Fn::GetAtt`, `Fn::Sub` variable and `DependsOn`
    /// names a parameter, resource or pseudo parameter of this template.
    pub fn validate(&self) -> Result<()> {
        let mut references = BTreeSet::new();
        for (logical_id, resource) in &self.resources {
            collect_references(&resource.properties, &mut references);
            for dependency in &resource.depends_on {
                if !self.resources.contains_key(dependency) {
                    return Err(InfraError::UnknownReference {
                        from: logical_id.clone(),
                        target: dependency.clone(),
                    });
                }
            }
        }
        for output in self.outputs.values() {
            collect_references(&output.value, &mut references);
        }

        for target in references {
            let known = self.resources.contains_key(&target)
                || self.parameters.contains_key(&target)
                || PSEUDO_PARAMETERS.contains(&target.as_str());
            if !known {
                return Err(InfraError::UnknownReference {
                    from: self.description.clone(),
                    target,
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn collect_imports(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("Fn::ImportValue") {
                found.insert(name.clone());
            }
            map.values().for_each(|v| collect_imports(v, found));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_imports(v, found)),
        _ => {}
    }
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                found.insert(target.clone());
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = parts.first() {
                    found.insert(target.clone());
                }
            }
            if let Some(Value::String(template)) = map.get("Fn::Sub") {
                found.extend(sub_variables(template));
            }
            map.values().for_each(|v| collect_references(v, found));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

/// Logical ids referenced by `${Name}` or `${Name.Attr}` in a `Fn::Sub` string.
fn sub_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                // `${!Literal}` is an escape, not a variable
                if !name.starts_with('!') {
                    let id = name.split('.').next().unwrap_or(name);
                    variables.push(id.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    variables
}
