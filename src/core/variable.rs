//! Variable slots and the per-stage variable table

use crate::core::{
    error::EngineError,
    format::{convert, TypedValue, VariableFormat},
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Where a variable takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    /// Literal value, used as given
    #[default]
    Value,
    /// Global environment variable
    RefGlobal,
    /// Output of a pre-CI stage step
    RefPreCi,
    /// Output of a post-CI stage step
    RefPostCi,
    /// Output of a step inside the same reference plugin
    RefPlugin,
}

/// A named, typed value slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableObject {
    pub name: String,

    #[serde(default)]
    pub format: VariableFormat,

    #[serde(default)]
    pub variable_type: VariableType,

    /// Name of the referenced variable (reference types only)
    #[serde(default)]
    pub reference_variable_name: String,

    /// Index of the step owning the referenced variable
    #[serde(default)]
    pub reference_variable_step_index: usize,

    /// Index of the step inside the referenced plugin that owns this value
    #[serde(default)]
    pub variable_step_index_in_plugin: usize,

    #[serde(default)]
    pub value: String,

    /// Only trustworthy after a successful `type_check`
    #[serde(skip)]
    pub typed_value: Option<TypedValue>,
}

impl VariableObject {
    /// Create a literal variable
    pub fn value(name: &str, value: &str, format: VariableFormat) -> Self {
        Self {
            name: name.to_string(),
            format,
            variable_type: VariableType::Value,
            value: value.to_string(),
            ..Default::default()
        }
    }

    /// Create a variable referring to another scope
    pub fn reference(
        name: &str,
        variable_type: VariableType,
        step_index: usize,
        reference_name: &str,
        format: VariableFormat,
    ) -> Self {
        Self {
            name: name.to_string(),
            format,
            variable_type,
            reference_variable_name: reference_name.to_string(),
            reference_variable_step_index: step_index,
            ..Default::default()
        }
    }

    pub fn with_step_index_in_plugin(mut self, index: usize) -> Self {
        self.variable_step_index_in_plugin = index;
        self
    }

    /// Convert `value` into `format` and cache the result
    pub fn type_check(&mut self) -> Result<&TypedValue, EngineError> {
        let typed = convert(&self.value, self.format)?;
        Ok(&*self.typed_value.insert(typed))
    }

    /// The cached typed value, or a fresh conversion when none is cached yet
    pub fn typed(&self) -> Result<TypedValue, EngineError> {
        match &self.typed_value {
            Some(typed) => Ok(typed.clone()),
            None => convert(&self.value, self.format),
        }
    }
}

/// Outputs of the steps of one stage invocation, keyed by step index then
/// variable name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct StageVariableTable {
    entries: BTreeMap<usize, HashMap<String, VariableObject>>,
}

impl StageVariableTable {
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Look up a variable recorded by a step
    pub fn lookup(&self, step_index: usize, name: &str) -> Option<&VariableObject> {
        self.entries.get(&step_index).and_then(|vars| vars.get(name))
    }

    /// Record the finalized outputs of a step, replacing earlier ones
    pub fn record(&mut self, step_index: usize, outputs: &[VariableObject]) {
        let vars = outputs
            .iter()
            .map(|var| (var.name.clone(), var.clone()))
            .collect();
        self.entries.insert(step_index, vars);
    }

    pub fn contains_step(&self, step_index: usize) -> bool {
        self.entries.contains_key(&step_index)
    }

    /// Number of steps with recorded outputs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Step index as a map key: integer in YAML, string in JSON
#[derive(Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
enum StepKey {
    Index(usize),
    Text(String),
}

impl<'de> Deserialize<'de> for StageVariableTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<StepKey, HashMap<String, VariableObject>>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (key, vars) in raw {
            let index = match key {
                StepKey::Index(index) => index,
                StepKey::Text(text) => text.trim().parse::<usize>().map_err(|e| {
                    de::Error::custom(format!("invalid step index '{}': {}", text, e))
                })?,
            };
            entries.insert(index, vars);
        }
        Ok(Self { entries })
    }
}
