//! Plugin artifacts produced by steps through the side-channel file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag of the side-channel document
pub const PLUGIN_ARTIFACTS_KIND: &str = "PluginArtifacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactType {
    Container,
}

/// One artifact record, e.g. a set of pushed container images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "Type")]
    pub artifact_type: ArtifactType,

    #[serde(rename = "Data", default)]
    pub data: Vec<String>,

    #[serde(rename = "CredentialsSourceType", default)]
    pub credentials_source_type: String,

    #[serde(rename = "CredentialSourceValue", default)]
    pub credential_source_value: String,

    #[serde(rename = "createdByPluginIdentifier", default)]
    pub created_by_plugin_identifier: String,

    #[serde(rename = "createdOn")]
    pub created_on: DateTime<Utc>,
}

impl Artifact {
    fn same_origin(&self, other: &Artifact) -> bool {
        self.artifact_type == other.artifact_type
            && self.credentials_source_type == other.credentials_source_type
            && self.credential_source_value == other.credential_source_value
            && self.created_by_plugin_identifier == other.created_by_plugin_identifier
    }
}

/// Accumulator of artifacts for one stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginArtifacts {
    #[serde(rename = "Kind")]
    pub kind: String,

    #[serde(rename = "Artifacts", default)]
    pub artifacts: Vec<Artifact>,
}

impl Default for PluginArtifacts {
    fn default() -> Self {
        Self {
            kind: PLUGIN_ARTIFACTS_KIND.to_string(),
            artifacts: Vec::new(),
        }
    }
}

impl PluginArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a side-channel document
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Merge another accumulator into this one.
    ///
    /// Records sharing type, credentials and producing plugin are folded
    /// together, keeping each data entry once.
    pub fn merge(&mut self, other: PluginArtifacts) {
        for incoming in other.artifacts {
            match self.artifacts.iter_mut().find(|a| a.same_origin(&incoming)) {
                Some(existing) => {
                    for entry in incoming.data {
                        if !existing.data.contains(&entry) {
                            existing.data.push(entry);
                        }
                    }
                    existing.created_on = existing.created_on.max(incoming.created_on);
                }
                None => self.artifacts.push(incoming),
            }
        }
    }
}
