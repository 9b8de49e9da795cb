use serde::{Deserialize, Serialize};

use crate::Result;

/// Flat, ordered description of a program, suitable for presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub name: String,
    /// Groups in z-order.
    pub groups: Vec<GroupSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    #[serde(default)]
    pub enabled: bool,
    /// Animations in z-order.
    pub animations: Vec<AnimationSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationSnapshot {
    pub class_name: String,
    /// Parameter object name to serialized value, in declaration order.
    #[serde(default)]
    pub properties: Vec<(String, String)>,
    /// Names of the parameters flagged preferred.
    #[serde(default)]
    pub preferred: Vec<String>,
}

impl ProgramSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
