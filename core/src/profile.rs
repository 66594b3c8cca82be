//! Type-profile data model
//!
//! Shapes mirror `Profiler.ScriptTypeProfile` so harvested data can be
//! deserialised straight off the wire.

use serde::{Deserialize, Serialize};

/// A concrete type observed at an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeObject {
    pub name: String,
}

/// Types observed at one source position
///
/// `offset` counts UTF-16 code units from the start of the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSample {
    pub offset: usize,
    #[serde(default)]
    pub types: Vec<TypeObject>,
}

impl TypeSample {
    pub fn new(offset: usize, names: &[&str]) -> Self {
        Self {
            offset,
            types: names
                .iter()
                .map(|name| TypeObject {
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }
}

/// All samples collected for one compiled script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTypeProfile {
    pub script_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub entries: Vec<TypeSample>,
}

/// One console call observed while the script ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: String,
    pub value: String,
}

/// Keep only the profiles belonging to `script_id`
pub fn retain_script(profiles: Vec<ScriptTypeProfile>, script_id: &str) -> Vec<ScriptTypeProfile> {
    profiles
        .into_iter()
        .filter(|profile| profile.script_id == script_id)
        .collect()
}
