use serde::{Deserialize, Deserializer, Serialize};

/// Table API envelope: every payload arrives under `result`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
}

/// A checklist item row as stored on the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemRecord {
    pub sys_id: String,
    pub short_description: String,
    /// `true` once the item is marked done.
    #[serde(deserialize_with = "flexible_bool")]
    pub active: bool,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub short_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub active: bool,
}

/// Body of a partial update. Unset fields are left alone on the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.short_description.is_none() && self.active.is_none()
    }
}

// The table API renders booleans as "true"/"false" strings.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(s) => match s.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid boolean value: {other}"
            ))),
        },
    }
}
