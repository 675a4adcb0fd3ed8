// Named group of containers. Members are not checked against known containers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub container: Vec<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Group {
    pub fn is_active(&self) -> bool {
        self.active == Some(true)
    }
}
