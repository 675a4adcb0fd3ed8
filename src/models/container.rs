// Managed container entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub url: String,
    /// Last known running state; `None` when never observed.
    #[serde(default)]
    pub running: Option<bool>,
    /// Eligible for scheduling. `None` counts as inactive.
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active == Some(true)
    }
}
