use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

pub const LIFECYCLE_PREFIX: &str = "agent:lifecycle";
pub const LIFECYCLE_START: &str = "agent:lifecycle:start";
pub const LIFECYCLE_COMPLETE: &str = "agent:lifecycle:complete";
pub const LIFECYCLE_TERMINATED: &str = "agent:lifecycle:terminated";

/// Progress event pushed over the session event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    pub name: String,
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub content: Value,
}

fn default_event_type() -> String {
    "progress".to_string()
}

impl AgentEvent {
    /// The agent finished or was terminated; no more events follow.
    pub fn is_final(&self) -> bool {
        self.name == LIFECYCLE_COMPLETE || self.name == LIFECYCLE_TERMINATED
    }
}
