use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Kind of AIGC task a parameter form describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    Image,
    Video,
    Audio,
    Music,
}

impl GenerationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationType::Image => "image",
            GenerationType::Video => "video",
            GenerationType::Audio => "audio",
            GenerationType::Music => "music",
        }
    }
}

impl std::str::FromStr for GenerationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(GenerationType::Image),
            "video" => Ok(GenerationType::Video),
            "audio" => Ok(GenerationType::Audio),
            "music" => Ok(GenerationType::Music),
            other => Err(format!("Unknown generation type: {other}")),
        }
    }
}

/// Value tree produced by a parameter form, ready for the task endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub generation_type: GenerationType,
    pub provider: String,
    pub model: String,
    pub params: Value,
}
