use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Some(Status::Online),
            "idle" => Some(Status::Idle),
            "dnd" => Some(Status::Dnd),
            "invisible" => Some(Status::Invisible),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
    Custom,
    Competing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    pub fn new(name: impl Into<String>, kind: ActivityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Presence the client announces for itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Presence {
    pub status: Status,
    pub activity: Option<Activity>,
    /// Unix milliseconds since the client went idle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(default)]
    pub afk: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_wire_shape() {
        let presence = Presence {
            status: Status::Dnd,
            activity: Some(
                Activity::new("live coding", ActivityKind::Streaming)
                    .with_url("https://example.com/stream"),
            ),
            since: None,
            afk: false,
        };
        let json = serde_json::to_value(&presence).unwrap();
        assert_eq!(json["status"], "dnd");
        assert_eq!(json["activity"]["type"], "streaming");
        assert_eq!(json["activity"]["url"], "https://example.com/stream");
        assert!(json.get("since").is_none());
    }

    #[test]
    fn test_cleared_activity_serializes_null() {
        let json = serde_json::to_value(Presence::default()).unwrap();
        assert_eq!(json["status"], "online");
        assert!(json["activity"].is_null());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("IDLE"), Some(Status::Idle));
        assert_eq!(Status::parse("away"), None);
    }
}
