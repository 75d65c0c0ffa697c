use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::models::presence::Presence;

/// Opcodes for gateway messages.
pub mod opcode {
    pub const EVENT: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 3;
    pub const HEARTBEAT_ACK: u8 = 4;
    pub const HELLO: u8 = 5;
    pub const RECONNECT: u8 = 6;
    pub const INVALID_SESSION: u8 = 7;
    pub const PRESENCE_UPDATE: u8 = 8;
    pub const REQUEST_MEMBERS: u8 = 10;
}

/// Dispatch type that establishes a session.
pub const READY: &str = "ready";
/// Dispatch type that confirms a resume.
pub const RESUMED: &str = "resumed";

/// Gateway message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl GatewayMessage {
    pub fn new(op: u8, data: impl Serialize) -> Result<Self, GatewayError> {
        Ok(Self {
            op,
            seq: None,
            event_type: None,
            data: Some(serde_json::to_value(data)?),
        })
    }

    /// Parse an inbound text frame. Anything without a numeric `op` is a
    /// protocol error.
    pub fn decode(text: &str) -> Result<Self, GatewayError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| GatewayError::Protocol(format!("undecodable message: {e}")))?;
        let op = value
            .get("op")
            .and_then(|op| op.as_u64())
            .ok_or_else(|| GatewayError::Protocol("message has no numeric op".to_string()))?;
        if op > u8::MAX as u64 {
            return Err(GatewayError::Protocol(format!("opcode {op} out of range")));
        }
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Protocol(format!("malformed envelope: {e}")))
    }

    pub fn encode(&self) -> Result<String, GatewayError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize `data` into a payload type.
    pub fn payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, GatewayError> {
        let data = self.data.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data)
            .map_err(|e| GatewayError::Protocol(format!("malformed op {} payload: {e}", self.op)))
    }

    /// Dispatch type, lower-cased for comparison.
    pub fn normalized_type(&self) -> Option<String> {
        self.event_type.as_deref().map(str::to_ascii_lowercase)
    }
}

/// HELLO (opcode 5) payload data.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    pub heartbeat_interval: u64,
}

/// Client properties sent with IDENTIFY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// IDENTIFY payload data.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyData {
    pub token: String,
    pub intents: Vec<String>,
    pub properties: ConnectionProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
}

/// RESUME payload data.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeData {
    pub token: String,
    pub session_id: String,
    pub seq: Option<u64>,
}

/// REQUEST_MEMBERS (opcode 10) payload data.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMembersData {
    pub space_id: String,
    pub query: String,
    pub limit: u32,
}

/// Fields of a READY dispatch the client needs for itself. The full payload
/// is handed on untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyData {
    pub session_id: String,
    #[serde(default, alias = "resume_url")]
    pub resume_gateway_url: Option<String>,
}

/// Whether an INVALID_SESSION can be resumed. The payload is either a bare
/// boolean or `{ "resumable": bool }`.
pub fn invalid_session_resumable(msg: &GatewayMessage) -> bool {
    match &msg.data {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Object(obj)) => obj
            .get("resumable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hello() {
        let msg = GatewayMessage::decode(r#"{"op":5,"data":{"heartbeat_interval":41250}}"#)
            .unwrap();
        assert_eq!(msg.op, opcode::HELLO);
        let hello: HelloData = msg.payload().unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
    }

    #[test]
    fn test_decode_dispatch() {
        let msg = GatewayMessage::decode(
            r#"{"op":0,"seq":7,"type":"MESSAGE.CREATE","data":{"id":"1"}}"#,
        )
        .unwrap();
        assert_eq!(msg.seq, Some(7));
        assert_eq!(msg.normalized_type().as_deref(), Some("message.create"));
    }

    #[test]
    fn test_decode_rejects_missing_op() {
        let err = GatewayMessage::decode(r#"{"type":"ready"}"#).unwrap_err();
        assert_eq!(err.code(), "protocol_error");
        let err = GatewayMessage::decode(r#"{"op":"5"}"#).unwrap_err();
        assert_eq!(err.code(), "protocol_error");
        let err = GatewayMessage::decode(r#"{"op":300}"#).unwrap_err();
        assert_eq!(err.code(), "protocol_error");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(GatewayMessage::decode("not json").is_err());
    }

    #[test]
    fn test_encode_omits_empty_fields() {
        let msg = GatewayMessage::new(opcode::HEARTBEAT, Some(3u64)).unwrap();
        let text = msg.encode().unwrap();
        assert_eq!(text, r#"{"op":1,"data":3}"#);
    }

    #[test]
    fn test_invalid_session_payload_shapes() {
        let bare = GatewayMessage::decode(r#"{"op":7,"data":true}"#).unwrap();
        assert!(invalid_session_resumable(&bare));
        let object = GatewayMessage::decode(r#"{"op":7,"data":{"resumable":false}}"#).unwrap();
        assert!(!invalid_session_resumable(&object));
        let empty = GatewayMessage::decode(r#"{"op":7}"#).unwrap();
        assert!(!invalid_session_resumable(&empty));
    }

    #[test]
    fn test_ready_accepts_resume_url_alias() {
        let msg = GatewayMessage::decode(
            r#"{"op":0,"seq":1,"type":"ready","data":{"session_id":"abc","resume_url":"ws://r"}}"#,
        )
        .unwrap();
        let ready: ReadyData = msg.payload().unwrap();
        assert_eq!(ready.session_id, "abc");
        assert_eq!(ready.resume_gateway_url.as_deref(), Some("ws://r"));
    }
}
