/// Close codes.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const ABNORMAL: u16 = 1006;

    pub const UNKNOWN_ERROR: u16 = 4000;
    pub const UNKNOWN_OPCODE: u16 = 4001;
    pub const DECODE_ERROR: u16 = 4002;
    pub const NOT_AUTHENTICATED: u16 = 4003;
    pub const AUTH_FAILED: u16 = 4004;
    pub const ALREADY_AUTHENTICATED: u16 = 4005;
    pub const INVALID_SEQ: u16 = 4007;
    pub const RATE_LIMITED: u16 = 4008;
    pub const SESSION_TIMED_OUT: u16 = 4009;
    pub const INVALID_SHARD: u16 = 4010;
    pub const SHARDING_REQUIRED: u16 = 4011;
    pub const INVALID_VERSION: u16 = 4012;
    pub const INVALID_INTENT: u16 = 4013;
    pub const DISALLOWED_INTENT: u16 = 4014;

    // Used only when the client closes the socket itself.
    pub const HEARTBEAT_TIMEOUT: u16 = 4900;
    pub const CONNECT_TIMEOUT: u16 = 4901;
    pub const RECONNECT_REQUESTED: u16 = 4902;
}

/// What a close code means for the next connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Retrying cannot succeed without operator action.
    Fatal,
    /// Wait a fixed cooldown, then reconnect with the session intact.
    RateLimited,
    /// The session expired; identify from scratch.
    SessionTimeout,
    /// The session cannot be resumed; identify from scratch.
    NotResumable,
    /// Reconnect and resume.
    Resumable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseClassification {
    pub kind: CloseKind,
    pub message: &'static str,
}

impl CloseClassification {
    pub fn clears_session(&self) -> bool {
        matches!(self.kind, CloseKind::SessionTimeout | CloseKind::NotResumable)
    }
}

pub fn classify(code: u16) -> CloseClassification {
    use close_code::*;

    let (kind, message) = match code {
        AUTH_FAILED => (CloseKind::Fatal, "authentication failed: invalid token"),
        INVALID_SHARD => (CloseKind::Fatal, "invalid shard"),
        SHARDING_REQUIRED => (CloseKind::Fatal, "sharding required"),
        INVALID_VERSION => (CloseKind::Fatal, "invalid gateway API version"),
        INVALID_INTENT => (CloseKind::Fatal, "invalid intents"),
        DISALLOWED_INTENT => (CloseKind::Fatal, "disallowed intents: privileged intent not enabled"),
        RATE_LIMITED => (CloseKind::RateLimited, "rate limited: sending too many payloads"),
        SESSION_TIMED_OUT => (CloseKind::SessionTimeout, "session timed out"),
        INVALID_SEQ => (CloseKind::NotResumable, "invalid sequence number on resume"),
        NORMAL => (CloseKind::Resumable, "normal closure"),
        GOING_AWAY => (CloseKind::Resumable, "server going away"),
        ABNORMAL => (CloseKind::Resumable, "connection closed abnormally"),
        UNKNOWN_ERROR => (CloseKind::Resumable, "unknown server error"),
        UNKNOWN_OPCODE => (CloseKind::Resumable, "server received an unknown opcode"),
        DECODE_ERROR => (CloseKind::Resumable, "server could not decode a payload"),
        NOT_AUTHENTICATED => (CloseKind::Resumable, "payload sent before identifying"),
        ALREADY_AUTHENTICATED => (CloseKind::Resumable, "identified more than once"),
        HEARTBEAT_TIMEOUT => (CloseKind::Resumable, "heartbeat acknowledgement timed out"),
        CONNECT_TIMEOUT => (CloseKind::Resumable, "connection attempt timed out"),
        RECONNECT_REQUESTED => (CloseKind::Resumable, "reconnect requested"),
        _ => (CloseKind::Resumable, "connection closed"),
    };
    CloseClassification { kind, message }
}

#[cfg(test)]
mod tests {
    use super::close_code::*;
    use super::*;

    #[test]
    fn test_fatal_codes() {
        for code in [
            AUTH_FAILED,
            INVALID_SHARD,
            SHARDING_REQUIRED,
            INVALID_VERSION,
            INVALID_INTENT,
            DISALLOWED_INTENT,
        ] {
            assert_eq!(classify(code).kind, CloseKind::Fatal, "code {code}");
        }
    }

    #[test]
    fn test_resumable_codes() {
        for code in [
            NORMAL,
            GOING_AWAY,
            ABNORMAL,
            UNKNOWN_ERROR,
            UNKNOWN_OPCODE,
            DECODE_ERROR,
            NOT_AUTHENTICATED,
            ALREADY_AUTHENTICATED,
            HEARTBEAT_TIMEOUT,
            CONNECT_TIMEOUT,
            RECONNECT_REQUESTED,
        ] {
            let c = classify(code);
            assert_eq!(c.kind, CloseKind::Resumable, "code {code}");
            assert!(!c.clears_session());
        }
    }

    #[test]
    fn test_special_handling_codes() {
        assert_eq!(classify(RATE_LIMITED).kind, CloseKind::RateLimited);
        assert!(!classify(RATE_LIMITED).clears_session());
        assert_eq!(classify(SESSION_TIMED_OUT).kind, CloseKind::SessionTimeout);
        assert!(classify(SESSION_TIMED_OUT).clears_session());
        assert_eq!(classify(INVALID_SEQ).kind, CloseKind::NotResumable);
        assert!(classify(INVALID_SEQ).clears_session());
    }

    #[test]
    fn test_unknown_codes_default_to_resumable() {
        for code in [0, 1011, 3000, 4006, 4999, u16::MAX] {
            let c = classify(code);
            assert_eq!(c.kind, CloseKind::Resumable, "code {code}");
            assert_eq!(c.message, "connection closed");
        }
    }

    #[test]
    fn test_auth_failed_message() {
        assert!(classify(AUTH_FAILED).message.contains("authentication failed"));
    }
}
