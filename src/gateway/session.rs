use serde::Serialize;

use super::intents::Intents;

/// Gateway session state, owned by the client actor.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub intents: Intents,
    pub sequence: Option<u64>,
    pub session_id: Option<String>,
    pub resume_address: Option<String>,
    pub reconnect_attempts: u32,
}

impl Session {
    pub fn new(token: String, intents: Intents) -> Self {
        Self {
            token,
            intents,
            sequence: None,
            session_id: None,
            resume_address: None,
            reconnect_attempts: 0,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Record an inbound sequence number. Values below the current one are
    /// refused; returns whether the sequence was taken.
    pub fn observe_sequence(&mut self, seq: u64) -> bool {
        match self.sequence {
            Some(current) if seq < current => false,
            _ => {
                self.sequence = Some(seq);
                true
            }
        }
    }

    pub fn establish(&mut self, session_id: String, resume_address: String) {
        self.session_id = Some(session_id);
        self.resume_address = Some(resume_address);
        self.reconnect_attempts = 0;
    }

    /// Forget the server-side session so the next handshake identifies.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.resume_address = None;
        self.sequence = None;
    }

    pub fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.resume_address.is_some()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            resume_address: self.resume_address.clone(),
            sequence: self.sequence,
            intents: self.intents.bits(),
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}

/// Read-only view of the session. Never includes the token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: Option<String>,
    pub resume_address: Option<String>,
    pub sequence: Option<u64>,
    pub intents: u32,
    pub reconnect_attempts: u32,
}
