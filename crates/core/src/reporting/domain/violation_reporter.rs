use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::presence::domain::presence_effect::ViolationKind;

/// A violation could not be recorded by the backend.
///
/// Reporting failures never reach presence tracking; they are logged and
/// dropped.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend rejected the call: {0}")]
    Rpc(String),
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Persists violations with the exam backend.
pub trait ViolationReporter: Send + Sync {
    fn report(&self, attempt_id: &str, kind: ViolationKind) -> Result<ServerAck, ReportError>;
}

/// The backend's acknowledgement, kept exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerAck(Value);

impl ServerAck {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Typed view of the escalation the backend decided on, when the ack
    /// has the usual `{action, count, total_penalty, message}` shape.
    pub fn instruction(&self) -> Option<ViolationInstruction> {
        ViolationInstruction::deserialize(&self.0).ok()
    }
}

/// What the exam page should do about a recorded violation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViolationInstruction {
    pub action: ViolationAction,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_penalty: f64,
    #[serde(default)]
    pub message: String,
}

/// Escalation ladder: a warning first, then a score penalty, then the
/// attempt is submitted on the candidate's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationAction {
    Warning,
    Penalty,
    AutoSubmit,
    Other(String),
}

impl<'de> Deserialize<'de> for ViolationAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let action = String::deserialize(deserializer)?;
        Ok(match action.as_str() {
            "warning" => ViolationAction::Warning,
            "penalty" => ViolationAction::Penalty,
            "auto_submit" => ViolationAction::AutoSubmit,
            _ => ViolationAction::Other(action),
        })
    }
}
