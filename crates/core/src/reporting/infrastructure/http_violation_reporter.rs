use std::time::Duration;

use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::presence::domain::presence_effect::ViolationKind;
use crate::reporting::domain::violation_reporter::{ReportError, ServerAck, ViolationReporter};
use crate::shared::constants::{RPC_ID_RANGE, VIOLATION_ENDPOINT_PATH};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts violations to the exam backend as JSON-RPC calls.
///
/// `POST {base_url}/certification/quiz/violation/{attempt_id}`. Use
/// [`HttpViolationReporter::with_client`] to supply a client that carries
/// the candidate's session cookie.
pub struct HttpViolationReporter {
    client: reqwest::blocking::Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    params: ViolationParams,
    id: u32,
}

#[derive(Debug, Serialize)]
struct ViolationParams {
    #[serde(rename = "type")]
    kind: ViolationKind,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl HttpViolationReporter {
    pub fn new(base_url: &str) -> Result<Self, ReportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Transport {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> Result<Self, ReportError> {
        let invalid = |reason: String| ReportError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// The attempt id is always a single, percent-encoded path segment.
    pub fn endpoint(&self, attempt_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(VIOLATION_ENDPOINT_PATH.split('/').filter(|s| !s.is_empty()))
                .push(attempt_id);
        }
        url
    }
}

fn envelope(kind: ViolationKind) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0",
        method: "call",
        params: ViolationParams { kind },
        id: rand::thread_rng().gen_range(0..RPC_ID_RANGE),
    }
}

fn parse_response(body: &str) -> Result<ServerAck, ReportError> {
    let response: RpcResponse =
        serde_json::from_str(body).map_err(|e| ReportError::Malformed(e.to_string()))?;
    if let Some(error) = response.error {
        let reason = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ReportError::Rpc(reason));
    }
    match response.result {
        Some(result) if !result.is_null() => Ok(ServerAck::new(result)),
        _ => Err(ReportError::Malformed("response has no result".to_string())),
    }
}

impl ViolationReporter for HttpViolationReporter {
    fn report(&self, attempt_id: &str, kind: ViolationKind) -> Result<ServerAck, ReportError> {
        let url = self.endpoint(attempt_id);
        let transport = |e: reqwest::Error| ReportError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(url.clone())
            .json(&envelope(kind))
            .send()
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().map_err(transport)?;
        if !status.is_success() {
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let ack = parse_response(&body)?;
        log::debug!("Violation {kind} for attempt {attempt_id} acknowledged");
        Ok(ack)
    }
}
