//! JSON control surface for observers.
//!
//! Requests are objects tagged by `action`; every request gets exactly one
//! response and nothing here panics or returns an error to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::OrchestratorError,
    orchestrator::DownloadOrchestrator,
    types::{BatchStatus, DownloadItem},
};

const KNOWN_ACTIONS: &[&str] = &[
    "startBulkDownload",
    "getDownloadStatus",
    "cancelDownloads",
    "ping",
];

/// A control message addressed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlRequest {
    StartBulkDownload {
        files: Vec<DownloadItem>,
        #[serde(default)]
        delay: u64,
    },
    GetDownloadStatus,
    CancelDownloads,
    Ping,
}

/// Success/failure acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    /// Bare success.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    /// Success carrying a human-readable message.
    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Failure carrying the error text.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Status(BatchStatus),
    Ack(Ack),
}

impl ControlResponse {
    /// JSON shape sent back to the caller.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": e.to_string() })
        })
    }
}

/// Execute a typed request.
pub fn dispatch(orchestrator: &DownloadOrchestrator, request: ControlRequest) -> ControlResponse {
    match request {
        ControlRequest::StartBulkDownload { files, delay } => {
            match orchestrator.start_batch(files, delay) {
                Ok(()) => ControlResponse::Ack(Ack::ok_with_message("Downloads started")),
                Err(e) => ControlResponse::Ack(Ack::failure(e.to_string())),
            }
        }
        ControlRequest::GetDownloadStatus => {
            let status = orchestrator.status();
            tracing::debug!(
                in_progress = status.in_progress,
                completed = status.completed,
                total = status.total,
                remaining = status.remaining,
                "Download status request"
            );
            ControlResponse::Status(status)
        }
        ControlRequest::CancelDownloads => {
            orchestrator.cancel();
            ControlResponse::Ack(Ack::ok())
        }
        ControlRequest::Ping => {
            ControlResponse::Ack(Ack::ok_with_message("Background orchestrator is alive"))
        }
    }
}

/// Parse and execute an untyped message.
///
/// Unknown or missing actions and malformed payloads are answered with a
/// failure [`Ack`] naming the problem.
pub fn handle_message(orchestrator: &DownloadOrchestrator, message: &Value) -> ControlResponse {
    match parse_request(message) {
        Ok(request) => dispatch(orchestrator, request),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected control message");
            ControlResponse::Ack(Ack::failure(e.to_string()))
        }
    }
}

fn parse_request(message: &Value) -> Result<ControlRequest, OrchestratorError> {
    let action = message
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| OrchestratorError::InvalidRequest("missing action".to_string()))?;

    if !KNOWN_ACTIONS.contains(&action) {
        return Err(OrchestratorError::Other(format!("Unknown action: {}", action)));
    }

    serde_json::from_value(message.clone())
        .map_err(|e| OrchestratorError::InvalidRequest(format!("{}: {}", action, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::OrchestratorConfig, error::HostError, host::DownloadHost, types::DownloadId};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct NullHost;

    #[async_trait]
    impl DownloadHost for NullHost {
        async fn initiate(&self, _item: &DownloadItem) -> Result<DownloadId, HostError> {
            Ok(DownloadId::generate())
        }
    }

    fn orchestrator() -> DownloadOrchestrator {
        DownloadOrchestrator::new(Arc::new(NullHost), OrchestratorConfig::default())
    }

    #[test]
    fn test_parse_start_request() {
        let request: ControlRequest = serde_json::from_value(json!({
            "action": "startBulkDownload",
            "files": [{"url": "https://a/x.pdf", "fileName": "x.pdf"}],
            "delay": 1000
        }))
        .unwrap();
        assert_eq!(
            request,
            ControlRequest::StartBulkDownload {
                files: vec![DownloadItem::new("https://a/x.pdf", "x.pdf")],
                delay: 1000,
            }
        );
    }

    #[test]
    fn test_ping() {
        let response = handle_message(&orchestrator(), &json!({"action": "ping"})).to_value();
        assert_eq!(response["success"], true);
        assert!(response["message"].is_string());
    }

    #[test]
    fn test_unknown_action() {
        let response =
            handle_message(&orchestrator(), &json!({"action": "launchRockets"})).to_value();
        assert_eq!(response["success"], false);
        assert_eq!(response["error"], "Unknown action: launchRockets");
    }

    #[test]
    fn test_missing_action() {
        let response = handle_message(&orchestrator(), &json!({"files": []})).to_value();
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("missing action"));
    }

    #[test]
    fn test_malformed_start() {
        let response = handle_message(
            &orchestrator(),
            &json!({"action": "startBulkDownload", "files": "nope"}),
        )
        .to_value();
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().starts_with("Invalid request"));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let response = handle_message(
            &orchestrator(),
            &json!({"action": "startBulkDownload", "files": [], "delay": -5}),
        )
        .to_value();
        assert_eq!(response["success"], false);
    }

    #[test]
    fn test_idle_status_shape() {
        let response =
            handle_message(&orchestrator(), &json!({"action": "getDownloadStatus"})).to_value();
        assert_eq!(
            response,
            json!({
                "inProgress": false,
                "current": null,
                "remaining": 0,
                "completed": 0,
                "total": 0,
                "delay": 0
            })
        );
    }

    #[test]
    fn test_cancel_always_succeeds() {
        let response =
            handle_message(&orchestrator(), &json!({"action": "cancelDownloads"})).to_value();
        assert_eq!(response, json!({"success": true}));
    }

    #[tokio::test]
    async fn test_start_then_reject() {
        let orch = orchestrator();
        let start = json!({
            "action": "startBulkDownload",
            "files": [{"url": "https://a/x.pdf", "fileName": "x.pdf"},
                      {"url": "https://a/y.pdf", "fileName": "y.pdf"}],
            "delay": 60000
        });

        let first = handle_message(&orch, &start).to_value();
        assert_eq!(first["success"], true);

        let second = handle_message(&orch, &start).to_value();
        assert_eq!(second["success"], false);
        assert_eq!(second["error"], "Download already in progress");

        orch.cancel();
    }
}
