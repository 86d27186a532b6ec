//! JSON-lines protocol for driving a conversation from another process.
//!
//! Each request is one JSON object per line:
//!
//! ```json
//! {"id": 1, "method": "respond", "params": {"input": "I am sad", "trace": true}}
//! ```
//!
//! and each response is one JSON object per line carrying either `result` or
//! `error`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::trace::TraceLog;
use crate::Eliza;

/// Methods understood by [`handle_ipc_request`]
pub const METHODS: &[&str] = &[
    "getManifest",
    "load",
    "initial",
    "respond",
    "final",
    "memory",
    "reset",
];

/// Describes the engine to a connecting process
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineManifest {
    /// Crate name
    pub name: String,
    /// Crate version
    pub version: String,
    /// Supported request methods
    pub methods: Vec<String>,
}

impl Default for EngineManifest {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            methods: METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One request line
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpcRequest {
    /// Caller-chosen id echoed in the response
    pub id: u64,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Value,
}

/// One response line
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpcResponse {
    /// Id of the request being answered
    pub id: u64,
    /// Method result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    /// Successful response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed response
    pub fn error(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// A conversation served over the protocol, with a trace log attached so
/// `respond` can return the decisions it made.
#[derive(Debug)]
pub struct IpcSession {
    eliza: Eliza,
    trace: TraceLog,
}

impl IpcSession {
    /// Wraps `eliza` and subscribes the session's trace log to it
    pub fn new(mut eliza: Eliza) -> Self {
        let trace = TraceLog::new();
        eliza.subscribe(trace.clone());
        Self { eliza, trace }
    }

    /// The wrapped conversation
    pub fn eliza(&self) -> &Eliza {
        &self.eliza
    }
}

fn str_param<'a>(request: &'a IpcRequest, name: &str) -> Option<&'a str> {
    request.params.get(name).and_then(Value::as_str)
}

/// Runs one request against `session`.
pub fn handle_ipc_request(session: &mut IpcSession, request: &IpcRequest) -> IpcResponse {
    debug!(id = request.id, method = %request.method, "ipc request");
    let id = request.id;
    match request.method.as_str() {
        "getManifest" => match serde_json::to_value(EngineManifest::default()) {
            Ok(manifest) => IpcResponse::success(id, manifest),
            Err(e) => IpcResponse::error(id, e.to_string()),
        },
        "load" => {
            let loaded = if let Some(source) = str_param(request, "source") {
                session.eliza.load(source).map_err(|e| e.to_string())
            } else if let Some(path) = str_param(request, "path") {
                session.eliza.load_file(path).map_err(|e| e.to_string())
            } else {
                Err("load requires a `source` or `path` parameter".to_string())
            };
            match loaded {
                Ok(()) => {
                    let keywords = session.eliza.script().map_or(0, |s| s.keywords().len());
                    IpcResponse::success(id, json!({ "loaded": true, "keywords": keywords }))
                }
                Err(e) => IpcResponse::error(id, e),
            }
        }
        "initial" => match session.eliza.initial() {
            Ok(text) => IpcResponse::success(id, json!({ "text": text })),
            Err(e) => IpcResponse::error(id, e.to_string()),
        },
        "final" => match session.eliza.final_line() {
            Ok(text) => IpcResponse::success(id, json!({ "text": text })),
            Err(e) => IpcResponse::error(id, e.to_string()),
        },
        "respond" => {
            let Some(input) = str_param(request, "input") else {
                return IpcResponse::error(id, "respond requires an `input` parameter");
            };
            let want_trace = request
                .params
                .get("trace")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            session.trace.take();
            let quit = session.eliza.is_quit(input);
            match session.eliza.respond(input) {
                Ok(response) => {
                    let events = session.trace.take();
                    let mut result = json!({ "response": response, "quit": quit });
                    if want_trace {
                        result["trace"] = serde_json::to_value(events).unwrap_or(Value::Null);
                    }
                    IpcResponse::success(id, result)
                }
                Err(e) => IpcResponse::error(id, e.to_string()),
            }
        }
        "memory" => IpcResponse::success(id, json!({ "entries": session.eliza.memory() })),
        "reset" => {
            session.eliza.reset();
            IpcResponse::success(id, json!({ "reset": true }))
        }
        _ => IpcResponse::error(id, format!("Unknown method: {}", request.method)),
    }
}
