//! CDP wire types
//!
//! Only the slice of the protocol the driver speaks is modelled here.
//! Everything else passes through as `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::{LogMessage, ScriptTypeProfile};

/// Method names used by the driver
pub mod methods {
    pub const RUNTIME_ENABLE: &str = "Runtime.enable";
    pub const RUNTIME_DISABLE: &str = "Runtime.disable";
    pub const RUNTIME_COMPILE_SCRIPT: &str = "Runtime.compileScript";
    pub const RUNTIME_RUN_SCRIPT: &str = "Runtime.runScript";
    pub const RUNTIME_CONSOLE_API_CALLED: &str = "Runtime.consoleAPICalled";
    pub const PROFILER_ENABLE: &str = "Profiler.enable";
    pub const PROFILER_DISABLE: &str = "Profiler.disable";
    pub const PROFILER_START_TYPE_PROFILE: &str = "Profiler.startTypeProfile";
    pub const PROFILER_TAKE_TYPE_PROFILE: &str = "Profiler.takeTypeProfile";
    pub const PROFILER_STOP_TYPE_PROFILE: &str = "Profiler.stopTypeProfile";
    pub const HEAP_PROFILER_COLLECT_GARBAGE: &str = "HeapProfiler.collectGarbage";
}

/// Outgoing command frame
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// Any frame the inspector sends back
///
/// Replies carry an `id`; notifications carry a `method` and no `id`.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RemoteError>,
}

/// Classified incoming frame
#[derive(Debug)]
pub enum Frame {
    Reply { id: u64, reply: CommandReply },
    Notification { method: String, params: Value },
}

impl IncomingMessage {
    /// Split into reply or notification; frames with neither are dropped
    pub fn classify(self) -> Option<Frame> {
        match (self.id, self.method) {
            (Some(id), _) => Some(Frame::Reply {
                id,
                reply: CommandReply {
                    result: self.result,
                    error: self.error,
                },
            }),
            (None, Some(method)) => Some(Frame::Notification {
                method,
                params: self.params,
            }),
            (None, None) => None,
        }
    }
}

/// Error object returned by the inspector for a failed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Reply to a single command
#[derive(Debug, Clone, Default)]
pub struct CommandReply {
    pub result: Option<Value>,
    pub error: Option<RemoteError>,
}

impl CommandReply {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn remote_error(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RemoteError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// `exceptionDetails` carried by the result, if the script raised
    pub fn exception_details(&self) -> Option<ExceptionDetails> {
        let details = self.result.as_ref()?.get("exceptionDetails")?;
        serde_json::from_value(details.clone()).ok()
    }

    /// Description of whatever made this command fail, if anything did
    pub fn failure(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.message.clone());
        }
        self.exception_details().map(|d| d.description())
    }
}

/// Mirror of `Runtime.ExceptionDetails`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub exception_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Thrown value's description, falling back to the summary text
    pub fn description(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.text.clone())
    }
}

/// Mirror of `Runtime.RemoteObject`, trimmed to the fields we render
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unserializable_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteObject {
    /// Render the way a console would print it
    pub fn display(&self) -> String {
        match &self.value {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            // serde folds a JSON null value into None
            None if self.subtype.as_deref() == Some("null") => "null".to_string(),
            None => self
                .unserializable_value
                .clone()
                .or_else(|| self.description.clone())
                .unwrap_or_else(|| self.kind.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScriptParams<'a> {
    pub expression: &'a str,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub persist_script: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScriptResult {
    #[serde(default)]
    pub script_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptParams<'a> {
    pub script_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TakeTypeProfileResult {
    #[serde(default)]
    pub result: Vec<ScriptTypeProfile>,
}

/// Params of `Runtime.consoleAPICalled`
#[derive(Debug, Deserialize)]
pub struct ConsoleApiCalled {
    #[serde(rename = "type")]
    pub level: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

impl From<ConsoleApiCalled> for LogMessage {
    fn from(event: ConsoleApiCalled) -> Self {
        let value = event
            .args
            .iter()
            .map(RemoteObject::display)
            .collect::<Vec<_>>()
            .join(" ");
        LogMessage {
            level: event.level,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_reply_and_notification() {
        let reply: IncomingMessage =
            serde_json::from_value(json!({"id": 7, "result": {"scriptId": "42"}})).unwrap();
        match reply.classify() {
            Some(Frame::Reply { id, reply }) => {
                assert_eq!(id, 7);
                assert_eq!(reply.result.unwrap()["scriptId"], "42");
            }
            other => panic!("expected reply, got {:?}", other),
        }

        let event: IncomingMessage = serde_json::from_value(json!({
            "method": "Runtime.consoleAPICalled",
            "params": {"type": "log", "args": []}
        }))
        .unwrap();
        assert!(matches!(
            event.classify(),
            Some(Frame::Notification { ref method, .. }) if method == "Runtime.consoleAPICalled"
        ));

        let empty: IncomingMessage = serde_json::from_value(json!({})).unwrap();
        assert!(empty.classify().is_none());
    }

    #[test]
    fn test_remote_error_is_failure() {
        let reply = CommandReply::remote_error(-32601, "'Profiler.startTypeProfile' wasn't found");
        assert_eq!(
            reply.failure().as_deref(),
            Some("'Profiler.startTypeProfile' wasn't found")
        );
    }

    #[test]
    fn test_exception_details_description() {
        let reply = CommandReply::ok(json!({
            "result": {"type": "object"},
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": 0,
                "columnNumber": 6,
                "exception": {"type": "object", "subtype": "error", "description": "Error: boom\n    at <anonymous>:1:7"}
            }
        }));
        assert_eq!(reply.failure().unwrap(), "Error: boom\n    at <anonymous>:1:7");

        let syntax = CommandReply::ok(json!({
            "exceptionDetails": {"exceptionId": 2, "text": "SyntaxError: Unexpected end of input"}
        }));
        assert_eq!(syntax.failure().unwrap(), "SyntaxError: Unexpected end of input");

        assert!(CommandReply::ok(json!({"scriptId": "3"})).failure().is_none());
    }

    #[test]
    fn test_console_event_to_log_message() {
        let event: ConsoleApiCalled = serde_json::from_value(json!({
            "type": "warn",
            "args": [
                {"type": "string", "value": "count"},
                {"type": "number", "value": 3},
                {"type": "number", "unserializableValue": "NaN", "description": "NaN"},
                {"type": "object", "className": "Object", "description": "Object"},
                {"type": "undefined"}
            ],
            "executionContextId": 1,
            "timestamp": 1.0
        }))
        .unwrap();
        let log = LogMessage::from(event);
        assert_eq!(log.level, "warn");
        assert_eq!(log.value, "count 3 NaN Object undefined");
    }

    #[test]
    fn test_compile_params_wire_names() {
        let params = CompileScriptParams {
            expression: "1 + 1",
            source_url: "typelens://snippet-1.js".to_string(),
            persist_script: true,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["expression"], "1 + 1");
        assert_eq!(value["sourceURL"], "typelens://snippet-1.js");
        assert_eq!(value["persistScript"], true);
    }
}
