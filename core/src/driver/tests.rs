use super::*;
use crate::inspector::protocol::CommandReply;
use crate::inspector::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared view into a FakeSession after it has been moved into the driver
#[derive(Clone, Default)]
struct Probe {
    calls: Arc<Mutex<Vec<String>>>,
    disconnects: Arc<AtomicUsize>,
}

impl Probe {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Scripted inspector: canned replies per method, optional faults, and
/// notifications emitted just before replying to a given method
struct FakeSession {
    probe: Probe,
    replies: HashMap<&'static str, CommandReply>,
    events: HashMap<&'static str, Vec<Value>>,
    transport_fault_on: Option<&'static str>,
    fail_connect: bool,
    fail_disconnect: bool,
    listeners: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

impl FakeSession {
    fn new() -> (Self, Probe) {
        let probe = Probe::default();
        let mut replies = HashMap::new();
        replies.insert(
            methods::RUNTIME_COMPILE_SCRIPT,
            CommandReply::ok(json!({"scriptId": "42"})),
        );
        replies.insert(
            methods::RUNTIME_RUN_SCRIPT,
            CommandReply::ok(json!({"result": {"type": "undefined"}})),
        );
        replies.insert(
            methods::PROFILER_TAKE_TYPE_PROFILE,
            CommandReply::ok(json!({"result": [
                {"scriptId": "7", "url": "stale.js", "entries": [
                    {"offset": 0, "types": [{"name": "Stale"}]}
                ]},
                {"scriptId": "42", "url": "typelens://snippet.js", "entries": [
                    {"offset": 4, "types": [{"name": "number"}]},
                    {"offset": 0, "types": [{"name": "Object"}]}
                ]}
            ]})),
        );
        let session = Self {
            probe: probe.clone(),
            replies,
            events: HashMap::new(),
            transport_fault_on: None,
            fail_connect: false,
            fail_disconnect: false,
            listeners: HashMap::new(),
        };
        (session, probe)
    }

    fn reply(mut self, method: &'static str, reply: CommandReply) -> Self {
        self.replies.insert(method, reply);
        self
    }

    fn emit_before(mut self, method: &'static str, event: Value) -> Self {
        self.events.entry(method).or_default().push(event);
        self
    }
}

#[async_trait]
impl InspectorSession for FakeSession {
    async fn connect(&mut self) -> std::result::Result<(), TransportError> {
        self.probe.calls.lock().push("connect".to_string());
        if self.fail_connect {
            return Err(TransportError::ConnectFailed {
                url: "ws://fake".to_string(),
                reason: "refused".to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> std::result::Result<(), TransportError> {
        self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(TransportError::Disconnected {
                reason: "close frame rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn post(&mut self, method: &str, _params: Value) -> std::result::Result<CommandReply, TransportError> {
        self.probe.calls.lock().push(method.to_string());
        if self.transport_fault_on == Some(method) {
            return Err(TransportError::Disconnected {
                reason: "socket reset".to_string(),
            });
        }
        if let Some(events) = self.events.get(method) {
            if let Some(subscribers) = self.listeners.get_mut(methods::RUNTIME_CONSOLE_API_CALLED) {
                for event in events {
                    subscribers.retain(|tx| tx.send(event.clone()).is_ok());
                }
            }
        }
        Ok(self
            .replies
            .get(method)
            .cloned()
            .unwrap_or_else(|| CommandReply::ok(json!({}))))
    }

    fn subscribe(&mut self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.entry(method.to_string()).or_default().push(tx);
        rx
    }
}

fn console(level: &str, text: &str) -> Value {
    json!({"type": level, "args": [{"type": "string", "value": text}]})
}

fn thrown(description: &str) -> CommandReply {
    CommandReply::ok(json!({
        "result": {"type": "object", "subtype": "error"},
        "exceptionDetails": {
            "exceptionId": 1,
            "text": "Uncaught",
            "exception": {"type": "object", "subtype": "error", "description": description}
        }
    }))
}

const FULL_SEQUENCE: [&str; 11] = [
    "connect",
    methods::RUNTIME_ENABLE,
    methods::PROFILER_ENABLE,
    methods::PROFILER_START_TYPE_PROFILE,
    methods::RUNTIME_COMPILE_SCRIPT,
    methods::RUNTIME_RUN_SCRIPT,
    methods::HEAP_PROFILER_COLLECT_GARBAGE,
    methods::PROFILER_TAKE_TYPE_PROFILE,
    methods::PROFILER_STOP_TYPE_PROFILE,
    methods::PROFILER_DISABLE,
    methods::RUNTIME_DISABLE,
];

#[tokio::test]
async fn test_full_sequence_in_order() {
    let (session, probe) = FakeSession::new();
    let collected = SessionDriver::default().collect(session, "let x = 1;").await.unwrap();

    assert_eq!(probe.calls(), FULL_SEQUENCE.to_vec());
    assert_eq!(probe.disconnects(), 1);
    assert_eq!(collected.script_id, "42");
}

#[tokio::test]
async fn test_foreign_script_profiles_are_discarded() {
    let (session, _probe) = FakeSession::new();
    let collected = SessionDriver::default().collect(session, "let x = 1;").await.unwrap();

    assert_eq!(collected.profiles.len(), 1);
    assert_eq!(collected.profiles[0].script_id, "42");
    assert!(collected
        .profiles
        .iter()
        .flat_map(|p| &p.entries)
        .all(|s| s.types.iter().all(|t| t.name != "Stale")));
}

#[tokio::test]
async fn test_logs_kept_in_arrival_order() {
    let (session, _probe) = FakeSession::new();
    let session = session
        .emit_before(methods::RUNTIME_RUN_SCRIPT, console("log", "first"))
        .emit_before(methods::RUNTIME_RUN_SCRIPT, console("error", "second"))
        .emit_before(methods::PROFILER_TAKE_TYPE_PROFILE, console("info", "late"));

    let collected = SessionDriver::default().collect(session, "console.log('first')").await.unwrap();

    let logs: Vec<(&str, &str)> = collected
        .logs
        .iter()
        .map(|l| (l.level.as_str(), l.value.as_str()))
        .collect();
    assert_eq!(logs, vec![("log", "first"), ("error", "second"), ("info", "late")]);
}

#[tokio::test]
async fn test_events_before_subscription_are_not_logged() {
    let (session, _probe) = FakeSession::new();
    let session = session.emit_before(methods::RUNTIME_ENABLE, console("log", "too early"));

    let collected = SessionDriver::default().collect(session, "1").await.unwrap();
    assert!(collected.logs.is_empty());
}

#[tokio::test]
async fn test_compile_failure_aborts() {
    let (session, probe) = FakeSession::new();
    let session = session.reply(
        methods::RUNTIME_COMPILE_SCRIPT,
        CommandReply::ok(json!({
            "exceptionDetails": {"exceptionId": 1, "text": "Uncaught", "exception": {
                "type": "object", "subtype": "error",
                "description": "SyntaxError: Unexpected end of input"
            }}
        })),
    );

    let err = SessionDriver::default().collect(session, "let x = (").await.unwrap_err();

    assert_eq!(err.to_string(), "SyntaxError: Unexpected end of input");
    assert!(err.is_script_error());
    assert_eq!(probe.calls().last().map(String::as_str), Some(methods::RUNTIME_COMPILE_SCRIPT));
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_thrown_script_surfaces_description() {
    let (session, probe) = FakeSession::new();
    let session = session.reply(methods::RUNTIME_RUN_SCRIPT, thrown("Error: boom\n    at snippet.js:1:7"));

    let err = SessionDriver::default()
        .collect(session, "throw new Error('boom')")
        .await
        .unwrap_err();

    match err {
        TypelensError::Protocol { message } => assert_eq!(message, "Error: boom\n    at snippet.js:1:7"),
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert!(!probe.calls().iter().any(|c| c == methods::PROFILER_TAKE_TYPE_PROFILE));
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_remote_error_aborts() {
    let (session, probe) = FakeSession::new();
    let session = session.reply(
        methods::PROFILER_START_TYPE_PROFILE,
        CommandReply::remote_error(-32601, "'Profiler.startTypeProfile' wasn't found"),
    );

    let err = SessionDriver::default().collect(session, "1").await.unwrap_err();

    assert_eq!(err.to_string(), "'Profiler.startTypeProfile' wasn't found");
    assert_eq!(probe.calls().len(), 4);
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_transport_fault_still_disconnects() {
    let (mut session, probe) = FakeSession::new();
    session.transport_fault_on = Some(methods::HEAP_PROFILER_COLLECT_GARBAGE);

    let err = SessionDriver::default().collect(session, "1").await.unwrap_err();

    assert!(matches!(err, TypelensError::Transport { .. }));
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_connect_failure_still_disconnects() {
    let (mut session, probe) = FakeSession::new();
    session.fail_connect = true;

    let err = SessionDriver::default().collect(session, "1").await.unwrap_err();

    assert!(matches!(err, TypelensError::Transport { .. }));
    assert_eq!(probe.calls(), vec!["connect".to_string()]);
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_disconnect_failure_after_success_fails_request() {
    let (mut session, probe) = FakeSession::new();
    session.fail_disconnect = true;

    let err = SessionDriver::default().collect(session, "1").await.unwrap_err();

    assert!(matches!(err, TypelensError::Transport { .. }));
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_disconnect_failure_keeps_script_error() {
    let (mut session, probe) = FakeSession::new();
    session.fail_disconnect = true;
    let session = session.reply(methods::RUNTIME_RUN_SCRIPT, thrown("TypeError: x is not a function"));

    let err = SessionDriver::default().collect(session, "x()").await.unwrap_err();

    assert_eq!(err.to_string(), "TypeError: x is not a function");
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn test_missing_script_id_is_protocol_error() {
    let (session, probe) = FakeSession::new();
    let session = session.reply(methods::RUNTIME_COMPILE_SCRIPT, CommandReply::ok(json!({})));

    let err = SessionDriver::default().collect(session, "1").await.unwrap_err();

    assert!(err.is_script_error());
    assert!(err.to_string().contains("scriptId"));
    assert_eq!(probe.disconnects(), 1);
}
