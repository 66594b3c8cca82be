//! Session driver
//!
//! Walks one inspector session through the type-profiling lifecycle:
//! enable domains, compile and run the snippet, harvest the type profile,
//! tear everything down. The session is disconnected exactly once no
//! matter where the sequence stops.

#[cfg(test)]
mod tests;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::InspectorConfig;
use crate::error::{Result, TypelensError};
use crate::inspector::protocol::{
    methods, CompileScriptParams, CompileScriptResult, ConsoleApiCalled, RunScriptParams,
    TakeTypeProfileResult,
};
use crate::inspector::InspectorSession;
use crate::profile::{retain_script, LogMessage, ScriptTypeProfile};

/// Everything harvested from one successful run
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Script identifier the runtime assigned to the snippet
    pub script_id: String,
    /// Type profiles belonging to that script only
    pub profiles: Vec<ScriptTypeProfile>,
    /// Console output in emission order
    pub logs: Vec<LogMessage>,
}

/// Drives the profiling command sequence over an inspector session
#[derive(Debug, Clone)]
pub struct SessionDriver {
    source_url_prefix: String,
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self::from_config(&InspectorConfig::default())
    }
}

impl SessionDriver {
    pub fn new(source_url_prefix: impl Into<String>) -> Self {
        Self {
            source_url_prefix: source_url_prefix.into(),
        }
    }

    pub fn from_config(config: &InspectorConfig) -> Self {
        Self::new(config.source_url_prefix.clone())
    }

    /// Run `source` under type profiling and collect what it produced
    ///
    /// Takes ownership of the session: it is always disconnected before
    /// this returns. Nothing partial is returned on failure.
    pub async fn collect<S: InspectorSession>(&self, mut session: S, source: &str) -> Result<Collected> {
        let outcome = self.run_sequence(&mut session, source).await;
        let closed = session.disconnect().await;

        match (outcome, closed) {
            (Ok(collected), Ok(())) => {
                info!(
                    "[SessionDriver] Script {} produced {} profile entries and {} log messages",
                    collected.script_id,
                    collected.profiles.iter().map(|p| p.entries.len()).sum::<usize>(),
                    collected.logs.len()
                );
                Ok(collected)
            }
            (Ok(_), Err(e)) => {
                warn!("[SessionDriver] Disconnect failed: {}", e);
                Err(e.into())
            }
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("[SessionDriver] Disconnect failed after error '{}': {}", e, close_err);
                Err(e)
            }
        }
    }

    async fn run_sequence<S: InspectorSession>(&self, session: &mut S, source: &str) -> Result<Collected> {
        session.connect().await?;

        command(session, methods::RUNTIME_ENABLE, json!({})).await?;
        command(session, methods::PROFILER_ENABLE, json!({})).await?;
        command(session, methods::PROFILER_START_TYPE_PROFILE, json!({})).await?;

        let source_url = format!("{}-{}.js", self.source_url_prefix, Uuid::new_v4());
        let compiled: CompileScriptResult = typed_command(
            session,
            methods::RUNTIME_COMPILE_SCRIPT,
            serde_json::to_value(CompileScriptParams {
                expression: source,
                source_url,
                persist_script: true,
            })?,
        )
        .await?;
        let script_id = compiled
            .script_id
            .ok_or_else(|| TypelensError::protocol("Runtime.compileScript returned no scriptId"))?;
        debug!("[SessionDriver] Compiled snippet as script {}", script_id);

        // Registered before the run so nothing the script logs is missed
        let mut console = session.subscribe(methods::RUNTIME_CONSOLE_API_CALLED);

        command(
            session,
            methods::RUNTIME_RUN_SCRIPT,
            serde_json::to_value(RunScriptParams { script_id: &script_id })?,
        )
        .await?;

        command(session, methods::HEAP_PROFILER_COLLECT_GARBAGE, json!({})).await?;

        let harvested: TakeTypeProfileResult =
            typed_command(session, methods::PROFILER_TAKE_TYPE_PROFILE, json!({})).await?;
        let harvested_count = harvested.result.len();
        let profiles = retain_script(harvested.result, &script_id);
        if profiles.len() < harvested_count {
            debug!(
                "[SessionDriver] Discarded {} profiles from other scripts",
                harvested_count - profiles.len()
            );
        }

        command(session, methods::PROFILER_STOP_TYPE_PROFILE, json!({})).await?;
        command(session, methods::PROFILER_DISABLE, json!({})).await?;
        command(session, methods::RUNTIME_DISABLE, json!({})).await?;

        Ok(Collected {
            script_id,
            profiles,
            logs: drain_logs(&mut console),
        })
    }
}

/// Send one command; a remote error or a raised exception ends the run
async fn command<S: InspectorSession>(session: &mut S, method: &str, params: Value) -> Result<Value> {
    debug!("[SessionDriver] -> {}", method);
    let reply = session.post(method, params).await?;
    if let Some(description) = reply.failure() {
        warn!("[SessionDriver] {} failed: {}", method, description);
        return Err(TypelensError::protocol(description));
    }
    Ok(reply.result.unwrap_or(Value::Null))
}

async fn typed_command<S: InspectorSession, T: DeserializeOwned>(
    session: &mut S,
    method: &str,
    params: Value,
) -> Result<T> {
    let result = command(session, method, params).await?;
    serde_json::from_value(result).map_err(|e| {
        TypelensError::protocol(format!("unexpected {} result: {}", method, e))
    })
}

/// Everything queued on the console listener, in arrival order
fn drain_logs(console: &mut mpsc::UnboundedReceiver<Value>) -> Vec<LogMessage> {
    let mut logs = Vec::new();
    while let Ok(params) = console.try_recv() {
        match serde_json::from_value::<ConsoleApiCalled>(params) {
            Ok(event) => logs.push(event.into()),
            Err(e) => warn!("[SessionDriver] Skipping unreadable console event: {}", e),
        }
    }
    logs
}
