//! Collect-and-annotate pipeline
//!
//! Glues the session driver to the annotator, and owns the choice of how
//! a session is obtained: a fresh node runtime per request, or a fixed
//! inspector endpoint shared by serialising requests onto it.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::annotate::Annotator;
use crate::config::Config;
use crate::driver::SessionDriver;
use crate::error::Result;
use crate::inspector::{InspectorSession, NodeRuntime, WebSocketSession};
use crate::profile::LogMessage;

/// Result of one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Source as an HTML fragment with inline type markers
    pub annotated: String,
    /// Console output in emission order
    pub logs: Vec<LogMessage>,
}

/// Run `source` over `session` and annotate the result
pub async fn collect_and_annotate<S: InspectorSession>(
    session: S,
    source: &str,
    driver: &SessionDriver,
    annotator: &Annotator,
) -> Result<Annotation> {
    let collected = driver.collect(session, source).await?;
    Ok(Annotation {
        annotated: annotator.annotate(&collected.profiles, source),
        logs: collected.logs,
    })
}

/// Configured entry point used by the CLI and the server
pub struct Typelens {
    config: Config,
    driver: SessionDriver,
    annotator: Annotator,
    /// A fixed endpoint accepts one session at a time
    endpoint_lock: Mutex<()>,
}

impl Typelens {
    pub fn new(config: Config) -> Self {
        Self {
            driver: SessionDriver::from_config(&config.inspector),
            annotator: Annotator::from_config(&config.annotate),
            endpoint_lock: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute `source` under type profiling and annotate it
    pub async fn collect_and_annotate(&self, source: &str) -> Result<Annotation> {
        if let Some(endpoint) = &self.config.inspector.endpoint {
            let _guard = self.endpoint_lock.lock().await;
            debug!("[Pipeline] Using fixed inspector endpoint {}", endpoint);
            let session = WebSocketSession::new(endpoint.clone());
            return collect_and_annotate(session, source, &self.driver, &self.annotator).await;
        }

        let runtime = NodeRuntime::launch(&self.config.inspector).await?;
        debug!("[Pipeline] Launched runtime (pid {:?})", runtime.pid());
        let session = WebSocketSession::new(runtime.ws_url.clone());
        let result = collect_and_annotate(session, source, &self.driver, &self.annotator).await;

        if let Err(e) = runtime.shutdown().await {
            warn!("[Pipeline] Failed to stop runtime: {}", e);
        }
        result
    }
}
