//! Host runtime launcher
//!
//! Starts a throwaway `node --inspect` process and discovers the debugger
//! WebSocket URL it prints on stderr. Each request gets its own process, so
//! type profiles and globals never leak between requests.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::InspectorConfig;
use crate::error::{Result, TypelensError};

/// Keeps the event loop alive so the inspector stays reachable
const KEEP_ALIVE_SCRIPT: &str = "setInterval(() => {}, 1 << 30);";

/// Prefix node writes once the inspector is listening
const LISTENING_PREFIX: &str = "Debugger listening on ";

/// A running host runtime; the process dies with this handle
pub struct LaunchedRuntime {
    pub ws_url: String,
    child: Child,
}

impl LaunchedRuntime {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the process and wait for it to exit
    pub async fn shutdown(mut self) -> Result<()> {
        self.child.kill().await?;
        debug!("[Runtime] Stopped node inspector at {}", self.ws_url);
        Ok(())
    }
}

/// Launcher for node-based runtimes
pub struct NodeRuntime;

impl NodeRuntime {
    /// Spawn node with the inspector bound to an ephemeral loopback port
    pub async fn launch(config: &InspectorConfig) -> Result<LaunchedRuntime> {
        let mut cmd = Command::new(&config.node_binary);
        cmd.arg("--inspect=127.0.0.1:0")
            .args(&config.node_args)
            .arg("-e")
            .arg(KEEP_ALIVE_SCRIPT)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| TypelensError::Launch {
            message: format!("{}: {}", config.node_binary, e),
        })?;

        let stderr = child.stderr.take().ok_or_else(|| TypelensError::Launch {
            message: "runtime stderr was not captured".to_string(),
        })?;
        let mut lines = BufReader::new(stderr).lines();

        let timeout = Duration::from_secs(config.startup_timeout_secs);
        let discovered = tokio::time::timeout(timeout, async {
            while let Some(line) = lines.next_line().await? {
                if let Some(url) = parse_listening_line(&line) {
                    return Ok::<_, std::io::Error>(Some(url));
                }
                debug!("[Runtime] {}", line);
            }
            Ok(None)
        })
        .await;

        let ws_url = match discovered {
            Ok(Ok(Some(url))) => url,
            Ok(Ok(None)) => {
                return Err(TypelensError::Launch {
                    message: "runtime exited before the inspector started".to_string(),
                })
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(TypelensError::Launch {
                    message: format!("inspector did not start within {:?}", timeout),
                })
            }
        };

        // Keep draining stderr so the pipe never fills up
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[Runtime] {}", line);
            }
        });

        info!("[Runtime] Node inspector listening on {}", ws_url);
        Ok(LaunchedRuntime { ws_url, child })
    }
}

/// Extract the WebSocket URL from node's startup banner
pub fn parse_listening_line(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(LISTENING_PREFIX)?;
    let url = rest.split_whitespace().next()?;
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Some(url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listening_line() {
        let line = "Debugger listening on ws://127.0.0.1:40123/0f2c1b9e-8a61-4c3e-9d1f-5b2a7e8c9d10";
        assert_eq!(
            parse_listening_line(line).as_deref(),
            Some("ws://127.0.0.1:40123/0f2c1b9e-8a61-4c3e-9d1f-5b2a7e8c9d10")
        );
    }

    #[test]
    fn test_parse_ignores_other_output() {
        assert!(parse_listening_line("For help, see: https://nodejs.org/en/docs/inspector").is_none());
        assert!(parse_listening_line("Debugger attached.").is_none());
        assert!(parse_listening_line("Debugger listening on").is_none());
    }

    #[tokio::test]
    async fn test_launch_missing_binary() {
        let config = InspectorConfig {
            node_binary: "typelens-definitely-not-a-node-binary".to_string(),
            ..InspectorConfig::default()
        };
        match NodeRuntime::launch(&config).await {
            Err(TypelensError::Launch { message }) => {
                assert!(message.contains("typelens-definitely-not-a-node-binary"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("launch should fail"),
        }
    }
}
