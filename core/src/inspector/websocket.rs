//! WebSocket inspector session
//!
//! Speaks CDP to a `node --inspect` (or any V8 inspector) endpoint.
//! One writer task drains outgoing frames; one reader task routes replies
//! to the pending command that issued them and notifications to the
//! subscribers of their method. Ordering is preserved per socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::protocol::{CommandReply, Frame, IncomingMessage, Request};
use super::{InspectorSession, TransportError};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CommandReply>>>>;
type ListenerMap = Arc<Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>>;

/// Inspector session over a WebSocket connection
pub struct WebSocketSession {
    url: String,
    next_id: u64,
    outgoing: Option<mpsc::UnboundedSender<Message>>,
    pending: PendingMap,
    listeners: ListenerMap,
    /// Set by the reader once the socket is gone; guarded by `pending`'s lock
    closed: Arc<AtomicBool>,
    send_task: Option<JoinHandle<()>>,
    recv_task: Option<JoinHandle<()>>,
}

impl WebSocketSession {
    /// Create an unconnected session for a `ws://` debugger URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_id: 0,
            outgoing: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            send_task: None,
            recv_task: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.outgoing.is_some() && !self.closed.load(Ordering::SeqCst)
    }
}

/// Deliver one text frame to whoever is waiting for it
fn route_frame(text: &str, pending: &PendingMap, listeners: &ListenerMap) {
    let message = match serde_json::from_str::<IncomingMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("[Inspector] Dropping malformed frame: {}", e);
            return;
        }
    };

    match message.classify() {
        Some(Frame::Reply { id, reply }) => match pending.lock().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(reply);
            }
            None => debug!("[Inspector] Reply {} has no pending command", id),
        },
        Some(Frame::Notification { method, params }) => {
            let mut listeners = listeners.lock();
            if let Some(subscribers) = listeners.get_mut(&method) {
                // Receivers that were dropped unsubscribe themselves here
                subscribers.retain(|tx| tx.send(params.clone()).is_ok());
            }
        }
        None => debug!("[Inspector] Ignoring frame without id or method"),
    }
}

#[async_trait]
impl InspectorSession for WebSocketSession {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.outgoing.is_some() {
            return Ok(());
        }

        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        debug!("[Inspector] Connected to {}", self.url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        self.closed.store(false, Ordering::SeqCst);

        // Task to forward outgoing frames to the socket
        self.send_task = Some(tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if ws_sender.send(message).await.is_err() || closing {
                    break;
                }
            }
        }));

        let pending = self.pending.clone();
        let listeners = self.listeners.clone();
        let closed = self.closed.clone();
        self.recv_task = Some(tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => route_frame(text.as_str(), &pending, &listeners),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[Inspector] Socket error: {}", e);
                        break;
                    }
                }
            }
            // Dropping the waiters fails every in-flight command
            let mut pending = pending.lock();
            closed.store(true, Ordering::SeqCst);
            pending.clear();
        }));

        self.outgoing = Some(tx);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(outgoing) = self.outgoing.take() else {
            return Ok(());
        };

        let _ = outgoing.send(Message::Close(None));
        drop(outgoing);
        if let Some(task) = self.send_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }

        self.pending.lock().clear();
        self.listeners.lock().clear();
        self.closed.store(true, Ordering::SeqCst);
        debug!("[Inspector] Disconnected from {}", self.url);
        Ok(())
    }

    async fn post(&mut self, method: &str, params: Value) -> Result<CommandReply, TransportError> {
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::NotConnected)?;

        self.next_id += 1;
        let id = self.next_id;
        let payload = serde_json::to_string(&Request { id, method, params })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected {
                    reason: "inspector closed the connection".to_string(),
                });
            }
            pending.insert(id, tx);
        }

        if let Err(e) = outgoing.send(Message::Text(payload.into())) {
            self.pending.lock().remove(&id);
            return Err(TransportError::SendFailed {
                method: method.to_string(),
                error: e.to_string(),
            });
        }

        rx.await.map_err(|_| TransportError::Disconnected {
            reason: format!("connection closed before reply to {}", method),
        })
    }

    fn subscribe(&mut self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        if let Some(task) = self.send_task.take() {
            task.abort();
        }
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }
    }
}
