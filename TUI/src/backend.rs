// Transport to the display service: one WebSocket per connection attempt

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, trace, warn};
use url::Url;

/// Close code reported when the socket ended without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Requests from the UI loop to the transport task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Connect { attempt: u64, endpoint: Url },
}

/// What the transport task observed, tagged with the attempt it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened { attempt: u64 },
    Frame { attempt: u64, text: String },
    Error { attempt: u64, message: String },
    Closed { attempt: u64, code: Option<u16>, reason: String },
}

enum Flow {
    Idle,
    Next(TransportCommand),
    Shutdown,
}

/// Drive connection attempts until the command channel closes.
///
/// Every attempt ends with exactly one `Closed` event. A failed open reports
/// `Error` followed by `Closed`, matching what a browser socket does; a
/// handshake that outlives `handshake_timeout` is a failed open. Commands are
/// polled during the handshake too, so a new `Connect` or shutdown never
/// waits on a stalled server.
pub async fn run(
    mut commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
    handshake_timeout: Duration,
) {
    let mut pending: Option<TransportCommand> = None;

    loop {
        let command = match pending.take() {
            Some(command) => command,
            None => match commands.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        let TransportCommand::Connect { attempt, endpoint } = command;
        match run_attempt(attempt, &endpoint, handshake_timeout, &mut commands, &events).await {
            Flow::Idle => {}
            Flow::Next(command) => pending = Some(command),
            Flow::Shutdown => break,
        }
    }

    debug!("transport task finished");
}

async fn run_attempt(
    attempt: u64,
    endpoint: &Url,
    handshake_timeout: Duration,
    commands: &mut mpsc::Receiver<TransportCommand>,
    events: &mpsc::Sender<TransportEvent>,
) -> Flow {
    let handshake = tokio::time::timeout(handshake_timeout, connect_async(endpoint.as_str()));
    let opened = tokio::select! {
        command = commands.recv() => {
            debug!(attempt, "handshake abandoned");
            let _ = events.send(closed_abnormally(attempt)).await;
            return match command {
                Some(command) => Flow::Next(command),
                None => Flow::Shutdown,
            };
        }
        opened = handshake => opened,
    };

    let outcome = match opened {
        Ok(Ok((ws, _))) => Ok(ws),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("handshake timed out after {}ms", handshake_timeout.as_millis())),
    };
    let mut ws = match outcome {
        Ok(ws) => ws,
        Err(message) => {
            warn!(attempt, error = %message, "socket open failed");
            let _ = events.send(TransportEvent::Error { attempt, message }).await;
            let _ = events.send(closed_abnormally(attempt)).await;
            return Flow::Idle;
        }
    };

    if events.send(TransportEvent::Opened { attempt }).await.is_err() {
        let _ = ws.close(None).await;
        return Flow::Shutdown;
    }

    let mut close_code: Option<u16> = None;
    let mut close_reason = String::new();
    let mut flow = Flow::Idle;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let _ = ws.close(None).await;
                flow = match command {
                    Some(command) => Flow::Next(command),
                    None => Flow::Shutdown,
                };
                break;
            }
            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    trace!(attempt, len = text.len(), "frame");
                    if events.send(TransportEvent::Frame { attempt, text }).await.is_err() {
                        flow = Flow::Shutdown;
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if events.send(TransportEvent::Frame { attempt, text }).await.is_err() {
                            flow = Flow::Shutdown;
                            break;
                        }
                    }
                    Err(_) => warn!(attempt, "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_code = Some(u16::from(frame.code));
                        close_reason = frame.reason.into_owned();
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => break,
                Some(Err(err)) => {
                    warn!(attempt, error = %err, "socket error");
                    let _ = events
                        .send(TransportEvent::Error { attempt, message: err.to_string() })
                        .await;
                    break;
                }
            }
        }
    }

    let _ = events
        .send(TransportEvent::Closed {
            attempt,
            code: close_code.or(Some(ABNORMAL_CLOSURE)),
            reason: close_reason,
        })
        .await;
    flow
}

fn closed_abnormally(attempt: u64) -> TransportEvent {
    TransportEvent::Closed {
        attempt,
        code: Some(ABNORMAL_CLOSURE),
        reason: String::new(),
    }
}
