use std::future::Future;

use anyhow::Result;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::machine::ConnectionMachine;
use crate::config::ReconnectPolicy;
use crate::error::AppError;
use crate::event::{ConnectionNotice, ConnectionState, FeedEvent};
use crate::model::tick::Tick;

/// One open, receive-only relay connection.
pub trait RelayConnection: Send {
    /// Next text payload. `None` once the peer has closed the connection.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, AppError>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens relay connections.
pub trait RelayConnector: Send + Sync {
    type Connection: RelayConnection;

    fn connect(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<Self::Connection, AppError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayConnector for TungsteniteConnector {
    type Connection = TungsteniteConnection;

    async fn connect(&self, url: &Url) -> Result<TungsteniteConnection, AppError> {
        let (stream, _resp) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(TungsteniteConnection { stream })
    }
}

impl RelayConnection for TungsteniteConnection {
    async fn next_text(&mut self) -> Option<Result<String, AppError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "relay sent close frame");
                    return None;
                }
                // tokio-tungstenite answers pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(Err(e.into())),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "relay close handshake failed");
        }
    }
}

enum SessionEnd {
    Closed,
    /// Shutdown was signalled or the consumer went away.
    Stopped,
}

/// Receive-only relay client with automatic reconnection.
pub struct RelayWsClient<C> {
    url: Url,
    connector: C,
    policy: ReconnectPolicy,
}

impl RelayWsClient<TungsteniteConnector> {
    pub fn tungstenite(url: Url, policy: ReconnectPolicy) -> Self {
        Self::new(url, TungsteniteConnector, policy)
    }
}

impl<C: RelayConnector> RelayWsClient<C> {
    pub fn new(url: Url, connector: C, policy: ReconnectPolicy) -> Self {
        Self {
            url,
            connector,
            policy,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Connect and run until `shutdown` changes or the event receiver is dropped.
    /// Every close, clean or not, is followed by exactly one reconnect after the
    /// policy delay; teardown during that delay cancels it. Shutdown also wins over
    /// a consumer that has stopped reading.
    pub async fn connect_and_run(
        &self,
        event_tx: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut machine = ConnectionMachine::new(self.policy.clone());

        loop {
            if *shutdown.borrow() || !machine.start_connecting() {
                break;
            }
            let connecting = FeedEvent::Status(ConnectionState::Connecting);
            if !emit(&event_tx, &mut shutdown, connecting).await {
                break;
            }
            tracing::info!(url = %self.url, "connecting to relay");

            let connected = tokio::select! {
                res = self.connector.connect(&self.url) => res,
                _ = shutdown.changed() => break,
            };

            match connected {
                Ok(mut conn) => {
                    let notice = machine.on_open();
                    tracing::info!(url = %self.url, "relay connected");
                    let announced = emit(
                        &event_tx,
                        &mut shutdown,
                        FeedEvent::Status(ConnectionState::Connected),
                    )
                    .await
                        && emit(&event_tx, &mut shutdown, FeedEvent::Notice(notice)).await;
                    let end = if announced {
                        self.pump(&mut conn, &event_tx, &mut shutdown, &mut machine)
                            .await
                    } else {
                        SessionEnd::Stopped
                    };
                    if let SessionEnd::Stopped = end {
                        conn.close().await;
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "relay connect failed");
                    let notice = FeedEvent::Notice(machine.on_error());
                    if !emit(&event_tx, &mut shutdown, notice).await {
                        break;
                    }
                }
            }

            let Some(plan) = machine.on_close() else {
                break;
            };
            let delay_ms = plan.delay.as_millis() as u64;
            tracing::warn!(
                attempt = plan.attempt,
                delay_ms,
                "relay disconnected, scheduling reconnect"
            );
            let delivered = emit(
                &event_tx,
                &mut shutdown,
                FeedEvent::Status(ConnectionState::Disconnected),
            )
            .await
                && emit(
                    &event_tx,
                    &mut shutdown,
                    FeedEvent::Notice(ConnectionNotice::retrying()),
                )
                .await
                && emit(
                    &event_tx,
                    &mut shutdown,
                    FeedEvent::Reconnecting {
                        attempt: plan.attempt,
                        delay_ms,
                    },
                )
                .await;
            if !delivered {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(plan.delay) => {}
                _ = shutdown.changed() => {
                    tracing::info!("shutdown during reconnect delay");
                    break;
                }
            }
        }

        machine.stop();
        let _ = event_tx.try_send(FeedEvent::Status(ConnectionState::Disconnected));
        tracing::info!(url = %self.url, "relay client stopped");
        Ok(())
    }

    async fn pump(
        &self,
        conn: &mut C::Connection,
        event_tx: &mpsc::Sender<FeedEvent>,
        shutdown: &mut watch::Receiver<bool>,
        machine: &mut ConnectionMachine,
    ) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                frame = conn.next_text() => frame,
                _ = shutdown.changed() => return SessionEnd::Stopped,
            };
            match frame {
                Some(Ok(text)) => {
                    let event = match Tick::from_json(&text) {
                        Ok(tick) => FeedEvent::Tick(tick),
                        Err(e) => {
                            tracing::warn!(error = %e, "discarding malformed relay message");
                            FeedEvent::Discarded {
                                reason: e.to_string(),
                            }
                        }
                    };
                    if !emit(event_tx, shutdown, event).await {
                        return SessionEnd::Stopped;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "relay read error");
                    let notice = FeedEvent::Notice(machine.on_error());
                    if !emit(event_tx, shutdown, notice).await {
                        return SessionEnd::Stopped;
                    }
                    return SessionEnd::Closed;
                }
                None => {
                    tracing::info!("relay closed the connection");
                    return SessionEnd::Closed;
                }
            }
        }
    }
}

/// Deliver one event, giving up when shutdown is signalled while the channel is
/// full. `false` means stop: shutdown requested or the consumer has gone away.
async fn emit(
    event_tx: &mpsc::Sender<FeedEvent>,
    shutdown: &mut watch::Receiver<bool>,
    event: FeedEvent,
) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        sent = event_tx.send(event) => sent.is_ok(),
        _ = shutdown.changed() => false,
    }
}
