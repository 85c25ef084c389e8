use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::ws::{RelayConnector, RelayWsClient};
use crate::event::FeedEvent;

/// The single owner of the relay connection.
///
/// Consumers only see the event receiver handed out by `spawn`; the socket never
/// leaves the background task. Dropping the feed signals shutdown.
pub struct LiveFeed {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<Result<()>>>,
}

impl LiveFeed {
    pub fn spawn<C>(client: RelayWsClient<C>, capacity: usize) -> (Self, mpsc::Receiver<FeedEvent>)
    where
        C: RelayConnector + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move { client.connect_and_run(event_tx, shutdown_rx).await });
        (
            Self {
                shutdown_tx,
                task: Some(task),
            },
            event_rx,
        )
    }

    /// Signal shutdown and wait for the relay task to close its socket.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        match self.task.take() {
            Some(task) => task.await.context("relay task panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
