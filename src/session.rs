//! Board session: owns the baselines and the published board, and folds relay
//! events into new snapshots.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::baseline::{BaselineLoader, BaselineStore, ComparisonSource};
use crate::board::{Board, MergeOutcome};
use crate::error::AppError;
use crate::event::{ConnectionNotice, ConnectionState, FeedEvent};
use crate::model::instrument::InstrumentSpec;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks_merged: u64,
    pub ticks_unchanged: u64,
    pub ticks_unknown: u64,
    pub discarded: u64,
    pub reconnects: u64,
    pub load_failures: u64,
}

pub struct BoardSession<S> {
    loader: BaselineLoader<S>,
    baselines: BaselineStore,
    board_tx: watch::Sender<Arc<Board>>,
    notice_tx: watch::Sender<ConnectionNotice>,
    status_tx: watch::Sender<ConnectionState>,
    selected: Option<String>,
    stats: SessionStats,
}

impl<S: ComparisonSource> BoardSession<S> {
    pub fn new(loader: BaselineLoader<S>, specs: &[InstrumentSpec]) -> Self {
        let (board_tx, _) = watch::channel(Arc::new(Board::from_specs(specs)));
        let (notice_tx, _) = watch::channel(ConnectionNotice::None);
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            loader,
            baselines: BaselineStore::new(),
            board_tx,
            notice_tx,
            status_tx,
            selected: None,
            stats: SessionStats::default(),
        }
    }

    /// Board snapshots. Receivers only ever observe whole snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Board>> {
        self.board_tx.subscribe()
    }

    pub fn notices(&self) -> watch::Receiver<ConnectionNotice> {
        self.notice_tx.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    pub fn board(&self) -> Arc<Board> {
        Arc::clone(&self.board_tx.borrow())
    }

    pub fn notice(&self) -> ConnectionNotice {
        self.notice_tx.borrow().clone()
    }

    pub fn baselines(&self) -> &BaselineStore {
        &self.baselines
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Load every instrument and publish the result as one snapshot. With nothing
    /// selected yet, the first instrument that loaded becomes the selection.
    /// Returns how many instruments loaded without error.
    pub async fn load_all(&mut self) -> usize {
        let specs = self.board().specs();
        let loaded = self.loader.load_all(&specs).await;
        let failures = loaded.iter().filter(|l| l.is_error()).count();
        self.stats.load_failures += failures as u64;

        let next = self.board().with_loaded(loaded, &mut self.baselines);
        if self.selected.is_none() {
            self.selected = next.first_loaded().map(|inst| inst.symbol.clone());
        }
        tracing::info!(
            instruments = specs.len(),
            failures,
            selected = self.selected.as_deref().unwrap_or("-"),
            "board loaded"
        );
        self.publish(next);
        specs.len() - failures
    }

    /// Re-run the comparison load for one instrument, overwriting its baseline.
    pub async fn reload(&mut self, symbol: &str) -> Result<(), AppError> {
        let spec = self
            .board()
            .get(symbol)
            .map(|inst| inst.spec())
            .ok_or_else(|| AppError::UnknownSymbol(symbol.to_string()))?;
        let loaded = self.loader.load(&spec).await;
        if loaded.is_error() {
            self.stats.load_failures += 1;
        }
        let next = self.board().with_loaded(vec![loaded], &mut self.baselines);
        self.publish(next);
        Ok(())
    }

    /// Select an instrument. A different selection reloads its baseline; reselecting
    /// the current one does nothing. Returns whether a reload happened.
    pub async fn select(&mut self, symbol: &str) -> Result<bool, AppError> {
        if !self.board().contains(symbol) {
            return Err(AppError::UnknownSymbol(symbol.to_string()));
        }
        if self.selected.as_deref() == Some(symbol) {
            return Ok(false);
        }
        self.reload(symbol).await?;
        self.selected = Some(symbol.to_string());
        Ok(true)
    }

    /// Fold one relay event into the session. Returns `true` if a new board was published.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Tick(tick) => {
                let current = self.board();
                match current.merge_tick(&tick, &self.baselines) {
                    MergeOutcome::Updated(next) => {
                        self.stats.ticks_merged += 1;
                        self.publish(next);
                        return true;
                    }
                    MergeOutcome::Unchanged => self.stats.ticks_unchanged += 1,
                    MergeOutcome::UnknownSymbol => {
                        self.stats.ticks_unknown += 1;
                        tracing::debug!(symbol = %tick.symbol, "tick for symbol not on board");
                    }
                }
            }
            FeedEvent::Status(state) => {
                self.status_tx.send_replace(state);
            }
            FeedEvent::Notice(notice) => {
                self.notice_tx.send_replace(notice);
            }
            FeedEvent::Reconnecting { attempt, delay_ms } => {
                self.stats.reconnects += 1;
                tracing::debug!(attempt, delay_ms, "relay reconnect scheduled");
            }
            FeedEvent::Discarded { .. } => self.stats.discarded += 1,
        }
        false
    }

    /// Hide the connection banner until the next error or close.
    pub fn dismiss_notice(&mut self) {
        self.notice_tx.send_replace(ConnectionNotice::None);
    }

    /// Apply events until the feed closes its channel.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<FeedEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
        tracing::info!("relay feed closed");
    }

    fn publish(&self, board: Board) {
        self.board_tx.send_replace(Arc::new(board));
    }
}
