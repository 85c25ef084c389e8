//! Immutable instrument board snapshots and the tick merge.
//!
//! A `Board` is never mutated in place: every update produces a new snapshot
//! that shares untouched entries with its predecessor, so readers holding an
//! older snapshot always see a consistent view.

use std::collections::HashMap;
use std::sync::Arc;

use crate::baseline::{BaselineStore, LoadedInstrument};
use crate::model::instrument::{Instrument, InstrumentSpec, PriceChange};
use crate::model::tick::Tick;

#[derive(Debug, Clone, Default)]
pub struct Board {
    order: Arc<Vec<String>>,
    entries: HashMap<String, Arc<Instrument>>,
}

/// Result of offering a tick to the board.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Updated(Board),
    /// Known symbol, same price as held: nothing to publish.
    Unchanged,
    UnknownSymbol,
}

impl MergeOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

impl Board {
    /// Board of zero-valued placeholders in the given display order.
    /// Later duplicates of a symbol are ignored.
    pub fn from_specs(specs: &[InstrumentSpec]) -> Self {
        let mut order = Vec::with_capacity(specs.len());
        let mut entries = HashMap::with_capacity(specs.len());
        for spec in specs {
            if entries.contains_key(&spec.symbol) {
                continue;
            }
            order.push(spec.symbol.clone());
            entries.insert(spec.symbol.clone(), Arc::new(Instrument::placeholder(spec)));
        }
        Self {
            order: Arc::new(order),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.entries.get(symbol).map(Arc::as_ref)
    }

    /// Shared handle to an entry; equal pointers across snapshots mean the entry was untouched.
    pub fn entry(&self, symbol: &str) -> Option<&Arc<Instrument>> {
        self.entries.get(symbol)
    }

    /// Instruments in display order.
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> + '_ {
        self.order
            .iter()
            .filter_map(|symbol| self.entries.get(symbol).map(Arc::as_ref))
    }

    pub fn specs(&self) -> Vec<InstrumentSpec> {
        self.instruments().map(Instrument::spec).collect()
    }

    /// The first instrument that loaded without error, in display order.
    pub fn first_loaded(&self) -> Option<&Instrument> {
        self.instruments().find(|inst| inst.is_loaded())
    }

    /// Entries of `self` that are not shared with `previous`, in display order.
    pub fn changed_since<'a>(&'a self, previous: &Board) -> Vec<&'a Instrument> {
        self.order
            .iter()
            .filter_map(|symbol| {
                let current = self.entries.get(symbol)?;
                match previous.entries.get(symbol) {
                    Some(prev) if Arc::ptr_eq(prev, current) => None,
                    _ => Some(current.as_ref()),
                }
            })
            .collect()
    }

    /// Replace one entry. Returns `None` if the symbol is not on the board.
    pub fn with_instrument(&self, instrument: Instrument) -> Option<Board> {
        if !self.entries.contains_key(&instrument.symbol) {
            return None;
        }
        let mut entries = self.entries.clone();
        entries.insert(instrument.symbol.clone(), Arc::new(instrument));
        Some(Board {
            order: Arc::clone(&self.order),
            entries,
        })
    }

    /// Apply a batch of load results in one snapshot. Each result replaces the symbol's
    /// baseline in `baselines`; a result without one clears it.
    pub fn with_loaded(&self, loaded: Vec<LoadedInstrument>, baselines: &mut BaselineStore) -> Board {
        let mut entries = self.entries.clone();
        for LoadedInstrument {
            instrument,
            baseline,
        } in loaded
        {
            if !entries.contains_key(&instrument.symbol) {
                tracing::debug!(symbol = %instrument.symbol, "loaded instrument not on board");
                continue;
            }
            match baseline {
                Some(baseline) => baselines.set(&instrument.symbol, baseline),
                None => {
                    if baselines.remove(&instrument.symbol).is_some() {
                        tracing::debug!(symbol = %instrument.symbol, "stale baseline cleared");
                    }
                }
            }
            entries.insert(instrument.symbol.clone(), Arc::new(instrument));
        }
        Board {
            order: Arc::clone(&self.order),
            entries,
        }
    }

    /// Merge one tick. Only the matching entry changes: price, most-recent timestamp,
    /// and, when a baseline exists, change and percent change. Without a baseline the
    /// previously derived change values are kept.
    pub fn merge_tick(&self, tick: &Tick, baselines: &BaselineStore) -> MergeOutcome {
        let Some(current) = self.entries.get(&tick.symbol) else {
            return MergeOutcome::UnknownSymbol;
        };
        if current.price == tick.price {
            return MergeOutcome::Unchanged;
        }

        let mut next = Instrument::clone(current);
        next.price = tick.price;
        next.recent_timestamp = Some(tick.timestamp);
        next.error = None;
        match baselines
            .price(&tick.symbol)
            .and_then(|baseline| PriceChange::against(tick.price, baseline))
        {
            Some(change) => next.apply_change(change),
            None => {
                tracing::trace!(symbol = %tick.symbol, "no baseline yet, keeping previous change");
            }
        }

        let mut entries = self.entries.clone();
        entries.insert(tick.symbol.clone(), Arc::new(next));
        MergeOutcome::Updated(Board {
            order: Arc::clone(&self.order),
            entries,
        })
    }
}
