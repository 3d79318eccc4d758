//! Concurrency gate over blocklist construction
//!
//! The wrapper holds at most one filter snapshot and guarantees at most
//! one construction in flight. The first caller to find the gate empty
//! spawns the build as a detached task; everyone (including that caller)
//! then waits on a watch channel for completion, bounded by the
//! configured download timeout. A timed-out waiter gets an error but the
//! build keeps running and serves later callers. A failed build records
//! its error, surfaces it to the waiters of that attempt, and returns the
//! gate to empty so a later caller may retry. Ready is terminal.

use crate::fetch::ArtifactFetcher;
use crate::loader::BlocklistLoader;
use doh_core::{BlocklistConfig, BlocklistError, CoreResult};
use doh_filter::BlocklistFilter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

enum Phase {
    Empty,
    Building,
    Ready(Arc<BlocklistFilter>),
}

struct GateState {
    phase: Phase,
    /// Bumped once per finished build attempt, success or failure
    epoch: u64,
    /// Error of the most recent failed attempt
    last_error: Option<BlocklistError>,
    /// rxid of the request whose build last failed
    exception_from: Option<String>,
    exception_message: Option<String>,
}

struct Gate<F> {
    loader: BlocklistLoader<F>,
    state: Mutex<GateState>,
    done_tx: watch::Sender<u64>,
    done_rx: watch::Receiver<u64>,
    download_timeout: Duration,
}

/// Shared handle to the blocklist gate; clones observe the same snapshot
pub struct BlocklistWrapper<F> {
    gate: Arc<Gate<F>>,
}

impl<F> Clone for BlocklistWrapper<F> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<F: ArtifactFetcher> BlocklistWrapper<F> {
    pub fn new(config: BlocklistConfig, fetcher: F) -> CoreResult<Self> {
        let download_timeout = Duration::from_millis(config.download_timeout_ms);
        let loader = BlocklistLoader::new(config, fetcher)?;
        let (done_tx, done_rx) = watch::channel(0);
        Ok(Self {
            gate: Arc::new(Gate {
                loader,
                state: Mutex::new(GateState {
                    phase: Phase::Empty,
                    epoch: 0,
                    last_error: None,
                    exception_from: None,
                    exception_message: None,
                }),
                done_tx,
                done_rx,
                download_timeout,
            }),
        })
    }

    /// Main entry point: the ready filter, building it first if necessary
    ///
    /// Blocks up to the configured download timeout. Concurrent callers
    /// coalesce onto a single build; none of them duplicates network
    /// work.
    pub async fn get(&self, rxid: &str) -> CoreResult<Arc<BlocklistFilter>> {
        let deadline = Instant::now() + self.gate.download_timeout;
        // Cloned before the first state check so a completion signaled
        // between check and wait is never missed.
        let mut done = self.gate.done_rx.clone();
        let mut observed: Option<u64> = None;

        loop {
            let spawn = {
                let mut state = self.gate.state.lock().await;
                if let Phase::Ready(filter) = &state.phase {
                    return Ok(Arc::clone(filter));
                }
                if matches!(state.phase, Phase::Building) {
                    observed.get_or_insert(state.epoch);
                    false
                } else {
                    if let Some(seen) = observed {
                        if state.epoch > seen {
                            // The attempt this caller waited on failed.
                            return Err(state
                                .last_error
                                .clone()
                                .unwrap_or(BlocklistError::NotReady));
                        }
                    }
                    observed = Some(state.epoch);
                    state.phase = Phase::Building;
                    true
                }
            };
            if spawn {
                self.spawn_build(rxid);
            }

            if timeout_at(deadline, done.changed()).await.is_err() {
                warn!(
                    "[{rxid}] blocklist filter not ready within {}ms",
                    self.gate.download_timeout.as_millis()
                );
                return Err(BlocklistError::BuildTimeout {
                    timeout_ms: self.gate.download_timeout.as_millis() as u64,
                });
            }
        }
    }

    /// The ready filter, or [`BlocklistError::NotReady`] without waiting
    pub async fn try_get(&self) -> CoreResult<Arc<BlocklistFilter>> {
        match &self.gate.state.lock().await.phase {
            Phase::Ready(filter) => Ok(Arc::clone(filter)),
            _ => Err(BlocklistError::NotReady),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(self.gate.state.lock().await.phase, Phase::Ready(_))
    }

    /// `(rxid, message)` of the most recent failed build attempt
    pub async fn last_exception(&self) -> Option<(String, String)> {
        let state = self.gate.state.lock().await;
        match (&state.exception_from, &state.exception_message) {
            (Some(from), Some(message)) => Some((from.clone(), message.clone())),
            _ => None,
        }
    }

    fn spawn_build(&self, rxid: &str) {
        let gate = Arc::clone(&self.gate);
        let rxid = rxid.to_string();
        tokio::spawn(async move {
            let result = gate.loader.load(&rxid).await;

            let epoch = {
                let mut state = gate.state.lock().await;
                state.epoch += 1;
                match result {
                    Ok(filter) => {
                        info!("[{rxid}] blocklist filter published");
                        state.phase = Phase::Ready(Arc::new(filter));
                        state.last_error = None;
                    }
                    Err(err) => {
                        error!("[{rxid}] blocklist build failed: {err}");
                        state.exception_from = Some(rxid.clone());
                        state.exception_message = Some(err.to_string());
                        state.last_error = Some(err);
                        state.phase = Phase::Empty;
                    }
                }
                state.epoch
            };
            let _ = gate.done_tx.send(epoch);
        });
    }
}
