//! Commit Handler - waits for the commit of one transaction
//!
//! `start_listening` registers a transaction callback on every live source
//! and spawns a driver task. Callbacks only forward signals into the
//! driver's channel; the driver owns the tally, applies the strategy, and is
//! the only writer of the outcome cell. Before the outcome is published the
//! driver removes every registration still in place, so no callback can
//! observe a resolved handler.

use crate::domain::{CommitStrategy, CommitTally, EventSource, StrategyVerdict};
use crate::error::{CommitError, CommitResult, EventHubError};
use crate::ports::inbound::CommitHandlerApi;
use crate::ports::outbound::RegistrationId;
use crate::service::event_manager::{EventManager, PoolLease};
use async_trait::async_trait;
use gateway_telemetry::metrics::{record_commit_outcome, CommitOutcome};
use gateway_telemetry::log_tx_event;
use shared_types::{TxId, TxValidationCode};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

type OutcomeCell = Option<CommitResult<()>>;

enum Signal {
    Event {
        source: usize,
        code: TxValidationCode,
    },
    Error {
        source: usize,
        error: EventHubError,
    },
    Cancel,
}

struct Listening {
    signals: mpsc::UnboundedSender<Signal>,
    outcome: watch::Receiver<OutcomeCell>,
}

/// Per-transaction commit waiter.
pub struct CommitHandler {
    manager: EventManager,
    tx_id: TxId,
    strategy: CommitStrategy,
    timeout: Duration,
    listening: Mutex<Option<Listening>>,
}

impl std::fmt::Debug for CommitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitHandler")
            .field("tx_id", &self.tx_id)
            .field("strategy", &self.strategy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CommitHandler {
    pub(crate) fn new(manager: EventManager, tx_id: TxId) -> Self {
        let strategy = manager.strategy();
        let timeout = manager.config().effective_commit_timeout();
        Self {
            manager,
            tx_id,
            strategy,
            timeout,
            listening: Mutex::new(None),
        }
    }

    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    pub fn strategy(&self) -> CommitStrategy {
        self.strategy
    }

    /// Snapshot the live sources, arm the timer and register for the
    /// transaction on every live source. A second call is a no-op.
    pub async fn start_listening(&self) -> CommitResult<()> {
        let mut listening = self.listening.lock().await;
        if listening.is_some() {
            log_tx_event!(debug, "Commit handler already listening", self.tx_id);
            return Ok(());
        }

        let (sources, tally, lease) = self.connected_sources().await?;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let mut registrations = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let on_event = {
                let signals = signal_tx.clone();
                Box::new(move |code: TxValidationCode| {
                    let _ = signals.send(Signal::Event {
                        source: index,
                        code,
                    });
                })
            };
            let on_error = {
                let signals = signal_tx.clone();
                Box::new(move |error: EventHubError| {
                    let _ = signals.send(Signal::Error {
                        source: index,
                        error,
                    });
                })
            };

            match source.hub().register_tx_event(&self.tx_id, on_event, on_error) {
                Ok(registration) => registrations.push(Some(registration)),
                Err(error) => {
                    // Counted as that source's answer.
                    registrations.push(None);
                    let _ = signal_tx.send(Signal::Error {
                        source: index,
                        error,
                    });
                }
            }
        }

        log_tx_event!(
            debug,
            "Listening for commit",
            self.tx_id,
            strategy = %self.strategy,
            sources = sources.len(),
            timeout_secs = self.timeout.as_secs()
        );

        let (outcome_tx, outcome_rx) = watch::channel(None);
        let driver = CommitDriver {
            tx_id: self.tx_id.clone(),
            strategy: self.strategy,
            tally,
            responded: vec![false; sources.len()],
            sources,
            registrations,
            _lease: lease,
        };
        tokio::spawn(driver.run(signal_rx, self.timeout, outcome_tx));

        *listening = Some(Listening {
            signals: signal_tx,
            outcome: outcome_rx,
        });
        Ok(())
    }

    /// Wait for the single resolution. Every caller observes the same
    /// outcome.
    pub async fn wait_for_events(&self) -> CommitResult<()> {
        let mut outcome = match self.listening.lock().await.as_ref() {
            Some(listening) => listening.outcome.clone(),
            None => return Err(CommitError::NotListening),
        };
        let settled = match outcome.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| {
            Err(CommitError::Cancelled {
                tx_id: self.tx_id.clone(),
            })
        })
    }

    /// Stop listening. Pending waiters receive `Cancelled`; a handler that
    /// already resolved keeps its outcome. Returns once every registration
    /// is gone.
    pub async fn cancel_listening(&self) {
        let mut outcome = {
            let listening = self.listening.lock().await;
            let Some(listening) = listening.as_ref() else {
                return;
            };
            let _ = listening.signals.send(Signal::Cancel);
            listening.outcome.clone()
        };
        let _ = outcome.wait_for(Option::is_some).await;
    }

    /// Ask the event manager to refresh unhealthy sources in the background.
    pub fn quick_check_event_hubs(&self) {
        self.manager.check_health();
    }

    /// Live sources of the current pool and their tally. Re-establishes the
    /// pool once when the strategy cannot be satisfied.
    async fn connected_sources(
        &self,
    ) -> CommitResult<(Vec<EventSource>, CommitTally, PoolLease)> {
        let snapshot = self.manager.snapshot().await;
        let (sources, tally) = live_sources(&snapshot.sources).await;
        if self.strategy.check_initial_state(&tally) {
            return Ok((sources, tally, snapshot.lease));
        }
        let generation = snapshot.generation;
        drop(snapshot);

        log_tx_event!(
            warn,
            "Not enough live event sources, re-establishing",
            self.tx_id,
            strategy = %self.strategy,
            live = sources.len()
        );
        self.manager
            .reestablish_if_unchanged(generation)
            .await?;

        let snapshot = self.manager.snapshot().await;
        if snapshot.sources.is_empty() {
            return Err(CommitError::NoEventSources {
                strategy: self.strategy,
            });
        }
        let (sources, tally) = live_sources(&snapshot.sources).await;
        if !self.strategy.check_initial_state(&tally) {
            return Err(CommitError::StrategyUnsatisfiable {
                strategy: self.strategy,
            });
        }
        Ok((sources, tally, snapshot.lease))
    }
}

impl Drop for CommitHandler {
    fn drop(&mut self) {
        // Wake the driver so it tears down registrations now instead of at
        // the deadline.
        if let Some(listening) = self.listening.get_mut() {
            let _ = listening.signals.send(Signal::Cancel);
        }
    }
}

async fn live_sources(pool: &[EventSource]) -> (Vec<EventSource>, CommitTally) {
    let mut tally = CommitTally::new();
    let mut live = Vec::new();
    for source in pool {
        tally.seed(source.msp_id());
        if source.is_live().await {
            tally.add_live_source(source.msp_id());
            live.push(source.clone());
        } else {
            debug!(peer = %source.peer_name(), "Event source not connected");
        }
    }
    (live, tally)
}

/// State owned by the driver task of one handler.
struct CommitDriver {
    tx_id: TxId,
    strategy: CommitStrategy,
    tally: CommitTally,
    sources: Vec<EventSource>,
    registrations: Vec<Option<RegistrationId>>,
    responded: Vec<bool>,
    _lease: PoolLease,
}

impl CommitDriver {
    async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<Signal>,
        timeout: Duration,
        outcome: watch::Sender<OutcomeCell>,
    ) {
        let started = Instant::now();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                biased;
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        if let Some(result) = self.apply(signal) {
                            break result;
                        }
                    }
                    None => {
                        break Err(CommitError::Cancelled { tx_id: self.tx_id.clone() });
                    }
                },
                _ = &mut deadline => {
                    break Err(CommitError::Timeout { tx_id: self.tx_id.clone(), timeout });
                }
            }
        };

        self.release();
        record_commit_outcome(metric_outcome(&result), started.elapsed().as_secs_f64());
        match &result {
            Ok(()) => log_tx_event!(info, "Commit confirmed", self.tx_id, strategy = %self.strategy),
            Err(e) => log_tx_event!(warn, "Commit wait failed", self.tx_id, error = %e),
        }
        outcome.send_replace(Some(result));
    }

    fn apply(&mut self, signal: Signal) -> Option<CommitResult<()>> {
        match signal {
            Signal::Cancel => Some(Err(CommitError::Cancelled {
                tx_id: self.tx_id.clone(),
            })),
            Signal::Event { source, code } => {
                if !self.mark_responded(source) {
                    return None;
                }
                if !code.is_valid() {
                    return Some(Err(CommitError::Rejected {
                        peer: self.sources[source].peer_name().to_string(),
                        tx_id: self.tx_id.clone(),
                        code,
                    }));
                }
                self.evaluate(source, true)
            }
            Signal::Error { source, error } => {
                if !self.mark_responded(source) {
                    return None;
                }
                log_tx_event!(warn, "Event source error", self.tx_id, error = %error);
                self.evaluate(source, false)
            }
        }
    }

    /// First answer from `source` removes its registration. Later answers are
    /// ignored.
    fn mark_responded(&mut self, source: usize) -> bool {
        match self.responded.get_mut(source) {
            Some(responded) if !*responded => *responded = true,
            _ => return false,
        }
        if let Some(registration) = self.registrations[source].take() {
            self.sources[source].hub().unregister_tx_event(registration);
        }
        true
    }

    fn evaluate(&mut self, source: usize, success: bool) -> Option<CommitResult<()>> {
        let msp_id = self.sources[source].msp_id().clone();
        self.tally.record(&msp_id, success)?;
        match self.strategy.on_signal(&msp_id, &self.tally, !success) {
            StrategyVerdict::Passed => Some(Ok(())),
            StrategyVerdict::Failed => Some(Err(CommitError::EventHubsLost)),
            StrategyVerdict::Ongoing => None,
        }
    }

    fn release(&mut self) {
        for (source, slot) in self.sources.iter().zip(self.registrations.iter_mut()) {
            if let Some(registration) = slot.take() {
                source.hub().unregister_tx_event(registration);
            }
        }
        self.sources.clear();
    }
}

fn metric_outcome(result: &CommitResult<()>) -> CommitOutcome {
    match result {
        Ok(()) => CommitOutcome::Passed,
        Err(CommitError::Rejected { .. }) => CommitOutcome::Rejected,
        Err(CommitError::Timeout { .. }) => CommitOutcome::Timeout,
        Err(CommitError::Cancelled { .. }) => CommitOutcome::Cancelled,
        Err(_) => CommitOutcome::Failed,
    }
}

#[async_trait]
impl CommitHandlerApi for CommitHandler {
    async fn start_listening(&self) -> CommitResult<()> {
        CommitHandler::start_listening(self).await
    }

    async fn wait_for_events(&self) -> CommitResult<()> {
        CommitHandler::wait_for_events(self).await
    }

    async fn cancel_listening(&self) {
        CommitHandler::cancel_listening(self).await
    }

    fn quick_check_event_hubs(&self) {
        CommitHandler::quick_check_event_hubs(self)
    }
}
