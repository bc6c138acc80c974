//! Reactive Recompute Trigger
//!
//! Holds the last good APY and re-runs the yield engine whenever the jar
//! list or the price table is replaced.
//!
//! ## Model
//!
//! - Dependencies arrive through a `DependencyFeed` (tokio `watch`). A new
//!   `Arc` fires a recompute; re-publishing the same `Arc` does not.
//! - Every recompute gets a generation number. Only the newest generation
//!   may commit, so a slow older computation can never overwrite a newer one.
//! - Failures never touch the held value; they show up on the status channel.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::engine::{DeriveError, YieldEngine};
use crate::jar::Jar;
use crate::multicall::ContractHandle;
use crate::output::{DerivedApy, JarApyOutput};
use crate::prices::PriceTable;

type JarList = Option<Arc<Vec<Jar>>>;
type Prices = Option<Arc<PriceTable>>;

// ============================================
// STATUS
// ============================================

/// Side channel describing recompute health
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeStatus {
    /// Newest generation started
    pub generation: u64,
    /// Generation of the value currently held (0 = default)
    pub committed_generation: u64,
    /// Computations started but not finished
    pub in_flight: usize,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

// ============================================
// DEPENDENCY FEED
// ============================================

/// Publisher side of the trigger's dependencies
pub struct DependencyFeed {
    jars: watch::Sender<JarList>,
    prices: watch::Sender<Prices>,
}

impl DependencyFeed {
    /// Publish a jar list. Returns false if it is the one already held.
    pub fn publish_jars(&self, jars: Arc<Vec<Jar>>) -> bool {
        publish_if_new(&self.jars, jars)
    }

    /// Publish a price table. Returns false if it is the one already held.
    pub fn publish_prices(&self, prices: Arc<PriceTable>) -> bool {
        publish_if_new(&self.prices, prices)
    }
}

fn publish_if_new<T>(tx: &watch::Sender<Option<Arc<T>>>, value: Arc<T>) -> bool {
    tx.send_if_modified(|held| match held {
        Some(current) if Arc::ptr_eq(current, &value) => false,
        _ => {
            *held = Some(value);
            true
        }
    })
}

// ============================================
// HANDLE
// ============================================

/// Consumer side: the held value, its status, and the trigger task
pub struct ApyHandle {
    output: watch::Receiver<JarApyOutput>,
    status: watch::Receiver<RecomputeStatus>,
    task: JoinHandle<()>,
}

impl ApyHandle {
    /// Last committed output (zero default before the first success)
    pub fn current(&self) -> JarApyOutput {
        self.output.borrow().clone()
    }

    /// Receiver notified on every commit
    pub fn subscribe(&self) -> watch::Receiver<JarApyOutput> {
        self.output.clone()
    }

    pub fn status(&self) -> RecomputeStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RecomputeStatus> {
        self.status.clone()
    }

    /// Wait for the trigger to stop (after the feed is dropped)
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Recompute trigger task ended abnormally: {}", e);
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

// ============================================
// TRIGGER
// ============================================

/// State shared between the trigger loop and its computations
struct Shared {
    latest: AtomicU64,
    output: watch::Sender<JarApyOutput>,
    status: watch::Sender<RecomputeStatus>,
}

impl Shared {
    fn begin(&self) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_modify(|s| {
            s.generation = generation;
            s.in_flight += 1;
        });
        generation
    }

    fn finish(&self, generation: u64, result: Result<DerivedApy, DeriveError>) {
        let is_latest = self.latest.load(Ordering::SeqCst) == generation;

        match result {
            Ok(apy) if is_latest => {
                info!("Committed generation {}: {}", generation, apy);
                self.output.send_replace(JarApyOutput::single(apy));
                self.status.send_modify(|s| {
                    s.in_flight -= 1;
                    s.committed_generation = generation;
                    s.last_success = Some(Utc::now());
                    s.last_error = None;
                });
            }
            Ok(apy) => {
                debug!(
                    "Discarding stale generation {} ({}), newest is {}",
                    generation,
                    apy,
                    self.latest.load(Ordering::SeqCst)
                );
                self.status.send_modify(|s| s.in_flight -= 1);
            }
            Err(e) if is_latest => {
                match &e {
                    DeriveError::BatchFailure(_) => {
                        warn!("Generation {} produced no update: {}", generation, e)
                    }
                    _ => debug!("Generation {} produced no update: {}", generation, e),
                }
                self.status.send_modify(|s| {
                    s.in_flight -= 1;
                    s.last_error = Some(e.to_string());
                });
            }
            // Superseded; the newer generation reports health
            Err(e) => {
                debug!("Ignoring failure of stale generation {}: {}", generation, e);
                self.status.send_modify(|s| s.in_flight -= 1);
            }
        }
    }
}

/// Re-runs the yield engine for one (pool, staking rewards) pair
pub struct RecomputeTrigger {
    engine: Arc<YieldEngine>,
    pool: Option<ContractHandle>,
    staking_rewards: Option<ContractHandle>,
}

impl RecomputeTrigger {
    pub fn new(
        engine: Arc<YieldEngine>,
        pool: Option<ContractHandle>,
        staking_rewards: Option<ContractHandle>,
    ) -> Self {
        Self {
            engine,
            pool,
            staking_rewards,
        }
    }

    /// Start the trigger loop. It fires once immediately, then on every
    /// dependency change, and stops once the feed is dropped.
    pub fn spawn(self) -> (DependencyFeed, ApyHandle) {
        let (jars_tx, jars_rx) = watch::channel::<JarList>(None);
        let (prices_tx, prices_rx) = watch::channel::<Prices>(None);
        let (output_tx, output_rx) =
            watch::channel(JarApyOutput::single(DerivedApy::zero(self.engine.reward_token())));
        let (status_tx, status_rx) = watch::channel(RecomputeStatus::default());

        let shared = Arc::new(Shared {
            latest: AtomicU64::new(0),
            output: output_tx,
            status: status_tx,
        });

        let task = tokio::spawn(self.run(jars_rx, prices_rx, shared));

        (
            DependencyFeed {
                jars: jars_tx,
                prices: prices_tx,
            },
            ApyHandle {
                output: output_rx,
                status: status_rx,
                task,
            },
        )
    }

    async fn run(
        self,
        mut jars: watch::Receiver<JarList>,
        mut prices: watch::Receiver<Prices>,
        shared: Arc<Shared>,
    ) {
        let mut computations = JoinSet::new();
        let mut jars_open = true;
        let mut prices_open = true;

        self.fire(&mut computations, &shared, &mut jars, &mut prices, "start");

        loop {
            tokio::select! {
                changed = jars.changed(), if jars_open => match changed {
                    Ok(()) => {
                        self.fire(&mut computations, &shared, &mut jars, &mut prices, "jars")
                    }
                    Err(_) => jars_open = false,
                },
                changed = prices.changed(), if prices_open => match changed {
                    Ok(()) => {
                        self.fire(&mut computations, &shared, &mut jars, &mut prices, "prices")
                    }
                    Err(_) => prices_open = false,
                },
                Some(done) = computations.join_next(), if !computations.is_empty() => {
                    if let Err(e) = done {
                        warn!("Recompute task failed: {}", e);
                    }
                },
                else => break,
            }
        }

        while let Some(done) = computations.join_next().await {
            if let Err(e) = done {
                warn!("Recompute task failed: {}", e);
            }
        }
        debug!("Recompute trigger stopped");
    }

    fn fire(
        &self,
        computations: &mut JoinSet<()>,
        shared: &Arc<Shared>,
        jars: &mut watch::Receiver<JarList>,
        prices: &mut watch::Receiver<Prices>,
        cause: &str,
    ) {
        let jar_count = jars.borrow_and_update().as_ref().map_or(0, |j| j.len());
        let prices = prices.borrow_and_update().clone();
        let generation = shared.begin();
        debug!(
            "Recompute #{} ({} changed, {} jars, {} prices)",
            generation,
            cause,
            jar_count,
            prices.as_ref().map_or(0, |p| p.len())
        );

        let engine = self.engine.clone();
        let pool = self.pool.clone();
        let staking = self.staking_rewards.clone();
        let shared = shared.clone();

        computations.spawn(async move {
            let result = engine
                .try_derive(pool.as_ref(), staking.as_ref(), prices.as_deref())
                .await;
            shared.finish(generation, result);
        });
    }
}
