//! The signer: builds one epoch at a time, advancing the map by exactly one
//! revision and anchoring the new root into the log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};

use trees::{LogClient, MapClient, RpcError, LATEST_REVISION};
use types::{
    digest::object_hash, Entry, EpochSummary, Index, LogLeaf, MapLeaf, MapLeafInclusion,
    MapRootMetadata, Mutation, SignedKv, SignedMapRoot,
};

use crate::dispatch::Dispatcher;
use crate::metrics;
use crate::mutator::Mutator;
use crate::queue::{MutationSource, SourceError};
use crate::ticker;

/// Fresh deadline for the log-anchor step. The anchor is attempted even when
/// the epoch deadline has lapsed: a map revision without a log leaf is a
/// consistency incident, not a retryable abort.
const ANCHOR_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EpochError {
    #[error("map rpc failed: {0}")]
    Map(#[source] RpcError),
    #[error("log rpc failed: {0}")]
    Log(#[source] RpcError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("epoch deadline exceeded")]
    Deadline,
    #[error("map revision {revision} is not anchored in the log: {source}")]
    Anchor {
        revision: i64,
        #[source]
        source: RpcError,
    },
    #[error("canonical map root encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Epoch state carried from the map write to the log anchor.
struct StagedEpoch {
    smr: SignedMapRoot,
    batch: Vec<(Index, SignedKv)>,
    prior_proofs: HashMap<Index, MapLeafInclusion>,
}

pub struct Sequencer {
    map: Arc<dyn MapClient>,
    log: Arc<dyn LogClient>,
    source: Arc<dyn MutationSource>,
    mutator: Arc<dyn Mutator>,
    dispatcher: Arc<Dispatcher>,
}

impl Sequencer {
    pub fn new(
        map: Arc<dyn MapClient>,
        log: Arc<dyn LogClient>,
        source: Arc<dyn MutationSource>,
        mutator: Arc<dyn Mutator>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self { map, log, source, mutator, dispatcher }
    }

    /// Bootstrap and repair. With both trees empty, seed the log with the
    /// canonical empty map root so log index `k` always holds revision `k`.
    /// When the log runs behind the map (a crash between the map write and
    /// the log anchor), every missing revision is re-queued; the log's
    /// identity-hash deduplication makes repeats safe.
    pub async fn initialize(&self) -> Result<(), EpochError> {
        let log_root = self
            .log
            .get_latest_signed_log_root()
            .await
            .map_err(EpochError::Log)?;
        let smr = self.map.get_signed_map_root().await.map_err(EpochError::Map)?;

        if log_root.tree_size == 0 && smr.map_revision == 0 {
            self.queue_map_root(&smr).await?;
            info!("seeded empty log with the empty map root");
            return Ok(());
        }

        let mut revision = log_root.tree_size;
        while revision <= smr.map_revision {
            let root = if revision == smr.map_revision {
                smr.clone()
            } else {
                self.map
                    .get_signed_map_root_at(revision)
                    .await
                    .map_err(EpochError::Map)?
            };
            self.queue_map_root(&root).await?;
            warn!(revision, "re-queued map root missing from the log");
            revision += 1;
        }
        Ok(())
    }

    /// Build one epoch. Returns `None` when there is nothing to do: no
    /// pending mutations and no forced publication. Strictly single-entry;
    /// the driver never overlaps two calls.
    pub async fn create_epoch(
        &self,
        force: bool,
        deadline: Duration,
    ) -> Result<Option<EpochSummary>, EpochError> {
        let timer = metrics::CREATE_EPOCH_SECONDS.start_timer();
        let staged = match timeout(deadline, self.stage(force)).await {
            Ok(result) => result?,
            Err(_) => return Err(EpochError::Deadline),
        };
        let Some(staged) = staged else {
            timer.stop_and_discard();
            return Ok(None);
        };

        let revision = staged.smr.map_revision;
        let summary = match timeout(ANCHOR_DEADLINE, self.anchor(staged)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EpochError::Anchor {
                    revision,
                    source: RpcError::DeadlineExceeded,
                })
            }
        };
        timer.observe_duration();
        Ok(Some(summary))
    }

    /// Steps 1-7: read the watermark, drain the queue, fold the batch over
    /// the current leaves, write the next revision.
    async fn stage(&self, force: bool) -> Result<Option<StagedEpoch>, EpochError> {
        let smr = self.map.get_signed_map_root().await.map_err(EpochError::Map)?;
        let start_seq = smr.metadata.highest_fully_completed_seq.max(0) as u64;

        let mut txn = self.source.begin().await?;
        let (max_seq, batch) = match txn.read_all(start_seq).await {
            Ok(read) => read,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "mutation read rollback failed");
                }
                return Err(err.into());
            }
        };
        // The read commits even when empty; until it does the batch is
        // still claimed.
        txn.commit().await?;

        if batch.is_empty() && !force {
            return Ok(None);
        }
        metrics::MUTATIONS.inc_by(batch.len() as u64);

        // A key wider than a map index poisons only that mutation.
        let mut keyed: Vec<(Index, SignedKv)> = Vec::with_capacity(batch.len());
        for update in batch {
            match update.index() {
                Ok(index) => keyed.push((index, update)),
                Err(err) => warn!(error = %err, "skipping mutation with invalid key"),
            }
        }

        // Distinct indexes in first-occurrence order bind the prior-revision
        // inclusion proofs deterministically.
        let mut indexes = Vec::new();
        let mut seen = HashSet::new();
        for (index, _) in &keyed {
            if seen.insert(*index) {
                indexes.push(*index);
            }
        }
        metrics::MUTATIONS_UNIQUE.inc_by(indexes.len() as u64);

        let inclusions = if indexes.is_empty() {
            Vec::new()
        } else {
            self.map
                .get_leaves(&indexes, LATEST_REVISION)
                .await
                .map_err(EpochError::Map)?
        };

        let mut cur: BTreeMap<Index, Option<Vec<u8>>> =
            indexes.iter().map(|index| (*index, None)).collect();
        let mut prior_proofs: HashMap<Index, MapLeafInclusion> =
            HashMap::with_capacity(inclusions.len());
        for inclusion in inclusions {
            let index = inclusion.leaf.index;
            if !inclusion.leaf.leaf_value.is_empty() {
                cur.insert(index, Some(inclusion.leaf.leaf_value.clone()));
            }
            prior_proofs.insert(index, inclusion);
        }

        // Apply in sequence order; the last valid mutation per index wins.
        for (index, update) in &keyed {
            let prior = match cur.get(index).and_then(|leaf| leaf.as_deref()) {
                Some(bytes) => match Entry::from_canonical_bytes(bytes) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(
                            index = %hex::encode(index.as_bytes()),
                            error = %err,
                            "skipping mutation against an undecodable leaf"
                        );
                        continue;
                    }
                },
                None => None,
            };
            match self.mutator.mutate(prior.as_ref(), update) {
                Ok(next) => {
                    cur.insert(*index, Some(next.to_canonical_bytes()));
                }
                Err(err) => {
                    warn!(
                        index = %hex::encode(index.as_bytes()),
                        error = %err,
                        "skipping invalid mutation"
                    );
                }
            }
        }

        // Written set: every surviving leaf, including untouched priors, in
        // index order for stable diagnostics.
        let leaves: Vec<MapLeaf> = cur
            .into_iter()
            .filter_map(|(index, value)| value.map(|leaf_value| MapLeaf { index, leaf_value }))
            .collect();

        let map_timer = metrics::MAP_UPDATE_SECONDS.start_timer();
        let new_smr = self
            .map
            .set_leaves(
                leaves,
                MapRootMetadata { highest_fully_completed_seq: max_seq as i64 },
            )
            .await
            .map_err(EpochError::Map)?;
        map_timer.observe_duration();

        info!(
            revision = new_smr.map_revision,
            mutations = keyed.len(),
            watermark = max_seq,
            "map advanced one revision"
        );
        Ok(Some(StagedEpoch { smr: new_smr, batch: keyed, prior_proofs }))
    }

    /// Steps 8-10: anchor the new root into the log and assemble the epoch
    /// summary.
    async fn anchor(&self, staged: StagedEpoch) -> Result<EpochSummary, EpochError> {
        let StagedEpoch { smr, batch, prior_proofs } = staged;
        let revision = smr.map_revision;

        self.queue_map_root(&smr).await?;

        let log_root = self
            .log
            .get_latest_signed_log_root()
            .await
            .map_err(EpochError::Log)?;
        let log_inclusion = self
            .log
            .get_inclusion_proof(revision, log_root.tree_size)
            .await
            .map_err(EpochError::Log)?;

        let mutations = batch
            .into_iter()
            .map(|(index, update)| Mutation {
                update,
                proof: prior_proofs.get(&index).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(EpochSummary {
            epoch: revision,
            smr,
            log_root,
            log_consistency: Vec::new(),
            log_inclusion,
            mutations,
        })
    }

    async fn queue_map_root(&self, smr: &SignedMapRoot) -> Result<(), EpochError> {
        let leaf_value = smr.canonical_bytes()?;
        let leaf = LogLeaf { leaf_identity_hash: object_hash(&leaf_value), leaf_value };
        self.log
            .queue_leaf(leaf)
            .await
            .map_err(|source| EpochError::Anchor { revision: smr.map_revision, source })
    }

    /// The epoch loop. Runs until `shutdown` changes or closes. Epoch errors
    /// are logged and the loop continues; only a canonical-encoding failure
    /// halts further epochs (operator intervention required).
    pub async fn run(
        &self,
        min_interval: Duration,
        max_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if let Err(err) = self.initialize().await {
            warn!(error = %err, "initialization failed; the first epoch will retry");
        }

        let last = match self.map.get_signed_map_root().await {
            Ok(smr) => instant_at(smr.timestamp_nanos, max_interval),
            Err(err) => {
                warn!(error = %err, "map root unavailable; forcing a bootstrap epoch");
                match self.create_epoch(true, min_interval).await {
                    Ok(Some(summary)) => self.deliver(summary).await,
                    Ok(None) => {}
                    Err(epoch_err) => warn!(error = %epoch_err, "bootstrap epoch failed"),
                }
                Instant::now()
            }
        };

        let mut ticks = ticker::spawn_epoch_ticks(last, min_interval, max_interval);
        let mut halted = false;
        loop {
            let force = tokio::select! {
                _ = shutdown.changed() => {
                    info!("sequencer shutting down");
                    return;
                }
                tick = ticks.recv() => match tick {
                    Some(force) => force,
                    None => return,
                },
            };
            if halted {
                error!("sequencer halted on a fatal error; skipping epoch");
                continue;
            }
            match self.create_epoch(force, min_interval).await {
                Ok(Some(summary)) => self.deliver(summary).await,
                Ok(None) => {}
                Err(err @ EpochError::Encoding(_)) => {
                    error!(error = %err, "fatal: canonical encoding failed; halting epochs");
                    halted = true;
                }
                Err(err @ EpochError::Anchor { .. }) => {
                    error!(error = %err, "map revision is missing its log anchor");
                    // Repair eagerly; re-queueing is idempotent.
                    if let Err(repair_err) = self.initialize().await {
                        error!(error = %repair_err, "log repair failed; will retry next tick");
                    }
                }
                Err(err) => warn!(error = %err, "epoch aborted"),
            }
        }
    }

    async fn deliver(&self, summary: EpochSummary) {
        let epoch = summary.epoch;
        if let Err(err) = self.dispatcher.dispatch(&summary).await {
            error!(error = %err, epoch, "dispatch failed");
        }
    }
}

/// Map a wall-clock timestamp onto the monotonic clock, clamping the elapsed
/// time to `max_interval` so a zero or ancient timestamp forces the next
/// tick instead of underflowing.
fn instant_at(timestamp_nanos: i64, max_interval: Duration) -> Instant {
    let now = Instant::now();
    let wall_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let then = Duration::from_nanos(timestamp_nanos.max(0) as u64);
    let elapsed = wall_now.saturating_sub(then).min(max_interval);
    now.checked_sub(elapsed).unwrap_or(now)
}
