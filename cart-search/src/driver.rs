//! The search driver.
//!
//! A fixed worker pool dequeues batch indices from a shared counter, walks
//! each batch's suffixes in eight-lane groups, and sends surviving rows to
//! the sink loop on the calling thread. The sink serializes store writes,
//! advances the contiguous-completion checkpoint, and adapts the cutoff in
//! auto mode. Workers share nothing mutable beyond the counter, the cutoff
//! cell, and the channel.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{bounded, Sender};
use thiserror::Error;

use cart_core::Seed;
use cart_filter::{CompiledFilter, LaneOutcome, NO_CUTOFF};
use cart_rng::{Mask8, StreamBank, LANES};
use cart_store::{Reconciled, ResultRow, Store, StoreError, RESULT_CAP};

use crate::cancel::CancelToken;
use crate::lattice::{Lattice, LatticeError};

/// Auto mode re-targets the cutoff at this rank of the result table.
const AUTO_CUTOFF_RANK: usize = 10;

/// Worker-local result buffers never grow past twice the table cap.
const WORKER_BUF_CAP: usize = 2 * RESULT_CAP;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("batch range [{start}, {end}) is outside 0..{count}")]
    BadBatchRange { start: u64, end: u64, count: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CutoffMode {
    /// Emit every passing seed with score >= the fixed value.
    Fixed(i64),
    /// Start at zero; once the table has `AUTO_CUTOFF_RANK` rows, advance to
    /// the tenth-best score minus one at batch boundaries.
    Auto,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// The filter document text; its identity decides resume vs reset.
    pub filter_text: String,
    /// Worker threads; 0 means hardware parallelism.
    pub threads: usize,
    /// Batch character count L: one batch covers 35^L seeds.
    pub batch_chars: u8,
    /// Overrides the stored checkpoint when set.
    pub start_batch: Option<u64>,
    /// Exclusive upper bound; the full lattice when unset.
    pub end_batch: Option<u64>,
    pub cutoff: CutoffMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            threads: 0,
            batch_chars: 4,
            start_batch: None,
            end_batch: None,
            cutoff: CutoffMode::Fixed(0),
        }
    }
}

/// Live progress callbacks; all optional.
pub trait SearchProgress {
    fn on_pile_hits(&mut self, _hits: u64, _scanned: u64) {}
    fn on_batch_done(&mut self, _completed: u64, _total: u64, _checkpoint: i64) {}
    fn on_cutoff(&mut self, _cutoff: i64) {}
}

/// No-op sink for callers that only want the summary.
pub struct NoProgress;
impl SearchProgress for NoProgress {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSummary {
    pub batches_done: u64,
    pub seeds_scanned: u64,
    pub results_emitted: u64,
    pub pile_hits: u64,
    pub cancelled: bool,
    pub last_completed_batch: i64,
    pub elapsed_ms: u64,
}

enum WorkerMsg {
    Rows(Vec<ResultRow>),
    BatchDone(u64),
}

/// One search over one compiled filter.
pub struct Search {
    filter: CompiledFilter,
    store: Store,
    config: SearchConfig,
    lattice: Lattice,
}

impl Search {
    pub fn new(
        filter: CompiledFilter,
        store: Store,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        let lattice = Lattice::new(config.batch_chars)?;
        Ok(Self {
            filter,
            store,
            config,
            lattice,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn filter(&self) -> &CompiledFilter {
        &self.filter
    }

    /// Run to completion, cancellation, or the end of the batch range.
    pub fn run(
        &self,
        cancel: &CancelToken,
        progress: &mut dyn SearchProgress,
    ) -> Result<SearchSummary, SearchError> {
        let t_start = Instant::now();

        // Resume decision: unchanged filter text continues after the stored
        // checkpoint; anything else starts fresh (prior winners salvaged).
        let reconciled = self
            .store
            .reconcile(&self.config.filter_text, self.config.batch_chars)?;
        let resume_from = match reconciled {
            Reconciled::Resumed {
                last_completed_batch,
            } => last_completed_batch + 1,
            Reconciled::Fresh { .. } => 0,
        };

        let end = self
            .config
            .end_batch
            .unwrap_or_else(|| self.lattice.batch_count());
        if end > self.lattice.batch_count() {
            return Err(SearchError::BadBatchRange {
                start: 0,
                end,
                count: self.lattice.batch_count(),
            });
        }
        // A checkpoint past the requested range means there is nothing left.
        let start = self.config.start_batch.unwrap_or(resume_from as u64).min(end);

        let cutoff_cell = AtomicI64::new(match self.config.cutoff {
            CutoffMode::Fixed(c) => c,
            CutoffMode::Auto => 0,
        });

        // Replay the fertilizer pile first: instant hits for seeds that any
        // earlier search surfaced.
        let pile_hits = self.replay_pile(cancel, &cutoff_cell, progress)?;

        let threads = if self.config.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.config.threads
        };

        let next_batch = AtomicU64::new(start);
        let (tx, rx) = bounded::<WorkerMsg>(threads * 4);

        let mut batches_done = 0u64;
        let mut results_emitted = 0u64;
        let mut checkpoint = start as i64 - 1;

        std::thread::scope(|scope| -> Result<(), SearchError> {
            for _ in 0..threads {
                let tx = tx.clone();
                let next_batch = &next_batch;
                let cutoff_cell = &cutoff_cell;
                scope.spawn(move || {
                    self.worker(cancel, next_batch, end, cutoff_cell, tx);
                });
            }
            drop(tx);

            // Sink loop: single writer for the store and the checkpoint.
            let mut pending: Vec<u64> = Vec::new();
            for msg in rx.iter() {
                match msg {
                    WorkerMsg::Rows(rows) => {
                        results_emitted += rows.len() as u64;
                        upsert_with_retry(&self.store, &rows)?;
                    }
                    WorkerMsg::BatchDone(b) => {
                        batches_done += 1;
                        advance_checkpoint(&mut checkpoint, &mut pending, b);
                        self.store.checkpoint(checkpoint)?;
                        if self.config.cutoff == CutoffMode::Auto {
                            if let Some(nth) = self.store.nth_best_score(AUTO_CUTOFF_RANK)? {
                                let want = nth - 1;
                                if want > cutoff_cell.load(Ordering::Relaxed) {
                                    cutoff_cell.store(want, Ordering::Relaxed);
                                    progress.on_cutoff(want);
                                }
                            }
                        }
                        progress.on_batch_done(batches_done, end - start, checkpoint);
                    }
                }
            }
            Ok(())
        })?;

        Ok(SearchSummary {
            batches_done,
            seeds_scanned: batches_done * self.lattice.seeds_per_batch(),
            results_emitted,
            pile_hits,
            cancelled: cancel.is_cancelled(),
            last_completed_batch: checkpoint,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        })
    }

    /// Worker loop: claim batches until the range is exhausted or a cancel
    /// lands. The store is never touched from here.
    fn worker(
        &self,
        cancel: &CancelToken,
        next_batch: &AtomicU64,
        end: u64,
        cutoff_cell: &AtomicI64,
        tx: Sender<WorkerMsg>,
    ) {
        let per_batch = self.lattice.seeds_per_batch();
        let mut bank = empty_bank(&self.filter);
        let mut outcome = self.filter.outcome();
        let mut buf: Vec<ResultRow> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let b = next_batch.fetch_add(1, Ordering::Relaxed);
            if b >= end {
                break;
            }
            let cutoff = cutoff_cell.load(Ordering::Relaxed);

            let mut complete = true;
            let mut offset = 0u64;
            while offset < per_batch {
                // Cancellation is consulted at every lane group; in-flight
                // lanes finish, the rest of the batch is abandoned.
                if cancel.is_cancelled() {
                    complete = false;
                    break;
                }
                let group = (per_batch - offset).min(LANES as u64);
                // Inactive tail lanes reuse the last valid seed; the mask
                // keeps them out of the results.
                let seeds: [Seed; LANES] = std::array::from_fn(|k| {
                    self.lattice.seed(b, offset + (k as u64).min(group - 1))
                });
                let bytes: [&[u8]; LANES] = std::array::from_fn(|k| &seeds[k].as_bytes()[..]);
                bank.rebuild(&self.filter.plan, &bytes);
                let active = Mask8::from_fn(|k| (k as u64) < group);
                self.filter.evaluate_into(&bank, active, cutoff, &mut outcome);
                collect_rows(&outcome, &seeds, cutoff, &mut buf);
                if buf.len() >= WORKER_BUF_CAP {
                    trim_rows(&mut buf, RESULT_CAP);
                }
                offset += group;
            }

            if !buf.is_empty() {
                trim_rows(&mut buf, RESULT_CAP);
                if tx.send(WorkerMsg::Rows(std::mem::take(&mut buf))).is_err() {
                    break;
                }
            }
            if complete {
                if tx.send(WorkerMsg::BatchDone(b)).is_err() {
                    break;
                }
            } else {
                break;
            }
        }
    }

    /// Scan the fertilizer pile through the pipeline before enumeration.
    fn replay_pile(
        &self,
        cancel: &CancelToken,
        cutoff_cell: &AtomicI64,
        progress: &mut dyn SearchProgress,
    ) -> Result<u64, SearchError> {
        let pile = self.store.pile_seeds()?;
        if pile.is_empty() {
            return Ok(0);
        }
        let cutoff = cutoff_cell.load(Ordering::Relaxed);
        let mut bank = empty_bank(&self.filter);
        let mut outcome = self.filter.outcome();
        let mut rows = Vec::new();
        for chunk in pile.chunks(LANES) {
            if cancel.is_cancelled() {
                break;
            }
            let seeds: [Seed; LANES] = std::array::from_fn(|k| chunk[k.min(chunk.len() - 1)]);
            let bytes: [&[u8]; LANES] = std::array::from_fn(|k| &seeds[k].as_bytes()[..]);
            bank.rebuild(&self.filter.plan, &bytes);
            let active = Mask8::from_fn(|k| k < chunk.len());
            self.filter.evaluate_into(&bank, active, cutoff, &mut outcome);
            collect_rows(&outcome, &seeds, cutoff, &mut rows);
        }
        let hits = rows.len() as u64;
        trim_rows(&mut rows, RESULT_CAP);
        self.store.upsert_results(&rows)?;
        progress.on_pile_hits(hits, pile.len() as u64);
        Ok(hits)
    }
}

fn empty_bank(filter: &CompiledFilter) -> StreamBank {
    // Re-keyed before first use; any valid seed works for construction.
    let seed = Seed::from_index(0);
    let bytes: [&[u8]; LANES] = [&seed.as_bytes()[..]; LANES];
    StreamBank::build(&filter.plan, &bytes)
}

fn collect_rows(outcome: &LaneOutcome, seeds: &[Seed; LANES], cutoff: i64, buf: &mut Vec<ResultRow>) {
    let threshold = if cutoff == NO_CUTOFF { i64::MIN } else { cutoff };
    for k in outcome.pass.lanes() {
        if outcome.score[k] >= threshold {
            buf.push(ResultRow {
                seed: seeds[k],
                score: outcome.score[k],
                tally: outcome.tallies.iter().map(|t| t[k]).collect(),
            });
        }
    }
}

/// Keep the best `cap` rows (score descending, seed ascending on ties).
fn trim_rows(buf: &mut Vec<ResultRow>, cap: usize) {
    if buf.len() <= cap {
        return;
    }
    buf.sort_unstable_by(|a, b| b.score.cmp(&a.score).then(a.seed.cmp(&b.seed)));
    buf.truncate(cap);
}

fn advance_checkpoint(checkpoint: &mut i64, pending: &mut Vec<u64>, done: u64) {
    pending.push(done);
    pending.sort_unstable();
    while pending.first() == Some(&((*checkpoint + 1) as u64)) {
        *checkpoint += 1;
        pending.remove(0);
    }
}

/// Sink writes back off and retry once before stopping the search; the
/// checkpoint state on disk stays valid either way.
fn upsert_with_retry(store: &Store, rows: &[ResultRow]) -> Result<(), StoreError> {
    if let Err(first) = store.upsert_results(rows) {
        std::thread::sleep(std::time::Duration::from_millis(50));
        return store.upsert_results(rows).map_err(|_| first);
    }
    Ok(())
}
