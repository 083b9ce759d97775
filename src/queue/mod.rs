//! Per-thread problem scheduler
//!
//! One bounded max-heap of pending subproblems per worker. Workers pop
//! from their own heap; new problems are placed on the heap of the least
//! loaded worker, where a popped-but-unretired problem counts as one
//! extra unit of load so the scan prefers idle peers. Ties go to the
//! pushing worker to avoid needless migration.
//!
//! Each heap is guarded by its own mutex; the per-heap length counters
//! and running flags are atomics readable without a lock, so the
//! placement scan works on a slightly stale view. Staleness only biases
//! placement; no problem is ever lost or duplicated.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::config::QueueKind;
use crate::problem::MulticutProblem;

impl QueueKind {
    /// Priority comparison: `Greater` means `a` pops before `b`.
    fn compare(self, a: &MulticutProblem, b: &MulticutProblem) -> CmpOrdering {
        let lower_rule = |a: &MulticutProblem, b: &MulticutProblem| {
            (a.lower_bound, a.upper_bound)
                .cmp(&(b.lower_bound, b.upper_bound))
                .reverse()
        };
        match self {
            QueueKind::SmallGraph => a
                .graph
                .num_vertices()
                .cmp(&b.graph.num_vertices())
                .reverse(),
            QueueKind::BoundSum => a
                .upper_bound
                .saturating_add(a.lower_bound)
                .cmp(&b.upper_bound.saturating_add(b.lower_bound))
                .reverse(),
            QueueKind::LowerBound => lower_rule(a, b),
            QueueKind::UpperBound => (a.upper_bound, a.lower_bound)
                .cmp(&(b.upper_bound, b.lower_bound))
                .reverse(),
            QueueKind::FewTerminals => match a.terminals.len().cmp(&b.terminals.len()) {
                CmpOrdering::Equal => lower_rule(a, b),
                other => other.reverse(),
            },
            QueueKind::BiggerDistance => a
                .upper_bound
                .saturating_sub(a.lower_bound)
                .cmp(&b.upper_bound.saturating_sub(b.lower_bound)),
            QueueKind::LowerDistance => a
                .upper_bound
                .saturating_sub(a.lower_bound)
                .cmp(&b.upper_bound.saturating_sub(b.lower_bound))
                .reverse(),
            QueueKind::MostDeleted => a.deleted_weight.cmp(&b.deleted_weight),
        }
    }
}

struct PendingProblem {
    kind: QueueKind,
    problem: MulticutProblem,
}

impl PartialEq for PendingProblem {
    fn eq(&self, other: &Self) -> bool {
        self.kind.compare(&self.problem, &other.problem) == CmpOrdering::Equal
    }
}

impl Eq for PendingProblem {}

impl PartialOrd for PendingProblem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingProblem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.kind.compare(&self.problem, &other.problem)
    }
}

/// Scheduler holding one priority heap of pending subproblems per worker.
pub struct PerThreadProblemQueue {
    heaps: Vec<Mutex<BinaryHeap<PendingProblem>>>,
    lens: Vec<AtomicUsize>,
    running: Vec<AtomicBool>,
    /// Problems pushed and not yet retired (pending or in flight); the
    /// race-free termination signal
    active: AtomicUsize,
    kind: QueueKind,
    capacity: usize,
    shed: AtomicBool,
}

impl PerThreadProblemQueue {
    /// Create a scheduler for `threads` workers using the given ordering.
    /// Heaps exceeding `capacity` shed their worst entries.
    pub fn new(threads: usize, kind: QueueKind, capacity: usize) -> Self {
        Self {
            heaps: (0..threads).map(|_| Mutex::new(BinaryHeap::new())).collect(),
            lens: (0..threads).map(|_| AtomicUsize::new(0)).collect(),
            running: (0..threads).map(|_| AtomicBool::new(false)).collect(),
            active: AtomicUsize::new(0),
            kind,
            capacity,
            shed: AtomicBool::new(false),
        }
    }

    /// Number of workers this scheduler serves.
    pub fn num_workers(&self) -> usize {
        self.heaps.len()
    }

    /// Place a problem on the heap of the least-loaded worker, counting
    /// one extra unit for workers that hold a popped-but-unretired
    /// problem. Ties go to the caller's worker. Returns the chosen index.
    ///
    /// The running flag is owned exclusively by `pop` and `retire`:
    /// clearing it here, at the start of a push from the worker that just
    /// finished a problem, would stop the scan from preferring idle peers
    /// for the children being pushed, which is exactly when the
    /// preference matters.
    pub fn push(&self, problem: MulticutProblem, local_id: usize) -> usize {
        let load = |i: usize| {
            self.lens[i].load(Ordering::Relaxed)
                + usize::from(self.running[i].load(Ordering::Relaxed))
        };
        let mut target = 0;
        let mut best = usize::MAX;
        for i in 0..self.heaps.len() {
            let score = load(i);
            if score < best {
                best = score;
                target = i;
            }
        }
        if load(local_id) == best {
            target = local_id;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        let mut heap = self.heaps[target].lock();
        heap.push(PendingProblem {
            kind: self.kind,
            problem,
        });
        self.lens[target].fetch_add(1, Ordering::Relaxed);
        if heap.len() > self.capacity {
            self.shed_overflow(&mut heap, target);
        }
        target
    }

    /// Pop the highest-priority problem from worker `local_id`'s heap and
    /// mark the worker as running. Returns `None` if the heap is empty.
    pub fn pop(&self, local_id: usize) -> Option<MulticutProblem> {
        let mut heap = self.heaps[local_id].lock();
        let pending = heap.pop()?;
        // Mark running before the length drops so a peer scanning for
        // termination never observes an all-idle, all-empty scheduler
        // while this problem is in flight.
        self.running[local_id].store(true, Ordering::SeqCst);
        self.lens[local_id].fetch_sub(1, Ordering::SeqCst);
        Some(pending.problem)
    }

    /// Mark worker `local_id` as done with its popped problem. The engine
    /// calls this after processing, whether or not children were pushed.
    pub fn retire(&self, local_id: usize) {
        self.running[local_id].store(false, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// True if worker `i`'s heap is empty.
    pub fn is_empty(&self, i: usize) -> bool {
        self.lens[i].load(Ordering::SeqCst) == 0
    }

    /// True if every heap is empty.
    pub fn all_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of pending problems across all heaps.
    pub fn len(&self) -> usize {
        self.lens.iter().map(|l| l.load(Ordering::SeqCst)).sum()
    }

    /// True if no worker holds a popped-but-unretired problem.
    pub fn none_running(&self) -> bool {
        !self.running.iter().any(|r| r.load(Ordering::SeqCst))
    }

    /// True once every pushed problem has been retired. Unlike checking
    /// `all_empty` and `none_running` back to back, a single counter
    /// cannot observe the instant between a peer popping the last entry
    /// and pushing its children, so workers exiting on this signal never
    /// strand work.
    pub fn is_idle(&self) -> bool {
        self.active.load(Ordering::SeqCst) == 0
    }

    /// True if any heap ever shed entries to stay under capacity; the
    /// result must then be reported as approximate.
    pub fn has_shed(&self) -> bool {
        self.shed.load(Ordering::SeqCst)
    }

    /// Drop the entries with the highest lower bounds until the heap fits
    /// the capacity again. Safe for the search value as long as the run
    /// is flagged approximate: the dropped problems are the ones a
    /// tightening upper bound would prune first.
    fn shed_overflow(&self, heap: &mut BinaryHeap<PendingProblem>, worker: usize) {
        let mut entries: Vec<PendingProblem> = std::mem::take(heap).into_vec();
        entries.sort_by_key(|p| p.problem.lower_bound);
        let dropped = entries.len() - self.capacity;
        entries.truncate(self.capacity);
        heap.extend(entries);
        self.lens[worker].store(heap.len(), Ordering::SeqCst);
        // Dropped problems will never be popped; close their obligations.
        self.active.fetch_sub(dropped, Ordering::SeqCst);
        self.shed.store(true, Ordering::SeqCst);
        warn!(
            worker,
            dropped, "problem heap over capacity; dropping weakest subproblems"
        );
    }
}
