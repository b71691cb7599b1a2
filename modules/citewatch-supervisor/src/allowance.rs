use std::sync::atomic::{AtomicU64, Ordering};

/// Backend calls the triage oracle may spend during one orchestrator run.
/// A verdict and a rewrite each cost one call.
#[derive(Debug)]
pub struct CallAllowance {
    per_run: u64,
    spent: AtomicU64,
}

impl CallAllowance {
    pub fn new(per_run: u64) -> Self {
        Self {
            per_run,
            spent: AtomicU64::new(0),
        }
    }

    /// Take one call from this run's allowance. Never overshoots under contention.
    pub fn claim(&self) -> bool {
        self.spent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |spent| {
                (spent < self.per_run).then_some(spent + 1)
            })
            .is_ok()
    }

    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::Acquire)
    }

    pub fn left(&self) -> u64 {
        self.per_run.saturating_sub(self.spent())
    }

    /// Open a new run with the full allowance. Returns what the previous run spent.
    pub fn renew(&self) -> u64 {
        self.spent.swap(0, Ordering::AcqRel)
    }
}
