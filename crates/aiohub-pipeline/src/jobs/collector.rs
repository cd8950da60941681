use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One drain cycle's worth of bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct DrainSample {
    pub at: DateTime<Utc>,
    pub claimed: usize,
    pub completed: usize,
    pub requeued: usize,
    pub failed: usize,
    pub cycle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DrainTotals {
    pub cycles: usize,
    pub claimed: usize,
    pub completed: usize,
    pub requeued: usize,
    pub failed: usize,
}

/// Bounded in-process history of drain cycles. Capacity eviction is
/// explicit: pushing past capacity drops the oldest sample. Shared by
/// handle; the buffer is owned here and nowhere else.
#[derive(Clone)]
pub struct DrainCollector {
    inner: Arc<Mutex<VecDeque<DrainSample>>>,
    capacity: usize,
}

impl DrainCollector {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn record(&self, sample: DrainSample) {
        let mut buf = self.inner.lock().expect("drain collector poisoned");
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(sample);
    }

    /// Oldest-first copy of the retained samples.
    pub fn recent(&self) -> Vec<DrainSample> {
        let buf = self.inner.lock().expect("drain collector poisoned");
        buf.iter().cloned().collect()
    }

    /// Rollup over the retained window only, not over all time.
    pub fn totals(&self) -> DrainTotals {
        let buf = self.inner.lock().expect("drain collector poisoned");
        let mut totals = DrainTotals::default();
        for s in buf.iter() {
            totals.cycles += 1;
            totals.claimed += s.claimed;
            totals.completed += s.completed;
            totals.requeued += s.requeued;
            totals.failed += s.failed;
        }
        totals
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(claimed: usize) -> DrainSample {
        DrainSample {
            at: Utc::now(),
            claimed,
            completed: claimed,
            requeued: 0,
            failed: 0,
            cycle_ms: 5,
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let collector = DrainCollector::new(3);
        for i in 0..5 {
            collector.record(sample(i));
        }

        let recent = collector.recent();
        assert_eq!(recent.len(), 3);
        let claimed: Vec<usize> = recent.iter().map(|s| s.claimed).collect();
        assert_eq!(claimed, vec![2, 3, 4]);
    }

    #[test]
    fn totals_cover_retained_window_only() {
        let collector = DrainCollector::new(2);
        collector.record(sample(10));
        collector.record(sample(1));
        collector.record(sample(2));

        let totals = collector.totals();
        assert_eq!(totals.cycles, 2);
        assert_eq!(totals.claimed, 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let collector = DrainCollector::new(0);
        collector.record(sample(1));
        assert_eq!(collector.capacity(), 1);
        assert_eq!(collector.recent().len(), 1);
    }
}
