//! Shared analysis tap between the audio thread and the frame loop

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Ring of the most recent signal samples.
///
/// The audio callback (or the offline pump) is the only writer; the analyser
/// only ever reads snapshots. Clones share the same ring.
#[derive(Debug, Clone)]
pub struct SignalTap {
    ring: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SignalTap {
    /// Default ring capacity, comfortably above the largest analysis window
    pub const DEFAULT_CAPACITY: usize = 2048;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    // A poisoned lock only means a writer panicked mid-push; the samples are still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append samples, dropping the oldest ones once the ring is full
    pub fn push(&self, samples: &[f32]) {
        let mut ring = self.lock();
        for &sample in samples {
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(sample);
        }
    }

    /// Copy the latest `n` samples, oldest first.
    ///
    /// When fewer than `n` samples have been written the front is zero padded,
    /// which reads as silence to the analyser.
    pub fn snapshot(&self, n: usize) -> Vec<f32> {
        let ring = self.lock();
        let available = ring.len().min(n);
        let mut out = vec![0.0; n - available];
        out.extend(ring.iter().skip(ring.len() - available));
        out
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Whether two handles refer to the same ring
    pub fn same_ring(&self, other: &SignalTap) -> bool {
        Arc::ptr_eq(&self.ring, &other.ring)
    }
}

impl Default for SignalTap {
    fn default() -> Self {
        Self::new()
    }
}
