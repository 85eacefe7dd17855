use std::collections::VecDeque;
use std::sync::Arc;

use super::sample::TrafficSample;

/// Bounded, arrival-ordered buffer of one client's traffic samples.
///
/// Once `capacity` is reached every append evicts exactly the oldest sample. Eviction is
/// positional only; reading never reorders anything.
#[derive(Debug, Clone)]
pub struct TrafficHistory {
    samples: VecDeque<Arc<TrafficSample>>,
    capacity: usize,
}

impl TrafficHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, sample: TrafficSample) {
        self.samples.push_back(Arc::new(sample));
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Owned copy of the retained samples; later appends do not affect it.
    pub fn snapshot(&self) -> Vec<Arc<TrafficSample>> {
        self.samples.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficSample> {
        self.samples.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
