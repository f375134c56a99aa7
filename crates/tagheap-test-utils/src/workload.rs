//! Seeded random allocation workloads.
//!
//! A [`Workload`] is a list of items, each with an initial size, a coin
//! flip deciding whether it is released in the churn phase, and a second
//! size used when it is reallocated. The same seed always produces the
//! same workload, so failures reproduce.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One allocation in a [`Workload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// Size of the first allocation, in bytes (at least 1).
    pub size: usize,
    /// Whether the item is freed and reallocated during churn.
    pub churn: bool,
    /// Size of the replacement allocation, in bytes (at least 1).
    pub resize: usize,
}

/// A reproducible allocation workload.
#[derive(Clone, Debug)]
pub struct Workload {
    pub items: Vec<WorkItem>,
    pub max_size: usize,
}

impl Workload {
    /// `count` items with sizes uniform in `[1, max_size]`, about half churned.
    pub fn random(seed: u64, count: usize, max_size: usize) -> Self {
        assert!(max_size >= 1, "max_size must be at least 1");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let items = (0..count)
            .map(|_| WorkItem {
                size: rng.random_range(1..=max_size),
                churn: rng.random_bool(0.5),
                resize: rng.random_range(1..=max_size),
            })
            .collect();
        Self { items, max_size }
    }

    /// Sizes `1..count`, the `i`-th even item churned to twice its size.
    pub fn ascending(count: usize) -> Self {
        let items = (1..count)
            .map(|i| WorkItem {
                size: i,
                churn: i % 2 == 0,
                resize: 2 * i,
            })
            .collect();
        Self {
            items,
            max_size: 2 * count,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the workload is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the first-phase sizes.
    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(|item| item.size).sum()
    }
}

/// A seeded permutation of `0..len`, for freeing in scrambled order.
pub fn shuffled_indices(seed: u64, len: usize) -> Vec<usize> {
    use rand::seq::SliceRandom;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rng);
    order
}
