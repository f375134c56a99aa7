//! Property tests over pools small enough to grow constantly.

#![allow(unsafe_code)]

use proptest::prelude::*;
use tagheap_pool::Pool;
use tagheap_test_utils::{pattern, workload};

proptest! {
    #[test]
    fn any_free_order_empties_the_pool(
        est_max in 1usize..512,
        est_count in 1usize..16,
        sizes in prop::collection::vec(1usize..1500, 1..80),
        order_seed in any::<u64>(),
    ) {
        let mut pool = Pool::new(est_max, est_count).unwrap();
        let mut live = Vec::new();
        for (tag, &size) in sizes.iter().enumerate() {
            let p = pool.allocate(size).unwrap();
            unsafe { pattern::fill(p, size, tag as u32) };
            live.push((p, size));
        }
        prop_assert!(pool.verify().is_ok());

        for i in workload::shuffled_indices(order_seed, live.len()) {
            let (p, size) = live[i];
            let intact = unsafe { pattern::check(p, size, i as u32) };
            prop_assert!(intact);
            unsafe { pool.free(p) }.unwrap();
        }

        prop_assert_eq!(pool.allocated_space(), 0);
        prop_assert_eq!(pool.free_space(), pool.total_size());
        prop_assert!(pool.verify().is_ok());
    }

    #[test]
    fn accounting_holds_after_every_step(
        ops in prop::collection::vec((any::<bool>(), 1usize..700), 1..120),
    ) {
        let mut pool = Pool::new(128, 4).unwrap();
        let mut live = Vec::new();
        for (allocate, size) in ops {
            if allocate || live.is_empty() {
                live.push(pool.allocate(size).unwrap());
            } else {
                let p = live.swap_remove(size % live.len());
                unsafe { pool.free(p) }.unwrap();
            }
            prop_assert_eq!(
                pool.free_space() + pool.allocated_space(),
                pool.total_size()
            );
        }
    }
}
