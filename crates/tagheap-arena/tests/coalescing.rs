//! Property tests: any sequence of allocations freed in any order leaves
//! the arena exactly as it started.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use proptest::prelude::*;
use tagheap_arena::Arena;
use tagheap_test_utils::pattern;

const ARENA_BYTES: usize = 64 * 1024;

fn allocate_all(arena: &mut Arena, sizes: &[usize]) -> Vec<(NonNull<u8>, usize)> {
    sizes
        .iter()
        .filter_map(|&size| arena.allocate(size).map(|p| (p, size)))
        .collect()
}

proptest! {
    #[test]
    fn freeing_everything_in_any_order_restores_free_space(
        sizes in prop::collection::vec(1usize..2048, 1..64),
        order_seed in any::<u64>(),
    ) {
        let mut arena = Arena::new(ARENA_BYTES).unwrap();
        let initial = arena.free_space();

        let live = allocate_all(&mut arena, &sizes);
        arena.verify().unwrap();

        let order = tagheap_test_utils::workload::shuffled_indices(order_seed, live.len());
        for i in order {
            unsafe { arena.free(live[i].0) }.unwrap();
            prop_assert!(arena.verify().is_ok());
        }

        prop_assert_eq!(arena.free_space(), initial);
        prop_assert_eq!(arena.allocated_space(), 0);
        prop_assert_eq!(arena.blocks().count(), 1);
    }

    #[test]
    fn live_allocations_never_overlap(
        sizes in prop::collection::vec(1usize..512, 1..128),
        free_mask in prop::collection::vec(any::<bool>(), 128),
    ) {
        let mut arena = Arena::new(ARENA_BYTES).unwrap();
        let mut live = allocate_all(&mut arena, &sizes);
        for (tag, &(p, size)) in live.iter().enumerate() {
            unsafe { pattern::fill(p, size, tag as u32) };
        }

        // Free a subset, then refill the holes with fresh allocations.
        let mut kept = Vec::new();
        for (i, entry) in live.drain(..).enumerate() {
            if free_mask[i % free_mask.len()] {
                unsafe { arena.free(entry.0) }.unwrap();
            } else {
                kept.push((entry, i as u32));
            }
        }
        let base = sizes.len() as u32;
        for (j, &size) in sizes.iter().enumerate() {
            if let Some(p) = arena.allocate(size) {
                unsafe { pattern::fill(p, size, base + j as u32) };
                kept.push(((p, size), base + j as u32));
            }
        }

        arena.verify().unwrap();
        for &((p, size), tag) in &kept {
            let intact = unsafe { pattern::check(p, size, tag) };
            prop_assert!(intact);
        }
    }

    #[test]
    fn accounting_invariant_holds_after_every_step(
        ops in prop::collection::vec((1usize..4096, any::<bool>()), 1..200),
    ) {
        let mut arena = Arena::new(ARENA_BYTES).unwrap();
        let total = arena.total_size();
        let mut live: Vec<NonNull<u8>> = Vec::new();
        for (size, release) in ops {
            if release && !live.is_empty() {
                let p = live.swap_remove(size % live.len());
                unsafe { arena.free(p) }.unwrap();
            } else if let Some(p) = arena.allocate(size) {
                live.push(p);
            }
            prop_assert_eq!(arena.free_space() + arena.allocated_space(), total);
        }
    }
}

#[test]
fn full_arena_refuses_one_byte() {
    let mut arena = Arena::new(4096).unwrap();
    let mut live = Vec::new();
    while let Some(p) = arena.allocate(1) {
        live.push(p);
    }
    assert_eq!(arena.free_space(), 0);
    assert!(arena.allocate(1).is_none());
    for p in live.into_iter().rev() {
        unsafe { arena.free(p) }.unwrap();
    }
    assert_eq!(arena.free_space(), arena.total_size());
}
