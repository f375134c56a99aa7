//! The process-wide pool. Every test takes `SERIAL` because they share
//! one global instance.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::sync::Mutex;

use allocator_api2::vec::Vec as PoolVec;
use tagheap_alloc::global::{self, GlobalPool};
use tagheap_alloc::AllocError;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> std::sync::MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn lifecycle() {
    let _guard = serial();
    global::teardown();

    assert!(!global::is_initialized());
    assert_eq!(global::free_space(), Err(AllocError::NotInitialized));
    assert_eq!(
        global::allocate(Layout::new::<u64>()),
        Err(AllocError::NotInitialized)
    );
    assert!(!global::teardown());

    global::init(false, 256, 64).unwrap();
    assert!(global::is_initialized());
    assert_eq!(global::init(true, 256, 64), Err(AllocError::AlreadyInitialized));

    let layout = Layout::new::<[u64; 4]>();
    let p = global::allocate(layout).unwrap();
    assert_eq!(p.as_ptr() as usize % layout.align(), 0);
    unsafe { global::deallocate(p, layout) }.unwrap();

    let words = global::allocate_array::<u64>(100).unwrap();
    assert!(global::allocated_space().unwrap() >= 100 * size_of::<u64>());
    unsafe { global::deallocate_array(words, 100) }.unwrap();
    assert_eq!(global::allocated_space().unwrap(), 0);

    assert!(global::teardown());
    assert!(!global::is_initialized());
}

#[test]
fn invalid_config_leaves_global_uninitialised() {
    let _guard = serial();
    global::teardown();

    let err = global::init(false, 0, 10).unwrap_err();
    assert!(matches!(err, AllocError::Pool(_)));
    assert!(!global::is_initialized());
}

#[test]
fn container_workload() {
    let _guard = serial();
    global::teardown();
    tagheap_test_utils::init_tracing();

    const COUNT: usize = 4 * 1024;
    global::init(false, COUNT * size_of::<u32>(), 10).unwrap();

    let mut vecs: Vec<PoolVec<u32, GlobalPool>> = (1..COUNT)
        .map(|i| {
            let mut v = PoolVec::new_in(GlobalPool);
            v.resize(i, i as u32);
            v
        })
        .collect();
    for (i, v) in (1..).zip(&vecs) {
        assert_eq!(v.len(), i);
    }

    for v in vecs.iter_mut().skip(1).step_by(2) {
        v.clear();
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 0);
    }
    for (i, v) in (1..).zip(&mut vecs).skip(1).step_by(2) {
        v.resize(2 * i, i as u32);
    }
    for (i, v) in (1..).zip(&vecs) {
        let expected = if i % 2 == 0 { 2 * i } else { i };
        assert_eq!(v.len(), expected);
        assert!(v.iter().all(|&x| x == i as u32));
    }

    assert!(global::allocated_space().unwrap() > 0);
    vecs.clear();
    assert_eq!(global::allocated_space().unwrap(), 0);
    assert!(global::teardown());
}

#[test]
fn hash_map_on_the_global_pool() {
    let _guard = serial();
    global::teardown();
    global::init(true, 64, 1024).unwrap();

    let mut map = hashbrown::HashMap::new_in(GlobalPool);
    for i in 0..5_000u64 {
        map.insert(i, i.to_string());
    }
    map.retain(|k, _| k % 3 == 0);
    assert_eq!(map.len(), 1_667);
    assert_eq!(map.get(&300).map(String::as_str), Some("300"));

    drop(map);
    assert_eq!(global::allocated_space().unwrap(), 0);
    assert!(global::teardown());
}

#[test]
fn containers_fail_without_a_pool() {
    let _guard = serial();
    global::teardown();

    let mut v: PoolVec<u8, GlobalPool> = PoolVec::new_in(GlobalPool);
    assert!(v.try_reserve(16).is_err());
    assert!(v.is_empty());
}

#[test]
fn shared_global_serves_many_threads() {
    let _guard = serial();
    global::teardown();
    global::init(true, 128, 256).unwrap();

    std::thread::scope(|s| {
        for t in 0..4usize {
            s.spawn(move || {
                let blocks: Vec<_> = (1..200)
                    .map(|i| {
                        let layout = Layout::from_size_align(i * (t + 1), 8).unwrap();
                        (global::allocate(layout).unwrap(), layout)
                    })
                    .collect();
                for (p, layout) in blocks {
                    unsafe { global::deallocate(p, layout) }.unwrap();
                }
            });
        }
    });

    assert!(global::teardown());
}
