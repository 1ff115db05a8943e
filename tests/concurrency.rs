//! Concurrent allocate/release against one shared registry
//!
//! A shadow set mirrors which slots are live: a slot is inserted right after
//! `allocate` returns and removed right before `release`. Inserting a slot
//! that is already present means two live allocations shared it.

mod common;

use std::collections::HashSet;
use std::thread;

use parking_lot::Mutex;
use rand::Rng;

use common::{counting_registry, CountingAllocator};
use slotalloc::{Allocation, Registry};

const THREADS: usize = 8;
const CYCLES: usize = 1000;

fn worker(registry: &Registry<&CountingAllocator>, shadow: &Mutex<HashSet<u32>>, tag: u8) {
    let mut rng = rand::thread_rng();
    let mut held: Vec<(Allocation, usize)> = Vec::new();

    let release = |(allocation, size): (Allocation, usize)| {
        let payload = unsafe { std::slice::from_raw_parts(allocation.as_ptr(), size) };
        assert!(payload.iter().all(|&b| b == tag), "payload overwritten by another thread");
        assert!(shadow.lock().remove(&allocation.slot().index()));
        unsafe { registry.release(allocation.as_ptr()) };
    };

    for _ in 0..CYCLES {
        let size = rng.gen_range(0..512);
        let allocation = registry.allocate(size).unwrap();
        assert!(
            shadow.lock().insert(allocation.slot().index()),
            "slot {} handed out twice",
            allocation.slot()
        );
        unsafe { allocation.as_ptr().write_bytes(tag, size) };
        held.push((allocation, size));

        if held.len() > 16 || rng.gen_bool(0.5) {
            let victim = rng.gen_range(0..held.len());
            release(held.swap_remove(victim));
        }
    }

    for entry in held.drain(..) {
        release(entry);
    }
}

#[test]
fn concurrent_cycles_never_share_a_slot() {
    let raw = CountingAllocator::default();
    let registry = counting_registry(&raw);
    let shadow = Mutex::new(HashSet::new());

    thread::scope(|scope| {
        for tag in 0..THREADS {
            let registry = &registry;
            let shadow = &shadow;
            scope.spawn(move || worker(registry, shadow, tag as u8 + 1));
        }
    });

    assert!(shadow.lock().is_empty());
    assert_eq!(registry.live_count(), 0);
    assert_eq!(raw.outstanding(), 0);
    assert!(registry.capacity() >= 64);
    assert_eq!(registry.uninit().freed, 0);
}

#[test]
fn concurrent_teardown_reclaims_leaked_blocks() {
    let raw = CountingAllocator::default();
    let registry = counting_registry(&raw);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for i in 0..100 {
                    let _ = registry.allocate(i).unwrap();
                }
            });
        }
    });

    let slots: HashSet<_> = registry.live_slots().into_iter().collect();
    assert_eq!(slots.len(), THREADS * 100);

    let report = registry.uninit();
    assert_eq!(report.freed, THREADS * 100);
    assert_eq!(raw.outstanding(), 0);
}
