use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::core::{
  config::HeapConfig,
  error::HeapError,
  heap::{CollectorPhase, Heap},
  object::ObjectId,
};

fn small_heap() -> Heap {
  Heap::new(HeapConfig::default().with_arena_capacity(4096).with_gc_statistics(false))
}

/// Creates an object whose destructor bumps `counter`.
fn counted(heap: &mut Heap, size: usize, counter: &Arc<AtomicUsize>) -> ObjectId {
  let counter = counter.clone();
  heap.create_with_destructor(size, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
      })
      .unwrap()
}

#[test]
fn create_gives_zeroed_payload_and_one_reference() {
  let mut heap = small_heap();
  let id       = heap.create(24, None).unwrap();

  assert!(heap.is_live(id));
  assert_eq!(heap.size(id).unwrap(), 24);
  assert_eq!(heap.ref_count(id).unwrap(), 1);
  assert!(heap.data(id).unwrap().iter().all(|&b| b == 0));
  assert_eq!(heap.object_count(), 1);
  assert_eq!(heap.phase(), CollectorPhase::Idle);
  heap.check_invariants().unwrap();
}

#[test]
fn balanced_retain_release_destroys_once() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));
  let id       = counted(&mut heap, 16, &fired);

  heap.retain(id).unwrap();
  heap.retain(id).unwrap();
  assert_eq!(heap.ref_count(id).unwrap(), 3);

  assert!(!heap.release(id).unwrap());
  assert!(!heap.release(id).unwrap());
  assert_eq!(fired.load(Ordering::SeqCst), 0);

  assert!(heap.release(id).unwrap());
  assert_eq!(fired.load(Ordering::SeqCst), 1);
  assert!(!heap.is_live(id));
  assert_eq!(heap.used_memory(), 0);
  assert_eq!(heap.statistics().objects_released, 1);
}

#[test]
fn stale_handles_are_rejected() {
  let mut heap = small_heap();
  let id       = heap.create(8, None).unwrap();
  heap.release(id).unwrap();

  assert_eq!(heap.release(id), Err(HeapError::InvalidHandle(id)));
  assert_eq!(heap.retain(id), Err(HeapError::InvalidHandle(id)));
  assert_eq!(heap.size(id), Err(HeapError::InvalidHandle(id)));
  assert!(heap.data(id).is_err());

  // The slot is reused, but the old handle still does not resolve.
  let replacement = heap.create(8, None).unwrap();
  assert_eq!(replacement.index(), id.index());
  assert!(!heap.is_live(id));
  assert!(heap.is_live(replacement));
}

#[test]
fn destructor_sees_payload() {
  let mut heap = small_heap();
  let seen     = Arc::new(AtomicUsize::new(0));
  let sink     = seen.clone();
  let id       = heap.create_with_destructor(4, move |bytes| {
                       sink.store(bytes.iter().map(|&b| b as usize).sum(), Ordering::SeqCst);
                     })
                     .unwrap();

  heap.data_mut(id).unwrap().copy_from_slice(&[1, 2, 3, 4]);
  heap.release(id).unwrap();

  assert_eq!(seen.load(Ordering::SeqCst), 10);
}

#[test]
fn release_cascades_through_edges() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));
  let parent   = counted(&mut heap, 8, &fired);
  let left     = counted(&mut heap, 8, &fired);
  let right    = counted(&mut heap, 8, &fired);

  assert!(heap.add_reference(parent, left).unwrap());
  assert!(heap.add_reference(parent, right).unwrap());
  assert!(!heap.add_reference(parent, left).unwrap());
  heap.release(left).unwrap();
  heap.release(right).unwrap();

  assert_eq!(heap.ref_count(left).unwrap(), 1);
  assert_eq!(heap.reference_count(left).unwrap(), 1);
  assert_eq!(heap.outgoing(parent).unwrap().collect::<Vec<_>>(), vec![left, right]);
  assert_eq!(heap.incoming(right).unwrap().collect::<Vec<_>>(), vec![parent]);
  heap.check_invariants().unwrap();

  heap.release(parent).unwrap();
  assert_eq!(fired.load(Ordering::SeqCst), 3);
  assert_eq!(heap.object_count(), 0);
  assert_eq!(heap.used_memory(), 0);
}

#[test]
fn long_chain_release_does_not_recurse() {
  let mut heap = Heap::new(HeapConfig::default().with_arena_capacity(8 * 200_000).with_gc_statistics(false));
  let fired    = Arc::new(AtomicUsize::new(0));

  let head     = counted(&mut heap, 8, &fired);
  let mut tail = head;
  for _ in 1..200_000 {
    let next = counted(&mut heap, 8, &fired);
    heap.add_reference(tail, next).unwrap();
    heap.release(next).unwrap();
    tail = next;
  }

  heap.release(head).unwrap();
  assert_eq!(fired.load(Ordering::SeqCst), 200_000);
  assert_eq!(heap.object_count(), 0);
}

#[test]
fn remove_reference_releases_target() {
  let mut heap = small_heap();
  let owner    = heap.create(8, None).unwrap();
  let target   = heap.create(8, None).unwrap();

  heap.add_reference(owner, target).unwrap();
  heap.release(target).unwrap();
  assert!(heap.is_live(target));

  assert!(heap.remove_reference(owner, target).unwrap());
  assert!(!heap.is_live(target));
  assert!(!heap.remove_reference(owner, target).unwrap());
  assert_eq!(heap.outgoing(owner).unwrap().count(), 0);
  heap.check_invariants().unwrap();
}

#[test]
fn clear_references_with_self_edge() {
  let mut heap = small_heap();
  let owner    = heap.create(8, None).unwrap();
  let other    = heap.create(8, None).unwrap();

  heap.add_reference(owner, owner).unwrap();
  heap.add_reference(owner, other).unwrap();
  heap.release(other).unwrap();

  assert_eq!(heap.clear_references(owner).unwrap(), 2);
  assert!(heap.is_live(owner));
  assert!(!heap.is_live(other));
  assert_eq!(heap.ref_count(owner).unwrap(), 1);
  heap.check_invariants().unwrap();
}

#[test]
fn collect_frees_unrooted_cycle() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));
  let before   = heap.available_memory();

  let a = counted(&mut heap, 32, &fired);
  let b = counted(&mut heap, 32, &fired);
  heap.add_reference(a, b).unwrap();
  heap.add_reference(b, a).unwrap();
  heap.release(a).unwrap();
  heap.release(b).unwrap();

  // The cycle keeps both counts positive.
  assert!(heap.is_live(a) && heap.is_live(b));
  assert_eq!(fired.load(Ordering::SeqCst), 0);

  let report = heap.collect();
  assert_eq!(report.marked, 0);
  assert_eq!(report.swept, 2);
  assert_eq!(report.bytes_reclaimed, 64);
  assert_eq!(fired.load(Ordering::SeqCst), 2);
  assert_eq!(heap.available_memory(), before);
  assert_eq!(heap.statistics().collections, 1);
}

#[test]
fn collect_frees_self_loop_once() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));
  let id       = counted(&mut heap, 8, &fired);

  heap.add_reference(id, id).unwrap();
  heap.release(id).unwrap();
  assert!(heap.is_live(id));

  assert_eq!(heap.collect().swept, 1);
  assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn rooted_objects_survive_collection() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));
  let root     = counted(&mut heap, 8, &fired);
  let child    = counted(&mut heap, 8, &fired);
  let stray    = counted(&mut heap, 8, &fired);

  heap.register_root("globals", root).unwrap();
  heap.add_reference(root, child).unwrap();
  heap.add_reference(child, root).unwrap();
  heap.add_reference(stray, child).unwrap();
  heap.release(root).unwrap();
  heap.release(child).unwrap();

  // `stray` is still held by the caller but is not reachable from a root.
  let report = heap.collect();
  assert_eq!(report.marked, 2);
  assert_eq!(report.swept, 1);
  assert!(!heap.is_live(stray));
  assert_eq!(fired.load(Ordering::SeqCst), 1);
  assert_eq!(heap.ref_count(child).unwrap(), 1);
  assert!(!heap.registry().get(root).unwrap().is_marked());
  heap.check_invariants().unwrap();

  assert!(heap.unregister_root("globals"));
  assert!(heap.is_live(root));
  let report = heap.collect();
  assert_eq!(report.swept, 2);
  assert_eq!(fired.load(Ordering::SeqCst), 3);
  assert_eq!(heap.object_count(), 0);
}

#[test]
fn sweep_drops_edge_into_survivor() {
  let mut heap  = small_heap();
  let survivor  = heap.create(8, None).unwrap();
  let garbage   = heap.create(8, None).unwrap();

  heap.register_root("kept", survivor).unwrap();
  heap.release(survivor).unwrap();
  heap.add_reference(garbage, garbage).unwrap();
  heap.add_reference(garbage, survivor).unwrap();
  heap.release(garbage).unwrap();
  assert_eq!(heap.ref_count(survivor).unwrap(), 2);

  assert_eq!(heap.collect().swept, 1);
  assert_eq!(heap.ref_count(survivor).unwrap(), 1);
  assert_eq!(heap.incoming(survivor).unwrap().count(), 0);
  heap.check_invariants().unwrap();
}

#[test]
fn unrooted_objects_are_swept_even_if_held() {
  let mut heap = small_heap();
  let held     = heap.create(8, None).unwrap();

  heap.collect();
  assert!(!heap.is_live(held));
  assert_eq!(heap.release(held), Err(HeapError::InvalidHandle(held)));
}

#[test]
fn root_replace_and_unregister() {
  let mut heap = Heap::new(HeapConfig::default().with_initial_root_capacity(1).with_gc_statistics(false));
  let first    = heap.create(8, None).unwrap();
  let second   = heap.create(8, None).unwrap();

  assert!(!heap.register_root("slot", first).unwrap());
  heap.release(first).unwrap();
  assert_eq!(heap.lookup_root("slot"), Some(first));

  // Replacing drops the old root reference, which was `first`'s last.
  assert!(heap.register_root("slot", second).unwrap());
  assert!(!heap.is_live(first));
  assert_eq!(heap.lookup_root("slot"), Some(second));
  assert_eq!(heap.ref_count(second).unwrap(), 2);

  // Same object, same key: nothing is freed in between.
  heap.register_root("slot", second).unwrap();
  assert_eq!(heap.ref_count(second).unwrap(), 2);

  assert!(heap.register_root("other", second).is_ok());
  assert_eq!(heap.root_count(), 2);
  assert_eq!(heap.ref_count(second).unwrap(), 3);

  assert!(heap.unregister_root("slot"));
  assert!(!heap.unregister_root("slot"));
  assert_eq!(heap.lookup_root("slot"), None);
  assert_eq!(heap.root_count(), 1);
  assert_eq!(heap.ref_count(second).unwrap(), 2);
  heap.check_invariants().unwrap();
}

#[test]
fn register_root_rejects_stale_handle() {
  let mut heap = small_heap();
  let id       = heap.create(8, None).unwrap();
  heap.release(id).unwrap();

  assert_eq!(heap.register_root("gone", id), Err(HeapError::InvalidHandle(id)));
  assert_eq!(heap.root_count(), 0);
}

#[test]
fn available_memory_tracks_allocations() {
  let mut heap  = small_heap();
  let total     = heap.total_memory();
  let mut last  = heap.available_memory();
  let mut ids   = Vec::new();
  assert_eq!(last, total);

  for size in [1, 8, 13, 64, 100] {
    let id = heap.create(size, None).unwrap();
    assert!(heap.available_memory() < last);
    last = heap.available_memory();
    ids.push(id);
  }
  assert_eq!(heap.used_memory() + heap.available_memory(), total);

  for id in ids {
    heap.release(id).unwrap();
  }
  assert_eq!(heap.available_memory(), total);
}

#[test]
fn out_of_memory_is_reported() {
  let mut heap = Heap::new(HeapConfig::default().with_arena_capacity(64).with_gc_statistics(false));
  let first    = heap.create(48, None).unwrap();

  match heap.create(32, None) {
    Err(HeapError::OutOfMemory { requested, available }) => {
      assert_eq!(requested, 32);
      assert_eq!(available, 16);
    }
    other => panic!("expected OutOfMemory, got {:?}", other),
  }

  // A failed allocation leaves the heap as it was.
  assert_eq!(heap.object_count(), 1);
  heap.release(first).unwrap();
  assert!(heap.create(64, None).is_ok());
}

#[test]
fn low_watermark_triggers_collection() {
  let config   = HeapConfig::default()
                     .with_arena_capacity(256)
                     .with_low_watermark(128)
                     .with_gc_statistics(false);
  let mut heap = Heap::new(config);

  let a = heap.create(96, None).unwrap();
  let b = heap.create(96, None).unwrap();
  heap.add_reference(a, b).unwrap();
  heap.add_reference(b, a).unwrap();
  heap.release(a).unwrap();
  heap.release(b).unwrap();
  assert_eq!(heap.statistics().collections, 0);

  // 64 bytes left is below the watermark, so this create collects the cycle before allocating.
  let c = heap.create(128, None).unwrap();
  assert_eq!(heap.statistics().collections, 1);
  assert!(!heap.is_live(a) && !heap.is_live(b));
  assert!(heap.is_live(c));
}

#[test]
fn shutdown_runs_every_destructor_once() {
  let mut heap = small_heap();
  let fired    = Arc::new(AtomicUsize::new(0));

  let rooted = counted(&mut heap, 8, &fired);
  let child  = counted(&mut heap, 8, &fired);
  let _held  = counted(&mut heap, 8, &fired);
  heap.register_root("r", rooted).unwrap();
  heap.add_reference(rooted, child).unwrap();
  heap.release(child).unwrap();

  let report = heap.shutdown();
  assert_eq!(report.swept, 3);
  assert_eq!(fired.load(Ordering::SeqCst), 3);
}

#[test]
fn drop_tears_down() {
  let fired = Arc::new(AtomicUsize::new(0));
  {
    let mut heap = small_heap();
    let a        = counted(&mut heap, 8, &fired);
    let b        = counted(&mut heap, 8, &fired);
    heap.register_root("a", a).unwrap();
    heap.add_reference(a, b).unwrap();
  }
  assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn random_graph_keeps_invariants() {
  let mut rng  = StdRng::seed_from_u64(0x6ec3);
  let mut heap = Heap::new(HeapConfig::default().with_arena_capacity(64 * 1024).with_gc_statistics(false));
  let fired    = Arc::new(AtomicUsize::new(0));
  let mut created = 0;

  // Handles the test itself still owns a reference to.
  let mut held: Vec<ObjectId> = Vec::new();

  for step in 0..2_000 {
    match rng.random_range(0..8) {
      0 | 1 => {
        let size = rng.random_range(0..48);
        if let Ok(id) = heap.create_with_destructor(size, {
          let fired = fired.clone();
          move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
          }
        }) {
          created += 1;
          held.push(id);
        }
      }
      2 | 3 if held.len() >= 2 => {
        let owner  = held[rng.random_range(0..held.len())];
        let target = held[rng.random_range(0..held.len())];
        if heap.is_live(owner) && heap.is_live(target) {
          heap.add_reference(owner, target).unwrap();
        }
      }
      4 if !held.is_empty() => {
        let owner = held[rng.random_range(0..held.len())];
        if heap.is_live(owner) {
          let first = heap.outgoing(owner).unwrap().next();
          if let Some(target) = first {
            assert!(heap.remove_reference(owner, target).unwrap());
          }
        }
      }
      5 if !held.is_empty() => {
        let id = held.swap_remove(rng.random_range(0..held.len()));
        if heap.is_live(id) {
          heap.release(id).unwrap();
        }
      }
      6 if !held.is_empty() => {
        let id  = held[rng.random_range(0..held.len())];
        let key = format!("root{}", rng.random_range(0..16));
        if heap.is_live(id) {
          heap.register_root(&key, id).unwrap();
        }
      }
      7 => {
        if step % 5 == 0 {
          heap.collect();
        } else {
          heap.unregister_root(&format!("root{}", rng.random_range(0..16)));
        }
      }
      _ => {}
    }

    heap.check_invariants().unwrap();
  }

  heap.shutdown();
  assert_eq!(fired.load(Ordering::SeqCst), created);
}

#[test]
#[should_panic(expected = "heap invariant violated")]
fn over_release_of_edge_held_object_panics() {
  let mut heap = small_heap();
  let owner    = heap.create(8, None).unwrap();
  let target   = heap.create(8, None).unwrap();

  heap.add_reference(owner, target).unwrap();
  heap.release(target).unwrap();

  // The only remaining count belongs to the edge.
  let _ = heap.release(target);
}

#[test]
#[should_panic(expected = "heap invariant violated")]
fn collect_panics_on_survivor_edge_into_garbage() {
  let mut heap = small_heap();
  let rooted   = heap.create(8, None).unwrap();
  let garbage  = heap.create(8, None).unwrap();

  heap.register_root("rooted", rooted).unwrap();
  // A back-pointer with no matching edge makes `garbage` look referenced by a reachable object.
  heap.registry.get_mut(garbage).unwrap().incoming.push(rooted);

  heap.collect();
}

#[test]
fn check_invariants_reports_corruption() {
  let mut heap = small_heap();
  let owner    = heap.create(8, None).unwrap();
  let target   = heap.create(8, None).unwrap();
  heap.add_reference(owner, target).unwrap();
  heap.check_invariants().unwrap();

  // A referrer that was never issued
  let bogus = ObjectId::new(99, 0);
  heap.registry.get_mut(target).unwrap().incoming.push(bogus);
  assert!(matches!(heap.check_invariants(), Err(HeapError::InvariantViolation(_))));
  heap.registry.get_mut(target).unwrap().incoming.pop();

  // A count too small to cover the edge and the root naming it
  heap.register_root("target", target).unwrap();
  heap.registry.get_mut(target).unwrap().ref_count = 1;
  assert!(matches!(heap.check_invariants(), Err(HeapError::InvariantViolation(_))));
  heap.registry.get_mut(target).unwrap().ref_count = 3;

  heap.check_invariants().unwrap();
}
