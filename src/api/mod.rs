/*!

The process-wide heap.

Most programs want exactly one heap. These free functions operate on a single global `Heap` that must be created
with `initialize` before first use and destroyed with `teardown`; nothing is constructed lazily. Every call other
than `initialize` and `is_initialized` fails with `HeapError::NotInitialized` when there is no heap.

Calling back into this module from a destructor while the heap is running it is a deadlock, which is reported by
panicking.

```
use geece::{api, HeapConfig};

api::initialize(HeapConfig::default()).unwrap();
let object = api::create(16, None).unwrap();
api::register_root("answer", object).unwrap();
api::release(object).unwrap();
assert_eq!(api::lookup_root("answer").unwrap(), Some(object));
api::teardown().unwrap();
```

*/

use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::core::{
  config::HeapConfig,
  error::{HeapError, HeapResult},
  heap::{CollectionReport, Heap, HeapStatistics},
  object::{Destructor, ObjectId},
};

static GLOBAL_HEAP: Mutex<Option<Heap>> = Mutex::new(None);

fn acquire_heap() -> MutexGuard<'static, Option<Heap>> {
  match GLOBAL_HEAP.try_lock() {
    Ok(lock) => lock,
    // A panic inside a destructor poisons the lock but leaves the heap intact.
    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    Err(TryLockError::WouldBlock) => {
      panic!("Deadlocked acquiring heap. Destructors must not call back into the heap.")
    }
  }
}

/// Runs `action` on the global heap.
fn with_heap<T>(action: impl FnOnce(&mut Heap) -> HeapResult<T>) -> HeapResult<T> {
  match acquire_heap().as_mut() {
    Some(heap) => action(heap),
    None => Err(HeapError::NotInitialized),
  }
}

// region Lifecycle

pub fn initialize(config: HeapConfig) -> HeapResult<()> {
  let mut heap = acquire_heap();
  if heap.is_some() {
    return Err(HeapError::AlreadyInitialized);
  }
  *heap = Some(Heap::new(config));
  Ok(())
}

/// Drops every root, reclaims every remaining object, and destroys the global heap.
pub fn teardown() -> HeapResult<CollectionReport> {
  // Take the heap out first, so the lock is not held while destructors run.
  let heap = acquire_heap().take().ok_or(HeapError::NotInitialized)?;
  Ok(heap.shutdown())
}

pub fn is_initialized() -> bool {
  acquire_heap().is_some()
}

// endregion Lifecycle

pub fn create(size: usize, destructor: Option<Destructor>) -> HeapResult<ObjectId> {
  with_heap(|heap| heap.create(size, destructor))
}

pub fn retain(id: ObjectId) -> HeapResult<()> {
  with_heap(|heap| heap.retain(id))
}

pub fn release(id: ObjectId) -> HeapResult<bool> {
  with_heap(|heap| heap.release(id))
}

pub fn register_root(key: &str, id: ObjectId) -> HeapResult<bool> {
  with_heap(|heap| heap.register_root(key, id))
}

pub fn unregister_root(key: &str) -> HeapResult<bool> {
  with_heap(|heap| Ok(heap.unregister_root(key)))
}

pub fn lookup_root(key: &str) -> HeapResult<Option<ObjectId>> {
  with_heap(|heap| Ok(heap.lookup_root(key)))
}

pub fn add_reference(owner: ObjectId, target: ObjectId) -> HeapResult<bool> {
  with_heap(|heap| heap.add_reference(owner, target))
}

pub fn remove_reference(owner: ObjectId, target: ObjectId) -> HeapResult<bool> {
  with_heap(|heap| heap.remove_reference(owner, target))
}

pub fn clear_references(owner: ObjectId) -> HeapResult<usize> {
  with_heap(|heap| heap.clear_references(owner))
}

/// A snapshot of the edges out of `owner`.
pub fn outgoing(owner: ObjectId) -> HeapResult<Vec<ObjectId>> {
  with_heap(|heap| Ok(heap.outgoing(owner)?.collect()))
}

pub fn reference_count(target: ObjectId) -> HeapResult<usize> {
  with_heap(|heap| heap.reference_count(target))
}

pub fn ref_count(id: ObjectId) -> HeapResult<usize> {
  with_heap(|heap| heap.ref_count(id))
}

pub fn size(id: ObjectId) -> HeapResult<usize> {
  with_heap(|heap| heap.size(id))
}

/// Runs `action` on the payload of `id`.
pub fn with_data<T>(id: ObjectId, action: impl FnOnce(&mut [u8]) -> T) -> HeapResult<T> {
  with_heap(|heap| Ok(action(heap.data_mut(id)?)))
}

pub fn collect() -> HeapResult<CollectionReport> {
  with_heap(|heap| Ok(heap.collect()))
}

pub fn total_memory() -> HeapResult<usize> {
  with_heap(|heap| Ok(heap.total_memory()))
}

pub fn available_memory() -> HeapResult<usize> {
  with_heap(|heap| Ok(heap.available_memory()))
}

pub fn used_memory() -> HeapResult<usize> {
  with_heap(|heap| Ok(heap.used_memory()))
}

pub fn object_count() -> HeapResult<usize> {
  with_heap(|heap| Ok(heap.object_count()))
}

pub fn root_count() -> HeapResult<usize> {
  with_heap(|heap| Ok(heap.root_count()))
}

pub fn statistics() -> HeapResult<HeapStatistics> {
  with_heap(|heap| Ok(heap.statistics()))
}

pub fn check_invariants() -> HeapResult<()> {
  with_heap(|heap| heap.check_invariants())
}

#[cfg(test)]
mod tests {
  use super::*;

  // The global heap is shared by every test in the binary, so its whole lifecycle lives in this one test.
  #[test]
  fn global_lifecycle() {
    assert!(!is_initialized());
    assert_eq!(create(8, None), Err(HeapError::NotInitialized));
    assert_eq!(teardown(), Err(HeapError::NotInitialized));

    initialize(HeapConfig::default().with_arena_capacity(1024)).unwrap();
    assert!(is_initialized());
    assert_eq!(initialize(HeapConfig::default()), Err(HeapError::AlreadyInitialized));
    assert_eq!(total_memory().unwrap(), 1024);

    let a = create(16, None).unwrap();
    let b = create(16, None).unwrap();
    assert!(!register_root("a", a).unwrap());
    release(a).unwrap();
    assert!(add_reference(a, b).unwrap());
    release(b).unwrap();
    assert_eq!(outgoing(a).unwrap(), vec![b]);
    assert_eq!(reference_count(b).unwrap(), 1);
    assert_eq!(lookup_root("a").unwrap(), Some(a));

    with_data(b, |bytes| bytes[0] = 7).unwrap();
    assert_eq!(with_data(b, |bytes| bytes[0]).unwrap(), 7);

    // An unrooted cycle
    let c = create(16, None).unwrap();
    let d = create(16, None).unwrap();
    add_reference(c, d).unwrap();
    add_reference(d, c).unwrap();
    release(c).unwrap();
    release(d).unwrap();
    assert_eq!(object_count().unwrap(), 4);

    let report = collect().unwrap();
    assert_eq!(report.marked, 2);
    assert_eq!(report.swept, 2);
    assert_eq!(used_memory().unwrap(), 32);
    check_invariants().unwrap();

    // Dropping the root releases `a`, which cascades to `b` before the final sweep runs.
    let report = teardown().unwrap();
    assert_eq!(report.swept, 0);
    assert!(!is_initialized());
  }
}
