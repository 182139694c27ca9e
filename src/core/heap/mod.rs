/*!

# Heap

The `Heap` owns the three pieces of managed memory and keeps them consistent:

 - the `Arena` holding object payloads,
 - the `Registry` of object headers, keyed by `ObjectId`,
 - the `RootTable` naming the objects the runtime holds from outside.

Memory is reclaimed two ways. The fast path is reference counting: `release` that takes an object's count to zero
destroys it on the spot and cascades through everything it referenced (`refcount.rs`). Reference counting cannot
free a cycle, so `collect` runs a full mark-and-sweep over the registry (`collector.rs`). Edges between objects are
managed in `edges.rs`, and consistency checks and state dumps live in `diagnostics.rs`.

## What keeps an object alive

Across a collection, only reachability from the root table counts. An object the mutator created and still holds
but never rooted (or linked from a rooted object) is garbage to `collect`, whatever its reference count. Its handle
goes stale, and later use of it fails with `InvalidHandle`.

## Re-entrancy

Every mutating method takes `&mut self`, and destructors receive only their own payload bytes, so a destructor has
no way to reach the heap that is running it.

*/

mod collector;
mod diagnostics;
mod edges;
mod refcount;

#[cfg(test)]
mod tests;

use crate::{
  abstractions::{
    log::{info, warning, debug},
    IString
  },
  core::{
    allocator::Arena,
    config::HeapConfig,
    error::{HeapError, HeapResult},
    object::{Destructor, Object, ObjectId},
    registry::{Registry, RootIter, RootTable},
  }
};

pub use collector::{CollectionReport, CollectorPhase};

/// Running totals since the heap was created.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HeapStatistics {
  pub objects_created : usize,
  /// Reclaimed because their reference count reached zero
  pub objects_released: usize,
  /// Reclaimed by a sweep
  pub objects_swept   : usize,
  pub bytes_reclaimed : usize,
  pub collections     : usize,
}

pub struct Heap {
  config    : HeapConfig,
  arena     : Arena,
  registry  : Registry,
  roots     : RootTable,
  phase     : CollectorPhase,
  statistics: HeapStatistics,
}

impl Heap {
  pub fn new(config: HeapConfig) -> Self {
    info!(
      2,
      "heap initialized: {} byte arena, {} root buckets",
      config.arena_capacity,
      config.initial_root_capacity
    );

    Heap {
      arena     : Arena::with_capacity(config.arena_capacity),
      registry  : Registry::new(),
      roots     : RootTable::with_capacity(config.initial_root_capacity),
      phase     : CollectorPhase::Idle,
      statistics: HeapStatistics::default(),
      config,
    }
  }

  // region Allocation

  /// Allocates a zeroed payload of `size` bytes and returns a handle owning the caller's single reference.
  ///
  /// The object is not rooted. If a low watermark is configured and available space is already below it, a
  /// collection runs first.
  pub fn create(&mut self, size: usize, destructor: Option<Destructor>) -> HeapResult<ObjectId> {
    if let Some(watermark) = self.config.low_watermark {
      if self.arena.available_bytes() < watermark {
        debug!(
          3,
          "{} bytes available is below the {} byte watermark; collecting",
          self.arena.available_bytes(),
          watermark
        );
        self.collect();
      }
    }

    let region = match self.arena.allocate(size) {
      Ok(region) => region,
      Err(error) => {
        warning!(0, "allocation of {} bytes failed: {}", size, error);
        return Err(error);
      }
    };

    self.statistics.objects_created += 1;
    Ok(self.registry.insert(Object::new(region, destructor)))
  }

  /// `create` with a destructor closure.
  pub fn create_with_destructor<F>(&mut self, size: usize, destructor: F) -> HeapResult<ObjectId>
    where F: FnOnce(&mut [u8]) + Send + 'static
  {
    self.create(size, Some(Box::new(destructor)))
  }

  // endregion Allocation

  // region Accessors

  /// The header of a live object.
  pub fn object(&self, id: ObjectId) -> HeapResult<&Object> {
    self.registry.get(id).ok_or(HeapError::InvalidHandle(id))
  }

  fn object_mut(&mut self, id: ObjectId) -> HeapResult<&mut Object> {
    self.registry.get_mut(id).ok_or(HeapError::InvalidHandle(id))
  }

  #[inline(always)]
  pub fn is_live(&self, id: ObjectId) -> bool {
    self.registry.contains(id)
  }

  pub fn size(&self, id: ObjectId) -> HeapResult<usize> {
    Ok(self.object(id)?.size())
  }

  pub fn ref_count(&self, id: ObjectId) -> HeapResult<usize> {
    Ok(self.object(id)?.ref_count())
  }

  pub fn data(&self, id: ObjectId) -> HeapResult<&[u8]> {
    let region = *self.object(id)?.region();
    Ok(self.arena.bytes(&region))
  }

  pub fn data_mut(&mut self, id: ObjectId) -> HeapResult<&mut [u8]> {
    let region = *self.object(id)?.region();
    Ok(self.arena.bytes_mut(&region))
  }

  #[inline(always)]
  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  #[inline(always)]
  pub fn phase(&self) -> CollectorPhase {
    self.phase
  }

  #[inline(always)]
  pub fn statistics(&self) -> HeapStatistics {
    self.statistics
  }

  #[inline(always)]
  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  #[inline(always)]
  pub fn object_count(&self) -> usize {
    self.registry.len()
  }

  /// Arena capacity in bytes.
  #[inline(always)]
  pub fn total_memory(&self) -> usize {
    self.arena.capacity()
  }

  #[inline(always)]
  pub fn available_memory(&self) -> usize {
    self.arena.available_bytes()
  }

  #[inline(always)]
  pub fn used_memory(&self) -> usize {
    self.arena.used_bytes()
  }

  // endregion Accessors

  // region Roots

  /// Roots `id` under `key`, taking a reference on it. A previous occupant of `key` loses its root reference, which
  /// may reclaim it. Returns whether `key` was already in use.
  pub fn register_root(&mut self, key: &str, id: ObjectId) -> HeapResult<bool> {
    // Retain first, so re-registering the same object under the same key cannot free it in between.
    self.retain(id)?;

    match self.roots.insert(IString::from(key), id) {
      Some(previous) => {
        self.release_unchecked(previous);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Drops the root named `key` and its reference. Returns `false` if there was no such root.
  pub fn unregister_root(&mut self, key: &str) -> bool {
    match self.roots.remove(key) {
      Some(id) => {
        self.release_unchecked(id);
        true
      }
      None => false,
    }
  }

  #[inline(always)]
  pub fn lookup_root(&self, key: &str) -> Option<ObjectId> {
    self.roots.lookup(key)
  }

  #[inline(always)]
  pub fn root_count(&self) -> usize {
    self.roots.len()
  }

  /// Every `(name, object)` root.
  pub fn roots(&self) -> RootIter<'_> {
    self.roots.for_each()
  }

  #[inline(always)]
  pub fn root_table(&self) -> &RootTable {
    &self.roots
  }

  /// Drops every root and the references they held.
  pub fn clear_roots(&mut self) {
    for id in self.roots.clear() {
      self.release_unchecked(id);
    }
  }

  // endregion Roots

  // region Teardown

  /// Tears the heap down: drops every root, then sweeps everything that is left, so each remaining destructor
  /// runs exactly once. Dropping a `Heap` does the same.
  pub fn shutdown(mut self) -> CollectionReport {
    self.tear_down()
  }

  fn tear_down(&mut self) -> CollectionReport {
    self.clear_roots();
    let report = self.collect();

    info!(
      2,
      "heap torn down: {} objects created, {} released, {} swept",
      self.statistics.objects_created,
      self.statistics.objects_released,
      self.statistics.objects_swept
    );

    report
  }

  // endregion Teardown
}

impl Drop for Heap {
  fn drop(&mut self) {
    // Running destructors while already unwinding risks a double panic.
    if std::thread::panicking() {
      return;
    }
    if !self.registry.is_empty() || !self.roots.is_empty() {
      self.tear_down();
    }
  }
}
