/*!

# Mark and Sweep

Reference counting alone leaks cycles: two objects referencing each other keep each other's count above zero long
after the runtime has dropped them. `Heap::collect` finds and frees them with a stop-the-world mark and sweep.

 1. **Clear.** Every object in the registry is unmarked.
 2. **Mark.** Starting from each root, an iterative depth first walk follows outgoing edges, marking as it goes.
    A marked object is never expanded twice, so cycles terminate and the walk is linear in objects plus edges.
 3. **Sweep.** The unmarked objects are gathered into a doomed set before any is destroyed, so destruction cannot
    change which objects are examined. Each doomed object has its destructor run and its storage returned. Its
    edges are dropped without cascading: a doomed target is handled by this same pass, and a surviving target just
    loses the back-pointer and the one reference the edge held, which cannot be its last since the survivor is
    reachable some other way.

The collector runs only when asked (`collect`), or from `create` when available space is below the configured
watermark. It never runs from inside `release`.

*/

use bit_set::BitSet;

use crate::{
  abstractions::log::{info, trace},
  core::{
    heap::{diagnostics::invariant_violation, Heap},
    object::ObjectId,
  }
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CollectorPhase {
  #[default]
  Idle,
  Marking,
  Sweeping,
}

/// What one collection did.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CollectionReport {
  /// Objects found reachable from the roots
  pub marked         : usize,
  /// Objects destroyed
  pub swept          : usize,
  pub bytes_reclaimed: usize,
}

impl Heap {
  /// Runs a full collection and destroys every object not reachable from a root.
  pub fn collect(&mut self) -> CollectionReport {
    if self.phase != CollectorPhase::Idle {
      invariant_violation(format!("collection started during {:?}", self.phase));
    }
    let used_before = self.arena.used_bytes();

    self.phase = CollectorPhase::Marking;
    self.clear_marks();
    let marked = self.mark_from_roots();

    self.phase = CollectorPhase::Sweeping;
    let (swept, bytes_reclaimed) = self.sweep();

    self.phase = CollectorPhase::Idle;

    self.statistics.collections     += 1;
    self.statistics.objects_swept   += swept;
    self.statistics.bytes_reclaimed += bytes_reclaimed;

    if self.config.show_gc_statistics {
      info!(
        1,
        "collection {}: {} live, {} swept, {} bytes reclaimed ({} -> {} bytes in use, {} available)",
        self.statistics.collections,
        marked,
        swept,
        bytes_reclaimed,
        used_before,
        self.arena.used_bytes(),
        self.arena.available_bytes()
      );
    }

    #[cfg(feature = "gc_debug")]
    {
      if let Err(error) = self.check_invariants() {
        self.dump_memory_variables();
        invariant_violation(error.to_string());
      }
    }

    CollectionReport { marked, swept, bytes_reclaimed }
  }

  fn clear_marks(&mut self) {
    for (_, object) in self.registry.for_each_mut() {
      object.unmark();
    }
  }

  /// Returns the number of objects marked.
  fn mark_from_roots(&mut self) -> usize {
    let mut stack: Vec<ObjectId> = self.roots.for_each().map(|(_, id)| id).collect();
    let mut marked = 0;

    while let Some(id) = stack.pop() {
      let object = match self.registry.get_mut(id) {
        Some(object) => object,
        None => invariant_violation(format!("{} is reachable from a root but is not live", id)),
      };

      if object.is_marked() {
        continue;
      }
      object.mark();
      marked += 1;

      stack.extend(object.outgoing.iter().copied());
    }

    marked
  }

  /// Returns the number of objects destroyed and the bytes they held.
  fn sweep(&mut self) -> (usize, usize) {
    let mut doomed_set = BitSet::with_capacity(self.registry.slot_count());
    let mut doomed     = Vec::new();

    for (id, object) in self.registry.for_each() {
      if !object.is_marked() {
        doomed_set.insert(id.index());
        doomed.push(id);
      }
    }

    // Nothing that survives may point into the doomed set; marking would have followed the edge.
    for &id in &doomed {
      if let Some(object) = self.registry.get(id) {
        if let Some(owner) = object.incoming.iter().find(|owner| !doomed_set.contains(owner.index())) {
          invariant_violation(format!("{} is unreachable but referenced by reachable {}", id, owner));
        }
      }
    }

    let mut bytes_reclaimed = 0;

    for &id in &doomed {
      let mut object = match self.registry.remove(id) {
        Some(object) => object,
        None => invariant_violation(format!("doomed {} vanished during sweep", id)),
      };

      if let Some(destructor) = object.take_destructor() {
        destructor(self.arena.bytes_mut(&object.region));
      }

      for &target in &object.outgoing {
        if doomed_set.contains(target.index()) {
          continue;
        }

        let survivor = match self.registry.get_mut(target) {
          Some(survivor) => survivor,
          None => invariant_violation(format!("edge {} -> {} leads to a dead object", id, target)),
        };
        if !survivor.remove_incoming(id) || survivor.ref_count < 2 {
          invariant_violation(format!(
            "survivor {} has inconsistent bookkeeping for the edge from {}",
            target,
            id
          ));
        }
        survivor.ref_count -= 1;
      }

      let reserved = object.region.reserved();
      self.arena.free(object.region);
      bytes_reclaimed += reserved;

      trace!(4, "swept {} ({} bytes)", id, reserved);
    }

    // Survivors go back to idle unmarked.
    self.clear_marks();

    (doomed.len(), bytes_reclaimed)
  }
}
