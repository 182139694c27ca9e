/*!

Consistency checks and state dumps. With the `gc_debug` feature, `collect` runs `check_invariants` after every
collection and panics on the first violation.

*/

use std::collections::HashMap;

use crate::{
  abstractions::log::critical,
  core::{
    error::{HeapError, HeapResult},
    heap::{CollectorPhase, Heap},
    object::ObjectId,
  }
};

/// Reports a broken heap invariant and panics. The heap is not safe to keep using after one.
pub(crate) fn invariant_violation(message: String) -> ! {
  critical!(0, "heap invariant violated: {}", message);
  panic!("heap invariant violated: {}", message);
}

fn violation(message: String) -> HeapResult<()> {
  Err(HeapError::InvariantViolation(message))
}

impl Heap {
  /// Verifies the whole object graph:
  ///
  ///  - every root names a live object;
  ///  - every live object has a positive count and has not been finalized, and none is marked outside a collection;
  ///  - outgoing lists have no duplicates, and each edge appears exactly once in the target's incoming list, and the
  ///    other way around;
  ///  - each count covers at least the object's incoming edges plus the roots naming it;
  ///  - the arena's used bytes equal the bytes reserved by live objects.
  pub fn check_invariants(&self) -> HeapResult<()> {
    let mut root_references: HashMap<ObjectId, usize> = HashMap::new();

    for (key, id) in self.roots.for_each() {
      if !self.registry.contains(id) {
        return violation(format!("root \"{}\" names {} which is not live", key, id));
      }
      *root_references.entry(id).or_default() += 1;
    }

    let mut reserved_bytes = 0;

    for (id, object) in self.registry.for_each() {
      reserved_bytes += object.region.reserved();

      if object.ref_count == 0 {
        return violation(format!("{} is live with a zero reference count", id));
      }
      if object.is_finalized() {
        return violation(format!("{} has been finalized but is still live", id));
      }
      if self.phase == CollectorPhase::Idle && object.is_marked() {
        return violation(format!("{} is marked outside of a collection", id));
      }

      for (position, &target) in object.outgoing.iter().enumerate() {
        if object.outgoing[..position].contains(&target) {
          return violation(format!("edge {} -> {} is recorded twice", id, target));
        }
        let target_object = match self.registry.get(target) {
          Some(target_object) => target_object,
          None => return violation(format!("edge {} -> {} leads to a dead object", id, target)),
        };
        let back_pointers = target_object.incoming.iter().filter(|&&owner| owner == id).count();
        if back_pointers != 1 {
          return violation(format!("edge {} -> {} has {} back-pointers", id, target, back_pointers));
        }
      }

      for &owner in &object.incoming {
        match self.registry.get(owner) {
          Some(owner_object) if owner_object.references(id) => {}
          Some(_) => return violation(format!("{} lists {} as a referrer, but there is no such edge", id, owner)),
          None    => return violation(format!("{} lists dead {} as a referrer", id, owner)),
        }
      }

      let accounted = object.incoming.len() + root_references.get(&id).copied().unwrap_or(0);
      if object.ref_count < accounted {
        return violation(format!(
          "{} has reference count {} but {} edges and roots refer to it",
          id,
          object.ref_count,
          accounted
        ));
      }
    }

    if reserved_bytes != self.arena.used_bytes() {
      return violation(format!(
        "live objects reserve {} bytes but the arena reports {} in use",
        reserved_bytes,
        self.arena.used_bytes()
      ));
    }

    Ok(())
  }

  /// Prints the state of the heap.
  #[cfg(feature = "gc_debug")]
  pub fn dump_memory_variables(&self) {
    let rows: [(&str, String); 14] = [
      ("phase",                format!("{:?}", self.phase)),
      ("object_count",         self.registry.len().to_string()),
      ("slot_count",           self.registry.slot_count().to_string()),
      ("root_count",           self.roots.len().to_string()),
      ("root_bucket_count",    self.roots.bucket_count().to_string()),
      ("arena_capacity",       self.arena.capacity().to_string()),
      ("arena_used_bytes",     self.arena.used_bytes().to_string()),
      ("arena_available_bytes", self.arena.available_bytes().to_string()),
      ("arena_high_water_mark", self.arena.high_water_mark().to_string()),
      ("arena_free_blocks",    self.arena.free_block_count().to_string()),
      ("collections",          self.statistics.collections.to_string()),
      ("objects_released",     self.statistics.objects_released.to_string()),
      ("objects_swept",        self.statistics.objects_swept.to_string()),
      ("bytes_reclaimed",      self.statistics.bytes_reclaimed.to_string()),
    ];

    eprintln!("╭─────────────────────────────────────────────╮");
    eprintln!("│{:<32} {:>12}│", "Variable", "Value");
    eprintln!("├─────────────────────────────────────────────┤");
    for (name, value) in rows.iter() {
      eprintln!("│{:<32} {:>12}│", name, value);
    }
    eprintln!("╰─────────────────────────────────────────────╯");
  }
}
