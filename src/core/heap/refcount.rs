/*!

The reference counting fast path.

An object dies the moment its count reaches zero. Dying releases the references it held through its outgoing
edges, which can kill further objects; the cascade is driven by an explicit work list, so a long chain of objects
costs heap memory rather than stack depth.

*/

use crate::{
  abstractions::log::trace,
  core::{
    error::HeapResult,
    heap::{diagnostics::invariant_violation, Heap},
    object::ObjectId,
  }
};

impl Heap {
  pub fn retain(&mut self, id: ObjectId) -> HeapResult<()> {
    self.object_mut(id)?.ref_count += 1;
    Ok(())
  }

  /// Drops one reference to `id`. Returns whether `id` was reclaimed as a result.
  pub fn release(&mut self, id: ObjectId) -> HeapResult<bool> {
    self.object(id)?;
    Ok(self.release_unchecked(id))
  }

  /// `release` for handles the heap itself holds (edges, roots), which are live by construction.
  pub(crate) fn release_unchecked(&mut self, id: ObjectId) -> bool {
    let mut pending     = vec![id];
    let mut reclaimed   = false;

    while let Some(current) = pending.pop() {
      let object = match self.registry.get_mut(current) {
        Some(object) => object,
        None => invariant_violation(format!("release of {} which is not live", current)),
      };

      if object.ref_count == 0 {
        invariant_violation(format!("release of {} whose reference count is already zero", current));
      }
      object.ref_count -= 1;
      if object.ref_count > 0 {
        continue;
      }

      if current == id {
        reclaimed = true;
      }
      self.reclaim(current, &mut pending);
    }

    reclaimed
  }

  /// Destroys an object whose count just reached zero: destructor, then edges, then storage. Each outgoing target
  /// is pushed onto `pending` to have the edge's reference released.
  fn reclaim(&mut self, id: ObjectId, pending: &mut Vec<ObjectId>) {
    let mut object = match self.registry.remove(id) {
      Some(object) => object,
      None => invariant_violation(format!("reclaim of {} which is not live", id)),
    };

    if !object.incoming.is_empty() {
      invariant_violation(format!(
        "{} reached a zero reference count while still referenced by {:?}",
        id,
        object.incoming
      ));
    }

    if let Some(destructor) = object.take_destructor() {
      destructor(self.arena.bytes_mut(&object.region));
    }

    for &target in &object.outgoing {
      let unlinked = self.registry
                         .get_mut(target)
                         .map_or(false, |target_object| target_object.remove_incoming(id));
      if !unlinked {
        invariant_violation(format!("edge {} -> {} has no matching back-pointer", id, target));
      }
      pending.push(target);
    }

    let reserved = object.region.reserved();
    self.arena.free(object.region);
    self.statistics.objects_released += 1;
    self.statistics.bytes_reclaimed  += reserved;

    trace!(4, "released {} ({} bytes)", id, reserved);
  }
}
