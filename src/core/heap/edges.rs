/*!

Edges between objects. An edge `owner -> target` is recorded twice, in `owner.outgoing` and in `target.incoming`,
and holds one reference on `target`. The two lists are only ever changed together.

*/

use crate::core::{
  error::HeapResult,
  heap::{diagnostics::invariant_violation, Heap},
  object::ObjectId,
};

impl Heap {
  /// Records `owner -> target` and retains `target`. Returns `false`, changing nothing, if the edge already exists.
  /// `owner == target` is allowed.
  pub fn add_reference(&mut self, owner: ObjectId, target: ObjectId) -> HeapResult<bool> {
    self.object(target)?;

    let owner_object = self.object_mut(owner)?;
    if owner_object.references(target) {
      return Ok(false);
    }
    owner_object.outgoing.push(target);

    let target_object = self.object_mut(target)?;
    target_object.incoming.push(owner);
    target_object.ref_count += 1;

    Ok(true)
  }

  /// Removes `owner -> target` and releases `target`, which may reclaim it. Returns `false` if there was no such
  /// edge.
  pub fn remove_reference(&mut self, owner: ObjectId, target: ObjectId) -> HeapResult<bool> {
    let owner_object = self.object_mut(owner)?;
    let position = match owner_object.outgoing.iter().position(|&id| id == target) {
      Some(position) => position,
      None => return Ok(false),
    };
    owner_object.outgoing.remove(position);

    self.unlink_back_pointer(owner, target);
    self.release_unchecked(target);

    Ok(true)
  }

  /// Removes every edge out of `owner`, releasing each target. Returns how many edges were removed.
  pub fn clear_references(&mut self, owner: ObjectId) -> HeapResult<usize> {
    let targets = std::mem::take(&mut self.object_mut(owner)?.outgoing);

    // Unlink everything before releasing anything: a self-edge may be what keeps `owner` alive.
    for &target in &targets {
      self.unlink_back_pointer(owner, target);
    }
    for &target in &targets {
      self.release_unchecked(target);
    }

    Ok(targets.len())
  }

  /// The objects `owner` references, in the order the edges were added.
  pub fn outgoing(&self, owner: ObjectId) -> HeapResult<impl Iterator<Item = ObjectId> + '_> {
    Ok(self.object(owner)?.outgoing.iter().copied())
  }

  /// The objects that reference `target`.
  pub fn incoming(&self, target: ObjectId) -> HeapResult<impl Iterator<Item = ObjectId> + '_> {
    Ok(self.object(target)?.incoming.iter().copied())
  }

  /// The number of edges into `target`. Unlike `ref_count`, this does not count root or mutator references.
  pub fn reference_count(&self, target: ObjectId) -> HeapResult<usize> {
    Ok(self.object(target)?.incoming.len())
  }

  fn unlink_back_pointer(&mut self, owner: ObjectId, target: ObjectId) {
    let unlinked = self.registry
                       .get_mut(target)
                       .map_or(false, |target_object| target_object.remove_incoming(owner));
    if !unlinked {
      invariant_violation(format!("edge {} -> {} has no matching back-pointer", owner, target));
    }
  }
}
