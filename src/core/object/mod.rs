/*!

An `Object` is the header of one managed allocation: its reference count, collector flags, the arena region holding
its payload, the runtime-supplied destructor, and its two edge lists.

Identity is a generational `ObjectId` rather than an address, the mark bit lives in a `BitFlags` field next to
the finalization bit, and both edge lists are plain vectors of handles.

The outgoing list owns references: every entry accounts for one count on its target. The incoming list is
bookkeeping only and never influences when an object dies.

*/

mod object_id;

use std::fmt::{Debug, Formatter};

use enumflags2::{bitflags, BitFlags};

use crate::core::allocator::Region;

pub use object_id::ObjectId;

/// Runs once when an object is reclaimed, with the object's payload still readable and writable. It must not touch
/// the heap.
pub type Destructor = Box<dyn FnOnce(&mut [u8]) + Send>;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ObjectFlag {
  /// Reached from a root during the current mark phase
  Marked,
  /// Destructor has been invoked (or there was none)
  Finalized,
}

pub type ObjectFlags = BitFlags<ObjectFlag, u8>;

pub struct Object {
  pub(crate) ref_count : usize,
  pub(crate) flags     : ObjectFlags,
  pub(crate) region    : Region,
  pub(crate) destructor: Option<Destructor>,
  pub(crate) outgoing  : Vec<ObjectId>,
  pub(crate) incoming  : Vec<ObjectId>,
}

impl Object {
  /// A fresh header owning `region`, with the caller's initial reference.
  pub(crate) fn new(region: Region, destructor: Option<Destructor>) -> Self {
    Object {
      ref_count: 1,
      flags    : ObjectFlags::empty(),
      region,
      destructor,
      outgoing : Vec::new(),
      incoming : Vec::new(),
    }
  }

  // region Accessors

  #[inline(always)]
  pub fn ref_count(&self) -> usize {
    self.ref_count
  }

  /// Payload size in bytes, as requested at creation.
  #[inline(always)]
  pub fn size(&self) -> usize {
    self.region.len()
  }

  #[inline(always)]
  pub fn region(&self) -> &Region {
    &self.region
  }

  #[inline(always)]
  pub fn outgoing(&self) -> &[ObjectId] {
    &self.outgoing
  }

  #[inline(always)]
  pub fn incoming(&self) -> &[ObjectId] {
    &self.incoming
  }

  #[inline(always)]
  pub fn references(&self, target: ObjectId) -> bool {
    self.outgoing.contains(&target)
  }

  // endregion Accessors

  // region GC related methods

  #[inline(always)]
  pub fn is_marked(&self) -> bool {
    self.flags.contains(ObjectFlag::Marked)
  }

  #[inline(always)]
  pub(crate) fn mark(&mut self) {
    self.flags.insert(ObjectFlag::Marked);
  }

  #[inline(always)]
  pub(crate) fn unmark(&mut self) {
    self.flags.remove(ObjectFlag::Marked);
  }

  #[inline(always)]
  pub fn is_finalized(&self) -> bool {
    self.flags.contains(ObjectFlag::Finalized)
  }

  /// Takes the destructor out, so a second call finds nothing to run.
  pub(crate) fn take_destructor(&mut self) -> Option<Destructor> {
    assert!(!self.is_finalized(), "object finalized twice");
    self.flags.insert(ObjectFlag::Finalized);
    self.destructor.take()
  }

  pub(crate) fn remove_incoming(&mut self, owner: ObjectId) -> bool {
    match self.incoming.iter().position(|&id| id == owner) {
      Some(position) => {
        self.incoming.swap_remove(position);
        true
      }
      None => false,
    }
  }

  //endregion
}

impl Debug for Object {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Object")
     .field("ref_count", &self.ref_count)
     .field("size", &self.size())
     .field("marked", &self.is_marked())
     .field("has_destructor", &self.destructor.is_some())
     .field("outgoing", &self.outgoing)
     .field("incoming", &self.incoming)
     .finish()
  }
}
