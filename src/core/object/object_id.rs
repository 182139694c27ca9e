use std::fmt::{Display, Formatter};

/// A stable handle to a managed object: the index of its slot in the `Registry` plus the slot's generation at the
/// time the object was created. When an object is reclaimed its slot's generation advances, so stale copies of the
/// handle stop resolving instead of aliasing whatever reuses the slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId {
  pub(crate) index     : u32,
  pub(crate) generation: u32,
}

impl ObjectId {
  #[inline(always)]
  pub(crate) fn new(index: u32, generation: u32) -> Self {
    ObjectId { index, generation }
  }

  #[inline(always)]
  pub fn index(&self) -> usize {
    self.index as usize
  }

  #[inline(always)]
  pub fn generation(&self) -> u32 {
    self.generation
  }
}

impl Display for ObjectId {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "obj#{}.{}", self.index, self.generation)
  }
}
