/*!

The registry is the authoritative index of every live object. It has two parts with two different key spaces:

 1. The `Registry` proper, a generational slab keyed by `ObjectId`. Every object is entered here on creation and
    removed on reclamation, whether it is rooted or not. Sweep enumerates this.
 2. The `RootTable`, a name → `ObjectId` hash table holding the objects the runtime references from outside the
    heap. Mark starts here.

Keeping the key spaces apart means an object's identity never depends on how it is named, and a named root is just
one more reference to an object the slab already knows about.

*/

mod hash;
mod root_table;


use crate::core::object::{Object, ObjectId};

pub use hash::geece_hash;
pub use root_table::{RootTable, Iter as RootIter, MAX_LOAD_FACTOR};

struct Slot {
  generation: u32,
  object    : Option<Object>,
}

/// Slots of reclaimed objects are reused, most recently freed first. A reused slot carries a new generation, and a
/// slot that has used up every generation is never reused.
#[derive(Default)]
pub struct Registry {
  slots     : Vec<Slot>,
  free_slots: Vec<u32>,
  len       : usize,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Number of slots ever created. Slot indices are below this.
  #[inline(always)]
  pub fn slot_count(&self) -> usize {
    self.slots.len()
  }

  /// Enters `object` and returns its new handle.
  pub fn insert(&mut self, object: Object) -> ObjectId {
    self.len += 1;

    match self.free_slots.pop() {

      Some(index) => {
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.object.is_none(), "free slot {} is occupied", index);
        slot.object = Some(object);
        ObjectId::new(index, slot.generation)
      }

      None => {
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, object: Some(object) });
        ObjectId::new(index, 0)
      }

    }
  }

  /// Takes the object out of its slot and retires the handle.
  pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
    let slot = self.slots.get_mut(id.index())?;
    if slot.generation != id.generation {
      return None;
    }

    let object = slot.object.take()?;
    self.len -= 1;

    // A slot whose generation is exhausted is retired for good, so no handle can ever alias.
    if slot.generation < u32::MAX {
      slot.generation += 1;
      self.free_slots.push(id.index);
    }

    Some(object)
  }

  #[inline]
  pub fn get(&self, id: ObjectId) -> Option<&Object> {
    self.slots
        .get(id.index())
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.object.as_ref())
  }

  #[inline]
  pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
    self.slots
        .get_mut(id.index())
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.object.as_mut())
  }

  #[inline(always)]
  pub fn contains(&self, id: ObjectId) -> bool {
    self.get(id).is_some()
  }

  /// Every live object with its handle, in slot order.
  ///
  /// The iterator borrows the registry, so no object can be created or reclaimed while it is alive.
  pub fn for_each(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
    self.slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
          slot.object
              .as_ref()
              .map(|object| (ObjectId::new(index as u32, slot.generation), object))
        })
  }

  pub fn for_each_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut Object)> + '_ {
    self.slots
        .iter_mut()
        .enumerate()
        .filter_map(|(index, slot)| {
          let generation = slot.generation;
          slot.object
              .as_mut()
              .map(|object| (ObjectId::new(index as u32, generation), object))
        })
  }

  /// An owned snapshot of every live handle.
  pub fn handles(&self) -> Vec<ObjectId> {
    self.for_each().map(|(id, _)| id).collect()
  }
}
