/*!

A bounded arena of payload bytes.

The arena is a single fixed-size block. Allocation bumps a cursor through it like a `Bucket` does; regions that come
back through `free` go on a free list ordered by offset, adjacent free blocks are coalesced, and a free block that
touches the cursor pulls the cursor back down. The free list is searched first-fit before bumping.

Every request is rounded up to `ALIGNMENT` bytes, and it is the rounded size that counts toward `used_bytes`, so
freeing a region restores exactly what allocating it took. Offsets are aligned; addresses are not, since payloads
are only ever handed out as byte slices.

*/

use crate::core::{
  error::{HeapError, HeapResult},
  Void
};

/// Offsets and reserved sizes are multiples of this.
pub const ALIGNMENT: usize = 8;

/// A span of arena bytes owned by exactly one object.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Region {
  offset  : usize,
  len     : usize, // bytes requested
  reserved: usize, // bytes accounted, `len` rounded up to `ALIGNMENT`
}

impl Region {
  /// The region of a zero-sized allocation. Consumes nothing.
  pub const EMPTY: Region = Region { offset: 0, len: 0, reserved: 0 };

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline(always)]
  pub fn offset(&self) -> usize {
    self.offset
  }

  #[inline(always)]
  pub fn reserved(&self) -> usize {
    self.reserved
  }

  #[inline(always)]
  fn end(&self) -> usize {
    self.offset + self.reserved
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct FreeBlock {
  offset: usize,
  len   : usize,
}

impl FreeBlock {
  #[inline(always)]
  fn end(&self) -> usize {
    self.offset + self.len
  }
}

pub struct Arena {
  data      : Box<[Void]>,
  next_free : usize,          // Bump cursor. Everything at or above it is unused.
  free_list : Vec<FreeBlock>, // Returned blocks below the cursor, sorted by offset, never adjacent.
  used_bytes: usize,
}

impl Arena {
  pub fn with_capacity(capacity: usize) -> Self {
    Arena {
      data      : vec![0; capacity].into_boxed_slice(),
      next_free : 0,
      free_list : Vec::new(),
      used_bytes: 0,
    }
  }

  #[inline(always)]
  pub fn capacity(&self) -> usize {
    self.data.len()
  }

  #[inline(always)]
  pub fn used_bytes(&self) -> usize {
    self.used_bytes
  }

  #[inline(always)]
  pub fn available_bytes(&self) -> usize {
    self.capacity() - self.used_bytes
  }

  /// Number of blocks on the free list. A measure of fragmentation.
  pub fn free_block_count(&self) -> usize {
    self.free_list.len()
  }

  /// Reserves a zero-filled region of at least `bytes_needed` bytes.
  ///
  /// Fails with `OutOfMemory` when no free block or the space above the cursor can hold the rounded request. Because
  /// the free list is not compacted, this can happen while `available_bytes()` is nominally large enough.
  pub fn allocate(&mut self, bytes_needed: usize) -> HeapResult<Region> {
    if bytes_needed == 0 {
      return Ok(Region::EMPTY);
    }

    let out_of_memory = HeapError::OutOfMemory {
      requested: bytes_needed,
      available: self.available_bytes(),
    };

    let reserved = match align_up(bytes_needed) {
      Some(reserved) if reserved <= self.available_bytes() => reserved,
      _ => return Err(out_of_memory),
    };

    let offset =
        match self.free_list.iter().position(|block| block.len >= reserved) {

          Some(index) => {
            let block  = &mut self.free_list[index];
            let offset = block.offset;

            block.offset += reserved;
            block.len    -= reserved;
            if block.len == 0 {
              self.free_list.remove(index);
            }

            offset
          }

          None if self.capacity() - self.next_free >= reserved => {
            let offset     = self.next_free;
            self.next_free += reserved;
            offset
          }

          None => return Err(out_of_memory),

        };

    let region = Region { offset, len: bytes_needed, reserved };
    self.data[offset..region.end()].fill(0);
    self.used_bytes += reserved;

    Ok(region)
  }

  /// Returns a region to the arena. Each region may be freed once.
  pub fn free(&mut self, region: Region) {
    if region.reserved == 0 {
      return;
    }

    debug_assert!(region.end() <= self.next_free, "freed region lies above the bump cursor");
    debug_assert!(
      self.free_list.iter().all(|block| block.end() <= region.offset || region.end() <= block.offset),
      "region at offset {} freed twice",
      region.offset
    );

    self.used_bytes -= region.reserved;

    let index = self.free_list.partition_point(|block| block.offset < region.offset);
    self.free_list.insert(index, FreeBlock { offset: region.offset, len: region.reserved });

    // Coalesce with the following block, then with the preceding one.
    if index + 1 < self.free_list.len() && self.free_list[index].end() == self.free_list[index + 1].offset {
      let next = self.free_list.remove(index + 1);
      self.free_list[index].len += next.len;
    }
    let mut index = index;
    if index > 0 && self.free_list[index - 1].end() == self.free_list[index].offset {
      let this = self.free_list.remove(index);
      self.free_list[index - 1].len += this.len;
      index -= 1;
    }

    // Only the last block can touch the cursor.
    if index + 1 == self.free_list.len() && self.free_list[index].end() == self.next_free {
      self.next_free = self.free_list[index].offset;
      self.free_list.pop();
    }
  }

  #[inline(always)]
  pub fn bytes(&self, region: &Region) -> &[Void] {
    &self.data[region.offset..region.offset + region.len]
  }

  #[inline(always)]
  pub fn bytes_mut(&mut self, region: &Region) -> &mut [Void] {
    &mut self.data[region.offset..region.offset + region.len]
  }

  /// The bump cursor, for diagnostics.
  #[cfg(any(test, feature = "gc_debug"))]
  #[inline(always)]
  pub(crate) fn high_water_mark(&self) -> usize {
    self.next_free
  }
}

#[inline(always)]
fn align_up(bytes: usize) -> Option<usize> {
  bytes.checked_add(ALIGNMENT - 1).map(|padded| padded & !(ALIGNMENT - 1))
}
