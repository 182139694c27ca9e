/*!

Tunable heap parameters. A `HeapConfig` is handed to `Heap::new` (or `api::initialize`) once; nothing is read
lazily afterward.

*/

/// Arena size used when none is configured: 1 MiB.
pub const DEFAULT_ARENA_CAPACITY: usize = 1024 * 1024;
/// Bucket count of a fresh root table.
pub const DEFAULT_ROOT_CAPACITY : usize = 16;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HeapConfig {
  /// Bytes of payload storage the arena may hand out.
  pub arena_capacity       : usize,
  /// Initial bucket count of the root table.
  pub initial_root_capacity: usize,
  /// If set, `create` runs a collection first whenever fewer than this many bytes are available.
  pub low_watermark        : Option<usize>,
  /// Log a summary line after every collection.
  pub show_gc_statistics   : bool,
}

impl Default for HeapConfig {
  fn default() -> Self {
    HeapConfig {
      arena_capacity       : DEFAULT_ARENA_CAPACITY,
      initial_root_capacity: DEFAULT_ROOT_CAPACITY,
      low_watermark        : None,
      show_gc_statistics   : true,
    }
  }
}

impl HeapConfig {
  pub fn with_arena_capacity(mut self, bytes: usize) -> Self {
    self.arena_capacity = bytes;
    self
  }

  pub fn with_initial_root_capacity(mut self, buckets: usize) -> Self {
    self.initial_root_capacity = buckets;
    self
  }

  pub fn with_low_watermark(mut self, bytes: usize) -> Self {
    self.low_watermark = Some(bytes);
    self
  }

  pub fn with_gc_statistics(mut self, show: bool) -> Self {
    self.show_gc_statistics = show;
    self
  }
}
