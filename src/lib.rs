/*!

A heap manager for language runtimes. Objects are counted references into a bounded arena; counts reclaim most
garbage the moment it appears, and a stop-the-world mark-and-sweep from a table of named roots reclaims the cycles
counting cannot.

```
use geece::{Heap, HeapConfig};

let mut heap = Heap::new(HeapConfig::default());
let a = heap.create(32, None).unwrap();
let b = heap.create(32, None).unwrap();

// A cycle. Dropping our references leaves both counts at one.
heap.add_reference(a, b).unwrap();
heap.add_reference(b, a).unwrap();
heap.release(a).unwrap();
heap.release(b).unwrap();

assert_eq!(heap.collect().swept, 2);
assert_eq!(heap.used_memory(), 0);
```

*/

pub mod api;
pub mod abstractions;
mod core;

// We re-export abstractions that are meant to be used publicly.
pub use abstractions::{
  log,
  IString
};

pub use crate::core::{
  allocator::{Arena, Region, ALIGNMENT},
  config::{HeapConfig, DEFAULT_ARENA_CAPACITY, DEFAULT_ROOT_CAPACITY},
  error::{HeapError, HeapResult},
  heap::{CollectionReport, CollectorPhase, Heap, HeapStatistics},
  object::{Destructor, Object, ObjectFlag, ObjectFlags, ObjectId},
  registry::{geece_hash, Registry, RootIter, RootTable, MAX_LOAD_FACTOR},
};

#[doc(hidden)]
pub use tracing as __tracing;
