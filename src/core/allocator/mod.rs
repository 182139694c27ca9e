/*!
The allocator beneath the object store. Object headers (refcount, flags, edges) live in the `Registry`; the payload
bytes the runtime asks for live here, in a single bounded `Arena`.

The arena never grows. Running out is reported to the caller as `HeapError::OutOfMemory`, and the heap may be
configured to run a collection first when available space drops below a low watermark.
*/

mod arena;

#[cfg(test)]
mod tests;

pub use arena::{Arena, Region, ALIGNMENT};
