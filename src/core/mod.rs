/*!

The heap proper. The pieces, leaves first:

|                | Role                                                                   |
|:---------------|:-----------------------------------------------------------------------|
| `allocator`    | Bounded byte arena that object payloads live in                        |
| `object`       | Object headers: reference count, flags, payload region, edges          |
| `registry`     | The slab of every live object, and the name to object root table       |
| `heap`         | Reference counting, edges, and mark-and-sweep tying the above together |

*/

pub mod allocator;
pub mod config;
pub mod error;
pub mod heap;
pub mod object;
pub mod registry;

/// A `*mut Void` is a pointer to a `u8`
pub type Void = u8;
