/*!

Types/type aliases that abstract over the implementing backing type, plus crate-wide infrastructure that is not part
of the heap proper.

*/

pub mod log;

// Interned string. Root names are interned so that re-registering a name does not allocate.
pub use string_cache::DefaultAtom as IString;
