/*!

32-bit FNV-1a. The root table's bucket choice depends on it, and anything persisting a table layout relies on these
exact constants, so this must not be swapped for `std`'s randomized hasher.

*/

pub const FNV_OFFSET_BASIS: u32 = 2166136261;
pub const FNV_PRIME        : u32 = 16777619;

/// FNV-1a over the bytes of `key`. Bytes are taken as unsigned.
#[inline]
pub fn geece_hash(key: &str) -> u32 {
  fnv1a(key.as_bytes())
}

#[inline]
pub fn fnv1a(bytes: &[u8]) -> u32 {
  bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
    (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
  })
}
