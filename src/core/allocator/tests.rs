use crate::core::{
  allocator::*,
  error::HeapError
};

#[test]
fn test_allocate_rounds_to_alignment() {
  let mut arena = Arena::with_capacity(64);

  let region = arena.allocate(5).expect("allocation failed");
  assert_eq!(region.len(), 5);
  assert_eq!(region.reserved(), ALIGNMENT);
  assert_eq!(arena.used_bytes(), ALIGNMENT);
  assert_eq!(arena.available_bytes(), 64 - ALIGNMENT);

  let second = arena.allocate(9).expect("allocation failed");
  assert_eq!(second.offset() % ALIGNMENT, 0);
  assert_eq!(second.reserved(), 16);
  assert_eq!(arena.used_bytes(), 24);
}

#[test]
fn test_allocation_is_zero_filled() {
  let mut arena = Arena::with_capacity(32);

  let region = arena.allocate(16).unwrap();
  arena.bytes_mut(&region).fill(0xAB);
  arena.free(region);

  // The same bytes come back, scrubbed.
  let reused = arena.allocate(16).unwrap();
  assert_eq!(reused.offset(), region.offset());
  assert!(arena.bytes(&reused).iter().all(|&b| b == 0));
}

#[test]
fn test_zero_sized_allocation() {
  let mut arena = Arena::with_capacity(8);

  let region = arena.allocate(0).unwrap();
  assert!(region.is_empty());
  assert_eq!(arena.used_bytes(), 0);
  assert!(arena.bytes(&region).is_empty());
  arena.free(region);
  assert_eq!(arena.used_bytes(), 0);
}

#[test]
fn test_arena_exhaustion() {
  let mut arena = Arena::with_capacity(32);

  let _a = arena.allocate(16).unwrap();
  let _b = arena.allocate(16).unwrap();

  match arena.allocate(1) {
    Err(HeapError::OutOfMemory { requested, available }) => {
      assert_eq!(requested, 1);
      assert_eq!(available, 0);
    }
    other => panic!("expected OutOfMemory, got {:?}", other),
  }

  // A failed request leaves the accounting untouched.
  assert_eq!(arena.used_bytes(), 32);
}

#[test]
fn test_oversized_request_fails_without_overflow() {
  let mut arena = Arena::with_capacity(32);
  assert!(matches!(arena.allocate(usize::MAX), Err(HeapError::OutOfMemory { .. })));
  assert!(matches!(arena.allocate(33), Err(HeapError::OutOfMemory { .. })));
  assert_eq!(arena.used_bytes(), 0);
}

#[test]
fn test_free_coalesces_and_lowers_cursor() {
  let mut arena = Arena::with_capacity(64);

  let a = arena.allocate(8).unwrap();
  let b = arena.allocate(8).unwrap();
  let c = arena.allocate(8).unwrap();
  let d = arena.allocate(8).unwrap();

  arena.free(b);
  assert_eq!(arena.free_block_count(), 1);
  arena.free(a);
  // a and b merge into one block.
  assert_eq!(arena.free_block_count(), 1);

  arena.free(d);
  // d touches the cursor, so the cursor drops instead of growing the list.
  assert_eq!(arena.free_block_count(), 1);
  assert_eq!(arena.high_water_mark(), 24);

  arena.free(c);
  // Everything merged and the cursor is back at the start.
  assert_eq!(arena.free_block_count(), 0);
  assert_eq!(arena.high_water_mark(), 0);
  assert_eq!(arena.used_bytes(), 0);
}

#[test]
fn test_free_list_is_reused_first_fit() {
  let mut arena = Arena::with_capacity(48);

  let a = arena.allocate(16).unwrap();
  let _b = arena.allocate(16).unwrap();
  arena.free(a);

  let small = arena.allocate(8).unwrap();
  assert_eq!(small.offset(), a.offset());
  let rest = arena.allocate(8).unwrap();
  assert_eq!(rest.offset(), a.offset() + 8);
  assert_eq!(arena.free_block_count(), 0);
}

#[test]
fn test_fragmentation_can_refuse_large_request() {
  let mut arena = Arena::with_capacity(32);

  let a = arena.allocate(8).unwrap();
  let _b = arena.allocate(8).unwrap();
  let c = arena.allocate(8).unwrap();
  let _d = arena.allocate(8).unwrap();
  arena.free(a);
  arena.free(c);

  assert_eq!(arena.available_bytes(), 16);
  assert!(matches!(arena.allocate(16), Err(HeapError::OutOfMemory { .. })));
  assert!(arena.allocate(8).is_ok());
}
