/*!

Errors surfaced to the mutator. Misses that are part of normal operation (an absent root key, a duplicate or
missing edge) are reported as `Option`/`bool` instead and never appear here.

*/

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::core::object::ObjectId;

pub type HeapResult<T> = Result<T, HeapError>;

#[derive(Clone, Eq, PartialEq)]
pub enum HeapError {
  /// The arena cannot satisfy the request. Not retried.
  OutOfMemory {
    requested: usize,
    available: usize,
  },
  /// The handle names an object that has been reclaimed, or was never issued by this heap.
  InvalidHandle(ObjectId),
  /// The global heap is used before `initialize` or after `teardown`.
  NotInitialized,
  /// `initialize` is called while a global heap already exists.
  AlreadyInitialized,
  /// The object graph is inconsistent. Indicates a defect in the collector.
  InvariantViolation(String),
}

impl Display for HeapError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      HeapError::OutOfMemory { requested, available } => {
        write!(
          f,
          "out of memory: requested {} bytes but only {} bytes are available",
          requested,
          available
        )
      }

      HeapError::InvalidHandle(id) => {
        write!(f, "{} does not name a live object", id)
      }

      HeapError::NotInitialized => {
        write!(f, "the heap has not been initialized")
      }

      HeapError::AlreadyInitialized => {
        write!(f, "the heap is already initialized")
      }

      HeapError::InvariantViolation(message) => {
        write!(f, "heap invariant violated: {}", message)
      }

    } // end match on `HeapError`
  }
}

impl Debug for HeapError {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    Display::fmt(self, f)
  }
}

impl Error for HeapError {}
