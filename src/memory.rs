//! Storage for the replay data.
//!
//! The buffer a request is parsed from is owned by the memory manager, and the request borrows
//! it. While a `Request` is alive the memory manager is borrowed too, so the replay data cannot
//! be resized or reused underneath it.

use tracing::warn;

/// Supplies the storage the replay data is read into.
pub trait MemoryManager {
  /// Sizes the replay data region to `size` bytes and returns it, or `None` if a region of
  /// that size cannot be provided.
  fn replay_data(&mut self, size: u32) -> Option<&mut [u8]>;
}

/// A memory manager backed by a single growable buffer that never exceeds `capacity` bytes.
#[derive(Debug)]
pub struct ReplayMemory {
  capacity : usize,
  data     : Vec<u8>,
}

impl ReplayMemory {
  pub fn new(capacity: usize) -> ReplayMemory {
    ReplayMemory {
      capacity,
      data: vec![],
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl MemoryManager for ReplayMemory {
  fn replay_data(&mut self, size: u32) -> Option<&mut [u8]> {
    let size = size as usize;
    if size > self.capacity {
      warn!(size, capacity = self.capacity, "replay data does not fit in memory");
      return None;
    }
    // Old replay data must not leak into the new request.
    self.data.clear();
    self.data.resize(size, 0);
    Some(&mut self.data[..])
  }
}
