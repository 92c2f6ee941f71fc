//! Resources are large blobs, such as texture or buffer contents, that a replay refers to by id
//! instead of carrying them inline. Fetching and caching their bytes is the resource provider's
//! business; a request only records which resources it needs and how big they are.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::wire::wire_length;

/// Resource ids are interned. Clones are cheap.
pub type ResourceId = DefaultAtom;

/**
  A resource named by a replay request. Two resources are the same if and only if both their
  id and their size are the same.
*/
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Resource {
  pub id   : ResourceId,
  /// Size in bytes.
  pub size : u32,
}

impl Resource {
  pub fn new(id: &str, size: u32) -> Resource {
    Resource{ id: DefaultAtom::from(id), size }
  }
}

impl Display for Resource {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({} bytes)", self.id, self.size)
  }
}

/**
  Something that can supply resource bytes to the interpreter on demand.

  The loader only asks whether each resource of a request can be provided; it never asks for
  the bytes themselves. A provider that needs to contact the server to answer is expected to
  bound that wait itself and answer `false` on timeout.
*/
pub trait ResourceProvider {
  /// Returns true if `resource` can be provided with exactly `resource.size` bytes.
  fn confirm(&self, resource: &Resource) -> bool;
}

/// A resource provider that holds every resource in memory. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
  resources: HashMap<ResourceId, Vec<u8>>
}

impl InMemoryResourceProvider {
  pub fn new() -> InMemoryResourceProvider {
    InMemoryResourceProvider::default()
  }

  /// Stores `bytes` under `id`, returning the resource that now refers to them. A previous
  /// resource with the same id is replaced. Panics if `bytes` is longer than a `u32` can count.
  pub fn insert(&mut self, id: &str, bytes: Vec<u8>) -> Resource {
    let resource = Resource::new(id, wire_length(bytes.len(), "Resource"));
    self.resources.insert(resource.id.clone(), bytes);
    resource
  }

  /// The bytes of `resource`, if present with the expected size.
  pub fn get(&self, resource: &Resource) -> Option<&[u8]> {
    self.resources
        .get(&resource.id)
        .filter(|bytes| bytes.len() == resource.size as usize)
        .map(Vec::as_slice)
  }

  pub fn len(&self) -> usize {
    self.resources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty()
  }
}

impl ResourceProvider for InMemoryResourceProvider {
  fn confirm(&self, resource: &Resource) -> bool {
    self.get(resource).is_some()
  }
}
