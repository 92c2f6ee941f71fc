//! Errors raised while loading a replay request.

use std::io;

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use thiserror::Error;

use crate::resource::ResourceId;

/// The five sections of a replay request, in wire order.
#[derive(StrumDisplay, IntoStaticStr, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Section {
  #[strum(serialize = "stack size")]
  StackSize,
  #[strum(serialize = "volatile memory size")]
  VolatileMemorySize,
  #[strum(serialize = "constant memory")]
  ConstantMemory,
  #[strum(serialize = "resources")]
  Resources,
  #[strum(serialize = "instruction list")]
  InstructionList,
}

/**
  Why a replay request could not be loaded. None of these are fatal: the caller decides whether
  to retry, report, or give up on the replay. No `Request` exists when one of these is returned.
*/
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read the replay from the connection")]
  Connection(#[from] io::Error),

  #[error("the memory manager cannot hold a replay of {requested} bytes")]
  OutOfMemory { requested: u32 },

  #[error("declared replay size {declared} exceeds the {available} bytes available")]
  DeclaredSizeExceedsBuffer { declared: u32, available: usize },

  #[error("replay truncated in the {section} section at offset {offset}")]
  Truncated { section: Section, offset: usize },

  #[error("resource {index} has an id that is not valid UTF-8")]
  InvalidResourceId { index: usize },

  #[error("replay used {consumed} of {declared} declared bytes")]
  TrailingBytes { consumed: usize, declared: u32 },

  #[error("resource {id} ({size} bytes) cannot be provided")]
  UnresolvedResource { id: ResourceId, size: u32 },
}
