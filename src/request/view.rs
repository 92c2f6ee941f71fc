//! Read-only views into the replay data. Neither view owns or copies its bytes; both borrow the
//! buffer the request was parsed from.

use std::iter::Map;
use std::slice::ChunksExact;

use crate::bytecode::{decode_instruction, Instruction, Word};
use crate::wire::WORD_SIZE;

/// The constant memory of a replay: read-only data the instructions load from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConstantMemory<'a> {
  bytes: &'a [u8]
}

impl<'a> ConstantMemory<'a> {
  pub(crate) fn new(bytes: &'a [u8]) -> ConstantMemory<'a> {
    ConstantMemory{ bytes }
  }

  pub fn as_bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// The base address of the constant memory.
  pub fn as_ptr(&self) -> *const u8 {
    self.bytes.as_ptr()
  }

  /// Size in bytes.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

pub type Words<'a> = Map<ChunksExact<'a, u8>, fn(&'a [u8]) -> Word>;

fn word_at(bytes: &[u8]) -> Word {
  Word::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/**
  The instruction list of a replay, as little-endian words stored in place in the replay data.

  The words are not guaranteed to be aligned within the replay data, so they are assembled from
  bytes on access instead of being reinterpreted as a `&[u32]`.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InstructionList<'a> {
  bytes: &'a [u8]
}

impl<'a> InstructionList<'a> {
  /// `bytes` must be a whole number of words long.
  pub(crate) fn new(bytes: &'a [u8]) -> InstructionList<'a> {
    debug_assert_eq!(bytes.len() % WORD_SIZE, 0);
    InstructionList{ bytes }
  }

  /// The base address of the instruction list.
  pub fn as_ptr(&self) -> *const u8 {
    self.bytes.as_ptr()
  }

  /// The number of instructions.
  pub fn len(&self) -> usize {
    self.bytes.len() / WORD_SIZE
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<Word> {
    let start = index.checked_mul(WORD_SIZE)?;
    let end = start.checked_add(WORD_SIZE)?;
    self.bytes.get(start..end).map(word_at)
  }

  pub fn iter(&self) -> Words<'a> {
    self.bytes.chunks_exact(WORD_SIZE).map(word_at as fn(&'a [u8]) -> Word)
  }

  /// Decodes every instruction. Words with an unknown opcode decode to `None`.
  pub fn decoded(&self) -> impl Iterator<Item = Option<Instruction>> + 'a {
    self.iter().map(decode_instruction)
  }

  pub fn to_vec(&self) -> Vec<Word> {
    self.iter().collect()
  }
}

impl<'a> IntoIterator for InstructionList<'a> {
  type Item     = Word;
  type IntoIter = Words<'a>;

  fn into_iter(self) -> Words<'a> {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn words_are_little_endian(){
    let bytes = [0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x00];
    let list = InstructionList::new(&bytes);
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(0), Some(0x0001_0000));
    assert_eq!(list.get(1), Some(0x0002_0001));
    assert_eq!(list.get(2), None);
    assert_eq!(list.to_vec(), vec![0x0001_0000, 0x0002_0001]);
  }

  #[test]
  fn unaligned_words(){
    let bytes = [0xFF, 0x78, 0x56, 0x34, 0x12];
    let list = InstructionList::new(&bytes[1..]);
    assert_eq!(list.get(0), Some(0x1234_5678));
  }

  #[test]
  fn decoded_instructions(){
    let bytes = [0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFC];
    let decoded: Vec<_> = InstructionList::new(&bytes).decoded().collect();
    assert_eq!(
      decoded,
      vec![Some(Instruction::Call{ push_return: false, api_index: 0, function_id: 7 }), None]
    );
  }

  #[test]
  fn empty_views(){
    let list = InstructionList::new(&[]);
    assert!(list.is_empty());
    assert_eq!(list.iter().count(), 0);
    let constants = ConstantMemory::new(&[]);
    assert!(constants.is_empty());
    assert_eq!(constants.as_bytes(), &[] as &[u8]);
  }
}
