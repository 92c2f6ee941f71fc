/*!
  The wire format of a replay request. This is the only module that knows how the sections are
  laid out, in both directions.

  Every scalar is a little-endian `u32` and nothing is padded:

    [StackSize:u32]
    [VolatileMemorySize:u32]
    [ConstantMemoryLength:u32][ConstantMemory:ConstantMemoryLength bytes]
    [ResourceCount:u32]  ResourceCount x [Id:NUL terminated UTF-8][Size:u32]
    [InstructionCount:u32][Instructions:InstructionCount x u32]

  The constant memory and the instructions are not copied by the parser. They are returned as
  slices of the buffer being parsed.
*/

use std::convert::TryFrom;

use nom::{
  bytes::complete::{tag, take, take_till},
  error::ErrorKind,
  multi::{count, length_data},
  number::complete::le_u32,
  sequence::{pair, terminated},
  IResult
};
use tracing::debug;

use crate::bytecode::Word;
use crate::error::{LoadError, Section};
use crate::resource::Resource;

pub const WORD_SIZE: usize = std::mem::size_of::<Word>();
const SCALAR_SIZE: usize = std::mem::size_of::<u32>();
const NUL: &[u8] = &[0];
/// An empty id and its terminator, followed by the size.
const MIN_RESOURCE_ENTRY_SIZE: usize = 1 + SCALAR_SIZE;

/// The sections of a request as they appear on the wire, before validation of the resources.
#[derive(Debug)]
pub(crate) struct Sections<'a> {
  pub stack_size           : u32,
  pub volatile_memory_size : u32,
  pub constant_memory      : &'a [u8],
  pub resources            : Vec<Resource>,
  /// The raw bytes of the instruction list, a whole number of words long.
  pub instructions         : &'a [u8],
}

/// Converts a length to its wire form. Panics if `length` does not fit in a `u32`, which the
/// wire format cannot represent.
pub(crate) fn wire_length(length: usize, what: &str) -> u32 {
  match u32::try_from(length) {
    Ok(length) => length,
    Err(_) => panic!("{} is too long for the wire format: {} bytes", what, length)
  }
}

// region Section parsers

fn scalar(input: &[u8]) -> IResult<&[u8], u32> {
  le_u32(input)
}

fn constant_memory(input: &[u8]) -> IResult<&[u8], &[u8]> {
  length_data(le_u32)(input)
}

fn resource_entry(input: &[u8]) -> IResult<&[u8], (&[u8], u32)> {
  pair(terminated(take_till(|byte: u8| byte == 0), tag(NUL)), le_u32)(input)
}

fn resource_entries(input: &[u8]) -> IResult<&[u8], Vec<(&[u8], u32)>> {
  let (input, entries) = le_u32(input)?;
  let entries = entries as usize;
  // Refuse counts that cannot fit before `count` reserves space for them.
  match entries.checked_mul(MIN_RESOURCE_ENTRY_SIZE) {
    Some(minimum) if minimum <= input.len() => count(resource_entry, entries)(input),
    _ => Err(nom::Err::Error((input, ErrorKind::Count)))
  }
}

fn instruction_list(input: &[u8]) -> IResult<&[u8], &[u8]> {
  let (input, instructions) = le_u32(input)?;
  match (instructions as usize).checked_mul(WORD_SIZE) {
    Some(length) => take(length)(input),
    None => Err(nom::Err::Error((input, ErrorKind::Eof)))
  }
}

// endregion

/// Runs `parser` over `rest`, reporting failure as a truncation of `section`.
fn parse_section<'a, O, F>(
    buffer  : &'a [u8],
    rest    : &'a [u8],
    section : Section,
    parser  : F
  ) -> Result<(&'a [u8], O), LoadError>
  where F: Fn(&'a [u8]) -> IResult<&'a [u8], O>
{
  let offset = buffer.len() - rest.len();
  match parser(rest) {
    Ok((remaining, value)) => {
      debug!(%section, offset, length = rest.len() - remaining.len(), "section parsed");
      Ok((remaining, value))
    }
    Err(_) => Err(LoadError::Truncated { section, offset })
  }
}

/**
  Parses the first `declared_size` bytes of `buffer` as a replay request. Succeeds only if the
  five sections use exactly `declared_size` bytes.
*/
pub(crate) fn parse(buffer: &[u8], declared_size: u32) -> Result<Sections<'_>, LoadError> {
  let declared = declared_size as usize;
  if declared > buffer.len() {
    return Err(LoadError::DeclaredSizeExceedsBuffer { declared: declared_size, available: buffer.len() });
  }
  let buffer = &buffer[..declared];

  let (rest, stack_size)           = parse_section(buffer, buffer, Section::StackSize, scalar)?;
  let (rest, volatile_memory_size) = parse_section(buffer, rest, Section::VolatileMemorySize, scalar)?;
  let (rest, constant_memory)      = parse_section(buffer, rest, Section::ConstantMemory, constant_memory)?;
  let (rest, entries)              = parse_section(buffer, rest, Section::Resources, resource_entries)?;
  let (rest, instructions)         = parse_section(buffer, rest, Section::InstructionList, instruction_list)?;

  if !rest.is_empty() {
    return Err(LoadError::TrailingBytes { consumed: declared - rest.len(), declared: declared_size });
  }

  let mut resources = Vec::with_capacity(entries.len());
  for (index, (id, size)) in entries.into_iter().enumerate() {
    let id = std::str::from_utf8(id).map_err(|_| LoadError::InvalidResourceId { index })?;
    resources.push(Resource::new(id, size));
  }

  Ok(Sections {
    stack_size,
    volatile_memory_size,
    constant_memory,
    resources,
    instructions,
  })
}

/**
  Builds the wire form of a replay request. This is what the server side produces, and what
  tests use to make buffers.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestBuilder {
  pub stack_size           : u32,
  pub volatile_memory_size : u32,
  pub constant_memory      : Vec<u8>,
  pub resources            : Vec<Resource>,
  pub instructions         : Vec<Word>,
}

impl RequestBuilder {
  pub fn new() -> RequestBuilder {
    RequestBuilder::default()
  }

  pub fn stack_size(mut self, size: u32) -> Self {
    self.stack_size = size;
    self
  }

  pub fn volatile_memory_size(mut self, size: u32) -> Self {
    self.volatile_memory_size = size;
    self
  }

  pub fn constant_memory(mut self, bytes: &[u8]) -> Self {
    self.constant_memory = bytes.to_vec();
    self
  }

  /// Panics if `resource.id` contains a NUL byte, which the wire format cannot represent.
  pub fn resource(mut self, resource: Resource) -> Self {
    assert!(!resource.id.contains('\0'), "Resource id contains a NUL byte: {:?}", resource.id);
    self.resources.push(resource);
    self
  }

  pub fn instruction(mut self, word: Word) -> Self {
    self.instructions.push(word);
    self
  }

  pub fn instructions(mut self, words: &[Word]) -> Self {
    self.instructions.extend_from_slice(words);
    self
  }

  /// The number of bytes `encode` produces.
  pub fn encoded_len(&self) -> usize {
    let resources: usize =
      self.resources
          .iter()
          .map(|resource| resource.id.len() + MIN_RESOURCE_ENTRY_SIZE)
          .sum();
    5 * SCALAR_SIZE
      + self.constant_memory.len()
      + resources
      + self.instructions.len() * WORD_SIZE
  }

  /// Panics if the constant memory, the resource list, or the instruction list is longer than
  /// a `u32` can count.
  pub fn encode(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.encoded_len());

    out.extend_from_slice(&self.stack_size.to_le_bytes());
    out.extend_from_slice(&self.volatile_memory_size.to_le_bytes());

    out.extend_from_slice(&wire_length(self.constant_memory.len(), "Constant memory").to_le_bytes());
    out.extend_from_slice(&self.constant_memory);

    out.extend_from_slice(&wire_length(self.resources.len(), "Resource list").to_le_bytes());
    for resource in &self.resources {
      out.extend_from_slice(resource.id.as_bytes());
      out.extend_from_slice(NUL);
      out.extend_from_slice(&resource.size.to_le_bytes());
    }

    out.extend_from_slice(&wire_length(self.instructions.len(), "Instruction list").to_le_bytes());
    for word in &self.instructions {
      out.extend_from_slice(&word.to_le_bytes());
    }

    out
  }
}
