/*!
  A replay request: everything the interpreter needs to know before it starts executing a
  replay, parsed from the replay data the server sent.

  A `Request` borrows the replay data it was parsed from. The constant memory and the
  instruction list are views into that data, never copies, so the request cannot outlive the
  memory manager that owns it. A `Request` only ever exists fully loaded and validated. Every
  failure while loading is reported as a `LoadError` instead.
*/

mod view;

use std::fmt::{Display, Formatter};

use prettytable::Table;
#[cfg(feature = "trace_loading")]
use tracing::trace;
use tracing::{debug, warn};

use crate::bytecode::decode_instruction;
use crate::connection::Connection;
use crate::display::TABLE_DISPLAY_FORMAT;
use crate::error::LoadError;
use crate::memory::MemoryManager;
use crate::resource::{Resource, ResourceProvider};
use crate::wire::{self, RequestBuilder};

pub use view::{ConstantMemory, InstructionList, Words};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request<'a> {
  /// The size of the stack required by the replay.
  stack_size           : u32,
  /// The size of the volatile memory required by the replay.
  volatile_memory_size : u32,
  constant_memory      : ConstantMemory<'a>,
  /// The resources used by the replay, in the order the instructions refer to them.
  resources            : Vec<Resource>,
  instruction_list     : InstructionList<'a>,
}

impl<'a> Request<'a> {

  /**
    Reads a replay from `connection` into storage obtained from `memory_manager`, parses it,
    and checks with `resource_provider` that every resource it needs can be provided.

    The returned request borrows `memory_manager` for as long as it is alive.
  */
  pub fn create<C, M>(
      connection        : &mut C,
      resource_provider : &dyn ResourceProvider,
      memory_manager    : &'a mut M
    ) -> Result<Request<'a>, LoadError>
    where C: Connection + ?Sized,
          M: MemoryManager + ?Sized
  {
    let result = Request::receive(connection, memory_manager)
      .and_then(|(data, size)| Request::load_validated(data, size, resource_provider));
    if let Err(error) = &result {
      warn!(%error, "failed to create replay request");
    }
    result
  }

  fn receive<C, M>(connection: &mut C, memory_manager: &'a mut M) -> Result<(&'a [u8], u32), LoadError>
    where C: Connection + ?Sized,
          M: MemoryManager + ?Sized
  {
    let size = connection.read_replay_size()?;
    debug!(size, "receiving replay data");

    let data = memory_manager
      .replay_data(size)
      .ok_or(LoadError::OutOfMemory { requested: size })?;
    connection.read_replay_data(data)?;

    // The replay data is read-only from here on.
    let data: &'a [u8] = data;
    Ok((data, size))
  }

  /**
    Parses a request from the first `size` bytes of `data`. Fails unless the request uses
    exactly `size` bytes. Resources are not checked against any provider.
  */
  pub fn load(data: &'a [u8], size: u32) -> Result<Request<'a>, LoadError> {
    let sections = wire::parse(data, size)?;

    let request = Request {
      stack_size           : sections.stack_size,
      volatile_memory_size : sections.volatile_memory_size,
      constant_memory      : ConstantMemory::new(sections.constant_memory),
      resources            : sections.resources,
      instruction_list     : InstructionList::new(sections.instructions),
    };

    debug!(
      stack_size = request.stack_size,
      volatile_memory_size = request.volatile_memory_size,
      constant_memory = request.constant_memory.len(),
      resources = request.resources.len(),
      instructions = request.instruction_list.len(),
      "replay request loaded"
    );
    #[cfg(feature = "trace_loading")]
    trace!("\n{}", request);

    Ok(request)
  }

  /// Like `load`, and additionally fails if `resource_provider` cannot provide any of the
  /// resources the request names.
  pub fn load_validated(
      data              : &'a [u8],
      size              : u32,
      resource_provider : &dyn ResourceProvider
    ) -> Result<Request<'a>, LoadError>
  {
    let request = Request::load(data, size)?;
    for resource in &request.resources {
      if !resource_provider.confirm(resource) {
        return Err(LoadError::UnresolvedResource { id: resource.id.clone(), size: resource.size });
      }
    }
    Ok(request)
  }

  // region Accessors

  /// The stack size required by the replay.
  pub fn stack_size(&self) -> u32 {
    self.stack_size
  }

  /// The volatile memory size required by the replay.
  pub fn volatile_memory_size(&self) -> u32 {
    self.volatile_memory_size
  }

  pub fn constant_memory(&self) -> ConstantMemory<'a> {
    self.constant_memory
  }

  pub fn resources(&self) -> &[Resource] {
    &self.resources
  }

  pub fn instruction_list(&self) -> InstructionList<'a> {
    self.instruction_list
  }

  // endregion

  /// Encodes the request back into its wire form.
  pub fn encode(&self) -> Vec<u8> {
    RequestBuilder::from(self).encode()
  }

  fn make_resource_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Index", ubl->"Resource", ubr->"Size"]);

    for (i, resource) in self.resources.iter().enumerate() {
      table.add_row(row![r->i, &*resource.id, r->resource.size]);
    }
    table
  }

  fn make_instruction_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Index", ubr->"Word", ubl->"Instruction"]);

    for (i, word) in self.instruction_list.iter().enumerate() {
      let text = match decode_instruction(word) {
        Some(instruction) => instruction.to_string(),
        None              => "<unknown opcode>".to_string()
      };
      table.add_row(row![r->i, r->format!("{:#010x}", word), text]);
    }
    table
  }
}

impl<'a, 'b> From<&'b Request<'a>> for RequestBuilder {
  fn from(request: &'b Request<'a>) -> RequestBuilder {
    RequestBuilder {
      stack_size           : request.stack_size,
      volatile_memory_size : request.volatile_memory_size,
      constant_memory      : request.constant_memory.as_bytes().to_vec(),
      resources            : request.resources.clone(),
      instructions         : request.instruction_list.to_vec(),
    }
  }
}

impl<'a> Display for Request<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let resource_table    = self.make_resource_table();
    let instruction_table = self.make_instruction_table();

    let mut combined_table = table!([resource_table, instruction_table]);

    combined_table.set_titles(row![ub->"Resources", ub->"Instructions"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(
      f,
      "Stack: {} bytes\tVolatile memory: {} bytes\tConstant memory: {} bytes\n{}",
      self.stack_size,
      self.volatile_memory_size,
      self.constant_memory.len(),
      combined_table
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::connection::StreamConnection;
  use crate::memory::ReplayMemory;
  use crate::resource::InMemoryResourceProvider;
  use crate::error::Section;

  fn framed(payload: &[u8], size: u32) -> Vec<u8> {
    let mut stream = size.to_le_bytes().to_vec();
    stream.extend_from_slice(payload);
    stream
  }

  fn scenario() -> Vec<u8> {
    RequestBuilder::new()
      .stack_size(4096)
      .instructions(&[0x0001_0000, 0x0002_0001])
      .encode()
  }

  #[test]
  fn load_scenario(){
    let data = scenario();
    let request = Request::load(&data, data.len() as u32).unwrap();
    assert_eq!(request.stack_size(), 4096);
    assert_eq!(request.volatile_memory_size(), 0);
    assert!(request.constant_memory().is_empty());
    assert!(request.resources().is_empty());
    assert_eq!(request.instruction_list().len(), 2);
    assert_eq!(request.instruction_list().to_vec(), vec![0x0001_0000, 0x0002_0001]);
  }

  #[test]
  fn create_scenario(){
    let data = scenario();
    let stream = framed(&data, data.len() as u32);
    let mut connection = StreamConnection::new(&stream[..]);
    let provider = InMemoryResourceProvider::new();
    let mut memory = ReplayMemory::new(1024);

    let request = Request::create(&mut connection, &provider, &mut memory).unwrap();
    assert_eq!(request.stack_size(), 4096);
    assert_eq!(request.instruction_list().get(1), Some(0x0002_0001));
  }

  #[test]
  fn create_with_oversized_declaration(){
    let mut data = scenario();
    let size = data.len() as u32 + 1;
    data.push(0);
    let stream = framed(&data, size);
    let mut connection = StreamConnection::new(&stream[..]);
    let mut memory = ReplayMemory::new(1024);

    let result = Request::create(&mut connection, &InMemoryResourceProvider::new(), &mut memory);
    assert!(matches!(result, Err(LoadError::TrailingBytes{ .. })));
  }

  #[test]
  fn create_with_short_transfer(){
    let data = scenario();
    let stream = framed(&data[..data.len() - 1], data.len() as u32);
    let mut connection = StreamConnection::new(&stream[..]);
    let mut memory = ReplayMemory::new(1024);

    let result = Request::create(&mut connection, &InMemoryResourceProvider::new(), &mut memory);
    assert!(matches!(result, Err(LoadError::Connection(_))));
  }

  #[test]
  fn create_with_truncated_replay(){
    let data = scenario();
    let size = data.len() as u32 - 1;
    let stream = framed(&data[..size as usize], size);
    let mut connection = StreamConnection::new(&stream[..]);
    let mut memory = ReplayMemory::new(1024);

    let result = Request::create(&mut connection, &InMemoryResourceProvider::new(), &mut memory);
    assert!(matches!(result, Err(LoadError::Truncated{ section: Section::InstructionList, .. })));
  }

  #[test]
  fn create_without_memory(){
    let data = scenario();
    let stream = framed(&data, data.len() as u32);
    let mut connection = StreamConnection::new(&stream[..]);
    let mut memory = ReplayMemory::new(8);

    let result = Request::create(&mut connection, &InMemoryResourceProvider::new(), &mut memory);
    assert!(matches!(result, Err(LoadError::OutOfMemory{ requested }) if requested == data.len() as u32));
  }

  #[test]
  fn create_with_unknown_resource(){
    let mut provider = InMemoryResourceProvider::new();
    let known = provider.insert("known", vec![0; 8]);
    let data =
      RequestBuilder::new()
        .resource(known)
        .resource(Resource::new("unknown", 8))
        .encode();
    let stream = framed(&data, data.len() as u32);
    let mut connection = StreamConnection::new(&stream[..]);
    let mut memory = ReplayMemory::new(1024);

    match Request::create(&mut connection, &provider, &mut memory) {
      Err(LoadError::UnresolvedResource{ id, size: 8 }) => assert_eq!(&*id, "unknown"),
      other => panic!("unexpected result: {:?}", other)
    }
  }

  #[test]
  fn create_with_wrong_resource_size(){
    let mut provider = InMemoryResourceProvider::new();
    provider.insert("texture", vec![0; 8]);
    let data = RequestBuilder::new().resource(Resource::new("texture", 9)).encode();

    let result = Request::load_validated(&data, data.len() as u32, &provider);
    assert!(matches!(result, Err(LoadError::UnresolvedResource{ .. })));
  }

  #[test]
  fn load_is_zero_copy(){
    let data =
      RequestBuilder::new()
        .constant_memory(&[1, 2, 3, 4, 5])
        .instructions(&[7, 8, 9])
        .encode();
    let request = Request::load(&data, data.len() as u32).unwrap();
    let range = data.as_ptr_range();
    assert!(range.contains(&request.constant_memory().as_ptr()));
    assert!(range.contains(&request.instruction_list().as_ptr()));
    assert_eq!(request.constant_memory().as_bytes(), &[1, 2, 3, 4, 5]);
  }

  #[test]
  fn load_truncated_and_extended(){
    let data = scenario();
    let size = data.len() as u32;

    assert!(matches!(
      Request::load(&data[..data.len() - 1], size - 1),
      Err(LoadError::Truncated{ section: Section::InstructionList, .. })
    ));

    let mut extended = data.clone();
    extended.push(0);
    assert!(matches!(
      Request::load(&extended, size + 1),
      Err(LoadError::TrailingBytes{ .. })
    ));
  }

  #[test]
  fn encode_round_trip(){
    let data =
      RequestBuilder::new()
        .stack_size(64)
        .volatile_memory_size(128)
        .constant_memory(b"constants")
        .resource(Resource::new("a", 1))
        .resource(Resource::new("b", 2))
        .instructions(&[0x0400_0000, 0x1C00_0000])
        .encode();
    let request = Request::load(&data, data.len() as u32).unwrap();
    assert_eq!(request.encode(), data);
  }

  #[test]
  fn display_disassembles(){
    let data =
      RequestBuilder::new()
        .resource(Resource::new("texture", 16))
        .instructions(&[0x0100_002A, 0xFC00_0000])
        .encode();
    let request = Request::load(&data, data.len() as u32).unwrap();
    let text = request.to_string();
    assert!(text.contains("texture"));
    assert!(text.contains("CALL(0, 42) -> push"));
    assert!(text.contains("<unknown opcode>"));
  }

  /// Records the formatted fields of every event, with every level enabled.
  #[cfg(feature = "trace_loading")]
  #[derive(Default)]
  struct RecordingSubscriber {
    events: std::sync::Arc<std::sync::Mutex<Vec<String>>>
  }

  #[cfg(feature = "trace_loading")]
  struct FieldWriter<'a>(&'a mut String);

  #[cfg(feature = "trace_loading")]
  impl<'a> tracing::field::Visit for FieldWriter<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
      self.0.push_str(&format!("{}={:?} ", field.name(), value));
    }
  }

  #[cfg(feature = "trace_loading")]
  impl tracing::Subscriber for RecordingSubscriber {
    fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
      true
    }

    fn new_span(&self, _span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
      tracing::span::Id::from_u64(1)
    }

    fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}

    fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
      let mut text = String::new();
      event.record(&mut FieldWriter(&mut text));
      if let Ok(mut events) = self.events.lock() {
        events.push(text);
      }
    }

    fn enter(&self, _span: &tracing::span::Id) {}

    fn exit(&self, _span: &tracing::span::Id) {}
  }

  #[cfg(feature = "trace_loading")]
  #[test]
  fn load_with_tracing_enabled(){
    let data =
      RequestBuilder::new()
        .stack_size(4096)
        .resource(Resource::new("texture", 16))
        .instruction(0x0100_002A)
        .encode();
    let subscriber = RecordingSubscriber::default();
    let events = std::sync::Arc::clone(&subscriber.events);

    let request = tracing::subscriber::with_default(subscriber, || {
      Request::load(&data, data.len() as u32)
    }).unwrap();
    assert_eq!(request.stack_size(), 4096);

    let events = events.lock().unwrap();
    assert!(events.iter().any(|event| event.contains("CALL(0, 42) -> push")));
    assert!(events.iter().any(|event| event.contains("texture")));
  }
}
