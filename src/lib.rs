/*!
  The execution core of the replay interpreter.

  A replay arrives from the server as a single buffer describing a captured program: how much
  stack and volatile memory it needs, a constant data segment, the resources it refers to, and
  the instruction stream itself. `request` turns that buffer into a validated `Request` that
  borrows the buffer in place. `function_table` maps the function ids named by `CALL`
  instructions to the native functions that implement them.

  The interpreter loop, the native functions themselves, and the resource cache live outside
  this crate. They plug in through the traits in `connection`, `memory`, and `resource`, and
  through the stack type the `FunctionTable` is generic over.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod display;

pub mod bytecode;
pub mod connection;
pub mod error;
pub mod function_table;
pub mod memory;
pub mod request;
pub mod resource;
pub mod wire;

pub use bytecode::{decode_instruction, encode_instruction, Instruction, Opcode, Word};
pub use connection::{Connection, StreamConnection};
pub use error::{LoadError, Section};
pub use function_table::{FunctionId, FunctionTable, Handler};
pub use memory::{MemoryManager, ReplayMemory};
pub use request::{ConstantMemory, InstructionList, Request};
pub use resource::{InMemoryResourceProvider, Resource, ResourceId, ResourceProvider};
pub use wire::RequestBuilder;
