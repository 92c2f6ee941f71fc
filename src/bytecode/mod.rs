/*!

  The interpreter uses a 32 bit little-endian instruction word. Every instruction is exactly
  one word. The top 6 bits hold the opcode and the low 26 bits hold the operands, whose layout
  depends on the opcode:

    CALL:                [OpCode:6][Reserved:1][PushReturn:1][Reserved:4][Api:4][FunctionId:16]
    PUSH_I, LOAD_C,
    LOAD_V, LOAD,
    STORE_V:             [OpCode:6][ValueType:6][Value:20]
    STORE:               [OpCode:6][Reserved:26]
    everything else:     [OpCode:6][Operand:26]

  The opcode numbering is part of the protocol between the server and the replay system and
  must remain consistent with the producer of the instruction stream.

  As in the rest of the crate, the instruction list of a `Request` is kept as raw words and is
  only decoded on demand. `Instruction` is the unencoded form, used for diagnostics and by
  interpreters that prefer a decoded value to bit twiddling.

*/

mod binary;
mod instruction;

pub use binary::{decode_instruction, encode_instruction, Word, OPCODE_SHIFT};
pub use instruction::{Instruction, Opcode};
