/*!
  This module is responsible for the encoding and decoding of instruction words.

*/
use std::convert::TryFrom;

use super::{Opcode, Instruction};

// If you change this you must also change `encode_instruction` and `decode_instruction`.
pub type Word = u32;

pub const OPCODE_SHIFT       : u32  = 26;
const OPERAND_MASK           : Word = 0x03FF_FFFF;
const PUSH_RETURN_BIT        : Word = 1 << 24;
const API_INDEX_SHIFT        : u32  = 16;
const API_INDEX_MASK         : Word = 0xF;
const FUNCTION_ID_MASK       : Word = 0xFFFF;
const VALUE_TYPE_SHIFT       : u32  = 20;
const VALUE_TYPE_MASK        : Word = 0x3F;
const VALUE_MASK             : Word = 0x000F_FFFF;

/// Decodes an instruction word. Returns `None` if the opcode is not one the interpreter knows.
pub fn decode_instruction(word: Word) -> Option<Instruction> {
  let opcode = Opcode::try_from((word >> OPCODE_SHIFT) as u8).ok()?;

  let instruction =
    if opcode == Opcode::Call {
      Instruction::Call {
        push_return : word & PUSH_RETURN_BIT != 0,
        api_index   : ((word >> API_INDEX_SHIFT) & API_INDEX_MASK) as u8,
        function_id : (word & FUNCTION_ID_MASK) as u16,
      }
    } else if opcode.is_typed() {
      Instruction::Typed {
        opcode,
        value_type : ((word >> VALUE_TYPE_SHIFT) & VALUE_TYPE_MASK) as u8,
        value      : word & VALUE_MASK,
      }
    } else if opcode.is_nullary() {
      Instruction::Nullary(opcode)
    } else {
      Instruction::Unary {
        opcode,
        operand: word & OPERAND_MASK
      }
    };

  Some(instruction)
}

/**
  Encodes the instruction into a word. Operands wider than their field are truncated to the
  field. It is the caller's responsibility to use the correct `Instruction` variant for the
  given opcode.
*/
pub fn encode_instruction(instruction: &Instruction) -> Word {
  let opcode = (instruction.opcode().code() as Word) << OPCODE_SHIFT;
  match *instruction {

    Instruction::Call{push_return, api_index, function_id} => {
      let push_return = match push_return {
        true  => PUSH_RETURN_BIT,
        false => 0
      };
      opcode
        | push_return
        | ((api_index as Word & API_INDEX_MASK) << API_INDEX_SHIFT)
        | (function_id as Word)
    },

    Instruction::Typed{value_type, value, ..} => {
      opcode
        | ((value_type as Word & VALUE_TYPE_MASK) << VALUE_TYPE_SHIFT)
        | (value & VALUE_MASK)
    },

    Instruction::Unary{operand, ..} => {
      opcode | (operand & OPERAND_MASK)
    },

    Instruction::Nullary(_) => opcode,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_call(){
    assert_eq!(
      decode_instruction(0x0001_0000),
      Some(Instruction::Call{ push_return: false, api_index: 1, function_id: 0 })
    );
    assert_eq!(
      decode_instruction(0x0102_0007),
      Some(Instruction::Call{ push_return: true, api_index: 2, function_id: 7 })
    );
  }

  #[test]
  fn decode_each_layout(){
    let push = (1 << OPCODE_SHIFT) | (5 << VALUE_TYPE_SHIFT) | 0x1234;
    assert_eq!(
      decode_instruction(push),
      Some(Instruction::Typed{ opcode: Opcode::PushI, value_type: 5, value: 0x1234 })
    );
    let pop = (5 << OPCODE_SHIFT) | 3;
    assert_eq!(decode_instruction(pop), Some(Instruction::Unary{ opcode: Opcode::Pop, operand: 3 }));
    let store = 7 << OPCODE_SHIFT;
    assert_eq!(decode_instruction(store), Some(Instruction::Nullary(Opcode::Store)));
  }

  #[test]
  fn unknown_opcode(){
    assert_eq!(decode_instruction(17 << OPCODE_SHIFT), None);
    assert_eq!(decode_instruction(0xFFFF_FFFF), None);
  }

  #[test]
  fn encode_matches_decode(){
    let instructions = [
      Instruction::Call{ push_return: true, api_index: 15, function_id: 0xBEEF },
      Instruction::Typed{ opcode: Opcode::LoadV, value_type: 63, value: 0xF_FFFF },
      Instruction::Unary{ opcode: Opcode::SwitchThread, operand: OPERAND_MASK },
      Instruction::Nullary(Opcode::Store),
    ];
    for instruction in instructions.iter() {
      assert_eq!(decode_instruction(encode_instruction(instruction)), Some(*instruction));
    }
  }

  #[test]
  fn encode_truncates_wide_operands(){
    let wide = Instruction::Unary{ opcode: Opcode::Pop, operand: 0xFFFF_FFFF };
    assert_eq!(encode_instruction(&wide) >> OPCODE_SHIFT, Opcode::Pop.code() as Word);
  }
}
