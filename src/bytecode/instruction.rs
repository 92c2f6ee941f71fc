use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr, EnumString};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::function_table::FunctionId;

/**
  Opcodes of the replay interpreter.

  The discriminants are the values stored in the top 6 bits of an instruction word, so they
  are fixed by the protocol. The grouping of an opcode into a layout is given by
  `Opcode::is_typed` and `Opcode::is_nullary` rather than by its position in this list.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "CALL")]
  Call          = 0,  // call( api, function_id )
  #[strum(serialize = "PUSH_I")]
  PushI         = 1,  // push_i( type, value )
  #[strum(serialize = "LOAD_C")]
  LoadC         = 2,  // load_c( type, constant address )
  #[strum(serialize = "LOAD_V")]
  LoadV         = 3,  // load_v( type, volatile address )
  #[strum(serialize = "LOAD")]
  Load          = 4,  // load( type )
  #[strum(serialize = "POP")]
  Pop           = 5,  // pop( count )
  #[strum(serialize = "STORE_V")]
  StoreV        = 6,  // store_v( type, volatile address )
  #[strum(serialize = "STORE")]
  Store         = 7,  // store
  #[strum(serialize = "RESOURCE")]
  Resource      = 8,  // resource( index )
  #[strum(serialize = "POST")]
  Post          = 9,  // post
  #[strum(serialize = "COPY")]
  CopyMemory    = 10, // copy( size )
  #[strum(serialize = "CLONE")]
  CloneValue    = 11, // clone( index )
  #[strum(serialize = "STRCPY")]
  Strcpy        = 12, // strcpy( max size )
  #[strum(serialize = "EXTEND")]
  Extend        = 13, // extend( value )
  #[strum(serialize = "ADD")]
  Add           = 14, // add( count )
  #[strum(serialize = "LABEL")]
  Label         = 15, // label( value )
  #[strum(serialize = "SWITCH_THREAD")]
  SwitchThread  = 16, // switch_thread( index )
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Opcodes whose operand is a value type followed by a 20 bit value.
  pub fn is_typed(&self) -> bool {
    match self {
      | Opcode::PushI
      | Opcode::LoadC
      | Opcode::LoadV
      | Opcode::Load
      | Opcode::StoreV => true,
      _ => false
    }
  }

  pub fn is_nullary(&self) -> bool {
    *self == Opcode::Store
  }
}

/// Holds the unencoded components of an instruction. As such, it enumerates the possible
/// instruction operand layouts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [OpCode:6][Reserved:1][PushReturn:1][Reserved:4][Api:4][FunctionId:16]
  Call {
    push_return : bool,
    api_index   : u8,
    function_id : FunctionId
  },
  /// [OpCode:6][ValueType:6][Value:20]
  Typed {
    opcode     : Opcode,
    value_type : u8,
    value      : u32
  },
  /// [OpCode:6][Operand:26]
  Unary {
    opcode  : Opcode,
    operand : u32
  },
  /// [OpCode:6][Reserved:26]
  Nullary(Opcode),
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Call { .. }         => Opcode::Call,
      Instruction::Typed { opcode, .. }
      | Instruction::Unary { opcode, .. } => *opcode,
      Instruction::Nullary(opcode)     => *opcode,
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Instruction::Call{push_return, api_index, function_id} => {
        match push_return {
          true  => write!(f, "{}({}, {}) -> push", Opcode::Call, api_index, function_id),
          false => write!(f, "{}({}, {})", Opcode::Call, api_index, function_id)
        }
      }

      Instruction::Typed{opcode, value_type, value} => {
        write!(f, "{}({}, {:#x})", opcode, value_type, value)
      }

      Instruction::Unary{opcode, operand} => {
        write!(f, "{}({})", opcode, operand)
      }

      Instruction::Nullary(opcode) => {
        write!(f, "{}", opcode)
      }

    }
  }
}
