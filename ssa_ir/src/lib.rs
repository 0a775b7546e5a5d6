mod payload;
mod reg;
mod ty;

pub mod check;
pub mod func;
pub mod op;
pub mod text;

pub use check::{check_func, CheckError};
pub use func::{Block, BlockId, DominatorTree, Edge, Func, Value, ValueId};
pub use op::{Arch, Arity, Asm, BlockInfo, BlockKind, ControlKind, Op, OpInfo, Registry, TypeHint};
pub use payload::{Aux, AuxKind, SymKind, Symbol};
pub use reg::{AnyReg, FReg, Reg, RegInfo, RegMask};
pub use text::{parse_func, parse_unit, ParseError};
pub use ty::{is_type_name, Type, UnknownType};
