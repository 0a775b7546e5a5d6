//! Operation registry
//!
//! Every operation the IR knows about is a variant of [`Op`]. Its static description lives in a
//! dense table indexed by the variant, so looking it up is a single array access. A [`Registry`]
//! restricts the table to the generic operations plus the operations of one architecture.

#[cfg(test)]
mod test;

mod kind;
mod table;

pub use kind::{BlockInfo, BlockKind, ControlKind};
pub use table::Op;

use crate::{
    reg::{RegInfo, RegMask},
    AuxKind, Type,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// Architecture independent operations, present in every registry.
    Generic,
    Mips,
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Arch::Generic => "generic",
            Arch::Mips => "MIPS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(u8),
    /// Any number of arguments (phis have one per predecessor).
    Variadic,
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Fixed(arity) => *arity as usize == n,
            Arity::Variadic => true,
        }
    }
}

/// The result type of an operation when a rule creates it without an explicit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    None,
    Mem,
    Void,
    Flags,
    Bool,
    Ptr,
    Int32,
    UInt32,
    /// `(Int32,Int32)`: the HI and LO halves of a signed multiply or divide.
    HiLo,
    /// `(UInt32,UInt32)`
    HiLoU,
    /// `(UInt32,Mem)`: the result word and the memory after a call.
    CallResult,
}

impl TypeHint {
    pub fn to_type(self) -> Option<Type> {
        let ty = match self {
            TypeHint::None => return None,
            TypeHint::Mem => Type::Mem,
            TypeHint::Void => Type::Void,
            TypeHint::Flags => Type::Flags,
            TypeHint::Bool => Type::Bool,
            TypeHint::Ptr => Type::Ptr,
            TypeHint::Int32 => Type::INT32,
            TypeHint::UInt32 => Type::UINT32,
            TypeHint::HiLo => Type::tuple(Type::INT32, Type::INT32),
            TypeHint::HiLoU => Type::tuple(Type::UINT32, Type::UINT32),
            TypeHint::CallResult => Type::tuple(Type::UINT32, Type::Mem),
        };
        Some(ty)
    }
}

/// How the code generator emits an operation. Registers are substituted for `rd` (the result),
/// `rs` and `rt` (the first and second argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asm {
    /// No instruction, or emitted by hand.
    None,
    /// `op rd, rs, rt`
    Rrr(&'static str),
    /// `op rd, rs, imm`
    Rri(&'static str),
    /// `op rd, rs`
    Rr(&'static str),
    /// `op rd, imm`
    Ri(&'static str),
    /// `op rs, rt`, the result goes to fixed registers or the FPU condition flag.
    Src2(&'static str),
    /// `op rd, off(rs)`
    Load(&'static str),
    /// `op rt, off(rs)`
    Store(&'static str),
    /// `op $zero, off(rs)`
    StoreZero(&'static str),
    /// Needs more than a single template instruction.
    Custom,
}

/// The static description of an operation.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub arch: Arch,
    pub arity: Arity,
    pub aux: AuxKind,
    pub ty: TypeHint,
    pub reg: RegInfo,
    pub asm: Asm,
    pub commutative: bool,
    /// Cheap enough to recompute instead of keeping it alive.
    pub rematerializable: bool,
    pub call: bool,
    /// Emits no machine code.
    pub no_code: bool,
    /// Must not be removed even when its result is unused.
    pub side_effects: bool,
    /// Faults when its first argument is nil, so it can stand in for a nil check.
    pub faults_on_nil_arg0: bool,
    /// A generic operation that may survive lowering.
    pub lowered_ok: bool,
}

impl OpInfo {
    const fn new(arity: Arity) -> Self {
        Self {
            name: "",
            arch: Arch::Generic,
            arity,
            aux: AuxKind::None,
            ty: TypeHint::None,
            reg: RegInfo::NONE,
            asm: Asm::None,
            commutative: false,
            rematerializable: false,
            call: false,
            no_code: false,
            side_effects: false,
            faults_on_nil_arg0: false,
            lowered_ok: false,
        }
    }

    const fn args(n: u8) -> Self {
        Self::new(Arity::Fixed(n))
    }

    const fn variadic() -> Self {
        Self::new(Arity::Variadic)
    }

    const fn named(mut self, name: &'static str, arch: Arch) -> Self {
        self.name = name;
        self.arch = arch;
        self
    }

    const fn aux(mut self, aux: AuxKind) -> Self {
        self.aux = aux;
        self
    }

    const fn ty(mut self, ty: TypeHint) -> Self {
        self.ty = ty;
        self
    }

    const fn reg(mut self, reg: RegInfo) -> Self {
        self.reg = reg;
        self
    }

    const fn asm(mut self, asm: Asm) -> Self {
        self.asm = asm;
        self
    }

    const fn commutative(mut self) -> Self {
        self.commutative = true;
        self
    }

    const fn remat(mut self) -> Self {
        self.rematerializable = true;
        self
    }

    const fn call(mut self) -> Self {
        self.call = true;
        self.side_effects = true;
        self
    }

    const fn no_code(mut self) -> Self {
        self.no_code = true;
        self
    }

    const fn side_effects(mut self) -> Self {
        self.side_effects = true;
        self
    }

    const fn faults(mut self) -> Self {
        self.faults_on_nil_arg0 = true;
        self
    }

    const fn lowered_ok(mut self) -> Self {
        self.lowered_ok = true;
        self
    }
}

/// The operations available when compiling for one architecture: the generic ones and the
/// architecture's own. Building it is a pure function of the architecture.
#[derive(Debug, Clone)]
pub struct Registry {
    arch: Arch,
    ops: HashMap<&'static str, Op>,
    kinds: HashMap<&'static str, BlockKind>,
}

impl Registry {
    pub fn new(arch: Arch) -> Self {
        let ops = Op::ALL
            .iter()
            .filter(|op| matches!(op.arch(), Arch::Generic) || op.arch() == arch)
            .map(|&op| (op.name(), op))
            .collect();
        let kinds = BlockKind::ALL
            .iter()
            .filter(|kind| matches!(kind.arch(), Arch::Generic) || kind.arch() == arch)
            .map(|&kind| (kind.name(), kind))
            .collect();
        log::debug!("built the {arch} registry");
        Self { arch, ops, kinds }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn contains(&self, op: Op) -> bool {
        op.arch() == Arch::Generic || op.arch() == self.arch
    }

    pub fn contains_kind(&self, kind: BlockKind) -> bool {
        kind.arch() == Arch::Generic || kind.arch() == self.arch
    }

    /// Returns the descriptor of `op`. Panics if `op` belongs to another architecture, which can
    /// only be caused by a bug in the compiler.
    pub fn info(&self, op: Op) -> &'static OpInfo {
        if !self.contains(op) {
            panic!(
                "internal compiler error: {} op `{}` used with the {} registry",
                op.arch(),
                op.name(),
                self.arch
            );
        }
        op.info()
    }

    pub fn kind_info(&self, kind: BlockKind) -> &'static BlockInfo {
        if !self.contains_kind(kind) {
            panic!(
                "internal compiler error: {} block kind `{}` used with the {} registry",
                kind.arch(),
                kind.name(),
                self.arch
            );
        }
        kind.info()
    }

    pub fn lookup(&self, name: &str) -> Option<Op> {
        self.ops.get(name).copied()
    }

    pub fn lookup_kind(&self, name: &str) -> Option<BlockKind> {
        self.kinds.get(name).copied()
    }

    /// Iterates over the operations in this registry in declaration order.
    pub fn ops(&self) -> impl Iterator<Item = Op> + '_ {
        Op::ALL.iter().copied().filter(|&op| self.contains(op))
    }
}

// Register constraint shorthands, named after the number of inputs and outputs.
const GP: RegMask = RegMask::GP;
const GP_SP: RegMask = RegMask::GP.union(RegMask::SP);
const FP: RegMask = RegMask::FP;

const GP01: RegInfo = RegInfo {
    inputs: &[],
    outputs: &[GP],
    clobbers: RegMask::EMPTY,
};
const GP11: RegInfo = RegInfo {
    inputs: &[GP_SP],
    outputs: &[GP],
    clobbers: RegMask::EMPTY,
};
const GP21: RegInfo = RegInfo {
    inputs: &[GP, GP],
    outputs: &[GP],
    clobbers: RegMask::EMPTY,
};
const GP21_HILO: RegInfo = RegInfo {
    inputs: &[GP, GP],
    outputs: &[GP],
    clobbers: RegMask::HI.union(RegMask::LO),
};
const GP2_HILO: RegInfo = RegInfo {
    inputs: &[GP, GP],
    outputs: &[RegMask::HI, RegMask::LO],
    clobbers: RegMask::EMPTY,
};
const GP_LOAD: RegInfo = RegInfo {
    inputs: &[GP_SP],
    outputs: &[GP],
    clobbers: RegMask::EMPTY,
};
const GP_STORE: RegInfo = RegInfo {
    inputs: &[GP_SP, GP],
    outputs: &[],
    clobbers: RegMask::EMPTY,
};
const GP_STORE0: RegInfo = RegInfo {
    inputs: &[GP_SP],
    outputs: &[],
    clobbers: RegMask::EMPTY,
};
const FP01: RegInfo = RegInfo {
    inputs: &[],
    outputs: &[FP],
    clobbers: RegMask::EMPTY,
};
const FP11: RegInfo = RegInfo {
    inputs: &[FP],
    outputs: &[FP],
    clobbers: RegMask::EMPTY,
};
const FP21: RegInfo = RegInfo {
    inputs: &[FP, FP],
    outputs: &[FP],
    clobbers: RegMask::EMPTY,
};
const FP2_FLAGS: RegInfo = RegInfo {
    inputs: &[FP, FP],
    outputs: &[],
    clobbers: RegMask::EMPTY,
};
const FP_LOAD: RegInfo = RegInfo {
    inputs: &[GP_SP],
    outputs: &[FP],
    clobbers: RegMask::EMPTY,
};
const FP_STORE: RegInfo = RegInfo {
    inputs: &[GP_SP, FP],
    outputs: &[],
    clobbers: RegMask::EMPTY,
};
const NIL_CHECK: RegInfo = RegInfo {
    inputs: &[GP_SP],
    outputs: &[],
    clobbers: RegMask::EMPTY,
};
const CALL: RegInfo = RegInfo {
    inputs: &[],
    outputs: &[RegMask::V0, RegMask::EMPTY],
    clobbers: RegMask::CALLER_SAVED,
};
const SP: RegInfo = RegInfo {
    inputs: &[],
    outputs: &[RegMask::SP],
    clobbers: RegMask::EMPTY,
};
