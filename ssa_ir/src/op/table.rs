use super::*;

macro_rules! ops {
    ($($arch:ident { $($op:ident => $info:expr,)* })*) => {
        /// An operation tag. The variants are grouped by architecture, the generic operations
        /// come first.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum Op {
            $($($op,)*)*
        }

        static TABLE: &[OpInfo] = &[$($($info.named(stringify!($op), Arch::$arch),)*)*];

        impl Op {
            pub const ALL: &'static [Op] = &[$($(Op::$op,)*)*];
        }
    };
}

impl Op {
    pub fn info(self) -> &'static OpInfo {
        &TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn arch(self) -> Arch {
        self.info().arch
    }

    /// A dense index, usable to build tables keyed by operation.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_generic(self) -> bool {
        self.arch() == Arch::Generic
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

ops! {
    Generic {
        // Memory and stack.
        InitMem => OpInfo::args(0).ty(TypeHint::Mem).no_code().lowered_ok(),
        Arg => OpInfo::args(0).aux(AuxKind::Int).lowered_ok(),
        SP => OpInfo::args(0).ty(TypeHint::Ptr).reg(SP).no_code().lowered_ok(),
        SB => OpInfo::args(0).ty(TypeHint::Ptr).no_code().lowered_ok(),
        Phi => OpInfo::variadic().lowered_ok(),
        Copy => OpInfo::args(1).lowered_ok(),

        // Constants.
        Const => OpInfo::args(0).aux(AuxKind::Int).remat(),
        ConstBool => OpInfo::args(0).aux(AuxKind::Int).ty(TypeHint::Bool).remat(),
        ConstNil => OpInfo::args(0).ty(TypeHint::Ptr).remat(),
        ConstFloat => OpInfo::args(0).aux(AuxKind::Float).remat(),

        // Integer arithmetic, the width is given by the result type.
        Add => OpInfo::args(2).commutative(),
        Sub => OpInfo::args(2),
        Mul => OpInfo::args(2).commutative(),
        Div => OpInfo::args(2),
        DivU => OpInfo::args(2),
        Mod => OpInfo::args(2),
        ModU => OpInfo::args(2),
        Hmul => OpInfo::args(2).commutative(),
        HmulU => OpInfo::args(2).commutative(),
        And => OpInfo::args(2).commutative(),
        Or => OpInfo::args(2).commutative(),
        Xor => OpInfo::args(2).commutative(),
        Lsh => OpInfo::args(2),
        Rsh => OpInfo::args(2),
        RshU => OpInfo::args(2),
        Neg => OpInfo::args(1),
        Com => OpInfo::args(1),
        Not => OpInfo::args(1).ty(TypeHint::Bool),

        // Integer comparisons.
        Eq => OpInfo::args(2).commutative().ty(TypeHint::Bool),
        Neq => OpInfo::args(2).commutative().ty(TypeHint::Bool),
        Less => OpInfo::args(2).ty(TypeHint::Bool),
        LessU => OpInfo::args(2).ty(TypeHint::Bool),
        Leq => OpInfo::args(2).ty(TypeHint::Bool),
        LeqU => OpInfo::args(2).ty(TypeHint::Bool),
        Greater => OpInfo::args(2).ty(TypeHint::Bool),
        GreaterU => OpInfo::args(2).ty(TypeHint::Bool),
        Geq => OpInfo::args(2).ty(TypeHint::Bool),
        GeqU => OpInfo::args(2).ty(TypeHint::Bool),

        // Floating point.
        AddF => OpInfo::args(2).commutative(),
        SubF => OpInfo::args(2),
        MulF => OpInfo::args(2).commutative(),
        DivF => OpInfo::args(2),
        NegF => OpInfo::args(1),
        EqF => OpInfo::args(2).commutative().ty(TypeHint::Bool),
        LessF => OpInfo::args(2).ty(TypeHint::Bool),
        LeqF => OpInfo::args(2).ty(TypeHint::Bool),

        // Conversions.
        SignExt => OpInfo::args(1),
        ZeroExt => OpInfo::args(1),
        Trunc => OpInfo::args(1),

        // Pointers and memory.
        OffPtr => OpInfo::args(1).aux(AuxKind::Int).ty(TypeHint::Ptr),
        AddPtr => OpInfo::args(2).ty(TypeHint::Ptr),
        Addr => OpInfo::args(1).aux(AuxKind::Sym).ty(TypeHint::Ptr),
        Load => OpInfo::args(2).faults(),
        Store => OpInfo::args(3).ty(TypeHint::Mem).side_effects().faults(),
        NilCheck => OpInfo::args(2).ty(TypeHint::Void).side_effects(),
        IsInBounds => OpInfo::args(2).ty(TypeHint::Bool),

        // Calls. The integer part of the payload is the size of the outgoing arguments.
        StaticCall => OpInfo::args(1).aux(AuxKind::SymOff).ty(TypeHint::CallResult).call(),
        Select0 => OpInfo::args(1).lowered_ok(),
        Select1 => OpInfo::args(1).lowered_ok(),

        // Liveness markers for stack slots.
        VarDef => OpInfo::args(1).aux(AuxKind::Sym).ty(TypeHint::Mem).no_code().lowered_ok(),
        VarKill => OpInfo::args(1).aux(AuxKind::Sym).ty(TypeHint::Mem).no_code().lowered_ok(),
    }
    Mips {
        ADD => OpInfo::args(2).commutative().reg(GP21).asm(Asm::Rrr("addu")),
        ADDconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("addiu")),
        SUB => OpInfo::args(2).reg(GP21).asm(Asm::Rrr("subu")),
        MUL => OpInfo::args(2).commutative().reg(GP21_HILO).asm(Asm::Rrr("mul")),
        MULT => OpInfo::args(2).commutative().ty(TypeHint::HiLo).reg(GP2_HILO).asm(Asm::Src2("mult")),
        MULTU => OpInfo::args(2).commutative().ty(TypeHint::HiLoU).reg(GP2_HILO).asm(Asm::Src2("multu")),
        DIV => OpInfo::args(2).ty(TypeHint::HiLo).reg(GP2_HILO).asm(Asm::Src2("div")),
        DIVU => OpInfo::args(2).ty(TypeHint::HiLoU).reg(GP2_HILO).asm(Asm::Src2("divu")),
        AND => OpInfo::args(2).commutative().reg(GP21).asm(Asm::Rrr("and")),
        ANDconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("andi")),
        OR => OpInfo::args(2).commutative().reg(GP21).asm(Asm::Rrr("or")),
        ORconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("ori")),
        XOR => OpInfo::args(2).commutative().reg(GP21).asm(Asm::Rrr("xor")),
        XORconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("xori")),
        NOR => OpInfo::args(2).commutative().reg(GP21).asm(Asm::Rrr("nor")),
        NEG => OpInfo::args(1).reg(GP11).asm(Asm::Custom),
        SLL => OpInfo::args(2).reg(GP21).asm(Asm::Rrr("sllv")),
        SLLconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("sll")),
        SRL => OpInfo::args(2).reg(GP21).asm(Asm::Rrr("srlv")),
        SRLconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("srl")),
        SRA => OpInfo::args(2).reg(GP21).asm(Asm::Rrr("srav")),
        SRAconst => OpInfo::args(1).aux(AuxKind::Int).reg(GP11).asm(Asm::Rri("sra")),

        // Comparisons yield 0 or 1 in a general purpose register.
        // `SGT x y` is x > y, `SGTconst [c] x` is c > x.
        SGT => OpInfo::args(2).ty(TypeHint::Bool).reg(GP21).asm(Asm::Rrr("sgt")),
        SGTconst => OpInfo::args(1).aux(AuxKind::Int).ty(TypeHint::Bool).reg(GP11).asm(Asm::Rri("slti")),
        SGTzero => OpInfo::args(1).ty(TypeHint::Bool).reg(GP11).asm(Asm::Custom),
        SGTU => OpInfo::args(2).ty(TypeHint::Bool).reg(GP21).asm(Asm::Rrr("sgtu")),
        SGTUconst => OpInfo::args(1).aux(AuxKind::Int).ty(TypeHint::Bool).reg(GP11).asm(Asm::Rri("sltiu")),
        SGTUzero => OpInfo::args(1).ty(TypeHint::Bool).reg(GP11).asm(Asm::Custom),

        ADDF => OpInfo::args(2).commutative().reg(FP21).asm(Asm::Rrr("add.s")),
        ADDD => OpInfo::args(2).commutative().reg(FP21).asm(Asm::Rrr("add.d")),
        SUBF => OpInfo::args(2).reg(FP21).asm(Asm::Rrr("sub.s")),
        SUBD => OpInfo::args(2).reg(FP21).asm(Asm::Rrr("sub.d")),
        MULF => OpInfo::args(2).commutative().reg(FP21).asm(Asm::Rrr("mul.s")),
        MULD => OpInfo::args(2).commutative().reg(FP21).asm(Asm::Rrr("mul.d")),
        DIVF => OpInfo::args(2).reg(FP21).asm(Asm::Rrr("div.s")),
        DIVD => OpInfo::args(2).reg(FP21).asm(Asm::Rrr("div.d")),
        NEGF => OpInfo::args(1).reg(FP11).asm(Asm::Rr("neg.s")),
        NEGD => OpInfo::args(1).reg(FP11).asm(Asm::Rr("neg.d")),

        // Float compares set the FPU condition flag.
        CMPEQF => OpInfo::args(2).commutative().ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.eq.s")),
        CMPEQD => OpInfo::args(2).commutative().ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.eq.d")),
        CMPLTF => OpInfo::args(2).ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.lt.s")),
        CMPLTD => OpInfo::args(2).ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.lt.d")),
        CMPLEF => OpInfo::args(2).ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.le.s")),
        CMPLED => OpInfo::args(2).ty(TypeHint::Flags).reg(FP2_FLAGS).asm(Asm::Src2("c.le.d")),
        FPFlagTrue => OpInfo::args(1).ty(TypeHint::Bool).reg(GP01).asm(Asm::Custom),
        FPFlagFalse => OpInfo::args(1).ty(TypeHint::Bool).reg(GP01).asm(Asm::Custom),

        MOVWconst => OpInfo::args(0).aux(AuxKind::Int).remat().reg(GP01).asm(Asm::Ri("li")),
        MOVFconst => OpInfo::args(0).aux(AuxKind::Float).remat().reg(FP01).asm(Asm::Ri("li.s")),
        MOVDconst => OpInfo::args(0).aux(AuxKind::Float).remat().reg(FP01).asm(Asm::Ri("li.d")),
        MOVWaddr => OpInfo::args(1).aux(AuxKind::SymOff).ty(TypeHint::Ptr).remat().reg(GP11).asm(Asm::Custom),

        MOVBload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(GP_LOAD).asm(Asm::Load("lb")),
        MOVBUload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(GP_LOAD).asm(Asm::Load("lbu")),
        MOVHload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(GP_LOAD).asm(Asm::Load("lh")),
        MOVHUload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(GP_LOAD).asm(Asm::Load("lhu")),
        MOVWload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(GP_LOAD).asm(Asm::Load("lw")),
        MOVFload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(FP_LOAD).asm(Asm::Load("lwc1")),
        MOVDload => OpInfo::args(2).aux(AuxKind::SymOff).faults().reg(FP_LOAD).asm(Asm::Load("ldc1")),

        MOVBstore => OpInfo::args(3).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE).asm(Asm::Store("sb")),
        MOVHstore => OpInfo::args(3).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE).asm(Asm::Store("sh")),
        MOVWstore => OpInfo::args(3).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE).asm(Asm::Store("sw")),
        MOVFstore => OpInfo::args(3).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(FP_STORE).asm(Asm::Store("swc1")),
        MOVDstore => OpInfo::args(3).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(FP_STORE).asm(Asm::Store("sdc1")),
        MOVBstorezero => OpInfo::args(2).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE0).asm(Asm::StoreZero("sb")),
        MOVHstorezero => OpInfo::args(2).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE0).asm(Asm::StoreZero("sh")),
        MOVWstorezero => OpInfo::args(2).aux(AuxKind::SymOff).ty(TypeHint::Mem).side_effects().faults().reg(GP_STORE0).asm(Asm::StoreZero("sw")),

        // Register to register moves with sign or zero extension.
        MOVBreg => OpInfo::args(1).reg(GP11).asm(Asm::Rr("seb")),
        MOVBUreg => OpInfo::args(1).reg(GP11).asm(Asm::Custom),
        MOVHreg => OpInfo::args(1).reg(GP11).asm(Asm::Rr("seh")),
        MOVHUreg => OpInfo::args(1).reg(GP11).asm(Asm::Custom),
        MOVWreg => OpInfo::args(1).reg(GP11).asm(Asm::Rr("move")),

        CALLstatic => OpInfo::args(1).aux(AuxKind::SymOff).ty(TypeHint::CallResult).call().reg(CALL).asm(Asm::Custom),
        // Faults if the pointer is nil.
        LoweredNilCheck => OpInfo::args(2).ty(TypeHint::Void).side_effects().reg(NIL_CHECK).asm(Asm::Custom),
    }
}
