use super::Arch;

/// Whether a block kind needs a control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    None,
    Optional,
    /// A boolean or a word tested against zero.
    Value,
    /// An FPU condition flag.
    Flags,
    /// The call that ends the block.
    Call,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub name: &'static str,
    pub arch: Arch,
    pub succs: usize,
    pub control: ControlKind,
    /// A generic kind that may survive lowering.
    pub lowered_ok: bool,
    /// The kind that branches to the second successor when this one branches to the first.
    pub inverse: Option<BlockKind>,
}

macro_rules! kinds {
    ($($kind:ident: $arch:ident, $succs:literal, $control:ident, $lowered_ok:literal, $inverse:expr;)*) => {
        /// How a block ends.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum BlockKind {
            $($kind,)*
        }

        static KINDS: &[BlockInfo] = &[$(BlockInfo {
            name: stringify!($kind),
            arch: Arch::$arch,
            succs: $succs,
            control: ControlKind::$control,
            lowered_ok: $lowered_ok,
            inverse: $inverse,
        },)*];

        impl BlockKind {
            pub const ALL: &'static [BlockKind] = &[$(BlockKind::$kind,)*];
        }
    };
}

kinds! {
    // Unconditional jump to the only successor.
    Plain: Generic, 1, None, true, None;
    // Goes to the first successor if the boolean control is true.
    If: Generic, 2, Value, false, None;
    // Continues after the call that is its control.
    Call: Generic, 1, Call, true, None;
    // Returns, optionally with a result word.
    Ret: Generic, 0, Optional, true, None;
    // Unreachable, traps if reached.
    Exit: Generic, 0, None, true, None;

    EQ: Mips, 2, Value, false, Some(BlockKind::NE);
    NE: Mips, 2, Value, false, Some(BlockKind::EQ);
    LTZ: Mips, 2, Value, false, Some(BlockKind::GEZ);
    LEZ: Mips, 2, Value, false, Some(BlockKind::GTZ);
    GTZ: Mips, 2, Value, false, Some(BlockKind::LEZ);
    GEZ: Mips, 2, Value, false, Some(BlockKind::LTZ);
    FPT: Mips, 2, Flags, false, Some(BlockKind::FPF);
    FPF: Mips, 2, Flags, false, Some(BlockKind::FPT);
}

impl BlockKind {
    pub fn info(self) -> &'static BlockInfo {
        &KINDS[self as usize]
    }

    /// A dense index, usable to build tables keyed by block kind.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn arch(self) -> Arch {
        self.info().arch
    }

    pub fn succs(self) -> usize {
        self.info().succs
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
