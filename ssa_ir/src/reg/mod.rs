#[cfg(test)]
mod test;

use std::{fmt, ops};

/// Represents a MIPS register of any of the register files: a CPU register, an (even) FPU
/// register or one of the multiply/divide unit's result registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnyReg {
    R(Reg),
    F(FReg),
    Hi,
    Lo,
}

impl AnyReg {
    /// Returns `true` if the register is by convention preserved when calling a function.
    pub fn is_saved(&self) -> bool {
        match self {
            AnyReg::R(reg) => reg.is_saved(),
            AnyReg::F(freg) => freg.is_saved(),
            AnyReg::Hi | AnyReg::Lo => false,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, AnyReg::F(_))
    }

    /// Position of this register in a [`RegMask`].
    pub fn mask_bit(&self) -> u32 {
        match self {
            AnyReg::R(reg) => reg.0 as u32,
            AnyReg::F(freg) => 32 + freg.0 as u32 / 2,
            AnyReg::Hi => 48,
            AnyReg::Lo => 49,
        }
    }

    fn from_mask_bit(bit: u32) -> Option<Self> {
        match bit {
            0..=31 => Some(AnyReg::R(Reg(bit as u8))),
            32..=47 => Some(AnyReg::F(FReg((bit as u8 - 32) * 2))),
            48 => Some(AnyReg::Hi),
            49 => Some(AnyReg::Lo),
            _ => None,
        }
    }
}

impl From<Reg> for AnyReg {
    fn from(value: Reg) -> Self {
        Self::R(value)
    }
}

impl From<FReg> for AnyReg {
    fn from(value: FReg) -> Self {
        Self::F(value)
    }
}

impl fmt::Debug for AnyReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for AnyReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyReg::R(reg) => fmt::Display::fmt(reg, f),
            AnyReg::F(freg) => fmt::Display::fmt(freg, f),
            AnyReg::Hi => f.write_str("$hi"),
            AnyReg::Lo => f.write_str("$lo"),
        }
    }
}

/// Represents a MIPS CPU register.
///
/// The MIPS registers are conventinally used as follows:
///
/// | register    | name         | preserved? | usage |
/// | ----------- | ------------ | --- | ------------ |
/// |`$0`         |`$zero`       | yes | always zero |
/// |`$1`         |`$at`         | no  | scratch register of the code generator |
/// |`$2` - `$3`  |`$v0` - `$v1` | no  | value for function results and expression evaluation |
/// |`$4` - `$7`  |`$a0` - `$a3` | no  | temporaries (arguments are passed on the stack) |
/// |`$8` - `$15` |`$t0` - `$t7` | no  | temporaries |
/// |`$16` - `$23`|`$s0` - `$s7` | yes | saved temporaries |
/// |`$24` - `$25`|`$t8` - `$t9` | no  | temporaries |
/// |`$26` - `$27`|`$k0` - `$k1` | no  | reserved for os kernel |
/// |`$28`        |`$gp`         | yes | global pointer |
/// |`$29`        |`$sp`         | yes | stack pointer |
/// |`$30`        |`$fp` or `$s8`| yes | frame pointer |
/// |`$31`        |`$ra`         | yes | return address (used by e.g. `jal`) |
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub u8);

impl Reg {
    pub const ZERO: Self = Self(0);
    pub const AT: Self = Self(1);
    pub const V0: Self = Self(2);
    pub const V1: Self = Self(3);
    pub const A0: Self = Self(4);
    pub const A1: Self = Self(5);
    pub const A2: Self = Self(6);
    pub const A3: Self = Self(7);
    pub const T0: Self = Self(8);
    pub const T1: Self = Self(9);
    pub const T2: Self = Self(10);
    pub const T3: Self = Self(11);
    pub const T4: Self = Self(12);
    pub const T5: Self = Self(13);
    pub const T6: Self = Self(14);
    pub const T7: Self = Self(15);
    pub const S0: Self = Self(16);
    pub const S1: Self = Self(17);
    pub const S2: Self = Self(18);
    pub const S3: Self = Self(19);
    pub const S4: Self = Self(20);
    pub const S5: Self = Self(21);
    pub const S6: Self = Self(22);
    pub const S7: Self = Self(23);
    pub const T8: Self = Self(24);
    pub const T9: Self = Self(25);
    pub const K0: Self = Self(26);
    pub const K1: Self = Self(27);
    pub const GP: Self = Self(28);
    pub const SP: Self = Self(29);
    pub const FP: Self = Self(30);
    pub const RA: Self = Self(31);

    /// Returns `true` if the register is by convention preserved when calling a function.
    pub fn is_saved(&self) -> bool {
        match self.0 {
            0 => true,
            1..=15 => false,
            16..=23 => true,
            24..=27 => false,
            28..=31 => true,
            n => panic!("encountered nonexisting register ${n}"),
        }
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 32] = [
            "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5",
            "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1",
            "gp", "sp", "fp", "ra",
        ];
        match self.0 {
            n @ 0..=31 if f.alternate() => write!(f, "${}", NAMES[n as usize]),
            n @ 0..=31 => write!(f, "${n}"),
            n => panic!("encountered nonexistent register: ${n}"),
        }
    }
}

/// Represents a MIPS FPU register.
///
/// Only the even registers are used, so that every register can hold both single and double
/// precision values.
///
/// | registers      | preserved? | usage |
/// | -------------- | --- | ------------ |
/// |`$f0`  - `$f18` | no  | temporaries |
/// |`$f20` - `$f28` | yes | saved temporaries |
/// |`$f30`          | no  | scratch register of the code generator |
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FReg(pub u8);

impl FReg {
    pub const F0: Self = Self(0);
    pub const F30: Self = Self(30);

    pub fn is_saved(&self) -> bool {
        match self.0 {
            0..=19 => false,
            20..=29 => true,
            30..=31 => false,
            n => panic!("encountered nonexisting register $f{n}"),
        }
    }
}

impl fmt::Debug for FReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for FReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            n @ 0..=31 => write!(f, "$f{n}"),
            n => panic!("encountered nonexistent register $f{n}"),
        }
    }
}

/// A set of registers, used to describe which registers an operation may read its arguments
/// from, write its results to, or clobbers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegMask(pub u64);

impl RegMask {
    pub const EMPTY: Self = Self(0);
    /// General purpose registers available to the allocator (`$v0` - `$t9`).
    pub const GP: Self = Self(0x03ff_fffc);
    /// Callee-saved general purpose registers (`$s0` - `$s7`).
    pub const GP_SAVED: Self = Self(0x00ff_0000);
    /// FPU registers available to the allocator (`$f0` - `$f28`).
    pub const FP: Self = Self(0x7fff << 32);
    /// Callee-saved FPU registers (`$f20` - `$f28`).
    pub const FP_SAVED: Self = Self(0x7c00 << 32);
    pub const HI: Self = Self(1 << 48);
    pub const LO: Self = Self(1 << 49);
    pub const V0: Self = Self(1 << 2);
    pub const SP: Self = Self(1 << 29);
    /// Everything a call may destroy.
    pub const CALLER_SAVED: Self = Self(
        (Self::GP.0 & !Self::GP_SAVED.0)
            | (Self::FP.0 & !Self::FP_SAVED.0)
            | Self::HI.0
            | Self::LO.0
            | (1 << 31),
    );

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn single(reg: AnyReg) -> Self {
        Self(1 << reg.mask_bit())
    }

    pub fn contains(&self, reg: AnyReg) -> bool {
        self.0 & (1 << reg.mask_bit()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the registers in this set, in register number order.
    pub fn iter(&self) -> impl Iterator<Item = AnyReg> {
        let bits = self.0;
        (0..64)
            .filter(move |bit| bits & (1 << bit) != 0)
            .filter_map(AnyReg::from_mask_bit)
    }
}

impl ops::BitAnd for RegMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl ops::BitOr for RegMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for RegMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Register constraints of an operation.
#[derive(Debug, Clone, Copy)]
pub struct RegInfo {
    pub inputs: &'static [RegMask],
    /// For tuple producing operations, the fixed location of each element.
    pub outputs: &'static [RegMask],
    pub clobbers: RegMask,
}

impl RegInfo {
    pub const NONE: Self = Self {
        inputs: &[],
        outputs: &[],
        clobbers: RegMask::EMPTY,
    };
}
