//! Register allocation
//!
//! A linear scan over live intervals. Values get numbered in layout order (with an extra number
//! for the start and the end of every block) and the interval of a value is the smallest range
//! of numbers covering every point it is live at. Values live across an operation clobbering
//! registers (a call) only get registers it preserves. Constants that would have to live across
//! a call are rematerialized instead: they get a register only right in front of each use. There
//! is no spilling: a function needing more registers is an internal compiler error.

#[cfg(test)]
mod test;

mod liveness;

pub use liveness::LiveSets;

use crate::Ice;
use ssa_ir::{AnyReg, FReg, Func, Op, Reg, RegMask, ValueId};
use std::collections::{BTreeSet, HashMap};

/// General purpose registers in the order they are handed out. `$at` and `$v0` are kept free
/// for the code generator.
const CPU_REGS: [Reg; 23] = [
    Reg::T0,
    Reg::T1,
    Reg::T2,
    Reg::T3,
    Reg::T4,
    Reg::T5,
    Reg::T6,
    Reg::T7,
    Reg::T8,
    Reg::T9,
    Reg::A0,
    Reg::A1,
    Reg::A2,
    Reg::A3,
    Reg::V1,
    Reg::S0,
    Reg::S1,
    Reg::S2,
    Reg::S3,
    Reg::S4,
    Reg::S5,
    Reg::S6,
    Reg::S7,
];

/// FPU registers in the order they are handed out. `$f30` is kept free for the code generator.
const FPU_REGS: [FReg; 15] = [
    FReg(0),
    FReg(2),
    FReg(4),
    FReg(6),
    FReg(8),
    FReg(10),
    FReg(12),
    FReg(14),
    FReg(16),
    FReg(18),
    FReg(20),
    FReg(22),
    FReg(24),
    FReg(26),
    FReg(28),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    regs: HashMap<ValueId, AnyReg>,
    /// Registers of rematerialized arguments, by user and argument index.
    remats: HashMap<(ValueId, usize), AnyReg>,
}

impl Allocation {
    pub fn reg(&self, value: ValueId) -> Option<AnyReg> {
        self.regs.get(&value).copied()
    }

    /// The register the `i`th argument of `user` is rematerialized into, if it is.
    pub fn remat(&self, user: ValueId, i: usize) -> Option<AnyReg> {
        self.remats.get(&(user, i)).copied()
    }

    /// The callee-saved registers handed out, in register order.
    pub fn saved_regs(&self) -> Vec<AnyReg> {
        let saved: BTreeSet<_> = self
            .regs
            .values()
            .chain(self.remats.values())
            .copied()
            .filter(AnyReg::is_saved)
            .collect();
        saved.into_iter().collect()
    }
}

/// Whether `value` needs a register of its own. The stack pointer lives in `$sp`, the other
/// values without one are never materialized.
pub fn needs_reg(func: &Func, value: ValueId) -> bool {
    !matches!(func.op(value), Op::SP | Op::SB) && func.ty(value).is_register_sized()
}

/// Whether `value` can be recomputed right in front of each of its uses: a rematerializable
/// operation without arguments, used only as an argument of operations reading their arguments
/// from registers.
fn can_remat(
    func: &Func,
    value: ValueId,
    users: &[(ValueId, usize)],
    controls: &BTreeSet<ValueId>,
) -> bool {
    let v = func.value(value);
    v.op().info().rematerializable
        && v.args().is_empty()
        && !controls.contains(&value)
        && users
            .iter()
            .all(|&(user, _)| !matches!(func.op(user), Op::Phi | Op::Copy))
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    value: ValueId,
    /// For the interval of a rematerialized argument, its user and argument index.
    remat_for: Option<(ValueId, usize)>,
    start: usize,
    end: usize,
}

impl Interval {
    fn cover(&mut self, point: usize) {
        self.start = self.start.min(point);
        self.end = self.end.max(point);
    }
}

/// Assigns a register to every value of a scheduled function that needs one.
pub fn allocate(func: &Func) -> Result<Allocation, Ice> {
    let tracked = |value: ValueId| needs_reg(func, value);
    let live = LiveSets::build(func, tracked);

    // Points are even, the odd point in front of a value is where its rematerialized arguments
    // are computed.
    let mut index = 0;
    let mut next = || {
        index += 2;
        index - 2
    };
    let mut block_start = HashMap::new();
    let mut block_end = HashMap::new();
    let mut position = HashMap::new();
    let mut clobbers: Vec<(usize, RegMask)> = Vec::new();
    let mut users: HashMap<ValueId, Vec<(ValueId, usize)>> = HashMap::new();
    let mut controls = BTreeSet::new();
    for &block in func.blocks() {
        block_start.insert(block, next());
        for &value in func.block(block).values() {
            let pos = next();
            position.insert(value, pos);
            let clobbered = func.op(value).info().reg.clobbers;
            if !clobbered.is_empty() {
                clobbers.push((pos, clobbered));
            }
            for (i, &arg) in func.value(value).args().iter().enumerate() {
                users.entry(arg).or_default().push((value, i));
            }
        }
        block_end.insert(block, next());
        controls.extend(func.block(block).control());
    }
    let clobbered_within = |start: usize, end: usize| {
        clobbers
            .iter()
            .filter(|&&(pos, _)| start < pos && pos < end)
            .fold(RegMask::EMPTY, |all, &(_, mask)| all.union(mask))
    };

    let mut intervals: HashMap<ValueId, Interval> = HashMap::new();
    let mut cover = |value: ValueId, point: usize| {
        intervals
            .entry(value)
            .or_insert(Interval {
                value,
                remat_for: None,
                start: point,
                end: point,
            })
            .cover(point);
    };
    for &block in func.blocks() {
        let b = func.block(block);
        for &value in b.values() {
            let v = func.value(value);
            if v.op() == Op::Phi {
                if tracked(value) {
                    cover(value, block_start[&block]);
                    for edge in b.preds() {
                        cover(value, block_end[&edge.block]);
                    }
                }
                for (edge, &arg) in b.preds().iter().zip(v.args()) {
                    if tracked(arg) {
                        cover(arg, block_end[&edge.block]);
                    }
                }
                continue;
            }
            if tracked(value) {
                cover(value, position[&value]);
            }
            for &arg in v.args() {
                if tracked(arg) {
                    cover(arg, position[&value]);
                }
            }
        }
        if let Some(control) = b.control().filter(|&control| tracked(control)) {
            cover(control, block_end[&block]);
        }
        for &value in &live.live_in[&block] {
            cover(value, block_start[&block]);
        }
        for &value in &live.live_out[&block] {
            cover(value, block_end[&block]);
        }
    }

    let mut order = Vec::with_capacity(intervals.len());
    for interval in intervals.into_values() {
        let value = interval.value;
        let uses = users.get(&value).map_or(&[][..], Vec::as_slice);
        let crosses_clobber = !clobbered_within(interval.start, interval.end).is_empty();
        if crosses_clobber && can_remat(func, value, uses, &controls) {
            log::trace!("{}: rematerializing {}", func.name(), func.value_name(value));
            order.extend(uses.iter().map(|&(user, i)| Interval {
                value,
                remat_for: Some((user, i)),
                start: position[&user] - 1,
                end: position[&user],
            }));
        } else {
            order.push(interval);
        }
    }
    order.sort_by_key(|interval| (interval.start, position.get(&interval.value).copied()));

    let mut allocation = Allocation::default();
    let mut active: Vec<(Interval, AnyReg)> = Vec::new();
    for interval in order {
        active.retain(|(other, _)| other.end > interval.start);
        let clobbered = clobbered_within(interval.start, interval.end);
        let allowed = match func.op(interval.value).info().reg.outputs {
            [mask] if !mask.is_empty() => *mask,
            _ => RegMask::GP.union(RegMask::FP),
        };

        let is_free = |reg: &AnyReg| {
            allowed.contains(*reg)
                && !clobbered.contains(*reg)
                && active.iter().all(|(_, used)| used != reg)
        };
        let reg = if func.ty(interval.value).is_float() {
            FPU_REGS.into_iter().map(AnyReg::F).find(is_free)
        } else {
            CPU_REGS.into_iter().map(AnyReg::R).find(is_free)
        };
        let Some(reg) = reg else {
            return Err(Ice::OutOfRegisters {
                value: func.value_name(interval.value),
            });
        };
        log::trace!(
            "{}: {} -> {reg:#} [{}, {}]",
            func.name(),
            func.value_name(interval.value),
            interval.start,
            interval.end
        );
        match interval.remat_for {
            Some(at) => allocation.remats.insert(at, reg),
            None => allocation.regs.insert(interval.value, reg),
        };
        active.push((interval, reg));
    }
    Ok(allocation)
}
