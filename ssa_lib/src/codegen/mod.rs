//! Code generation
//!
//! Turns a scheduled, register allocated function into a [`Program`]: a list of MIPS
//! instructions with the start of every block and the references to external symbols the
//! linker has to resolve. Most operations are emitted from the template in their
//! [`OpInfo::asm`](ssa_ir::OpInfo::asm), the others are handled here.
//!
//! Phis become moves at the end of their predecessors. Critical edges have been split before,
//! so a block ending in a branch never has to feed a phi.


mod frame;

pub use frame::Frame;

use crate::{regalloc::Allocation, Ice};
use ssa_ir::{AnyReg, Asm, Aux, BlockId, BlockKind, FReg, Func, Op, Reg, Type, ValueId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(AnyReg),
    Imm(i64),
    FImm(f64),
    /// `off(base)`
    Mem { base: AnyReg, off: i64 },
    /// The address of an external symbol, resolved by the linker.
    Sym { name: String, off: i64 },
    /// A block, `instr` is the index of its first instruction.
    Target { label: String, instr: usize },
    /// A function, resolved by the linker.
    Func(String),
}

impl Operand {
    fn reg(reg: impl Into<AnyReg>) -> Self {
        Operand::Reg(reg.into())
    }
}

/// A single machine instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prog {
    pub mnemonic: &'static str,
    pub operands: Vec<Operand>,
}

/// An instruction referring to an external symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub instr: usize,
    pub sym: String,
}

/// The machine code of one function.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub frame_size: u32,
    pub instrs: Vec<Prog>,
    /// The label and the index of the first instruction of every block, in layout order.
    pub blocks: Vec<(String, usize)>,
    pub relocations: Vec<Relocation>,
}

impl Program {
    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.instrs.iter().map(|prog| prog.mnemonic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveKind {
    Word,
    Single,
    Double,
}

impl MoveKind {
    fn of(ty: &Type) -> Self {
        match ty {
            Type::Float { bits: 32 } => MoveKind::Single,
            Type::Float { .. } => MoveKind::Double,
            _ => MoveKind::Word,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            MoveKind::Word => "move",
            MoveKind::Single => "mov.s",
            MoveKind::Double => "mov.d",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Move {
    dst: AnyReg,
    src: AnyReg,
    kind: MoveKind,
}

/// Generates the code of a scheduled function with registers assigned by `alloc`.
pub fn generate(func: &Func, alloc: &Allocation) -> Result<Program, Ice> {
    let frame = Frame::build(func, &alloc.saved_regs());
    let mut generator = Generator {
        func,
        alloc,
        frame,
        instrs: Vec::new(),
        relocations: Vec::new(),
        fixups: Vec::new(),
    };
    generator.prologue();

    let mut blocks = Vec::with_capacity(func.blocks().len());
    let mut starts = HashMap::new();
    for (i, &block) in func.blocks().iter().enumerate() {
        starts.insert(block, generator.instrs.len());
        blocks.push((label(func, block), generator.instrs.len()));

        for &value in func.block(block).values() {
            generator.value(value)?;
        }
        generator.phi_moves(block)?;
        generator.terminator(block, func.blocks().get(i + 1).copied())?;
    }

    for (instr, operand, block) in std::mem::take(&mut generator.fixups) {
        if let Operand::Target { instr: target, .. } =
            &mut generator.instrs[instr].operands[operand]
        {
            *target = starts[&block];
        }
    }

    Ok(Program {
        name: func.name().to_owned(),
        frame_size: generator.frame.size(),
        instrs: generator.instrs,
        blocks,
        relocations: generator.relocations,
    })
}

fn label(func: &Func, block: BlockId) -> String {
    format!("{}.{}", func.name(), func.block_name(block))
}

struct Generator<'a> {
    func: &'a Func,
    alloc: &'a Allocation,
    frame: Frame,
    instrs: Vec<Prog>,
    relocations: Vec<Relocation>,
    /// Branch operands waiting for the start of their block: instruction, operand, block.
    fixups: Vec<(usize, usize, BlockId)>,
}

impl Generator<'_> {
    fn emit(&mut self, mnemonic: &'static str, operands: Vec<Operand>) {
        self.instrs.push(Prog { mnemonic, operands });
    }

    fn emit_with_relocation(&mut self, mnemonic: &'static str, operands: Vec<Operand>, sym: &str) {
        self.relocations.push(Relocation {
            instr: self.instrs.len(),
            sym: sym.to_owned(),
        });
        self.emit(mnemonic, operands);
    }

    fn emit_branch(&mut self, mnemonic: &'static str, mut operands: Vec<Operand>, to: BlockId) {
        self.fixups.push((self.instrs.len(), operands.len(), to));
        operands.push(Operand::Target {
            label: label(self.func, to),
            instr: usize::MAX,
        });
        self.emit(mnemonic, operands);
    }

    fn reg(&self, value: ValueId) -> Result<AnyReg, Ice> {
        if self.func.op(value) == Op::SP {
            return Ok(AnyReg::R(Reg::SP));
        }
        self.alloc.reg(value).ok_or_else(|| {
            Ice::Unsupported(format!("{} has no register", self.func.value_name(value)))
        })
    }

    /// The register holding the `i`th argument of `value`.
    fn arg_loc(&self, value: ValueId, i: usize) -> Result<AnyReg, Ice> {
        match self.alloc.remat(value, i) {
            Some(reg) => Ok(reg),
            None => self.reg(self.func.value(value).arg(i)),
        }
    }

    fn arg_reg(&self, value: ValueId, i: usize) -> Result<Operand, Ice> {
        self.arg_loc(value, i).map(Operand::Reg)
    }

    /// Recomputes the arguments of `value` that don't keep a register of their own.
    fn rematerialize_args(&mut self, value: ValueId) -> Result<(), Ice> {
        let func = self.func;
        for (i, &arg) in func.value(value).args().iter().enumerate() {
            let Some(reg) = self.alloc.remat(value, i) else {
                continue;
            };
            let Asm::Ri(mnemonic) = func.op(arg).info().asm else {
                return Err(Ice::Unsupported(format!(
                    "{}: can't recompute `{}`",
                    func.value_name(value),
                    func.op(arg)
                )));
            };
            let imm = match func.value(arg).aux() {
                Aux::Float(x) => Operand::FImm(*x),
                aux => Operand::Imm(aux.int().unwrap_or(0)),
            };
            self.emit(mnemonic, vec![Operand::Reg(reg), imm]);
        }
        Ok(())
    }

    /// The memory operand of a load or store.
    fn address(&self, value: ValueId) -> Result<Operand, Ice> {
        let v = self.func.value(value);
        let (sym, off) = match v.aux() {
            Aux::Sym { sym, off } => (sym.as_ref(), *off),
            aux => (None, aux.int().unwrap_or(0)),
        };
        let Some(sym) = sym else {
            return Ok(Operand::Mem {
                base: self.arg_loc(value, 0)?,
                off,
            });
        };
        match self.frame.auto(sym) {
            Some(slot) => Ok(Operand::Mem {
                base: AnyReg::R(Reg::SP),
                off: slot as i64 + off,
            }),
            None => Err(Ice::Unsupported(format!(
                "{}: memory access through the external symbol `{sym}`",
                self.func.value_name(value)
            ))),
        }
    }

    fn prologue(&mut self) {
        let size = self.frame.size() as i64;
        if size == 0 {
            return;
        }
        let sp = Operand::reg(Reg::SP);
        self.emit("addiu", vec![sp.clone(), sp, Operand::Imm(-size)]);
        for (reg, off) in self.frame.saves().to_vec() {
            let mnemonic = if reg.is_float() { "sdc1" } else { "sw" };
            let mem = Operand::Mem {
                base: AnyReg::R(Reg::SP),
                off: off as i64,
            };
            self.emit(mnemonic, vec![Operand::Reg(reg), mem]);
        }
    }

    fn epilogue(&mut self) {
        let size = self.frame.size() as i64;
        if size == 0 {
            return;
        }
        for (reg, off) in self.frame.saves().to_vec() {
            let mnemonic = if reg.is_float() { "ldc1" } else { "lw" };
            let mem = Operand::Mem {
                base: AnyReg::R(Reg::SP),
                off: off as i64,
            };
            self.emit(mnemonic, vec![Operand::Reg(reg), mem]);
        }
        let sp = Operand::reg(Reg::SP);
        self.emit("addiu", vec![sp.clone(), sp, Operand::Imm(size)]);
    }

    fn value(&mut self, value: ValueId) -> Result<(), Ice> {
        let func = self.func;
        let v = func.value(value);
        let info = v.op().info();
        if info.no_code {
            return Ok(());
        }
        // Recomputed at every use instead.
        if info.rematerializable && !v.op().is_generic() && self.alloc.reg(value).is_none() {
            return Ok(());
        }
        self.rematerialize_args(value)?;
        match v.op() {
            Op::Phi => return Ok(()),
            Op::Arg => return self.arg(value),
            Op::Copy => return self.copy(value),
            Op::Select0 | Op::Select1 => return self.select(value),
            op if op.is_generic() => {
                return Err(Ice::Unlowered {
                    op: info.name,
                    value: func.value_name(value),
                    block: func.block_name(v.block()),
                })
            }
            _ => {}
        }

        let rd = || self.reg(value).map(Operand::Reg);
        let imm = || match v.aux() {
            Aux::Float(x) => Operand::FImm(*x),
            aux => Operand::Imm(aux.int().unwrap_or(0)),
        };
        let operands = match info.asm {
            Asm::None => return Ok(()),
            Asm::Custom => return self.custom(value),
            Asm::Rrr(m) => (m, vec![rd()?, self.arg_reg(value, 0)?, self.arg_reg(value, 1)?]),
            Asm::Rri(m) => (m, vec![rd()?, self.arg_reg(value, 0)?, imm()]),
            Asm::Rr(m) => (m, vec![rd()?, self.arg_reg(value, 0)?]),
            Asm::Ri(m) => (m, vec![rd()?, imm()]),
            Asm::Src2(m) => (m, vec![self.arg_reg(value, 0)?, self.arg_reg(value, 1)?]),
            Asm::Load(m) => (m, vec![rd()?, self.address(value)?]),
            Asm::Store(m) => (m, vec![self.arg_reg(value, 1)?, self.address(value)?]),
            Asm::StoreZero(m) => (m, vec![Operand::reg(Reg::ZERO), self.address(value)?]),
        };
        self.emit(operands.0, operands.1);
        Ok(())
    }

    fn arg(&mut self, value: ValueId) -> Result<(), Ice> {
        let Some(rd) = self.alloc.reg(value) else {
            return Ok(());
        };
        let v = self.func.value(value);
        let mnemonic = match v.ty() {
            Type::Int { bits: 8, signed: true } => "lb",
            Type::Int { bits: 8, .. } | Type::Bool => "lbu",
            Type::Int { bits: 16, signed: true } => "lh",
            Type::Int { bits: 16, .. } => "lhu",
            Type::Float { bits: 32 } => "lwc1",
            Type::Float { .. } => "ldc1",
            _ => "lw",
        };
        let mem = Operand::Mem {
            base: AnyReg::R(Reg::SP),
            off: self.frame.arg(v.aux().int().unwrap_or(0)),
        };
        self.emit(mnemonic, vec![Operand::Reg(rd), mem]);
        Ok(())
    }

    fn copy(&mut self, value: ValueId) -> Result<(), Ice> {
        let Some(dst) = self.alloc.reg(value) else {
            return Ok(());
        };
        let src = self.reg(self.func.value(value).arg(0))?;
        if dst != src {
            let kind = MoveKind::of(self.func.ty(value));
            self.emit(kind.mnemonic(), vec![Operand::Reg(dst), Operand::Reg(src)]);
        }
        Ok(())
    }

    fn select(&mut self, value: ValueId) -> Result<(), Ice> {
        let Some(dst) = self.alloc.reg(value) else {
            return Ok(());
        };
        let v = self.func.value(value);
        let producer = self.func.op(v.arg(0));
        let (mnemonic, operands) = match (producer, v.op()) {
            (Op::DIV | Op::DIVU | Op::MULT | Op::MULTU, Op::Select0) => ("mfhi", vec![]),
            (Op::DIV | Op::DIVU | Op::MULT | Op::MULTU, Op::Select1) => ("mflo", vec![]),
            (Op::CALLstatic, Op::Select0) => ("move", vec![Operand::reg(Reg::V0)]),
            (producer, op) => {
                return Err(Ice::Unsupported(format!(
                    "{}: `{op}` of `{producer}`",
                    self.func.value_name(value)
                )))
            }
        };
        let mut all = vec![Operand::Reg(dst)];
        all.extend(operands);
        self.emit(mnemonic, all);
        Ok(())
    }

    fn custom(&mut self, value: ValueId) -> Result<(), Ice> {
        let func = self.func;
        let v = func.value(value);
        let zero = Operand::reg(Reg::ZERO);
        match v.op() {
            Op::NEG => {
                let ops = vec![self.reg(value).map(Operand::Reg)?, zero, self.arg_reg(value, 0)?];
                self.emit("subu", ops);
            }
            Op::SGTzero | Op::SGTUzero => {
                let mnemonic = if v.op() == Op::SGTzero { "slt" } else { "sltu" };
                let ops = vec![self.reg(value).map(Operand::Reg)?, zero, self.arg_reg(value, 0)?];
                self.emit(mnemonic, ops);
            }
            Op::MOVBUreg | Op::MOVHUreg => {
                let mask = if v.op() == Op::MOVBUreg { 0xff } else { 0xffff };
                let ops = vec![
                    self.reg(value).map(Operand::Reg)?,
                    self.arg_reg(value, 0)?,
                    Operand::Imm(mask),
                ];
                self.emit("andi", ops);
            }
            Op::FPFlagTrue | Op::FPFlagFalse => {
                // Set to 1, then clear unless the flag has the wanted value.
                let rd = self.reg(value).map(Operand::Reg)?;
                let clear = if v.op() == Op::FPFlagTrue { "movf" } else { "movt" };
                self.emit("li", vec![rd.clone(), Operand::Imm(1)]);
                self.emit(clear, vec![rd, zero]);
            }
            Op::MOVWaddr => self.address_of(value)?,
            Op::CALLstatic => {
                let Some(sym) = v.aux().symbol().filter(|sym| !sym.is_auto()) else {
                    return Err(Ice::Unsupported(format!(
                        "{}: call without a function symbol",
                        func.value_name(value)
                    )));
                };
                let target = Operand::Func(sym.name().to_owned());
                self.emit_with_relocation("jal", vec![target], sym.name());
            }
            Op::LoweredNilCheck => {
                let mem = Operand::Mem {
                    base: self.arg_loc(value, 0)?,
                    off: 0,
                };
                self.emit("lb", vec![zero, mem]);
            }
            op => {
                return Err(Ice::Unsupported(format!(
                    "{}: no code for `{op}`",
                    func.value_name(value)
                )))
            }
        }
        Ok(())
    }

    fn address_of(&mut self, value: ValueId) -> Result<(), Ice> {
        let v = self.func.value(value);
        let rd = self.reg(value).map(Operand::Reg)?;
        let (sym, off) = match v.aux() {
            Aux::Sym { sym, off } => (sym.as_ref(), *off),
            _ => (None, 0),
        };
        match sym {
            None => {
                let base = self.arg_reg(value, 0)?;
                self.emit("addiu", vec![rd, base, Operand::Imm(off)]);
            }
            Some(sym) => match self.frame.auto(sym) {
                Some(slot) => {
                    let ops = vec![rd, Operand::reg(Reg::SP), Operand::Imm(slot as i64 + off)];
                    self.emit("addiu", ops);
                }
                None => {
                    let target = Operand::Sym {
                        name: sym.name().to_owned(),
                        off,
                    };
                    self.emit_with_relocation("la", vec![rd, target], sym.name());
                }
            },
        }
        Ok(())
    }

    /// Emits the moves feeding the phis of the successor of `block`.
    fn phi_moves(&mut self, block: BlockId) -> Result<(), Ice> {
        let func = self.func;
        let [edge] = func.block(block).succs() else {
            return Ok(());
        };
        let mut moves = Vec::new();
        for &phi in func.block(edge.block).values() {
            if func.op(phi) != Op::Phi {
                continue;
            }
            let Some(dst) = self.alloc.reg(phi) else {
                continue;
            };
            let src = self.reg(func.value(phi).arg(edge.index))?;
            if dst != src {
                moves.push(Move {
                    dst,
                    src,
                    kind: MoveKind::of(func.ty(phi)),
                });
            }
        }
        self.parallel_move(moves);
        Ok(())
    }

    /// Performs all `moves` as if at once. A move is emitted once nothing still needs its
    /// destination, a cycle is broken by saving one destination in the scratch register.
    fn parallel_move(&mut self, mut moves: Vec<Move>) {
        while !moves.is_empty() {
            let free = moves
                .iter()
                .position(|m| moves.iter().all(|other| other.src != m.dst));
            match free {
                Some(i) => {
                    let m = moves.remove(i);
                    self.emit(m.kind.mnemonic(), vec![Operand::Reg(m.dst), Operand::Reg(m.src)]);
                }
                None => {
                    let blocked = moves[0].dst;
                    let scratch = if blocked.is_float() {
                        AnyReg::F(FReg::F30)
                    } else {
                        AnyReg::R(Reg::AT)
                    };
                    let kind = moves
                        .iter()
                        .find(|m| m.src == blocked)
                        .map_or(MoveKind::Word, |m| m.kind);
                    self.emit(kind.mnemonic(), vec![Operand::Reg(scratch), Operand::Reg(blocked)]);
                    for m in moves.iter_mut().filter(|m| m.src == blocked) {
                        m.src = scratch;
                    }
                }
            }
        }
    }

    fn terminator(&mut self, block: BlockId, next: Option<BlockId>) -> Result<(), Ice> {
        let func = self.func;
        let b = func.block(block);
        match b.kind() {
            BlockKind::Plain | BlockKind::Call => {
                let succ = b.succ(0);
                if Some(succ) != next {
                    self.emit_branch("j", vec![], succ);
                }
            }
            BlockKind::Ret => {
                if let Some(control) = b.control() {
                    let src = Operand::Reg(self.reg(control)?);
                    match MoveKind::of(func.ty(control)) {
                        MoveKind::Word => self.emit("move", vec![Operand::reg(Reg::V0), src]),
                        kind => self.emit(kind.mnemonic(), vec![Operand::reg(FReg::F0), src]),
                    }
                }
                self.epilogue();
                self.emit("jr", vec![Operand::reg(Reg::RA)]);
            }
            BlockKind::Exit => self.emit("break", vec![]),
            kind => {
                let Some(inverse) = kind.info().inverse else {
                    return Err(Ice::UnloweredBlock {
                        kind: kind.name(),
                        block: func.block_name(block),
                    });
                };
                let (yes, no) = (b.succ(0), b.succ(1));
                if Some(yes) == next {
                    self.branch(inverse, block, no)?;
                } else {
                    self.branch(kind, block, yes)?;
                    if Some(no) != next {
                        self.emit_branch("j", vec![], no);
                    }
                }
            }
        }
        Ok(())
    }

    fn branch(&mut self, kind: BlockKind, block: BlockId, to: BlockId) -> Result<(), Ice> {
        let func = self.func;
        let control = || {
            let control = func.block(block).control().ok_or_else(|| {
                Ice::Unsupported(format!("{}: branch without a control", func.block_name(block)))
            })?;
            self.reg(control).map(Operand::Reg)
        };
        let (mnemonic, operands) = match kind {
            BlockKind::EQ => ("beq", vec![control()?, Operand::reg(Reg::ZERO)]),
            BlockKind::NE => ("bne", vec![control()?, Operand::reg(Reg::ZERO)]),
            BlockKind::LTZ => ("bltz", vec![control()?]),
            BlockKind::LEZ => ("blez", vec![control()?]),
            BlockKind::GTZ => ("bgtz", vec![control()?]),
            BlockKind::GEZ => ("bgez", vec![control()?]),
            BlockKind::FPT => ("bc1t", vec![]),
            BlockKind::FPF => ("bc1f", vec![]),
            kind => {
                return Err(Ice::UnloweredBlock {
                    kind: kind.name(),
                    block: func.block_name(block),
                })
            }
        };
        self.emit_branch(mnemonic, operands, to);
        Ok(())
    }
}
