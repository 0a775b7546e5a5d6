use ssa_ir::{AnyReg, Func, Reg, SymKind, Symbol};
use std::collections::HashMap;

/// The stack frame of a function, from low to high addresses:
///
/// | area             | contents |
/// | ---------------- | -------- |
/// | outgoing         | arguments of the calls made by this function |
/// | autos            | the stack slots named by auto symbols |
/// | saves            | `$ra` and the callee-saved registers this function uses |
///
/// The incoming arguments start right above the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    size: u32,
    autos: HashMap<Symbol, u32>,
    /// Each saved register with its offset from `$sp`.
    saves: Vec<(AnyReg, u32)>,
}

fn align(n: u32, to: u32) -> u32 {
    n.div_ceil(to) * to
}

impl Frame {
    pub fn build(func: &Func, saved_regs: &[AnyReg]) -> Self {
        let mut outgoing = 0;
        let mut has_calls = false;
        let mut auto_syms = Vec::new();
        for value in func.values() {
            let v = func.value(value);
            if v.op().info().call {
                has_calls = true;
                outgoing = outgoing.max(v.aux().int().unwrap_or(0).max(0) as u32);
            }
            if let Some(sym) = v.aux().symbol().filter(|sym| sym.is_auto()) {
                if !auto_syms.contains(sym) {
                    auto_syms.push(sym.clone());
                }
            }
        }

        let mut offset = align(outgoing, 4);
        let mut autos = HashMap::new();
        for sym in auto_syms {
            let SymKind::Auto { size } = *sym.kind() else {
                continue;
            };
            offset = align(offset, if size >= 8 { 8 } else { 4 });
            autos.insert(sym, offset);
            offset += align(size, 4);
        }

        let mut saves = Vec::new();
        if has_calls {
            saves.push((AnyReg::R(Reg::RA), offset));
            offset += 4;
        }
        for &reg in saved_regs.iter().filter(|reg| !reg.is_float()) {
            saves.push((reg, offset));
            offset += 4;
        }
        for &reg in saved_regs.iter().filter(|reg| reg.is_float()) {
            offset = align(offset, 8);
            saves.push((reg, offset));
            offset += 8;
        }

        Self {
            size: align(offset, 8),
            autos,
            saves,
        }
    }

    /// Size of the frame in bytes, a multiple of 8.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Offset from `$sp` of the stack slot of an auto symbol.
    pub fn auto(&self, sym: &Symbol) -> Option<u32> {
        self.autos.get(sym).copied()
    }

    pub fn saves(&self) -> &[(AnyReg, u32)] {
        &self.saves
    }

    /// Offset from `$sp` of the incoming argument at `off`.
    pub fn arg(&self, off: i64) -> i64 {
        self.size as i64 + off
    }
}
