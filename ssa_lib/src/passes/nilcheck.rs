use crate::{Config, Ice};
use ssa_ir::{Aux, BlockId, BlockKind, Func, Op, ValueId};

/// Accesses this far past a nil pointer are guaranteed to fault, the first page is never mapped.
const GUARD_PAGE: i64 = 4096;

/// Removes nil checks made redundant by a later access through the same pointer.
///
/// The access must come before anything else with a side effect, in the same block or in the
/// block a plain block falls into when it is that block's only predecessor.
pub(super) fn nilcheckelim(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    let checks: Vec<_> = func
        .values()
        .filter(|&v| matches!(func.op(v), Op::NilCheck | Op::LoweredNilCheck))
        .collect();
    let uses = func.use_counts();

    let mut removed = 0;
    for check in checks {
        if uses.get(&check).copied().unwrap_or(0) > 0 {
            continue;
        }
        if is_covered(func, check) {
            log::trace!("{}: removed {}", func.name(), func.display_value(check));
            func.remove_value(check);
            removed += 1;
        }
    }
    if removed > 0 {
        log::debug!("{}: removed {removed} nil checks", func.name());
    }
    Ok(())
}

fn is_covered(func: &Func, check: ValueId) -> bool {
    let ptr = func.value(check).arg(0);
    let block = func.value(check).block();
    let after = func.position(check) + 1;

    match scan(func, ptr, &func.block(block).values()[after..]) {
        Scan::Covered => true,
        Scan::Blocked => false,
        Scan::Unknown => match fallthrough(func, block) {
            Some(next) => scan(func, ptr, func.block(next).values()) == Scan::Covered,
            None => false,
        },
    }
}

#[derive(PartialEq, Eq)]
enum Scan {
    Covered,
    Blocked,
    Unknown,
}

fn scan(func: &Func, ptr: ValueId, values: &[ValueId]) -> Scan {
    for &value in values {
        let v = func.value(value);
        let info = v.op().info();
        if info.faults_on_nil_arg0 && v.arg(0) == ptr && faults_at_offset(v.aux()) {
            return Scan::Covered;
        }
        if info.side_effects || info.call {
            return Scan::Blocked;
        }
    }
    Scan::Unknown
}

fn faults_at_offset(aux: &Aux) -> bool {
    let off = match aux {
        Aux::Sym { sym: Some(_), .. } => return false,
        Aux::Sym { sym: None, off } => *off,
        Aux::Int(off) => *off,
        _ => 0,
    };
    (0..GUARD_PAGE).contains(&off)
}

fn fallthrough(func: &Func, block: BlockId) -> Option<BlockId> {
    let b = func.block(block);
    if b.kind() != BlockKind::Plain {
        return None;
    }
    let next = b.succ(0);
    (next != block && func.block(next).preds().len() == 1).then_some(next)
}
