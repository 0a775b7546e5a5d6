use crate::{Config, Ice};
use ssa_ir::{BlockId, Func, ValueId};

/// Recomputes the FPU condition flag where it is read but doesn't hold the value read.
///
/// There is a single flag, so it only survives from a compare to the next compare in the same
/// block. A flag read in another block, or after another compare, gets a copy of its compare
/// right in front of the reader. Compares left without readers are removed.
pub(super) fn flagalloc(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    let mut copies = 0;
    for block in func.blocks().to_vec() {
        let mut flag: Option<ValueId> = None;
        for value in func.block(block).values().to_vec() {
            let args = func.value(value).args().to_vec();
            for (i, arg) in args.into_iter().enumerate() {
                if func.ty(arg).is_flags() && flag != Some(arg) {
                    let copy = copy_flag(func, arg, block, Some(value));
                    func.set_arg(value, i, copy);
                    flag = Some(copy);
                    copies += 1;
                }
            }
            if func.ty(value).is_flags() {
                flag = Some(value);
            }
        }

        // Scheduling leaves the control last, so an appended copy is last as well.
        if let Some(control) = func.block(block).control() {
            if func.ty(control).is_flags() && flag != Some(control) {
                let copy = copy_flag(func, control, block, None);
                func.set_control(block, Some(copy));
                copies += 1;
            }
        }
    }

    if copies > 0 {
        let uses = func.use_counts();
        let unused: Vec<_> = func
            .values()
            .filter(|v| func.ty(*v).is_flags() && !uses.contains_key(v))
            .collect();
        for value in unused {
            func.remove_value(value);
        }
        log::debug!("{}: recomputed the flag {copies} times", func.name());
    }
    Ok(())
}

/// Copies the compare producing `flag` into `block`, in front of `anchor` or at the end.
fn copy_flag(func: &mut Func, flag: ValueId, block: BlockId, anchor: Option<ValueId>) -> ValueId {
    let v = func.value(flag);
    let (op, ty, args, aux) = (v.op(), v.ty().clone(), v.args().to_vec(), v.aux().clone());
    match anchor {
        Some(anchor) => func.insert_value_before(anchor, op, ty, &args, aux),
        None => func.new_value(block, op, ty, &args, aux),
    }
}
